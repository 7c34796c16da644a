/// Canonical decision type resolved from a short free-text badge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub code: Option<&'static str>,
    pub label: String,
    pub venue: &'static str,
}

// Ordered longest/most-specific key first: "unpublished appellate" must be
// checked before "appellate", "supreme court" before "supreme".
const DECISION_TABLE: &[(&str, &str, &str, &str)] = &[
    ("unpublished appellate", "UA", "Unpublished Appellate", "Appellate"),
    ("published appellate", "PA", "Published Appellate", "Appellate"),
    ("unpublished tax", "UT", "Unpublished Tax", "Tax"),
    ("published tax", "PT", "Published Tax", "Tax"),
    ("unpublished trial", "UTR", "Unpublished Trial", "Trial"),
    ("published trial", "PTR", "Published Trial", "Trial"),
    ("supreme court", "SC", "Supreme Court", "Supreme"),
    ("supreme", "SC", "Supreme Court", "Supreme"),
    ("appellate", "PA", "Published Appellate", "Appellate"),
    ("tax", "PT", "Published Tax", "Tax"),
    ("trial", "PTR", "Published Trial", "Trial"),
];

/// Map a badge string to its canonical (code, label, venue) triple.
/// Case-insensitive substring match against the fixed table; no match
/// returns the raw text unchanged with an Unknown venue. Pure.
pub fn classify(badge: &str) -> Decision {
    let needle = badge.trim().to_lowercase();
    for (key, code, label, venue) in DECISION_TABLE {
        if needle.contains(key) {
            return Decision {
                code: Some(code),
                label: (*label).to_string(),
                venue,
            };
        }
    }
    Decision {
        code: None,
        label: badge.to_string(),
        venue: "Unknown",
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specific_key_wins_over_generic() {
        let d = classify("Unpublished Appellate");
        assert_eq!(d.code, Some("UA"));
        assert_eq!(d.venue, "Appellate");

        let d = classify("Appellate");
        assert_eq!(d.code, Some("PA"));
    }

    #[test]
    fn case_insensitive_and_prefix_tolerant() {
        let d = classify("  SUPREME COURT OPINION ");
        assert_eq!(d.code, Some("SC"));
        assert_eq!(d.venue, "Supreme");
    }

    #[test]
    fn unknown_badge_passes_through() {
        let d = classify("Errata Sheet");
        assert_eq!(d.code, None);
        assert_eq!(d.label, "Errata Sheet");
        assert_eq!(d.venue, "Unknown");
    }

    #[test]
    fn deterministic() {
        assert_eq!(classify("Published Tax"), classify("Published Tax"));
    }
}
