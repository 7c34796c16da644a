use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex, RegexBuilder};

/// Lower-court venue a docket number belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Venue {
    Appellate,
    Law,
    SpecialCivil,
    Chancery,
    Probate,
    Family,
    Criminal,
    Municipal,
    Tax,
    Agency,
    Unknown,
}

impl Venue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Venue::Appellate => "Appellate",
            Venue::Law => "Law",
            Venue::SpecialCivil => "Special Civil",
            Venue::Chancery => "Chancery",
            Venue::Probate => "Probate",
            Venue::Family => "Family",
            Venue::Criminal => "Criminal",
            Venue::Municipal => "Municipal",
            Venue::Tax => "Tax",
            Venue::Agency => "Agency",
            Venue::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One docket match found in a text fragment.
#[derive(Debug, Clone)]
pub struct DocketReference {
    pub docket: String,
    pub venue: Venue,
    pub subtype: Option<String>,
}

/// How a rule resolves its sub-case type: a constant, a lookup keyed by a
/// capture group, or a plain function of the whole match.
enum SubtypeRule {
    None,
    Const(&'static str),
    Lookup(&'static [(&'static str, &'static str)]),
    FromMatch(fn(&Captures) -> Option<String>),
}

impl SubtypeRule {
    fn resolve(&self, caps: &Captures) -> Option<String> {
        match self {
            SubtypeRule::None => None,
            SubtypeRule::Const(s) => Some((*s).to_string()),
            SubtypeRule::Lookup(table) => {
                let code = caps.get(1)?.as_str().to_uppercase();
                table
                    .iter()
                    .find(|(k, _)| *k == code)
                    .map(|(_, label)| (*label).to_string())
            }
            SubtypeRule::FromMatch(f) => f(caps),
        }
    }
}

struct DocketRule {
    pattern: Regex,
    venue: Venue,
    subtype: SubtypeRule,
}

// Family Part docket type codes (second letter of the FX- prefix).
const FAMILY_CODES: &[(&str, &str)] = &[
    ("V", "Family Violence (FV)"),
    ("D", "Non-Dissolution (FD)"),
    ("M", "Matrimonial (FM)"),
    ("G", "Guardianship (FG)"),
    ("P", "Parental Rights Termination (FP)"),
    ("N", "Abuse and Neglect (FN)"),
    ("J", "Juvenile Delinquency (FJ)"),
    ("A", "Adoption (FA)"),
    ("O", "Domestic Violence Contempt (FO)"),
];

// Special Civil Part docket prefixes.
const SPECIAL_CIVIL_CODES: &[(&str, &str)] = &[
    ("DC", "Special Civil (DC)"),
    ("LT", "Landlord-Tenant (LT)"),
    ("SC", "Small Claims (SC)"),
];

fn ci(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .unwrap()
}

fn oal_agency_code(caps: &Captures) -> Option<String> {
    caps.get(1).map(|m| m.as_str().to_uppercase())
}

// Ordered most-specific-first: a span claimed by an earlier rule is never
// re-tried by a later one, so e.g. Special Civil DC- must come before the
// generic Law Division L- rule and the four-digit Appellate pattern must
// come before anything that could swallow an A- prefix.
static RULES: LazyLock<Vec<DocketRule>> = LazyLock::new(|| {
    vec![
        DocketRule {
            pattern: ci(r"\bA-\d{4}-\d{2}\b"),
            venue: Venue::Appellate,
            subtype: SubtypeRule::None,
        },
        DocketRule {
            pattern: ci(r"\bF([VDMGPNJAO])-\d{2}-\d{1,6}-\d{2}\b"),
            venue: Venue::Family,
            subtype: SubtypeRule::Lookup(FAMILY_CODES),
        },
        DocketRule {
            pattern: ci(r"\b(DC|LT|SC)-\d{3,6}-\d{2}\b"),
            venue: Venue::SpecialCivil,
            subtype: SubtypeRule::Lookup(SPECIAL_CIVIL_CODES),
        },
        DocketRule {
            pattern: ci(r"\bMA-\d{1,4}(?:-\d{2,4})?\b"),
            venue: Venue::Municipal,
            subtype: SubtypeRule::Const("Municipal Appeal"),
        },
        DocketRule {
            pattern: ci(r"\bCP-\d{1,6}-\d{2,4}\b"),
            venue: Venue::Probate,
            subtype: SubtypeRule::Const("Probate Part"),
        },
        DocketRule {
            pattern: ci(r"\bC-\d{1,6}-\d{2}\b"),
            venue: Venue::Chancery,
            subtype: SubtypeRule::Const("General Equity"),
        },
        DocketRule {
            pattern: ci(r"\bL-\d{1,6}-\d{2}\b"),
            venue: Venue::Law,
            subtype: SubtypeRule::Const("Civil Part"),
        },
        DocketRule {
            pattern: ci(r"\b(?:ind(?:ictment)?|accusation)\s+(?:no\.?\s*)?(?P<doc>\d{2}-\d{2}-\d{3,5})\b"),
            venue: Venue::Criminal,
            subtype: SubtypeRule::Const("Indictment"),
        },
        DocketRule {
            pattern: ci(r"\bOAL\s+DKT\.?\s+NO\.?\s+([A-Z]{3,4})\s+(?P<doc>\d{3,6}-\d{2,4})\b"),
            venue: Venue::Agency,
            subtype: SubtypeRule::FromMatch(oal_agency_code),
        },
        // Tax Court dockets are a bare serial-year pair; keep this last so
        // anything with a recognizable prefix is claimed first.
        DocketRule {
            pattern: ci(r"\b\d{6}-(?:19|20)\d{2}\b"),
            venue: Venue::Tax,
            subtype: SubtypeRule::Const("Tax Court"),
        },
    ]
});

/// Find every docket reference in `fragment`, in order of appearance.
/// Rules are tried in table order; the first rule to claim a span wins and
/// later rules skip any overlapping span.
pub fn find_dockets(fragment: &str) -> Vec<DocketReference> {
    let mut claimed: Vec<(usize, usize)> = Vec::new();
    let mut found: Vec<(usize, DocketReference)> = Vec::new();

    for rule in RULES.iter() {
        for caps in rule.pattern.captures_iter(fragment) {
            let m = caps.get(0).unwrap();
            if claimed.iter().any(|&(s, e)| m.start() < e && s < m.end()) {
                continue;
            }
            claimed.push((m.start(), m.end()));

            let docket = caps
                .name("doc")
                .map(|d| d.as_str())
                .unwrap_or(m.as_str())
                .trim()
                .to_uppercase();

            found.push((
                m.start(),
                DocketReference {
                    docket,
                    venue: rule.venue,
                    subtype: rule.subtype.resolve(&caps),
                },
            ));
        }
    }

    found.sort_by_key(|(start, _)| *start);
    found.into_iter().map(|(_, d)| d).collect()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_violence_docket() {
        let refs = find_dockets("FV-12-345-24");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].venue, Venue::Family);
        assert_eq!(refs[0].subtype.as_deref(), Some("Family Violence (FV)"));
        assert_eq!(refs[0].docket, "FV-12-345-24");
    }

    #[test]
    fn special_civil_before_law() {
        // DC- must not be claimed by the generic C- or L- rules.
        let refs = find_dockets("DC-001234-20");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].venue, Venue::SpecialCivil);
        assert_eq!(refs[0].subtype.as_deref(), Some("Special Civil (DC)"));
    }

    #[test]
    fn law_division_docket() {
        let refs = find_dockets("L-0517-19");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].venue, Venue::Law);
        assert_eq!(refs[0].subtype.as_deref(), Some("Civil Part"));
    }

    #[test]
    fn multiple_spans_each_matched() {
        let refs = find_dockets("L-0517-19 AND FM-07-889-18");
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].venue, Venue::Law);
        assert_eq!(refs[1].venue, Venue::Family);
        assert_eq!(refs[1].subtype.as_deref(), Some("Matrimonial (FM)"));
    }

    #[test]
    fn order_of_appearance_preserved() {
        // The Family rule sits above Law in the table but L- appears second
        // in the text; output must follow text order.
        let refs = find_dockets("FD-09-123-21, L-2211-20");
        assert_eq!(refs[0].docket, "FD-09-123-21");
        assert_eq!(refs[1].docket, "L-2211-20");
    }

    #[test]
    fn appellate_docket() {
        let refs = find_dockets("A-1234-23");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].venue, Venue::Appellate);
        assert!(refs[0].subtype.is_none());
    }

    #[test]
    fn short_supreme_docket_not_matched() {
        // Supreme Court short dockets (A-73-21) are not lower-court dockets.
        assert!(find_dockets("A-73-21").is_empty());
    }

    #[test]
    fn indictment_with_prefix() {
        let refs = find_dockets("INDICTMENT NO. 19-06-0547");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].venue, Venue::Criminal);
        assert_eq!(refs[0].docket, "19-06-0547");
    }

    #[test]
    fn oal_docket_subtype_from_match() {
        let refs = find_dockets("OAL DKT. NO. EDU 05427-19");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].venue, Venue::Agency);
        assert_eq!(refs[0].subtype.as_deref(), Some("EDU"));
        assert_eq!(refs[0].docket, "05427-19");
    }

    #[test]
    fn tax_docket() {
        let refs = find_dockets("012345-2018");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].venue, Venue::Tax);
    }

    #[test]
    fn case_insensitive_and_uppercased() {
        let refs = find_dockets("fv-12-345-24");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].docket, "FV-12-345-24");
    }

    #[test]
    fn no_dockets_in_plain_text() {
        assert!(find_dockets("Essex County").is_empty());
        assert!(find_dockets("").is_empty());
    }
}
