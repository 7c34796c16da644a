use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::db::CaseRow;
use crate::parser::decision::Decision;
use crate::parser::dockets::{find_dockets, Venue};
use crate::parser::ParseError;

/// Answer from the Supreme Court case-search collaborator. Every field is
/// best-effort; absent means no match, never an error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SupremeCourtCase {
    pub appellate_docket: Option<String>,
    pub county: Option<String>,
    pub agency: Option<String>,
}

/// External lookup used only for Supreme Court titles; results fill fields
/// the title itself left empty and never overwrite derived values.
pub trait SupremeCourtLookup {
    fn lookup(&self, short_docket: &str, caption: &str) -> Option<SupremeCourtCase>;
}

static RECORD_IMPOUNDED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bRECORD\s+IMPOUNDED\b").unwrap());
static CONSOLIDATED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bCONSOLIDATED\b").unwrap());
static RESUBMITTED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bRESUBMITTED\b").unwrap());
// Parenthetical elements are flattened: group markers become separators and
// comma / literal " AND " both split.
static ELEMENT_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[(),]|\s+AND\s+").unwrap());
static COUNTY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b([A-Za-z]+(?:\s+[A-Za-z]+)?\s+COUNTY)\b").unwrap());
static STATEWIDE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bSTATEWIDE\b").unwrap());
static AGENCY_KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:DEPARTMENT|BOARD|DIVISION|BUREAU)\s+OF\b").unwrap()
});
// Supreme Court short dockets (A-73-21) are shorter than the four-digit
// Appellate Division format and never classify as lower-court dockets.
static SHORT_DOCKET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bA-\d{1,3}-\d{2}\b").unwrap());

const LC_DOCKET_MISSING: &str = "[LC Docket Missing]";

/// Parse one raw case announcement title into a CaseRow.
///
/// The case name is everything before the first `(`; the remainder is a
/// block of (possibly nested) parentheticals that is flattened into ordered
/// elements, each claimed by at most one extraction step. Malformed input
/// degrades to defaults plus marker notes; the only hard failure is a title
/// with no case-name segment at all.
pub fn parse_title(
    raw: &str,
    decision: &Decision,
    lookup: Option<&dyn SupremeCourtLookup>,
) -> Result<CaseRow, ParseError> {
    let raw = raw.trim();

    // Step 1: case name / parenthetical block split.
    let (name_part, block) = match raw.find('(') {
        Some(idx) => (&raw[..idx], &raw[idx..]),
        None => (raw, ""),
    };
    let mut case_name = name_part.trim().to_string();
    if case_name.is_empty() {
        return Err(ParseError::NoCaseName(raw.to_string()));
    }

    // Step 2: marker phrases are flags (or a note), never elements.
    let mut notes: Vec<String> = Vec::new();
    let record_impounded = RECORD_IMPOUNDED_RE.is_match(block);
    let is_consolidated = CONSOLIDATED_RE.is_match(block);
    if RESUBMITTED_RE.is_match(block) {
        notes.push("RESUBMITTED".to_string());
    }
    let block = RECORD_IMPOUNDED_RE.replace_all(block, "");
    let block = CONSOLIDATED_RE.replace_all(&block, "");
    let block = RESUBMITTED_RE.replace_all(&block, "");

    // Step 3: flatten nested groups into ordered elements.
    let elements: Vec<String> = ELEMENT_SPLIT_RE
        .split(&block)
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .collect();
    let mut claimed = vec![false; elements.len()];

    // Step 4: docket scan. Venue/subtype come from the first docket found
    // anywhere; every docket from every element is retained.
    let mut lc_docket_ids: Vec<String> = Vec::new();
    let mut lc_venue: Option<Venue> = None;
    let mut lc_subtype: Option<String> = None;
    for (i, element) in elements.iter().enumerate() {
        let refs = find_dockets(element);
        if refs.is_empty() {
            continue;
        }
        claimed[i] = true;
        for r in refs {
            if lc_venue.is_none() {
                lc_venue = Some(r.venue);
                lc_subtype = r.subtype.clone();
            }
            lc_docket_ids.push(r.docket);
        }
    }

    // Step 5: one-shot county / jurisdiction / agency scans over the
    // remaining elements. Each category claims at most one element (agencies
    // up to two, extras become notes) and a claimed element is out of play
    // for the other categories.
    let mut lc_county: Option<String> = None;
    let mut jurisdiction: Option<String> = None;
    let mut agencies: Vec<String> = Vec::new();
    for (i, element) in elements.iter().enumerate() {
        if claimed[i] {
            continue;
        }
        if lc_county.is_none() {
            if let Some(caps) = COUNTY_RE.captures(element) {
                lc_county = Some(caps[1].to_string());
                claimed[i] = true;
                continue;
            }
        }
        if jurisdiction.is_none() && STATEWIDE_RE.is_match(element) {
            jurisdiction = Some("Statewide".to_string());
            claimed[i] = true;
            continue;
        }
        if AGENCY_KEYWORD_RE.is_match(element) {
            claimed[i] = true;
            if agencies.len() < 2 {
                agencies.push(element.clone());
            } else {
                notes.push(element.clone());
            }
        }
    }
    let state_agency1 = agencies.first().cloned();
    let state_agency2 = agencies.get(1).cloned();

    // Step 6: venue fallback.
    let agency_case = !agencies.is_empty() || AGENCY_KEYWORD_RE.is_match(&case_name);
    if lc_venue.is_none() && agency_case {
        lc_venue = Some(Venue::Agency);
    }

    // Step 7: Supreme Court titles only — ask the external lookup to fill
    // fields the title left empty. Derived values are never overwritten.
    let mut state_agency1 = state_agency1;
    if decision.venue == "Supreme" {
        if let Some(lookup) = lookup {
            let short = elements.iter().enumerate().find_map(|(i, e)| {
                SHORT_DOCKET_RE
                    .find(e)
                    .map(|m| (i, m.as_str().to_uppercase()))
            });
            if let Some((i, short_docket)) = short {
                if let Some(found) = lookup.lookup(&short_docket, &case_name) {
                    claimed[i] = true;
                    if lc_docket_ids.is_empty() {
                        if let Some(app) = found.appellate_docket {
                            lc_docket_ids.push(app.to_uppercase());
                        }
                    }
                    if lc_county.is_none() {
                        lc_county = found.county;
                    }
                    if state_agency1.is_none() {
                        state_agency1 = found.agency;
                    }
                }
            }
        }
    }

    // Step 8: everything unclaimed becomes a note, in order.
    for (i, element) in elements.iter().enumerate() {
        if !claimed[i] {
            notes.push(element.clone());
        }
    }

    // Step 9: surface the primary agency in the case name.
    if let Some(agency) = &state_agency1 {
        if !case_name.to_uppercase().contains(&agency.to_uppercase()) {
            case_name = format!("{} ({})", case_name, agency);
        }
    }

    // Step 10: flag the gap for manual review instead of raising.
    let lc_venue = lc_venue.unwrap_or(Venue::Unknown);
    if lc_docket_ids.is_empty() && lc_venue != Venue::Agency {
        notes.push(LC_DOCKET_MISSING.to_string());
    }

    Ok(CaseRow {
        case_name,
        lc_docket_ids,
        lc_county,
        jurisdiction,
        state_agency1,
        state_agency2,
        case_notes: notes,
        is_consolidated,
        record_impounded,
        lc_venue: lc_venue.as_str().to_string(),
        lc_subtype,
        decision_code: decision.code.map(|c| c.to_string()),
        decision_label: decision.label.clone(),
        decision_venue: decision.venue.to_string(),
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::decision::classify;

    fn parse(raw: &str) -> CaseRow {
        parse_title(raw, &classify("Unpublished Appellate"), None).unwrap()
    }

    #[test]
    fn bare_title_no_parentheticals() {
        let row = parse("Smith v. Jones");
        assert_eq!(row.case_name, "Smith v. Jones");
        assert!(row.lc_docket_ids.is_empty());
        assert!(row.lc_county.is_none());
        assert!(row.state_agency1.is_none());
        assert!(row.state_agency2.is_none());
        assert_eq!(row.case_notes, vec!["[LC Docket Missing]"]);
        assert_eq!(row.lc_venue, "Unknown");
    }

    #[test]
    fn county_and_jurisdiction() {
        let row = parse("Smith v. Jones (Essex County) (Statewide)");
        assert_eq!(row.lc_county.as_deref(), Some("Essex County"));
        assert_eq!(row.jurisdiction.as_deref(), Some("Statewide"));
        assert!(row.case_notes.iter().all(|n| n != "Essex County"));
    }

    #[test]
    fn family_docket_sets_venue_and_subtype() {
        let row = parse("State v. Doe (FV-12-345-24)");
        assert_eq!(row.lc_venue, "Family");
        assert_eq!(row.lc_subtype.as_deref(), Some("Family Violence (FV)"));
        assert_eq!(row.lc_docket_ids, vec!["FV-12-345-24"]);
        assert!(row.case_notes.is_empty());
    }

    #[test]
    fn first_docket_wins_venue_all_retained() {
        let row = parse("In re Estate (L-0517-19 AND FM-07-889-18)");
        assert_eq!(row.lc_venue, "Law");
        assert_eq!(row.lc_subtype.as_deref(), Some("Civil Part"));
        assert_eq!(row.lc_docket_ids, vec!["L-0517-19", "FM-07-889-18"]);
    }

    #[test]
    fn record_impounded_flag_not_a_note() {
        let row = parse("N.J. Div. v. B.C. (RECORD IMPOUNDED) (FN-09-88-23)");
        assert!(row.record_impounded);
        assert!(row.case_notes.iter().all(|n| !n.contains("IMPOUNDED")));
    }

    #[test]
    fn consolidated_flag_and_resubmitted_note() {
        let row = parse("A v. B (CONSOLIDATED) (RESUBMITTED) (L-1111-20)");
        assert!(row.is_consolidated);
        assert_eq!(row.case_notes, vec!["RESUBMITTED"]);
    }

    #[test]
    fn agency_case_venue_and_name_suffix() {
        let row = parse("In re Ruiz (Department of Corrections)");
        assert_eq!(row.lc_venue, "Agency");
        assert_eq!(row.state_agency1.as_deref(), Some("Department of Corrections"));
        assert_eq!(row.case_name, "In re Ruiz (Department of Corrections)");
        // Agency cases do not get the missing-docket marker.
        assert!(row.case_notes.is_empty());
    }

    #[test]
    fn agency_already_in_case_name_not_duplicated() {
        let row = parse("In re Department of Corrections (Department of Corrections)");
        assert_eq!(row.case_name, "In re Department of Corrections");
    }

    #[test]
    fn two_agencies_then_notes() {
        let row = parse(
            "In re X (Department of Health, Board of Nursing, Bureau of Licensing)",
        );
        assert_eq!(row.state_agency1.as_deref(), Some("Department of Health"));
        assert_eq!(row.state_agency2.as_deref(), Some("Board of Nursing"));
        assert!(row
            .case_notes
            .iter()
            .any(|n| n == "Bureau of Licensing"));
    }

    #[test]
    fn unclaimed_elements_become_notes_in_order() {
        let row = parse("Smith v. Jones (On Remand, L-2211-20, Motion Granted)");
        assert_eq!(row.case_notes, vec!["On Remand", "Motion Granted"]);
    }

    #[test]
    fn element_claimed_once_per_category() {
        // The county element must not also be claimed as a note or agency.
        let row = parse("A v. B (Hudson County, Hudson County)");
        assert_eq!(row.lc_county.as_deref(), Some("Hudson County"));
        // Second county element is unclaimed (category already satisfied).
        assert!(row.case_notes.contains(&"Hudson County".to_string()));
    }

    #[test]
    fn no_case_name_is_structural_failure() {
        assert!(matches!(
            parse_title("", &classify("Appellate"), None),
            Err(ParseError::NoCaseName(_))
        ));
        assert!(matches!(
            parse_title("(L-1234-20)", &classify("Appellate"), None),
            Err(ParseError::NoCaseName(_))
        ));
    }

    #[test]
    fn determinism() {
        let raw = "State v. Doe (CONSOLIDATED) (Essex County, FV-12-345-24 AND FD-09-1-21)";
        let a = parse(raw);
        let b = parse(raw);
        assert_eq!(format!("{:?}", a), format!("{:?}", b));
    }

    struct FixedLookup;
    impl SupremeCourtLookup for FixedLookup {
        fn lookup(&self, short_docket: &str, _caption: &str) -> Option<SupremeCourtCase> {
            assert_eq!(short_docket, "A-73-21");
            Some(SupremeCourtCase {
                appellate_docket: Some("A-1204-19".to_string()),
                county: Some("Bergen County".to_string()),
                agency: None,
            })
        }
    }

    #[test]
    fn supreme_lookup_fills_only_empty_fields() {
        let decision = classify("Supreme Court");
        let row = parse_title("State v. Roe (A-73-21)", &decision, Some(&FixedLookup)).unwrap();
        assert_eq!(row.lc_docket_ids, vec!["A-1204-19"]);
        assert_eq!(row.lc_county.as_deref(), Some("Bergen County"));
        // Lookup-claimed element does not leak into notes.
        assert!(row.case_notes.iter().all(|n| n != "A-73-21"));
    }

    #[test]
    fn supreme_lookup_never_overwrites_title_values() {
        let decision = classify("Supreme Court");
        let row = parse_title(
            "State v. Roe (Essex County) (A-73-21)",
            &decision,
            Some(&FixedLookup),
        )
        .unwrap();
        assert_eq!(row.lc_county.as_deref(), Some("Essex County"));
    }

    #[test]
    fn non_supreme_never_calls_lookup() {
        struct Panics;
        impl SupremeCourtLookup for Panics {
            fn lookup(&self, _: &str, _: &str) -> Option<SupremeCourtCase> {
                panic!("lookup must not run for non-Supreme titles");
            }
        }
        let row = parse_title(
            "Smith v. Jones (A-73-21)",
            &classify("Unpublished Appellate"),
            Some(&Panics),
        )
        .unwrap();
        // Short docket is not a lower-court docket; it falls through to notes.
        assert!(row.case_notes.contains(&"A-73-21".to_string()));
    }
}
