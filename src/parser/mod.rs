pub mod calendar;
pub mod decision;
pub mod dockets;
pub mod judges;
pub mod titles;

use thiserror::Error;

use crate::db::CaseRow;
use titles::SupremeCourtLookup;

/// Structural failures only: one bad document is skipped, never a whole
/// batch. Degraded-but-parseable input produces Ok with marker notes.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("title has no recognizable case-name segment: {0:?}")]
    NoCaseName(String),
    #[error("calendar document has no agenda headers")]
    NoAgendaHeader,
}

/// Two-step title pipeline: badge → decision type, raw title → CaseRow.
pub fn process_title(
    badge: &str,
    raw_title: &str,
    lookup: Option<&dyn SupremeCourtLookup>,
) -> Result<CaseRow, ParseError> {
    let decision = decision::classify(badge);
    titles::parse_title(raw_title, &decision, lookup)
}

/// Calendar pipeline: the whole line stream of one document in, hearings out.
pub fn process_calendar(text: &str) -> Result<calendar::CalendarParse, ParseError> {
    calendar::parse_calendar(text)
}
