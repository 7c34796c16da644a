use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::{Regex, RegexBuilder};

use crate::db::HearingRow;
use crate::parser::dockets::find_dockets;
use crate::parser::judges::parse_judges_line;
use crate::parser::ParseError;

static AGENDA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^AGENDA:\s*(.+?),\s*PART\s+(\S+)\s*$").unwrap());
static ITEM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)[.\s]\s*(.+)$").unwrap());
static ITEM_START_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+[.\s]").unwrap());
static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d{1,2}:\d{2}(?:\s*(?:A\.?M\.?|P\.?M\.?))?").unwrap()
});
static CONSOL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bconsol[a-z]*\.?").unwrap());
static WEEKDAY_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:MON|TUES|WEDNES|THURS|FRI|SATUR|SUN)DAY,?\s*").unwrap()
});
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

const AGENDA_DATE_MISSING: &str = "[Agenda Date Missing]";

/// Which argument sub-section the cursor is inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArgSection {
    None,
    Oral,
    Submission,
}

/// Consolidation block pending flush. Snapshots its own context when opened
/// so it can be flushed correctly even across an agenda boundary reset.
struct ConsolBlock {
    dockets: Vec<String>,
    caption: String,
    time: Option<String>,
    judges: Vec<String>,
    date: Option<NaiveDate>,
    part: String,
    location: String,
    oral: bool,
    item: i64,
}

/// Session-scoped carry-over state, owned by exactly one parse call.
struct ParserContext {
    date: Option<NaiveDate>,
    part: String,
    location: String,
    part_judges: Vec<String>,
    case_judges: Option<Vec<String>>,
    section: ArgSection,
    last_item: i64,
    block: Option<ConsolBlock>,
}

impl ParserContext {
    fn new() -> Self {
        Self {
            date: None,
            part: String::new(),
            location: String::new(),
            part_judges: Vec::new(),
            case_judges: None,
            section: ArgSection::None,
            last_item: 0,
            block: None,
        }
    }

    fn judges(&self) -> Vec<String> {
        self.case_judges
            .clone()
            .unwrap_or_else(|| self.part_judges.clone())
    }
}

/// Result of parsing one calendar document.
pub struct CalendarParse {
    pub hearings: Vec<HearingRow>,
    pub calendar_id: String,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub weekdays: BTreeSet<String>,
    pub warnings: Vec<String>,
}

/// Parse the full line stream of one calendar document.
///
/// A document with no agenda header at all is a structural failure; a
/// document with headers but no items is a valid empty result.
pub fn parse_calendar(text: &str) -> Result<CalendarParse, ParseError> {
    let lines: Vec<&str> = text.lines().collect();
    let mut ctx = ParserContext::new();
    let mut hearings: Vec<HearingRow> = Vec::new();
    let mut emitted_plain: HashSet<String> = HashSet::new();
    let mut weekdays: BTreeSet<String> = BTreeSet::new();
    let mut warnings: Vec<String> = Vec::new();
    let mut first_date: Option<NaiveDate> = None;
    let mut last_date: Option<NaiveDate> = None;
    let mut saw_agenda = false;

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim();
        let upper = line.to_uppercase();

        // ── Agenda header: flush-then-reset section state ──
        if let Some(caps) = AGENDA_RE.captures(line) {
            saw_agenda = true;
            // The open block still belongs to the previous session; flush it
            // with its own snapshotted context before anything resets.
            flush_block(&mut ctx.block, &mut hearings);
            ctx.section = ArgSection::None;
            ctx.case_judges = None;
            ctx.last_item = 0;

            ctx.date = parse_agenda_date(&caps[1]);
            match ctx.date {
                Some(d) => {
                    weekdays.insert(d.format("%A").to_string());
                    first_date = Some(first_date.map_or(d, |f| f.min(d)));
                    last_date = Some(last_date.map_or(d, |l| l.max(d)));
                }
                None => warnings.push(AGENDA_DATE_MISSING.to_string()),
            }
            ctx.part = caps[2].to_uppercase();

            // Look ahead for a location line and a part-level JUDGES: line;
            // both are consumed here rather than dispatched separately.
            let mut j = i + 1;
            let mut took_location = false;
            while j < lines.len() && j <= i + 2 {
                let next = lines[j].trim();
                if next.is_empty()
                    || AGENDA_RE.is_match(next)
                    || ITEM_START_RE.is_match(next)
                {
                    break;
                }
                if let Some(names) = parse_judges_line(next) {
                    ctx.part_judges = names;
                    j += 1;
                    continue;
                }
                if took_location || is_section_marker(&next.to_uppercase()) {
                    break;
                }
                ctx.location = next.to_string();
                took_location = true;
                j += 1;
            }
            i = j;
            continue;
        }

        // ── Section markers, one-shot per agenda block ──
        if upper.contains("ORAL ARGUMENT") {
            if ctx.section == ArgSection::None {
                ctx.section = ArgSection::Oral;
            }
            i += 1;
            continue;
        }
        if upper.contains("WAIVER") && !upper.contains("WAIVER CALENDAR") {
            if ctx.section == ArgSection::None {
                ctx.section = ArgSection::Submission;
            }
            i += 1;
            continue;
        }

        // ── JUDGES: override ──
        if let Some(names) = parse_judges_line(line) {
            if ctx.section == ArgSection::None {
                ctx.part_judges = names;
            } else {
                ctx.case_judges = Some(names);
            }
            i += 1;
            continue;
        }

        // ── Item line: leading integer plus a docket pattern ──
        if let Some((item, rest)) = split_item_line(line) {
            let refs = find_dockets(rest);
            if let Some(first) = refs.first() {
                let docket = first.docket.clone();

                // A non-increasing item number signals a new section's
                // numbering: abandon (never flush) any open block. A
                // consolidated companion sharing the open block's item
                // number is not a restart.
                let is_consol = CONSOL_RE.is_match(rest);
                let companion = is_consol
                    && ctx.block.as_ref().is_some_and(|b| b.item == item);
                if item <= ctx.last_item && !companion {
                    ctx.block = None;
                }
                ctx.last_item = item;

                let oral = ctx.section == ArgSection::Oral;
                let mut caption = strip_first(rest, &docket);
                let span = if oral {
                    TIME_RE.find(&caption).map(|m| (m.start(), m.end()))
                } else {
                    None
                };
                let time = span.map(|(start, end)| {
                    let t = caption[start..end].to_string();
                    caption.replace_range(start..end, " ");
                    t
                });
                caption = CONSOL_RE.replace_all(&caption, " ").to_string();

                // Caption continues on subsequent lines until a boundary.
                let mut j = i + 1;
                while j < lines.len() {
                    let cont = lines[j].trim();
                    if cont.is_empty()
                        || AGENDA_RE.is_match(cont)
                        || is_section_marker(&cont.to_uppercase())
                        || parse_judges_line(cont).is_some()
                        || ITEM_START_RE.is_match(cont)
                        || !find_dockets(cont).is_empty()
                    {
                        break;
                    }
                    caption.push(' ');
                    caption.push_str(cont);
                    j += 1;
                }
                let caption = WS_RE
                    .replace_all(&caption, " ")
                    .trim_matches(|c: char| c.is_whitespace() || c == '-')
                    .to_string();

                if is_consol {
                    match ctx.block.as_mut() {
                        Some(block) => block.dockets.push(docket),
                        None => {
                            ctx.block = Some(ConsolBlock {
                                dockets: vec![docket],
                                caption,
                                time,
                                judges: ctx.judges(),
                                date: ctx.date,
                                part: ctx.part.clone(),
                                location: ctx.location.clone(),
                                oral,
                                item,
                            });
                        }
                    }
                } else {
                    flush_block(&mut ctx.block, &mut hearings);
                    // A docket already emitted non-consolidated is never
                    // emitted again within the same document.
                    if emitted_plain.insert(docket.clone()) {
                        hearings.push(HearingRow {
                            calendar_id: String::new(),
                            hearing_date: ctx.date,
                            hearing_time: time,
                            court_part: ctx.part.clone(),
                            location: ctx.location.clone(),
                            oral_argument: oral,
                            item_number: item,
                            app_docket_id: docket,
                            linked_docket_ids: Vec::new(),
                            case_name: caption,
                            assigned_judges: ctx.judges(),
                            is_consolidated: false,
                        });
                    }
                }
                i = j;
                continue;
            }
        }

        i += 1;
    }

    // End of document: a still-open block is flushed with its last context.
    flush_block(&mut ctx.block, &mut hearings);

    if !saw_agenda {
        return Err(ParseError::NoAgendaHeader);
    }

    let calendar_id = match (first_date, last_date) {
        (Some(f), Some(l)) => format!("{}_{}", f.format("%Y-%m-%d"), l.format("%Y-%m-%d")),
        _ => "undated".to_string(),
    };
    for h in &mut hearings {
        h.calendar_id = calendar_id.clone();
    }

    Ok(CalendarParse {
        hearings,
        calendar_id,
        first_date,
        last_date,
        weekdays,
        warnings,
    })
}

/// Emit one HearingRow per docket in the open block, each cross-listing the
/// block's other dockets and sharing the first caption/time/judges.
fn flush_block(block: &mut Option<ConsolBlock>, out: &mut Vec<HearingRow>) {
    let Some(b) = block.take() else { return };
    for (idx, docket) in b.dockets.iter().enumerate() {
        let linked: Vec<String> = b
            .dockets
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != idx)
            .map(|(_, d)| d.clone())
            .collect();
        out.push(HearingRow {
            calendar_id: String::new(),
            hearing_date: b.date,
            hearing_time: b.time.clone(),
            court_part: b.part.clone(),
            location: b.location.clone(),
            oral_argument: b.oral,
            item_number: b.item,
            app_docket_id: docket.clone(),
            linked_docket_ids: linked,
            case_name: b.caption.clone(),
            assigned_judges: b.judges.clone(),
            is_consolidated: true,
        });
    }
}

fn is_section_marker(upper: &str) -> bool {
    upper.contains("ORAL ARGUMENT")
        || (upper.contains("WAIVER") && !upper.contains("WAIVER CALENDAR"))
}

fn split_item_line(line: &str) -> Option<(i64, &str)> {
    let caps = ITEM_RE.captures(line)?;
    let item = caps.get(1)?.as_str().parse::<i64>().ok()?;
    Some((item, caps.get(2)?.as_str()))
}

/// Remove the first occurrence of `needle` (case-insensitive) from `hay`.
fn strip_first(hay: &str, needle: &str) -> String {
    let re = RegexBuilder::new(&regex::escape(needle))
        .case_insensitive(true)
        .build()
        .unwrap();
    re.replace(hay, " ").to_string()
}

/// Agenda dates arrive as "MONDAY, MARCH 4, 2024" or "03/04/2024".
fn parse_agenda_date(raw: &str) -> Option<NaiveDate> {
    let s = WEEKDAY_PREFIX_RE.replace(raw.trim(), "");
    let s = title_case(s.trim());
    NaiveDate::parse_from_str(&s, "%B %d, %Y")
        .or_else(|_| NaiveDate::parse_from_str(&s, "%m/%d/%Y"))
        .or_else(|_| NaiveDate::parse_from_str(&s, "%m/%d/%y"))
        .ok()
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Tests ──
