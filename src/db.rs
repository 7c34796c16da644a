use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::Connection;

use crate::parser::calendar::CalendarParse;

const DB_PATH: &str = "data/njcourts.sqlite";

pub fn connect() -> Result<Connection> {
    if let Some(dir) = std::path::Path::new(DB_PATH).parent() {
        std::fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(DB_PATH)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

#[cfg(test)]
pub fn connect_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS documents (
            id         INTEGER PRIMARY KEY,
            kind       TEXT NOT NULL CHECK(kind IN ('opinions','calendar')),
            source     TEXT NOT NULL,
            body       TEXT NOT NULL,
            fetched_at TEXT NOT NULL DEFAULT (datetime('now')),
            processed  BOOLEAN NOT NULL DEFAULT 0,
            error      TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_documents_pending ON documents(processed, kind);

        CREATE TABLE IF NOT EXISTS cases (
            id               INTEGER PRIMARY KEY,
            document_id      INTEGER REFERENCES documents(id),
            case_name        TEXT NOT NULL,
            decision_code    TEXT,
            decision_label   TEXT NOT NULL,
            decision_venue   TEXT NOT NULL,
            lc_docket_ids    TEXT NOT NULL DEFAULT '',
            lc_county        TEXT,
            jurisdiction     TEXT,
            state_agency1    TEXT,
            state_agency2    TEXT,
            case_notes       TEXT NOT NULL DEFAULT '',
            is_consolidated  BOOLEAN NOT NULL DEFAULT 0,
            record_impounded BOOLEAN NOT NULL DEFAULT 0,
            lc_venue         TEXT NOT NULL,
            lc_subtype       TEXT,
            created_at       TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(case_name, lc_docket_ids)
        );
        CREATE INDEX IF NOT EXISTS idx_cases_venue ON cases(lc_venue);

        CREATE TABLE IF NOT EXISTS calendars (
            calendar_id   TEXT PRIMARY KEY,
            first_date    TEXT,
            last_date     TEXT,
            weekdays      TEXT NOT NULL DEFAULT '',
            hearing_count INTEGER NOT NULL DEFAULT 0,
            warnings      TEXT NOT NULL DEFAULT '',
            processed_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS hearings (
            id                INTEGER PRIMARY KEY,
            calendar_id       TEXT NOT NULL REFERENCES calendars(calendar_id),
            hearing_date      TEXT,
            hearing_time      TEXT,
            court_part        TEXT NOT NULL DEFAULT '',
            location          TEXT NOT NULL DEFAULT '',
            oral_argument     BOOLEAN NOT NULL DEFAULT 0,
            item_number       INTEGER NOT NULL,
            app_docket_id     TEXT NOT NULL,
            linked_docket_ids TEXT NOT NULL DEFAULT '',
            case_name         TEXT NOT NULL DEFAULT '',
            assigned_judges   TEXT NOT NULL DEFAULT '',
            is_consolidated   BOOLEAN NOT NULL DEFAULT 0,
            UNIQUE(calendar_id, item_number, app_docket_id)
        );
        CREATE INDEX IF NOT EXISTS idx_hearings_docket ON hearings(app_docket_id);

        CREATE TABLE IF NOT EXISTS judges (
            name TEXT PRIMARY KEY
        );
        ",
    )?;
    Ok(())
}

// ── Parsed records ──

/// One normalized case announcement, ready for storage.
#[derive(Debug, Clone)]
pub struct CaseRow {
    pub case_name: String,
    pub lc_docket_ids: Vec<String>,
    pub lc_county: Option<String>,
    pub jurisdiction: Option<String>,
    pub state_agency1: Option<String>,
    pub state_agency2: Option<String>,
    pub case_notes: Vec<String>,
    pub is_consolidated: bool,
    pub record_impounded: bool,
    pub lc_venue: String,
    pub lc_subtype: Option<String>,
    pub decision_code: Option<String>,
    pub decision_label: String,
    pub decision_venue: String,
}

/// One calendar line item, ready for storage.
#[derive(Debug, Clone)]
pub struct HearingRow {
    pub calendar_id: String,
    pub hearing_date: Option<NaiveDate>,
    pub hearing_time: Option<String>,
    pub court_part: String,
    pub location: String,
    pub oral_argument: bool,
    pub item_number: i64,
    pub app_docket_id: String,
    pub linked_docket_ids: Vec<String>,
    pub case_name: String,
    pub assigned_judges: Vec<String>,
    pub is_consolidated: bool,
}

// ── Document queue ──

pub struct PendingDocument {
    pub id: i64,
    pub kind: String,
    pub source: String,
    pub body: String,
}

pub fn insert_document(conn: &Connection, kind: &str, source: &str, body: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO documents (kind, source, body) VALUES (?1, ?2, ?3)",
        rusqlite::params![kind, source, body],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn fetch_unprocessed(conn: &Connection, limit: Option<usize>) -> Result<Vec<PendingDocument>> {
    let sql = format!(
        "SELECT id, kind, source, body FROM documents WHERE processed = 0 ORDER BY id{}",
        match limit {
            Some(n) => format!(" LIMIT {}", n),
            None => String::new(),
        }
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(PendingDocument {
                id: row.get(0)?,
                kind: row.get(1)?,
                source: row.get(2)?,
                body: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn mark_processed(conn: &Connection, id: i64, error: Option<&str>) -> Result<()> {
    conn.execute(
        "UPDATE documents SET processed = 1, error = ?2 WHERE id = ?1",
        rusqlite::params![id, error],
    )?;
    Ok(())
}

// ── Saving parsed records ──

pub fn save_cases(conn: &Connection, document_id: i64, rows: &[CaseRow]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO cases
             (document_id, case_name, decision_code, decision_label, decision_venue,
              lc_docket_ids, lc_county, jurisdiction, state_agency1, state_agency2,
              case_notes, is_consolidated, record_impounded, lc_venue, lc_subtype)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15)",
        )?;
        for r in rows {
            stmt.execute(rusqlite::params![
                document_id,
                r.case_name,
                r.decision_code,
                r.decision_label,
                r.decision_venue,
                r.lc_docket_ids.join(", "),
                r.lc_county,
                r.jurisdiction,
                r.state_agency1,
                r.state_agency2,
                r.case_notes.join("; "),
                r.is_consolidated,
                r.record_impounded,
                r.lc_venue,
                r.lc_subtype,
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

pub fn save_calendar(conn: &Connection, parsed: &CalendarParse) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let weekdays: Vec<&str> = parsed.weekdays.iter().map(String::as_str).collect();
        tx.execute(
            "INSERT OR REPLACE INTO calendars
             (calendar_id, first_date, last_date, weekdays, hearing_count, warnings)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                parsed.calendar_id,
                parsed.first_date.map(|d| d.to_string()),
                parsed.last_date.map(|d| d.to_string()),
                weekdays.join(", "),
                parsed.hearings.len() as i64,
                parsed.warnings.join("; "),
            ],
        )?;

        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO hearings
             (calendar_id, hearing_date, hearing_time, court_part, location, oral_argument,
              item_number, app_docket_id, linked_docket_ids, case_name, assigned_judges,
              is_consolidated)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)",
        )?;
        for h in &parsed.hearings {
            stmt.execute(rusqlite::params![
                h.calendar_id,
                h.hearing_date.map(|d| d.to_string()),
                h.hearing_time,
                h.court_part,
                h.location,
                h.oral_argument,
                h.item_number,
                h.app_docket_id,
                h.linked_docket_ids.join(", "),
                h.case_name,
                h.assigned_judges.join("; "),
                h.is_consolidated,
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

// ── Judge roster ──

pub fn insert_judges(conn: &Connection, names: &[String]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare("INSERT OR IGNORE INTO judges (name) VALUES (?1)")?;
        for name in names {
            count += stmt.execute(rusqlite::params![name])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub fn load_judge_roster(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM judges ORDER BY name")?;
    let rows = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(rows)
}

/// Joined judge strings from every stored hearing, for the roster diff.
pub fn fetch_assigned_judges(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT assigned_judges FROM hearings WHERE assigned_judges != ''")?;
    let rows = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub documents: usize,
    pub pending: usize,
    pub failed: usize,
    pub cases: usize,
    pub calendars: usize,
    pub hearings: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let documents: usize = conn.query_row("SELECT COUNT(*) FROM documents", [], |r| r.get(0))?;
    let pending: usize = conn.query_row(
        "SELECT COUNT(*) FROM documents WHERE processed = 0",
        [],
        |r| r.get(0),
    )?;
    let failed: usize = conn.query_row(
        "SELECT COUNT(*) FROM documents WHERE error IS NOT NULL",
        [],
        |r| r.get(0),
    )?;
    let cases: usize = conn.query_row("SELECT COUNT(*) FROM cases", [], |r| r.get(0))?;
    let calendars: usize = conn.query_row("SELECT COUNT(*) FROM calendars", [], |r| r.get(0))?;
    let hearings: usize = conn.query_row("SELECT COUNT(*) FROM hearings", [], |r| r.get(0))?;
    Ok(Stats {
        documents,
        pending,
        failed,
        cases,
        calendars,
        hearings,
    })
}

// ── Tests ──
