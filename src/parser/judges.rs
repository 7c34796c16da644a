use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static HON_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^hon\.?\s+").unwrap());
static TA_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i),?\s*t/a\s*$").unwrap());
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static JUDGES_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^JUDGES?:\s*(.*)$").unwrap());

/// Clean one judge-name token: strip a leading "Hon.", a trailing ", t/a"
/// (temporary assignment), and collapse internal whitespace.
pub fn normalize_judge(raw: &str) -> String {
    let s = HON_PREFIX_RE.replace(raw.trim(), "");
    let s = TA_SUFFIX_RE.replace(&s, "");
    WS_RE.replace_all(s.trim(), " ").to_string()
}

/// If `line` is a `JUDGES:` line, return its normalized comma-separated
/// names; otherwise None.
pub fn parse_judges_line(line: &str) -> Option<Vec<String>> {
    let caps = JUDGES_LINE_RE.captures(line.trim())?;
    Some(
        caps[1]
            .split(',')
            .map(normalize_judge)
            .filter(|n| !n.is_empty())
            .collect(),
    )
}

/// Read-only set of known judge names, loaded once at startup and shared by
/// reference. The parser never validates against it; the report step diffs
/// parser output against this roster.
pub struct JudgeRoster {
    names: HashSet<String>,
}

impl JudgeRoster {
    pub fn from_names<I: IntoIterator<Item = String>>(names: I) -> Self {
        Self {
            names: names.into_iter().map(|n| normalize_judge(&n)).collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names present in `seen` but absent from the roster, sorted.
    pub fn unknown<'a, I: IntoIterator<Item = &'a str>>(&self, seen: I) -> Vec<String> {
        let mut out: Vec<String> = seen
            .into_iter()
            .filter(|n| !n.is_empty() && !self.contains(n))
            .map(|n| n.to_string())
            .collect();
        out.sort();
        out.dedup();
        out
    }
}

// ── Tests ──
