use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::parser::titles::{SupremeCourtCase, SupremeCourtLookup};

/// Where the Supreme Court index lives by default. Keyed by short docket
/// ("A-73-21"), values carry the appellate docket / county / agency the
/// announcement title omits.
pub const INDEX_PATH: &str = "data/supreme_index.json";

pub struct IndexLookup {
    entries: HashMap<String, SupremeCourtCase>,
}

impl IndexLookup {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: HashMap<String, SupremeCourtCase> =
            serde_json::from_str(json).context("Failed to parse Supreme Court index")?;
        let entries = raw
            .into_iter()
            .map(|(k, v)| (k.trim().to_uppercase(), v))
            .collect();
        Ok(Self { entries })
    }

    /// Missing index file is not an error: Supreme titles just keep their
    /// gaps and the short docket lands in notes.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            warn!("No Supreme Court index at {}; lookups skipped", path.display());
            return Ok(None);
        }
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let lookup = Self::from_json_str(&json)?;
        info!("Loaded Supreme Court index: {} entries", lookup.entries.len());
        Ok(Some(lookup))
    }
}

impl SupremeCourtLookup for IndexLookup {
    fn lookup(&self, short_docket: &str, _caption: &str) -> Option<SupremeCourtCase> {
        self.entries.get(&short_docket.to_uppercase()).cloned()
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_normalized_to_uppercase() {
        let lookup = IndexLookup::from_json_str(
            r#"{"a-73-21": {"appellate_docket": "A-1204-19", "county": "Bergen County", "agency": null}}"#,
        )
        .unwrap();
        let hit = lookup.lookup("A-73-21", "STATE V. ROE").unwrap();
        assert_eq!(hit.appellate_docket.as_deref(), Some("A-1204-19"));
        assert_eq!(hit.county.as_deref(), Some("Bergen County"));
        assert!(hit.agency.is_none());
        assert!(lookup.lookup("A-99-21", "").is_none());
    }

    #[test]
    fn missing_index_file_is_none() {
        let loaded = IndexLookup::load(Path::new("data/does_not_exist.json")).unwrap();
        assert!(loaded.is_none());
    }
}
