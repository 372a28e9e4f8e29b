//! The lineage catalog: cosmetic families a companion can belong to.
//!
//! Lineages have no effect on numeric logic. The engine only needs to
//! guarantee that a record always names a lineage that exists, falling back
//! to the catalog's canonical default for unknown or blank keys.

use serde::Deserialize;
use steppet_types::{DEFAULT_LINEAGE, LineageKey};

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LineageInfo {
    /// Key stored in the record.
    pub key: String,
    /// Human-readable label.
    pub label: String,
    /// Presentation theme identifier.
    #[serde(default)]
    pub theme: String,
    /// Short flavour text.
    #[serde(default)]
    pub description: String,
}

/// A catalog of lineages with a canonical default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineageCatalog {
    entries: Vec<LineageInfo>,
    default_key: LineageKey,
}

impl LineageCatalog {
    /// Build a catalog. The caller guarantees `default_key` is one of the
    /// entries (see `EngineConfig::validate`).
    pub const fn new(entries: Vec<LineageInfo>, default_key: LineageKey) -> Self {
        Self {
            entries,
            default_key,
        }
    }

    /// All entries in catalog order.
    pub fn entries(&self) -> &[LineageInfo] {
        &self.entries
    }

    /// The canonical default lineage.
    pub const fn default_key(&self) -> &LineageKey {
        &self.default_key
    }

    /// Look up an entry by key.
    pub fn get(&self, key: &str) -> Option<&LineageInfo> {
        self.entries.iter().find(|entry| entry.key == key)
    }

    /// Whether `key` names a catalog entry.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Return `key` (trimmed) if it is known, otherwise the default.
    pub fn resolve(&self, key: &str) -> LineageKey {
        let trimmed = key.trim();
        if self.contains(trimmed) {
            LineageKey::new(trimmed)
        } else {
            self.default_key.clone()
        }
    }

    /// The entry for `key`, falling back to the default entry.
    pub fn info_or_default(&self, key: &LineageKey) -> Option<&LineageInfo> {
        self.get(key.as_str())
            .or_else(|| self.get(self.default_key.as_str()))
    }
}

impl Default for LineageCatalog {
    fn default() -> Self {
        Self::new(default_lineages(), LineageKey::new(DEFAULT_LINEAGE))
    }
}

/// The built-in catalog.
pub fn default_lineages() -> Vec<LineageInfo> {
    let entry = |key: &str, label: &str, theme: &str, description: &str| LineageInfo {
        key: key.to_owned(),
        label: label.to_owned(),
        theme: theme.to_owned(),
        description: description.to_owned(),
    };
    vec![
        entry(
            DEFAULT_LINEAGE,
            "Forest Lineage",
            "moss",
            "Sprouts among the roots and grows with every woodland walk.",
        ),
        entry(
            "ocean",
            "Ocean Lineage",
            "tide",
            "Born from sea foam, it follows the rhythm of your stride like waves.",
        ),
        entry(
            "ember",
            "Ember Lineage",
            "flame",
            "A spark that burns brighter the farther you roam.",
        ),
        entry(
            "sky",
            "Sky Lineage",
            "cloud",
            "Rides the wind above your route and dreams of the summit.",
        ),
    ]
}
