//! Configuration loading and typed config structures for the state engine.
//!
//! The configuration lives in `steppet-config.yaml` next to the host
//! binary. Every section is optional: a missing key takes the default shown
//! below, and a missing file yields [`EngineConfig::default`].
//!
//! ```yaml
//! pet:
//!   default_name: Sprout
//!   max_name_len: 20
//!   default_lineage: forest
//! battle:
//!   milestone_steps: 1000
//!   requirement_steps: 300
//!   duration_ms: 3600000
//! evolution:
//!   stages:
//!     - { stage: 0, title: Egg, min_steps: 0, max_steps: 2999 }
//!     - { stage: 1, title: Hatchling, min_steps: 3000, max_steps: 6499 }
//!     - { stage: 2, title: Companion, min_steps: 6500, max_steps: 9999 }
//!     - { stage: 3, title: Mythic, min_steps: 10000 }
//! lineages:
//!   - { key: forest, label: Forest Lineage, theme: moss }
//! storage:
//!   key: steppet_state_v1
//!   data_dir: .steppet
//! session:
//!   tick_interval_ms: 1000
//!   utc_offset_minutes: 0
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use steppet_types::{
    BattleState, DEFAULT_BATTLE_DURATION_MS, DEFAULT_BATTLE_REQUIREMENT, DEFAULT_LINEAGE,
    DEFAULT_MILESTONE_STEPS, DEFAULT_PET_NAME, LineageKey, MAX_NAME_LEN,
};

use crate::evolution::{EvolutionError, EvolutionTable, StageRule, default_stage_rules};
use crate::lineage::{LineageCatalog, LineageInfo, default_lineages};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The stage table does not partition the step range.
    #[error("invalid evolution table: {source}")]
    Evolution {
        /// The underlying table error.
        #[from]
        source: EvolutionError,
    },

    /// A value is out of range or inconsistent with another value.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Naming and lineage defaults.
    #[serde(default)]
    pub pet: PetConfig,

    /// Battle constants.
    #[serde(default)]
    pub battle: BattleConfig,

    /// Evolution stage table.
    #[serde(default)]
    pub evolution: EvolutionConfig,

    /// Lineage catalog.
    #[serde(default = "default_lineages")]
    pub lineages: Vec<LineageInfo>,

    /// Where and under which key the record is stored.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Host session settings.
    #[serde(default)]
    pub session: SessionConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pet: PetConfig::default(),
            battle: BattleConfig::default(),
            evolution: EvolutionConfig::default(),
            lineages: default_lineages(),
            storage: StorageConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override storage settings:
    /// - `STEPPET_DATA_DIR` overrides `storage.data_dir`
    /// - `STEPPET_STORAGE_KEY` overrides `storage.key`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Load from `path` if the file exists, otherwise use defaults.
    ///
    /// Environment overrides apply in both cases.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or parsed.
    pub fn from_file_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::from_file(path);
        }
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        let mut config = Self::default();
        config.storage.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.storage.apply_env_overrides();
        Ok(config)
    }

    /// Check cross-field consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] or [`ConfigError::Evolution`]
    /// describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| {
            Err(ConfigError::Invalid {
                reason: reason.to_owned(),
            })
        };

        if self.battle.milestone_steps == 0 {
            return invalid("battle.milestone_steps must be at least 1");
        }
        if self.battle.requirement_steps == 0 {
            return invalid("battle.requirement_steps must be at least 1");
        }
        if self.battle.duration_ms == 0 {
            return invalid("battle.duration_ms must be at least 1");
        }
        if self.session.tick_interval_ms == 0 {
            return invalid("session.tick_interval_ms must be at least 1");
        }
        if self.pet.max_name_len == 0 {
            return invalid("pet.max_name_len must be at least 1");
        }
        let default_name = self.pet.default_name.trim();
        if default_name.is_empty() || default_name.chars().count() > self.pet.max_name_len {
            return invalid("pet.default_name must be non-blank and within pet.max_name_len");
        }
        if self.storage.key.trim().is_empty() {
            return invalid("storage.key must not be empty");
        }

        let mut seen = BTreeSet::new();
        for lineage in &self.lineages {
            if lineage.key.trim().is_empty() {
                return invalid("lineage keys must not be empty");
            }
            if !seen.insert(lineage.key.as_str()) {
                return Err(ConfigError::Invalid {
                    reason: format!("duplicate lineage key: {}", lineage.key),
                });
            }
        }
        if !seen.contains(self.pet.default_lineage.as_str()) {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "pet.default_lineage {:?} is not in the lineage catalog",
                    self.pet.default_lineage
                ),
            });
        }

        EvolutionTable::new(self.evolution.stages.clone())?;
        Ok(())
    }

    /// Build the validated evolution table.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Evolution`] if the configured stages are invalid.
    pub fn evolution_table(&self) -> Result<EvolutionTable, ConfigError> {
        Ok(EvolutionTable::new(self.evolution.stages.clone())?)
    }

    /// Build the lineage catalog.
    pub fn lineage_catalog(&self) -> LineageCatalog {
        LineageCatalog::new(
            self.lineages.clone(),
            LineageKey::new(self.pet.default_lineage.clone()),
        )
    }
}

/// Naming and lineage defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PetConfig {
    /// Name used when the stored or supplied name is blank.
    #[serde(default = "default_pet_name")]
    pub default_name: String,

    /// Maximum name length in characters.
    #[serde(default = "default_max_name_len")]
    pub max_name_len: usize,

    /// Canonical lineage for new or unknown records.
    #[serde(default = "default_lineage")]
    pub default_lineage: String,
}

impl Default for PetConfig {
    fn default() -> Self {
        Self {
            default_name: default_pet_name(),
            max_name_len: default_max_name_len(),
            default_lineage: default_lineage(),
        }
    }
}

/// Battle constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct BattleConfig {
    /// Steps between two battle unlocks.
    #[serde(default = "default_milestone_steps")]
    pub milestone_steps: u64,

    /// Steps after the start needed to win.
    #[serde(default = "default_requirement_steps")]
    pub requirement_steps: u64,

    /// Wall-clock limit of a battle in milliseconds.
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,
}

impl BattleConfig {
    /// A fresh idle battle state carrying these constants.
    pub const fn idle_state(&self) -> BattleState {
        BattleState::idle(self.requirement_steps, self.milestone_steps, self.duration_ms)
    }
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            milestone_steps: default_milestone_steps(),
            requirement_steps: default_requirement_steps(),
            duration_ms: default_duration_ms(),
        }
    }
}

/// Evolution stage table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EvolutionConfig {
    /// Ordered stage rules.
    #[serde(default = "default_stage_rules")]
    pub stages: Vec<StageRule>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            stages: default_stage_rules(),
        }
    }
}

/// Persistence settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// Versioned key of the record blob.
    #[serde(default = "default_storage_key")]
    pub key: String,

    /// Directory holding the store files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl StorageConfig {
    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("STEPPET_DATA_DIR") {
            self.data_dir = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("STEPPET_STORAGE_KEY") {
            self.key = val;
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            key: default_storage_key(),
            data_dir: default_data_dir(),
        }
    }
}

/// Host session settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SessionConfig {
    /// Interval of the periodic battle recomputation.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Offset from UTC at which calendar days roll over.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            utc_offset_minutes: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions for serde
// ---------------------------------------------------------------------------

fn default_pet_name() -> String {
    DEFAULT_PET_NAME.to_owned()
}

const fn default_max_name_len() -> usize {
    MAX_NAME_LEN
}

fn default_lineage() -> String {
    DEFAULT_LINEAGE.to_owned()
}

const fn default_milestone_steps() -> u64 {
    DEFAULT_MILESTONE_STEPS
}

const fn default_requirement_steps() -> u64 {
    DEFAULT_BATTLE_REQUIREMENT
}

const fn default_duration_ms() -> u64 {
    DEFAULT_BATTLE_DURATION_MS
}

fn default_storage_key() -> String {
    "steppet_state_v1".to_owned()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".steppet")
}

const fn default_tick_interval_ms() -> u64 {
    1000
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.battle.milestone_steps, 1000);
        assert_eq!(config.battle.requirement_steps, 300);
        assert_eq!(config.battle.duration_ms, 3_600_000);
        assert_eq!(config.session.tick_interval_ms, 1000);
        assert_eq!(config.pet.default_name, "Sprout");
        assert_eq!(config.evolution.stages.len(), 4);
    }

    #[test]
    fn parse_partial_yaml_keeps_defaults() {
        let yaml = r"
battle:
  requirement_steps: 500
pet:
  default_name: Pebble
";
        let config = EngineConfig::parse(yaml).unwrap();
        assert_eq!(config.battle.requirement_steps, 500);
        assert_eq!(config.battle.milestone_steps, 1000);
        assert_eq!(config.pet.default_name, "Pebble");
        assert_eq!(config.pet.default_lineage, "forest");
        assert_eq!(config.lineages.len(), 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_custom_stage_table() {
        let yaml = r"
evolution:
  stages:
    - { stage: 0, title: Seed, min_steps: 0, max_steps: 499 }
    - { stage: 1, title: Tree, min_steps: 500 }
";
        let config = EngineConfig::parse(yaml).unwrap();
        let table = config.evolution_table().unwrap();
        assert_eq!(table.stage_for(499), 0);
        assert_eq!(table.stage_for(500), 1);
        assert_eq!(table.title_for(1), "Tree");
    }

    #[test]
    fn invalid_stage_table_is_rejected() {
        let yaml = r"
evolution:
  stages:
    - { stage: 0, title: Seed, min_steps: 10 }
";
        let config = EngineConfig::parse(yaml).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Evolution { .. })
        ));
    }

    #[test]
    fn zero_battle_constants_are_rejected() {
        let mut config = EngineConfig::default();
        config.battle.milestone_steps = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));

        let mut config = EngineConfig::default();
        config.battle.duration_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_lineage_must_exist() {
        let mut config = EngineConfig::default();
        config.pet.default_lineage = "void".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("void"));
    }

    #[test]
    fn duplicate_lineage_keys_are_rejected() {
        let mut config = EngineConfig::default();
        let first = config.lineages.first().cloned().unwrap();
        config.lineages.push(first);
        assert!(config.validate().is_err());
    }

    #[test]
    fn blank_default_name_is_rejected() {
        let mut config = EngineConfig::default();
        config.pet.default_name = "   ".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let result = EngineConfig::parse("battle: [unclosed");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = std::env::temp_dir().join("steppet-no-such-config.yaml");
        let config = EngineConfig::from_file_or_default(&path).unwrap();
        assert_eq!(config.battle, BattleConfig::default());
    }

    #[test]
    fn idle_state_carries_constants() {
        let battle = BattleConfig {
            milestone_steps: 10,
            requirement_steps: 3,
            duration_ms: 99,
        };
        let state = battle.idle_state();
        assert_eq!(state.milestone_target, 10);
        assert_eq!(state.requirement_steps, 3);
        assert_eq!(state.duration_ms, 99);
        assert!(!state.available);
    }
}
