//! The validated rule set every component shares.
//!
//! [`PetRules`] is built once from an [`EngineConfig`] at startup and then
//! handed to the repository, the ingestor, and the session. It owns the
//! evolution table, the lineage catalog, and the naming and battle
//! constants, and knows how to bring an arbitrary record back within the
//! invariants those imply.

use chrono::{DateTime, Utc};
use steppet_types::{LineageKey, PetRecord};
use tracing::debug;

use crate::config::{BattleConfig, ConfigError, EngineConfig, PetConfig};
use crate::evolution::EvolutionTable;
use crate::lineage::LineageCatalog;

/// Naming, lineage, evolution and battle rules derived from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PetRules {
    pet: PetConfig,
    battle: BattleConfig,
    table: EvolutionTable,
    catalog: LineageCatalog,
}

impl PetRules {
    /// Validate `config` and build the rule set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration fails validation.
    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            pet: config.pet.clone(),
            battle: config.battle,
            table: config.evolution_table()?,
            catalog: config.lineage_catalog(),
        })
    }

    /// The evolution table.
    pub const fn table(&self) -> &EvolutionTable {
        &self.table
    }

    /// The lineage catalog.
    pub const fn catalog(&self) -> &LineageCatalog {
        &self.catalog
    }

    /// Battle constants.
    pub const fn battle(&self) -> &BattleConfig {
        &self.battle
    }

    /// Naming defaults.
    pub const fn pet(&self) -> &PetConfig {
        &self.pet
    }

    /// A record as it looks on first launch.
    pub fn fresh_record(&self) -> PetRecord {
        PetRecord {
            name: self.pet.default_name.trim().to_owned(),
            lineage_key: self.catalog.default_key().clone(),
            evolution_stage: self.table.stage_for(0),
            battle: self.battle.idle_state(),
            ..PetRecord::default()
        }
    }

    /// Clean up a user-supplied name: trim it, keep at most
    /// `max_name_len` characters, and fall back to the default when blank.
    pub fn normalize_name(&self, raw: &str) -> String {
        let truncated: String = raw.trim().chars().take(self.pet.max_name_len).collect();
        let name = truncated.trim_end();
        if name.is_empty() {
            self.pet.default_name.trim().to_owned()
        } else {
            name.to_owned()
        }
    }

    /// Resolve a lineage key against the catalog.
    pub fn resolve_lineage(&self, raw: &str) -> LineageKey {
        self.catalog.resolve(raw)
    }

    /// Bring `record` within the record invariants.
    ///
    /// Rewrites the name and lineage, installs the configured battle
    /// constants, recomputes the evolution stage, and repairs battle fields
    /// that contradict each other. A running battle with no start time is
    /// treated as having started at `now`.
    pub fn normalize(&self, record: &mut PetRecord, now: DateTime<Utc>) {
        record.name = self.normalize_name(&record.name);
        record.lineage_key = self.resolve_lineage(record.lineage_key.as_str());
        record.evolution_stage = self.table.stage_for(record.steps_today);

        let battle = &mut record.battle;
        battle.requirement_steps = self.battle.requirement_steps;
        battle.milestone_target = self.battle.milestone_steps;
        battle.duration_ms = self.battle.duration_ms;

        if let Some(start) = battle.start_steps_today {
            if start > record.steps_today {
                debug!(start, steps_today = record.steps_today, "clamping battle start steps");
                battle.start_steps_today = Some(record.steps_today);
            }
            if battle.start_time.is_none() {
                debug!("running battle had no start time, restarting its clock");
                battle.start_time = Some(now);
            }
            battle.available = false;
            battle.result = None;
            battle.last_remaining_steps = None;
        } else {
            battle.start_time = None;
            if battle.result.is_some() {
                battle.available = false;
            } else {
                battle.last_remaining_steps = None;
            }
        }
    }
}

impl Default for PetRules {
    fn default() -> Self {
        let EngineConfig { pet, battle, .. } = EngineConfig::default();
        Self {
            pet,
            battle,
            table: EvolutionTable::default(),
            catalog: LineageCatalog::default(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use steppet_types::BattleResult;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 9, 30, 0).unwrap()
    }

    #[test]
    fn fresh_record_uses_configured_defaults() {
        let rules = PetRules::default();
        let record = rules.fresh_record();
        assert_eq!(record.name, "Sprout");
        assert_eq!(record.lineage_key.as_str(), "forest");
        assert_eq!(record.battle.requirement_steps, 300);
        assert_eq!(record.battle.milestone_target, 1000);
        assert!(record.last_updated_date.is_none());
    }

    #[test]
    fn names_are_trimmed_truncated_and_defaulted() {
        let rules = PetRules::default();
        assert_eq!(rules.normalize_name("  Pip  "), "Pip");
        assert_eq!(rules.normalize_name("   "), "Sprout");
        assert_eq!(rules.normalize_name(""), "Sprout");
        let long = "abcdefghijklmnopqrstuvwxyz";
        assert_eq!(rules.normalize_name(long), "abcdefghijklmnopqrst");
        // Counts characters, not bytes.
        let name = rules.normalize_name(&"é".repeat(25));
        assert_eq!(name.chars().count(), 20);
    }

    #[test]
    fn from_config_rejects_invalid_config() {
        let mut config = EngineConfig::default();
        config.battle.milestone_steps = 0;
        assert!(PetRules::from_config(&config).is_err());
    }

    #[test]
    fn normalize_recomputes_stage_and_lineage() {
        let rules = PetRules::default();
        let mut record = PetRecord {
            name: String::new(),
            lineage_key: LineageKey::new("dragon"),
            steps_today: 7000,
            evolution_stage: 0,
            ..PetRecord::default()
        };
        rules.normalize(&mut record, now());
        assert_eq!(record.name, "Sprout");
        assert_eq!(record.lineage_key.as_str(), "forest");
        assert_eq!(record.evolution_stage, 2);
    }

    #[test]
    fn normalize_repairs_running_battle() {
        let rules = PetRules::default();
        let mut record = PetRecord {
            steps_today: 500,
            ..PetRecord::default()
        };
        record.battle.start_steps_today = Some(900);
        record.battle.available = true;
        record.battle.result = Some(BattleResult::Defeat);
        rules.normalize(&mut record, now());

        assert_eq!(record.battle.start_steps_today, Some(500));
        assert_eq!(record.battle.start_time, Some(now()));
        assert!(!record.battle.available);
        assert!(record.battle.result.is_none());
    }

    #[test]
    fn normalize_clears_stray_fields_when_idle() {
        let rules = PetRules::default();
        let mut record = PetRecord::default();
        record.battle.start_time = Some(now());
        record.battle.last_remaining_steps = Some(12);
        rules.normalize(&mut record, now());
        assert!(record.battle.start_time.is_none());
        assert!(record.battle.last_remaining_steps.is_none());
    }

    #[test]
    fn normalize_keeps_pending_result_and_blocks_availability() {
        let rules = PetRules::default();
        let mut record = PetRecord::default();
        record.battle.result = Some(BattleResult::Victory);
        record.battle.last_remaining_steps = Some(0);
        record.battle.available = true;
        rules.normalize(&mut record, now());
        assert_eq!(record.battle.result, Some(BattleResult::Victory));
        assert_eq!(record.battle.last_remaining_steps, Some(0));
        assert!(!record.battle.available);
    }

    #[test]
    fn normalize_installs_configured_battle_constants() {
        let mut config = EngineConfig::default();
        config.battle.requirement_steps = 50;
        let rules = PetRules::from_config(&config).unwrap();
        let mut record = PetRecord::default();
        rules.normalize(&mut record, now());
        assert_eq!(record.battle.requirement_steps, 50);
    }
}
