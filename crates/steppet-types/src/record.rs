//! The persisted pet aggregate and its battle sub-state.
//!
//! [`PetRecord`] is the single value written to the key-value store. It is
//! serialized as one flat camelCase JSON object: the battle fields are
//! flattened into the top level under the `battle*` names used by earlier
//! versions of the app, so old blobs keep loading.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::BattleResult;

/// Name given to a companion that was never named (or was given a blank name).
pub const DEFAULT_PET_NAME: &str = "Sprout";

/// Maximum number of characters kept from a user-supplied name.
pub const MAX_NAME_LEN: usize = 20;

/// Canonical lineage used when a record refers to an unknown lineage.
pub const DEFAULT_LINEAGE: &str = "forest";

/// Steps that must be walked between two battle unlocks.
pub const DEFAULT_MILESTONE_STEPS: u64 = 1000;

/// Steps that must be walked after starting a battle to win it.
pub const DEFAULT_BATTLE_REQUIREMENT: u64 = 300;

/// Wall-clock time limit of a battle (one hour).
pub const DEFAULT_BATTLE_DURATION_MS: u64 = 3_600_000;

/// Key into the lineage catalog (cosmetic family of per-stage visuals).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct LineageKey(pub String);

impl LineageKey {
    /// Create a lineage key from any string-like value.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Borrow the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LineageKey {
    fn default() -> Self {
        Self::new(DEFAULT_LINEAGE)
    }
}

impl core::fmt::Display for LineageKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Battle sub-state of a [`PetRecord`].
///
/// The four-state machine (idle, available, in progress, resolved) is encoded
/// in these flat fields:
///
/// | Phase | `available` | `start_steps_today` | `result` |
/// |-------|-------------|---------------------|----------|
/// | Idle | false | `None` | `None` |
/// | Available | true | `None` | `None` |
/// | In progress | false | `Some` | `None` |
/// | Resolved | false | `None` | `Some` |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BattleState {
    /// Steps since start needed to win a battle.
    #[serde(rename = "battleStepRequirement")]
    pub requirement_steps: u64,
    /// Steps between two battle unlocks.
    #[serde(rename = "battleMilestoneTarget")]
    pub milestone_target: u64,
    /// Whether a battle can be started right now.
    #[serde(rename = "battleAvailable")]
    pub available: bool,
    /// `steps_today` at the moment the running battle started.
    #[serde(rename = "stepsAtBattleStart")]
    pub start_steps_today: Option<u64>,
    /// Wall-clock start of the running battle.
    #[serde(rename = "battleStartTime")]
    pub start_time: Option<DateTime<Utc>>,
    /// Wall-clock time limit of a battle in milliseconds.
    #[serde(rename = "battleDurationMs")]
    pub duration_ms: u64,
    /// Resolved-but-unacknowledged outcome.
    #[serde(rename = "battleResult")]
    pub result: Option<BattleResult>,
    /// Steps that were still missing when the battle resolved.
    #[serde(rename = "lastBattleRemaining")]
    pub last_remaining_steps: Option<u64>,
}

impl BattleState {
    /// Create an idle battle state with the given constants.
    pub const fn idle(requirement_steps: u64, milestone_target: u64, duration_ms: u64) -> Self {
        Self {
            requirement_steps,
            milestone_target,
            available: false,
            start_steps_today: None,
            start_time: None,
            duration_ms,
            result: None,
            last_remaining_steps: None,
        }
    }

    /// Return to idle, keeping the configured constants.
    pub const fn reset_to_idle(&mut self) {
        *self = Self::idle(self.requirement_steps, self.milestone_target, self.duration_ms);
    }

    /// Whether a battle is currently running.
    pub const fn is_in_progress(&self) -> bool {
        self.start_steps_today.is_some()
    }

    /// Whether a resolved result is waiting to be acknowledged.
    pub const fn has_result(&self) -> bool {
        self.result.is_some()
    }
}

impl Default for BattleState {
    fn default() -> Self {
        Self::idle(
            DEFAULT_BATTLE_REQUIREMENT,
            DEFAULT_MILESTONE_STEPS,
            DEFAULT_BATTLE_DURATION_MS,
        )
    }
}

/// The single persisted aggregate tracking one companion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct PetRecord {
    /// Display name (non-empty, at most [`MAX_NAME_LEN`] characters).
    pub name: String,
    /// Selected cosmetic lineage.
    #[serde(alias = "petSet")]
    pub lineage_key: LineageKey,
    /// Total steps reported so far today.
    pub steps_today: u64,
    /// Experience accumulated across all days.
    #[serde(alias = "exp")]
    pub total_exp: u64,
    /// Evolution stage derived from `steps_today`.
    pub evolution_stage: u32,
    /// Consecutive days with nonzero step activity.
    pub streak_count: u32,
    /// Calendar day of the last reset or update.
    pub last_updated_date: Option<NaiveDate>,
    /// Battle mini-game state.
    #[serde(flatten)]
    pub battle: BattleState,
}

impl Default for PetRecord {
    fn default() -> Self {
        Self {
            name: DEFAULT_PET_NAME.to_owned(),
            lineage_key: LineageKey::default(),
            steps_today: 0,
            total_exp: 0,
            evolution_stage: 0,
            streak_count: 0,
            last_updated_date: None,
            battle: BattleState::default(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn record_serializes_flat_camel_case() {
        let record = PetRecord::default();
        let value = serde_json::to_value(&record).unwrap();
        let object = value.as_object().unwrap();

        assert!(object.contains_key("stepsToday"));
        assert!(object.contains_key("lineageKey"));
        assert!(object.contains_key("battleAvailable"));
        assert!(object.contains_key("stepsAtBattleStart"));
        assert!(!object.contains_key("battle"));
        assert_eq!(
            object.get("lineageKey").and_then(serde_json::Value::as_str),
            Some("forest")
        );
    }

    #[test]
    fn legacy_aliases_are_accepted() {
        let json = serde_json::json!({
            "name": "Pip",
            "petSet": "ocean",
            "stepsToday": 10,
            "exp": 42,
            "evolutionStage": 0,
            "streakCount": 1,
            "lastUpdatedDate": "2026-03-01",
            "battleStepRequirement": 300,
            "battleMilestoneTarget": 1000,
            "battleAvailable": false,
            "stepsAtBattleStart": null,
            "battleStartTime": null,
            "battleDurationMs": 3_600_000,
            "battleResult": null,
            "lastBattleRemaining": null
        });
        let record: PetRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.lineage_key.as_str(), "ocean");
        assert_eq!(record.total_exp, 42);
    }

    #[test]
    fn reset_to_idle_keeps_constants() {
        let mut battle = BattleState::idle(50, 200, 1000);
        battle.available = true;
        battle.result = Some(BattleResult::Victory);
        battle.last_remaining_steps = Some(0);
        battle.reset_to_idle();
        assert_eq!(battle, BattleState::idle(50, 200, 1000));
    }
}
