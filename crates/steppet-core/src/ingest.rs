//! Applying step readings to the record.
//!
//! A reading is today's cumulative step total as reported by the host, not
//! an increment. The ingestor turns it into an experience delta and drives
//! every rule that depends on today's steps: evolution, the battle machine,
//! and the streak.
//!
//! A reading lower than the current total (a pedometer restart, a stale
//! query string) is treated as a repeat of the current total. It awards no
//! experience and never lowers the stage.

use steppet_store::PersistentStore;
use steppet_types::{BattleResult, PetRecord};
use tracing::debug;

use crate::battle::BattleEngine;
use crate::clock::Clock;
use crate::evolution::EvolutionTable;
use crate::repository::StateRepository;

/// What a step reading changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepSync {
    /// `steps_today` before the reading.
    pub previous_steps: u64,
    /// `steps_today` after the reading.
    pub steps_today: u64,
    /// Experience awarded.
    pub delta: u64,
    /// Whether the evolution stage changed.
    pub stage_changed: bool,
    /// Whether this reading made a battle available.
    pub battle_unlocked: bool,
    /// Set if a running battle resolved.
    pub battle_resolved: Option<BattleResult>,
    /// Whether the streak was incremented.
    pub streak_incremented: bool,
}

/// Applies step readings using an evolution table and a battle engine.
#[derive(Debug, Clone)]
pub struct StepIngestor<C> {
    table: EvolutionTable,
    battle: BattleEngine<C>,
}

impl<C: Clock> StepIngestor<C> {
    /// Create an ingestor.
    pub const fn new(table: EvolutionTable, battle: BattleEngine<C>) -> Self {
        Self { table, battle }
    }

    /// Apply a reading to `record` in memory.
    pub fn apply_step_reading(&self, record: &mut PetRecord, new_steps: u64) -> StepSync {
        let previous = record.steps_today;
        if new_steps < previous {
            debug!(previous, reading = new_steps, "ignoring lower step reading");
        }
        let steps = new_steps.max(previous);
        let delta = steps.saturating_sub(previous);

        record.steps_today = steps;
        record.total_exp = record.total_exp.saturating_add(delta);

        let old_stage = record.evolution_stage;
        record.evolution_stage = self.table.stage_for(steps);

        let was_available = record.battle.available;
        let battle_resolved = self.battle.on_steps_changed(record, previous);
        let battle_unlocked = !was_available && record.battle.available;

        let streak_incremented = previous == 0 && steps > 0;
        if streak_incremented {
            record.streak_count = record.streak_count.saturating_add(1);
        }

        let sync = StepSync {
            previous_steps: previous,
            steps_today: steps,
            delta,
            stage_changed: old_stage != record.evolution_stage,
            battle_unlocked,
            battle_resolved,
            streak_incremented,
        };
        debug!(
            steps_today = steps,
            delta,
            total_exp = record.total_exp,
            stage = record.evolution_stage,
            streak = record.streak_count,
            "step reading applied"
        );
        sync
    }

    /// Apply a reading and persist the record.
    pub fn ingest<S: PersistentStore, R: Clock>(
        &self,
        repository: &mut StateRepository<S, R>,
        record: &mut PetRecord,
        new_steps: u64,
    ) -> StepSync {
        let sync = self.apply_step_reading(record, new_steps);
        repository.save(record);
        sync
    }
}

/// Parse a textual step reading.
///
/// Accepts leading whitespace, an optional `+`, and a run of decimal
/// digits; anything after the digits is ignored (`"1200 steps"` is 1200).
/// Returns `None` for negative, digit-less or overflowing input.
pub fn parse_step_reading(text: &str) -> Option<u64> {
    let rest = text.trim_start();
    let rest = rest.strip_prefix('+').unwrap_or(rest);
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = rest.get(..end)?;
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Extract and parse the first `steps` parameter of a query string.
///
/// The leading `?` is optional, and a full URL is accepted (everything up to
/// the first `?` is skipped). Returns `None` when the parameter is missing or
/// its first occurrence does not parse.
pub fn steps_from_query(query: &str) -> Option<u64> {
    let query = query.trim();
    let query = query.split_once('?').map_or(query, |(_, rest)| rest);
    let query = query.split_once('#').map_or(query, |(head, _)| head);
    query
        .split('&')
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .find(|(key, _)| *key == "steps")
        .and_then(|(_, value)| parse_step_reading(value))
}
