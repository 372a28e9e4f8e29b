//! Milestone unlocks and the timed battle state machine.
//!
//! ```text
//!            milestone crossed            start_battle()
//!   Idle ----------------------> Available ---------------> InProgress
//!    ^                                                        |    |
//!    |          acknowledge_result()                 victory  |    | deadline
//!    +------------------------------------ Resolved <---------+----+
//! ```
//!
//! The state lives in the flat [`BattleState`] fields of a [`PetRecord`];
//! [`phase`] derives the four-state view. Every mutating
//! operation is a no-op (returning `false` / `None`) when the transition
//! does not apply, never an error.
//!
//! # Resolution order
//!
//! A recomputation checks victory first, then the deadline. A battle whose
//! step requirement and deadline are both satisfied at check time resolves
//! as a victory; once a defeat is recorded it is never revised.
//!
//! [`BattleState`]: steppet_types::BattleState

use steppet_types::{BattlePhase, BattleResult, PetRecord};
use tracing::{debug, info};

use crate::clock::Clock;

/// The battle state machine, reading time from a [`Clock`].
#[derive(Debug, Clone, Copy)]
pub struct BattleEngine<C> {
    clock: C,
}

impl<C: Clock> BattleEngine<C> {
    /// Create an engine reading time from `clock`.
    pub const fn new(clock: C) -> Self {
        Self { clock }
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Apply a change of `steps_today` from `previous` to the record's
    /// current value: resolve a running battle if it is won or timed out,
    /// then unlock a battle if a milestone boundary was crossed.
    ///
    /// Returns the result if a battle resolved during this call.
    pub fn on_steps_changed(&self, record: &mut PetRecord, previous: u64) -> Option<BattleResult> {
        let resolved = self.recompute(record);
        check_milestone(record, previous);
        resolved
    }

    /// Re-evaluate a running battle against the current steps and time.
    ///
    /// Idempotent: with no intervening step change or deadline crossing it
    /// changes nothing. Returns the result if the battle resolved now.
    pub fn recompute(&self, record: &mut PetRecord) -> Option<BattleResult> {
        let start_steps = record.battle.start_steps_today?;
        let since_start = record.steps_today.saturating_sub(start_steps);
        if since_start >= record.battle.requirement_steps {
            resolve_battle(record, BattleResult::Victory);
            return Some(BattleResult::Victory);
        }
        if self.elapsed_ms(record).is_some_and(|ms| ms >= record.battle.duration_ms) {
            resolve_battle(record, BattleResult::Defeat);
            return Some(BattleResult::Defeat);
        }
        None
    }

    /// Start an available battle.
    ///
    /// Returns `false` (leaving the record untouched) if no battle is
    /// available or one is already running.
    pub fn start_battle(&self, record: &mut PetRecord) -> bool {
        // A running battle may have timed out since the last tick.
        self.recompute(record);
        if record.battle.is_in_progress() || !record.battle.available {
            return false;
        }
        let now = self.clock.now();
        let battle = &mut record.battle;
        battle.available = false;
        battle.start_steps_today = Some(record.steps_today);
        battle.start_time = Some(now);
        battle.result = None;
        battle.last_remaining_steps = None;
        info!(
            steps_today = record.steps_today,
            requirement = battle.requirement_steps,
            duration_ms = battle.duration_ms,
            "battle started"
        );
        true
    }

    // =========================================================================
    // Read-only queries
    // =========================================================================

    /// Milliseconds elapsed since the running battle started, if any.
    ///
    /// A start time in the future (clock skew) counts as zero elapsed.
    pub fn elapsed_ms(&self, record: &PetRecord) -> Option<u64> {
        let start = record.battle.start_time?;
        let elapsed = self.clock.now().signed_duration_since(start).num_milliseconds();
        Some(u64::try_from(elapsed).unwrap_or(0))
    }

    /// Milliseconds left before the running battle times out (0 when no
    /// battle is running).
    pub fn time_remaining_ms(&self, record: &PetRecord) -> u64 {
        if !record.battle.is_in_progress() {
            return 0;
        }
        self.elapsed_ms(record).map_or(record.battle.duration_ms, |elapsed| {
            record.battle.duration_ms.saturating_sub(elapsed)
        })
    }

    /// The countdown text for the battle view.
    pub fn time_remaining_text(&self, record: &PetRecord) -> String {
        format_duration(self.time_remaining_ms(record))
    }
}

/// Unlock a battle if `floor(steps / milestone)` increased since
/// `previous`, no battle is running, and no result is pending.
///
/// Returns `true` if the battle became available.
pub fn check_milestone(record: &mut PetRecord, previous: u64) -> bool {
    let battle = &record.battle;
    if battle.available || battle.is_in_progress() || battle.has_result() {
        return false;
    }
    let (Some(before), Some(after)) = (
        previous.checked_div(battle.milestone_target),
        record.steps_today.checked_div(battle.milestone_target),
    ) else {
        return false;
    };
    if after <= before {
        return false;
    }
    record.battle.available = true;
    debug!(
        steps_today = record.steps_today,
        milestone = after,
        "battle unlocked by milestone"
    );
    true
}

/// Close the result view: clear the pending result and its snapshot.
///
/// `available` stays `false` until the next milestone crossing. Returns
/// `false` if there was no result to acknowledge.
pub fn acknowledge_result(record: &mut PetRecord) -> bool {
    if record.battle.result.is_none() {
        return false;
    }
    record.battle.result = None;
    record.battle.last_remaining_steps = None;
    debug!("battle result acknowledged");
    true
}

/// Resolve the running battle with `result`, snapshotting the steps
/// that were still missing.
pub fn resolve_battle(record: &mut PetRecord, result: BattleResult) {
    let since_start = record
        .battle
        .start_steps_today
        .map_or(0, |start| record.steps_today.saturating_sub(start));
    let remaining = record.battle.requirement_steps.saturating_sub(since_start);
    let battle = &mut record.battle;
    battle.last_remaining_steps = Some(remaining);
    battle.start_steps_today = None;
    battle.start_time = None;
    battle.available = false;
    battle.result = Some(result);
    info!(?result, remaining, "battle resolved");
}

/// Derive the four-state phase from the flat battle fields.
pub fn phase(record: &PetRecord) -> BattlePhase {
    let battle = &record.battle;
    if battle.is_in_progress() {
        BattlePhase::InProgress
    } else if let Some(result) = battle.result {
        BattlePhase::Resolved(result)
    } else if battle.available {
        BattlePhase::Available
    } else {
        BattlePhase::Idle
    }
}

/// Steps walked toward the next milestone (0 while a battle is available).
pub fn steps_toward_next_milestone(record: &PetRecord) -> u64 {
    if record.battle.available {
        return 0;
    }
    record
        .steps_today
        .checked_rem(record.battle.milestone_target)
        .unwrap_or(0)
}

/// Steps still needed to reach the next milestone.
pub fn steps_to_next_milestone(record: &PetRecord) -> u64 {
    if record.battle.available {
        return 0;
    }
    record
        .battle
        .milestone_target
        .saturating_sub(steps_toward_next_milestone(record))
}

/// Percent (0--100) of the way to the next milestone.
pub fn milestone_percent(record: &PetRecord) -> f64 {
    percent(
        steps_toward_next_milestone(record),
        record.battle.milestone_target,
    )
}

/// Steps remaining to show for the battle view: the live count while
/// running, the snapshot while a result is pending, otherwise the full
/// requirement.
pub fn display_remaining_steps(record: &PetRecord) -> u64 {
    let battle = &record.battle;
    if let Some(start) = battle.start_steps_today {
        let since_start = record.steps_today.saturating_sub(start);
        return battle.requirement_steps.saturating_sub(since_start);
    }
    if battle.result.is_some() {
        return battle.last_remaining_steps.unwrap_or(0);
    }
    battle.requirement_steps
}

/// Percent (0--100) of the battle requirement completed.
pub fn battle_progress_percent(record: &PetRecord) -> f64 {
    let requirement = record.battle.requirement_steps;
    let done = requirement.saturating_sub(display_remaining_steps(record));
    percent(done, requirement)
}

/// Render a duration as `"M minutes S seconds"`, rounding seconds up so a
/// countdown never shows zero while time remains.
pub fn format_duration(ms: u64) -> String {
    let total_seconds = ms.div_ceil(1000);
    let minutes = total_seconds.checked_div(60).unwrap_or(0);
    let seconds = total_seconds.checked_rem(60).unwrap_or(0);
    format!("{minutes} minutes {seconds} seconds")
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let value = part as f64 / whole as f64 * 100.0;
    value.clamp(0.0, 100.0)
}
