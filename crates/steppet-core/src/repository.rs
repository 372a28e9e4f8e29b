//! Loading, repairing, rolling over and saving the persisted record.
//!
//! # Load pipeline
//!
//! 1. Read the raw blob. A missing key, a store failure, invalid JSON or a
//!    non-object value all degrade to an empty object.
//! 2. Merge the stored object over a fresh record field by field. A field
//!    that is absent or has the wrong shape keeps its default; the rest of
//!    the blob still loads.
//! 3. Normalize ([`PetRules::normalize`]).
//! 4. Apply the daily reset against [`Clock::today`].
//! 5. Persist the result.
//!
//! Nothing on this path fails: corrupt data is logged with `warn!` and
//! replaced by defaults.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};
use steppet_store::{PersistentStore, StoreError};
use steppet_types::{BattleResult, LineageKey, PetRecord};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::evolution::EvolutionTable;
use crate::ingest::parse_step_reading;
use crate::rules::PetRules;

/// What happened when a new calendar day was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyReset {
    /// The day the record was last updated.
    pub previous_date: NaiveDate,
    /// The new current day.
    pub today: NaiveDate,
    /// `today - previous_date` in calendar days (negative if the stored
    /// date was in the future).
    pub days_elapsed: i64,
    /// Steps that were cleared.
    pub cleared_steps: u64,
    /// Whether the streak survived the rollover.
    pub streak_kept: bool,
}

/// The result of [`StateRepository::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    /// The normalized, rolled-over record.
    pub record: PetRecord,
    /// Set if loading crossed a day boundary.
    pub reset: Option<DailyReset>,
}

/// Reads and writes the single record blob.
#[derive(Debug)]
pub struct StateRepository<S, C> {
    store: S,
    clock: C,
    key: String,
    rules: PetRules,
}

impl<S: PersistentStore, C: Clock> StateRepository<S, C> {
    /// Create a repository persisting under `key`.
    pub fn new(store: S, clock: C, key: impl Into<String>, rules: PetRules) -> Self {
        Self {
            store,
            clock,
            key: key.into(),
            rules,
        }
    }

    /// The storage key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The rules used to normalize loaded records.
    pub const fn rules(&self) -> &PetRules {
        &self.rules
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Load, repair, roll over and re-persist the record.
    pub fn load(&mut self) -> LoadOutcome {
        let object = self.read_object();
        let mut record = merge_stored(&self.rules, &object);
        self.rules.normalize(&mut record, self.clock.now());
        let reset = daily_reset(&mut record, self.clock.today(), self.rules.table());
        self.save(&record);
        debug!(
            key = %self.key,
            steps_today = record.steps_today,
            stage = record.evolution_stage,
            "record loaded"
        );
        LoadOutcome { record, reset }
    }

    /// Apply the daily reset for the clock's current day to an in-memory
    /// record. Does not persist.
    pub fn roll_over(&self, record: &mut PetRecord) -> Option<DailyReset> {
        daily_reset(record, self.clock.today(), self.rules.table())
    }

    /// Serialize and write the record.
    ///
    /// Failures are logged and swallowed; returns whether the write
    /// succeeded.
    pub fn save(&mut self, record: &PetRecord) -> bool {
        let json = match serde_json::to_string(record) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialize record, not saved");
                return false;
            }
        };
        match self.store.write(&self.key, &json) {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %self.key, error = %e, "failed to persist record");
                false
            }
        }
    }

    /// Remove the stored blob. The next load starts from defaults.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot delete the key.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.store.remove(&self.key)?;
        info!(key = %self.key, "stored record cleared");
        Ok(())
    }

    fn read_object(&self) -> Map<String, Value> {
        let raw = match self.store.read(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %self.key, "no stored record, starting fresh");
                return Map::new();
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "failed to read stored record, using defaults");
                return Map::new();
            }
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(object)) => object,
            Ok(other) => {
                warn!(
                    key = %self.key,
                    kind = json_kind(&other),
                    "stored record is not an object, using defaults"
                );
                Map::new()
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "stored record is corrupt, using defaults");
                Map::new()
            }
        }
    }
}

/// Roll `record` over to `today` if its last update was on another day.
///
/// - No stored date: stamp `today`, nothing else changes.
/// - Same day: no-op.
/// - Exactly one day later with steps walked: the streak survives.
/// - Any other gap (including a date in the future): the streak resets.
///
/// Every actual rollover clears today's steps, returns the battle to idle,
/// recomputes the stage and stamps `today`.
pub fn daily_reset(
    record: &mut PetRecord,
    today: NaiveDate,
    table: &EvolutionTable,
) -> Option<DailyReset> {
    let Some(previous_date) = record.last_updated_date else {
        record.last_updated_date = Some(today);
        return None;
    };
    if previous_date == today {
        return None;
    }

    let days_elapsed = today.signed_duration_since(previous_date).num_days();
    let cleared_steps = record.steps_today;
    let streak_kept = days_elapsed == 1 && cleared_steps > 0;
    if !streak_kept {
        record.streak_count = 0;
    }
    record.steps_today = 0;
    record.battle.reset_to_idle();
    record.evolution_stage = table.stage_for(0);
    record.last_updated_date = Some(today);

    info!(
        %previous_date,
        %today,
        days_elapsed,
        cleared_steps,
        streak = record.streak_count,
        streak_kept,
        "daily reset"
    );
    Some(DailyReset {
        previous_date,
        today,
        days_elapsed,
        cleared_steps,
        streak_kept,
    })
}

// ---------------------------------------------------------------------------
// Field-by-field merge
// ---------------------------------------------------------------------------

/// Overlay the recognizable fields of `object` on a fresh record.
///
/// Battle constants and the stage are not read back; normalization
/// reinstalls them from configuration.
fn merge_stored(rules: &PetRules, object: &Map<String, Value>) -> PetRecord {
    let mut record = rules.fresh_record();

    if let Some(name) = field(object, &["name"]).and_then(Value::as_str) {
        record.name = name.to_owned();
    }
    if let Some(key) = field(object, &["lineageKey", "petSet"]).and_then(Value::as_str) {
        record.lineage_key = LineageKey::new(key);
    }
    if let Some(steps) = field(object, &["stepsToday"]).and_then(as_count) {
        record.steps_today = steps;
    }
    if let Some(exp) = field(object, &["totalExp", "exp"]).and_then(as_count) {
        record.total_exp = exp;
    }
    if let Some(streak) = field(object, &["streakCount"])
        .and_then(as_count)
        .and_then(|n| u32::try_from(n).ok())
    {
        record.streak_count = streak;
    }
    record.last_updated_date = field(object, &["lastUpdatedDate"]).and_then(as_date);

    let battle = &mut record.battle;
    battle.available = field(object, &["battleAvailable"])
        .and_then(Value::as_bool)
        .unwrap_or(false);
    battle.start_steps_today = field(object, &["stepsAtBattleStart"]).and_then(as_count);
    battle.start_time = field(object, &["battleStartTime"]).and_then(as_instant);
    battle.result = field(object, &["battleResult"])
        .and_then(|value| serde_json::from_value::<BattleResult>(value.clone()).ok());
    battle.last_remaining_steps = field(object, &["lastBattleRemaining"]).and_then(as_count);

    record
}

/// The first non-null value stored under any of `keys`.
fn field<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find(|value| !value.is_null())
}

/// A non-negative count. Fractional numbers are truncated and numeric
/// strings are parsed leniently.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f as u64)
        }),
        Value::String(s) => parse_step_reading(s),
        _ => None,
    }
}

/// A calendar date, either `YYYY-MM-DD` or a full RFC 3339 timestamp.
fn as_date(value: &Value) -> Option<NaiveDate> {
    let text = value.as_str()?;
    text.parse::<NaiveDate>()
        .ok()
        .or_else(|| text.parse::<DateTime<Utc>>().ok().map(|t| t.date_naive()))
}

/// An instant, either RFC 3339 or epoch milliseconds.
fn as_instant(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => s.parse::<DateTime<Utc>>().ok(),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
