//! The host-facing session: one in-memory record, one method per trigger.
//!
//! A [`PetSession`] owns the record for as long as the host runs. Each
//! trigger method:
//!
//! 1. Rolls the record over if the calendar day changed since the last
//!    trigger (emitting [`NotificationKind::DailyReset`]).
//! 2. Applies the trigger.
//! 3. Persists the record (best effort).
//! 4. Hands one notification per observable change to the
//!    [`NotificationSink`].
//!
//! The session owns no timer. Hosts call [`PetSession::tick`] on their own
//! schedule (`session.tick_interval_ms`).

use serde::Serialize;
use steppet_store::PersistentStore;
use steppet_types::{BattlePhase, BattleResult, Notification, NotificationKind, PetRecord};
use tracing::{debug, info};

use crate::battle::{
    self, BattleEngine, battle_progress_percent, display_remaining_steps, milestone_percent,
    steps_to_next_milestone,
};
use crate::clock::Clock;
use crate::config::{ConfigError, EngineConfig};
use crate::ingest::{StepIngestor, StepSync, parse_step_reading, steps_from_query};
use crate::repository::{DailyReset, StateRepository};
use crate::rules::PetRules;

/// Receives notifications after each trigger is fully applied.
pub trait NotificationSink {
    /// Called once per observable change.
    fn notify(&mut self, notification: &Notification);
}

/// A sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpSink;

impl NotificationSink for NoOpSink {
    fn notify(&mut self, _notification: &Notification) {}
}

/// A sink that keeps every notification, for tests and replays.
#[derive(Debug, Default)]
pub struct CollectingSink {
    /// Notifications in emission order.
    pub notifications: Vec<Notification>,
}

impl CollectingSink {
    /// The kinds received so far, in order.
    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.notifications.iter().map(|n| n.kind).collect()
    }

    /// Forget everything received so far.
    pub fn clear(&mut self) {
        self.notifications.clear();
    }
}

impl NotificationSink for CollectingSink {
    fn notify(&mut self, notification: &Notification) {
        self.notifications.push(notification.clone());
    }
}

impl<N: NotificationSink + ?Sized> NotificationSink for &mut N {
    fn notify(&mut self, notification: &Notification) {
        (**self).notify(notification);
    }
}

impl<N: NotificationSink + ?Sized> NotificationSink for Box<N> {
    fn notify(&mut self, notification: &Notification) {
        (**self).notify(notification);
    }
}

/// Derived figures for rendering, computed from the current record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PetStatus {
    /// The record itself.
    pub record: PetRecord,
    /// Display title of the current stage.
    pub stage_title: String,
    /// Human-readable lineage label.
    pub lineage_label: String,
    /// Progress through the current stage, 0.0 to 1.0.
    pub stage_progress: f64,
    /// Steps until the next stage (0 at the final stage).
    pub steps_to_next_stage: u64,
    /// Minimum steps of the next stage, if any.
    pub next_stage_threshold: Option<u64>,
    /// Battle phase.
    pub battle_phase: BattlePhase,
    /// Percent of the way to the next milestone.
    pub milestone_percent: f64,
    /// Steps until the next milestone.
    pub steps_to_next_milestone: u64,
    /// Percent of the battle requirement completed.
    pub battle_percent: f64,
    /// Steps remaining in the battle view.
    pub battle_remaining_steps: u64,
    /// Milliseconds before the running battle times out.
    pub time_remaining_ms: u64,
    /// Countdown text for the battle view.
    pub time_remaining_text: String,
}

/// A session over one persisted companion.
#[derive(Debug)]
pub struct PetSession<S, C, N> {
    repository: StateRepository<S, C>,
    ingestor: StepIngestor<C>,
    battle: BattleEngine<C>,
    clock: C,
    sink: N,
    record: PetRecord,
}

impl<S, C, N> PetSession<S, C, N>
where
    S: PersistentStore,
    C: Clock + Clone,
    N: NotificationSink,
{
    /// Validate `config`, load the record from `store`, and settle any
    /// battle that timed out while the host was not running.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid. Storage
    /// problems never fail here; they degrade to defaults.
    pub fn open(config: &EngineConfig, store: S, clock: C, sink: N) -> Result<Self, ConfigError> {
        let rules = PetRules::from_config(config)?;
        let table = rules.table().clone();
        let mut repository =
            StateRepository::new(store, clock.clone(), config.storage.key.clone(), rules);
        let outcome = repository.load();

        let mut session = Self {
            repository,
            ingestor: StepIngestor::new(table, BattleEngine::new(clock.clone())),
            battle: BattleEngine::new(clock.clone()),
            clock,
            sink,
            record: outcome.record,
        };
        info!(
            name = %session.record.name,
            lineage = %session.record.lineage_key,
            steps_today = session.record.steps_today,
            streak = session.record.streak_count,
            "session opened"
        );
        if let Some(reset) = outcome.reset {
            session.announce_reset(reset);
        }
        if let Some(result) = session.battle.recompute(&mut session.record) {
            session.persist();
            session.emit_resolved(result);
        }
        Ok(session)
    }

    /// The current record.
    pub const fn record(&self) -> &PetRecord {
        &self.record
    }

    /// The rules in force.
    pub const fn rules(&self) -> &PetRules {
        self.repository.rules()
    }

    /// The repository backing this session.
    pub const fn repository(&self) -> &StateRepository<S, C> {
        &self.repository
    }

    /// The notification sink.
    pub const fn sink(&self) -> &N {
        &self.sink
    }

    /// Mutable access to the notification sink.
    pub const fn sink_mut(&mut self) -> &mut N {
        &mut self.sink
    }

    // =========================================================================
    // Triggers
    // =========================================================================

    /// Apply a step reading.
    pub fn sync_steps(&mut self, steps: u64) -> StepSync {
        self.roll_over();
        let sync = self
            .ingestor
            .ingest(&mut self.repository, &mut self.record, steps);
        let note = Notification::steps_synced(sync.delta, self.record.clone(), self.clock.now());
        self.sink.notify(&note);
        if let Some(result) = sync.battle_resolved {
            self.emit_resolved(result);
        }
        sync
    }

    /// Apply a textual step reading. Unparsable input is ignored.
    pub fn sync_from_text(&mut self, text: &str) -> Option<StepSync> {
        let Some(steps) = parse_step_reading(text) else {
            debug!(input = text, "ignoring unparsable step reading");
            return None;
        };
        Some(self.sync_steps(steps))
    }

    /// Apply the `steps` parameter of a query string, if it has a valid one.
    pub fn sync_from_query(&mut self, query: &str) -> Option<StepSync> {
        let Some(steps) = steps_from_query(query) else {
            debug!(query, "no usable steps parameter in query");
            return None;
        };
        Some(self.sync_steps(steps))
    }

    /// Rename the companion. Returns the name actually stored.
    pub fn rename(&mut self, name: &str) -> &str {
        self.roll_over();
        self.record.name = self.repository.rules().normalize_name(name);
        debug!(name = %self.record.name, "companion renamed");
        self.persist();
        self.emit(NotificationKind::NameChanged);
        &self.record.name
    }

    /// Select a lineage. Unknown keys select the default lineage.
    pub fn change_lineage(&mut self, key: &str) {
        self.roll_over();
        self.record.lineage_key = self.repository.rules().resolve_lineage(key);
        debug!(lineage = %self.record.lineage_key, "lineage changed");
        self.persist();
        self.emit(NotificationKind::LineageChanged);
    }

    /// Start an available battle. Returns whether a battle started.
    pub fn start_battle(&mut self) -> bool {
        self.roll_over();
        if let Some(result) = self.battle.recompute(&mut self.record) {
            self.persist();
            self.emit_resolved(result);
        }
        if !self.battle.start_battle(&mut self.record) {
            debug!(phase = ?battle::phase(&self.record), "battle start ignored");
            return false;
        }
        self.persist();
        self.emit(NotificationKind::BattleStarted);
        true
    }

    /// The host showed the battle screen.
    pub fn open_battle_screen(&mut self) {
        self.roll_over();
        if let Some(result) = self.battle.recompute(&mut self.record) {
            self.emit_resolved(result);
        }
        self.persist();
        self.emit(NotificationKind::BattleScreenOpened);
    }

    /// The host left the battle screen, acknowledging any pending result.
    /// Returns whether a result was acknowledged.
    pub fn close_battle_screen(&mut self) -> bool {
        self.roll_over();
        let acknowledged = battle::acknowledge_result(&mut self.record);
        self.persist();
        self.emit(NotificationKind::BattleScreenClosed);
        acknowledged
    }

    /// Periodic recomputation. Emits only when a battle resolves, so calling
    /// it repeatedly is harmless.
    pub fn tick(&mut self) -> Option<BattleResult> {
        self.roll_over();
        let result = self.battle.recompute(&mut self.record)?;
        self.persist();
        self.emit_resolved(result);
        Some(result)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Battle phase of the current record.
    pub fn phase(&self) -> BattlePhase {
        battle::phase(&self.record)
    }

    /// Milliseconds before the running battle times out.
    pub fn time_remaining_ms(&self) -> u64 {
        self.battle.time_remaining_ms(&self.record)
    }

    /// Snapshot of every derived figure the presentation layer shows.
    pub fn status(&self) -> PetStatus {
        let rules = self.repository.rules();
        let table = rules.table();
        let record = &self.record;
        let stage = record.evolution_stage;
        PetStatus {
            record: record.clone(),
            stage_title: table.title_for(stage),
            lineage_label: rules
                .catalog()
                .info_or_default(&record.lineage_key)
                .map_or_else(|| record.lineage_key.to_string(), |info| info.label.clone()),
            stage_progress: table.progress_fraction(stage, record.steps_today),
            steps_to_next_stage: table.steps_to_next_stage(stage, record.steps_today),
            next_stage_threshold: table.next_stage_threshold(stage),
            battle_phase: battle::phase(record),
            milestone_percent: milestone_percent(record),
            steps_to_next_milestone: steps_to_next_milestone(record),
            battle_percent: battle_progress_percent(record),
            battle_remaining_steps: display_remaining_steps(record),
            time_remaining_ms: self.battle.time_remaining_ms(record),
            time_remaining_text: self.battle.time_remaining_text(record),
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn roll_over(&mut self) {
        if let Some(reset) = self.repository.roll_over(&mut self.record) {
            self.persist();
            self.announce_reset(reset);
        }
    }

    fn announce_reset(&mut self, reset: DailyReset) {
        debug!(
            previous_date = %reset.previous_date,
            today = %reset.today,
            "announcing daily reset"
        );
        self.emit(NotificationKind::DailyReset);
    }

    fn persist(&mut self) {
        self.repository.save(&self.record);
    }

    fn emit_resolved(&mut self, result: BattleResult) {
        info!(?result, "battle resolved during session");
        self.emit(NotificationKind::BattleResolved);
    }

    fn emit(&mut self, kind: NotificationKind) {
        let note = Notification::new(kind, self.record.clone(), self.clock.now());
        self.sink.notify(&note);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use steppet_store::MemoryStore;

    use super::*;
    use crate::clock::ManualClock;

    type TestSession = PetSession<MemoryStore, ManualClock, CollectingSink>;

    fn open(clock: &ManualClock) -> TestSession {
        PetSession::open(
            &EngineConfig::default(),
            MemoryStore::new(),
            clock.clone(),
            CollectingSink::default(),
        )
        .unwrap()
    }

    fn clock() -> ManualClock {
        ManualClock::at_date(NaiveDate::from_ymd_opt(2026, 4, 1).unwrap())
    }

    #[test]
    fn invalid_config_fails_to_open() {
        let mut config = EngineConfig::default();
        config.lineages.clear();
        let result = PetSession::open(&config, MemoryStore::new(), clock(), NoOpSink);
        assert!(result.is_err());
    }

    #[test]
    fn sync_emits_steps_synced_with_delta() {
        let clock = clock();
        let mut session = open(&clock);
        session.sync_steps(400);
        session.sync_steps(650);
        let notes = &session.sink().notifications;
        assert_eq!(notes.len(), 2);
        assert_eq!(notes.first().unwrap().delta, Some(400));
        assert_eq!(notes.get(1).unwrap().delta, Some(250));
        assert_eq!(notes.get(1).unwrap().record.steps_today, 650);
    }

    #[test]
    fn unparsable_text_is_ignored() {
        let clock = clock();
        let mut session = open(&clock);
        assert!(session.sync_from_text("lots").is_none());
        assert!(session.sync_from_query("?walk=1").is_none());
        assert!(session.sink().notifications.is_empty());
        assert!(session.sync_from_query("?steps=120").is_some());
        assert_eq!(session.record().steps_today, 120);
    }

    #[test]
    fn rename_normalizes_and_notifies() {
        let clock = clock();
        let mut session = open(&clock);
        assert_eq!(session.rename("   "), "Sprout");
        assert_eq!(session.rename("  Biscuit the Brave Explorer "), "Biscuit the Brave Ex");
        assert_eq!(
            session.sink().kinds(),
            vec![NotificationKind::NameChanged, NotificationKind::NameChanged]
        );
    }

    #[test]
    fn lineage_change_falls_back_to_default() {
        let clock = clock();
        let mut session = open(&clock);
        session.change_lineage("ocean");
        assert_eq!(session.record().lineage_key.as_str(), "ocean");
        session.change_lineage("unicorn");
        assert_eq!(session.record().lineage_key.as_str(), "forest");
    }

    #[test]
    fn battle_lifecycle_emits_in_order() {
        let clock = clock();
        let mut session = open(&clock);
        assert!(!session.start_battle());

        session.sync_steps(1000);
        assert_eq!(session.phase(), BattlePhase::Available);
        assert!(session.start_battle());
        session.open_battle_screen();
        session.sync_steps(1300);
        assert_eq!(session.phase(), BattlePhase::Resolved(BattleResult::Victory));
        assert!(session.close_battle_screen());
        assert_eq!(session.phase(), BattlePhase::Idle);

        assert_eq!(
            session.sink().kinds(),
            vec![
                NotificationKind::StepsSynced,
                NotificationKind::BattleStarted,
                NotificationKind::BattleScreenOpened,
                NotificationKind::StepsSynced,
                NotificationKind::BattleResolved,
                NotificationKind::BattleScreenClosed,
            ]
        );
    }

    #[test]
    fn tick_resolves_defeat_once() {
        let clock = clock();
        let mut session = open(&clock);
        session.sync_steps(1000);
        session.start_battle();
        session.sink_mut().clear();

        clock.advance_ms(3_599_999);
        assert!(session.tick().is_none());
        clock.advance_ms(1);
        assert_eq!(session.tick(), Some(BattleResult::Defeat));
        assert!(session.tick().is_none());
        assert_eq!(session.sink().kinds(), vec![NotificationKind::BattleResolved]);
        assert_eq!(session.status().battle_remaining_steps, 300);
    }

    #[test]
    fn day_change_between_triggers_resets() {
        let clock = clock();
        let mut session = open(&clock);
        session.sync_steps(500);
        session.sink_mut().clear();

        clock.advance_days(1);
        session.sync_steps(200);
        assert_eq!(
            session.sink().kinds(),
            vec![NotificationKind::DailyReset, NotificationKind::StepsSynced]
        );
        assert_eq!(session.record().steps_today, 200);
        assert_eq!(session.record().streak_count, 2);
        assert_eq!(session.record().total_exp, 700);
    }

    #[test]
    fn status_reports_derived_figures() {
        let clock = clock();
        let mut session = open(&clock);
        session.sync_steps(4750);
        let status = session.status();
        assert_eq!(status.stage_title, "Hatchling");
        assert_eq!(status.lineage_label, "Forest Lineage");
        assert_eq!(status.steps_to_next_stage, 1750);
        assert_eq!(status.next_stage_threshold, Some(6500));
        assert!((status.stage_progress - 0.5).abs() < 1e-9);
        assert_eq!(status.battle_phase, BattlePhase::Available);
        assert_eq!(status.time_remaining_text, "0 minutes 0 seconds");
    }
}
