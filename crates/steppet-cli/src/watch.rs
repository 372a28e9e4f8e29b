//! The periodic battle tick.
//!
//! The state engine owns no timer. While a battle runs, the host calls
//! [`PetSession::tick`] every `session.tick_interval_ms` until the battle
//! resolves or the user interrupts.

use std::future::Future;
use std::time::Duration;

use steppet_core::clock::Clock;
use steppet_core::session::{NotificationSink, PetSession};
use steppet_store::PersistentStore;
use steppet_types::{BattlePhase, BattleResult};
use tracing::{debug, info};

/// Why [`watch_battle`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// No battle was running when the watch started.
    NotRunning,
    /// The battle resolved.
    Resolved(BattleResult),
    /// The shutdown signal fired first.
    Interrupted,
}

/// Tick `session` every `interval` until the running battle resolves or
/// `shutdown` completes.
pub async fn watch_battle<S, C, N, F>(
    session: &mut PetSession<S, C, N>,
    interval: Duration,
    shutdown: F,
) -> WatchOutcome
where
    S: PersistentStore,
    C: Clock + Clone,
    N: NotificationSink,
    F: Future<Output = ()>,
{
    if session.phase() != BattlePhase::InProgress {
        debug!(phase = ?session.phase(), "no battle running, nothing to watch");
        return WatchOutcome::NotRunning;
    }

    info!(
        interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
        remaining_ms = session.time_remaining_ms(),
        "watching battle"
    );
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(result) = session.tick() {
                    return WatchOutcome::Resolved(result);
                }
                debug!(
                    remaining_ms = session.time_remaining_ms(),
                    remaining_steps = session.status().battle_remaining_steps,
                    "battle tick"
                );
            }
            () = &mut shutdown => {
                info!("watch interrupted");
                return WatchOutcome::Interrupted;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use steppet_core::clock::ManualClock;
    use steppet_core::config::EngineConfig;
    use steppet_core::session::CollectingSink;
    use steppet_store::MemoryStore;
    use steppet_types::NotificationKind;

    use super::*;

    type TestSession = PetSession<MemoryStore, ManualClock, CollectingSink>;

    fn session_with_battle(clock: &ManualClock) -> TestSession {
        let mut session = PetSession::open(
            &EngineConfig::default(),
            MemoryStore::new(),
            clock.clone(),
            CollectingSink::default(),
        )
        .unwrap();
        session.sync_steps(1000);
        assert!(session.start_battle());
        session.sink_mut().clear();
        session
    }

    fn clock() -> ManualClock {
        ManualClock::at_date(NaiveDate::from_ymd_opt(2026, 4, 1).unwrap())
    }

    #[tokio::test]
    async fn returns_immediately_without_a_battle() {
        let mut session = PetSession::open(
            &EngineConfig::default(),
            MemoryStore::new(),
            clock(),
            CollectingSink::default(),
        )
        .unwrap();
        let outcome =
            watch_battle(&mut session, Duration::from_millis(5), std::future::pending()).await;
        assert_eq!(outcome, WatchOutcome::NotRunning);
    }

    #[tokio::test]
    async fn expired_battle_resolves_on_first_tick() {
        let clock = clock();
        let mut session = session_with_battle(&clock);
        clock.advance_ms(3_600_001);

        let outcome =
            watch_battle(&mut session, Duration::from_millis(5), std::future::pending()).await;
        assert_eq!(outcome, WatchOutcome::Resolved(BattleResult::Defeat));
        assert_eq!(session.sink().kinds(), vec![NotificationKind::BattleResolved]);
    }

    #[tokio::test]
    async fn shutdown_stops_a_running_watch() {
        let clock = clock();
        let mut session = session_with_battle(&clock);

        let shutdown = tokio::time::sleep(Duration::from_millis(30));
        let outcome = watch_battle(&mut session, Duration::from_millis(5), shutdown).await;
        assert_eq!(outcome, WatchOutcome::Interrupted);
        assert_eq!(session.phase(), BattlePhase::InProgress);
        assert!(session.sink().notifications.is_empty());
    }
}
