//! Enumeration types shared between the state engine and its host.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Outcome of a resolved battle.
///
/// Persisted in lowercase (`"victory"` / `"defeat"`) to stay compatible with
/// records written by earlier versions of the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum BattleResult {
    /// The companion walked the required steps before the deadline.
    Victory,
    /// The deadline passed before the requirement was met.
    Defeat,
}

/// The four observable states of the battle mini-game.
///
/// This is never stored; it is derived from the flat battle fields of a
/// record by the battle engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum BattlePhase {
    /// No battle running, none pending, and no milestone crossed yet.
    Idle,
    /// A milestone was crossed; the host may start a battle.
    Available,
    /// A battle is running against the clock.
    InProgress,
    /// A battle resolved and the result has not been acknowledged.
    Resolved(BattleResult),
}

/// Category of a state-change notification emitted to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum NotificationKind {
    /// A step reading was applied (payload carries the EXP delta).
    StepsSynced,
    /// A battle moved from available to in progress.
    BattleStarted,
    /// A running battle resolved to victory or defeat.
    BattleResolved,
    /// The host opened the battle screen.
    BattleScreenOpened,
    /// The host closed the battle screen (acknowledging any result).
    BattleScreenClosed,
    /// The companion was renamed.
    NameChanged,
    /// A different lineage was selected.
    LineageChanged,
    /// A calendar-day boundary was crossed and today's progress was reset.
    DailyReset,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn battle_result_uses_lowercase_wire_names() {
        assert_eq!(
            serde_json::to_string(&BattleResult::Victory).unwrap(),
            "\"victory\""
        );
        let parsed: BattleResult = serde_json::from_str("\"defeat\"").unwrap();
        assert_eq!(parsed, BattleResult::Defeat);
    }

    #[test]
    fn unknown_battle_result_is_rejected() {
        let parsed: Result<BattleResult, _> = serde_json::from_str("\"draw\"");
        assert!(parsed.is_err());
    }
}
