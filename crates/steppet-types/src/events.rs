//! State-change notifications consumed by the presentation layer.
//!
//! Every observable change made by the state engine (a step reading, a
//! rename, a battle start, a periodic tick that resolves a battle) produces
//! a [`Notification`] carrying the full updated record. The host re-renders
//! from that record; it never reads partially applied state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::NotificationKind;
use crate::ids::NotificationId;
use crate::record::PetRecord;

/// A state-change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Notification {
    /// Unique notification identifier.
    pub id: NotificationId,
    /// What happened.
    pub kind: NotificationKind,
    /// EXP gained by a step reading. Only set for [`NotificationKind::StepsSynced`].
    pub delta: Option<u64>,
    /// The record after the trigger was fully applied.
    pub record: PetRecord,
    /// Wall-clock time the notification was created.
    pub emitted_at: DateTime<Utc>,
}

impl Notification {
    /// Build a notification without an EXP delta.
    pub fn new(kind: NotificationKind, record: PetRecord, emitted_at: DateTime<Utc>) -> Self {
        Self {
            id: NotificationId::new(),
            kind,
            delta: None,
            record,
            emitted_at,
        }
    }

    /// Build a [`NotificationKind::StepsSynced`] notification.
    pub fn steps_synced(delta: u64, record: PetRecord, emitted_at: DateTime<Utc>) -> Self {
        Self {
            delta: Some(delta),
            ..Self::new(NotificationKind::StepsSynced, record, emitted_at)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_synced_carries_delta() {
        let note = Notification::steps_synced(120, PetRecord::default(), Utc::now());
        assert_eq!(note.kind, NotificationKind::StepsSynced);
        assert_eq!(note.delta, Some(120));
    }

    #[test]
    fn other_kinds_have_no_delta() {
        let note = Notification::new(
            NotificationKind::NameChanged,
            PetRecord::default(),
            Utc::now(),
        );
        assert!(note.delta.is_none());
    }
}
