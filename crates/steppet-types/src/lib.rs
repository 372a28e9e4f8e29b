//! Shared type definitions for the `StepPet` state engine.
//!
//! This crate is the single source of truth for the data that crosses the
//! boundary between the state engine and its host. Types defined here flow
//! downstream to `TypeScript` via `ts-rs` for the presentation layer.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers
//! - [`enums`] -- Battle outcome, battle phase, and notification kinds
//! - [`record`] -- The persisted [`PetRecord`] aggregate and its battle state
//! - [`events`] -- [`Notification`] payloads emitted after each trigger

pub mod enums;
pub mod events;
pub mod ids;
pub mod record;

// Re-export all public types at crate root for convenience.
pub use enums::{BattlePhase, BattleResult, NotificationKind};
pub use events::Notification;
pub use ids::NotificationId;
pub use record::{
    BattleState, DEFAULT_BATTLE_DURATION_MS, DEFAULT_BATTLE_REQUIREMENT, DEFAULT_LINEAGE,
    DEFAULT_MILESTONE_STEPS, DEFAULT_PET_NAME, LineageKey, MAX_NAME_LEN, PetRecord,
};
