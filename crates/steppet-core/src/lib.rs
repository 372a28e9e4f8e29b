//! Rules, persistence and session orchestration for the `StepPet` state
//! engine.
//!
//! This crate turns raw daily step readings into the companion's growth:
//! experience, evolution stage, streak, and the timed battle mini-game. It
//! also owns the daily reset and the tolerant load path that keeps the
//! persisted record consistent across days and across damaged data.
//!
//! # Modules
//!
//! - [`clock`] -- [`Clock`] trait, system clock and manual test clock.
//! - [`config`] -- Configuration loading from `steppet-config.yaml` into
//!   strongly-typed structs.
//! - [`evolution`] -- Stage table mapping daily steps to evolution stages.
//! - [`lineage`] -- Catalog of cosmetic lineages.
//! - [`rules`] -- [`PetRules`], the validated rule set and record
//!   normalization.
//! - [`battle`] -- Milestone unlocks and the timed battle state machine.
//! - [`repository`] -- Load, merge, daily reset and save of the record.
//! - [`ingest`] -- Applying step readings.
//! - [`session`] -- [`PetSession`], one method per host trigger, and the
//!   [`NotificationSink`] seam.
//!
//! [`Clock`]: clock::Clock
//! [`PetRules`]: rules::PetRules
//! [`PetSession`]: session::PetSession
//! [`NotificationSink`]: session::NotificationSink

pub mod battle;
pub mod clock;
pub mod config;
pub mod evolution;
pub mod ingest;
pub mod lineage;
pub mod repository;
pub mod rules;
pub mod session;
