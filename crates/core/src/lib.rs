//! Drives a fleet of profile-scoped browser windows through their
//! remote-debugging endpoints.
//!
//! Layers, leaves first: [`slots`] tiles windows into non-overlapping
//! screen regions; `drover-runtime` speaks the wire protocol; [`humanize`]
//! synthesizes human-plausible input; [`tasks`] runs the per-profile
//! workflows (scan, post, login, comment); [`orchestrator`] fans the
//! workflows out across profiles under a concurrency cap.
//!
//! Every task resolves — success, soft failure with a fallback artifact,
//! or hard failure with a reason. One profile's failure never aborts a
//! run; only slot-allocator invariant violations are programmer errors.

pub mod collab;
pub mod config;
pub mod error;
pub mod humanize;
pub mod orchestrator;
pub mod retry;
pub mod slots;
pub mod tasks;

pub use config::Config;
pub use error::{Result, TaskError};
pub use orchestrator::{CancelFlag, Orchestrator};
pub use slots::{SlotAllocator, SlotBounds, SlotGuard};
pub use tasks::login::LoginSignal;
pub use tasks::{Artifact, Outcome, TaskJob, TaskResult, TaskRunner, TaskSpec};
