//! Human-plausible input synthesis.
//!
//! Everything here is split the same way: a pure, seed-testable plan
//! generator and an async replay that walks the plan against a session
//! with real delays. The randomness is cosmetic — a failed pointer path
//! or an odd keystroke cadence must never change what a task does.

mod pacing;
pub mod pointer;
pub mod scroll;
pub mod totp;
pub mod typing;

pub use pointer::{Point, click, move_pointer};
pub use scroll::{ScrollDirection, scroll};
pub use totp::{TotpError, totp, totp_at};
pub use typing::type_text;
