//! Wire types for the browser remote-debugging protocol.
//!
//! The protocol is JSON-RPC-shaped over a persistent connection: requests
//! carry `{"id", "method", "params"}`, replies carry `{"id", "result"}` or
//! `{"id", "error"}`, and everything without an `id` is an event
//! notification. Correlation is strictly by `id`, even when replies arrive
//! out of order.
//!
//! This crate is intentionally dumb: envelopes in [`wire`], the debuggable
//! target descriptors served by the endpoint's HTTP listing in [`target`],
//! and the small per-command-family reply types in [`reply`] that callers
//! decode into exactly once at the client boundary.

pub mod reply;
pub mod target;
pub mod wire;

pub use reply::{DocumentReply, EvalReply, NodeReply, WindowBounds, WindowReply};
pub use target::{TargetInfo, pick_page_target};
pub use wire::{ErrorPayload, Event, Message, Request, Response};
