//! Session client for one browser's remote-debugging endpoint.
//!
//! A [`Session`] owns one persistent connection to one browser instance:
//! it discovers the attachable page target over the endpoint's HTTP
//! listing, opens the WebSocket (trying handshake variants until one is
//! accepted), and performs numbered command round trips correlated
//! strictly by id. Every call is fallible and deadline-bounded; callers
//! are expected to fold failures into their own terminal outcome rather
//! than propagate them as fatal errors.

mod connection;
mod error;
mod session;
mod targets;
mod transport;

pub use error::{Error, Result};
pub use session::{Session, UploadReport, js_quote};
pub use targets::{Endpoint, list_targets};
