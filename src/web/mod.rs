//! HTTP API.
//!
//! - [`router`] - route table, CORS and request tracing
//! - [`handlers`] - one handler per endpoint plus the shared [`AppState`]
//! - [`error`] - [`ApiError`] and its mapping from library errors
//! - [`server`] - outbound client, state wiring and the listener loop

pub mod cors;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;

pub use error::{ApiError, ErrorCode};
pub use handlers::{AppState, SharedState};
pub use router::create_router;
pub use server::{build_http_client, WebServer};
