//! API Module
//!
//! HTTP handlers and routing that expose a JSON-valued cache to
//! out-of-process callers.

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
