//! REST API for the pacing report service: handlers, router, and the
//! bearer-token middleware.

pub mod auth;
pub mod handlers;
pub mod models;
pub mod router;

pub use handlers::PacingState;
pub use router::pacing_router;
