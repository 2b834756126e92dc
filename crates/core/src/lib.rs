//! Shared domain model for the pacing report platform — planning
//! hierarchy entities, engine settings, errors, and the guarded ratio
//! math every other crate builds on.

pub mod config;
pub mod error;
pub mod stats;
pub mod types;

pub use config::{AppConfig, EngineSettings};
pub use error::{PacingError, PacingResult};
