//! In-memory store for the pacing hierarchy: entity collections, the
//! engine-facing `HierarchyReader` implementation, and the validated
//! allocation mutations with their append-only history log.

pub mod mutations;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use store::{DayAllocation, HierarchyStore};
