//! Reference-counted, invalidation-aware object caches and the derived
//! read models served through them.
//!
//! - [`cache`]: keyed and single-key engines, the TempLock gate,
//!   close-delay decorators and subscription guards
//! - [`invalidation`]: table-level dirty tracking for snapshots
//! - [`store`]: the store collaborator and an in-memory implementation
//! - [`derived`]: the snapshots and the [`DerivedData`] context owning
//!   their caches

pub mod cache;
mod config;
mod constants;
pub mod derived;
mod errors;
pub mod invalidation;
mod metrics;
pub mod store;
pub mod utils;

pub use config::*;
pub use derived::DerivedData;
pub use errors::*;
pub use metrics::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
