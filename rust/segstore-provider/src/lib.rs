//! Storage segment providers: the [`StorageProvider`] abstraction, the
//! [`Segment`] handle it deals in, and [`LogFailStorageProvider`], which counts
//! failed acquisitions of the provider it wraps.
//!
//! Concrete providers live in `segstore-provider-impl`.

pub mod counter;
pub mod log_fail;
pub mod provider;
pub mod segment;
pub mod stats;

pub use log_fail::LogFailStorageProvider;
pub use provider::{StorageProvider, StorageProviderExt};
pub use segment::Segment;
pub use stats::{StatsSnapshot, StorageStats};
