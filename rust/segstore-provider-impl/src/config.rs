//! Storage provider configuration and the builder that turns it into a provider.

use segstore_common::{Result, verify_arg};
use segstore_provider::{LogFailStorageProvider, StorageProvider};
use serde::{Deserialize, Serialize};

use crate::{
    contiguous_va::ContiguousVAStorageProvider, limited::LimitedStorageProvider,
    malloc::MallocStorageProvider, mmap::MmapStorageProvider,
};

pub const DEFAULT_SEGMENT_SIZE: usize = 4 * 1024 * 1024;
pub const DEFAULT_CAPACITY: usize = 256 * 1024 * 1024;

/// Which concrete provider backs the segments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// One OS mapping per segment.
    #[default]
    Mmap,
    /// Slots inside one up-front reservation of `capacity` bytes.
    ContiguousVa,
    /// The global allocator.
    Malloc,
}

/// Storage provider settings, typically embedded in a larger runtime config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub kind: ProviderKind,
    /// Segment size in bytes: a power of two and a multiple of the page size.
    pub segment_size: usize,
    /// Address space reserved by `contiguous_va`, a multiple of `segment_size`.
    /// Ignored by the other kinds.
    pub capacity: usize,
    /// Optional cap on the bytes outstanding at any time, rounded down to whole
    /// segments.
    pub limit: Option<usize>,
    /// Count failed acquisitions with a [`LogFailStorageProvider`].
    pub log_failures: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            kind: ProviderKind::default(),
            segment_size: DEFAULT_SEGMENT_SIZE,
            capacity: DEFAULT_CAPACITY,
            limit: None,
            log_failures: true,
        }
    }
}

/// Builds a storage provider stack from a [`StorageConfig`].
///
/// The stack is, from the inside out: the concrete provider selected by `kind`,
/// an optional [`LimitedStorageProvider`], and an optional
/// [`LogFailStorageProvider`].
#[derive(Debug, Clone, Default)]
pub struct StorageProviderBuilder {
    config: StorageConfig,
}

impl StorageProviderBuilder {
    pub fn new() -> StorageProviderBuilder {
        Default::default()
    }

    pub fn from_config(config: StorageConfig) -> StorageProviderBuilder {
        StorageProviderBuilder { config }
    }

    pub fn kind(mut self, kind: ProviderKind) -> Self {
        self.config.kind = kind;
        self
    }

    pub fn segment_size(mut self, segment_size: usize) -> Self {
        self.config.segment_size = segment_size;
        self
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.config.limit = Some(limit);
        self
    }

    pub fn log_failures(mut self, log_failures: bool) -> Self {
        self.config.log_failures = log_failures;
        self
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Builds the provider stack described by the configuration.
    pub fn build(self) -> Result<Box<dyn StorageProvider>> {
        let log_failures = self.config.log_failures;
        let provider = self.build_unlogged()?;
        if log_failures {
            Ok(Box::new(LogFailStorageProvider::new(provider)))
        } else {
            Ok(provider)
        }
    }

    /// Builds the provider stack, always wrapped in a [`LogFailStorageProvider`]
    /// returned by its concrete type so the caller can poll the failure count.
    /// The `log_failures` setting is ignored.
    pub fn build_logged(self) -> Result<LogFailStorageProvider> {
        Ok(LogFailStorageProvider::new(self.build_unlogged()?))
    }

    fn build_unlogged(self) -> Result<Box<dyn StorageProvider>> {
        let StorageConfig {
            kind,
            segment_size,
            capacity,
            limit,
            ..
        } = self.config;

        let provider: Box<dyn StorageProvider> = match kind {
            ProviderKind::Mmap => Box::new(MmapStorageProvider::new(segment_size)?),
            ProviderKind::ContiguousVa => {
                Box::new(ContiguousVAStorageProvider::new(segment_size, capacity)?)
            }
            ProviderKind::Malloc => Box::new(MallocStorageProvider::new(segment_size)?),
        };
        log::debug!("created {kind:?} storage provider with {segment_size}-byte segments");

        match limit {
            Some(limit) => {
                verify_arg!(limit, limit >= segment_size);
                let max_segments = (limit / segment_size) as u64;
                Ok(Box::new(LimitedStorageProvider::new(provider, max_segments)))
            }
            None => Ok(provider),
        }
    }
}
