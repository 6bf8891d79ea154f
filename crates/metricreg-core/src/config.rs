//! Registry configuration.

use crate::error::{Error, Result};

/// Configuration for a [`MetricsRegistry`](crate::MetricsRegistry).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Number of lock shards per cache. None uses the dashmap default.
    /// Must be a power of two greater than one.
    pub shard_amount: Option<usize>,

    /// Initial capacity of the family cache.
    pub family_capacity: usize,

    /// Initial capacity of the instance cache.
    pub instance_capacity: usize,
}

impl RegistryConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shard amount.
    pub fn with_shard_amount(mut self, shards: usize) -> Self {
        self.shard_amount = Some(shards);
        self
    }

    /// Set the initial family capacity.
    pub fn with_family_capacity(mut self, capacity: usize) -> Self {
        self.family_capacity = capacity;
        self
    }

    /// Set the initial instance capacity.
    pub fn with_instance_capacity(mut self, capacity: usize) -> Self {
        self.instance_capacity = capacity;
        self
    }

    /// Check the configuration.
    pub fn validate(&self) -> Result<()> {
        if let Some(shards) = self.shard_amount {
            if shards <= 1 || !shards.is_power_of_two() {
                return Err(Error::Config(format!(
                    "shard_amount must be a power of two greater than 1, got {shards}"
                )));
            }
        }
        Ok(())
    }
}
