use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::hash::DEFAULT_HASH_CACHE_CAPACITY;
use crate::{Algorithm, OptionsError, SortOptions};

const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Configuration knobs for a comparison [`Session`](crate::Session).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    algorithm: Algorithm,
    hash_cache_capacity: usize,
    debounce_ms: u64,
    sort_arrays: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            hash_cache_capacity: DEFAULT_HASH_CACHE_CAPACITY,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            sort_arrays: true,
        }
    }
}

impl EngineConfig {
    /// Returns the diff algorithm.
    ///
    /// ```
    /// # use jsoncompare_core::{Algorithm, EngineConfig};
    /// let config = EngineConfig::default().with_algorithm(Algorithm::Flat).expect("set algorithm");
    /// assert_eq!(config.algorithm(), Algorithm::Flat);
    /// ```
    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Returns the maximum number of memoized subtree hashes.
    #[must_use]
    pub fn hash_cache_capacity(&self) -> usize {
        self.hash_cache_capacity
    }

    /// Returns the delay used to coalesce bursts of edits.
    ///
    /// ```
    /// # use std::time::Duration;
    /// # use jsoncompare_core::EngineConfig;
    /// assert_eq!(EngineConfig::default().debounce(), Duration::from_millis(100));
    /// ```
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Returns the options used by the per-pane sort action.
    #[must_use]
    pub fn sort_options(&self) -> SortOptions {
        SortOptions::default().with_arrays(self.sort_arrays)
    }

    /// Selects the diff algorithm.
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Result<Self, OptionsError> {
        self.algorithm = algorithm;
        self.validate()?;
        Ok(self)
    }

    /// Sets the subtree hash cache capacity.
    ///
    /// ```
    /// # use jsoncompare_core::{EngineConfig, OptionsError};
    /// let err = EngineConfig::default().with_hash_cache_capacity(0).unwrap_err();
    /// assert_eq!(err, OptionsError::ZeroCacheCapacity);
    /// ```
    pub fn with_hash_cache_capacity(mut self, capacity: usize) -> Result<Self, OptionsError> {
        self.hash_cache_capacity = capacity;
        self.validate()?;
        Ok(self)
    }

    /// Sets the debounce delay. Sub-millisecond precision is truncated.
    pub fn with_debounce(mut self, delay: Duration) -> Result<Self, OptionsError> {
        self.debounce_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.validate()?;
        Ok(self)
    }

    /// Enables or disables array element ordering for the sort action.
    pub fn with_sort_arrays(mut self, sort_arrays: bool) -> Result<Self, OptionsError> {
        self.sort_arrays = sort_arrays;
        self.validate()?;
        Ok(self)
    }

    /// Checks a deserialized configuration.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.hash_cache_capacity == 0 {
            return Err(OptionsError::ZeroCacheCapacity);
        }
        Ok(())
    }
}
