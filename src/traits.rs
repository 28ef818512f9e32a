//! Shared trait abstractions for common patterns
//!
//! Caching, configuration and geometry traits shared by the tile, overlay
//! and viewer modules, plus the retry helper used by the tile loader.

use crate::prelude::{Duration, Instant};
use crate::Result;

/// Unified geometry operations trait to eliminate duplicate math implementations
pub trait GeometryOps<T> {
    /// Check if bounds contain a point
    fn contains_point(&self, point: &T) -> bool;

    /// Check if this bounds intersects with another
    fn intersects_bounds(&self, other: &Self) -> bool;

    /// Get the center point
    fn center(&self) -> T;

    /// Check if bounds are valid (finite, non-negative extent)
    fn is_valid(&self) -> bool;

    /// Get the area
    fn area(&self) -> f64;
}

/// Trait for configurable components
/// Unifies configuration patterns across all modules
pub trait Configurable {
    type Config: Clone;

    /// Get the current configuration
    fn config(&self) -> &Self::Config;

    /// Set new configuration
    fn set_config(&mut self, config: Self::Config) -> Result<()>;

    /// Validate configuration
    fn validate_config(config: &Self::Config) -> Result<()> {
        let _ = config; // Default implementation accepts all configs
        Ok(())
    }

    /// Update configuration with a partial change
    fn update_config<F>(&mut self, updater: F) -> Result<()>
    where
        F: FnOnce(&mut Self::Config),
    {
        let mut config = self.config().clone();
        updater(&mut config);
        Self::validate_config(&config)?;
        self.set_config(config)
    }
}

/// Trait for cacheable operations
/// Standardizes caching patterns used across the codebase
pub trait Cacheable {
    type Key: Clone + Eq + std::hash::Hash;
    type Value: Clone;

    /// Get cached value
    fn get_cached(&self, key: &Self::Key) -> Option<Self::Value>;

    /// Cache a value
    fn cache(&mut self, key: Self::Key, value: Self::Value);

    /// Invalidate cache entry
    fn invalidate(&mut self, key: &Self::Key);

    /// Clear entire cache
    fn clear_cache(&mut self);

    /// Get cache statistics
    fn cache_stats(&self) -> CacheStats {
        CacheStats::default()
    }
}

/// Cache statistics
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    /// Fetches currently running
    pub in_flight: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}

/// Standard retry logic implementation
///
/// `retry_count` is the number of retries already made, `last_retry_time`
/// the moment the last attempt failed.
pub fn should_retry_with_backoff(
    retry_count: u32,
    last_retry_time: Option<Instant>,
    now: Instant,
    max_retries: u32,
    retry_delay_ms: u64,
    exponential_backoff: bool,
) -> bool {
    if retry_count >= max_retries {
        return false;
    }

    if let Some(last_retry) = last_retry_time {
        let delay_multiplier = if exponential_backoff {
            2_u64.saturating_pow(retry_count)
        } else {
            1
        };
        let required_delay = Duration::from_millis(retry_delay_ms.saturating_mul(delay_multiplier));
        now.saturating_duration_since(last_retry) >= required_delay
    } else {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            size: 3,
            in_flight: 0,
        };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_retry_respects_limit_and_backoff() {
        let t0 = Instant::now();

        // first attempt never waits
        assert!(should_retry_with_backoff(0, None, t0, 2, 100, true));

        // linear delay
        assert!(!should_retry_with_backoff(0, Some(t0), t0 + Duration::from_millis(50), 2, 100, false));
        assert!(should_retry_with_backoff(0, Some(t0), t0 + Duration::from_millis(100), 2, 100, false));

        // second retry doubles the delay
        assert!(!should_retry_with_backoff(1, Some(t0), t0 + Duration::from_millis(150), 2, 100, true));
        assert!(should_retry_with_backoff(1, Some(t0), t0 + Duration::from_millis(200), 2, 100, true));

        // exhausted
        assert!(!should_retry_with_backoff(2, Some(t0), t0 + Duration::from_secs(60), 2, 100, true));
    }
}
