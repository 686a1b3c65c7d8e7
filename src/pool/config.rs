//! Pool sizing configuration.

/// Default capacity of a freshly manufactured byte slice (32 KiB).
pub const DEFAULT_BYTES_CAPACITY: usize = 32 << 10;

/// Default number of idle values kept per free-list.
pub const DEFAULT_MAX_IDLE: usize = 64;

/// Default largest capacity a released value may keep and still be reused (1 MiB).
pub const DEFAULT_MAX_RETAINED_CAPACITY: usize = 1 << 20;

/// Configuration for a [`BufferPool`](super::BufferPool).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Initial capacity of byte slices manufactured by the pool.
    pub bytes_capacity: usize,
    /// Maximum idle values retained per free-list. Zero disables reuse.
    pub max_idle: usize,
    /// Values that grew beyond this capacity are dropped on release.
    pub max_retained_capacity: usize,
}

impl PoolConfig {
    /// Set the initial capacity of manufactured byte slices.
    pub fn bytes_capacity(mut self, capacity: usize) -> Self {
        self.bytes_capacity = capacity;
        self
    }

    /// Set the maximum number of idle values per free-list.
    pub fn max_idle(mut self, limit: usize) -> Self {
        self.max_idle = limit;
        self
    }

    /// Set the retention ceiling for released values.
    pub fn max_retained_capacity(mut self, capacity: usize) -> Self {
        self.max_retained_capacity = capacity;
        self
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            bytes_capacity: DEFAULT_BYTES_CAPACITY,
            max_idle: DEFAULT_MAX_IDLE,
            max_retained_capacity: DEFAULT_MAX_RETAINED_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_config_default() {
        let config = PoolConfig::default();
        assert_eq!(config.bytes_capacity, 32 * 1024);
        assert_eq!(config.max_idle, DEFAULT_MAX_IDLE);
        assert_eq!(config.max_retained_capacity, DEFAULT_MAX_RETAINED_CAPACITY);
    }

    #[test]
    fn test_pool_config_setters() {
        let config = PoolConfig::default()
            .bytes_capacity(128)
            .max_idle(2)
            .max_retained_capacity(4096);

        assert_eq!(config.bytes_capacity, 128);
        assert_eq!(config.max_idle, 2);
        assert_eq!(config.max_retained_capacity, 4096);
    }
}
