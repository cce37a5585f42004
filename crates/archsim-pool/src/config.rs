//! Buffer pool configuration.

/// Default ceiling on randomly generated content per buffer (1 MB).
pub const DEFAULT_RANDOM_CONTENT_CAP: usize = 1_000_000;

/// Configuration for a [`BufferPool`](crate::BufferPool).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Seed for generated buffer content. Two pools with the same seed
    /// produce byte-identical content for the same sequence of `create`
    /// calls.
    pub seed: u64,
    /// Generated content is random up to this many bytes and zero
    /// beyond it. Default: [`DEFAULT_RANDOM_CONTENT_CAP`].
    pub random_content_cap: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            random_content_cap: DEFAULT_RANDOM_CONTENT_CAP,
        }
    }
}

impl PoolConfig {
    /// Default configuration with the given seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BufferPool;

    #[test]
    fn default_pool_zero_fills_past_one_megabyte() {
        let mut pool = BufferPool::new(PoolConfig::with_seed(9));
        let id = pool.create(1_000_016, None, None).unwrap();
        let content = pool.get(id).unwrap().content();
        assert!(content[DEFAULT_RANDOM_CONTENT_CAP..].iter().all(|&b| b == 0));
        assert!(content[DEFAULT_RANDOM_CONTENT_CAP - 16..DEFAULT_RANDOM_CONTENT_CAP]
            .iter()
            .any(|&b| b != 0));
    }
}
