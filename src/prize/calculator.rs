use crate::prize::distribution::{compute_prize_distribution, PrizeDistribution};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

/// Memoizing front for `compute_prize_distribution`.
///
/// Display code previews the same (participants, per_entry) pair on every
/// refresh; results are cached until `capacity` keys have been stored,
/// after which the cache starts over.
pub struct PrizeCalculator {
    cache: RwLock<HashMap<(u64, Decimal), PrizeDistribution>>,
    capacity: usize,
}

impl PrizeCalculator {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn distribution(&self, participants: u64, per_entry: Decimal) -> PrizeDistribution {
        let key = (participants, per_entry.normalize());

        {
            let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
            if let Some(hit) = cache.get(&key) {
                return hit.clone();
            }
        }

        let computed = compute_prize_distribution(participants, per_entry);

        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        if cache.len() >= self.capacity {
            debug!("Prize cache full ({} entries), clearing", cache.len());
            cache.clear();
        }
        cache.insert(key, computed.clone());
        computed
    }

    pub fn cached_len(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }
}

impl Default for PrizeCalculator {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_hits_same_key() {
        let calculator = PrizeCalculator::new(8);
        let first = calculator.distribution(100, Decimal::new(9, 1));
        let second = calculator.distribution(100, Decimal::new(90, 2));
        assert_eq!(first.total_pool, second.total_pool);
        assert_eq!(calculator.cached_len(), 1);
    }

    #[test]
    fn test_cache_clears_at_capacity() {
        let calculator = PrizeCalculator::new(2);
        calculator.distribution(1, Decimal::ONE);
        calculator.distribution(2, Decimal::ONE);
        calculator.distribution(3, Decimal::ONE);
        assert_eq!(calculator.cached_len(), 1);
    }
}
