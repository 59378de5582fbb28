//! Time-weighted average price oracle.
//!
//! Each pool carries a fixed-capacity ring of cumulative-price
//! observations. Before a pool mutates its reserves it records the spot
//! price that held since the previous observation; the guard layer then
//! compares post-trade spot against the average over a trailing block
//! window to reject single-call price manipulation.
//!
//! Cumulative arithmetic wraps on overflow. Deltas between observations
//! remain correct across a single wrap, which at realistic prices takes
//! longer than the engine's lifetime to occur twice in one window.

/// One oracle sample: the running price-time sum as of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub block: u64,
    /// Sum of `spot_price * blocks_held` over all prior intervals.
    pub price_cumulative: u128,
}

/// Ring buffer of observations for one pool.
#[derive(Debug, Clone)]
pub struct TwapOracle {
    observations: Vec<Observation>,
    /// Slot of the most recent observation.
    index: usize,
    /// Populated slots, grows until it reaches capacity.
    cardinality: usize,
    capacity: usize,
    /// Spot price recorded by the most recent write.
    last_price: u128,
}

impl TwapOracle {
    /// Create an empty oracle holding at most `capacity` observations.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            observations: Vec::with_capacity(capacity),
            index: 0,
            cardinality: 0,
            capacity,
            last_price: 0,
        }
    }

    /// Number of populated observation slots.
    #[must_use]
    pub fn cardinality(&self) -> usize {
        self.cardinality
    }

    /// Block of the most recent observation, if any.
    #[must_use]
    pub fn last_block(&self) -> Option<u64> {
        (self.cardinality > 0).then(|| self.observations[self.index].block)
    }

    /// Record the spot price in effect at `block`, before any reserve
    /// mutation in that block.
    ///
    /// The first write anchors the ring with a zero cumulative. At most
    /// one observation is kept per block; later writes in the same block
    /// are ignored, so a block's accrual is priced at its opening spot.
    pub fn write(&mut self, price: u128, block: u64) {
        if self.cardinality == 0 {
            self.observations.push(Observation { block, price_cumulative: 0 });
            self.cardinality = 1;
            self.index = 0;
            self.last_price = price;
            return;
        }

        let last = self.observations[self.index];
        if block <= last.block {
            return;
        }

        let delta = u128::from(block - last.block);
        let next = Observation {
            block,
            price_cumulative: last.price_cumulative.wrapping_add(price.wrapping_mul(delta)),
        };
        self.last_price = price;

        if self.cardinality < self.capacity {
            self.observations.push(next);
            self.index = self.cardinality;
            self.cardinality += 1;
        } else {
            self.index = (self.index + 1) % self.capacity;
            self.observations[self.index] = next;
        }
    }

    /// Average price over the `window` blocks trailing `current_block`,
    /// or `None` while the oracle lacks history covering the window.
    ///
    /// The boundary cumulative at `current_block - window` is linearly
    /// interpolated between its surrounding observations; the newest
    /// observation is extended to `current_block` at the last recorded
    /// spot when no write has landed there yet.
    #[must_use]
    pub fn consult(&self, window: u64, current_block: u64) -> Option<u128> {
        if self.cardinality < 2 || window == 0 {
            return None;
        }
        let target = current_block.checked_sub(window)?;

        let newest = self.observations[self.index];
        let end_cumulative = self.cumulative_at_or_after(newest, current_block);

        let target_cumulative = if target >= newest.block {
            self.cumulative_at_or_after(newest, target)
        } else {
            self.interpolate(target)?
        };

        Some(end_cumulative.wrapping_sub(target_cumulative) / u128::from(window))
    }

    /// Cumulative extended past the newest observation at `last_price`.
    fn cumulative_at_or_after(&self, newest: Observation, block: u64) -> u128 {
        let delta = u128::from(block.saturating_sub(newest.block));
        newest.price_cumulative.wrapping_add(self.last_price.wrapping_mul(delta))
    }

    /// Cumulative at `target`, interpolated between the two observations
    /// bracketing it. `None` when `target` predates the oldest retained
    /// observation.
    fn interpolate(&self, target: u64) -> Option<u128> {
        let (before, after) = self.surrounding(target)?;
        if before.block == target {
            return Some(before.price_cumulative);
        }
        let span = u128::from(after.block - before.block);
        let offset = u128::from(target - before.block);
        let delta = after.price_cumulative.wrapping_sub(before.price_cumulative);
        Some(before.price_cumulative.wrapping_add(delta / span * offset))
    }

    /// The observations bracketing `target`: `before.block <= target < after.block`.
    fn surrounding(&self, target: u64) -> Option<(Observation, Observation)> {
        let oldest_slot = if self.cardinality < self.capacity {
            0
        } else {
            (self.index + 1) % self.capacity
        };
        if self.observations[oldest_slot].block > target {
            return None;
        }
        for step in 0..self.cardinality - 1 {
            let i = (oldest_slot + step) % self.capacity;
            let j = (oldest_slot + step + 1) % self.capacity;
            let (before, after) = (self.observations[i], self.observations[j]);
            if before.block <= target && target < after.block {
                return Some((before, after));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use veilswap_types::constants::PRECISION;

    use super::*;

    const P: u128 = PRECISION;

    #[test]
    fn first_write_anchors_ring() {
        let mut oracle = TwapOracle::new(8);
        assert_eq!(oracle.cardinality(), 0);
        assert_eq!(oracle.last_block(), None);

        oracle.write(2_000 * P, 5);
        assert_eq!(oracle.cardinality(), 1);
        assert_eq!(oracle.last_block(), Some(5));
        assert_eq!(oracle.consult(10, 5), None);
    }

    #[test]
    fn constant_price_twap_is_that_price() {
        let mut oracle = TwapOracle::new(8);
        oracle.write(2_000 * P, 0);
        oracle.write(2_000 * P, 10);
        assert_eq!(oracle.consult(10, 10), Some(2_000 * P));
    }

    #[test]
    fn twap_weights_by_block_time() {
        let mut oracle = TwapOracle::new(8);
        // 2000 held for blocks 0..10, then 3000 for blocks 10..20.
        oracle.write(2_000 * P, 0);
        oracle.write(2_000 * P, 10);
        oracle.write(3_000 * P, 20);
        assert_eq!(oracle.consult(20, 20), Some(2_500 * P));
    }

    #[test]
    fn boundary_cumulative_is_interpolated() {
        let mut oracle = TwapOracle::new(8);
        oracle.write(2_000 * P, 0);
        oracle.write(2_000 * P, 10);
        oracle.write(3_000 * P, 20);
        // Window opens at block 5, halfway into the first interval.
        assert_eq!(oracle.consult(15, 20), Some(40_000 * P / 15));
    }

    #[test]
    fn newest_observation_extends_to_query_block() {
        let mut oracle = TwapOracle::new(8);
        oracle.write(2_000 * P, 0);
        oracle.write(2_000 * P, 10);
        // No write at block 20; the last spot carries forward.
        assert_eq!(oracle.consult(10, 20), Some(2_000 * P));
    }

    #[test]
    fn same_block_writes_keep_opening_price() {
        let mut oracle = TwapOracle::new(8);
        oracle.write(2_000 * P, 0);
        oracle.write(2_000 * P, 10);
        oracle.write(9_999 * P, 10);
        assert_eq!(oracle.cardinality(), 2);
        assert_eq!(oracle.consult(10, 10), Some(2_000 * P));
    }

    #[test]
    fn window_predating_history_is_unavailable() {
        let mut oracle = TwapOracle::new(8);
        oracle.write(2_000 * P, 100);
        oracle.write(2_000 * P, 110);
        assert_eq!(oracle.consult(20, 110), None);
        assert_eq!(oracle.consult(10, 110), Some(2_000 * P));
    }

    #[test]
    fn ring_wraps_and_drops_oldest() {
        let mut oracle = TwapOracle::new(4);
        for i in 0..6u64 {
            oracle.write(1_000 * P, i * 10);
        }
        assert_eq!(oracle.cardinality(), 4);
        assert_eq!(oracle.last_block(), Some(50));
        // Oldest retained observation is block 20.
        assert_eq!(oracle.consult(30, 50), Some(1_000 * P));
        assert_eq!(oracle.consult(40, 50), None);
    }

    #[test]
    fn price_step_shifts_average() {
        let mut oracle = TwapOracle::new(8);
        oracle.write(1_000 * P, 0);
        oracle.write(1_000 * P, 5);
        oracle.write(2_000 * P, 10);
        // Blocks 0..5 at 1000, blocks 5..10 at 2000.
        assert_eq!(oracle.consult(10, 10), Some(1_500 * P));
    }
}
