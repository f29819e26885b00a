// ============================================================
// Layer 4 — Minibatch Schedule
// ============================================================
// Trees are processed one at a time (each has its own graph
// shape), so a "batch" is a count of examples whose gradients
// have been accumulated, not a stacked tensor.
//
//   record_example() after every tree
//   → true once `batch_size` examples are pending
//   → the caller applies one optimizer update and the
//     counter starts again
//
// The counter is never reset at epoch boundaries: a partial
// batch left at the end of an epoch is carried into the next
// epoch's first update.
//
// Example: batch_size = 4, 10 examples per epoch
//   epoch 1 → updates after examples 4 and 8, 2 left pending
//   epoch 2 → first update after its 2nd example

/// Counts pending examples and says when to update.
#[derive(Debug, Clone)]
pub struct MinibatchSchedule {
    batch_size: usize,
    pending:    usize,
    updates:    usize,
}

impl MinibatchSchedule {
    /// `batch_size` must be at least 1 (validated by TrainConfig).
    pub fn new(batch_size: usize) -> Self {
        Self { batch_size: batch_size.max(1), pending: 0, updates: 0 }
    }

    /// Register one processed example. Returns true when an
    /// update is due; the pending count is reset at that point.
    pub fn record_example(&mut self) -> bool {
        self.pending += 1;
        if self.pending == self.batch_size {
            self.pending = 0;
            self.updates += 1;
            true
        } else {
            false
        }
    }

    /// Gradient scale for each example of a batch.
    pub fn scale(&self) -> f64 {
        1.0 / self.batch_size as f64
    }

    /// Examples accumulated since the last update.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Updates triggered so far.
    pub fn updates(&self) -> usize {
        self.updates
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn run_epoch(schedule: &mut MinibatchSchedule, examples: usize) -> Vec<usize> {
        (1..=examples)
            .filter(|_| schedule.record_example())
            .collect()
    }

    #[test]
    fn test_partial_batch_carries_into_next_epoch() {
        let mut schedule = MinibatchSchedule::new(4);

        assert_eq!(run_epoch(&mut schedule, 10), vec![4, 8]);
        assert_eq!(schedule.pending(), 2);
        assert_eq!(schedule.updates(), 2);

        // Two examples were carried over, so the first update of
        // epoch 2 lands on its second example
        assert_eq!(run_epoch(&mut schedule, 10), vec![2, 6, 10]);
        assert_eq!(schedule.pending(), 0);
        assert_eq!(schedule.updates(), 5);
    }

    #[test]
    fn test_batch_size_one_updates_every_example() {
        let mut schedule = MinibatchSchedule::new(1);
        assert_eq!(run_epoch(&mut schedule, 3), vec![1, 2, 3]);
        assert_eq!(schedule.scale(), 1.0);
    }

    #[test]
    fn test_scale_is_inverse_batch_size() {
        let schedule = MinibatchSchedule::new(4);
        assert_eq!(schedule.scale(), 0.25);
    }
}
