// ============================================================
// Layer 4 - Batch Iterator
// ============================================================
// Cuts `num_records` into consecutive half-open windows:
//
//   [0, bs), [bs, 2·bs), ..., [k·bs, min((k+1)·bs, n))
//
// How many windows there are depends on the convention:
//
//   DropTrailing     num_batches = ⌊(n − 1) / bs⌋
//   IncludeTrailing  num_batches = ⌊(n − 1) / bs⌋ + 1
//
// Example with n = 257, bs = 128:
//   DropTrailing    → [0,128) [128,256)          (record 256 unseen)
//   IncludeTrailing → [0,128) [128,256) [256,257)
//
// Example with n = 256, bs = 128:
//   DropTrailing    → [0,128)                     (a full batch unseen)
//   IncludeTrailing → [0,128) [128,256)
//
// DropTrailing is what training and validation have always used;
// test inference always uses IncludeTrailing so every record gets
// a prediction.

use std::ops::Range;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchCount {
    DropTrailing,
    IncludeTrailing,
}

/// A restartable description of the batches over one split.
/// Call `iter()` as many times as needed; each call starts from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    num_records: usize,
    batch_size:  usize,
    convention:  BatchCount,
}

impl BatchPlan {
    /// # Panics
    /// Panics if `batch_size` is 0.
    pub fn new(num_records: usize, batch_size: usize, convention: BatchCount) -> Self {
        assert!(batch_size > 0, "batch_size must be positive");
        Self { num_records, batch_size, convention }
    }

    pub fn num_records(&self) -> usize {
        self.num_records
    }

    pub fn num_batches(&self) -> usize {
        if self.num_records == 0 {
            return 0;
        }
        let full = (self.num_records - 1) / self.batch_size;
        match self.convention {
            BatchCount::DropTrailing    => full,
            BatchCount::IncludeTrailing => full + 1,
        }
    }

    pub fn iter(&self) -> BatchRanges {
        BatchRanges { plan: *self, next: 0, total: self.num_batches() }
    }
}

impl IntoIterator for &BatchPlan {
    type Item     = Range<usize>;
    type IntoIter = BatchRanges;

    fn into_iter(self) -> BatchRanges {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct BatchRanges {
    plan:  BatchPlan,
    next:  usize,
    total: usize,
}

impl Iterator for BatchRanges {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Range<usize>> {
        if self.next >= self.total {
            return None;
        }
        let start = self.next * self.plan.batch_size;
        let end   = (start + self.plan.batch_size).min(self.plan.num_records);
        self.next += 1;
        Some(start..end)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.total - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for BatchRanges {}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizes(plan: BatchPlan) -> Vec<usize> {
        plan.iter().map(|r| r.len()).collect()
    }

    #[test]
    fn test_drop_trailing_257() {
        let plan = BatchPlan::new(257, 128, BatchCount::DropTrailing);
        assert_eq!(plan.iter().collect::<Vec<_>>(), vec![0..128, 128..256]);
    }

    #[test]
    fn test_drop_trailing_loses_full_last_batch() {
        let plan = BatchPlan::new(256, 128, BatchCount::DropTrailing);
        assert_eq!(sizes(plan), vec![128]);
    }

    #[test]
    fn test_include_trailing_257() {
        let plan = BatchPlan::new(257, 128, BatchCount::IncludeTrailing);
        assert_eq!(sizes(plan), vec![128, 128, 1]);
    }

    #[test]
    fn test_include_trailing_exact_multiple() {
        let plan = BatchPlan::new(256, 128, BatchCount::IncludeTrailing);
        assert_eq!(sizes(plan), vec![128, 128]);
    }

    #[test]
    fn test_small_split_under_drop_trailing() {
        // 4 records, batch 2: ⌊3/2⌋ = 1 batch
        assert_eq!(sizes(BatchPlan::new(4, 2, BatchCount::DropTrailing)), vec![2]);
        // a single record never makes a batch
        assert!(sizes(BatchPlan::new(1, 8, BatchCount::DropTrailing)).is_empty());
    }

    #[test]
    fn test_empty_split() {
        assert_eq!(BatchPlan::new(0, 4, BatchCount::IncludeTrailing).num_batches(), 0);
        assert_eq!(BatchPlan::new(0, 4, BatchCount::DropTrailing).num_batches(), 0);
    }

    #[test]
    fn test_restartable() {
        let plan  = BatchPlan::new(10, 3, BatchCount::IncludeTrailing);
        let first: Vec<_> = plan.iter().collect();
        let again: Vec<_> = (&plan).into_iter().collect();
        assert_eq!(first, again);
        assert_eq!(plan.iter().len(), 4);
    }

    #[test]
    #[should_panic]
    fn test_zero_batch_size_panics() {
        let _ = BatchPlan::new(10, 0, BatchCount::DropTrailing);
    }
}
