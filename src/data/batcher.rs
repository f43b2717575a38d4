// ============================================================
// Layer 4 - Classifier Batcher
// ============================================================
// Turns one window [start, end) of a PreparedSplit into device
// tensors for the model forward pass.
//
// How batching works here:
//   Input:  rows start..end of three [N, L] host columns
//   Output: ClassifierBatch with tensors of shape [end - start, L]
//
//   The host columns are already row-major, so a window is one
//   contiguous slice that only needs reshaping:
//   [r0_t0, ..., r0_tL, r1_t0, ..., rB_tL] → [B, L]
//
// Batches are cut by index range rather than through a shuffling
// DataLoader: every phase walks the split in order, so predictions
// line up with the labels and with the rows of the output CSV.
//
// Reference: Burn Book §4 (Batcher)

use std::ops::Range;

use burn::prelude::*;

use crate::data::dataset::PreparedSplit;
use crate::domain::bundle::HostTensor;

// ─── ClassifierBatch ──────────────────────────────────────────────────────────
/// A window of pair samples ready for the forward pass.
#[derive(Debug, Clone)]
pub struct ClassifierBatch<B: Backend> {
    /// Token ids - shape: [batch_size, seq_len]
    pub input_ids: Tensor<B, 2, Int>,

    /// 0 = first sentence, 1 = second - shape: [batch_size, seq_len]
    pub segment_ids: Tensor<B, 2, Int>,

    /// 1 = real token, 0 = padding - shape: [batch_size, seq_len]
    pub input_mask: Tensor<B, 2, Int>,

    /// Class index per pair - shape: [batch_size]; None for unlabelled splits
    pub labels: Option<Tensor<B, 1, Int>>,
}

// ─── ClassifierBatcher ────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct ClassifierBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> ClassifierBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    pub fn batch(&self, split: &PreparedSplit, range: Range<usize>) -> ClassifierBatch<B> {
        let batch_size = range.len();
        let seq_len    = split.seq_len();

        ClassifierBatch {
            input_ids:   self.matrix(&split.input_id, range.clone(), batch_size, seq_len),
            segment_ids: self.matrix(&split.segment_id, range.clone(), batch_size, seq_len),
            input_mask:  self.matrix(&split.input_mask, range.clone(), batch_size, seq_len),
            labels:      split.labels.as_ref().map(|labels| {
                let values = to_i32(labels.records(range));
                Tensor::<B, 1, Int>::from_ints(values.as_slice(), &self.device)
            }),
        }
    }

    fn matrix(
        &self,
        column:     &HostTensor,
        range:      Range<usize>,
        batch_size: usize,
        seq_len:    usize,
    ) -> Tensor<B, 2, Int> {
        // Burn Int tensors are built from i32 here, as in the rest of the crate
        let flat = to_i32(column.records(range));
        Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len])
    }
}

fn to_i32(values: &[i64]) -> Vec<i32> {
    values.iter().map(|&v| v as i32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bundle::{FeatureBundle, LabelVector, RawInput};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn split() -> PreparedSplit {
        let ids  = HostTensor::from_rows(&[vec![101, 5, 102], vec![101, 6, 102], vec![101, 7, 102]]).unwrap();
        let seg  = HostTensor::new(vec![0; 9], vec![3, 3]).unwrap();
        let mask = HostTensor::new(vec![1; 9], vec![3, 3]).unwrap();
        let features = FeatureBundle::new(RawInput::Tensor(ids), RawInput::Tensor(seg), RawInput::Tensor(mask));
        PreparedSplit::prepare(&features, Some(&LabelVector::from_classes(vec![0, 1, 1]))).unwrap()
    }

    #[test]
    fn test_batch_window_shapes() {
        let batcher = ClassifierBatcher::<TestBackend>::new(Default::default());
        let batch   = batcher.batch(&split(), 1..3);

        assert_eq!(batch.input_ids.dims()[0], 2);
        assert_eq!(batch.input_ids.dims(), [2, 3]);
        assert_eq!(batch.segment_ids.dims(), [2, 3]);

        let ids: Vec<i64> = batch.input_ids.into_data().convert::<i64>().to_vec().unwrap();
        assert_eq!(ids, vec![101, 6, 102, 101, 7, 102]);

        let labels: Vec<i64> = batch.labels.unwrap().into_data().convert::<i64>().to_vec().unwrap();
        assert_eq!(labels, vec![1, 1]);
    }
}
