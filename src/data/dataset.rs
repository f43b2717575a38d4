use crate::data::coercion::Coerce;
use crate::data::validator::count_records;
use crate::domain::bundle::{FeatureBundle, HostTensor, LabelVector, INPUT_ID, INPUT_MASK, SEGMENT_ID};
use crate::domain::error::DataError;

/// A split after coercion and record-count validation: three
/// `[N, L]` columns and, for labelled splits, an `[N]` label tensor.
#[derive(Debug, Clone)]
pub struct PreparedSplit {
    pub input_id:    HostTensor,
    pub segment_id:  HostTensor,
    pub input_mask:  HostTensor,
    pub labels:      Option<HostTensor>,
    pub num_records: usize,
}

impl PreparedSplit {
    pub fn prepare(features: &FeatureBundle, labels: Option<&LabelVector>) -> Result<Self, DataError> {
        let labels = labels
            .map(|l| l.0.coerce().and_then(|c| c.into_tensor()))
            .transpose()?;

        let [input_id, segment_id, input_mask] = features.columns().map(|(_, raw)| raw.coerce());
        let (input_id, segment_id, input_mask) = (input_id?, segment_id?, input_mask?);

        let num_records = count_records(&[&input_id, &segment_id, &input_mask], labels.as_ref())?;

        let input_id   = input_id.into_tensor()?;
        let segment_id = segment_id.into_tensor()?;
        let input_mask = input_mask.into_tensor()?;

        // One class index per record
        if let Some(labels) = &labels {
            if labels.record_width() != 1 {
                return Err(DataError::ShapeMismatch {
                    what:  "label values per record",
                    left:  labels.record_width(),
                    right: 1,
                });
            }
        }

        // [N, L] with L >= 1; an empty split may arrive as a bare `[]`
        if num_records > 0 {
            for column in [&input_id, &segment_id, &input_mask] {
                if column.shape().len() != 2 {
                    return Err(DataError::ShapeMismatch {
                        what:  "feature column rank",
                        left:  column.shape().len(),
                        right: 2,
                    });
                }
            }
            if input_id.record_width() == 0 {
                return Err(DataError::ShapeMismatch {
                    what:  "feature column width",
                    left:  0,
                    right: 1,
                });
            }
        }

        let width = input_id.record_width();
        for column in [&segment_id, &input_mask] {
            if column.record_width() != width {
                return Err(DataError::ShapeMismatch {
                    what:  "feature column width",
                    left:  column.record_width(),
                    right: width,
                });
            }
        }

        Ok(Self { input_id, segment_id, input_mask, labels, num_records })
    }

    /// Padded sequence length shared by the three columns.
    pub fn seq_len(&self) -> usize {
        self.input_id.record_width()
    }

    /// Check the split against what an embedding table of the given
    /// sizes can index, and the mask against {0, 1}. Negative values
    /// are out of range too.
    pub fn check_limits(&self, vocab_size: usize, max_seq_len: usize, type_vocab_size: usize) -> Result<(), DataError> {
        if self.seq_len() > max_seq_len {
            return Err(DataError::OutOfRange {
                column: "sequence length",
                value:  self.seq_len() as i64,
                limit:  max_seq_len,
            });
        }
        let columns = [
            (INPUT_ID, &self.input_id, vocab_size),
            (SEGMENT_ID, &self.segment_id, type_vocab_size),
            (INPUT_MASK, &self.input_mask, 2),
        ];
        for (column, tensor, limit) in columns {
            if let Some(&value) = tensor.values().iter().find(|&&v| v < 0 || v as usize >= limit) {
                return Err(DataError::OutOfRange { column, value, limit });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bundle::RawInput;
    use serde_json::json;

    fn bundle(n: usize) -> FeatureBundle {
        let rows: Vec<Vec<i64>> = (0..n).map(|i| vec![101, i as i64 + 1000, 102, 0]).collect();
        let tensor = HostTensor::from_rows(&rows).unwrap();
        FeatureBundle::new(
            RawInput::Tensor(tensor.clone()),
            RawInput::Tensor(HostTensor::new(vec![0; n * 4], vec![n, 4]).unwrap()),
            RawInput::Tensor(HostTensor::new(vec![1; n * 4], vec![n, 4]).unwrap()),
        )
    }

    #[test]
    fn test_prepare_labelled_split() {
        let split = PreparedSplit::prepare(&bundle(3), Some(&LabelVector::from_classes(vec![0, 1, 0]))).unwrap();
        assert_eq!(split.num_records, 3);
        assert_eq!(split.seq_len(), 4);
        assert_eq!(split.labels.unwrap().values(), &[0, 1, 0]);
    }

    #[test]
    fn test_prepare_rejects_short_labels() {
        let err = PreparedSplit::prepare(&bundle(100), Some(&LabelVector::from_classes(vec![0; 99]))).unwrap_err();
        assert!(matches!(err, DataError::RecordCountMismatch { expected: 99, found: 100 }));
    }

    #[test]
    fn test_prepare_json_columns() {
        let features = FeatureBundle::new(
            RawInput::Json(json!([[101, 7, 102], [101, 8, 102]])),
            RawInput::Json(json!([[0, 0, 0], [0, 0, 0]])),
            RawInput::Json(json!([[1, 1, 1], [1, 1, 1]])),
        );
        let labels = LabelVector(RawInput::Json(json!([1, 0])));
        let split  = PreparedSplit::prepare(&features, Some(&labels)).unwrap();
        assert_eq!(split.num_records, 2);
        assert_eq!(split.input_id.records(1..2), &[101, 8, 102]);
    }

    #[test]
    fn test_check_limits() {
        let split = PreparedSplit::prepare(&bundle(2), None).unwrap();
        // ids go up to 1001
        assert!(split.check_limits(1002, 4, 2).is_ok());
        assert_eq!(
            split.check_limits(1001, 4, 2).unwrap_err(),
            DataError::OutOfRange { column: INPUT_ID, value: 1001, limit: 1001 }
        );
        assert!(matches!(
            split.check_limits(2000, 3, 2),
            Err(DataError::OutOfRange { column: "sequence length", value: 4, limit: 3 })
        ));
    }

    #[test]
    fn test_two_dimensional_labels_are_rejected() {
        let features = FeatureBundle::new(
            RawInput::Json(json!([[101, 7, 102], [101, 8, 102]])),
            RawInput::Json(json!([[0, 0, 0], [0, 0, 0]])),
            RawInput::Json(json!([[1, 1, 1], [1, 1, 1]])),
        );
        let labels = LabelVector(RawInput::Json(json!([[0, 1], [1, 0]])));
        assert_eq!(
            PreparedSplit::prepare(&features, Some(&labels)).unwrap_err(),
            DataError::ShapeMismatch { what: "label values per record", left: 2, right: 1 }
        );

        // [N, 1] still carries one class per record
        let column = LabelVector(RawInput::Json(json!([[0], [1]])));
        let split  = PreparedSplit::prepare(&features, Some(&column)).unwrap();
        assert_eq!(split.labels.unwrap().records(1..2), &[1]);
    }

    #[test]
    fn test_zero_width_features_are_rejected() {
        let features = FeatureBundle::new(
            RawInput::Json(json!([[], []])),
            RawInput::Json(json!([[], []])),
            RawInput::Json(json!([[], []])),
        );
        assert_eq!(
            PreparedSplit::prepare(&features, None).unwrap_err(),
            DataError::ShapeMismatch { what: "feature column width", left: 0, right: 1 }
        );
    }

    #[test]
    fn test_flat_feature_column_is_rejected() {
        let features = FeatureBundle::new(
            RawInput::Json(json!([101, 102])),
            RawInput::Json(json!([0, 0])),
            RawInput::Json(json!([1, 1])),
        );
        assert!(matches!(
            PreparedSplit::prepare(&features, None),
            Err(DataError::ShapeMismatch { what: "feature column rank", .. })
        ));
    }

    #[test]
    fn test_mask_outside_zero_one_is_rejected() {
        let features = FeatureBundle::new(
            RawInput::Json(json!([[101, 7, 102]])),
            RawInput::Json(json!([[0, 0, 0]])),
            RawInput::Json(json!([[1, 1, 4294967297_i64]])),
        );
        let split = PreparedSplit::prepare(&features, None).unwrap();
        assert_eq!(
            split.check_limits(200, 3, 2).unwrap_err(),
            DataError::OutOfRange { column: INPUT_MASK, value: 4294967297, limit: 2 }
        );
    }

    #[test]
    fn test_prepare_width_mismatch() {
        let features = FeatureBundle::new(
            RawInput::Json(json!([[1, 2, 3]])),
            RawInput::Json(json!([[0, 0]])),
            RawInput::Json(json!([[1, 1, 1]])),
        );
        assert!(matches!(
            PreparedSplit::prepare(&features, None),
            Err(DataError::ShapeMismatch { .. })
        ));
    }
}
