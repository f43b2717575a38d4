// ============================================================
// Layer 3 - Feature Bundle / Label Vector
// ============================================================
// A dataset split is three parallel integer columns plus an
// optional label column:
//
//   input_id    [N, L]  token ids,  [CLS] a [SEP] b [SEP] [PAD]...
//   segment_id  [N, L]  0 for the first sentence, 1 for the second
//   input_mask  [N, L]  1 = real token, 0 = padding
//   labels      [N]     class index per pair
//
// Columns arrive in whatever shape the loader produced them
// (`RawInput`) and are coerced into `HostTensor`, a row-major
// long-integer buffer, before batching.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::domain::error::DataError;

pub const INPUT_ID: &str = "input_id";
pub const SEGMENT_ID: &str = "segment_id";
pub const INPUT_MASK: &str = "input_mask";

// ─── HostTensor ───────────────────────────────────────────────────────────────
/// Long-integer tensor kept on the host. The first dimension is the
/// record dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostTensor {
    data:  Vec<i64>,
    shape: Vec<usize>,
}

impl HostTensor {
    pub fn new(data: Vec<i64>, shape: Vec<usize>) -> Result<Self, DataError> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(DataError::ShapeMismatch {
                what:  "tensor data vs shape",
                left:  data.len(),
                right: expected,
            });
        }
        Ok(Self { data, shape })
    }

    /// 1-D tensor, e.g. a label column.
    pub fn vector(data: Vec<i64>) -> Self {
        let shape = vec![data.len()];
        Self { data, shape }
    }

    /// Stack equal-length rows into an `[rows, width]` tensor.
    pub fn from_rows(rows: &[Vec<i64>]) -> Result<Self, DataError> {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * width);
        for row in rows {
            if row.len() != width {
                return Err(DataError::ShapeMismatch {
                    what:  "row length",
                    left:  row.len(),
                    right: width,
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self { data, shape: vec![rows.len(), width] })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn values(&self) -> &[i64] {
        &self.data
    }

    /// Size of the first dimension.
    pub fn num_records(&self) -> usize {
        self.shape.first().copied().unwrap_or(1)
    }

    /// Number of values making up one record.
    pub fn record_width(&self) -> usize {
        self.shape.iter().skip(1).product()
    }

    /// Flat values of records `[range.start, range.end)`.
    pub fn records(&self, range: Range<usize>) -> &[i64] {
        let w = self.record_width();
        &self.data[range.start * w..range.end * w]
    }
}

// ─── NumericArray ─────────────────────────────────────────────────────────────
/// Dense numeric array of any element type, stored as f64.
/// Coercion casts every value to i64 (truncating toward zero).
#[derive(Debug, Clone, PartialEq)]
pub struct NumericArray {
    pub values: Vec<f64>,
    pub shape:  Vec<usize>,
}

impl NumericArray {
    pub fn new(values: Vec<f64>, shape: Vec<usize>) -> Result<Self, DataError> {
        let expected: usize = shape.iter().product();
        if expected != values.len() {
            return Err(DataError::ShapeMismatch {
                what:  "array values vs shape",
                left:  values.len(),
                right: expected,
            });
        }
        Ok(Self { values, shape })
    }
}

// ─── RawInput ─────────────────────────────────────────────────────────────────
/// An input column before coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum RawInput {
    Array(NumericArray),
    Tensor(HostTensor),
    List(Vec<RawInput>),
    /// Straight out of a JSON file: numeric rectangular arrays are
    /// treated as arrays, everything else is rejected.
    Json(serde_json::Value),
}

// ─── FeatureBundle / LabelVector ─────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBundle {
    pub input_id:   RawInput,
    pub segment_id: RawInput,
    pub input_mask: RawInput,
}

impl FeatureBundle {
    pub fn new(input_id: RawInput, segment_id: RawInput, input_mask: RawInput) -> Self {
        Self { input_id, segment_id, input_mask }
    }

    /// Columns in the order the model consumes them.
    pub fn columns(&self) -> [(&'static str, &RawInput); 3] {
        [
            (INPUT_ID, &self.input_id),
            (SEGMENT_ID, &self.segment_id),
            (INPUT_MASK, &self.input_mask),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelVector(pub RawInput);

impl LabelVector {
    pub fn from_classes(classes: Vec<i64>) -> Self {
        Self(RawInput::Tensor(HostTensor::vector(classes)))
    }
}

/// One named split as loaded from disk.
#[derive(Debug, Clone)]
pub struct SplitData {
    pub name:     String,
    pub features: FeatureBundle,
    pub labels:   Option<LabelVector>,
}
