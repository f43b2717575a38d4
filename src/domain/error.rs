// ============================================================
// Layer 3 - Data Errors
// ============================================================
// The fatal data conditions the pipeline can hit. Everything
// else (I/O, model, tokenizer) travels as anyhow::Error; these
// get their own type so callers and tests can match on them
// with `err.downcast_ref::<DataError>()`.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DataError {
    /// Tensor coercion met a value it has no conversion for.
    #[error("unsupported input type: {found} (expected numeric array, long tensor or list)")]
    UnsupportedType { found: String },

    /// Two streams that must describe the same records disagree on how many there are.
    #[error("record count mismatch: expected {expected} records, found {found}")]
    RecordCountMismatch { expected: usize, found: usize },

    /// Prediction / label accumulators (or a tensor's data and shape) diverged.
    #[error("shape mismatch: {what} ({left} vs {right})")]
    ShapeMismatch {
        what:  &'static str,
        left:  usize,
        right: usize,
    },

    /// The batch convention left nothing to iterate over.
    #[error("no batches to run: {num_records} records with batch size {batch_size}")]
    NoBatches { num_records: usize, batch_size: usize },

    /// A Feature Bundle column required by the model is absent.
    #[error("missing feature column '{0}'")]
    MissingColumn(String),

    /// A value the model cannot embed (token id past the vocabulary,
    /// sequence longer than the position table, unknown segment id).
    #[error("{column} value {value} out of range (limit {limit})")]
    OutOfRange {
        column: &'static str,
        value:  i64,
        limit:  usize,
    },
}
