// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// Everything between files on disk and device tensors.
//
//   features.json / pairs.tsv
//       │
//       ▼
//   SplitLoader       → reads a split, encodes text pairs
//       │
//       ▼
//   Coerce            → every column becomes a long HostTensor
//       │
//       ▼
//   count_records     → feature and label counts must agree
//       │
//       ▼
//   PreparedSplit     → coerced + validated split
//       │
//       ▼
//   BatchPlan         → [start, end) windows over the split
//       │
//       ▼
//   ClassifierBatcher → device tensors for one window
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads splits from features.json or pairs.tsv
pub mod loader;

/// Encodes text pairs into [CLS] a [SEP] b [SEP] feature rows
pub mod preprocessor;

/// Normalises raw columns into long-integer host tensors
pub mod coercion;

/// Checks that all streams agree on the record count
pub mod validator;

/// Coerced and validated split, ready for batching
pub mod dataset;

/// Index windows over a split (drop-trailing / include-trailing)
pub mod batches;

/// Builds Burn tensors for one window
pub mod batcher;
