// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Everything that touches the filesystem or the process rather
// than the model:
//
//   checkpoint.rs      - best-model weights, best_model.json,
//                        train_config.json (CompactRecorder + serde)
//   tokenizer_store.rs - tokenizer.json load or word-level build
//   metrics.rs         - per-epoch metrics.csv
//   predictions.rs     - test_result.csv
//   cancel.rs          - Ctrl-C → cancellation flag
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

pub mod checkpoint;
pub mod tokenizer_store;
pub mod metrics;
pub mod predictions;
pub mod cancel;
