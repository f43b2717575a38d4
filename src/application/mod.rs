// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// Workflow coordination only: no tensor math, no file formats.
//
//   train_use_case.rs   - config, split preparation, full training run
//   orchestrator.rs     - epoch loop, best-model selection, cancellation
//   predict_use_case.rs - relabel a split with a finished run's checkpoint
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The training workflow
pub mod train_use_case;

// Epoch loop over an EpochSession
pub mod orchestrator;

// Prediction with saved weights
pub mod predict_use_case;
