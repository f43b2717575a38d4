// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain Rust types and traits describing what the system works
// with: a split's feature columns, its labels, per-phase metrics,
// the best-model record and the error taxonomy.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain structs, enums and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Feature Bundle, Label Vector and the host tensor they coerce into
pub mod bundle;

// Loss / accuracy / F1 per phase and the best-model record
pub mod metrics;

// Typed data errors (unsupported input, count and shape mismatches)
pub mod error;

// Core abstractions (traits) that other layers implement
pub mod traits;
