// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types for the concepts every other layer shares:
// the parsed tree, its vocabulary, the bottom-up walk over it,
// per-node predictions, and the typed errors.
//
// Rules for this layer:
//   - NO Burn types
//   - NO file I/O
//   - Only structs, enums, traits and pure functions

/// Typed parse / config / composition errors
pub mod error;

/// Bracket-notation constituency tree
pub mod syntax_tree;

/// Token ↔ id table with an UNK entry
pub mod vocabulary;

/// Iterative children-first traversal
pub mod traversal;

/// Per-node classifier output
pub mod prediction;

/// Abstractions implemented by the data and ml layers
pub mod traits;
