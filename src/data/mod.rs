// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between a corpus file and the training loop:
//
//   corpus file (one bracket tree per line)
//       │
//       ▼
//   TreeFileLoader     → parses lines, skips "()", assigns ids
//       │
//       ▼
//   TreeDataset        → owns the trees, shuffles per epoch
//       │
//       ▼
//   MinibatchSchedule  → decides when accumulated gradients
//                        turn into an optimizer update

/// Reads bracket-notation corpora
pub mod loader;

/// Owned, shuffleable collection of trees
pub mod dataset;

/// Example counter that triggers optimizer updates
pub mod batcher;
