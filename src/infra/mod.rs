// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by both training and prediction:
//
//   checkpoint.rs  ModelStore; vocabulary, model config and
//                  weights in one versioned file
//   metrics.rs     perplexity windows and the optional
//                  per-epoch CSV log
//   interrupt.rs   Ctrl-C → CancellationToken

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Perplexity tracking and metrics CSV logger
pub mod metrics;

/// Cooperative cancellation on SIGINT
pub mod interrupt;
