// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers for one goal each (training or
// prediction). No model math and no argument parsing here, only
// workflow coordination.

// The training workflow
pub mod train_use_case;

// Per-constituent prediction over stdin-style input
pub mod predict_use_case;
