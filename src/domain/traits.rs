// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams between the data layer, the model and the use
// cases:
//
//   TreeSource       → anything that yields parsed trees
//                      (corpus files, in-memory lines in tests)
//   SentimentLabeler → anything that labels every constituent
//                      of a tree (the trained Tree-LSTM)
//
// The use cases only see these traits, so the pipeline can be
// exercised end to end without touching the filesystem.

use anyhow::Result;

use crate::domain::prediction::NodePrediction;
use crate::domain::syntax_tree::SyntaxTree;
use crate::domain::vocabulary::Vocabulary;

// ─── TreeSource ───────────────────────────────────────────────────────────────
/// A source of bracket-notation trees.
///
/// Implementations:
///   - TreeFileLoader → one tree per line of a corpus file
///   - InlineTrees    → a fixed list of lines
pub trait TreeSource {
    /// Parse every tree, converting tokens through `vocab`.
    /// Failed-parse placeholders are dropped; malformed trees are
    /// errors. Returned trees already carry node ids.
    fn load_trees(&self, vocab: &mut Vocabulary) -> Result<Vec<SyntaxTree>>;
}

// ─── SentimentLabeler ─────────────────────────────────────────────────────────
/// Predicts a sentiment distribution for every non-terminal.
///
/// Implementations:
///   - Predictor → a checkpointed Tree-LSTM model
pub trait SentimentLabeler {
    /// One prediction per non-terminal, in post-order.
    fn label_tree(&self, tree: &SyntaxTree) -> Result<Vec<NodePrediction>>;
}
