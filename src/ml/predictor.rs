// ============================================================
// Layer 5 — Predictor
// ============================================================
// Loads a checkpoint and labels every constituent of incoming
// trees. The vocabulary comes back frozen, so unseen words map
// to UNK instead of growing the table.

use anyhow::{Context, Result};
use burn::prelude::*;

use crate::domain::prediction::NodePrediction;
use crate::domain::syntax_tree::SyntaxTree;
use crate::domain::traits::SentimentLabeler;
use crate::domain::vocabulary::Vocabulary;
use crate::infra::checkpoint::ModelStore;
use crate::ml::model::SentimentModel;

pub struct Predictor<B: Backend> {
    model:      SentimentModel<B>,
    vocabulary: Vocabulary,
}

impl<B: Backend> Predictor<B> {
    pub fn new(model: SentimentModel<B>, mut vocabulary: Vocabulary) -> Self {
        vocabulary.freeze();
        Self { model, vocabulary }
    }

    pub fn from_checkpoint(store: &ModelStore, device: &B::Device) -> Result<Self> {
        let loaded = store.load::<B>(device)?;
        tracing::info!(
            "Loaded model: vocab={}, node_dim={}, bidirectional_leaves={}",
            loaded.config.vocab_size,
            loaded.config.node_embedding_dim,
            loaded.config.bidirectional_leaves,
        );
        Ok(Self::new(loaded.model, loaded.vocabulary))
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Parses one input line and numbers its nodes. `None` for the
    /// "()" placeholder.
    pub fn parse_line(&mut self, line: &str) -> Result<Option<SyntaxTree>> {
        let parsed = SyntaxTree::parse(line, &mut self.vocabulary)
            .with_context(|| format!("Malformed tree: {line}"))?;
        Ok(parsed.map(|mut tree| {
            tree.assign_node_ids(0);
            tree
        }))
    }
}

impl<B: Backend> SentimentLabeler for Predictor<B> {
    fn label_tree(&self, tree: &SyntaxTree) -> Result<Vec<NodePrediction>> {
        match self.model.score(tree)? {
            Some(scores) => scores.predictions(),
            None         => Ok(Vec::new()),
        }
    }
}
