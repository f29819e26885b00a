// ============================================================
// Layer 5 — Sentiment Model
// ============================================================
// Wires the three learned components together:
//
//   terminals ─► LeafEncoder ─► TreeComposer ─► ClassifierHead
//                (per leaf)     (per node)      (per non-terminal)
//
// score() returns the raw class scores of every non-terminal
// in post-order. From those, TreeScores gives the training loss
// (summed negative log-likelihood of the gold classes) or the
// per-node softmax distributions used for prediction.

use anyhow::Result;
use burn::{
    prelude::*,
    tensor::activation::{log_softmax, softmax},
};

use crate::domain::error::{ConfigError, TreeError};
use crate::domain::prediction::NodePrediction;
use crate::domain::syntax_tree::{SyntaxTree, NUM_SENTIMENT_CLASSES};
use crate::domain::traversal::post_order;
use crate::ml::classifier::{ClassifierHead, ClassifierHeadConfig};
use crate::ml::leaf_encoder::{LeafEncoder, LeafEncoderConfig};
use crate::ml::tree_composer::{TreeComposer, TreeComposerConfig};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
// These fields are written into every checkpoint, ahead of the weights.
#[derive(Config, Debug)]
pub struct SentimentModelConfig {
    /// Rows of the embedding table; the frozen vocabulary's length
    pub vocab_size:           usize,
    /// Stacked Tree-LSTM cells, and leaf LSTM layers when bidirectional
    #[config(default = 1)]
    pub lstm_layer_count:     usize,
    /// Width of a word embedding
    #[config(default = 50)]
    pub word_embedding_dim:   usize,
    /// Width of a node annotation
    #[config(default = 50)]
    pub node_embedding_dim:   usize,
    /// Hidden width of the classifier head
    #[config(default = 50)]
    pub final_hidden_dim:     usize,
    /// Widest node the composer accepts
    #[config(default = 5)]
    pub max_children:         usize,
    /// Run forward and reverse LSTMs over the leaves before composing;
    /// each direction then gets half of `node_embedding_dim`
    #[config(default = false)]
    pub bidirectional_leaves: bool,
}

impl SentimentModelConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let shape_error = |reason: &str| ConfigError::InvalidModelShape { reason: reason.to_string() };

        if self.vocab_size == 0 {
            return Err(shape_error("vocabulary is empty"));
        }
        if self.lstm_layer_count == 0 {
            return Err(shape_error("at least one layer is required"));
        }
        if self.word_embedding_dim == 0 || self.node_embedding_dim == 0 || self.final_hidden_dim == 0 {
            return Err(shape_error("dimensions must be positive"));
        }
        if self.max_children == 0 {
            return Err(shape_error("max_children must be positive"));
        }
        if self.bidirectional_leaves && self.node_embedding_dim % 2 != 0 {
            return Err(shape_error("node_embedding_dim must be even for bidirectional leaves"));
        }
        if !self.bidirectional_leaves && self.word_embedding_dim != self.node_embedding_dim {
            return Err(shape_error(
                "word_embedding_dim must equal node_embedding_dim without bidirectional leaves",
            ));
        }
        Ok(())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> SentimentModel<B> {
        let leaves = LeafEncoderConfig::new(self.vocab_size, self.word_embedding_dim, self.node_embedding_dim)
            .with_layer_count(self.lstm_layer_count)
            .with_bidirectional(self.bidirectional_leaves)
            .init(device);
        let composer = TreeComposerConfig::new(self.node_embedding_dim, self.node_embedding_dim)
            .with_layer_count(self.lstm_layer_count)
            .with_max_children(self.max_children)
            .init(device);
        let classifier = ClassifierHeadConfig::new(self.node_embedding_dim, self.final_hidden_dim)
            .init(device);
        SentimentModel { leaves, composer, classifier }
    }
}

#[derive(Module, Debug)]
pub struct SentimentModel<B: Backend> {
    pub leaves:     LeafEncoder<B>,
    pub composer:   TreeComposer<B>,
    pub classifier: ClassifierHead<B>,
}

impl<B: Backend> SentimentModel<B> {
    /// One annotation per node ([1, node_dim] each), indexed by id.
    pub fn annotate(&self, tree: &SyntaxTree, device: &B::Device) -> Result<Vec<Tensor<B, 2>>, TreeError> {
        let leaf_vectors = self.leaves.encode(&tree.terminals(), device);
        self.composer.compose(tree, leaf_vectors)
    }

    /// Class scores for every non-terminal of `tree`, in post-order.
    /// `None` when the tree is a single terminal.
    pub fn score<'t>(&self, tree: &'t SyntaxTree) -> Result<Option<TreeScores<'t, B>>, TreeError> {
        let device      = self.devices().into_iter().next().unwrap_or_default();
        let annotations = self.annotate(tree, &device)?;

        let mut nodes    = Vec::new();
        let mut selected = Vec::new();
        for node in post_order(tree)? {
            if node.is_terminal() {
                continue;
            }
            let id = node.id().ok_or(TreeError::UnassignedIds)?;
            selected.push(annotations[id].clone());
            nodes.push(node);
        }
        if nodes.is_empty() {
            return Ok(None);
        }

        let scores = self.classifier.forward(Tensor::cat(selected, 0));
        Ok(Some(TreeScores { nodes, scores }))
    }
}

/// Classifier output for the non-terminals of one tree.
pub struct TreeScores<'t, B: Backend> {
    /// Scored nodes in post-order; row r of `scores` belongs to nodes[r]
    pub nodes:  Vec<&'t SyntaxTree>,
    /// [nodes, 5]
    pub scores: Tensor<B, 2>,
}

impl<B: Backend> TreeScores<'_, B> {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Σ over nodes of −log softmax(scores)[gold] → shape [1]
    pub fn loss(&self) -> Tensor<B, 1> {
        let device = self.scores.device();
        let gold: Vec<i32> = self
            .nodes
            .iter()
            .map(|node| node.sentiment().unwrap_or_default() as i32)
            .collect();
        let gold = Tensor::<B, 1, Int>::from_ints(gold.as_slice(), &device).reshape([self.len(), 1]);

        log_softmax(self.scores.clone(), 1)
            .gather(1, gold)
            .sum()
            .neg()
    }

    /// Softmax distribution and argmax for each scored node.
    pub fn predictions(&self) -> Result<Vec<NodePrediction>> {
        let probabilities = softmax(self.scores.clone(), 1)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("Cannot read class probabilities: {e:?}"))?;

        Ok(self
            .nodes
            .iter()
            .zip(probabilities.chunks(NUM_SENTIMENT_CLASSES))
            .map(|(node, probs)| NodePrediction {
                terminals:     node.terminals(),
                gold:          node.sentiment().unwrap_or_default(),
                probabilities: probs.to_vec(),
            })
            .collect())
    }
}
