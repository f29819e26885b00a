// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Validate optimizer options  (Layer 5 - ml)
//   Step 2: Load training trees         (Layer 4 - data)
//   Step 3: Load dev trees              (Layer 4 - data)
//   Step 4: Validate batch size         (Layer 2)
//   Step 5: Freeze the vocabulary       (Layer 3 - domain)
//   Step 6: Run the training loop       (Layer 5 - ml)
//
// The dev set is read while the vocabulary is still open, so
// words that only occur there still get (untrained) rows.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::data::{dataset::TreeDataset, loader::TreeFileLoader};
use crate::domain::error::ConfigError;
use crate::domain::traits::TreeSource;
use crate::domain::vocabulary::Vocabulary;
use crate::infra::{checkpoint::ModelStore, interrupt::CancellationToken};
use crate::ml::model::SentimentModelConfig;
use crate::ml::optimizer::OptimizerSettings;
use crate::ml::trainer::{run_training, TrainingSummary};

// ─── Training Configuration ──────────────────────────────────────────────────
// Everything a training run needs. The model-shape fields end up
// in the checkpoint via SentimentModelConfig.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Corpus file, one bracketed tree per line
    pub training_set:         String,
    /// Held-out corpus that decides which epoch is checkpointed
    pub dev_set:              String,
    /// Where the best model is written
    pub checkpoint:           String,
    /// Optional per-epoch CSV
    pub metrics_csv:          Option<String>,
    /// `None` trains until interrupted
    pub num_iterations:       Option<usize>,
    /// Examples per optimizer update
    pub batch_size:           usize,
    /// 0 picks a random seed
    pub random_seed:          u64,
    /// Examples between two running-perplexity log lines
    pub report_frequency:     usize,
    pub optimizer:            OptimizerSettings,
    /// Model shape, copied into SentimentModelConfig
    pub lstm_layer_count:     usize,
    pub word_embedding_dim:   usize,
    pub node_embedding_dim:   usize,
    pub final_hidden_dim:     usize,
    pub max_children:         usize,
    pub bidirectional_leaves: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            training_set:         "train.txt".to_string(),
            dev_set:              "dev.txt".to_string(),
            checkpoint:           "sentiment.model".to_string(),
            metrics_csv:          None,
            num_iterations:       None,
            batch_size:           1,
            random_seed:          0,
            report_frequency:     500,
            optimizer:            OptimizerSettings::default(),
            lstm_layer_count:     1,
            word_embedding_dim:   50,
            node_embedding_dim:   50,
            final_hidden_dim:     50,
            max_children:         5,
            bidirectional_leaves: false,
        }
    }
}

impl TrainConfig {
    /// Checks that need the size of the training set.
    pub fn validate(&self, training_size: usize) -> Result<(), ConfigError> {
        self.optimizer.validate()?;
        if training_size == 0 {
            return Err(ConfigError::EmptyTrainingSet);
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.batch_size > training_size {
            return Err(ConfigError::BatchLargerThanDataset {
                batch_size: self.batch_size,
                training_size,
            });
        }
        Ok(())
    }

    pub fn model_config(&self, vocab_size: usize) -> SentimentModelConfig {
        SentimentModelConfig::new(vocab_size)
            .with_lstm_layer_count(self.lstm_layer_count)
            .with_word_embedding_dim(self.word_embedding_dim)
            .with_node_embedding_dim(self.node_embedding_dim)
            .with_final_hidden_dim(self.final_hidden_dim)
            .with_max_children(self.max_children)
            .with_bidirectional_leaves(self.bidirectional_leaves)
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self, cancel: &CancellationToken) -> Result<TrainingSummary> {
        let cfg = &self.config;

        // ── Step 1: Reject bad optimizer options before reading anything ─────
        cfg.optimizer.validate()?;

        // ── Steps 2-3: Load both corpora through one vocabulary ──────────────
        let mut vocab = Vocabulary::new();
        let train = load_dataset(&TreeFileLoader::new(&cfg.training_set), &mut vocab, "training")?;
        let dev   = load_dataset(&TreeFileLoader::new(&cfg.dev_set), &mut vocab, "dev")?;

        // ── Step 4: Batch size against the training set ───────────────────────
        cfg.validate(train.len())?;

        // ── Step 5: No more growth from here on ──────────────────────────────
        vocab.freeze();
        tracing::info!("Vocabulary: {} entries", vocab.len());

        // ── Step 6: Training loop (Layer 5) ──────────────────────────────────
        let store = ModelStore::new(&cfg.checkpoint);
        run_training(cfg, &vocab, train, &dev, &store, cancel)
    }
}

fn load_dataset(source: &impl TreeSource, vocab: &mut Vocabulary, name: &str) -> Result<TreeDataset> {
    let dataset = TreeDataset::new(source.load_trees(vocab)?);
    let stats   = dataset.stats();
    tracing::info!("Loaded {} {} trees", dataset.len(), name);
    tracing::debug!(
        "{} corpus: {} trees, {} nodes ({} internal), max branching {}, depth {}..{}",
        name,
        stats.trees,
        stats.nodes,
        stats.internal_nodes,
        stats.max_branching,
        stats.min_depth,
        stats.max_depth,
    );
    Ok(dataset)
}
