// ============================================================
// Layer 6 — Model Store
// ============================================================
// One checkpoint file holds everything needed to predict:
//
//   line 1   JSON CheckpointHeader
//              format_version
//              vocabulary   (tokens in id order)
//              config       (SentimentModelConfig)
//   "\n"
//   rest     Burn NamedMpk record of the model weights
//
// Loading must go in that order: the vocabulary size and the
// config decide every parameter shape, so the module is built
// from them first and the weights are poured in afterwards.
//
// Writes go to "<path>.tmp" and are renamed over the target, so
// an interrupted save never leaves a half-written checkpoint.

use anyhow::{anyhow, bail, Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkBytesRecorder, Recorder},
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use crate::domain::vocabulary::Vocabulary;
use crate::ml::model::{SentimentModel, SentimentModelConfig};

pub const CHECKPOINT_FORMAT_VERSION: u32 = 1;

type WeightRecorder = NamedMpkBytesRecorder<FullPrecisionSettings>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointHeader {
    pub format_version: u32,
    pub vocabulary:     Vec<String>,
    pub config:         SentimentModelConfig,
}

/// A model rebuilt from disk together with its frozen vocabulary.
pub struct LoadedModel<B: Backend> {
    pub vocabulary: Vocabulary,
    pub config:     SentimentModelConfig,
    pub model:      SentimentModel<B>,
}

#[derive(Debug, Clone)]
pub struct ModelStore {
    path: PathBuf,
}

impl ModelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save<B: Backend>(
        &self,
        model:      &SentimentModel<B>,
        config:     &SentimentModelConfig,
        vocabulary: &Vocabulary,
    ) -> Result<()> {
        let header = CheckpointHeader {
            format_version: CHECKPOINT_FORMAT_VERSION,
            vocabulary:     vocabulary.tokens().to_vec(),
            config:         config.clone(),
        };
        let header = serde_json::to_string(&header).context("Cannot serialise checkpoint header")?;

        let weights = <WeightRecorder as Recorder<B>>::record(
            &WeightRecorder::default(),
            model.clone().into_record(),
            (),
        )
        .map_err(|e| anyhow!("Cannot serialise model weights: {e:?}"))?;

        let tmp = self.tmp_path();
        {
            let mut f = fs::File::create(&tmp)
                .with_context(|| format!("Cannot create '{}'", tmp.display()))?;
            f.write_all(header.as_bytes())?;
            f.write_all(b"\n")?;
            f.write_all(&weights)?;
            f.flush()?;
        }
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Cannot move checkpoint into '{}'", self.path.display()))?;

        tracing::debug!(
            "Saved checkpoint '{}' ({} words, {} weight bytes)",
            self.path.display(),
            vocabulary.len(),
            weights.len(),
        );
        Ok(())
    }

    pub fn load<B: Backend>(&self, device: &B::Device) -> Result<LoadedModel<B>> {
        let bytes = fs::read(&self.path)
            .with_context(|| format!("Cannot read model file '{}'", self.path.display()))?;

        let split = bytes
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| anyhow!("'{}' is not a model checkpoint", self.path.display()))?;
        let (header, weights) = (&bytes[..split], &bytes[split + 1..]);

        let header: CheckpointHeader = serde_json::from_slice(header)
            .with_context(|| format!("Corrupt checkpoint header in '{}'", self.path.display()))?;
        if header.format_version != CHECKPOINT_FORMAT_VERSION {
            bail!(
                "Unsupported checkpoint version {} (expected {})",
                header.format_version,
                CHECKPOINT_FORMAT_VERSION
            );
        }

        // 1. vocabulary
        let vocabulary = Vocabulary::from_tokens(header.vocabulary)
            .ok_or_else(|| anyhow!("Corrupt vocabulary in '{}'", self.path.display()))?;

        // 2. hyperparameters
        let config = header.config;
        if config.vocab_size != vocabulary.len() {
            bail!(
                "Checkpoint config expects {} words but the vocabulary has {}",
                config.vocab_size,
                vocabulary.len()
            );
        }
        config.validate()?;

        // 3. weights
        let record = <WeightRecorder as Recorder<B>>::load(&WeightRecorder::default(), weights.to_vec(), device)
            .map_err(|e| anyhow!("Cannot load model weights: {e:?}"))?;
        let model = config.init::<B>(device).load_record(record);

        tracing::info!(
            "Loaded model '{}' ({} words, node dim {})",
            self.path.display(),
            vocabulary.len(),
            config.node_embedding_dim,
        );
        Ok(LoadedModel { vocabulary, config, model })
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::syntax_tree::SyntaxTree;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn vocab_with(words: &[&str]) -> Vocabulary {
        let mut vocab = Vocabulary::new();
        for w in words {
            vocab.convert(w);
        }
        vocab
    }

    fn weights(model: &SentimentModel<TestBackend>) -> Vec<f32> {
        model
            .leaves
            .embedding
            .weight
            .val()
            .into_data()
            .to_vec::<f32>()
            .unwrap()
    }

    #[test]
    fn test_round_trip_restores_vocabulary_config_and_weights() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path().join("sentiment.model"));
        let device = Default::default();

        let vocab = vocab_with(&["2", "good", "movie"]);
        let config = SentimentModelConfig::new(vocab.len())
            .with_word_embedding_dim(4)
            .with_node_embedding_dim(4)
            .with_final_hidden_dim(3);
        let model = config.init::<TestBackend>(&device);
        store.save(&model, &config, &vocab).unwrap();
        assert!(!store.tmp_path().exists());

        let loaded = store.load::<TestBackend>(&device).unwrap();
        assert_eq!(loaded.vocabulary.len(), vocab.len());
        assert_eq!(loaded.vocabulary.tokens(), vocab.tokens());
        assert!(loaded.vocabulary.is_frozen());
        assert_eq!(loaded.config.vocab_size, config.vocab_size);
        assert_eq!(loaded.config.node_embedding_dim, 4);
        assert_eq!(weights(&loaded.model), weights(&model));
    }

    #[test]
    fn test_loaded_model_scores_like_the_saved_one() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path().join("m.bin"));
        let device = Default::default();

        let mut vocab = Vocabulary::new();
        let mut tree = SyntaxTree::parse("(3 (2 good) (1 movie))", &mut vocab).unwrap().unwrap();
        tree.assign_node_ids(0);

        let config = SentimentModelConfig::new(vocab.len())
            .with_word_embedding_dim(4)
            .with_node_embedding_dim(4)
            .with_final_hidden_dim(3);
        let model = config.init::<TestBackend>(&device);
        store.save(&model, &config, &vocab).unwrap();
        let loaded = store.load::<TestBackend>(&device).unwrap();

        let before = model.score(&tree).unwrap().unwrap().predictions().unwrap();
        let after  = loaded.model.score(&tree).unwrap().unwrap().predictions().unwrap();
        assert_eq!(before.len(), after.len());
        for (a, b) in before.iter().zip(&after) {
            for (x, y) in a.probabilities.iter().zip(&b.probabilities) {
                assert!((x - y).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path().join("nope.model"));
        let err = store.load::<TestBackend>(&Default::default()).err().unwrap();
        assert!(format!("{err:#}").contains("Cannot read model file"));
    }

    #[test]
    fn test_rejects_foreign_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.model");
        fs::write(&path, b"{\"format_version\": 1}\nxyz").unwrap();
        assert!(ModelStore::new(&path).load::<TestBackend>(&Default::default()).is_err());

        fs::write(&path, b"no newline at all").unwrap();
        assert!(ModelStore::new(&path).load::<TestBackend>(&Default::default()).is_err());
    }
}
