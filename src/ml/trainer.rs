// ============================================================
// Layer 5 — Training Loop
// ============================================================
// One tree at a time, no batching on the tensor side:
//
//   Idle
//    └─► (per epoch)
//         Shuffling           reorder the training trees
//         MinibatchIterating  forward, loss/batch_size, backward,
//                             accumulate; every batch_size-th
//                             example → one optimizer step
//         DevEvaluating       model.valid(), no updates
//         CheckpointDecision  dev loss <= best → save
//    └─► Stopped              epochs done or interrupted
//
// A partial minibatch at the end of an epoch is not flushed: its
// gradients and its example count carry over into the next epoch.
//
// Key Burn points:
//   - Training runs on TrainBackend (Autodiff<InferBackend>)
//   - model.valid() returns the same model on InferBackend, used
//     for dev evaluation and for the checkpoint
//   - GradientsAccumulator sums the per-example gradients; each
//     loss is pre-scaled by 1/batch_size before backward()

use anyhow::Result;
use burn::{
    module::AutodiffModule,
    optim::{GradientsAccumulator, GradientsParams, Optimizer},
    prelude::*,
};
use rand::{rngs::StdRng, SeedableRng};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::MinibatchSchedule, dataset::TreeDataset};
use crate::domain::syntax_tree::SyntaxTree;
use crate::domain::vocabulary::Vocabulary;
use crate::infra::{
    checkpoint::ModelStore,
    interrupt::CancellationToken,
    metrics::{perplexity, EpochMetrics, MetricsLogger, PerplexityWindow},
};
use crate::ml::model::{SentimentModel, SentimentModelConfig};
use crate::ml::optimizer::OptimizerKind;
use crate::ml::TrainBackend;

/// Where the loop is; logged at debug level on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingPhase {
    Idle,
    Shuffling,
    MinibatchIterating,
    DevEvaluating,
    CheckpointDecision,
    Stopped,
}

impl TrainingPhase {
    fn enter(&mut self, next: TrainingPhase, epoch: usize) {
        tracing::debug!(epoch, from = ?*self, to = ?next, "training phase");
        *self = next;
    }
}

/// Tracks the best dev loss. A tie counts as a new best; a NaN or
/// infinite loss never does.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckpointPolicy {
    best: Option<f64>,
}

impl CheckpointPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_new_best(&mut self, dev_loss: f64) -> bool {
        let improved = dev_loss.is_finite() && self.best.map_or(true, |best| dev_loss <= best);
        if improved {
            self.best = Some(dev_loss);
        }
        improved
    }

    pub fn best(&self) -> Option<f64> {
        self.best
    }
}

/// Totals over one pass of the dev set.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DevReport {
    pub loss:         f64,
    pub nodes:        usize,
    pub correct:      usize,
    pub roots:        usize,
    pub root_correct: usize,
}

impl DevReport {
    pub fn perplexity(&self) -> f64 {
        perplexity(self.loss, self.nodes)
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.correct, self.nodes)
    }

    pub fn root_accuracy(&self) -> f64 {
        ratio(self.root_correct, self.roots)
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 { 0.0 } else { part as f64 / whole as f64 }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingSummary {
    pub epochs_completed: usize,
    pub updates:          usize,
    pub best_dev_loss:    Option<f64>,
    /// Of the last training pass, partial or not
    pub train_perplexity: Option<f64>,
    pub interrupted:      bool,
}

/// Scores every dev tree without touching the parameters. `None` when
/// cancelled part way through.
pub fn evaluate<B: Backend>(
    model:  &SentimentModel<B>,
    trees:  &[SyntaxTree],
    cancel: &CancellationToken,
) -> Result<Option<DevReport>> {
    let mut report = DevReport::default();

    for tree in trees {
        if let Some(scores) = model.score(tree)? {
            report.loss  += scores.loss().into_scalar().elem::<f64>();
            report.nodes += scores.len();

            let predictions = scores.predictions()?;
            report.correct += predictions.iter().filter(|p| p.is_correct()).count();
            // Post-order: the root is the last scored node
            if let Some(root) = predictions.last() {
                report.roots += 1;
                if root.is_correct() {
                    report.root_correct += 1;
                }
            }
        }
        if cancel.is_cancelled() {
            return Ok(None);
        }
    }
    Ok(Some(report))
}

pub fn run_training(
    cfg:        &TrainConfig,
    vocabulary: &Vocabulary,
    train:      TreeDataset,
    dev:        &TreeDataset,
    store:      &ModelStore,
    cancel:     &CancellationToken,
) -> Result<TrainingSummary> {
    let device = <TrainBackend as Backend>::Device::default();

    // ── Seeding ───────────────────────────────────────────────────────────────
    // 0 means "pick one"; the chosen seed is logged so runs can be repeated
    let seed = if cfg.random_seed == 0 { rand::random::<u64>() } else { cfg.random_seed };
    <TrainBackend as Backend>::seed(seed);
    tracing::info!("Random seed: {}", seed);

    // ── Build model ───────────────────────────────────────────────────────────
    let model_cfg = cfg.model_config(vocabulary.len());
    model_cfg.validate()?;
    let model: SentimentModel<TrainBackend> = model_cfg.init(&device);
    tracing::info!(
        "Model ready: vocab={}, layers={}, word_dim={}, node_dim={}, hidden={}",
        model_cfg.vocab_size,
        model_cfg.lstm_layer_count,
        model_cfg.word_embedding_dim,
        model_cfg.node_embedding_dim,
        model_cfg.final_hidden_dim,
    );

    let metrics = cfg.metrics_csv.as_ref().map(MetricsLogger::create).transpose()?;
    if let Some(logger) = &metrics {
        tracing::info!("Epoch metrics go to '{}'", logger.csv_path().display());
    }

    let mut run = TrainingRun {
        cfg,
        model_cfg,
        vocabulary,
        store,
        cancel,
        metrics,
        train,
        dev,
        rng: StdRng::seed_from_u64(seed),
    };

    // ── Optimizer ─────────────────────────────────────────────────────────────
    type M = SentimentModel<TrainBackend>;
    let optim = &cfg.optimizer;
    tracing::info!(
        "Optimizer: {} (lr={}, clipping={}, l2={})",
        optim.kind.name(),
        optim.base_learning_rate(),
        optim.clipping,
        optim.regularization,
    );
    match optim.kind {
        OptimizerKind::Sgd      => run.execute(model, optim.sgd::<TrainBackend, M>()),
        OptimizerKind::AdaGrad  => run.execute(model, optim.adagrad::<TrainBackend, M>()),
        OptimizerKind::Adadelta => run.execute(model, optim.adadelta::<TrainBackend, M>()),
        OptimizerKind::RmsProp  => run.execute(model, optim.rmsprop::<TrainBackend, M>()),
        OptimizerKind::Adam     => run.execute(model, optim.adam::<TrainBackend, M>()),
    }
}

struct TrainingRun<'a> {
    cfg:        &'a TrainConfig,
    model_cfg:  SentimentModelConfig,
    vocabulary: &'a Vocabulary,
    store:      &'a ModelStore,
    cancel:     &'a CancellationToken,
    metrics:    Option<MetricsLogger>,
    train:      TreeDataset,
    dev:        &'a TreeDataset,
    rng:        StdRng,
}

impl TrainingRun<'_> {
    fn execute<O>(&mut self, mut model: SentimentModel<TrainBackend>, mut optim: O) -> Result<TrainingSummary>
    where
        O: Optimizer<SentimentModel<TrainBackend>, TrainBackend>,
    {
        let cfg                 = self.cfg;
        let report_frequency    = cfg.report_frequency.max(1);
        let mut phase           = TrainingPhase::Idle;
        let mut schedule        = MinibatchSchedule::new(cfg.batch_size);
        let mut accumulator     = GradientsAccumulator::<SentimentModel<TrainBackend>>::new();
        let mut policy          = CheckpointPolicy::new();
        let mut epochs_complete = 0usize;
        let mut train_perplexity = None;

        for epoch in 0..cfg.num_iterations.unwrap_or(usize::MAX) {
            phase.enter(TrainingPhase::Shuffling, epoch);
            self.train.shuffle(&mut self.rng);
            let lr = cfg.optimizer.learning_rate_for_epoch(epoch);

            // ── Training phase ────────────────────────────────────────────────
            phase.enter(TrainingPhase::MinibatchIterating, epoch);
            let mut window = PerplexityWindow::new();
            let mut whole  = PerplexityWindow::new();

            for (i, tree) in self.train.trees().iter().enumerate() {
                if let Some(scores) = model.score(tree)? {
                    let loss  = scores.loss();
                    let value = loss.clone().into_scalar().elem::<f64>();
                    window.record(value, scores.len());
                    whole.record(value, scores.len());

                    let grads = loss.mul_scalar(schedule.scale()).backward();
                    let grads = GradientsParams::from_grads(grads, &model);
                    accumulator.accumulate(&model, grads);
                }

                if schedule.record_example() {
                    model = optim.step(lr, model, accumulator.grads());
                }

                if i % report_frequency == report_frequency - 1 {
                    tracing::info!(
                        "--{:.3} perplexity: {:.4}",
                        epoch as f64 + (i + 1) as f64 / self.train.len() as f64,
                        window.perplexity(),
                    );
                    window.reset();
                }

                if self.cancel.is_cancelled() {
                    break;
                }
            }

            // A partial pass still reports its perplexity
            train_perplexity = Some(whole.perplexity());
            tracing::info!("==={} perplexity: {:.4}", epoch + 1, whole.perplexity());
            if self.cancel.is_cancelled() {
                tracing::info!(
                    "Interrupted during epoch {} after {} examples; skipping dev evaluation",
                    epoch + 1,
                    whole.examples(),
                );
                break;
            }
            if schedule.pending() > 0 {
                tracing::debug!("{} examples carried into the next update", schedule.pending());
            }

            // ── Validation phase ──────────────────────────────────────────────
            phase.enter(TrainingPhase::DevEvaluating, epoch);
            let model_valid = model.valid();
            let Some(report) = evaluate(&model_valid, self.dev.trees(), self.cancel)? else {
                tracing::info!("Interrupted during dev evaluation of epoch {}", epoch + 1);
                break;
            };

            // ── Checkpoint decision ───────────────────────────────────────────
            phase.enter(TrainingPhase::CheckpointDecision, epoch);
            let new_best = policy.is_new_best(report.loss);
            tracing::info!(
                "**{} dev perplexity: {:.4}{}",
                epoch + 1,
                report.perplexity(),
                if new_best { " (New best!)" } else { "" },
            );
            tracing::info!(
                "**{} dev accuracy: {:.2}% (roots {:.2}%)",
                epoch + 1,
                report.accuracy() * 100.0,
                report.root_accuracy() * 100.0,
            );

            if new_best {
                self.store.save(&model_valid, &self.model_cfg, self.vocabulary)?;
                tracing::info!("Checkpoint saved to '{}'", self.store.path().display());
            }

            if let Some(metrics) = &self.metrics {
                metrics.log(&EpochMetrics {
                    epoch:             epoch + 1,
                    train_perplexity:  whole.perplexity(),
                    dev_perplexity:    report.perplexity(),
                    dev_loss:          report.loss,
                    dev_accuracy:      report.accuracy(),
                    dev_root_accuracy: report.root_accuracy(),
                    new_best,
                })?;
            }
            epochs_complete += 1;

            if self.cancel.is_cancelled() {
                break;
            }
        }

        phase.enter(TrainingPhase::Stopped, epochs_complete);
        let summary = TrainingSummary {
            epochs_completed: epochs_complete,
            updates:          schedule.updates(),
            best_dev_loss:    policy.best(),
            train_perplexity,
            interrupted:      self.cancel.is_cancelled(),
        };
        tracing::info!("Training stopped: {:?}", summary);
        Ok(summary)
    }
}
