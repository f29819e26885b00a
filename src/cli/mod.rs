// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with clap.
// Business logic is delegated to Layer 2 (application).
//
//   1. `train`  : fits the model, keeps the best dev checkpoint
//   2. `predict`: labels trees read from stdin
//
// Both install the Ctrl-C handler first so an interrupt stops
// at the next example or line instead of killing the process.

pub mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{Commands, PredictArgs, TrainArgs};
use std::io::{self, BufWriter};

use crate::infra::{
    checkpoint::ModelStore,
    interrupt::{install_interrupt_handler, CancellationToken},
};
use crate::ml::InferBackend;

#[derive(Parser, Debug)]
#[command(
    name = "treelstm-sentiment",
    version,
    about = "Train a Tree-LSTM sentiment classifier on bracketed trees, then label every constituent."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let cancel = install_interrupt_handler()?;
        match self.command {
            Commands::Train(args)   => run_train(args, &cancel),
            Commands::Predict(args) => run_predict(args, &cancel),
        }
    }
}

fn run_train(args: TrainArgs, cancel: &CancellationToken) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Training on '{}', early stopping on '{}'", args.training_set, args.dev_set);
    let use_case = TrainUseCase::new(args.into());
    let summary  = use_case.execute(cancel)?;

    match summary.best_dev_loss {
        Some(loss) => tracing::info!(
            "Done after {} epochs; best dev loss {:.4}",
            summary.epochs_completed,
            loss
        ),
        None => tracing::warn!("No epoch finished, so no checkpoint was written"),
    }
    if summary.interrupted {
        tracing::info!("Stopped by interrupt after {} updates", summary.updates);
    }
    Ok(())
}

fn run_predict(args: PredictArgs, cancel: &CancellationToken) -> Result<()> {
    use crate::application::predict_use_case::PredictUseCase;
    use crate::ml::predictor::Predictor;

    let device    = Default::default();
    let store     = ModelStore::new(&args.model);
    let predictor = Predictor::<InferBackend>::from_checkpoint(&store, &device)
        .with_context(|| format!("Cannot load model '{}'", args.model))?;

    let stdin  = io::stdin();
    let stdout = io::stdout();
    let count  = PredictUseCase::new(predictor).run(stdin.lock(), BufWriter::new(stdout.lock()), cancel)?;
    tracing::info!("Labelled {} sentences", count);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;
    use crate::ml::optimizer::OptimizerKind;

    #[test]
    fn test_train_flags_map_to_config() {
        let cli = Cli::try_parse_from([
            "treelstm-sentiment", "train", "train.txt", "dev.txt",
            "-i", "3", "-b", "25", "--adam", "--alpha", "0.01",
            "--no-clipping", "--checkpoint", "best.model",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();

        assert_eq!(cfg.training_set, "train.txt");
        assert_eq!(cfg.num_iterations, Some(3));
        assert_eq!(cfg.batch_size, 25);
        assert_eq!(cfg.optimizer.kind, OptimizerKind::Adam);
        assert_eq!(cfg.optimizer.alpha, Some(0.01));
        assert!(!cfg.optimizer.clipping);
        assert_eq!(cfg.checkpoint, "best.model");
    }

    #[test]
    fn test_defaults_to_sgd_with_underscore_aliases() {
        let cli = Cli::try_parse_from([
            "treelstm-sentiment", "train", "a", "b", "--learning_rate", "0.5", "--eta_decay", "0.1",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();

        assert_eq!(cfg.optimizer.kind, OptimizerKind::Sgd);
        assert_eq!(cfg.optimizer.learning_rate, Some(0.5));
        assert_eq!(cfg.optimizer.eta_decay, 0.1);
        assert!(cfg.optimizer.clipping);
        assert_eq!(cfg.num_iterations, None);
        assert_eq!(cfg.checkpoint, "sentiment.model");
    }

    #[test]
    fn test_eta_decay_defaults_to_off() {
        let cli = Cli::try_parse_from(["treelstm-sentiment", "train", "a", "b"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.optimizer.eta_decay, 0.0);
        assert_eq!(cfg.optimizer.learning_rate_for_epoch(5), cfg.optimizer.base_learning_rate());
    }

    #[test]
    fn test_optimizer_flags_are_exclusive() {
        assert!(Cli::try_parse_from(["treelstm-sentiment", "train", "a", "b", "--adam", "--sgd"]).is_err());
    }

    #[test]
    fn test_predict_takes_model_path() {
        let cli = Cli::try_parse_from(["treelstm-sentiment", "predict", "m.model"]).unwrap();
        let Commands::Predict(args) = cli.command else { panic!("expected predict") };
        assert_eq!(args.model, "m.model");
    }
}
