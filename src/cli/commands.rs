// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `predict`, and all
// their flags. Hyperparameter flags also accept the underscore
// spelling (`--learning_rate`) used by older training scripts.

use clap::{ArgGroup, Args, Subcommand};

use crate::application::train_use_case::TrainConfig;
use crate::ml::optimizer::{OptimizerKind, OptimizerSettings};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a Tree-LSTM on a treebank, keeping the best model on the dev set
    Train(TrainArgs),

    /// Label every constituent of the trees read from stdin
    Predict(PredictArgs),
}

#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("optimizer").args(["sgd", "adagrad", "adadelta", "rmsprop", "adam"])
))]
pub struct TrainArgs {
    /// Training trees, one per line
    pub training_set: String,

    /// Dev trees, used for early stopping
    pub dev_set: String,

    /// Number of epochs; trains until interrupted when omitted
    #[arg(short = 'i', long, alias = "num_iterations")]
    pub num_iterations: Option<usize>,

    /// Examples per optimizer update
    #[arg(short = 'b', long, alias = "batch_size", default_value_t = 1)]
    pub batch_size: usize,

    /// Random seed; 0 picks one at random
    #[arg(short = 'r', long, alias = "random_seed", default_value_t = 0)]
    pub random_seed: u64,

    // ── Optimizer choice (default: SGD) ──────────────────────────────────────
    /// Stochastic gradient descent
    #[arg(long)]
    pub sgd: bool,
    /// Adagrad
    #[arg(long)]
    pub adagrad: bool,
    /// Adadelta
    #[arg(long)]
    pub adadelta: bool,
    /// RMSProp
    #[arg(long)]
    pub rmsprop: bool,
    /// Adam
    #[arg(long)]
    pub adam: bool,

    // ── Optimizer hyperparameters ────────────────────────────────────────────
    /// Learning rate (SGD, Adagrad, Adadelta and RMSProp only)
    #[arg(long, alias = "learning_rate")]
    pub learning_rate: Option<f64>,

    /// SGD with this momentum
    #[arg(long)]
    pub momentum: Option<f64>,

    /// Alpha (Adam only)
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Beta1 (Adam only)
    #[arg(long)]
    pub beta1: Option<f64>,

    /// Beta2 (Adam only)
    #[arg(long)]
    pub beta2: Option<f64>,

    /// Moving average decay (RMSProp and Adadelta only)
    #[arg(long)]
    pub rho: Option<f64>,

    /// Epsilon (Adagrad, Adadelta, RMSProp and Adam only)
    #[arg(long)]
    pub epsilon: Option<f64>,

    /// L2 regularization strength
    #[arg(long, default_value_t = 0.0)]
    pub regularization: f64,

    /// Learning rate decay per epoch (SGD only; 0 keeps the rate constant)
    #[arg(long, alias = "eta_decay", default_value_t = 0.0)]
    pub eta_decay: f64,

    /// Disable gradient clipping
    #[arg(long, alias = "no_clipping")]
    pub no_clipping: bool,

    // ── Output ───────────────────────────────────────────────────────────────
    /// Where the best model is written
    #[arg(long, default_value = "sentiment.model")]
    pub checkpoint: String,

    /// Examples between running perplexity reports
    #[arg(long, alias = "report_frequency", default_value_t = 500)]
    pub report_frequency: usize,

    /// Optional per-epoch metrics CSV
    #[arg(long, alias = "metrics_csv")]
    pub metrics_csv: Option<String>,

    // ── Model shape ──────────────────────────────────────────────────────────
    #[arg(long, alias = "lstm_layer_count", default_value_t = 1)]
    pub lstm_layer_count: usize,

    #[arg(long, alias = "word_embedding_dim", default_value_t = 50)]
    pub word_embedding_dim: usize,

    #[arg(long, alias = "node_embedding_dim", default_value_t = 50)]
    pub node_embedding_dim: usize,

    #[arg(long, alias = "final_hidden_dim", default_value_t = 50)]
    pub final_hidden_dim: usize,

    /// Widest node the composer accepts
    #[arg(long, alias = "max_children", default_value_t = 5)]
    pub max_children: usize,

    /// Run a bidirectional LSTM over the leaves before composing
    #[arg(long)]
    pub bidirectional: bool,
}

impl TrainArgs {
    fn optimizer_kind(&self) -> OptimizerKind {
        if self.adagrad {
            OptimizerKind::AdaGrad
        } else if self.adadelta {
            OptimizerKind::Adadelta
        } else if self.rmsprop {
            OptimizerKind::RmsProp
        } else if self.adam {
            OptimizerKind::Adam
        } else {
            OptimizerKind::Sgd
        }
    }
}

/// Boundary between Layer 1 and Layer 2; the application layer never
/// sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        let optimizer = OptimizerSettings {
            kind:           a.optimizer_kind(),
            learning_rate:  a.learning_rate,
            momentum:       a.momentum,
            alpha:          a.alpha,
            beta1:          a.beta1,
            beta2:          a.beta2,
            rho:            a.rho,
            epsilon:        a.epsilon,
            regularization: a.regularization,
            eta_decay:      a.eta_decay,
            clipping:       !a.no_clipping,
        };
        TrainConfig {
            training_set:         a.training_set,
            dev_set:              a.dev_set,
            checkpoint:           a.checkpoint,
            metrics_csv:          a.metrics_csv,
            num_iterations:       a.num_iterations,
            batch_size:           a.batch_size,
            random_seed:          a.random_seed,
            report_frequency:     a.report_frequency,
            optimizer,
            lstm_layer_count:     a.lstm_layer_count,
            word_embedding_dim:   a.word_embedding_dim,
            node_embedding_dim:   a.node_embedding_dim,
            final_hidden_dim:     a.final_hidden_dim,
            max_children:         a.max_children,
            bidirectional_leaves: a.bidirectional,
        }
    }
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Model file written by `train`
    pub model: String,
}
