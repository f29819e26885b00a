// ============================================================
// Layer 5 — Optimizer Selection
// ============================================================
// Maps the user's optimizer choice onto Burn optimizers:
//
//   sgd      → SgdConfig (optional momentum)
//   adagrad  → AdaGradConfig
//   adadelta → Adadelta (below; Burn has none)
//   rmsprop  → RmsPropConfig (rho is Burn's `alpha`)
//   adam     → AdamConfig
//
// Shared by every optimizer:
//   - L2 regularization   → WeightDecayConfig(penalty)
//   - gradient clipping   → GradientClippingConfig::Norm(5.0), applied
//                           to each parameter tensor separately
//
// Only SGD decays its learning rate between epochs, and only when
// --eta-decay is given (the default 0 keeps it constant):
//   lr_epoch = lr / (1 + eta_decay · epoch)

use burn::{
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{
        adaptor::OptimizerAdaptor, decay::WeightDecayConfig, momentum::MomentumConfig,
        AdaGradConfig, AdamConfig, Optimizer, RmsPropConfig, SgdConfig, SimpleOptimizer,
    },
    prelude::*,
    record::Record,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

/// Per-parameter gradient norm threshold used when clipping is on.
pub const CLIPPING_THRESHOLD: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    #[default]
    Sgd,
    AdaGrad,
    Adadelta,
    RmsProp,
    Adam,
}

impl OptimizerKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Sgd      => "sgd",
            Self::AdaGrad  => "adagrad",
            Self::Adadelta => "adadelta",
            Self::RmsProp  => "rmsprop",
            Self::Adam     => "adam",
        }
    }
}

/// Optimizer choice plus the hyperparameters given on the command
/// line. `None` means "use the optimizer's default".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerSettings {
    pub kind:           OptimizerKind,
    /// Every optimizer except Adam
    pub learning_rate:  Option<f64>,
    /// SGD only; turns plain SGD into momentum SGD
    pub momentum:       Option<f64>,
    /// Adam's step size
    pub alpha:          Option<f64>,
    /// Adam first-moment decay
    pub beta1:          Option<f64>,
    /// Adam second-moment decay
    pub beta2:          Option<f64>,
    /// Moving-average decay of RMSProp and Adadelta
    pub rho:            Option<f64>,
    /// Denominator guard; not taken by SGD
    pub epsilon:        Option<f64>,
    /// L2 penalty, 0 disables weight decay
    pub regularization: f64,
    /// Per-epoch SGD learning-rate decay, 0 keeps it constant
    pub eta_decay:      f64,
    /// Clip each gradient tensor to norm CLIPPING_THRESHOLD
    pub clipping:       bool,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            kind:           OptimizerKind::Sgd,
            learning_rate:  None,
            momentum:       None,
            alpha:          None,
            beta1:          None,
            beta2:          None,
            rho:            None,
            epsilon:        None,
            regularization: 0.0,
            eta_decay:      0.0,
            clipping:       true,
        }
    }
}

impl OptimizerSettings {
    pub fn new(kind: OptimizerKind) -> Self {
        Self { kind, ..Self::default() }
    }

    /// Rejects hyperparameters that the chosen optimizer does not take.
    pub fn validate(&self) -> Result<(), ConfigError> {
        use OptimizerKind::*;
        let optimizer = self.kind.name();
        let reject = |option: &'static str| Err(ConfigError::UnsupportedOption { option, optimizer });

        if self.momentum.is_some() && self.kind != Sgd {
            return reject("momentum");
        }
        if self.kind != Adam {
            if self.alpha.is_some() {
                return reject("alpha");
            }
            if self.beta1.is_some() {
                return reject("beta1");
            }
            if self.beta2.is_some() {
                return reject("beta2");
            }
        }
        if self.kind == Adam && self.learning_rate.is_some() {
            return reject("learning_rate");
        }
        if self.rho.is_some() && !matches!(self.kind, RmsProp | Adadelta) {
            return reject("rho");
        }
        if self.epsilon.is_some() && self.kind == Sgd {
            return reject("epsilon");
        }
        Ok(())
    }

    /// Learning rate before any decay. For Adam this is `alpha`.
    pub fn base_learning_rate(&self) -> f64 {
        match self.kind {
            OptimizerKind::Sgd => self
                .learning_rate
                .unwrap_or(if self.momentum.is_some() { 0.01 } else { 0.1 }),
            OptimizerKind::AdaGrad  => self.learning_rate.unwrap_or(0.1),
            OptimizerKind::Adadelta => self.learning_rate.unwrap_or(1.0),
            OptimizerKind::RmsProp  => self.learning_rate.unwrap_or(0.1),
            OptimizerKind::Adam     => self.alpha.unwrap_or(0.001),
        }
    }

    /// Learning rate for a zero-based epoch index.
    pub fn learning_rate_for_epoch(&self, epoch: usize) -> f64 {
        let base = self.base_learning_rate();
        match self.kind {
            OptimizerKind::Sgd => base / (1.0 + self.eta_decay * epoch as f64),
            _                  => base,
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon.unwrap_or(match self.kind {
            OptimizerKind::Adadelta => 1e-6,
            OptimizerKind::Adam     => 1e-8,
            _                       => 1e-20,
        })
    }

    pub fn rho(&self) -> f64 {
        self.rho.unwrap_or(0.95)
    }

    fn weight_decay(&self) -> Option<WeightDecayConfig> {
        (self.regularization > 0.0).then(|| WeightDecayConfig::new(self.regularization as f32))
    }

    fn clipping_config(&self) -> Option<GradientClippingConfig> {
        self.clipping.then_some(GradientClippingConfig::Norm(CLIPPING_THRESHOLD))
    }

    // ── Burn optimizer builders ───────────────────────────────────────────────
    // One per kind; the trainer picks which to call.

    pub fn sgd<B: AutodiffBackend, M: AutodiffModule<B>>(&self) -> impl Optimizer<M, B> {
        let momentum = self.momentum.map(|m| {
            MomentumConfig::new()
                .with_momentum(m)
                .with_dampening(0.0)
                .with_nesterov(false)
        });
        SgdConfig::new()
            .with_momentum(momentum)
            .with_weight_decay(self.weight_decay())
            .with_gradient_clipping(self.clipping_config())
            .init::<B, M>()
    }

    pub fn adagrad<B: AutodiffBackend, M: AutodiffModule<B>>(&self) -> impl Optimizer<M, B> {
        AdaGradConfig::new()
            .with_lr_decay(0.0)
            .with_epsilon(self.epsilon() as f32)
            .with_weight_decay(self.weight_decay())
            .with_grad_clipping(self.clipping_config())
            .init::<B, M>()
    }

    pub fn adadelta<B: AutodiffBackend, M: AutodiffModule<B>>(&self) -> impl Optimizer<M, B> {
        AdadeltaConfig::new()
            .with_rho(self.rho())
            .with_epsilon(self.epsilon())
            .with_weight_decay(self.regularization)
            .with_grad_clipping(self.clipping_config())
            .init::<B, M>()
    }

    pub fn rmsprop<B: AutodiffBackend, M: AutodiffModule<B>>(&self) -> impl Optimizer<M, B> {
        RmsPropConfig::new()
            .with_alpha(self.rho() as f32)
            .with_momentum(0.0)
            .with_centered(false)
            .with_epsilon(self.epsilon() as f32)
            .with_weight_decay(self.weight_decay())
            .with_grad_clipping(self.clipping_config())
            .init::<B, M>()
    }

    pub fn adam<B: AutodiffBackend, M: AutodiffModule<B>>(&self) -> impl Optimizer<M, B> {
        AdamConfig::new()
            .with_beta_1(self.beta1.unwrap_or(0.9) as f32)
            .with_beta_2(self.beta2.unwrap_or(0.999) as f32)
            .with_epsilon(self.epsilon() as f32)
            .with_weight_decay(self.weight_decay())
            .with_grad_clipping(self.clipping_config())
            .init::<B, M>()
    }
}

// ─── Adadelta ─────────────────────────────────────────────────────────────────
// Zeiler (2012):
//   E[g²]  = ρ·E[g²]  + (1-ρ)·g²
//   Δx     = -√(E[Δx²] + ε) / √(E[g²] + ε) · g
//   E[Δx²] = ρ·E[Δx²] + (1-ρ)·Δx²
//   x      = x + lr·Δx

// No Debug: GradientClippingConfig does not implement it
#[derive(Config)]
pub struct AdadeltaConfig {
    #[config(default = 0.95)]
    pub rho:           f64,
    #[config(default = 1e-6)]
    pub epsilon:       f64,
    /// L2 penalty added to the gradient
    #[config(default = 0.0)]
    pub weight_decay:  f64,
    pub grad_clipping: Option<GradientClippingConfig>,
}

impl AdadeltaConfig {
    pub fn init<B: AutodiffBackend, M: AutodiffModule<B>>(&self) -> OptimizerAdaptor<Adadelta, M, B> {
        let optim = Adadelta {
            rho:          self.rho,
            epsilon:      self.epsilon,
            weight_decay: self.weight_decay,
        };
        let mut adaptor = OptimizerAdaptor::from(optim);
        if let Some(clipping) = &self.grad_clipping {
            adaptor = adaptor.with_grad_clipping(clipping.init());
        }
        adaptor
    }
}

#[derive(Debug, Clone)]
pub struct Adadelta {
    rho:          f64,
    epsilon:      f64,
    weight_decay: f64,
}

/// Running averages for one parameter tensor.
#[derive(Record, Clone)]
pub struct AdadeltaState<B: Backend, const D: usize> {
    pub square_grad:   Tensor<B, D>,
    pub square_update: Tensor<B, D>,
}

impl<B: Backend> SimpleOptimizer<B> for Adadelta {
    type State<const D: usize> = AdadeltaState<B, D>;

    fn step<const D: usize>(
        &self,
        lr:     f64,
        tensor: Tensor<B, D>,
        grad:   Tensor<B, D>,
        state:  Option<Self::State<D>>,
    ) -> (Tensor<B, D>, Option<Self::State<D>>) {
        let grad = if self.weight_decay > 0.0 {
            grad + tensor.clone().mul_scalar(self.weight_decay)
        } else {
            grad
        };

        let (square_grad, square_update) = match state {
            Some(state) => (state.square_grad, state.square_update),
            None        => (grad.zeros_like(), grad.zeros_like()),
        };

        let rho = self.rho;
        let square_grad = square_grad.mul_scalar(rho)
            + grad.clone().powf_scalar(2.0).mul_scalar(1.0 - rho);

        let update = square_update.clone().add_scalar(self.epsilon).sqrt()
            .div(square_grad.clone().add_scalar(self.epsilon).sqrt())
            .mul(grad)
            .neg();

        let square_update = square_update.mul_scalar(rho)
            + update.clone().powf_scalar(2.0).mul_scalar(1.0 - rho);

        let tensor = tensor + update.mul_scalar(lr);
        (tensor, Some(AdadeltaState { square_grad, square_update }))
    }

    fn to_device<const D: usize>(state: Self::State<D>, device: &B::Device) -> Self::State<D> {
        AdadeltaState {
            square_grad:   state.square_grad.to_device(device),
            square_update: state.square_update.to_device(device),
        }
    }
}
