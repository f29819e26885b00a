// ============================================================
// Layer 5 — Classifier Head
// ============================================================
// Single hidden layer MLP applied to node annotations:
//
//   hidden = tanh(W_in · annotation + b_hidden)
//   scores = W_out · hidden + b_out          (5 classes)
//
// Only non-terminals are ever passed in; leaves are not
// classified.

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::tanh,
};

use crate::domain::syntax_tree::NUM_SENTIMENT_CLASSES;

#[derive(Config, Debug)]
pub struct ClassifierHeadConfig {
    pub input_dim:  usize,
    pub hidden_dim: usize,
}

impl ClassifierHeadConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ClassifierHead<B> {
        ClassifierHead {
            hidden: LinearConfig::new(self.input_dim, self.hidden_dim).init(device),
            output: LinearConfig::new(self.hidden_dim, NUM_SENTIMENT_CLASSES).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct ClassifierHead<B: Backend> {
    pub hidden: Linear<B>,
    pub output: Linear<B>,
}

impl<B: Backend> ClassifierHead<B> {
    /// annotations: [nodes, input_dim] → scores: [nodes, 5]
    pub fn forward(&self, annotations: Tensor<B, 2>) -> Tensor<B, 2> {
        self.output.forward(tanh(self.hidden.forward(annotations)))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_scores_have_five_classes() {
        let device = Default::default();
        let head = ClassifierHeadConfig::new(4, 3).init::<NdArray>(&device);
        let scores = head.forward(Tensor::ones([7, 4], &device));
        assert_eq!(scores.dims(), [7, NUM_SENTIMENT_CLASSES]);
    }
}
