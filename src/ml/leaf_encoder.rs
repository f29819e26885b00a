// ============================================================
// Layer 5 — Leaf Encoder
// ============================================================
// Turns the terminals of a tree (left to right) into one vector
// per leaf.
//
// Default mode: plain embedding lookup, no sequence model.
//
// Bidirectional mode (off by default, switched by
// `bidirectional_leaves` in the model config):
//   - a left-to-right LSTM stack and an independent
//     right-to-left LSTM stack, each half the output width
//   - position t's vector is [forward_t ; reverse_t]
//
// Output shape is always [num_leaves, leaf_dim].

use burn::{
    nn::{Embedding, EmbeddingConfig, Lstm, LstmConfig},
    prelude::*,
};

use crate::domain::vocabulary::WordId;

#[derive(Config, Debug)]
pub struct LeafEncoderConfig {
    pub vocab_size:    usize,
    pub embedding_dim: usize,
    /// Width of each leaf vector when the sequence encoder is on;
    /// each direction produces half of it
    pub output_dim:    usize,
    #[config(default = 1)]
    pub layer_count:   usize,
    #[config(default = false)]
    pub bidirectional: bool,
}

impl LeafEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> LeafEncoder<B> {
        let embedding = EmbeddingConfig::new(self.vocab_size, self.embedding_dim).init(device);
        let sequence  = self.bidirectional.then(|| self.build_sequence_encoder(device));
        LeafEncoder { embedding, sequence }
    }

    fn build_sequence_encoder<B: Backend>(&self, device: &B::Device) -> SequenceEncoder<B> {
        let half = self.output_dim / 2;
        let stack = || -> Vec<Lstm<B>> {
            (0..self.layer_count)
                .map(|layer| {
                    let input = if layer == 0 { self.embedding_dim } else { half };
                    LstmConfig::new(input, half, true).init(device)
                })
                .collect()
        };
        SequenceEncoder { left_to_right: stack(), right_to_left: stack() }
    }
}

#[derive(Module, Debug)]
pub struct LeafEncoder<B: Backend> {
    pub embedding: Embedding<B>,
    pub sequence:  Option<SequenceEncoder<B>>,
}

impl<B: Backend> LeafEncoder<B> {
    /// terminals: leaf ids in reading order → [num_leaves, leaf_dim]
    pub fn encode(&self, terminals: &[WordId], device: &B::Device) -> Tensor<B, 2> {
        let len = terminals.len();
        let ids: Vec<i32> = terminals.iter().map(|&w| w as i32).collect();
        let ids = Tensor::<B, 1, Int>::from_ints(ids.as_slice(), device).reshape([1, len]);

        let embedded = self.embedding.forward(ids); // [1, len, embedding_dim]
        let vectors = match &self.sequence {
            Some(sequence) => sequence.forward(embedded),
            None           => embedded,
        };

        let [_, _, dim] = vectors.dims();
        vectors.reshape([len, dim])
    }
}

/// Two one-directional LSTM stacks over the leaf sequence.
#[derive(Module, Debug)]
pub struct SequenceEncoder<B: Backend> {
    pub left_to_right: Vec<Lstm<B>>,
    pub right_to_left: Vec<Lstm<B>>,
}

impl<B: Backend> SequenceEncoder<B> {
    /// [1, len, embedding_dim] → [1, len, 2 * half]
    pub fn forward(&self, embedded: Tensor<B, 3>) -> Tensor<B, 3> {
        let [_, len, _] = embedded.dims();
        let device = embedded.device();

        // Index vector len-1, ..., 0 used to reverse the time axis
        let reversed: Vec<i32> = (0..len as i32).rev().collect();
        let reversed = Tensor::<B, 1, Int>::from_ints(reversed.as_slice(), &device);

        let forward_states = run_stack(&self.left_to_right, embedded.clone());
        let reverse_states = run_stack(&self.right_to_left, embedded.select(1, reversed.clone()))
            // Back to reading order so position t lines up with forward_t
            .select(1, reversed);

        Tensor::cat(vec![forward_states, reverse_states], 2)
    }
}

fn run_stack<B: Backend>(layers: &[Lstm<B>], input: Tensor<B, 3>) -> Tensor<B, 3> {
    layers
        .iter()
        .fold(input, |states, layer| layer.forward(states, None).0)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_embedding_only_shape() {
        let device = Default::default();
        let encoder = LeafEncoderConfig::new(10, 6, 6).init::<TestBackend>(&device);
        assert!(encoder.sequence.is_none());

        let vectors = encoder.encode(&[1, 2, 3], &device);
        assert_eq!(vectors.dims(), [3, 6]);
    }

    #[test]
    fn test_embedding_rows_follow_terminal_order() {
        let device = Default::default();
        let encoder = LeafEncoderConfig::new(10, 4, 4).init::<TestBackend>(&device);

        let pair     = encoder.encode(&[5, 7], &device);
        let seven    = encoder.encode(&[7], &device);
        let second   = pair.slice([1..2, 0..4]);
        let expected = seven.into_data().to_vec::<f32>().unwrap();
        assert_eq!(second.into_data().to_vec::<f32>().unwrap(), expected);
    }

    #[test]
    fn test_bidirectional_shape() {
        let device = Default::default();
        let encoder = LeafEncoderConfig::new(10, 6, 8)
            .with_bidirectional(true)
            .with_layer_count(2)
            .init::<TestBackend>(&device);
        assert!(encoder.sequence.is_some());

        let vectors = encoder.encode(&[1, 2, 3, 4], &device);
        assert_eq!(vectors.dims(), [4, 8]);
    }
}
