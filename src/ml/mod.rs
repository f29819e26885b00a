// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn model, optimizer and training code lives here.
//
//   leaf_encoder.rs   word embeddings, optionally followed by a
//                     left-to-right and a right-to-left LSTM
//   tree_composer.rs  child-sum Tree-LSTM, one annotation per
//                     node, bottom-up without recursion
//   classifier.rs     tanh MLP, 5 sentiment classes
//   model.rs          the three above wired together, plus the
//                     per-tree loss and softmax predictions
//   optimizer.rs      SGD / Adagrad / Adadelta / RMSProp / Adam
//   trainer.rs        epochs, minibatches, dev evaluation and
//                     best-model checkpointing
//   predictor.rs      checkpoint → per-constituent labels
//
// Backend: NdArray on the CPU by default, Wgpu with the `wgpu`
// feature. Training wraps it in Autodiff.

pub mod leaf_encoder;

pub mod tree_composer;

pub mod classifier;

pub mod model;

pub mod optimizer;

pub mod trainer;

pub mod predictor;

#[cfg(not(feature = "wgpu"))]
pub type InferBackend = burn::backend::NdArray;

#[cfg(feature = "wgpu")]
pub type InferBackend = burn::backend::Wgpu;

pub type TrainBackend = burn::backend::Autodiff<InferBackend>;
