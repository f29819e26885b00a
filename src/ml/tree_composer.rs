// ============================================================
// Layer 5 — Tree Composer (child-sum Tree-LSTM)
// ============================================================
// Produces one annotation vector per tree node, children before
// parents, using a gated cell whose gates see every child:
//
//   h̃   = Σ_k h_k
//   i   = σ(W_i x + U_i h̃ + b_i)
//   o   = σ(W_o x + U_o h̃ + b_o)
//   u   = tanh(W_u x + U_u h̃ + b_u)
//   f_k = σ(W_f x + U_f h_k + b_f)        one per child
//   c   = i ⊙ u + Σ_k f_k ⊙ c_k
//   h   = o ⊙ tanh(c)
//
// Input x:
//   terminal     → the next leaf vector, left to right
//   non-terminal → zero_annotation(), a zero vector of the
//                  leaf width
//
// With several layers, layer l takes layer l-1's h at the same
// node as its x. The annotation of a node is the top layer's h.
//
// The walk itself is domain::traversal::fold_bottom_up, which
// never recurses and checks that every child is computed first.

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::{sigmoid, tanh},
};

use crate::domain::error::TreeError;
use crate::domain::syntax_tree::SyntaxTree;
use crate::domain::traversal::fold_bottom_up;

/// Input given to every non-terminal: all zeros, leaf width.
pub fn zero_annotation<B: Backend>(dim: usize, device: &B::Device) -> Tensor<B, 2> {
    Tensor::zeros([1, dim], device)
}

#[derive(Config, Debug)]
pub struct TreeComposerConfig {
    pub input_dim:    usize,
    pub hidden_dim:   usize,
    #[config(default = 1)]
    pub layer_count:  usize,
    #[config(default = 5)]
    pub max_children: usize,
}

impl TreeComposerConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TreeComposer<B> {
        let cells = (0..self.layer_count)
            .map(|layer| {
                let input = if layer == 0 { self.input_dim } else { self.hidden_dim };
                self.build_cell(input, device)
            })
            .collect();
        TreeComposer {
            cells,
            input_dim:    self.input_dim,
            max_children: self.max_children,
        }
    }

    fn build_cell<B: Backend>(&self, input_dim: usize, device: &B::Device) -> ChildSumCell<B> {
        let hidden = self.hidden_dim;
        ChildSumCell {
            input_gates:   LinearConfig::new(input_dim, 4 * hidden).init(device),
            hidden_gates:  LinearConfig::new(hidden, 3 * hidden).with_bias(false).init(device),
            forget_hidden: LinearConfig::new(hidden, hidden).with_bias(false).init(device),
        }
    }
}

/// Hidden and memory state of one cell at one node, each [1, hidden].
#[derive(Debug, Clone)]
pub struct CellState<B: Backend> {
    pub hidden: Tensor<B, 2>,
    pub memory: Tensor<B, 2>,
}

#[derive(Module, Debug)]
pub struct ChildSumCell<B: Backend> {
    /// x → [i | o | u | f] pre-activations (with bias)
    pub input_gates:   Linear<B>,
    /// h̃ → [i | o | u] contributions
    pub hidden_gates:  Linear<B>,
    /// h_k → f_k contribution, applied per child
    pub forget_hidden: Linear<B>,
}

impl<B: Backend> ChildSumCell<B> {
    pub fn forward(&self, input: Tensor<B, 2>, children: &[&CellState<B>]) -> CellState<B> {
        let device = input.device();
        let wx     = self.input_gates.forward(input);
        let hidden = wx.dims()[1] / 4;

        let (hidden_sum, child_memory) = if children.is_empty() {
            (Tensor::zeros([1, hidden], &device), Tensor::zeros([1, hidden], &device))
        } else {
            let k       = children.len();
            let child_h = Tensor::cat(children.iter().map(|s| s.hidden.clone()).collect(), 0);
            let child_c = Tensor::cat(children.iter().map(|s| s.memory.clone()).collect(), 0);

            // One forget gate per child: [k, hidden]
            let forget = sigmoid(
                gate(&wx, 3, hidden).expand([k, hidden]) + self.forget_hidden.forward(child_h.clone()),
            );
            (child_h.sum_dim(0), (forget * child_c).sum_dim(0))
        };

        let uh = self.hidden_gates.forward(hidden_sum);
        let i  = sigmoid(gate(&wx, 0, hidden) + gate(&uh, 0, hidden));
        let o  = sigmoid(gate(&wx, 1, hidden) + gate(&uh, 1, hidden));
        let u  = tanh(gate(&wx, 2, hidden) + gate(&uh, 2, hidden));

        let memory = i * u + child_memory;
        let hidden = o * tanh(memory.clone());
        CellState { hidden, memory }
    }
}

/// Columns [index*width, (index+1)*width) of a [1, n*width] row.
fn gate<B: Backend>(row: &Tensor<B, 2>, index: usize, width: usize) -> Tensor<B, 2> {
    row.clone().slice([0..1, index * width..(index + 1) * width])
}

#[derive(Module, Debug)]
pub struct TreeComposer<B: Backend> {
    pub cells:        Vec<ChildSumCell<B>>,
    pub input_dim:    usize,
    pub max_children: usize,
}

impl<B: Backend> TreeComposer<B> {
    /// One annotation per node, indexed by node id.
    ///
    /// `leaf_vectors` is [num_leaves, input_dim]; row t belongs to
    /// the t-th terminal in reading order and is used exactly once.
    pub fn compose(
        &self,
        tree:         &SyntaxTree,
        leaf_vectors: Tensor<B, 2>,
    ) -> Result<Vec<Tensor<B, 2>>, TreeError> {
        let [leaves, dim] = leaf_vectors.dims();
        let device        = leaf_vectors.device();
        let zero_input    = zero_annotation::<B>(self.input_dim, &device);
        let tree_leaves   = tree.num_nodes() - tree.num_internal_nodes();
        let mut next_leaf = 0usize;

        let states = fold_bottom_up(tree, |node, table: &[Vec<CellState<B>>]| {
            let node_id = node.id().ok_or(TreeError::UnassignedIds)?;
            if node.num_children() > self.max_children {
                return Err(TreeError::TooManyChildren {
                    node:     node_id,
                    children: node.num_children(),
                    max:      self.max_children,
                });
            }

            let input = if node.is_terminal() {
                if next_leaf >= leaves {
                    return Err(TreeError::LeafCountMismatch { leaves: tree_leaves, vectors: leaves });
                }
                let row = leaf_vectors.clone().slice([next_leaf..next_leaf + 1, 0..dim]);
                next_leaf += 1;
                row
            } else {
                zero_input.clone()
            };

            let mut child_layers = Vec::with_capacity(node.num_children());
            for child in node.children() {
                let child_id = child.id().ok_or(TreeError::UnassignedIds)?;
                child_layers.push(&table[child_id]);
            }

            let mut x      = input;
            let mut layers = Vec::with_capacity(self.cells.len());
            for (depth, cell) in self.cells.iter().enumerate() {
                let children: Vec<&CellState<B>> =
                    child_layers.iter().map(|states| &states[depth]).collect();
                let state = cell.forward(x, &children);
                x = state.hidden.clone();
                layers.push(state);
            }
            Ok(layers)
        })?;

        if next_leaf != leaves {
            return Err(TreeError::LeafCountMismatch { leaves: tree_leaves, vectors: leaves });
        }

        Ok(states
            .into_iter()
            .filter_map(|mut layers| layers.pop().map(|top| top.hidden))
            .collect())
    }
}
