// ============================================================
// Layer 4 — TreeDataset
// ============================================================
// The parsed corpus, owned in memory. The trainer reshuffles it
// in place at the start of every epoch with the run's seeded
// StdRng; stats() summarises its shape for the load-time log.

use rand::{seq::SliceRandom, Rng};

use crate::domain::syntax_tree::SyntaxTree;

/// An ordered collection of parsed trees with ids assigned.
pub struct TreeDataset {
    trees: Vec<SyntaxTree>,
}

impl TreeDataset {
    pub fn new(trees: Vec<SyntaxTree>) -> Self { Self { trees } }

    pub fn len(&self) -> usize { self.trees.len() }

    pub fn is_empty(&self) -> bool { self.trees.is_empty() }

    pub fn trees(&self) -> &[SyntaxTree] { &self.trees }

    /// Reorder the trees in place (Fisher-Yates).
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.trees.shuffle(rng);
    }

    pub fn stats(&self) -> CorpusStats {
        let mut stats = CorpusStats {
            trees:          self.trees.len(),
            nodes:          0,
            internal_nodes: 0,
            max_branching:  0,
            min_depth:      usize::MAX,
            max_depth:      0,
        };
        for tree in &self.trees {
            stats.nodes          += tree.num_nodes();
            stats.internal_nodes += tree.num_internal_nodes();
            stats.max_branching   = stats.max_branching.max(tree.max_branch_count());
            stats.min_depth       = stats.min_depth.min(tree.min_depth());
            stats.max_depth       = stats.max_depth.max(tree.max_depth());
        }
        if self.trees.is_empty() {
            stats.min_depth = 0;
        }
        stats
    }
}

/// Shape summary of a corpus, logged at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusStats {
    pub trees:          usize,
    pub nodes:          usize,
    pub internal_nodes: usize,
    pub max_branching:  usize,
    pub min_depth:      usize,
    pub max_depth:      usize,
}
