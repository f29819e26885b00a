// ============================================================
// Layer 3 — NodePrediction Domain Type
// ============================================================
// The classifier's answer for one non-terminal: the softmax
// distribution over the five sentiment classes and its argmax.
//
// Kept free of tensor types so prediction output can be
// formatted and tested without a backend.

use crate::domain::vocabulary::WordId;

#[derive(Debug, Clone, PartialEq)]
pub struct NodePrediction {
    /// Leaf labels spanned by the node, left to right
    pub terminals: Vec<WordId>,

    /// Gold class from the corpus
    pub gold: u32,

    /// Softmax probabilities, one per class
    pub probabilities: Vec<f32>,
}

impl NodePrediction {
    /// Most probable class; ties go to the lowest index.
    pub fn predicted(&self) -> usize {
        argmax(&self.probabilities)
    }

    pub fn is_correct(&self) -> bool {
        self.predicted() == self.gold as usize
    }
}

/// Index of the largest value, first one wins on ties.
/// An empty slice yields 0.
pub fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_picks_largest() {
        assert_eq!(argmax(&[0.1, 0.2, 0.5, 0.1, 0.1]), 2);
    }

    #[test]
    fn test_argmax_ties_go_to_lowest_index() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4, 0.0, 0.0]), 1);
        assert_eq!(argmax(&[0.2; 5]), 0);
    }

    #[test]
    fn test_correctness_against_gold() {
        let p = NodePrediction {
            terminals:     vec![1, 2],
            gold:          3,
            probabilities: vec![0.0, 0.1, 0.2, 0.6, 0.1],
        };
        assert_eq!(p.predicted(), 3);
        assert!(p.is_correct());
    }
}
