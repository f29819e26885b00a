// ============================================================
// Layer 3 — Domain Errors
// ============================================================
// Typed errors for the three failure families the domain can
// raise on its own:
//
//   ParseError : a bracket string that is not a valid tree
//   ConfigError: a run configuration that cannot start
//   TreeError  : a composition invariant that did not hold
//
// None of these are retried. The application layer wraps them
// in anyhow::Error with file/line context and main() turns them
// into a diagnostic plus a nonzero exit status.

use thiserror::Error;

/// A malformed bracket-notation tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A bare token containing `(`, `)` or a space.
    #[error("terminal '{token}' contains a disallowed character")]
    InvalidTerminal { token: String },

    /// A parenthesised node that does not end with `)`.
    #[error("node '{text}' is missing its closing parenthesis")]
    MissingClose { text: String },

    /// A parenthesised node with no space after its label.
    #[error("node '{text}' has a label but no content")]
    MissingContent { text: String },

    /// The node label is not a digit string.
    #[error("label '{label}' is not a sentiment class")]
    NonNumericLabel { label: String },

    /// The node label is numeric but outside the class range.
    #[error("sentiment class {class} is out of range (expected 0..{num_classes})")]
    ClassOutOfRange { class: u32, num_classes: usize },

    /// Parentheses that do not nest.
    #[error("unbalanced parentheses in '{text}'")]
    Unbalanced { text: String },

    /// A non-terminal that produced no child substrings.
    #[error("non-terminal '{text}' has no children")]
    NoChildren { text: String },
}

/// A configuration rejected before any computation begins.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("batch size must be at least 1")]
    ZeroBatchSize,

    #[error("batch size {batch_size} exceeds the training set size {training_size}")]
    BatchLargerThanDataset { batch_size: usize, training_size: usize },

    #[error("option --{option} is not supported by the {optimizer} optimizer")]
    UnsupportedOption { option: &'static str, optimizer: &'static str },

    #[error("the training set is empty")]
    EmptyTrainingSet,

    #[error("invalid model shape: {reason}")]
    InvalidModelShape { reason: String },
}

/// A bottom-up composition that broke one of its ordering invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("node ids have not been assigned")]
    UnassignedIds,

    #[error("node {node} refers to child {child} before it was computed")]
    ChildNotReady { node: usize, child: usize },

    #[error("node {node} was reached after {computed} annotations; ids are not post-order")]
    OutOfOrder { node: usize, computed: usize },

    #[error("node {node} has {children} children, more than the supported {max}")]
    TooManyChildren { node: usize, children: usize, max: usize },

    #[error("tree has {leaves} leaves but {vectors} leaf vectors were supplied")]
    LeafCountMismatch { leaves: usize, vectors: usize },

    #[error("produced {produced} annotations for a tree of {nodes} nodes")]
    AnnotationCountMismatch { produced: usize, nodes: usize },
}
