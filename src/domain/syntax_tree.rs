// ============================================================
// Layer 3 — SyntaxTree
// ============================================================
// An n-ary constituency tree read from Penn-Treebank style
// bracket notation, e.g.
//
//   (3 (2 good) (1 movie))
//
// Every parenthesised node's label is a digit string that is
// both the constituent label and the gold sentiment class.
// Bare tokens are terminals (words).
//
// Node ids are NOT assigned while parsing. Call
// assign_node_ids() once before handing the tree to the model;
// ids are post-order, left to right, dense from zero, so every
// child id is smaller than its parent's id.
//
// The tree owns its children by value and is never mutated
// after id assignment.

use std::fmt;

use crate::domain::error::ParseError;
use crate::domain::vocabulary::{Vocabulary, WordId};

/// Number of sentiment classes (very negative .. very positive).
pub const NUM_SENTIMENT_CLASSES: usize = 5;

/// Placeholder id carried by a node before assign_node_ids().
const UNASSIGNED_ID: usize = usize::MAX;

/// Text emitted by the upstream parser when it fails on a sentence.
const FAILED_PARSE: &str = "()";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTree {
    label:     WordId,
    sentiment: Option<u32>,
    id:        usize,
    children:  Vec<SyntaxTree>,
}

impl SyntaxTree {
    /// Parse one tree in bracket notation.
    ///
    /// Returns `Ok(None)` for the failed-parse placeholder `()`;
    /// callers must skip it before training or prediction.
    pub fn parse(text: &str, vocab: &mut Vocabulary) -> Result<Option<Self>, ParseError> {
        if text == FAILED_PARSE {
            return Ok(None);
        }
        if !text.starts_with('(') {
            return Self::terminal(text, vocab).map(Some);
        }

        // ── Non-terminals: one open frame per unfinished node ─────────────────
        // A bracketed child pushes a frame; a frame whose children are
        // all built pops and becomes a child of the frame below it.
        let mut open = vec![OpenNode::start(text, vocab)?];
        while let Some(top) = open.last_mut() {
            if let Some(part) = top.next_part() {
                if part.starts_with('(') {
                    let child = OpenNode::start(part, vocab)?;
                    open.push(child);
                } else {
                    let leaf = Self::terminal(part, vocab)?;
                    top.children.push(leaf);
                }
                continue;
            }

            let Some(done) = open.pop() else { break };
            let node = done.finish();
            match open.last_mut() {
                Some(parent) => parent.children.push(node),
                None         => return Ok(Some(node)),
            }
        }
        // The root frame only leaves the stack through the return above
        Err(ParseError::Unbalanced { text: text.to_string() })
    }

    fn terminal(token: &str, vocab: &mut Vocabulary) -> Result<Self, ParseError> {
        if token.contains(['(', ')', ' ']) {
            return Err(ParseError::InvalidTerminal { token: token.to_string() });
        }
        Ok(Self {
            label:     vocab.convert(token),
            sentiment: None,
            id:        UNASSIGNED_ID,
            children:  Vec::new(),
        })
    }

    /// Every node of this subtree, parents first, left to right,
    /// with its depth below `self`.
    fn walk(&self) -> impl Iterator<Item = (usize, &SyntaxTree)> {
        let mut pending = vec![(0usize, self)];
        std::iter::from_fn(move || {
            let (depth, node) = pending.pop()?;
            pending.extend(node.children.iter().rev().map(|c| (depth + 1, c)));
            Some((depth, node))
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.children.is_empty()
    }

    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    pub fn children(&self) -> &[SyntaxTree] {
        &self.children
    }

    pub fn child(&self, i: usize) -> Option<&SyntaxTree> {
        self.children.get(i)
    }

    /// Vocabulary id of the word (terminal) or constituent label.
    pub fn label(&self) -> WordId {
        self.label
    }

    /// Gold sentiment class; `None` on terminals.
    pub fn sentiment(&self) -> Option<u32> {
        self.sentiment
    }

    /// Post-order id. `None` until assign_node_ids() has run.
    pub fn id(&self) -> Option<usize> {
        (self.id != UNASSIGNED_ID).then_some(self.id)
    }

    /// Size of this subtree, including this node.
    pub fn num_nodes(&self) -> usize {
        self.walk().count()
    }

    /// Number of non-terminals in this subtree; these are the
    /// nodes the classifier scores.
    pub fn num_internal_nodes(&self) -> usize {
        self.walk().filter(|(_, n)| !n.is_terminal()).count()
    }

    pub fn max_branch_count(&self) -> usize {
        self.walk().map(|(_, n)| n.num_children()).max().unwrap_or(0)
    }

    /// Length of the shortest root-to-leaf path.
    pub fn min_depth(&self) -> usize {
        self.leaf_depths().min().unwrap_or(0)
    }

    /// Length of the longest root-to-leaf path.
    pub fn max_depth(&self) -> usize {
        self.leaf_depths().max().unwrap_or(0)
    }

    fn leaf_depths(&self) -> impl Iterator<Item = usize> + '_ {
        self.walk().filter(|(_, n)| n.is_terminal()).map(|(d, _)| d)
    }

    /// Leaf labels in left-to-right reading order.
    pub fn terminals(&self) -> Vec<WordId> {
        self.walk()
            .filter(|(_, n)| n.is_terminal())
            .map(|(_, n)| n.label())
            .collect()
    }

    /// Number children first, left to right, starting at `start`.
    /// Returns the next free id so calls compose over subtrees.
    pub fn assign_node_ids(&mut self, start: usize) -> usize {
        // Parents before children, rightmost child first; read
        // backwards this is exactly post-order
        let mut pending = vec![self];
        let mut slots: Vec<&mut usize> = Vec::new();
        while let Some(node) = pending.pop() {
            slots.push(&mut node.id);
            pending.extend(node.children.iter_mut());
        }

        let count = slots.len();
        for (offset, slot) in slots.into_iter().rev().enumerate() {
            *slot = start + offset;
        }
        start + count
    }

    /// Bracket notation resolved through `vocab`.
    pub fn to_bracket_string(&self, vocab: &Vocabulary) -> String {
        self.display(vocab).to_string()
    }

    pub fn display<'a>(&'a self, vocab: &'a Vocabulary) -> TreeDisplay<'a> {
        TreeDisplay { tree: self, vocab }
    }
}

/// A non-terminal whose children are still being parsed.
struct OpenNode<'a> {
    label:    WordId,
    class:    u32,
    parts:    std::vec::IntoIter<&'a str>,
    children: Vec<SyntaxTree>,
}

impl<'a> OpenNode<'a> {
    /// Check `(LABEL child child ...)` and split out the children.
    fn start(text: &'a str, vocab: &mut Vocabulary) -> Result<Self, ParseError> {
        if text.len() < 2 || !text.ends_with(')') {
            return Err(ParseError::MissingClose { text: text.to_string() });
        }
        let first_space = text
            .find(' ')
            .ok_or_else(|| ParseError::MissingContent { text: text.to_string() })?;

        let label = &text[1..first_space];
        if label.is_empty() || !label.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseError::NonNumericLabel { label: label.to_string() });
        }
        let class = label.parse::<u32>().unwrap_or(u32::MAX);
        if class as usize >= NUM_SENTIMENT_CLASSES {
            return Err(ParseError::ClassOutOfRange { class, num_classes: NUM_SENTIMENT_CLASSES });
        }

        let body  = &text[first_space + 1..text.len() - 1];
        let parts = split_children(body, text)?;
        if parts.is_empty() {
            return Err(ParseError::NoChildren { text: text.to_string() });
        }

        Ok(Self {
            label:    vocab.convert(label),
            class,
            children: Vec::with_capacity(parts.len()),
            parts:    parts.into_iter(),
        })
    }

    fn next_part(&mut self) -> Option<&'a str> {
        self.parts.next()
    }

    fn finish(self) -> SyntaxTree {
        SyntaxTree {
            label:     self.label,
            sentiment: Some(self.class),
            id:        UNASSIGNED_ID,
            children:  self.children,
        }
    }
}

/// Split the inside of a node into child substrings.
///
/// A space at nesting depth 0 separates tokens; a `)` that returns
/// the depth to 0 closes a bracketed child.
fn split_children<'a>(body: &'a str, whole: &str) -> Result<Vec<&'a str>, ParseError> {
    let unbalanced = || ParseError::Unbalanced { text: whole.to_string() };

    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for (i, byte) in body.bytes().enumerate() {
        match byte {
            b'(' => depth += 1,
            b')' => {
                depth = depth.checked_sub(1).ok_or_else(unbalanced)?;
                if depth == 0 {
                    parts.push(&body[start..=i]);
                    start = i + 1;
                }
            }
            b' ' if depth == 0 => {
                if i > start {
                    parts.push(&body[start..i]);
                }
                start = i + 1;
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(unbalanced());
    }
    if start < body.len() {
        parts.push(&body[start..]);
    }
    Ok(parts)
}

/// Display adapter that spells labels out through a vocabulary.
pub struct TreeDisplay<'a> {
    tree:  &'a SyntaxTree,
    vocab: &'a Vocabulary,
}

impl fmt::Display for TreeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // (node, next child to write)
        let mut stack = vec![(self.tree, 0usize)];
        while let Some(frame) = stack.last_mut() {
            let (node, next) = *frame;
            let label = self.vocab.token(node.label());
            if node.is_terminal() {
                f.write_str(label)?;
                stack.pop();
                continue;
            }
            if next == 0 {
                write!(f, "({label}")?;
            }
            match node.child(next) {
                Some(child) => {
                    frame.1 += 1;
                    f.write_str(" ")?;
                    stack.push((child, 0));
                }
                None => {
                    f.write_str(")")?;
                    stack.pop();
                }
            }
        }
        Ok(())
    }
}

// Dropping nested Vecs would recurse once per level
impl Drop for SyntaxTree {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> (SyntaxTree, Vocabulary) {
        let mut vocab = Vocabulary::new();
        let tree = SyntaxTree::parse(text, &mut vocab).unwrap().unwrap();
        (tree, vocab)
    }

    fn parse_err(text: &str) -> ParseError {
        let mut vocab = Vocabulary::new();
        SyntaxTree::parse(text, &mut vocab).unwrap_err()
    }

    #[test]
    fn test_two_leaf_sentence() {
        let (mut tree, vocab) = parse("(3 (2 good) (1 movie))");
        assert_eq!(tree.num_nodes(), 5);
        assert_eq!(tree.num_internal_nodes(), 3);
        assert_eq!(tree.sentiment(), Some(3));

        let words: Vec<&str> = tree.terminals().iter().map(|&w| vocab.token(w)).collect();
        assert_eq!(words, vec!["good", "movie"]);

        assert_eq!(tree.assign_node_ids(0), 5);
        assert_eq!(tree.id(), Some(4));
    }

    #[test]
    fn test_flat_node_with_bare_terminals() {
        // Two bare words directly under the root: 2 leaves + 1 internal
        let (tree, vocab) = parse("(3 good movie)");
        assert_eq!(tree.num_nodes(), 3);
        assert_eq!(tree.num_internal_nodes(), 1);
        assert_eq!(tree.num_children(), 2);
        assert_eq!(vocab.token(tree.child(0).unwrap().label()), "good");
        assert_eq!(vocab.token(tree.child(1).unwrap().label()), "movie");
        assert_eq!(tree.child(0).unwrap().sentiment(), None);
    }

    #[test]
    fn test_failed_parse_placeholder() {
        let mut vocab = Vocabulary::new();
        assert_eq!(SyntaxTree::parse("()", &mut vocab), Ok(None));
        // Nothing was added to the vocabulary
        assert_eq!(vocab.len(), 1);
    }

    #[test]
    fn test_paren_inside_terminal_is_fatal() {
        assert!(matches!(parse_err("go(od"), ParseError::InvalidTerminal { .. }));
        assert!(matches!(parse_err("(3 (2 go(od)) (1 movie))"), ParseError::InvalidTerminal { .. }));
        // The stray paren also leaves the outer node unbalanced
        let mut vocab = Vocabulary::new();
        assert!(SyntaxTree::parse("(3 (2 go(od) (1 movie))", &mut vocab).is_err());
        assert!(matches!(parse_err("(3 (2 good)) x)"), ParseError::Unbalanced { .. }));
    }

    #[test]
    fn test_non_numeric_label_is_fatal() {
        assert_eq!(
            parse_err("(NP good)"),
            ParseError::NonNumericLabel { label: "NP".to_string() }
        );
        assert!(matches!(parse_err("( good)"), ParseError::NonNumericLabel { .. }));
    }

    #[test]
    fn test_class_out_of_range() {
        assert!(matches!(parse_err("(7 good)"), ParseError::ClassOutOfRange { class: 7, .. }));
    }

    #[test]
    fn test_structural_errors() {
        assert!(matches!(parse_err("(3 )"), ParseError::NoChildren { .. }));
        assert!(matches!(parse_err("(3)"), ParseError::MissingContent { .. }));
        assert!(matches!(parse_err("(3 good"), ParseError::MissingClose { .. }));
        assert!(matches!(parse_err("(3 (2 good)"), ParseError::Unbalanced { .. }));
    }

    #[test]
    fn test_round_trip() {
        let inputs = [
            "(3 (2 good) (1 movie))",
            "(4 (2 (2 a) (3 (3 really) (4 great))) (2 .))",
            "(1 bad)",
            "(2 (2 one) (2 two) (2 three) (2 four) (2 five))",
        ];
        for input in inputs {
            let (tree, vocab) = parse(input);
            assert_eq!(tree.to_bracket_string(&vocab), input);
        }
        // Whitespace between children is normalised
        let (tree, vocab) = parse("(3  (2 good)   (1 movie))");
        assert_eq!(tree.to_bracket_string(&vocab), "(3 (2 good) (1 movie))");
    }

    #[test]
    fn test_node_ids_are_dense_post_order() {
        let (mut tree, _) = parse("(4 (2 (2 a) (3 (3 really) (4 great))) (2 .))");
        let n = tree.num_nodes();
        assert_eq!(tree.assign_node_ids(0), n);

        fn check(node: &SyntaxTree, seen: &mut Vec<usize>) {
            let id = node.id().unwrap();
            for child in node.children() {
                check(child, seen);
                assert!(child.id().unwrap() < id);
            }
            seen.push(id);
        }
        let mut seen = Vec::new();
        check(&tree, &mut seen);
        // Post-order visit yields ids 0, 1, 2, ...
        assert_eq!(seen, (0..n).collect::<Vec<_>>());
    }

    #[test]
    fn test_ids_compose_from_offset() {
        let (mut tree, _) = parse("(3 (2 good) (1 movie))");
        assert_eq!(tree.assign_node_ids(10), 15);
        assert_eq!(tree.child(0).unwrap().child(0).unwrap().id(), Some(10));
        assert_eq!(tree.id(), Some(14));
    }

    #[test]
    fn test_unassigned_id_is_none() {
        let (tree, _) = parse("(1 bad)");
        assert_eq!(tree.id(), None);
    }

    #[test]
    fn test_terminals_match_reading_order() {
        let (tree, vocab) = parse("(2 (1 (0 not) (2 (2 a) (2 film))) (3 (2 worth) (3 seeing)))");
        let words: Vec<&str> = tree.terminals().iter().map(|&w| vocab.token(w)).collect();
        assert_eq!(words, vec!["not", "a", "film", "worth", "seeing"]);

        let leaves = tree.num_nodes() - tree.num_internal_nodes();
        assert_eq!(words.len(), leaves);
    }

    #[test]
    fn test_structure_statistics() {
        let (tree, _) = parse("(2 (2 one) (2 (2 two) (2 three) (2 four)))");
        assert_eq!(tree.max_branch_count(), 3);
        assert_eq!(tree.min_depth(), 2);
        assert_eq!(tree.max_depth(), 3);

        let (leaf, _) = parse("word");
        assert!(leaf.is_terminal());
        assert_eq!(leaf.min_depth(), 0);
        assert_eq!(leaf.max_depth(), 0);
        assert_eq!(leaf.max_branch_count(), 0);
    }

    #[test]
    fn test_thousand_level_spine_parses_without_recursion() {
        let mut text = "(2 w)".to_string();
        for _ in 0..1_000 {
            text = format!("(2 {text} x)");
        }
        let (mut tree, vocab) = parse(&text);

        assert_eq!(tree.num_nodes(), 2_002);
        assert_eq!(tree.num_internal_nodes(), 1_001);
        assert_eq!(tree.max_depth(), 1_001);
        assert_eq!(tree.min_depth(), 1);
        assert_eq!(tree.max_branch_count(), 2);
        assert_eq!(tree.terminals().len(), 1_001);
        assert_eq!(vocab.token(tree.terminals()[0]), "w");

        assert_eq!(tree.assign_node_ids(0), 2_002);
        assert_eq!(tree.id(), Some(2_001));
        assert_eq!(tree.to_bracket_string(&vocab), text);
    }
}
