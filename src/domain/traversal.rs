// ============================================================
// Layer 3 — Bottom-up Traversal
// ============================================================
// Visits every node of a SyntaxTree children-first without
// recursion. Trees can be as deep as a sentence is long, so the
// walk keeps its own stack of (node, next child to visit)
// frames:
//
//   top frame has unvisited children → push the next child
//   otherwise                        → compute the node, pop
//
// Results are stored in a table indexed by node id. Because ids
// are post-order, a node's result always lands at position
// table.len() and each child's result is already in the table
// when the parent is computed. Both facts are checked, not
// assumed.

use crate::domain::error::TreeError;
use crate::domain::syntax_tree::SyntaxTree;

/// Compute one value per node, children before parents.
///
/// `compute` receives the node and the table of values computed
/// so far (indexed by id). The returned table has exactly
/// `root.num_nodes()` entries.
pub fn fold_bottom_up<'t, T, E, F>(root: &'t SyntaxTree, mut compute: F) -> Result<Vec<T>, E>
where
    F: FnMut(&'t SyntaxTree, &[T]) -> Result<T, E>,
    E: From<TreeError>,
{
    let mut table: Vec<T> = Vec::with_capacity(root.num_nodes());
    let mut stack: Vec<(&'t SyntaxTree, usize)> = vec![(root, 0)];

    while let Some(frame) = stack.last_mut() {
        let (node, next_child) = *frame;

        if let Some(child) = node.child(next_child) {
            // Descend
            frame.1 += 1;
            stack.push((child, 0));
            continue;
        }

        // All children visited
        let id = node.id().ok_or(TreeError::UnassignedIds)?;
        if id != table.len() {
            return Err(TreeError::OutOfOrder { node: id, computed: table.len() }.into());
        }
        for child in node.children() {
            let child_id = child.id().ok_or(TreeError::UnassignedIds)?;
            if child_id >= table.len() {
                return Err(TreeError::ChildNotReady { node: id, child: child_id }.into());
            }
        }

        let value = compute(node, &table)?;
        table.push(value);
        stack.pop();
    }

    let nodes = root.num_nodes();
    if table.len() != nodes {
        return Err(TreeError::AnnotationCountMismatch { produced: table.len(), nodes }.into());
    }
    Ok(table)
}

/// All nodes in bottom-up (id) order.
pub fn post_order(root: &SyntaxTree) -> Result<Vec<&SyntaxTree>, TreeError> {
    fold_bottom_up(root, |node, _| Ok::<_, TreeError>(node))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vocabulary::Vocabulary;

    fn parse_with_ids(text: &str) -> SyntaxTree {
        let mut vocab = Vocabulary::new();
        let mut tree = SyntaxTree::parse(text, &mut vocab).unwrap().unwrap();
        tree.assign_node_ids(0);
        tree
    }

    /// "(2 (2 (2 ... (2 w) ... ) x) x)", a spine `depth` levels deep
    /// where each level also carries a right-hand leaf.
    fn left_spine(depth: usize) -> String {
        let mut text = "(2 w)".to_string();
        for _ in 0..depth {
            text = format!("(2 {text} x)");
        }
        text
    }

    #[test]
    fn test_subtree_sizes_bottom_up() {
        let tree = parse_with_ids("(3 (2 good) (1 (2 very) (1 bad)))");
        let sizes = fold_bottom_up(&tree, |node, table: &[usize]| {
            let below: usize = node
                .children()
                .iter()
                .map(|c| table[c.id().unwrap()])
                .sum();
            Ok::<_, TreeError>(below + 1)
        })
        .unwrap();

        assert_eq!(sizes.len(), tree.num_nodes());
        assert_eq!(*sizes.last().unwrap(), tree.num_nodes());
    }

    #[test]
    fn test_deep_unbalanced_tree_never_reads_ahead() {
        let tree = parse_with_ids(&left_spine(1_000));
        let mut visited = 0usize;
        let table = fold_bottom_up(&tree, |node, table: &[usize]| {
            // Every child must already be in the table
            for child in node.children() {
                assert!(child.id().unwrap() < table.len());
            }
            visited += 1;
            Ok::<_, TreeError>(node.id().unwrap())
        })
        .unwrap();

        assert_eq!(visited, tree.num_nodes());
        assert_eq!(table, (0..tree.num_nodes()).collect::<Vec<_>>());
    }

    #[test]
    fn test_wide_tree() {
        let words: Vec<String> = (0..50).map(|i| format!("(2 w{i})")).collect();
        let tree = parse_with_ids(&format!("(2 {})", words.join(" ")));
        let nodes = post_order(&tree).unwrap();
        assert_eq!(nodes.len(), 101);
        assert!(std::ptr::eq(*nodes.last().unwrap(), &tree));
    }

    #[test]
    fn test_unassigned_ids_are_rejected() {
        let mut vocab = Vocabulary::new();
        let tree = SyntaxTree::parse("(3 (2 good) (1 movie))", &mut vocab).unwrap().unwrap();
        assert_eq!(post_order(&tree).unwrap_err(), TreeError::UnassignedIds);
    }

    #[test]
    fn test_offset_ids_are_out_of_order() {
        let mut vocab = Vocabulary::new();
        let mut tree = SyntaxTree::parse("(1 bad)", &mut vocab).unwrap().unwrap();
        tree.assign_node_ids(3);
        assert_eq!(
            post_order(&tree).unwrap_err(),
            TreeError::OutOfOrder { node: 3, computed: 0 }
        );
    }
}
