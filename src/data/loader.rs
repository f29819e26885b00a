// ============================================================
// Layer 4 — Tree Corpus Loader
// ============================================================
// Reads a Stanford-Sentiment-Treebank style corpus: one
// bracket-notation tree per line, e.g.
//
//   (3 (2 (2 The) (2 movie)) (3 (2 is) (3 good)))
//
// For every line:
//   1. Trim surrounding whitespace (and Windows line endings)
//   2. Skip blank lines
//   3. Skip "()": the upstream parser's failure marker
//   4. Parse; a malformed tree aborts the whole load
//   5. Assign post-order node ids
//
// Malformed trees are never skipped: dropping one silently
// would shift every example after it.

use anyhow::{Context, Result};
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::PathBuf,
};

use crate::domain::syntax_tree::SyntaxTree;
use crate::domain::traits::TreeSource;
use crate::domain::vocabulary::Vocabulary;

/// Loads trees from a corpus file on disk.
pub struct TreeFileLoader {
    path: PathBuf,
}

impl TreeFileLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TreeSource for TreeFileLoader {
    fn load_trees(&self, vocab: &mut Vocabulary) -> Result<Vec<SyntaxTree>> {
        let file = File::open(&self.path)
            .with_context(|| format!("Cannot open tree corpus '{}'", self.path.display()))?;
        let origin = self.path.display().to_string();
        parse_tree_lines(BufReader::new(file), vocab, &origin)
    }
}

/// A fixed list of bracket strings for tests.
#[cfg(test)]
pub struct InlineTrees {
    lines: Vec<String>,
}

#[cfg(test)]
impl InlineTrees {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { lines: lines.into_iter().map(Into::into).collect() }
    }
}

#[cfg(test)]
impl TreeSource for InlineTrees {
    fn load_trees(&self, vocab: &mut Vocabulary) -> Result<Vec<SyntaxTree>> {
        let joined = self.lines.join("\n");
        parse_tree_lines(joined.as_bytes(), vocab, "<inline>")
    }
}

/// Parse one tree per line of `reader`.
/// `origin` names the input in error messages.
pub fn parse_tree_lines(
    reader: impl BufRead,
    vocab:  &mut Vocabulary,
    origin: &str,
) -> Result<Vec<SyntaxTree>> {
    let mut trees   = Vec::new();
    let mut skipped = 0usize;

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line.with_context(|| format!("Cannot read line {line_no} of '{origin}'"))?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        let parsed = SyntaxTree::parse(text, vocab)
            .with_context(|| format!("Malformed tree at {origin}:{line_no}"))?;

        match parsed {
            Some(mut tree) => {
                tree.assign_node_ids(0);
                trees.push(tree);
            }
            None => {
                tracing::warn!("Skipping failed parse at {}:{}", origin, line_no);
                skipped += 1;
            }
        }
    }

    tracing::debug!("Parsed {} trees from '{}' ({} placeholders skipped)", trees.len(), origin, skipped);
    Ok(trees)
}
