// ============================================================
// Layer 3 — Vocabulary
// ============================================================
// A two-way table between surface tokens and dense ids.
// Both words (terminals) and constituent labels ("0".."4")
// share the same table.
//
// Lifecycle:
//   open   → every new token gets the next free id (training)
//   frozen → unseen tokens map to UNK (prediction)
//
// Id 0 is always UNK so the embedding row for unknown words
// sits at a fixed position.

use std::collections::HashMap;

/// Dense integer id of a token.
pub type WordId = usize;

/// Surface form of the unknown-token entry.
pub const UNK_TOKEN: &str = "UNK";

/// Bidirectional token ↔ id mapping with an explicit UNK entry.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    tokens: Vec<String>,
    index:  HashMap<String, WordId>,
    frozen: bool,
}

impl Vocabulary {
    /// An open vocabulary holding only UNK.
    pub fn new() -> Self {
        let mut vocab = Self { tokens: Vec::new(), index: HashMap::new(), frozen: false };
        vocab.convert(UNK_TOKEN);
        vocab
    }

    /// Rebuild a frozen vocabulary from tokens listed in id order.
    /// The first token must be UNK.
    pub fn from_tokens(tokens: Vec<String>) -> Option<Self> {
        if tokens.first().map(String::as_str) != Some(UNK_TOKEN) {
            return None;
        }
        let index = tokens
            .iter()
            .enumerate()
            .map(|(id, t)| (t.clone(), id))
            .collect::<HashMap<_, _>>();
        // Duplicate tokens would alias two ids
        if index.len() != tokens.len() {
            return None;
        }
        Some(Self { tokens, index, frozen: true })
    }

    /// Map a token to its id, growing the table while open.
    pub fn convert(&mut self, token: &str) -> WordId {
        if let Some(id) = self.get(token) {
            return id;
        }
        if self.is_frozen() {
            return self.unk_id();
        }
        let id = self.tokens.len();
        self.tokens.push(token.to_string());
        self.index.insert(token.to_string(), id);
        id
    }

    /// Id lookup that never grows the table.
    pub fn get(&self, token: &str) -> Option<WordId> {
        self.index.get(token).copied()
    }

    /// Surface form of an id; out-of-range ids read as UNK.
    pub fn token(&self, id: WordId) -> &str {
        self.tokens.get(id).map(String::as_str).unwrap_or(UNK_TOKEN)
    }

    pub fn unk_id(&self) -> WordId {
        0
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// All tokens in id order.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unk_is_id_zero() {
        let vocab = Vocabulary::new();
        assert_eq!(vocab.len(), 1);
        assert_eq!(vocab.get(UNK_TOKEN), Some(0));
        assert_eq!(vocab.token(0), UNK_TOKEN);
    }

    #[test]
    fn test_open_vocabulary_grows() {
        let mut vocab = Vocabulary::new();
        let good = vocab.convert("good");
        let movie = vocab.convert("movie");
        assert_eq!(good, 1);
        assert_eq!(movie, 2);
        // Seen tokens keep their id
        assert_eq!(vocab.convert("good"), 1);
        assert_eq!(vocab.len(), 3);
    }

    #[test]
    fn test_frozen_vocabulary_maps_unknown_to_unk() {
        let mut vocab = Vocabulary::new();
        vocab.convert("good");
        vocab.freeze();
        assert_eq!(vocab.convert("terrible"), vocab.unk_id());
        assert_eq!(vocab.convert("good"), 1);
        assert_eq!(vocab.len(), 2);
    }

    #[test]
    fn test_from_tokens_requires_unk_first() {
        assert!(Vocabulary::from_tokens(vec!["good".into()]).is_none());
        assert!(Vocabulary::from_tokens(vec![UNK_TOKEN.into(), "a".into(), "a".into()]).is_none());

        let vocab = Vocabulary::from_tokens(vec![UNK_TOKEN.into(), "good".into()]).unwrap();
        assert!(vocab.is_frozen());
        assert_eq!(vocab.get("good"), Some(1));
    }
}
