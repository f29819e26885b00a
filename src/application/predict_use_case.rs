// ============================================================
// Layer 2 — PredictUseCase
// ============================================================
// Reads one bracket tree per input line and writes one line per
// non-terminal:
//
//   <sentence> ||| <terminals> ||| <gold> ||| <predicted> ||| p0 p1 p2 p3 p4
//
// e.g.
//   0 ||| good movie ||| 3 ||| 3 ||| 0.0213 0.0871 0.2106 0.4490 0.2320
//
// Sentence numbers count every input line from 0, including
// blank and "()" lines, which produce no output.

use anyhow::{Context, Result};
use std::io::{BufRead, Write};

use crate::domain::prediction::NodePrediction;
use crate::domain::traits::SentimentLabeler;
use crate::domain::vocabulary::Vocabulary;
use crate::infra::interrupt::CancellationToken;
use crate::ml::predictor::Predictor;
use burn::prelude::Backend;

pub struct PredictUseCase<B: Backend> {
    predictor: Predictor<B>,
}

impl<B: Backend> PredictUseCase<B> {
    pub fn new(predictor: Predictor<B>) -> Self {
        Self { predictor }
    }

    /// Returns the number of input lines consumed.
    pub fn run(
        &mut self,
        input:  impl BufRead,
        mut output: impl Write,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let mut sentence = 0usize;

        for line in input.lines() {
            let line = line.context("Cannot read prediction input")?;
            let text = line.trim();

            if !text.is_empty() {
                match self.predictor.parse_line(text)? {
                    Some(tree) => {
                        tracing::debug!("Sentence {}: {}", sentence, tree.to_bracket_string(self.predictor.vocabulary()));
                        for prediction in self.predictor.label_tree(&tree)? {
                            let row = format_prediction(sentence, &prediction, self.predictor.vocabulary());
                            writeln!(output, "{row}")?;
                        }
                    }
                    None => tracing::warn!("Sentence {}: failed parse \"()\", no output", sentence),
                }
            }
            sentence += 1;

            if cancel.is_cancelled() {
                tracing::info!("Interrupted after {} sentences", sentence);
                break;
            }
        }

        output.flush()?;
        Ok(sentence)
    }
}

pub fn format_prediction(sentence: usize, prediction: &NodePrediction, vocab: &Vocabulary) -> String {
    let words: Vec<&str> = prediction.terminals.iter().map(|&w| vocab.token(w)).collect();
    let probabilities: Vec<String> = prediction.probabilities.iter().map(|p| p.to_string()).collect();
    format!(
        "{} ||| {} ||| {} ||| {} ||| {}",
        sentence,
        words.join(" "),
        prediction.gold,
        prediction.predicted(),
        probabilities.join(" "),
    )
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::SentimentModelConfig;
    use burn::backend::NdArray;

    fn use_case(words: &[&str]) -> PredictUseCase<NdArray> {
        let mut vocab = Vocabulary::new();
        for w in words {
            vocab.convert(w);
        }
        let model = SentimentModelConfig::new(vocab.len())
            .with_word_embedding_dim(4)
            .with_node_embedding_dim(4)
            .with_final_hidden_dim(3)
            .init::<NdArray>(&Default::default());
        PredictUseCase::new(Predictor::new(model, vocab))
    }

    #[test]
    fn test_format_prediction() {
        let mut vocab = Vocabulary::new();
        let good  = vocab.convert("good");
        let movie = vocab.convert("movie");
        let prediction = NodePrediction {
            terminals:     vec![good, movie],
            gold:          3,
            probabilities: vec![0.0, 0.25, 0.0, 0.5, 0.25],
        };
        assert_eq!(
            format_prediction(4, &prediction, &vocab),
            "4 ||| good movie ||| 3 ||| 3 ||| 0 0.25 0 0.5 0.25"
        );
    }

    #[test]
    fn test_one_line_per_non_terminal() {
        let mut uc = use_case(&["3", "2", "1", "good", "movie"]);
        let input = "(3 (2 good) (1 movie))\n()\n(3 good movie)\n";
        let mut out = Vec::new();

        let consumed = uc.run(input.as_bytes(), &mut out, &CancellationToken::new()).unwrap();
        assert_eq!(consumed, 3);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        // 3 non-terminals in sentence 0, none for "()", 1 in sentence 2
        assert_eq!(lines.len(), 4);
        assert!(lines[..3].iter().all(|l| l.starts_with("0 ||| ")));
        assert!(lines[2].starts_with("0 ||| good movie ||| 3 ||| "));
        assert!(lines[3].starts_with("2 ||| good movie ||| 3 ||| "));

        let last: Vec<&str> = lines[3].split(" ||| ").collect();
        assert_eq!(last.len(), 5);
        assert_eq!(last[4].split(' ').count(), 5);
    }

    #[test]
    fn test_cancellation_stops_after_current_line() {
        let mut uc = use_case(&["2", "a"]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut out = Vec::new();
        let consumed = uc.run("(2 a)\n(2 a)\n".as_bytes(), &mut out, &cancel).unwrap();
        assert_eq!(consumed, 1);
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }

    #[test]
    fn test_malformed_line_is_fatal() {
        let mut uc = use_case(&["good"]);
        let mut out = Vec::new();
        assert!(uc.run("(2 go(od))\n".as_bytes(), &mut out, &CancellationToken::new()).is_err());
    }
}
