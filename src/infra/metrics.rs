// ============================================================
// Layer 6 — Metrics
// ============================================================
// Two pieces:
//
//   PerplexityWindow  running exp(loss / nodes) over a window
//                     of examples; only non-terminals count
//                     as nodes
//
//   MetricsLogger     optional CSV file with one row per epoch
//
// Example CSV output:
//   epoch,train_perplexity,dev_perplexity,dev_loss,dev_accuracy,dev_root_accuracy,new_best
//   1,4.210391,3.998200,3192.553100,0.412000,0.250000,true
//   2,3.601127,3.871052,3147.092800,0.437500,0.281000,true

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

pub const CSV_HEADER: &str =
    "epoch,train_perplexity,dev_perplexity,dev_loss,dev_accuracy,dev_root_accuracy,new_best";

// ─── Perplexity ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct PerplexityWindow {
    loss:     f64,
    nodes:    usize,
    examples: usize,
}

impl PerplexityWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// `loss` is the summed loss of one example, `nodes` its scored
    /// (non-terminal) node count.
    pub fn record(&mut self, loss: f64, nodes: usize) {
        self.loss     += loss;
        self.nodes    += nodes;
        self.examples += 1;
    }

    pub fn examples(&self) -> usize {
        self.examples
    }

    /// NaN when nothing has been scored yet.
    pub fn perplexity(&self) -> f64 {
        perplexity(self.loss, self.nodes)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

pub fn perplexity(loss: f64, nodes: usize) -> f64 {
    if nodes == 0 {
        f64::NAN
    } else {
        (loss / nodes as f64).exp()
    }
}

// ─── Epoch CSV ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// 1-based
    pub epoch:             usize,
    pub train_perplexity:  f64,
    pub dev_perplexity:    f64,
    pub dev_loss:          f64,
    /// Over all scored dev nodes
    pub dev_accuracy:      f64,
    /// Over dev sentence roots only
    pub dev_root_accuracy: f64,
    pub new_best:          bool,
}

impl EpochMetrics {
    fn to_csv_row(&self) -> String {
        format!(
            "{},{:.6},{:.6},{:.6},{:.6},{:.6},{}",
            self.epoch,
            self.train_perplexity,
            self.dev_perplexity,
            self.dev_loss,
            self.dev_accuracy,
            self.dev_root_accuracy,
            self.new_best,
        )
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Truncates `path` and writes the header row.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let csv_path = path.into();
        if let Some(parent) = csv_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
        }

        let mut f = fs::File::create(&csv_path)
            .with_context(|| format!("Cannot create metrics file '{}'", csv_path.display()))?;
        writeln!(f, "{CSV_HEADER}")?;

        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open metrics file '{}'", self.csv_path.display()))?;
        writeln!(f, "{}", m.to_csv_row())?;

        tracing::debug!("Logged epoch {} metrics", m.epoch);
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_perplexity_and_reset() {
        let mut w = PerplexityWindow::new();
        assert!(w.perplexity().is_nan());

        w.record(2.0, 1);
        w.record(4.0, 2);
        assert_eq!(w.examples(), 2);
        // exp(6 / 3)
        assert!((w.perplexity() - 2.0f64.exp()).abs() < 1e-12);

        w.reset();
        assert_eq!(w.examples(), 0);
        assert!(w.perplexity().is_nan());
    }

    #[test]
    fn test_examples_without_nodes_do_not_move_perplexity() {
        let mut w = PerplexityWindow::new();
        w.record(3.0, 3);
        let before = w.perplexity();
        w.record(0.0, 0);
        assert_eq!(w.perplexity(), before);
        assert_eq!(w.examples(), 2);
    }

    #[test]
    fn test_csv_rows_follow_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs").join("metrics.csv");
        let logger = MetricsLogger::create(&path).unwrap();

        for epoch in 1..=2 {
            logger
                .log(&EpochMetrics {
                    epoch,
                    train_perplexity:  3.5,
                    dev_perplexity:    3.25,
                    dev_loss:          120.0,
                    dev_accuracy:      0.5,
                    dev_root_accuracy: 0.25,
                    new_best:          epoch == 1,
                })
                .unwrap();
        }

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines[1], "1,3.500000,3.250000,120.000000,0.500000,0.250000,true");
        assert!(lines[2].ends_with(",false"));
    }
}
