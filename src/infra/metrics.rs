// ============================================================
// Layer 6 — Training History and Test Scores
// ============================================================
// Writes the two plain-text reports of a training run.
//
// loss_accuracy.dat (tab separated, one row per epoch):
//   epochs=16, running time=0d 3h 12m 5s
//   "train acc" 	 	 "val acc"  	 	 "train loss" 	 	 "val loss"
//   0.412500000000000000	0.398437500000000000	1.734...	1.802...
//
// final_test_score.txt:
//   loss: 1.7421
//   acc: 0.4012
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::{BufWriter, Write},
    path::Path,
    time::Duration,
};

pub const HISTORY_FILE: &str = "loss_accuracy.dat";
pub const TEST_SCORE_FILE: &str = "final_test_score.txt";

const HISTORY_HEADER: &str =
    "\"train acc\" \t \t \"val acc\"  \t \t \"train loss\" \t \t \"val loss\" ";

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,
    pub train_acc: f64,
    pub val_acc: f64,
    pub train_loss: f64,
    pub val_loss: f64,
}

impl EpochMetrics {
    /// Returns true if this epoch improved over the previous best val_loss
    pub fn is_improvement(&self, best_val_loss: f64) -> bool {
        self.val_loss < best_val_loss
    }
}

/// Per-epoch history of a run, in epoch order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochMetrics>,
}

impl TrainingHistory {
    pub fn push(&mut self, m: EpochMetrics) {
        self.epochs.push(m);
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    /// Epoch with the lowest validation loss, if any.
    pub fn best(&self) -> Option<&EpochMetrics> {
        self.epochs.iter().fold(None, |best: Option<&EpochMetrics>, m| match best {
            Some(b) if !m.is_improvement(b.val_loss) => Some(b),
            _ => Some(m),
        })
    }
}

/// Loss and accuracy of the single evaluation pass on the test split.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestScore {
    pub loss: f64,
    pub acc: f64,
}

/// Split a duration into (days, hours, minutes, seconds).
pub fn split_duration(d: Duration) -> (u64, u64, u64, u64) {
    let t = d.as_secs();
    (t / 86_400, t / 3_600 % 24, t / 60 % 60, t % 60)
}

pub fn format_duration(d: Duration) -> String {
    let (days, hours, mins, secs) = split_duration(d);
    format!("{days}d {hours}h {mins}m {secs}s")
}

/// Write `loss_accuracy.dat` into `dir`.
pub fn write_history(dir: &Path, history: &TrainingHistory, running_time: Duration) -> Result<()> {
    let path = dir.join(HISTORY_FILE);
    let file = fs::File::create(&path)
        .with_context(|| format!("Cannot create history file '{}'", path.display()))?;
    let mut f = BufWriter::new(file);

    writeln!(
        f,
        "epochs={}, running time={} ",
        history.len(),
        format_duration(running_time)
    )?;
    writeln!(f, "{HISTORY_HEADER}")?;
    for m in &history.epochs {
        writeln!(
            f,
            "{:.18}\t{:.18}\t{:.18}\t{:.18}",
            m.train_acc, m.val_acc, m.train_loss, m.val_loss
        )?;
    }
    f.flush()?;

    tracing::debug!("Wrote {} epochs of history to '{}'", history.len(), path.display());
    Ok(())
}

/// Write `final_test_score.txt` into `dir`, one `metric: value` per line.
pub fn write_test_score(dir: &Path, score: &TestScore) -> Result<()> {
    let path = dir.join(TEST_SCORE_FILE);
    let text = format!("loss: {}\nacc: {}\n", score.loss, score.acc);
    fs::write(&path, text)
        .with_context(|| format!("Cannot write test score to '{}'", path.display()))?;
    Ok(())
}
