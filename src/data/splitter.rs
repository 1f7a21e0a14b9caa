// ============================================================
// Layer 4 — Train/Validation/Test Splitter
// ============================================================
// Two steps, mirroring how the generators consume the data:
//
//   1. split_train_test   — shuffle, then hold out a test fraction
//                           (20% by default, rounded up)
//   2. validation_subset  — cut the training split WITHOUT
//                           reshuffling: the first
//                           floor(n * validation_split) rows are
//                           validation, the rest stay training
//
// Every row lands in exactly one split.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom.
//
// Reference: Rust Book §8 (Vectors)
//            rand crate documentation

use rand::{seq::SliceRandom, Rng};

/// Shuffle `samples` and split into (train, test).
///
/// # Example
/// ```ignore
/// let (train, test) = split_train_test(rows, 0.2, &mut rng);
/// // test holds ceil(20%) of the rows
/// ```
pub fn split_train_test<T, R: Rng + ?Sized>(
    mut samples: Vec<T>,
    test_fraction: f64,
    rng: &mut R,
) -> (Vec<T>, Vec<T>) {
    samples.shuffle(rng);

    let total  = samples.len();
    let n_test = ((total as f64) * test_fraction.clamp(0.0, 1.0)).ceil() as usize;
    // split_off(n) removes elements [n..] from the Vec and returns them
    let test   = samples.split_off(total - n_test.min(total));

    tracing::debug!(
        "Dataset split: {} training, {} test",
        samples.len(),
        test.len(),
    );
    (samples, test)
}

/// Split an already shuffled training set into (training, validation).
pub fn validation_subset<T>(mut samples: Vec<T>, validation_split: f64) -> (Vec<T>, Vec<T>) {
    let n_val = ((samples.len() as f64) * validation_split.clamp(0.0, 1.0)).floor() as usize;
    let training = samples.split_off(n_val.min(samples.len()));
    (training, samples)
}
