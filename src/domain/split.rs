//! Forward-chained train/test split planning.
//!
//! Test windows have a fixed length and tile the tail of the series; each
//! train window is every row before its test window (expanding). When fewer
//! than two such windows fit, a single holdout of the last `test_window`
//! rows is used instead.

use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Range<usize>,
    pub test: Range<usize>,
}

impl Split {
    pub fn train_len(&self) -> usize {
        self.train.len()
    }

    pub fn test_len(&self) -> usize {
        self.test.len()
    }
}

/// Partition `n_rows` into at most `max_splits` (train, test) pairs.
///
/// Returns no splits when `n_rows <= test_window`: the caller treats that as
/// insufficient data.
pub fn plan(n_rows: usize, test_window: usize, max_splits: usize) -> Vec<Split> {
    if test_window == 0 || n_rows <= test_window {
        return Vec::new();
    }

    let possible = (n_rows - test_window) / test_window;
    let usable = max_splits.min(possible);

    if usable < 2 {
        let cut = n_rows - test_window;
        return vec![Split {
            train: 0..cut,
            test: cut..n_rows,
        }];
    }

    (0..usable)
        .map(|k| {
            let test_start = n_rows - (usable - k) * test_window;
            Split {
                train: 0..test_start,
                test: test_start..test_start + test_window,
            }
        })
        .collect()
}
