// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Read-only, monotonic sequences of values.

Designed to be used as interpolation axes for multi-dimensional data
sets. Fast interpolation requires the ability to quickly look up the
axis interval that brackets a floating point value; that reverse lookup
is the principal feature that distinguishes a [`Seq`] from an ordinary
vector of doubles.
*/

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub mod error;
pub use error::SeqError;


/// Shared reference to an immutable sequence.
pub type SeqRef = Arc<Seq>;

/// Storage strategy recognised for a sequence.
#[derive(Debug)]
enum SeqKind {
    /// Evenly spaced grid of points, like the Matlab a:b:c construct.
    Linear,
    /// Points whose logarithms are evenly spaced.
    Log,
    /// Arbitrary monotonic data. Reverse lookups scan incrementally from
    /// the interval found by the previous search, which is amortised O(1)
    /// for monotonic query patterns.
    Data { last: AtomicUsize, sign: f64 },
}

/// A read-only, monotonic sequence of values with O(1)/O(log N) reverse
/// lookup.
#[derive(Debug)]
pub struct Seq {
    data: Vec<f64>,
    increment: Vec<f64>,
    kind: SeqKind,
}

impl Clone for Seq {
    fn clone(&self) -> Self {
        let kind = match &self.kind {
            SeqKind::Linear => SeqKind::Linear,
            SeqKind::Log => SeqKind::Log,
            SeqKind::Data { sign, .. } => SeqKind::Data {
                last: AtomicUsize::new(0),
                sign: *sign,
            },
        };
        Seq {
            data: self.data.clone(),
            increment: self.increment.clone(),
            kind,
        }
    }
}

impl Seq {
    /// Construct an evenly spaced sequence from first value, increment,
    /// and number of elements.
    ///
    /// # Arguments
    ///
    /// * `first` - Value at the start of the sequence.
    ///
    /// * `increment` - Spacing between elements. May be negative.
    ///
    /// * `size` - Number of elements in the sequence.
    ///
    /// # Returns
    ///
    /// * A linear sequence, or `SeqError::EmptySequence` when size is zero,
    ///   or `SeqError::ZeroIncrement` when a multi-element sequence has no
    ///   spacing.
    ///
    pub fn linear(first: f64, increment: f64, size: usize) -> Result<Self, SeqError> {
        if size == 0 {
            return Err(SeqError::EmptySequence);
        }
        if size > 1 && increment == 0.0 {
            return Err(SeqError::ZeroIncrement);
        }
        let mut data = Vec::with_capacity(size);
        let mut v = first;
        for _ in 0..size {
            data.push(v);
            v += increment;
        }
        Ok(Seq {
            data,
            increment: vec![increment; size],
            kind: SeqKind::Linear,
        })
    }

    /// Construct an evenly spaced sequence that runs from `first` to a
    /// value no greater than `last`. All sequences constructed this way
    /// have at least a single value.
    pub fn linear_span(first: f64, increment: f64, last: f64) -> Result<Self, SeqError> {
        if increment == 0.0 {
            return Seq::linear(first, 0.0, 1);
        }
        let n = (1.0 + (last - first) / increment).floor().max(1.0) as usize;
        Seq::linear(first, increment, n)
    }

    /// Construct a sequence whose elements are evenly spaced on a log
    /// scale: element i is `first * ratio^i`.
    pub fn log(first: f64, ratio: f64, size: usize) -> Result<Self, SeqError> {
        if size == 0 {
            return Err(SeqError::EmptySequence);
        }
        if first <= 0.0 || ratio <= 0.0 {
            return Err(SeqError::NotLogarithmic);
        }
        if size > 1 && ratio == 1.0 {
            return Err(SeqError::ZeroIncrement);
        }
        let mut data = Vec::with_capacity(size);
        let mut v = first;
        for _ in 0..size {
            data.push(v);
            v *= ratio;
        }
        let increment = Seq::increments(&data);
        Ok(Seq {
            data,
            increment,
            kind: SeqKind::Log,
        })
    }

    /// Construct a sequence from an arbitrary monotonic series of values.
    ///
    /// # Returns
    ///
    /// * `SeqError::NonMonotonic` when the sign of successive differences
    ///   is not constant.
    ///
    pub fn data(values: &[f64]) -> Result<Self, SeqError> {
        if values.is_empty() {
            return Err(SeqError::EmptySequence);
        }
        let sign = if values.len() > 1 && values[1] < values[0] {
            -1.0
        } else {
            1.0
        };
        for pair in values.windows(2) {
            if (pair[1] - pair[0]) * sign <= 0.0 {
                return Err(SeqError::NonMonotonic);
            }
        }
        let increment = Seq::increments(values);
        Ok(Seq {
            data: values.to_vec(),
            increment,
            kind: SeqKind::Data {
                last: AtomicUsize::new(0),
                sign,
            },
        })
    }

    /// Builds the best sequence variant for the given values: uniform
    /// spacing becomes linear, uniform ratio becomes log, and anything
    /// else falls back to arbitrary data.
    pub fn build_best(values: &[f64]) -> Result<Self, SeqError> {
        if values.is_empty() {
            return Err(SeqError::EmptySequence);
        }
        if values.len() == 1 {
            return Seq::linear(values[0], 0.0, 1);
        }
        let first_diff = values[1] - values[0];
        let uniform = values.windows(2).all(|pair| {
            let diff = pair[1] - pair[0];
            (diff - first_diff).abs() <= 1e-9 * first_diff.abs().max(1.0)
        });
        if uniform && first_diff != 0.0 {
            return Seq::linear(values[0], first_diff, values.len());
        }
        if values.iter().all(|&v| v > 0.0) {
            let first_ratio = values[1] / values[0];
            let uniform_log = values
                .windows(2)
                .all(|pair| (pair[1] / pair[0] - first_ratio).abs() <= 1e-9 * first_ratio);
            if uniform_log && first_ratio != 1.0 {
                return Seq::log(values[0], first_ratio, values.len());
            }
        }
        Seq::data(values)
    }

    /// Number of elements in this sequence.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Retrieve the value at the given index. Indexes outside of the
    /// valid range return the value of the nearest endpoint.
    pub fn value(&self, index: usize) -> f64 {
        self.data[index.min(self.data.len() - 1)]
    }

    /// Difference between element `index` and element `index + 1`.
    /// Indexes outside the range [0, size-2] return the nearest endpoint
    /// increment.
    pub fn increment(&self, index: usize) -> f64 {
        self.increment[index.min(self.data.len() - 1)]
    }

    /// Underlying values as a slice.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Iterate over the values of the sequence.
    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.data.iter()
    }

    /// Search for a value in this sequence, returning the index of the
    /// interval that contains it. The result is the largest index i such
    /// that `self[i] <= value`, clamped to [0, size-2] so that there is
    /// always a valid interval to the right of the returned index.
    pub fn find_index(&self, value: f64) -> usize {
        if self.data.len() < 2 {
            return 0;
        }
        let max_interval = self.data.len().saturating_sub(2);
        match &self.kind {
            SeqKind::Linear => {
                let guess = (value - self.data[0]) / self.increment[0];
                clamp_interval(guess, max_interval)
            }
            SeqKind::Log => {
                let ratio = self.data[1] / self.data[0];
                let guess = if value <= 0.0 {
                    // negative probes precede every element of a log axis
                    if self.increment[0] > 0.0 {
                        0.0
                    } else {
                        max_interval as f64
                    }
                } else {
                    (value / self.data[0]).ln() / ratio.ln()
                };
                clamp_interval(guess, max_interval)
            }
            SeqKind::Data { last, sign } => {
                let probe = value * sign;
                let mut index = last.load(Ordering::Relaxed).min(max_interval);
                // scan towards the front
                while index > 0 && self.data[index] * sign > probe {
                    index -= 1;
                }
                // scan towards the back
                while index < max_interval && self.data[index + 1] * sign <= probe {
                    index += 1;
                }
                last.store(index, Ordering::Relaxed);
                index
            }
        }
    }

    /// Create a new sequence limited to the intersection of the current
    /// sequence with the [min, max] interval.
    ///
    /// # Returns
    ///
    /// * `SeqError::EmptyClip` when no elements fall inside the interval.
    ///
    pub fn clip(&self, min: f64, max: f64) -> Result<Self, SeqError> {
        let kept: Vec<f64> = self
            .data
            .iter()
            .copied()
            .filter(|&v| v >= min && v <= max)
            .collect();
        if kept.is_empty() {
            return Err(SeqError::EmptyClip);
        }
        Seq::build_best(&kept)
    }

    /// Increment cache used by the log and data variants.
    fn increments(values: &[f64]) -> Vec<f64> {
        let n = values.len();
        let mut increment = Vec::with_capacity(n);
        for i in 0..n {
            if i + 1 < n {
                increment.push(values[i + 1] - values[i]);
            } else if n > 1 {
                increment.push(values[n - 1] - values[n - 2]);
            } else {
                increment.push(0.0);
            }
        }
        increment
    }
}

/// Clamp a fractional interval estimate into [0, max_interval].
fn clamp_interval(guess: f64, max_interval: usize) -> usize {
    if !guess.is_finite() || guess <= 0.0 {
        0
    } else {
        (guess.floor() as usize).min(max_interval)
    }
}
