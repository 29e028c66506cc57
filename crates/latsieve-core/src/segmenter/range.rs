//! Range type and partition planning.

use std::fmt;

use crate::error::SieveError;

/// A half-open q-range `[start, start + length)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    /// First q value (inclusive).
    pub start: u64,
    /// Number of q values covered.
    pub length: u64,
}

/// Sub-ranges of a parent range, ordered by `start`, covering it exactly.
pub type PartitionPlan = Vec<Range>;

impl Range {
    pub fn new(start: u64, length: u64) -> Self {
        Self { start, length }
    }

    /// Range of `length` values from `start`, rejecting one whose end does not fit in a `u64`.
    pub fn try_new(start: u64, length: u64) -> Result<Self, SieveError> {
        match start.checked_add(length) {
            Some(_) => Ok(Self::new(start, length)),
            None => Err(SieveError::InvalidRange {
                start,
                end: u64::MAX,
                reason: format!("length {} runs past the largest q", length),
            }),
        }
    }

    /// Range covering `[start, end)`.
    pub fn from_bounds(start: u64, end: u64) -> Result<Self, SieveError> {
        if end <= start {
            return Err(SieveError::InvalidRange {
                start,
                end,
                reason: "range is empty".to_string(),
            });
        }
        Ok(Self::new(start, end - start))
    }

    /// End of the range (exclusive). Ranges from `try_new`, `from_bounds` and
    /// the planners never overflow here.
    pub fn end(&self) -> u64 {
        self.start + self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end())
    }
}

/// Splits `parent` into exactly `count` sub-ranges.
///
/// Every element has length `parent.length / count` except the last, which
/// also takes `parent.length % count`. Fails when `count` is zero or larger
/// than the parent length, since that would produce empty elements.
pub fn partition(parent: Range, count: usize) -> Result<PartitionPlan, SieveError> {
    if count == 0 {
        return Err(SieveError::NoWorkers);
    }
    let n = count as u64;
    if parent.length < n {
        return Err(SieveError::InvalidRange {
            start: parent.start,
            end: parent.end(),
            reason: format!("cannot split {} values across {} workers", parent.length, count),
        });
    }
    let delta = parent.length / n;
    Ok(split_even(parent, delta, n))
}

/// Splits `parent` into outer save-batches of `step` values each.
///
/// The last batch absorbs the remainder, so a range shorter than two steps
/// yields a single batch. Boundaries are `parent.start + k * step`, which keeps
/// them stable when a run resumes from a previous batch boundary.
pub fn save_batches(parent: Range, step: u64) -> Result<PartitionPlan, SieveError> {
    if step == 0 {
        return Err(SieveError::InvalidRange {
            start: parent.start,
            end: parent.end(),
            reason: "save delta must be at least 1".to_string(),
        });
    }
    if parent.is_empty() {
        return Ok(Vec::new());
    }
    let count = (parent.length / step).max(1);
    let delta = if count == 1 { parent.length } else { step };
    Ok(split_even(parent, delta, count))
}

fn split_even(parent: Range, delta: u64, count: u64) -> PartitionPlan {
    let mut out = Vec::with_capacity(count as usize);
    let mut x = parent.start;
    for i in 0..count {
        let len = if i + 1 == count { parent.end() - x } else { delta };
        out.push(Range::new(x, len));
        x += len;
    }
    out
}
