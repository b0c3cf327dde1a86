//! Splitting a half-open range into fixed-size steps.

/// Lazily yields `(offset, length)` pairs covering `[start, stop)`.
///
/// Every pair but the last has length `step`; a trailing shorter pair covers
/// the remainder when the range is not divisible by `step`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    next: u64,
    stop: u64,
    step: u64,
}

/// Partition `[start, stop)` into steps of `step`.
///
/// # Panics
///
/// Panics if `step` is zero.
pub fn partition(start: u64, stop: u64, step: u64) -> Partition {
    assert!(step > 0, "partition step must be positive");
    Partition {
        next: start,
        stop,
        step,
    }
}

impl Iterator for Partition {
    type Item = (u64, u64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.stop {
            return None;
        }
        let offset = self.next;
        let length = self.step.min(self.stop - offset);
        self.next = offset + length;
        Some((offset, length))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let span = self.stop.saturating_sub(self.next);
        let n = span.div_ceil(self.step);
        let n = usize::try_from(n).unwrap_or(usize::MAX);
        (n, Some(n))
    }
}

impl ExactSizeIterator for Partition {}

impl std::iter::FusedIterator for Partition {}

/// Collect `parts`, folding a trailing pair shorter than `min_len` into the
/// pair before it.
///
/// A lone short pair is kept as is.
pub fn merge_short_tail(
    parts: impl IntoIterator<Item = (u64, u64)>,
    min_len: u64,
) -> Vec<(u64, u64)> {
    let mut parts: Vec<(u64, u64)> = parts.into_iter().collect();
    if parts.len() >= 2 && parts[parts.len() - 1].1 < min_len {
        if let Some((_, tail)) = parts.pop() {
            if let Some(last) = parts.last_mut() {
                last.1 += tail;
            }
        }
    }
    parts
}
