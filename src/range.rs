//! Evenly spaced sample points.

/// `count` evenly spaced values covering the half-open interval `[start, end)`.
///
/// The `i`th value is `start + i * (end - start) / count`, so the first value
/// is `start` and `end` itself is never produced. The range is restartable:
/// cloning it or creating it again with the same arguments yields the same values.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearRange {
    start: f64,
    step: f64,
    front: usize,
    back: usize,
}

impl LinearRange {
    pub fn new(start: f64, end: f64, count: usize) -> LinearRange {
        let step = if count == 0 {
            0.
        } else {
            (end - start) / count as f64
        };

        LinearRange {
            start,
            step,
            front: 0,
            back: count,
        }
    }

    /// The distance between two consecutive values.
    pub fn step(&self) -> f64 {
        self.step
    }

    #[inline]
    fn value(&self, i: usize) -> f64 {
        self.start + i as f64 * self.step
    }
}

impl Iterator for LinearRange {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.front == self.back {
            return None;
        }

        let v = self.value(self.front);
        self.front += 1;
        Some(v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.back - self.front;
        (n, Some(n))
    }
}

impl DoubleEndedIterator for LinearRange {
    fn next_back(&mut self) -> Option<f64> {
        if self.front == self.back {
            return None;
        }

        self.back -= 1;
        Some(self.value(self.back))
    }
}

impl ExactSizeIterator for LinearRange {}

/// Create `count` evenly spaced values in `[start, end)`.
pub fn linear_range(start: f64, end: f64, count: usize) -> LinearRange {
    LinearRange::new(start, end, count)
}
