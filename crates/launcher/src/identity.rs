//! Deterministic worker identity assignment.

use std::fmt;

/// Number of digits in the rendered serial number.
pub const SERIAL_DIGITS: usize = 6;

/// Size of the serial space implied by [`SERIAL_DIGITS`].
pub const SERIAL_SPACE: u64 = 1_000_000;

/// The unique identity of one worker for the lifetime of a run.
///
/// Renders as a zero-padded fixed-width numeric string, e.g. `000102`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SerialNumber(pub u64);

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.0, width = SERIAL_DIGITS)
    }
}

/// The contiguous serial range owned by one worker process.
///
/// Process `i` of a run receives `start = offset + i * workers_per_process`,
/// so ranges across processes are disjoint and contiguous with no reuse and
/// no gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialRange {
    pub start: u64,
    pub count: u64,
}

impl SerialRange {
    /// Range for the `index`-th process of a run.
    pub fn for_process(offset: u64, workers_per_process: u64, index: u64) -> Self {
        Self {
            start: offset + index * workers_per_process,
            count: workers_per_process,
        }
    }

    /// Serial of the `j`-th worker (0-indexed) in this range.
    pub fn serial(&self, j: u64) -> SerialNumber {
        SerialNumber(self.start + j)
    }

    pub fn first(&self) -> SerialNumber {
        SerialNumber(self.start)
    }

    pub fn last(&self) -> SerialNumber {
        SerialNumber(self.start + self.count.saturating_sub(1))
    }

    /// Iterate over every serial in the range, ascending.
    pub fn iter(&self) -> impl Iterator<Item = SerialNumber> {
        (self.start..self.start + self.count).map(SerialNumber)
    }
}

impl fmt::Display for SerialRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.first(), self.last())
    }
}
