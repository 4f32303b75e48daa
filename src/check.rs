//! Sorted output verification.
//!
//! Sorts the input file in memory and compares it line by line with the external sort output.
//! Meant for testing on inputs that fit in memory.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use crate::reader::{Line, DELIMITER};

/// Result of comparing the external sort output with the reference sort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    /// Number of lines in the reference (input) file.
    pub expected_lines: usize,
    /// Number of lines in the external sort output.
    pub actual_lines: usize,
    /// Index of the first line that differs from the reference.
    pub first_mismatch: Option<usize>,
}

impl CheckReport {
    /// Returns `true` if the output matches the reference sort.
    pub fn is_ok(&self) -> bool {
        self.first_mismatch.is_none() && self.expected_lines == self.actual_lines
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return write!(f, "output is correct ({} lines)", self.actual_lines);
        }

        if self.expected_lines != self.actual_lines {
            write!(
                f,
                "number of lines differs (expected: {}, actual: {})",
                self.expected_lines, self.actual_lines
            )?;
        }
        if let Some(idx) = self.first_mismatch {
            if self.expected_lines != self.actual_lines {
                write!(f, ", ")?;
            }
            write!(f, "different lines at {}", idx)?;
        }

        return Ok(());
    }
}

fn split_lines(data: &[u8]) -> Vec<Line> {
    data.split_inclusive(|byte| *byte == DELIMITER)
        .map(|line| line.to_vec())
        .collect()
}

/// Compares two line sequences returning the index of the first differing line
/// among the common prefix of both.
pub fn compare_lines(expected: &[Line], actual: &[Line]) -> CheckReport {
    let first_mismatch = expected
        .iter()
        .zip(actual)
        .position(|(expected, actual)| expected != actual);

    return CheckReport {
        expected_lines: expected.len(),
        actual_lines: actual.len(),
        first_mismatch,
    };
}

/// Sorts lines the way the external sorter does: an unterminated last line is ordered as if
/// it ended with a delimiter, and the last sorted line is left unterminated instead.
pub fn reference_sort(data: &[u8]) -> Vec<Line> {
    let mut lines = split_lines(data);
    let trailing_delimiter = data.last().map_or(true, |byte| *byte == DELIMITER);

    if !trailing_delimiter {
        if let Some(last) = lines.last_mut() {
            last.push(DELIMITER);
        }
    }
    lines.sort_unstable();
    if !trailing_delimiter {
        if let Some(last) = lines.last_mut() {
            last.pop();
        }
    }

    return lines;
}

/// Verifies that `output` holds the lines of `input` in ascending byte-wise order.
pub fn check(input: &Path, output: &Path) -> io::Result<CheckReport> {
    let expected = reference_sort(&fs::read(input)?);
    let actual = split_lines(&fs::read(output)?);

    return Ok(compare_lines(&expected, &actual));
}
