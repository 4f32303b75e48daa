//! Chunked line reader.

use std::io::{self, Read};

/// Line delimiter byte.
pub const DELIMITER: u8 = b'\n';

/// A single record: raw bytes including the trailing delimiter (if any).
pub type Line = Vec<u8>;

/// Reads a stream in fixed-size windows and yields the complete lines found in each window.
///
/// A line spanning several windows is carried over as a partial remainder and emitted
/// once its delimiter is read. At the end of the stream the remainder (if any) is emitted
/// as a final delimiter-less line.
///
/// Every call to [`Iterator::next`] reads exactly one window, so a batch may be empty
/// if the window held no delimiter. `None` marks the end of the stream; once reached
/// the reader keeps returning `None`.
pub struct ChunkedLineReader<R: Read> {
    inner: R,
    window: Box<[u8]>,
    partial: Line,
    finished: bool,
}

impl<R: Read> ChunkedLineReader<R> {
    /// Creates a reader over `inner` with a window of `window_size` bytes.
    /// The window is allocated once and owned exclusively by this reader.
    ///
    /// # Panics
    /// Panics if `window_size` is zero.
    pub fn new(inner: R, window_size: usize) -> Self {
        assert!(window_size > 0, "window size must be positive");

        return ChunkedLineReader {
            inner,
            window: vec![0; window_size].into_boxed_slice(),
            partial: Vec::new(),
            finished: false,
        };
    }

    /// Returns window size.
    pub fn window_size(&self) -> usize {
        self.window.len()
    }

    /// Pulls the next non-empty batch, skipping windows without a delimiter.
    /// Returns `Ok(None)` when the stream is exhausted.
    pub fn next_lines(&mut self) -> io::Result<Option<Vec<Line>>> {
        while let Some(batch) = self.next() {
            let batch = batch?;
            if !batch.is_empty() {
                return Ok(Some(batch));
            }
        }

        return Ok(None);
    }

    // Reads until the window is full or the stream ends.
    fn fill_window(&mut self) -> io::Result<usize> {
        let mut filled = 0;
        while filled < self.window.len() {
            match self.inner.read(&mut self.window[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }

        return Ok(filled);
    }

    fn split_lines(&mut self, filled: usize) -> Vec<Line> {
        let mut lines = Vec::new();
        let mut start = 0;

        for (pos, _) in self.window[..filled]
            .iter()
            .enumerate()
            .filter(|(_, byte)| **byte == DELIMITER)
        {
            let mut line = std::mem::take(&mut self.partial);
            line.extend_from_slice(&self.window[start..=pos]);
            lines.push(line);
            start = pos + 1;
        }
        self.partial.extend_from_slice(&self.window[start..filled]);

        return lines;
    }
}

impl<R: Read> Iterator for ChunkedLineReader<R> {
    type Item = io::Result<Vec<Line>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let filled = match self.fill_window() {
            Ok(filled) => filled,
            Err(err) => return Some(Err(err)),
        };

        if filled == 0 {
            self.finished = true;
            if self.partial.is_empty() {
                return None;
            }
            return Some(Ok(vec![std::mem::take(&mut self.partial)]));
        }

        return Some(Ok(self.split_lines(filled)));
    }
}
