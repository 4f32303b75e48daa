//! Binary heap k-way merger.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};
use std::fs;
use std::io::{self, prelude::*};
use std::path::Path;

use log;

use crate::reader::{ChunkedLineReader, Line, DELIMITER};
use crate::run::Run;

/// Read cursor over a single run: the run's reader and its current batch of lines.
struct RunCursor {
    reader: ChunkedLineReader<fs::File>,
    batch: VecDeque<Line>,
}

impl RunCursor {
    fn open(run: &Run, window_size: usize) -> io::Result<Self> {
        return Ok(RunCursor {
            reader: run.open(window_size)?,
            batch: VecDeque::new(),
        });
    }

    /// Returns the next line of the run refilling the batch from the reader if needed.
    /// `None` means the run is finished.
    fn next_line(&mut self) -> io::Result<Option<Line>> {
        if self.batch.is_empty() {
            if let Some(lines) = self.reader.next_lines()? {
                self.batch = lines.into();
            }
        }

        return Ok(self.batch.pop_front());
    }
}

/// Returns the read window size of every run when `runs_number` runs are merged at once.
/// One extra share of the budget is reserved for the output write buffer.
pub fn window_size(memory_budget: usize, max_line_bytes: usize, runs_number: usize) -> usize {
    (memory_budget / (runs_number + 1)).saturating_sub(max_line_bytes)
}

/// Merges sorted runs into `writer`.
///
/// Every run is read through its own window of `memory_budget / (N + 1) - max_line_bytes`
/// bytes and the output is accumulated in a write buffer of the same size. Equal lines
/// are emitted in run order. Consumed runs are removed once the merge has completed.
/// Returns the number of merged lines.
///
/// Run lines are always delimiter-terminated. If `trailing_delimiter` is `false` the delimiter
/// of the last merged line is dropped, so the output ends the way an unterminated input did.
///
/// The caller must ensure the window is at least `max_line_bytes` long.
pub fn merge_into<W: Write>(
    runs: Vec<Run>,
    writer: &mut W,
    memory_budget: usize,
    max_line_bytes: usize,
    trailing_delimiter: bool,
) -> io::Result<u64> {
    let window_size = window_size(memory_budget, max_line_bytes, runs.len());
    if window_size == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("memory budget is too small to merge {} runs", runs.len()),
        ));
    }

    log::debug!("merging {} runs (window: {} bytes)", runs.len(), window_size);

    let mut cursors = Vec::with_capacity(runs.len());
    // binary heap is max-heap by default so we reverse it to convert it to min-heap,
    // the run index breaks ties in favour of the earlier run
    let mut heads = BinaryHeap::with_capacity(runs.len());
    for (idx, run) in runs.iter().enumerate() {
        let mut cursor = RunCursor::open(run, window_size)?;
        if let Some(line) = cursor.next_line()? {
            heads.push(Reverse((line, idx)));
        }
        cursors.push(cursor);
    }

    let mut write_buf: Vec<u8> = Vec::with_capacity(window_size);
    let mut merged = 0;

    while let Some(Reverse((mut line, idx))) = heads.pop() {
        if let Some(next) = cursors[idx].next_line()? {
            heads.push(Reverse((next, idx)));
        }
        if heads.is_empty() && !trailing_delimiter && line.last() == Some(&DELIMITER) {
            line.pop();
        }

        if write_buf.len() + line.len() > window_size {
            writer.write_all(&write_buf)?;
            write_buf.clear();
        }
        write_buf.extend_from_slice(&line);
        merged += 1;
    }

    if !write_buf.is_empty() {
        writer.write_all(&write_buf)?;
    }
    writer.flush()?;

    // run files are closed before being removed
    drop(cursors);
    for run in runs {
        run.remove()?;
    }

    return Ok(merged);
}

/// Merges sorted runs into a new file at `output`. See [`merge_into`].
pub fn merge(
    runs: Vec<Run>,
    output: &Path,
    memory_budget: usize,
    max_line_bytes: usize,
    trailing_delimiter: bool,
) -> io::Result<u64> {
    let mut file = fs::File::create(output)?;
    let merged = merge_into(runs, &mut file, memory_budget, max_line_bytes, trailing_delimiter)?;
    file.sync_all()?;

    log::debug!("{} lines merged into {}", merged, output.display());

    return Ok(merged);
}
