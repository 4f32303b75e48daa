//! Sorted runs and the run builder.

use std::fs;
use std::io::{self, prelude::*};
use std::path::Path;

use log;
use tempfile::{self, TempPath};

use crate::reader::{ChunkedLineReader, Line, DELIMITER};

/// Run file name prefix.
const RUN_PREFIX: &str = "run-";

/// Sorted run stored on the file system.
///
/// A run exclusively owns its file. The file is removed by [`Run::remove`] once the run
/// has been consumed; if a run is dropped without being removed (e.g. a sort aborted
/// half-way) the file is removed on drop.
#[derive(Debug)]
pub struct Run {
    path: TempPath,
    lines: u64,
}

impl Run {
    /// Creates a new empty run file in `dir`, returning the open file alongside the path
    /// that will back the run once it has been written.
    pub fn create(dir: &Path) -> io::Result<(fs::File, TempPath)> {
        let file = tempfile::Builder::new().prefix(RUN_PREFIX).tempfile_in(dir)?;

        return Ok(file.into_parts());
    }

    /// Wraps an already written run file.
    ///
    /// # Arguments
    /// * `path` - Run file, its lines sorted in ascending byte-wise order
    /// * `lines` - Number of lines stored in the file
    pub fn from_path(path: TempPath, lines: u64) -> Self {
        Run { path, lines }
    }

    /// Sorts `lines` and saves them to a new run file in `dir`.
    /// A line without a trailing delimiter gets one, so every stored line is terminated.
    pub fn build(dir: &Path, mut lines: Vec<Line>) -> io::Result<Self> {
        for line in lines.iter_mut().filter(|line| !is_terminated(line)) {
            line.push(DELIMITER);
        }
        lines.sort_unstable();

        let (file, path) = Self::create(dir)?;
        let mut writer = io::BufWriter::new(file);
        for line in &lines {
            writer.write_all(line)?;
        }
        writer.flush()?;

        return Ok(Run::from_path(path, lines.len() as u64));
    }

    /// Opens the run for reading with a window of `window_size` bytes.
    pub fn open(&self, window_size: usize) -> io::Result<ChunkedLineReader<fs::File>> {
        let file = fs::File::open(&self.path)?;

        return Ok(ChunkedLineReader::new(file, window_size));
    }

    /// Returns run file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns number of lines stored in the run.
    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Removes the run file.
    pub fn remove(self) -> io::Result<()> {
        log::trace!("removing run {}", self.path.display());
        self.path.close()
    }
}

fn is_terminated(line: &[u8]) -> bool {
    line.last() == Some(&DELIMITER)
}

/// Runs built from an input file.
#[derive(Debug)]
pub struct Runs {
    /// Sorted runs in input order.
    pub runs: Vec<Run>,
    /// Whether the input ends with a delimiter. If it doesn't, its last line is stored
    /// terminated and the delimiter has to be dropped from the last line of the final output.
    pub trailing_delimiter: bool,
}

/// Splits the input file into sorted runs stored in `dir`.
///
/// The input is read in windows of `memory_budget - max_line_bytes` bytes; every non-empty
/// batch of lines becomes one run. An empty input produces no runs.
pub fn build_runs(input: &Path, dir: &Path, memory_budget: usize, max_line_bytes: usize) -> io::Result<Runs> {
    let window_size = memory_budget.saturating_sub(max_line_bytes);
    if window_size == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "memory budget must exceed the maximum line length",
        ));
    }

    let mut reader = ChunkedLineReader::new(fs::File::open(input)?, window_size);
    let mut runs = Vec::new();
    let mut trailing_delimiter = true;

    while let Some(lines) = reader.next_lines()? {
        // only the last line of the input may be unterminated
        if lines.last().map_or(false, |line| !is_terminated(line)) {
            trailing_delimiter = false;
        }
        let run = Run::build(dir, lines)?;
        log::debug!("run {} built ({} lines)", run.path().display(), run.lines());
        runs.push(run);
    }

    log::info!("{} runs built from {}", runs.len(), input.display());

    return Ok(Runs {
        runs,
        trailing_delimiter,
    });
}
