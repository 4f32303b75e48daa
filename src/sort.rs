//! External sorter.

use std::error::Error;
use std::ffi::OsString;
use std::fmt;
use std::fmt::Display;
use std::io;
use std::path::{Path, PathBuf};

use log;

use crate::run::build_runs;
use crate::scheduler::{self, InsufficientMemory, ReduceError, DEFAULT_MAX_FAN_IN};

/// Temporary directory name prefix.
const TMP_DIR_PREFIX: &str = ".ext-line-sort-";
/// Default output file name prefix.
const OUTPUT_PREFIX: &str = "sorted_";

/// Sorting error.
#[derive(Debug)]
pub enum SortError {
    /// Memory budget is too small for the maximum line length.
    InsufficientMemory(InsufficientMemory),
    /// Temporary directory or file creation error.
    TempDir(io::Error),
    /// Common I/O error.
    IO(io::Error),
}

impl Error for SortError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self {
            SortError::InsufficientMemory(_) => None,
            SortError::TempDir(err) => Some(err),
            SortError::IO(err) => Some(err),
        }
    }
}

impl Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            SortError::InsufficientMemory(err) => write!(f, "insufficient memory: {}", err),
            SortError::TempDir(err) => write!(f, "temporary directory or file not created: {}", err),
            SortError::IO(err) => write!(f, "I/O operation failed: {}", err),
        }
    }
}

impl From<ReduceError> for SortError {
    fn from(err: ReduceError) -> Self {
        match err {
            ReduceError::InsufficientMemory(err) => SortError::InsufficientMemory(err),
            ReduceError::IO(err) => SortError::IO(err),
        }
    }
}

/// External sorter builder. Provides methods for [`ExternalSorter`] initialization.
#[derive(Clone, Debug)]
pub struct ExternalSorterBuilder {
    /// Memory budget in bytes.
    memory_budget: usize,
    /// Maximum line length in bytes including the delimiter.
    max_line_bytes: usize,
    /// Maximum number of runs merged at once.
    max_fan_in: usize,
    /// Directory to be used to store temporary data.
    tmp_dir: Option<PathBuf>,
    /// Sorted output file.
    output: Option<PathBuf>,
}

impl ExternalSorterBuilder {
    /// Creates an instance of a builder with default parameters.
    pub fn new() -> Self {
        ExternalSorterBuilder::default()
    }

    /// Builds an [`ExternalSorter`] instance using provided configuration.
    /// Fails if the memory budget can't support a 2-way merge of the longest lines.
    pub fn build(self) -> Result<ExternalSorter, SortError> {
        ExternalSorter::new(
            self.memory_budget,
            self.max_line_bytes,
            self.max_fan_in,
            self.tmp_dir.as_deref(),
            self.output.as_deref(),
        )
    }

    /// Sets memory budget in bytes.
    pub fn with_memory_budget(mut self, memory_budget: usize) -> ExternalSorterBuilder {
        self.memory_budget = memory_budget;
        return self;
    }

    /// Sets maximum line length in bytes (the delimiter included).
    pub fn with_max_line_len(mut self, max_line_bytes: usize) -> ExternalSorterBuilder {
        self.max_line_bytes = max_line_bytes;
        return self;
    }

    /// Sets maximum number of runs merged at once.
    pub fn with_max_fan_in(mut self, max_fan_in: usize) -> ExternalSorterBuilder {
        self.max_fan_in = max_fan_in;
        return self;
    }

    /// Sets directory to be used to store temporary data.
    pub fn with_tmp_dir(mut self, path: &Path) -> ExternalSorterBuilder {
        self.tmp_dir = Some(path.into());
        return self;
    }

    /// Sets sorted output file path.
    pub fn with_output(mut self, path: &Path) -> ExternalSorterBuilder {
        self.output = Some(path.into());
        return self;
    }
}

impl Default for ExternalSorterBuilder {
    fn default() -> Self {
        ExternalSorterBuilder {
            memory_budget: 64 * 1024 * 1024,
            max_line_bytes: 4096,
            max_fan_in: DEFAULT_MAX_FAN_IN,
            tmp_dir: None,
            output: None,
        }
    }
}

/// External sorter.
#[derive(Debug)]
pub struct ExternalSorter {
    /// Memory budget in bytes.
    memory_budget: usize,
    /// Maximum line length in bytes including the delimiter.
    max_line_bytes: usize,
    /// Maximum number of runs merged at once.
    max_fan_in: usize,
    /// Directory to be used to store temporary data.
    tmp_dir: Option<PathBuf>,
    /// Sorted output file.
    output: Option<PathBuf>,
}

impl ExternalSorter {
    /// Creates a new external sorter instance.
    ///
    /// # Arguments
    /// * `memory_budget` - Memory budget in bytes shared by all read and write buffers.
    /// * `max_line_bytes` - Maximum line length in bytes including the delimiter.
    /// * `max_fan_in` - Maximum number of runs merged at once.
    /// * `tmp_path` - Directory to be used to store temporary data. If parameter is [`None`]
    ///   the input file directory will be used.
    /// * `output` - Sorted output file. If parameter is [`None`] the output is placed next to
    ///   the input and named after it with a `sorted_` prefix.
    pub fn new(
        memory_budget: usize,
        max_line_bytes: usize,
        max_fan_in: usize,
        tmp_path: Option<&Path>,
        output: Option<&Path>,
    ) -> Result<Self, SortError> {
        if !scheduler::is_feasible(memory_budget, max_line_bytes, 2) {
            return Err(SortError::InsufficientMemory(InsufficientMemory {
                memory_budget,
                max_line_bytes,
                fan_in: 2,
            }));
        }

        return Ok(ExternalSorter {
            memory_budget,
            max_line_bytes,
            max_fan_in: max_fan_in.max(2),
            tmp_dir: tmp_path.map(Path::to_path_buf),
            output: output.map(Path::to_path_buf),
        });
    }

    fn init_tmp_directory(&self, input: &Path) -> Result<tempfile::TempDir, SortError> {
        let base = match &self.tmp_dir {
            Some(tmp_dir) => tmp_dir.clone(),
            None => parent_dir(input),
        };
        let tmp_dir = tempfile::Builder::new()
            .prefix(TMP_DIR_PREFIX)
            .tempdir_in(base)
            .map_err(SortError::TempDir)?;

        log::info!("using {} as a temporary directory", tmp_dir.path().display());

        return Ok(tmp_dir);
    }

    /// Returns the output path for the `input` file.
    pub fn output_path(&self, input: &Path) -> PathBuf {
        if let Some(output) = &self.output {
            return output.clone();
        }

        let mut file_name = OsString::from(OUTPUT_PREFIX);
        if let Some(name) = input.file_name() {
            file_name.push(name);
        }

        return parent_dir(input).join(file_name);
    }

    /// Sorts lines of the `input` file.
    /// Returns the sorted output file path. The input file is left untouched.
    pub fn sort(&self, input: &Path) -> Result<PathBuf, SortError> {
        let output = self.output_path(input);
        let tmp_dir = self.init_tmp_directory(input)?;

        log::info!("sorting {} into {}", input.display(), output.display());
        let built = build_runs(input, tmp_dir.path(), self.memory_budget, self.max_line_bytes).map_err(SortError::IO)?;
        log::debug!("external sort preparation done");

        scheduler::reduce(
            built.runs,
            &output,
            tmp_dir.path(),
            self.memory_budget,
            self.max_line_bytes,
            self.max_fan_in,
            built.trailing_delimiter,
        )?;

        tmp_dir.close().map_err(SortError::IO)?;

        return Ok(output);
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Sorts lines of the `input` file using at most `memory_budget` bytes for line buffers.
/// Lines must be at most `max_line_bytes` long. Returns the sorted output file path.
pub fn sort(input: &Path, memory_budget: usize, max_line_bytes: usize) -> Result<PathBuf, SortError> {
    ExternalSorterBuilder::new()
        .with_memory_budget(memory_budget)
        .with_max_line_len(max_line_bytes)
        .build()?
        .sort(input)
}
