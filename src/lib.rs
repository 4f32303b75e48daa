//! `ext-line-sort` sorts newline-delimited text files that don't fit into memory.
//!
//! Sorting is achieved in two phases. During the first phase the input is read in memory-sized windows,
//! each batch of lines is sorted in memory and saved as a run file. During the second phase runs are
//! k-way merged, pass after pass, until a single sorted output file is left. For more information see
//! [External Sorting](https://en.wikipedia.org/wiki/External_sorting).
//!
//! # Overview
//!
//! * **Bounded memory:**
//!   every read and write buffer is sized from a single memory budget; the merge fan-in is chosen so that
//!   no buffer gets smaller than the longest line.
//! * **Byte-wise ordering:**
//!   lines are compared as raw bytes, the trailing `\n` included; no encoding is assumed.
//! * **Lines are records:**
//!   a line is never split or joined; if the input doesn't end with `\n`, neither does the output.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use env_logger;
//! use log;
//!
//! use ext_line_sort::ExternalSorterBuilder;
//!
//! fn main() {
//!     env_logger::Builder::new().filter_level(log::LevelFilter::Debug).init();
//!
//!     let sorter = ExternalSorterBuilder::new()
//!         .with_memory_budget(50 * 1024 * 1024)
//!         .with_max_line_len(4096)
//!         .with_tmp_dir(Path::new("./"))
//!         .build()
//!         .unwrap();
//!
//!     let sorted = sorter.sort(Path::new("input.txt")).unwrap();
//!     println!("sorted lines saved to {}", sorted.display());
//! }
//! ```

pub mod check;
pub mod merger;
pub mod reader;
pub mod run;
pub mod scheduler;
pub mod sort;

#[cfg(test)]
mod testing;

pub use check::{check, reference_sort, CheckReport};
pub use merger::{merge, merge_into};
pub use reader::{ChunkedLineReader, Line, DELIMITER};
pub use run::{build_runs, Run, Runs};
pub use scheduler::{fan_in, reduce, InsufficientMemory, ReduceError, DEFAULT_MAX_FAN_IN};
pub use sort::{sort, ExternalSorter, ExternalSorterBuilder, SortError};
