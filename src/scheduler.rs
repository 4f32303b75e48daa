//! Multi-pass merge scheduler.

use std::fmt;
use std::io;
use std::path::Path;

use log;

use crate::merger::{self, window_size};
use crate::run::Run;

/// Default maximum number of runs merged at once.
pub const DEFAULT_MAX_FAN_IN: usize = 8;

/// Memory budget can't hold a single line per merge buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsufficientMemory {
    pub memory_budget: usize,
    pub max_line_bytes: usize,
    pub fan_in: usize,
}

impl fmt::Display for InsufficientMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "memory budget of {} bytes can't merge {} runs of lines up to {} bytes",
            self.memory_budget, self.fan_in, self.max_line_bytes
        )
    }
}

/// Checks that every buffer of a `fan_in`-way merge can hold a line of `max_line_bytes` bytes.
pub fn is_feasible(memory_budget: usize, max_line_bytes: usize, fan_in: usize) -> bool {
    window_size(memory_budget, max_line_bytes, fan_in) >= max_line_bytes.max(1)
}

/// Returns the largest fan-in, starting from `max_fan_in` and halving,
/// that keeps every merge buffer at least `max_line_bytes` long.
pub fn fan_in(memory_budget: usize, max_line_bytes: usize, max_fan_in: usize) -> Result<usize, InsufficientMemory> {
    let mut fan_in = max_fan_in.max(1);
    while !is_feasible(memory_budget, max_line_bytes, fan_in) {
        if fan_in == 1 {
            return Err(InsufficientMemory {
                memory_budget,
                max_line_bytes,
                fan_in,
            });
        }
        fan_in /= 2;
    }

    return Ok(fan_in);
}

/// Merge scheduler error.
#[derive(Debug)]
pub enum ReduceError {
    /// Budget doesn't allow a merge that reduces the run count.
    InsufficientMemory(InsufficientMemory),
    /// Run reading, writing or removal failure.
    IO(io::Error),
}

impl From<io::Error> for ReduceError {
    fn from(err: io::Error) -> Self {
        ReduceError::IO(err)
    }
}

/// Reduces `runs` to a single sorted file at `output`.
///
/// Runs are merged in groups of up to `k` runs (see [`fan_in`]) into intermediate runs in `tmp_dir`,
/// round after round, until at most `k` runs are left; those are merged straight into `output`.
/// A leftover single run of a round is carried over to the next one unchanged.
/// No runs produce an empty output file. Intermediate runs keep every delimiter,
/// `trailing_delimiter` only applies to the final merge (see [`merger::merge_into`]).
pub fn reduce(
    runs: Vec<Run>,
    output: &Path,
    tmp_dir: &Path,
    memory_budget: usize,
    max_line_bytes: usize,
    max_fan_in: usize,
    trailing_delimiter: bool,
) -> Result<u64, ReduceError> {
    let k = fan_in(memory_budget, max_line_bytes, max_fan_in).map_err(ReduceError::InsufficientMemory)?;
    log::info!("merging {} runs (fan-in: {})", runs.len(), k);

    let mut runs = runs;
    let mut round = 0;
    while runs.len() > k {
        if k < 2 {
            return Err(ReduceError::InsufficientMemory(InsufficientMemory {
                memory_budget,
                max_line_bytes,
                fan_in: 2,
            }));
        }

        log::debug!("merge round {}: {} runs", round, runs.len());
        runs = merge_round(runs, k, tmp_dir, memory_budget, max_line_bytes)?;
        round += 1;
    }

    let merged = merger::merge(runs, output, memory_budget, max_line_bytes, trailing_delimiter)?;
    log::info!("{} lines merged into {} in {} rounds", merged, output.display(), round + 1);

    return Ok(merged);
}

fn merge_round(
    runs: Vec<Run>,
    k: usize,
    tmp_dir: &Path,
    memory_budget: usize,
    max_line_bytes: usize,
) -> io::Result<Vec<Run>> {
    let mut next_runs = Vec::with_capacity(runs.len() / k + 1);
    let mut runs = runs.into_iter().peekable();

    while runs.peek().is_some() {
        let group: Vec<Run> = runs.by_ref().take(k).collect();
        if group.len() == 1 {
            next_runs.extend(group);
            continue;
        }

        let (mut file, path) = Run::create(tmp_dir)?;
        let merged = merger::merge_into(group, &mut file, memory_budget, max_line_bytes, true)?;
        next_runs.push(Run::from_path(path, merged));
    }

    return Ok(next_runs);
}

#[cfg(test)]
mod test {
    use std::fs;

    use rand::seq::SliceRandom;
    use rand::{rngs::StdRng, SeedableRng};
    use rstest::*;

    use super::{fan_in, is_feasible, reduce, ReduceError, DEFAULT_MAX_FAN_IN};
    use crate::run::Run;

    #[fixture]
    fn tmp_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    #[rstest]
    #[case(1000, 10, 8)]
    #[case(180, 10, 8)]
    #[case(179, 10, 4)]
    #[case(60, 10, 2)]
    #[case(40, 10, 1)]
    fn test_fan_in(#[case] memory_budget: usize, #[case] max_line_bytes: usize, #[case] expected: usize) {
        assert_eq!(fan_in(memory_budget, max_line_bytes, DEFAULT_MAX_FAN_IN), Ok(expected));
        assert!(is_feasible(memory_budget, max_line_bytes, expected));
    }

    #[test]
    fn test_fan_in_insufficient_memory() {
        let err = fan_in(39, 10, DEFAULT_MAX_FAN_IN).unwrap_err();
        assert_eq!(err.fan_in, 1);
        assert_eq!(err.memory_budget, 39);
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(3)]
    #[case(8)]
    #[case(17)]
    fn test_reduce(tmp_dir: tempfile::TempDir, #[case] runs_number: usize) {
        let mut lines: Vec<String> = (0..runs_number * 5).map(|i| format!("line-{:05}\n", i)).collect();
        lines.shuffle(&mut StdRng::seed_from_u64(7));

        let runs_dir = tmp_dir.path().join("runs");
        fs::create_dir(&runs_dir).unwrap();
        let runs: Vec<Run> = lines
            .chunks(5)
            .map(|chunk| Run::build(&runs_dir, chunk.iter().map(|line| line.as_bytes().to_vec()).collect()).unwrap())
            .collect();
        assert_eq!(runs.len(), runs_number);

        let output = tmp_dir.path().join("sorted.txt");
        let merged = reduce(runs, &output, &runs_dir, 1000, 16, DEFAULT_MAX_FAN_IN, true).unwrap();

        lines.sort();
        assert_eq!(merged, lines.len() as u64);
        assert_eq!(fs::read_to_string(&output).unwrap(), lines.concat());
        assert_eq!(fs::read_dir(&runs_dir).unwrap().count(), 0);
    }

    #[rstest]
    fn test_reduce_pairs(tmp_dir: tempfile::TempDir) {
        let runs: Vec<Run> = ["c\n", "a\n", "d\n", "b\n", "e\n"]
            .iter()
            .map(|line| Run::build(tmp_dir.path(), vec![line.as_bytes().to_vec()]).unwrap())
            .collect();

        let output = tmp_dir.path().join("sorted.txt");
        // 60 / 3 - 10 = 10 bytes per buffer: pairs only
        reduce(runs, &output, tmp_dir.path(), 60, 10, DEFAULT_MAX_FAN_IN, true).unwrap();

        assert_eq!(fs::read_to_string(&output).unwrap(), "a\nb\nc\nd\ne\n");
        assert_eq!(fs::read_dir(tmp_dir.path()).unwrap().count(), 1);
    }

    #[rstest]
    fn test_reduce_unterminated_input(tmp_dir: tempfile::TempDir) {
        // "b" was the unterminated last line of the input
        let runs: Vec<Run> = ["c\n", "b", "e\n", "a\n", "d\n"]
            .iter()
            .map(|line| Run::build(tmp_dir.path(), vec![line.as_bytes().to_vec()]).unwrap())
            .collect();

        let output = tmp_dir.path().join("sorted.txt");
        let merged = reduce(runs, &output, tmp_dir.path(), 60, 10, DEFAULT_MAX_FAN_IN, false).unwrap();

        assert_eq!(merged, 5);
        assert_eq!(fs::read_to_string(&output).unwrap(), "a\nb\nc\nd\ne");
    }

    #[rstest]
    fn test_reduce_single_buffer_budget(tmp_dir: tempfile::TempDir) {
        let runs: Vec<Run> = ["b\n", "a\n"]
            .iter()
            .map(|line| Run::build(tmp_dir.path(), vec![line.as_bytes().to_vec()]).unwrap())
            .collect();

        let output = tmp_dir.path().join("sorted.txt");
        let err = reduce(runs, &output, tmp_dir.path(), 40, 10, DEFAULT_MAX_FAN_IN, true).unwrap_err();

        assert!(matches!(err, ReduceError::InsufficientMemory(err) if err.fan_in == 2));
        assert!(!output.exists());
    }
}
