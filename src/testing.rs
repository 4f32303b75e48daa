//! Test input generation.

use std::fs;
use std::io::{self, prelude::*};
use std::path::Path;

use rand::{rngs::StdRng, Rng, SeedableRng};

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Writes `lines` random lines of ASCII letters to `path`.
/// Every line is 1 to `max_line_bytes` bytes long, the trailing delimiter included.
/// Without `trailing_delimiter` the last line is written non-empty and unterminated.
pub fn generate_file(
    path: &Path,
    lines: usize,
    max_line_bytes: usize,
    trailing_delimiter: bool,
    seed: u64,
) -> io::Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut writer = io::BufWriter::new(fs::File::create(path)?);

    let mut line = Vec::with_capacity(max_line_bytes);
    for idx in 0..lines {
        let last = idx + 1 == lines;
        let min_len = if last && !trailing_delimiter { 2 } else { 1 };
        let len = rng.gen_range(min_len..=max_line_bytes.max(min_len));
        line.clear();
        line.extend((1..len).map(|_| LETTERS[rng.gen_range(0..LETTERS.len())]));
        if !last || trailing_delimiter {
            line.push(b'\n');
        }
        writer.write_all(&line)?;
    }
    writer.flush()?;

    return Ok(());
}

#[cfg(test)]
mod test {
    use std::fs;

    use rstest::*;

    use super::generate_file;

    #[rstest]
    #[case(true)]
    #[case(false)]
    fn test_generate_file(#[case] trailing_delimiter: bool) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.txt");

        generate_file(&path, 100, 8, trailing_delimiter, 1).unwrap();

        let data = fs::read(&path).unwrap();
        let lines: Vec<&[u8]> = data.split_inclusive(|byte| *byte == b'\n').collect();
        assert_eq!(lines.len(), 100);
        assert!(lines.iter().all(|line| line.len() <= 8));
        assert_eq!(data.ends_with(b"\n"), trailing_delimiter);
    }
}
