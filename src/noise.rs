//! Noise trace loading and parsing.
//!
//! A noise trace is a plain-text file carrying one integer channel
//! noise sample per line. Blank lines are allowed and skipped; any
//! other line must parse as an integer. Every configured node receives
//! the full sequence in file order, so all nodes share one environment.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Buffer size for reading trace files (8KB).
const BUFFER_SIZE: usize = 8 * 1024;

/// Error type for noise trace loading failures.
#[derive(Debug)]
pub enum NoiseTraceError {
    FileReadError(String),
    ParseError { line: usize, content: String },
}

impl std::fmt::Display for NoiseTraceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoiseTraceError::FileReadError(msg) => write!(f, "Failed to read file: {}", msg),
            NoiseTraceError::ParseError { line, content } => {
                write!(f, "Invalid noise sample on line {}: '{}'", line, content)
            }
        }
    }
}

impl std::error::Error for NoiseTraceError {}

/// Parse a noise trace from a buffered reader.
///
/// Lines are trimmed before parsing; blank lines are skipped without
/// affecting the sequence. Line numbers in errors are 1-based and count
/// every line of the input, including the skipped blanks.
pub fn parse_noise_trace<R: BufRead>(reader: R) -> Result<Vec<i32>, NoiseTraceError> {
    let mut readings = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| NoiseTraceError::FileReadError(e.to_string()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let value: i32 = trimmed.parse().map_err(|_| NoiseTraceError::ParseError {
            line: index + 1,
            content: trimmed.to_string(),
        })?;
        readings.push(value);
    }

    Ok(readings)
}

/// Load a noise trace from a file.
///
/// The file handle is scoped to this call and closed before returning.
pub fn load_noise_trace(path: &Path) -> Result<Vec<i32>, NoiseTraceError> {
    let file = File::open(path)
        .map_err(|e| NoiseTraceError::FileReadError(format!("{}: {}", path.display(), e)))?;
    parse_noise_trace(BufReader::with_capacity(BUFFER_SIZE, file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn test_parse_skips_blank_lines() {
        let readings = parse_noise_trace(Cursor::new("5\n\n-3\n12\n")).unwrap();
        assert_eq!(readings, vec![5, -3, 12]);
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let readings = parse_noise_trace(Cursor::new("  -98 \n\t-97\n")).unwrap();
        assert_eq!(readings, vec![-98, -97]);
    }

    #[test]
    fn test_blank_input_yields_empty_trace() {
        assert_eq!(parse_noise_trace(Cursor::new("")).unwrap(), Vec::<i32>::new());
        assert_eq!(parse_noise_trace(Cursor::new("\n \n\t\n")).unwrap(), Vec::<i32>::new());
    }

    #[test]
    fn test_non_numeric_line_is_an_error() {
        let err = parse_noise_trace(Cursor::new("5\n\nabc\n12\n")).unwrap_err();
        match err {
            NoiseTraceError::ParseError { line, content } => {
                // Blank lines still count towards the reported line number.
                assert_eq!(line, 3);
                assert_eq!(content, "abc");
            }
            other => panic!("Expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_fractional_sample_is_an_error() {
        let err = parse_noise_trace(Cursor::new("-98.5\n")).unwrap_err();
        assert!(matches!(err, NoiseTraceError::ParseError { line: 1, .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trace.txt");
        std::fs::write(&path, "-98\n-98\n-96\n").unwrap();

        let readings = load_noise_trace(&path).unwrap();
        assert_eq!(readings, vec![-98, -98, -96]);
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        let dir = TempDir::new().unwrap();
        let err = load_noise_trace(&dir.path().join("absent.txt")).unwrap_err();
        assert!(matches!(err, NoiseTraceError::FileReadError(_)));
    }
}
