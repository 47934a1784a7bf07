//! Whitespace-delimited numeric matrices: mixing matrices, their frequency
//! counterparts and realignment parameter tables.

use crate::error::{AromaError, Result};
use crate::mmap_utils::mmap_file;
use nalgebra::DMatrix;
use std::path::Path;

fn parse_f64(bytes: &[u8]) -> Option<f64> {
    std::str::from_utf8(bytes).ok()?.parse::<f64>().ok()
}

/// Parse a text matrix from a byte slice (e.g. mmap).
///
/// One row per line, values separated by any ASCII whitespace. Blank lines and
/// lines starting with `#` are skipped. Every row must have the same number of
/// values and every token must be a number.
pub fn parse_matrix_bytes(content: &[u8]) -> Result<DMatrix<f64>> {
    let mut values = Vec::new();
    let mut n_rows = 0usize;
    let mut n_cols = 0usize;

    for (line_no, line) in content.split(|&b| b == b'\n').enumerate() {
        let first = line.iter().position(|b| !b.is_ascii_whitespace());
        let Some(first) = first else {
            continue;
        };
        if line[first] == b'#' {
            continue;
        }

        let row_start = values.len();
        for token in line
            .split(|b| b.is_ascii_whitespace())
            .filter(|t| !t.is_empty())
        {
            let value = parse_f64(token).ok_or_else(|| {
                AromaError::ParseError(format!(
                    "line {}: '{}' is not a number",
                    line_no + 1,
                    String::from_utf8_lossy(token)
                ))
            })?;
            values.push(value);
        }

        let row_len = values.len() - row_start;
        if n_rows == 0 {
            n_cols = row_len;
        } else if row_len != n_cols {
            return Err(AromaError::ParseError(format!(
                "line {}: {} values, previous rows have {}",
                line_no + 1,
                row_len,
                n_cols
            )));
        }
        n_rows += 1;
    }

    if n_rows == 0 {
        return Err(AromaError::ParseError("no numeric rows found".to_string()));
    }

    log::debug!("Parsed matrix: {} rows × {} columns", n_rows, n_cols);
    Ok(DMatrix::from_row_slice(n_rows, n_cols, &values))
}

/// Parse a text matrix from a string
pub fn parse_matrix(content: &str) -> Result<DMatrix<f64>> {
    parse_matrix_bytes(content.as_bytes())
}

/// Read a text matrix file through a read-only memory map
pub fn read_matrix_file(path: &Path) -> Result<DMatrix<f64>> {
    let size = std::fs::metadata(path)?.len();
    if size == 0 {
        return Err(AromaError::ParseError(format!(
            "{} is empty",
            path.display()
        )));
    }
    let mmap = mmap_file(path)?;
    parse_matrix_bytes(&mmap).map_err(|e| match e {
        AromaError::ParseError(msg) => {
            AromaError::ParseError(format!("{}: {}", path.display(), msg))
        }
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_whitespace_matrix() {
        let text = "# melodic_mix\n  1.0   2.5e-1\t-3\n\n4 5 6\r\n";
        let m = parse_matrix(text).unwrap();
        assert_eq!(m.shape(), (2, 3));
        assert_eq!(m[(0, 1)], 0.25);
        assert_eq!(m[(0, 2)], -3.0);
        assert_eq!(m[(1, 0)], 4.0);
    }

    #[test]
    fn test_last_line_without_newline() {
        let m = parse_matrix("1 2\n3 4").unwrap();
        assert_eq!(m.shape(), (2, 2));
        assert_eq!(m[(1, 1)], 4.0);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = parse_matrix("1 2 3\n4 5\n").unwrap_err();
        match err {
            AromaError::ParseError(msg) => assert!(msg.contains("line 2")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_non_numeric_rejected() {
        assert!(matches!(
            parse_matrix("1 2\n3 abc\n"),
            Err(AromaError::ParseError(_))
        ));
        assert!(matches!(
            parse_matrix("# only a comment\n\n"),
            Err(AromaError::ParseError(_))
        ));
    }

    #[test]
    fn test_read_matrix_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0.1 0.2 0.3 0.4 0.5 0.6").unwrap();
        writeln!(file, "0.2 0.3 0.4 0.5 0.6 0.7").unwrap();
        file.flush().unwrap();

        let m = read_matrix_file(file.path()).unwrap();
        assert_eq!(m.shape(), (2, 6));

        let empty = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            read_matrix_file(empty.path()),
            Err(AromaError::ParseError(_))
        ));
    }
}
