use crate::{Error, Result};
use std::path::Path;
use tracing::debug;

/// One non-blank line of the input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputLine {
    /// 1-based position in the source file
    pub number: usize,
    /// Line contents with surrounding whitespace removed
    pub text: String,
}

impl InputLine {
    pub fn new(number: usize, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }
}

/// Split `content` into trimmed lines, dropping those that are blank.
pub fn parse_lines(content: &str) -> Vec<InputLine> {
    content
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| {
            let text = line.trim();
            if text.is_empty() {
                None
            } else {
                Some(InputLine::new(idx + 1, text))
            }
        })
        .collect()
}

/// Read the whole input file and return its non-blank lines in file order.
pub async fn read_lines(path: &Path) -> Result<Vec<InputLine>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| Error::Input {
            path: path.to_path_buf(),
            source,
        })?;

    let lines = parse_lines(&content);
    debug!(
        path = %path.display(),
        lines = lines.len(),
        bytes = content.len(),
        "Read input file"
    );

    Ok(lines)
}
