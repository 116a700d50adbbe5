//! Structured error types for the letter layout engine.
//!
//! The layout core never fails on partial input; errors only arise at the
//! boundary, when JSON is decoded or when the CLI touches the filesystem.

use thiserror::Error;

/// The unified error type returned by the public entry points.
#[derive(Debug, Error)]
pub enum LetterformError {
    /// JSON input failed to parse as a letter document.
    #[error("Failed to parse document: {source}{}", render_hint(.hint))]
    Parse {
        #[source]
        source: serde_json::Error,
        hint: String,
    },
    /// The input parsed but cannot be laid out (e.g. a non-numeric CLI argument).
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Reading or writing a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn render_hint(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {hint}")
    }
}

impl From<serde_json::Error> for LetterformError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the letter document schema. Check field names and types.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input. Is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        LetterformError::Parse { source: e, hint }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_errors_carry_a_hint() {
        let err: LetterformError = serde_json::from_str::<serde_json::Value>("{\"a\": 1,}")
            .unwrap_err()
            .into();
        let msg = err.to_string();
        assert!(msg.starts_with("Failed to parse document"));
        assert!(msg.contains("trailing commas"));
    }

    #[test]
    fn io_errors_convert() {
        let err: LetterformError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing.json").into();
        assert!(err.to_string().contains("missing.json"));
    }
}
