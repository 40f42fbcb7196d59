//! Error types for Anvil

use thiserror::Error;

/// The main error type for Anvil operations
#[derive(Debug, Error)]
pub enum AnvilError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("Binary parse error at byte {offset}: {message}")]
    BinaryParseError { offset: u64, message: String },

    #[error("Invalid {what} index {index} (count is {count})")]
    InvalidIndex {
        what: &'static str,
        index: i64,
        count: usize,
    },

    #[error("Bone hierarchy error: {0}")]
    HierarchyError(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Scene error: {0}")]
    SceneError(String),

    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Import error: {0}")]
    ImportError(String),

    #[error("TOML parse error: {0}")]
    TomlParseError(String),
}

impl AnvilError {
    /// Shorthand for a text-format parse error
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        AnvilError::ParseError {
            line,
            message: message.into(),
        }
    }
}

/// Result type alias for Anvil operations
pub type Result<T> = std::result::Result<T, AnvilError>;

impl From<toml::de::Error> for AnvilError {
    fn from(err: toml::de::Error) -> Self {
        AnvilError::TomlParseError(err.to_string())
    }
}
