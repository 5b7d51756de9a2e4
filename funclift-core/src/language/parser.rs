//! Parser interface consumed by the refactoring pipeline

use crate::range::Position;
use crate::syntax::SyntaxTree;
use thiserror::Error;

/// Malformed input. Fatal: the pipeline stops before selection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{filename}: {message}")]
pub struct ParseError {
    pub filename: String,
    /// Location of the first syntax error, when one could be pinned down
    pub position: Option<Position>,
    pub message: String,
}

impl ParseError {
    pub fn new(filename: &str, position: Option<Position>, message: impl Into<String>) -> Self {
        ParseError {
            filename: filename.to_string(),
            position,
            message: message.into(),
        }
    }
}

/// Turns source text into a [`SyntaxTree`]
///
/// Implementations must report syntax errors instead of returning a
/// partially recovered tree.
pub trait SourceParser: Send + Sync {
    /// Parse source code into a syntax tree
    ///
    /// # Arguments
    ///
    /// * `source` - The source code to parse
    /// * `filename` - The name of the file being parsed (for error messages)
    fn parse(&self, source: &str, filename: &str) -> Result<SyntaxTree, ParseError>;

    /// File extension (without the dot) of sources this parser accepts
    fn extension(&self) -> &'static str;
}
