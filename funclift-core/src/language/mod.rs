//! Parser layer
//!
//! Adapts a concrete grammar to the arena [`SyntaxTree`](crate::syntax::SyntaxTree)
//! the refactoring works on.

pub mod java;
pub mod parser;
pub mod span;
pub mod tree_sitter_utils;

use std::path::Path;

pub use java::JavaParser;
pub use parser::{ParseError, SourceParser};
pub use span::{LineIndex, SourceSpan};

/// Pick a parser from a file's extension
///
/// Returns `None` if the extension is not recognized.
pub fn parser_for_path(path: &Path) -> Option<Box<dyn SourceParser>> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("java") => Some(Box::new(JavaParser)),
        _ => None,
    }
}
