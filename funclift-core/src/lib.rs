//! funclift core library - lift a Java local variable initializer into a
//! standalone functional class

// Global invariants enforced in this crate:
// - One request works on one file; the parsed tree is never mutated
// - Node ids index one arena per file, parents are ids, never references
// - The first failing stage ends a request, nothing partial is written
// - Identical input yields byte-for-byte identical output

pub mod batch;
pub mod config;
pub mod error;
pub mod language;
pub mod pipeline;
pub mod printer;
pub mod range;
pub mod report;
pub mod scope;
pub mod select;
pub mod synth;
pub mod syntax;
pub mod writer;

pub use config::ResolvedConfig;
pub use error::{ErrorKind, FailureCause, RefactorError, Stage};
pub use pipeline::{execute, execute_and_write, execute_source, Extraction, Refactoring, State};
pub use range::{Position, SourceRange};
pub use report::{render_json, render_text, ExtractionReport};
