//! Failure taxonomy of the refactoring pipeline
//!
//! Every stage returns its own typed error; the orchestrator wraps the first
//! one in a [`RefactorError`] carrying the file, the requested range and the
//! stage that failed. Nothing is retried: every stage is a deterministic
//! function of its input.

use crate::language::ParseError;
use crate::range::SourceRange;
use crate::scope::ScopeError;
use crate::select::SelectionError;
use crate::synth::SynthesisError;
use crate::writer::WriteError;
use serde::Serialize;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse failure class, one per exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No parser handles the file's extension
    Unsupported,
    Parse,
    Selection,
    Scope,
    Synthesis,
    Io,
}

impl ErrorKind {
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Unsupported => 1,
            ErrorKind::Selection => 2,
            ErrorKind::Scope => 3,
            ErrorKind::Synthesis | ErrorKind::Io => 4,
            ErrorKind::Parse => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Unsupported => "unsupported",
            ErrorKind::Parse => "parse",
            ErrorKind::Selection => "selection",
            ErrorKind::Scope => "scope",
            ErrorKind::Synthesis => "synthesis",
            ErrorKind::Io => "io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline stage a failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Parsing,
    Selecting,
    Resolving,
    Synthesizing,
    Writing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Parsing => "parsing",
            Stage::Selecting => "selecting",
            Stage::Resolving => "resolving",
            Stage::Synthesizing => "synthesizing",
            Stage::Writing => "writing",
        };
        f.write_str(name)
    }
}

/// The component error behind a [`RefactorError`]
#[derive(Debug, Error)]
pub enum FailureCause {
    #[error("cannot read source: {0}")]
    Read(#[source] io::Error),

    #[error("no parser for `.{extension}` files")]
    Unsupported { extension: String },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Scope(#[from] ScopeError),

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

impl FailureCause {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FailureCause::Read(_) | FailureCause::Write(_) => ErrorKind::Io,
            FailureCause::Unsupported { .. } => ErrorKind::Unsupported,
            FailureCause::Parse(_) => ErrorKind::Parse,
            FailureCause::Selection(_) => ErrorKind::Selection,
            FailureCause::Scope(_) => ErrorKind::Scope,
            FailureCause::Synthesis(_) => ErrorKind::Synthesis,
        }
    }
}

/// A failed request, with enough context to reproduce it
#[derive(Debug, Error)]
#[error("{}: {stage} {range} failed: {cause}", path.display())]
pub struct RefactorError {
    pub path: PathBuf,
    pub range: SourceRange,
    pub stage: Stage,
    #[source]
    pub cause: FailureCause,
}

impl RefactorError {
    pub fn kind(&self) -> ErrorKind {
        self.cause.kind()
    }

    /// Process exit code for this failure
    pub fn exit_code(&self) -> i32 {
        self.kind().exit_code()
    }
}
