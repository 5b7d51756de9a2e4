//! Orchestration of one extraction request
//!
//! A [`Refactoring`] walks `Idle -> Parsing -> Selecting -> Resolving ->
//! Synthesizing -> Done`. The first failing stage moves it to
//! `Failed(kind)` and nothing is handed to the writer.

use crate::config::ResolvedConfig;
use crate::error::{ErrorKind, FailureCause, RefactorError, Stage};
use crate::language::parser_for_path;
use crate::printer;
use crate::range::SourceRange;
use crate::scope::{self, CapturedVariable, JavaType};
use crate::select::{self, StatementParts};
use crate::synth::{self, InitializerExpression, SynthesizedUnit, UnitHeader};
use crate::writer;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Orchestrator states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Parsing,
    Selecting,
    Resolving,
    Synthesizing,
    Done,
    Failed(ErrorKind),
}

impl State {
    /// Stage a working state belongs to
    fn stage(self) -> Option<Stage> {
        match self {
            State::Parsing => Some(Stage::Parsing),
            State::Selecting => Some(Stage::Selecting),
            State::Resolving => Some(Stage::Resolving),
            State::Synthesizing => Some(Stage::Synthesizing),
            State::Idle | State::Done | State::Failed(_) => None,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Idle => f.write_str("idle"),
            State::Parsing => f.write_str("parsing"),
            State::Selecting => f.write_str("selecting"),
            State::Resolving => f.write_str("resolving"),
            State::Synthesizing => f.write_str("synthesizing"),
            State::Done => f.write_str("done"),
            State::Failed(kind) => write!(f, "failed({kind})"),
        }
    }
}

/// A finished extraction, ready to be written
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Source file the statement came from
    pub path: PathBuf,
    /// Range as requested
    pub range: SourceRange,
    /// Range of the selected declaration statement
    pub statement_range: SourceRange,
    pub unit: SynthesizedUnit,
    /// Printed unit
    pub rendered: String,
    /// Where the unit goes: next to the source file
    pub target: PathBuf,
    /// Free variables with their declared types
    pub captured: Vec<CapturedVariable>,
    /// Captured names whose type came from one of several declarations
    pub ambiguous: Vec<String>,
}

/// One extraction request moving through the pipeline
#[derive(Debug)]
pub struct Refactoring<'a> {
    path: PathBuf,
    range: SourceRange,
    config: &'a ResolvedConfig,
    state: State,
    visited: Vec<State>,
}

impl<'a> Refactoring<'a> {
    pub fn new(path: &Path, range: SourceRange, config: &'a ResolvedConfig) -> Self {
        Refactoring {
            path: path.to_path_buf(),
            range,
            config,
            state: State::Idle,
            visited: vec![State::Idle],
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Every state entered so far, starting with `Idle`
    pub fn visited(&self) -> &[State] {
        &self.visited
    }

    fn advance(&mut self, next: State) {
        debug!(from = %self.state, to = %next, path = %self.path.display(), "transition");
        self.state = next;
        self.visited.push(next);
    }

    /// Move to `Failed` and wrap `cause` with the request context
    fn fail(&mut self, cause: FailureCause) -> RefactorError {
        let stage = self.state.stage().unwrap_or(Stage::Parsing);
        self.advance(State::Failed(cause.kind()));
        RefactorError {
            path: self.path.clone(),
            range: self.range,
            stage,
            cause,
        }
    }

    /// Read the file from disk, then run the pipeline
    pub fn run(&mut self) -> Result<Extraction, RefactorError> {
        self.advance(State::Parsing);
        match std::fs::read_to_string(&self.path) {
            Ok(source) => self.run_parsing(&source),
            Err(e) => Err(self.fail(FailureCause::Read(e))),
        }
    }

    /// Run the pipeline over in-memory source text
    pub fn run_source(&mut self, source: &str) -> Result<Extraction, RefactorError> {
        self.advance(State::Parsing);
        self.run_parsing(source)
    }

    fn run_parsing(&mut self, source: &str) -> Result<Extraction, RefactorError> {
        info!(path = %self.path.display(), range = %self.range, "extracting");

        let Some(parser) = parser_for_path(&self.path) else {
            let extension = self
                .path
                .extension()
                .map(|ext| ext.to_string_lossy().into_owned())
                .unwrap_or_default();
            return Err(self.fail(FailureCause::Unsupported { extension }));
        };
        let filename = self.path.display().to_string();
        let tree = match parser.parse(source, &filename) {
            Ok(tree) => tree,
            Err(e) => return Err(self.fail(e.into())),
        };

        self.advance(State::Selecting);
        let statement = match select::select(&tree, self.range) {
            Ok(statement) => statement,
            Err(e) => return Err(self.fail(e.into())),
        };
        // `select` only returns applicable statements
        let Some(parts) = StatementParts::of(&tree, statement) else {
            let range = self.range;
            return Err(self.fail(select::SelectionError::NoApplicableStatement { range }.into()));
        };
        let statement_range = tree.range(statement);
        debug!(statement = %statement_range, "selected declaration");

        self.advance(State::Resolving);
        let resolved = match scope::resolve(&tree, statement) {
            Ok(resolved) => resolved,
            Err(e) => return Err(self.fail(e.into())),
        };
        debug!(
            captured = resolved.captured.len(),
            ambiguous = resolved.ambiguous.len(),
            "resolved scope"
        );

        self.advance(State::Synthesizing);
        let unit = match synth::synthesize(
            UnitHeader::from_tree(&tree),
            &resolved.captured,
            &JavaType::declared(&tree, parts.ty, parts.dimensions),
            InitializerExpression::from_statement(&tree, &parts),
            parts.declared_name(&tree),
            &self.config.synthesis_options(),
        ) {
            Ok(unit) => unit,
            Err(e) => return Err(self.fail(e.into())),
        };
        let rendered = printer::print(&unit, self.config.indent);
        let target = writer::target_path(&self.path, &unit.name, parser.extension());

        self.advance(State::Done);
        info!(unit = %unit.name, target = %target.display(), "synthesized");

        Ok(Extraction {
            path: self.path.clone(),
            range: self.range,
            statement_range,
            unit,
            rendered,
            target,
            captured: resolved.captured,
            ambiguous: resolved.ambiguous,
        })
    }
}

/// Read `path` and extract the declaration at `range`
pub fn execute(
    path: &Path,
    range: SourceRange,
    config: &ResolvedConfig,
) -> Result<Extraction, RefactorError> {
    Refactoring::new(path, range, config).run()
}

/// Extract from in-memory source; `path` names the file for errors and output
pub fn execute_source(
    path: &Path,
    source: &str,
    range: SourceRange,
    config: &ResolvedConfig,
) -> Result<Extraction, RefactorError> {
    Refactoring::new(path, range, config).run_source(source)
}

/// Hand a finished extraction to the writer
pub fn write(extraction: &Extraction, strict: bool) -> Result<(), RefactorError> {
    writer::write_unit(&extraction.target, &extraction.rendered, strict).map_err(|e| {
        RefactorError {
            path: extraction.path.clone(),
            range: extraction.range,
            stage: Stage::Writing,
            cause: e.into(),
        }
    })
}

/// Extract and write the generated unit next to the source file
pub fn execute_and_write(
    path: &Path,
    range: SourceRange,
    config: &ResolvedConfig,
) -> Result<Extraction, RefactorError> {
    let extraction = execute(path, range, config)?;
    write(&extraction, config.strict)?;
    Ok(extraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SOURCE: &str = r#"package com.example;

class Calc {
    int x;

    int run() {
        int a = 1;
        int b = compute(a, x);
        return b;
    }
}
"#;

    fn range(text: &str) -> SourceRange {
        text.parse().unwrap()
    }

    #[test]
    fn test_successful_run_visits_every_state() {
        let config = ResolvedConfig::defaults();
        let mut refactoring = Refactoring::new(Path::new("src/Calc.java"), range("8:9-8:30"), &config);
        let extraction = refactoring.run_source(SOURCE).unwrap();

        assert_eq!(refactoring.state(), State::Done);
        assert_eq!(
            refactoring.visited(),
            &[
                State::Idle,
                State::Parsing,
                State::Selecting,
                State::Resolving,
                State::Synthesizing,
                State::Done
            ]
        );
        assert_eq!(extraction.unit.name, "B");
        assert_eq!(extraction.target, PathBuf::from("src/B.java"));
        assert_eq!(extraction.statement_range, range("8:9-8:30"));
        assert!(extraction.rendered.contains("public class B implements Function<int, int, int>"));
    }

    #[test]
    fn test_selection_failure_stops_pipeline() {
        let config = ResolvedConfig::defaults();
        let mut refactoring = Refactoring::new(Path::new("Calc.java"), range("7:15-8:15"), &config);
        let error = refactoring.run_source(SOURCE).unwrap_err();

        assert_eq!(refactoring.state(), State::Failed(ErrorKind::Selection));
        assert!(!refactoring.visited().contains(&State::Resolving));
        assert_eq!(error.stage, Stage::Selecting);
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn test_parse_failure() {
        let config = ResolvedConfig::defaults();
        let error = execute_source(
            Path::new("Broken.java"),
            "class Broken { void m() { int a = ; } }",
            range("1:1-1:1"),
            &config,
        )
        .unwrap_err();
        assert_eq!(error.stage, Stage::Parsing);
        assert_eq!(error.kind(), ErrorKind::Parse);
        assert_eq!(error.exit_code(), 5);
    }

    #[test]
    fn test_unsupported_extension() {
        let config = ResolvedConfig::defaults();
        let error = execute_source(Path::new("calc.kt"), "val x = 1", range("1:1-1:1"), &config)
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Unsupported);
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let config = ResolvedConfig::defaults();
        let dir = tempfile::tempdir().unwrap();
        let error = execute(&dir.path().join("Nope.java"), range("1:1-1:1"), &config).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Io);
        assert_eq!(error.stage, Stage::Parsing);
        assert_eq!(error.exit_code(), 4);
    }

    #[test]
    fn test_execute_and_write() {
        let config = ResolvedConfig::defaults();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Calc.java");
        fs::write(&path, SOURCE).unwrap();

        let extraction = execute_and_write(&path, range("8:13-8:13"), &config).unwrap();
        let written = fs::read_to_string(dir.path().join("B.java")).unwrap();
        assert_eq!(written, extraction.rendered);
        assert!(written.starts_with("package com.example;\n"));
    }

    #[test]
    fn test_strict_write_refuses_existing_target() {
        let config = ResolvedConfig {
            strict: true,
            ..ResolvedConfig::defaults()
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Calc.java");
        fs::write(&path, SOURCE).unwrap();
        fs::write(dir.path().join("B.java"), "// keep").unwrap();

        let error = execute_and_write(&path, range("8:13-8:13"), &config).unwrap_err();
        assert_eq!(error.stage, Stage::Writing);
        assert_eq!(error.exit_code(), 4);
        assert_eq!(fs::read_to_string(dir.path().join("B.java")).unwrap(), "// keep");
    }
}
