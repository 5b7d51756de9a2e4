//! Line/column selection ranges
//!
//! Positions are 1-based and ranges are inclusive at both ends, matching what
//! editors report for a selection.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// A 1-based (line, column) position. Ordered by line, then column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Position { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Errors raised while building a [`SourceRange`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("line and column numbers are 1-based (got {0})")]
    ZeroPosition(Position),
    #[error("range begins at {begin} after it ends at {end}")]
    Inverted { begin: Position, end: Position },
    #[error("malformed range `{0}` (expected LINE:COL-LINE:COL)")]
    Malformed(String),
}

/// Inclusive selection range. Invariant: `begin <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SourceRange {
    begin: Position,
    end: Position,
}

impl SourceRange {
    /// Build a range, rejecting zero positions and inverted bounds
    pub fn new(begin: Position, end: Position) -> Result<Self, RangeError> {
        for position in [begin, end] {
            if position.line == 0 || position.column == 0 {
                return Err(RangeError::ZeroPosition(position));
            }
        }
        if begin > end {
            return Err(RangeError::Inverted { begin, end });
        }
        Ok(SourceRange { begin, end })
    }

    /// Range between positions derived from parsed source, which are always
    /// 1-based. An inverted pair collapses to `begin`.
    pub(crate) fn spanning(begin: Position, end: Position) -> Self {
        SourceRange {
            begin,
            end: end.max(begin),
        }
    }

    /// Convenience constructor from raw numbers
    pub fn from_coords(
        begin_line: u32,
        begin_column: u32,
        end_line: u32,
        end_column: u32,
    ) -> Result<Self, RangeError> {
        Self::new(
            Position::new(begin_line, begin_column),
            Position::new(end_line, end_column),
        )
    }

    /// Range covering a single character position
    pub fn caret(position: Position) -> Result<Self, RangeError> {
        Self::new(position, position)
    }

    pub fn begin(&self) -> Position {
        self.begin
    }

    pub fn end(&self) -> Position {
        self.end
    }

    /// True when `outer` fully contains this range
    pub fn wrapped_by(&self, outer: &SourceRange) -> bool {
        outer.begin <= self.begin && outer.end >= self.end
    }

    /// True when the two ranges share at least one position
    pub fn overlaps(&self, other: &SourceRange) -> bool {
        self.begin <= other.end && other.begin <= self.end
    }
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.begin, self.end)
    }
}

fn range_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(\d+):(\d+)(?:\s*-\s*(\d+):(\d+))?\s*$").expect("valid range regex")
    })
}

impl FromStr for SourceRange {
    type Err = RangeError;

    /// Parse `L:C-L:C`, or `L:C` for a caret
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let captures = range_pattern()
            .captures(s)
            .ok_or_else(|| RangeError::Malformed(s.to_string()))?;

        let number = |index: usize| -> Result<Option<u32>, RangeError> {
            captures
                .get(index)
                .map(|m| {
                    m.as_str()
                        .parse::<u32>()
                        .map_err(|_| RangeError::Malformed(s.to_string()))
                })
                .transpose()
        };

        let begin = Position::new(
            number(1)?.unwrap_or_default(),
            number(2)?.unwrap_or_default(),
        );
        let end = match (number(3)?, number(4)?) {
            (Some(line), Some(column)) => Position::new(line, column),
            _ => begin,
        };
        SourceRange::new(begin, end)
    }
}

impl TryFrom<String> for SourceRange {
    type Error = RangeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SourceRange> for String {
    fn from(range: SourceRange) -> Self {
        range.to_string()
    }
}
