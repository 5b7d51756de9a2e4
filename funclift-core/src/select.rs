//! Node selection: map a user range onto one extractable declaration
//!
//! Selection first descends while exactly one child wraps the range, then
//! climbs until it reaches a local variable declaration with a single
//! declarator and an initializer.

use crate::range::SourceRange;
use crate::syntax::{NodeId, NodeKind, SyntaxTree};
use thiserror::Error;
use tracing::debug;

/// Why a range could not be mapped onto an applicable statement
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// No node wraps the range (it lies outside the document)
    #[error("range {range} is not inside the document")]
    AmbiguousRange { range: SourceRange },

    /// The range crosses a statement boundary
    #[error("range {range} spans more than one statement")]
    OverlappingRange { range: SourceRange },

    /// Nothing at or above the range declares exactly one initialized local
    #[error("no single initialized local variable declaration encloses {range}")]
    NoApplicableStatement { range: SourceRange },
}

/// Select the applicable statement for `range`
pub fn select(tree: &SyntaxTree, range: SourceRange) -> Result<NodeId, SelectionError> {
    let tightest = tightest_wrapping(tree, range)?;
    debug!(
        node = tree.node(tightest).grammar_kind,
        at = %tree.range(tightest),
        "tightest node wrapping {}",
        range
    );

    let crossed = tree
        .children(tightest)
        .iter()
        .filter(|child| tree.kind(**child).is_statement())
        .filter(|child| tree.range(**child).overlaps(&range))
        .count();
    if crossed > 1 {
        return Err(SelectionError::OverlappingRange { range });
    }

    std::iter::once(tightest)
        .chain(tree.ancestors(tightest))
        .find(|id| is_applicable(tree, *id))
        .ok_or(SelectionError::NoApplicableStatement { range })
}

/// Descend from the root while exactly one child wraps the range
fn tightest_wrapping(tree: &SyntaxTree, range: SourceRange) -> Result<NodeId, SelectionError> {
    let root = tree.root();
    if !range.wrapped_by(&tree.range(root)) {
        return Err(SelectionError::AmbiguousRange { range });
    }

    let mut current = root;
    loop {
        let mut wrapping = tree
            .children(current)
            .iter()
            .copied()
            .filter(|child| range.wrapped_by(&tree.range(*child)));
        match (wrapping.next(), wrapping.next()) {
            (None, _) => return Ok(current),
            (Some(only), None) => current = only,
            (Some(_), Some(_)) => return Err(SelectionError::OverlappingRange { range }),
        }
    }
}

/// A local variable declaration with one declarator and an initializer
pub fn is_applicable(tree: &SyntaxTree, id: NodeId) -> bool {
    StatementParts::of(tree, id).is_some()
}

/// The pieces of an applicable statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementParts {
    pub statement: NodeId,
    pub declarator: NodeId,
    /// Identifier being declared
    pub name: NodeId,
    /// Declared type, before any declarator dimensions
    pub ty: NodeId,
    /// `[]` suffix written after the name (`int a[] = ...`)
    pub dimensions: Option<NodeId>,
    pub initializer: NodeId,
}

impl StatementParts {
    /// Split `statement` into its parts, or `None` when it is not applicable
    pub fn of(tree: &SyntaxTree, statement: NodeId) -> Option<Self> {
        if tree.kind(statement) != NodeKind::LocalVariableDeclaration {
            return None;
        }

        let mut declarators = tree.children_of_kind(statement, NodeKind::VariableDeclarator);
        let declarator = declarators.next()?;
        if declarators.next().is_some() {
            return None;
        }

        Some(StatementParts {
            statement,
            declarator,
            name: tree.child_by_field(declarator, "name")?,
            ty: tree.child_by_field(statement, "type")?,
            dimensions: tree.child_by_field(declarator, "dimensions"),
            initializer: tree.child_by_field(declarator, "value")?,
        })
    }

    pub fn declared_name<'t>(&self, tree: &'t SyntaxTree) -> &'t str {
        tree.text(self.name)
    }
}
