//! Arena-backed syntax tree
//!
//! Global invariants enforced:
//! - Node ids are indices into one arena, assigned in document preorder
//! - Parent links are optional indices, never live references
//! - The tree is immutable once built; analysis only reads it

use crate::language::span::SourceSpan;
use crate::range::SourceRange;

/// Index of a node inside a [`SyntaxTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Flavours of type declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeDeclarationKind {
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
}

/// Statements that are not blocks or local variable declarations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Expression,
    If,
    While,
    Do,
    For,
    EnhancedFor,
    Return,
    Throw,
    /// `break` / `continue`, optionally carrying a label
    Jump,
    Labeled,
    Yield,
    Try,
    TryWithResources,
    Synchronized,
    Assert,
    /// `this(...)` / `super(...)` at the top of a constructor
    ConstructorCall,
}

/// Closed set of node kinds the refactoring cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    CompilationUnit,
    PackageDeclaration,
    ImportDeclaration,
    TypeDeclaration(TypeDeclarationKind),
    /// Member list of a class, interface, enum, record or anonymous class
    TypeBody,
    FieldDeclaration,
    MethodDeclaration,
    ConstructorDeclaration,
    /// `static { ... }`
    StaticInitializer,
    FormalParameters,
    FormalParameter,
    Block,
    LocalVariableDeclaration,
    VariableDeclarator,
    CatchClause,
    CatchParameter,
    Resource,
    Statement(StatementKind),
    Lambda,
    InferredParameters,
    Identifier,
    MethodInvocation,
    FieldAccess,
    MethodReference,
    Type,
    /// Anything else, tagged with its grammar name
    Other(&'static str),
}

impl NodeKind {
    /// True for every statement form, including blocks and declarations
    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            NodeKind::Block | NodeKind::LocalVariableDeclaration | NodeKind::Statement(_)
        )
    }

    /// Methods and constructors
    pub fn is_method_like(&self) -> bool {
        matches!(
            self,
            NodeKind::MethodDeclaration | NodeKind::ConstructorDeclaration
        )
    }
}

/// One node of the arena
#[derive(Debug, Clone)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    /// Grammar name of the node, kept for diagnostics
    pub grammar_kind: &'static str,
    /// Grammar field this node occupies in its parent (e.g. `name`, `value`)
    pub field: Option<&'static str>,
    pub span: SourceSpan,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl SyntaxNode {
    pub fn range(&self) -> SourceRange {
        self.span.range
    }
}

/// A parsed file: its source text plus the node arena
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    source: String,
    nodes: Vec<SyntaxNode>,
}

impl SyntaxTree {
    /// Start an empty tree over `source`; nodes are added with [`SyntaxTree::push`]
    pub(crate) fn with_source(source: String) -> Self {
        SyntaxTree {
            source,
            nodes: Vec::new(),
        }
    }

    /// Append a node and link it under `parent`
    ///
    /// Callers add nodes in preorder so sibling order follows the document.
    pub(crate) fn push(
        &mut self,
        kind: NodeKind,
        grammar_kind: &'static str,
        field: Option<&'static str>,
        span: SourceSpan,
        parent: Option<NodeId>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(SyntaxNode {
            kind,
            grammar_kind,
            field,
            span,
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent.index()].children.push(id);
        }
        id
    }

    /// The root node. Trees always hold at least the root.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn range(&self, id: NodeId) -> SourceRange {
        self.node(id).range()
    }

    /// Source text covered by a node
    pub fn text(&self, id: NodeId) -> &str {
        let span = self.node(id).span;
        self.source.get(span.start..span.end).unwrap_or_default()
    }

    /// First child stored under a grammar field
    pub fn child_by_field(&self, id: NodeId, field: &str) -> Option<NodeId> {
        self.children_by_field(id, field).next()
    }

    /// All children stored under a grammar field, in order
    pub fn children_by_field<'a>(
        &'a self,
        id: NodeId,
        field: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.children(id)
            .iter()
            .copied()
            .filter(move |child| self.node(*child).field == Some(field))
    }

    /// Children of a given kind, in order
    pub fn children_of_kind(&self, id: NodeId, kind: NodeKind) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |child| self.kind(*child) == kind)
    }

    /// Strict ancestors of a node, nearest first
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// The node and all of its descendants, in document preorder
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        // Preorder ids make every subtree a contiguous id range.
        let end = self.subtree_end(id);
        (id.0..end).map(NodeId)
    }

    fn subtree_end(&self, id: NodeId) -> u32 {
        let mut current = id;
        while let Some(&last) = self.children(current).last() {
            current = last;
        }
        current.0 + 1
    }
}

/// Iterator over parent links
pub struct Ancestors<'a> {
    tree: &'a SyntaxTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}
