//! Lexical scope analysis for an extracted statement
//!
//! The resolver finds the method enclosing the statement, folds every
//! declaration visible in that method into an immutable [`DeclarationTable`],
//! then classifies each identifier referenced by the initializer. Names bound
//! inside the statement (lambda parameters, nested locals and so on) are never
//! captured; every other name with a known declared type becomes a
//! [`CapturedVariable`].

use crate::range::SourceRange;
use crate::select::StatementParts;
use crate::syntax::{NodeId, NodeKind, StatementKind, SyntaxTree, TypeDeclarationKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

const PRIMITIVES: &[(&str, &str)] = &[
    ("boolean", "Boolean"),
    ("byte", "Byte"),
    ("char", "Character"),
    ("short", "Short"),
    ("int", "Integer"),
    ("long", "Long"),
    ("float", "Float"),
    ("double", "Double"),
];

/// A type as written in source, with whitespace normalized
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JavaType(String);

impl JavaType {
    pub fn new(text: &str) -> Self {
        JavaType(normalize_type(text))
    }

    /// Type of a declaration: the written type plus any `[]` after the name
    pub fn declared(tree: &SyntaxTree, ty: NodeId, dimensions: Option<NodeId>) -> Self {
        match dimensions {
            Some(dims) => JavaType::new(&format!("{}{}", tree.text(ty), tree.text(dims))),
            None => JavaType::new(tree.text(ty)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `var` declarations carry no written type
    pub fn is_inferred(&self) -> bool {
        self.0 == "var"
    }

    pub fn is_primitive(&self) -> bool {
        PRIMITIVES.iter().any(|(name, _)| *name == self.0)
    }

    /// Wrapper class for primitives; every other type is returned unchanged
    pub fn boxed(&self) -> JavaType {
        PRIMITIVES
            .iter()
            .find(|(name, _)| *name == self.0)
            .map(|(_, wrapper)| JavaType((*wrapper).to_string()))
            .unwrap_or_else(|| self.clone())
    }

    fn array_of(&self) -> JavaType {
        JavaType(format!("{}[]", self.0))
    }
}

impl fmt::Display for JavaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Collapse whitespace, keeping a single space only between two words and
/// after commas
fn normalize_type(text: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_' || c == '$' || c == '?';
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && out.chars().next_back().is_some_and(is_word) && is_word(c) {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
        if c == ',' {
            out.push(' ');
        }
    }
    out
}

/// Where a declaration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationOrigin {
    Field,
    Parameter,
    Local,
}

/// One named, typed declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub ty: JavaType,
    pub origin: DeclarationOrigin,
    pub range: SourceRange,
}

/// Names in scope of one method, built once per request and never mutated
///
/// Later declarations of a name replace earlier ones. A local declared twice
/// with different types is kept last-write-wins but marked ambiguous.
#[derive(Debug, Clone, Default)]
pub struct DeclarationTable {
    entries: HashMap<String, Declaration>,
    ambiguous: BTreeSet<String>,
}

impl DeclarationTable {
    pub fn from_declarations(declarations: impl IntoIterator<Item = Declaration>) -> Self {
        declarations
            .into_iter()
            .fold(DeclarationTable::default(), DeclarationTable::with)
    }

    fn with(mut self, declaration: Declaration) -> Self {
        if declaration.origin == DeclarationOrigin::Local {
            let clashes = self.entries.get(&declaration.name).is_some_and(|previous| {
                previous.origin == DeclarationOrigin::Local && previous.ty != declaration.ty
            });
            if clashes {
                self.ambiguous.insert(declaration.name.clone());
            }
        }
        self.entries.insert(declaration.name.clone(), declaration);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Declaration> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_ambiguous(&self, name: &str) -> bool {
        self.ambiguous.contains(name)
    }

    /// Names declared more than once with different types, sorted
    pub fn ambiguous(&self) -> impl Iterator<Item = &str> {
        self.ambiguous.iter().map(String::as_str)
    }
}

/// A free variable of the statement, becoming a parameter of the new unit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CapturedVariable {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: JavaType,
}

impl fmt::Display for CapturedVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.ty)
    }
}

/// Result of resolving one statement
#[derive(Debug, Clone)]
pub struct ResolvedScope {
    /// Method or constructor enclosing the statement
    pub method: NodeId,
    /// Type body directly containing the method
    pub enclosing_type: NodeId,
    pub table: DeclarationTable,
    /// Free variables in order of first reference
    pub captured: Vec<CapturedVariable>,
    /// Captured names whose declared type is ambiguous
    pub ambiguous: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    #[error("statement at {statement} is not inside a method or constructor")]
    NoEnclosingMethod { statement: SourceRange },

    #[error("method at {method} is not declared inside a type")]
    NoEnclosingType { method: SourceRange },
}

/// Resolve the scope of an applicable statement
pub fn resolve(tree: &SyntaxTree, statement: NodeId) -> Result<ResolvedScope, ScopeError> {
    let method = enclosing_method(tree, statement)?;
    let enclosing_type = tree
        .parent(method)
        .filter(|parent| tree.kind(*parent) == NodeKind::TypeBody)
        .ok_or(ScopeError::NoEnclosingType {
            method: tree.range(method),
        })?;

    let declarations = field_declarations(tree, enclosing_type)
        .into_iter()
        .chain(parameter_declarations(tree, method))
        .chain(local_declarations(tree, method));
    let table = DeclarationTable::from_declarations(declarations);
    debug!(
        declarations = table.len(),
        method = %tree.range(method),
        "built declaration table"
    );

    let captured = capture(tree, statement, &table);
    let ambiguous: Vec<String> = captured
        .iter()
        .filter(|variable| table.is_ambiguous(&variable.name))
        .map(|variable| variable.name.clone())
        .collect();
    for name in &ambiguous {
        warn!(
            name = name.as_str(),
            "`{name}` is declared more than once with different types; using the last declaration"
        );
    }

    Ok(ResolvedScope {
        method,
        enclosing_type,
        table,
        captured,
        ambiguous,
    })
}

/// Nearest method or constructor above `statement`
///
/// The walk stops at the first type body: initializer blocks and field
/// initializers have no enclosing method even when a method is further out.
fn enclosing_method(tree: &SyntaxTree, statement: NodeId) -> Result<NodeId, ScopeError> {
    for ancestor in tree.ancestors(statement) {
        let kind = tree.kind(ancestor);
        if kind.is_method_like() {
            return Ok(ancestor);
        }
        if kind == NodeKind::TypeBody {
            break;
        }
    }
    Err(ScopeError::NoEnclosingMethod {
        statement: tree.range(statement),
    })
}

fn declaration(
    tree: &SyntaxTree,
    name: NodeId,
    ty: JavaType,
    origin: DeclarationOrigin,
) -> Declaration {
    Declaration {
        name: tree.text(name).to_string(),
        ty,
        origin,
        range: tree.range(name),
    }
}

/// Declarators of a field or local declaration, each with its own dimensions
fn declarator_declarations(
    tree: &SyntaxTree,
    node: NodeId,
    origin: DeclarationOrigin,
) -> Vec<Declaration> {
    let Some(ty) = tree.child_by_field(node, "type") else {
        return Vec::new();
    };
    tree.children_of_kind(node, NodeKind::VariableDeclarator)
        .filter_map(|declarator| {
            let name = tree.child_by_field(declarator, "name")?;
            let dims = tree.child_by_field(declarator, "dimensions");
            Some(declaration(tree, name, JavaType::declared(tree, ty, dims), origin))
        })
        .collect()
}

/// Name and type of a `formal_parameter` or `spread_parameter`
fn formal_parameter(tree: &SyntaxTree, parameter: NodeId) -> Option<(NodeId, JavaType)> {
    if let Some(name) = tree.child_by_field(parameter, "name") {
        let ty = tree.child_by_field(parameter, "type")?;
        let dims = tree.child_by_field(parameter, "dimensions");
        return Some((name, JavaType::declared(tree, ty, dims)));
    }

    // Varargs: `String... rest` is a `String[]` inside the method
    let ty = tree.children_of_kind(parameter, NodeKind::Type).next()?;
    let declarator = tree
        .children_of_kind(parameter, NodeKind::VariableDeclarator)
        .next()?;
    let name = tree.child_by_field(declarator, "name")?;
    let dims = tree.child_by_field(declarator, "dimensions");
    Some((name, JavaType::declared(tree, ty, dims).array_of()))
}

fn formal_parameters(tree: &SyntaxTree, list: NodeId) -> impl Iterator<Item = (NodeId, JavaType)> + '_ {
    tree.children_of_kind(list, NodeKind::FormalParameter)
        .filter_map(move |parameter| formal_parameter(tree, parameter))
}

fn field_declarations(tree: &SyntaxTree, body: NodeId) -> Vec<Declaration> {
    let mut fields = Vec::new();

    // Record components are the record's fields
    if let Some(owner) = tree.parent(body) {
        if tree.kind(owner) == NodeKind::TypeDeclaration(TypeDeclarationKind::Record) {
            if let Some(components) = tree.child_by_field(owner, "parameters") {
                fields.extend(formal_parameters(tree, components).map(|(name, ty)| {
                    declaration(tree, name, ty, DeclarationOrigin::Field)
                }));
            }
        }
    }

    // Enum constants, when the method sits after them in the enum body
    if tree.node(body).grammar_kind == "enum_body_declarations" {
        let enum_type = tree
            .parent(body)
            .and_then(|enum_body| tree.parent(enum_body))
            .and_then(|declaration| tree.child_by_field(declaration, "name"))
            .map(|name| JavaType::new(tree.text(name)));
        if let (Some(enum_body), Some(enum_type)) = (tree.parent(body), enum_type) {
            for constant in tree.children(enum_body) {
                if tree.node(*constant).grammar_kind != "enum_constant" {
                    continue;
                }
                if let Some(name) = tree.child_by_field(*constant, "name") {
                    fields.push(declaration(
                        tree,
                        name,
                        enum_type.clone(),
                        DeclarationOrigin::Field,
                    ));
                }
            }
        }
    }

    for member in tree.children_of_kind(body, NodeKind::FieldDeclaration) {
        fields.extend(declarator_declarations(tree, member, DeclarationOrigin::Field));
    }
    fields
}

fn parameter_declarations(tree: &SyntaxTree, method: NodeId) -> Vec<Declaration> {
    tree.child_by_field(method, "parameters")
        .map(|list| {
            formal_parameters(tree, list)
                .map(|(name, ty)| declaration(tree, name, ty, DeclarationOrigin::Parameter))
                .collect()
        })
        .unwrap_or_default()
}

/// Every local-like declaration anywhere in the method body, in document order
fn local_declarations(tree: &SyntaxTree, method: NodeId) -> Vec<Declaration> {
    let Some(body) = tree.child_by_field(method, "body") else {
        return Vec::new();
    };

    let mut locals = Vec::new();
    for id in tree.descendants(body) {
        match tree.kind(id) {
            NodeKind::LocalVariableDeclaration => {
                locals.extend(declarator_declarations(tree, id, DeclarationOrigin::Local));
            }
            NodeKind::Statement(StatementKind::EnhancedFor) | NodeKind::Resource => {
                if let (Some(ty), Some(name)) = (
                    tree.child_by_field(id, "type"),
                    tree.child_by_field(id, "name"),
                ) {
                    let dims = tree.child_by_field(id, "dimensions");
                    let ty = JavaType::declared(tree, ty, dims);
                    locals.push(declaration(tree, name, ty, DeclarationOrigin::Local));
                }
            }
            NodeKind::CatchParameter => {
                let catch_type = tree
                    .children(id)
                    .iter()
                    .copied()
                    .find(|child| tree.node(*child).grammar_kind == "catch_type");
                if let (Some(ty), Some(name)) = (catch_type, tree.child_by_field(id, "name")) {
                    let ty = JavaType::new(tree.text(ty));
                    locals.push(declaration(tree, name, ty, DeclarationOrigin::Local));
                }
            }
            _ => {}
        }
    }
    locals
}

/// Free variables of the statement's initializer, first reference first
fn capture(tree: &SyntaxTree, statement: NodeId, table: &DeclarationTable) -> Vec<CapturedVariable> {
    let Some(parts) = StatementParts::of(tree, statement) else {
        return Vec::new();
    };

    let mut captured: Vec<CapturedVariable> = Vec::new();
    for reference in tree.descendants(parts.initializer) {
        if !is_reference(tree, reference) {
            continue;
        }
        let name = tree.text(reference);
        if bound_within(tree, reference, statement) {
            debug!(name, at = %tree.range(reference), "bound inside the statement");
            continue;
        }
        let Some(declaration) = table.get(name) else {
            continue;
        };
        if captured.iter().any(|variable| variable.name == name) {
            continue;
        }
        debug!(name, ty = %declaration.ty, "captured");
        captured.push(CapturedVariable {
            name: name.to_string(),
            ty: declaration.ty.clone(),
        });
    }
    captured
}

/// True for identifiers that name a variable rather than a member, label,
/// declaration or annotation element
fn is_reference(tree: &SyntaxTree, id: NodeId) -> bool {
    if tree.kind(id) != NodeKind::Identifier {
        return false;
    }
    let Some(parent) = tree.parent(id) else {
        return false;
    };

    let field = tree.node(id).field;
    if matches!(field, Some("name") | Some("key") | Some("field")) {
        return false;
    }

    match tree.kind(parent) {
        // `x -> w`: the parameter is a declaration, the body a reference
        NodeKind::Lambda => field == Some("body"),
        NodeKind::InferredParameters => false,
        NodeKind::Statement(StatementKind::Jump | StatementKind::Labeled) => false,
        // `Type::method` and `expr::method`: only a leading expression can be a variable
        NodeKind::MethodReference => tree.children(parent).first() == Some(&id),
        NodeKind::Other(grammar) => !matches!(
            grammar,
            "scoped_identifier"
                | "type_pattern"
                | "record_pattern_component"
                | "switch_label"
                | "marker_annotation"
                | "annotation"
                | "module_declaration"
        ),
        _ => true,
    }
}

/// Whether a construct between `reference` and `statement` declares the
/// referenced name
///
/// The walk never looks at or above `statement` itself.
fn bound_within(tree: &SyntaxTree, reference: NodeId, statement: NodeId) -> bool {
    let name = tree.text(reference);
    let at = tree.node(reference).span.start;

    let introduced_by_pattern = pattern_variables(tree, statement)
        .any(|id| tree.text(id) == name && tree.node(id).span.start < at);
    if introduced_by_pattern {
        return true;
    }

    let mut child = reference;
    for ancestor in tree.ancestors(reference) {
        if ancestor == statement {
            return false;
        }
        if binds(tree, ancestor, child, name, at) {
            return true;
        }
        child = ancestor;
    }
    false
}

/// Does `scope` bind `name` for a reference at byte `at`, reached through `via`?
fn binds(tree: &SyntaxTree, scope: NodeId, via: NodeId, name: &str, at: usize) -> bool {
    let named = |id: NodeId| tree.text(id) == name;
    let declared_before = |id: NodeId| named(id) && tree.node(id).span.start < at;
    let entered_by = |field: &str| tree.node(via).field == Some(field);

    match tree.kind(scope) {
        NodeKind::Lambda => lambda_parameters(tree, scope).any(named),
        NodeKind::Block => tree.children(scope).iter().any(|statement| {
            tree.kind(*statement) == NodeKind::LocalVariableDeclaration
                && declarator_names(tree, *statement).any(declared_before)
        }),
        NodeKind::Statement(StatementKind::For) => tree
            .children_by_field(scope, "init")
            .filter(|init| tree.kind(*init) == NodeKind::LocalVariableDeclaration)
            .any(|init| declarator_names(tree, init).any(named)),
        NodeKind::Statement(StatementKind::EnhancedFor) => {
            entered_by("body") && tree.child_by_field(scope, "name").is_some_and(named)
        }
        NodeKind::CatchClause => {
            entered_by("body")
                && tree
                    .children_of_kind(scope, NodeKind::CatchParameter)
                    .filter_map(|parameter| tree.child_by_field(parameter, "name"))
                    .any(named)
        }
        NodeKind::Statement(StatementKind::TryWithResources) => tree
            .descendants(scope)
            .filter(|id| tree.kind(*id) == NodeKind::Resource)
            .filter_map(|resource| tree.child_by_field(resource, "name"))
            .any(declared_before),
        NodeKind::MethodDeclaration | NodeKind::ConstructorDeclaration => tree
            .child_by_field(scope, "parameters")
            .is_some_and(|list| formal_parameters(tree, list).any(|(id, _)| named(id))),
        // Anonymous class bodies inside the statement
        NodeKind::TypeBody => tree
            .children_of_kind(scope, NodeKind::FieldDeclaration)
            .any(|field| declarator_names(tree, field).any(named)),
        _ => false,
    }
}

fn declarator_names(tree: &SyntaxTree, declaration: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    tree.children_of_kind(declaration, NodeKind::VariableDeclarator)
        .filter_map(move |declarator| tree.child_by_field(declarator, "name"))
}

/// Names introduced by `instanceof` patterns, type patterns and record
/// pattern components under `scope`
fn pattern_variables(tree: &SyntaxTree, scope: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    tree.descendants(scope).filter(move |id| {
        tree.kind(*id) == NodeKind::Identifier
            && tree.parent(*id).is_some_and(|parent| match tree.kind(parent) {
                NodeKind::Other("instanceof_expression") => tree.node(*id).field == Some("name"),
                NodeKind::Other("type_pattern" | "record_pattern_component") => true,
                _ => false,
            })
    })
}

/// Parameter name nodes of a lambda, in any of its three spellings
fn lambda_parameters(tree: &SyntaxTree, lambda: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    let names: Vec<NodeId> = match tree.child_by_field(lambda, "parameters") {
        Some(params) => match tree.kind(params) {
            NodeKind::Identifier => vec![params],
            NodeKind::InferredParameters => tree
                .children_of_kind(params, NodeKind::Identifier)
                .collect(),
            NodeKind::FormalParameters => formal_parameters(tree, params)
                .map(|(name, _)| name)
                .collect(),
            _ => Vec::new(),
        },
        None => Vec::new(),
    };
    names.into_iter()
}
