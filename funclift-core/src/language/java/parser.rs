//! Java language parser using tree-sitter

use crate::language::parser::{ParseError, SourceParser};
use crate::language::span::LineIndex;
use crate::language::tree_sitter_utils::{first_error, named_children_with_fields};
use crate::syntax::{NodeId, NodeKind, StatementKind, SyntaxTree, TypeDeclarationKind};
use tree_sitter::{Node, Parser, Tree};

/// Java parser using tree-sitter
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaParser;

impl SourceParser for JavaParser {
    fn parse(&self, source: &str, filename: &str) -> Result<SyntaxTree, ParseError> {
        // tree-sitter parsers need `&mut`, so one is built per call
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_java::LANGUAGE.into())
            .map_err(|e| ParseError::new(filename, None, format!("failed to load Java grammar: {e}")))?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| ParseError::new(filename, None, "parser produced no tree"))?;

        let index = LineIndex::new(source);

        // tree-sitter recovers from errors; a recovered tree is not safe to rewrite
        if let Some(broken) = first_error(tree.root_node()) {
            let position = index.position(source, broken.start_byte());
            let message = if broken.is_missing() {
                format!("missing `{}` at {}", broken.kind(), position)
            } else {
                let snippet: String = source
                    .get(broken.start_byte()..broken.end_byte())
                    .unwrap_or_default()
                    .chars()
                    .take(40)
                    .collect();
                format!("unexpected `{}` at {}", snippet.trim(), position)
            };
            return Err(ParseError::new(filename, Some(position), message));
        }

        Ok(build_arena(&tree, source, &index))
    }

    fn extension(&self) -> &'static str {
        "java"
    }
}

/// Copy the named nodes of a tree-sitter tree into a [`SyntaxTree`] arena
///
/// Nodes are visited with an explicit stack so deeply nested expressions cannot
/// overflow the call stack. Visiting order is preorder, which the arena relies on.
fn build_arena(tree: &Tree, source: &str, index: &LineIndex) -> SyntaxTree {
    let mut arena = SyntaxTree::with_source(source.to_string());
    let root = tree.root_node();

    // The root always covers the whole document, leading trivia included.
    let root_id = arena.push(
        NodeKind::CompilationUnit,
        root.kind(),
        None,
        index.span(source, 0, source.len()),
        None,
    );

    let mut pending: Vec<(Node<'_>, Option<&'static str>, NodeId)> = Vec::new();
    push_children(&mut pending, root, root_id);

    while let Some((node, field, parent)) = pending.pop() {
        let id = arena.push(
            classify(node.kind()),
            node.kind(),
            field,
            index.span(source, node.start_byte(), node.end_byte()),
            Some(parent),
        );
        push_children(&mut pending, node, id);
    }

    arena
}

fn push_children<'a>(
    pending: &mut Vec<(Node<'a>, Option<&'static str>, NodeId)>,
    node: Node<'a>,
    id: NodeId,
) {
    // Reversed so the first child is popped first
    for (child, field) in named_children_with_fields(node).into_iter().rev() {
        pending.push((child, field, id));
    }
}

/// Map a tree-sitter-java grammar name onto a [`NodeKind`]
fn classify(kind: &'static str) -> NodeKind {
    match kind {
        "program" => NodeKind::CompilationUnit,
        "package_declaration" => NodeKind::PackageDeclaration,
        "import_declaration" => NodeKind::ImportDeclaration,
        "class_declaration" => NodeKind::TypeDeclaration(TypeDeclarationKind::Class),
        "interface_declaration" => NodeKind::TypeDeclaration(TypeDeclarationKind::Interface),
        "enum_declaration" => NodeKind::TypeDeclaration(TypeDeclarationKind::Enum),
        "record_declaration" => NodeKind::TypeDeclaration(TypeDeclarationKind::Record),
        "annotation_type_declaration" => {
            NodeKind::TypeDeclaration(TypeDeclarationKind::Annotation)
        }
        "class_body" | "interface_body" | "enum_body" | "enum_body_declarations"
        | "annotation_type_body" => NodeKind::TypeBody,
        "field_declaration" | "constant_declaration" => NodeKind::FieldDeclaration,
        "method_declaration" => NodeKind::MethodDeclaration,
        "constructor_declaration" | "compact_constructor_declaration" => {
            NodeKind::ConstructorDeclaration
        }
        "static_initializer" => NodeKind::StaticInitializer,
        "formal_parameters" => NodeKind::FormalParameters,
        "formal_parameter" | "spread_parameter" => NodeKind::FormalParameter,
        "block" | "constructor_body" => NodeKind::Block,
        "local_variable_declaration" => NodeKind::LocalVariableDeclaration,
        "variable_declarator" => NodeKind::VariableDeclarator,
        "catch_clause" => NodeKind::CatchClause,
        "catch_formal_parameter" => NodeKind::CatchParameter,
        "resource" => NodeKind::Resource,
        "expression_statement" => NodeKind::Statement(StatementKind::Expression),
        "if_statement" => NodeKind::Statement(StatementKind::If),
        "while_statement" => NodeKind::Statement(StatementKind::While),
        "do_statement" => NodeKind::Statement(StatementKind::Do),
        "for_statement" => NodeKind::Statement(StatementKind::For),
        "enhanced_for_statement" => NodeKind::Statement(StatementKind::EnhancedFor),
        "return_statement" => NodeKind::Statement(StatementKind::Return),
        "throw_statement" => NodeKind::Statement(StatementKind::Throw),
        "break_statement" | "continue_statement" => NodeKind::Statement(StatementKind::Jump),
        "labeled_statement" => NodeKind::Statement(StatementKind::Labeled),
        "yield_statement" => NodeKind::Statement(StatementKind::Yield),
        "try_statement" => NodeKind::Statement(StatementKind::Try),
        "try_with_resources_statement" => NodeKind::Statement(StatementKind::TryWithResources),
        "synchronized_statement" => NodeKind::Statement(StatementKind::Synchronized),
        "assert_statement" => NodeKind::Statement(StatementKind::Assert),
        "explicit_constructor_invocation" => NodeKind::Statement(StatementKind::ConstructorCall),
        "lambda_expression" => NodeKind::Lambda,
        "inferred_parameters" => NodeKind::InferredParameters,
        "identifier" => NodeKind::Identifier,
        "method_invocation" => NodeKind::MethodInvocation,
        "field_access" => NodeKind::FieldAccess,
        "method_reference" => NodeKind::MethodReference,
        "void_type" | "integral_type" | "floating_point_type" | "boolean_type"
        | "type_identifier" | "scoped_type_identifier" | "generic_type" | "array_type"
        | "annotated_type" => NodeKind::Type,
        other => NodeKind::Other(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::Position;

    fn parse(source: &str) -> SyntaxTree {
        JavaParser.parse(source, "Test.java").unwrap()
    }

    fn find(tree: &SyntaxTree, kind: NodeKind) -> Vec<NodeId> {
        tree.descendants(tree.root())
            .filter(|id| tree.kind(*id) == kind)
            .collect()
    }

    #[test]
    fn test_extension() {
        assert_eq!(JavaParser.extension(), "java");
    }

    #[test]
    fn test_parse_simple_method() {
        let source = r#"
public class Simple {
    public int simpleMethod(int x) {
        int y = x + 1;
        return y;
    }
}
"#;
        let tree = parse(source);
        assert_eq!(tree.kind(tree.root()), NodeKind::CompilationUnit);
        assert_eq!(find(&tree, NodeKind::MethodDeclaration).len(), 1);

        let declarations = find(&tree, NodeKind::LocalVariableDeclaration);
        assert_eq!(declarations.len(), 1);
        assert_eq!(tree.text(declarations[0]), "int y = x + 1;");
        assert_eq!(tree.range(declarations[0]).begin(), Position::new(4, 9));
        assert_eq!(tree.range(declarations[0]).end(), Position::new(4, 22));
    }

    #[test]
    fn test_fields_are_recorded() {
        let tree = parse("class A { int x = 1; }");
        let declarator = find(&tree, NodeKind::VariableDeclarator)[0];
        let name = tree.child_by_field(declarator, "name").unwrap();
        let value = tree.child_by_field(declarator, "value").unwrap();
        assert_eq!(tree.text(name), "x");
        assert_eq!(tree.text(value), "1");
    }

    #[test]
    fn test_root_covers_whole_document() {
        let source = "\n\n// header\nclass A {}\n";
        let tree = parse(source);
        assert_eq!(tree.range(tree.root()).begin(), Position::new(1, 1));
        assert_eq!(tree.node(tree.root()).span.end, source.len());
    }

    #[test]
    fn test_parents_are_consistent() {
        let tree = parse("class A { void m() { Runnable r = () -> { int q = 2; }; } }");
        for id in tree.descendants(tree.root()).skip(1) {
            let parent = tree.parent(id).unwrap();
            assert!(tree.children(parent).contains(&id));
            assert!(parent < id, "preorder ids put parents first");
        }
    }

    #[test]
    fn test_lambda_and_statement_kinds() {
        let tree = parse(
            "class A { void m(java.util.List<String> xs) { for (String s : xs) { return; } xs.forEach(v -> {}); } }",
        );
        assert_eq!(find(&tree, NodeKind::Lambda).len(), 1);
        assert_eq!(
            find(&tree, NodeKind::Statement(StatementKind::EnhancedFor)).len(),
            1
        );
        assert_eq!(
            find(&tree, NodeKind::Statement(StatementKind::Return)).len(),
            1
        );
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let result = JavaParser.parse("class A { void m() { int a = ; } }", "Broken.java");
        let error = result.unwrap_err();
        assert_eq!(error.filename, "Broken.java");
        assert!(error.position.is_some());
    }

    #[test]
    fn test_missing_semicolon_is_reported() {
        let result = JavaParser.parse("class A { void m() { int a = 1 } }", "Broken.java");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_empty_file() {
        let tree = parse("");
        assert_eq!(tree.len(), 1);
        assert!(tree.children(tree.root()).is_empty());
    }
}
