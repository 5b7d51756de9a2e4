use tree_sitter::Node;

/// Named, non-extra children paired with the grammar field they occupy
///
/// Punctuation, comments and zero-width recovery nodes are skipped.
pub fn named_children_with_fields<'a>(node: Node<'a>) -> Vec<(Node<'a>, Option<&'static str>)> {
    let mut cursor = node.walk();
    let mut children = Vec::new();
    if cursor.goto_first_child() {
        loop {
            let child = cursor.node();
            if child.is_named() && !child.is_extra() && child.start_byte() < child.end_byte() {
                children.push((child, cursor.field_name()));
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
    children
}

/// First `ERROR` or `MISSING` node in document order
pub fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }

    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::{Parser, Tree};

    fn parse_java(source: &str) -> Tree {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_java::LANGUAGE.into())
            .unwrap();
        parser.parse(source, None).unwrap()
    }

    #[test]
    fn test_named_children_skip_punctuation() {
        let tree = parse_java("class A { int x = 1; }");
        let class = tree.root_node().named_child(0).unwrap();
        let children = named_children_with_fields(class);
        let kinds: Vec<_> = children.iter().map(|(n, _)| n.kind()).collect();
        assert_eq!(kinds, vec!["identifier", "class_body"]);
        assert_eq!(children[0].1, Some("name"));
        assert_eq!(children[1].1, Some("body"));
    }

    #[test]
    fn test_comments_are_skipped() {
        let tree = parse_java("class A { /* note */ int x; }");
        let class = tree.root_node().named_child(0).unwrap();
        let body = class.child_by_field_name("body").unwrap();
        let kinds: Vec<_> = named_children_with_fields(body)
            .iter()
            .map(|(n, _)| n.kind())
            .collect();
        assert_eq!(kinds, vec!["field_declaration"]);
    }

    #[test]
    fn test_first_error_none_for_valid_source() {
        let tree = parse_java("class A { void m() { int a = 1; } }");
        assert!(first_error(tree.root_node()).is_none());
    }

    #[test]
    fn test_first_error_finds_broken_code() {
        let tree = parse_java("class A { void m() { int a = ; } }");
        assert!(first_error(tree.root_node()).is_some());
    }
}
