//! Function synthesis: turn an analysed declaration into a callable unit
//!
//! The unit is named after the declared variable, implements a functional
//! interface whose type arguments are the captured variable types followed by
//! the declared type, and returns the original initializer.

use crate::scope::{CapturedVariable, JavaType};
use crate::select::StatementParts;
use crate::syntax::{NodeKind, SyntaxTree};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

pub const DEFAULT_INTERFACE: &str = "Function";
pub const DEFAULT_ANNOTATION: &str = "Named";
pub const DEFAULT_METHOD: &str = "apply";

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[\p{L}_$][\p{L}\p{N}_$]*$").expect("valid identifier regex")
    })
}

/// A single Java identifier (`_` alone is reserved)
pub fn is_java_identifier(name: &str) -> bool {
    name != "_" && identifier_pattern().is_match(name)
}

/// A dotted sequence of identifiers, e.g. `java.util.function.Function`
pub fn is_qualified_name(name: &str) -> bool {
    name.split('.').all(is_java_identifier)
}

/// Knobs for the generated unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisOptions {
    /// Functional interface the unit implements
    pub interface: String,
    /// Annotation carrying the declared name
    pub annotation: String,
    /// Name of the single abstract method
    pub method: String,
    /// Replace primitive type arguments with their wrapper classes
    pub box_primitives: bool,
    /// Carry the original file's imports over
    pub copy_imports: bool,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        SynthesisOptions {
            interface: DEFAULT_INTERFACE.to_string(),
            annotation: DEFAULT_ANNOTATION.to_string(),
            method: DEFAULT_METHOD.to_string(),
            box_primitives: false,
            copy_imports: true,
        }
    }
}

/// Package and imports of the file the statement came from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitHeader {
    /// `None` for the default package
    pub package: Option<String>,
    /// Import declarations as written, e.g. `import java.util.List;`
    pub imports: Vec<String>,
}

impl UnitHeader {
    pub fn from_tree(tree: &SyntaxTree) -> Self {
        let root = tree.root();
        let package = tree
            .children_of_kind(root, NodeKind::PackageDeclaration)
            .next()
            .and_then(|declaration| {
                tree.children(declaration).iter().copied().find(|child| {
                    matches!(
                        tree.node(*child).grammar_kind,
                        "scoped_identifier" | "identifier"
                    )
                })
            })
            .map(|name| tree.text(name).split_whitespace().collect::<String>());
        let imports = tree
            .children_of_kind(root, NodeKind::ImportDeclaration)
            .map(|import| tree.text(import).split_whitespace().collect::<Vec<_>>().join(" "))
            .collect();
        UnitHeader { package, imports }
    }

    pub fn without_imports(self) -> Self {
        UnitHeader {
            imports: Vec::new(),
            ..self
        }
    }
}

/// `Interface<T1, ..., Tn, R>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionalInterface {
    pub name: String,
    pub type_arguments: Vec<JavaType>,
}

impl FunctionalInterface {
    pub fn arity(&self) -> usize {
        self.type_arguments.len()
    }
}

impl fmt::Display for FunctionalInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<", self.name)?;
        for (i, argument) in self.type_arguments.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{argument}")?;
        }
        f.write_str(">")
    }
}

/// Marker annotation with a single string value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub name: String,
    pub value: String,
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let escaped = self.value.replace('\\', "\\\\").replace('"', "\\\"");
        write!(f, "@{}(\"{}\")", self.name, escaped)
    }
}

/// Initializer source text, continuation lines dedented by the statement's
/// own indentation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializerExpression {
    text: String,
}

impl InitializerExpression {
    pub fn new(text: &str, indent: &str) -> Self {
        let width = indent.chars().count();
        let mut lines = text.lines();
        let mut dedented: Vec<&str> = lines.next().into_iter().collect();
        for line in lines {
            let strip = line
                .char_indices()
                .take_while(|(_, c)| *c == ' ' || *c == '\t')
                .take(width)
                .last()
                .map(|(i, c)| i + c.len_utf8())
                .unwrap_or(0);
            dedented.push(&line[strip..]);
        }
        InitializerExpression {
            text: dedented.join("\n"),
        }
    }

    /// Initializer of an applicable statement
    pub fn from_statement(tree: &SyntaxTree, parts: &StatementParts) -> Self {
        let source = tree.source();
        let start = tree.node(parts.statement).span.start;
        let line_start = source[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let indent: String = source[line_start..start]
            .chars()
            .take_while(|c| c.is_whitespace())
            .collect();

        let text = tree.text(parts.initializer);
        // A bare `{...}` is only legal in a declaration; elsewhere it needs `new T[]`
        if tree.kind(parts.initializer) == NodeKind::Other("array_initializer") {
            let ty = JavaType::declared(tree, parts.ty, parts.dimensions);
            return InitializerExpression::new(&format!("new {} {}", ty, text), &indent);
        }
        InitializerExpression::new(text, &indent)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }
}

/// The generated callable type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedUnit {
    /// Class name: the declared name, capitalized
    pub name: String,
    pub declared_name: String,
    pub header: UnitHeader,
    pub annotation: Annotation,
    pub interface: FunctionalInterface,
    pub method: String,
    /// Method parameters, in capture order
    pub parameters: Vec<CapturedVariable>,
    pub return_type: JavaType,
    pub body: InitializerExpression,
}

impl SynthesizedUnit {
    /// One type argument per parameter plus the return type
    pub fn arity_holds(&self) -> bool {
        self.parameters.len() + 1 == self.interface.arity()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisError {
    #[error("`{name}` cannot be turned into a class name")]
    InvalidName { name: String },

    #[error("type of `{name}` is inferred (`var`) and cannot be used as a type argument")]
    UnresolvedType { name: String },
}

/// Build the unit for `declared_name = initializer`
pub fn synthesize(
    header: UnitHeader,
    captured: &[CapturedVariable],
    return_type: &JavaType,
    body: InitializerExpression,
    declared_name: &str,
    options: &SynthesisOptions,
) -> Result<SynthesizedUnit, SynthesisError> {
    let name = capitalize(declared_name);
    if !is_java_identifier(declared_name) || !is_java_identifier(&name) {
        return Err(SynthesisError::InvalidName {
            name: declared_name.to_string(),
        });
    }

    if return_type.is_inferred() {
        return Err(SynthesisError::UnresolvedType {
            name: declared_name.to_string(),
        });
    }
    if let Some(variable) = captured.iter().find(|variable| variable.ty.is_inferred()) {
        return Err(SynthesisError::UnresolvedType {
            name: variable.name.clone(),
        });
    }

    let written = |ty: &JavaType| {
        if options.box_primitives {
            ty.boxed()
        } else {
            ty.clone()
        }
    };
    let parameters: Vec<CapturedVariable> = captured
        .iter()
        .map(|variable| CapturedVariable {
            name: variable.name.clone(),
            ty: written(&variable.ty),
        })
        .collect();
    let return_type = written(return_type);

    let type_arguments = parameters
        .iter()
        .map(|parameter| parameter.ty.clone())
        .chain(std::iter::once(return_type.clone()))
        .collect();

    let header = if options.copy_imports {
        header
    } else {
        header.without_imports()
    };

    Ok(SynthesizedUnit {
        name,
        declared_name: declared_name.to_string(),
        header,
        annotation: Annotation {
            name: options.annotation.clone(),
            value: declared_name.to_string(),
        },
        interface: FunctionalInterface {
            name: options.interface.clone(),
            type_arguments,
        },
        method: options.method.clone(),
        parameters,
        return_type,
        body,
    })
}

/// Upper-case the first character
fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::{JavaParser, SourceParser};

    fn var(name: &str, ty: &str) -> CapturedVariable {
        CapturedVariable {
            name: name.to_string(),
            ty: JavaType::new(ty),
        }
    }

    fn body(text: &str) -> InitializerExpression {
        InitializerExpression::new(text, "")
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("compute"), "Compute");
        assert_eq!(capitalize("b"), "B");
        assert_eq!(capitalize("élan"), "Élan");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_identifiers() {
        assert!(is_java_identifier("total"));
        assert!(is_java_identifier("$cache_2"));
        assert!(!is_java_identifier("2fast"));
        assert!(!is_java_identifier("_"));
        assert!(!is_java_identifier(""));
        assert!(is_qualified_name("java.util.function.Function"));
        assert!(!is_qualified_name("java..Function"));
    }

    #[test]
    fn test_synthesize_scenario() {
        let unit = synthesize(
            UnitHeader {
                package: Some("com.example".to_string()),
                imports: Vec::new(),
            },
            &[var("a", "int"), var("x", "String")],
            &JavaType::new("int"),
            body("compute(a, x)"),
            "compute",
            &SynthesisOptions::default(),
        )
        .unwrap();

        assert_eq!(unit.name, "Compute");
        assert_eq!(unit.interface.to_string(), "Function<int, String, int>");
        assert_eq!(unit.annotation.to_string(), "@Named(\"compute\")");
        assert_eq!(unit.method, "apply");
        assert!(unit.arity_holds());
    }

    #[test]
    fn test_no_captures_has_arity_one() {
        let unit = synthesize(
            UnitHeader::default(),
            &[],
            &JavaType::new("String"),
            body("\"constant\""),
            "label",
            &SynthesisOptions::default(),
        )
        .unwrap();
        assert_eq!(unit.interface.arity(), 1);
        assert!(unit.arity_holds());
        assert!(unit.header.package.is_none());
    }

    #[test]
    fn test_box_primitives() {
        let options = SynthesisOptions {
            box_primitives: true,
            ..SynthesisOptions::default()
        };
        let unit = synthesize(
            UnitHeader::default(),
            &[var("n", "long"), var("xs", "int[]")],
            &JavaType::new("boolean"),
            body("xs.length > n"),
            "big",
            &options,
        )
        .unwrap();
        assert_eq!(unit.interface.to_string(), "Function<Long, int[], Boolean>");
        assert_eq!(unit.parameters[0].ty.as_str(), "Long");
        assert_eq!(unit.return_type.as_str(), "Boolean");
    }

    #[test]
    fn test_invalid_name() {
        let result = synthesize(
            UnitHeader::default(),
            &[],
            &JavaType::new("int"),
            body("1"),
            "",
            &SynthesisOptions::default(),
        );
        assert!(matches!(result, Err(SynthesisError::InvalidName { .. })));
    }

    #[test]
    fn test_var_is_unresolved() {
        let result = synthesize(
            UnitHeader::default(),
            &[],
            &JavaType::new("var"),
            body("1"),
            "one",
            &SynthesisOptions::default(),
        );
        assert_eq!(
            result.unwrap_err(),
            SynthesisError::UnresolvedType {
                name: "one".to_string()
            }
        );

        let result = synthesize(
            UnitHeader::default(),
            &[var("it", "var")],
            &JavaType::new("int"),
            body("it + 1"),
            "next",
            &SynthesisOptions::default(),
        );
        assert_eq!(
            result.unwrap_err(),
            SynthesisError::UnresolvedType {
                name: "it".to_string()
            }
        );
    }

    #[test]
    fn test_imports_dropped_on_request() {
        let header = UnitHeader {
            package: None,
            imports: vec!["import java.util.List;".to_string()],
        };
        let options = SynthesisOptions {
            copy_imports: false,
            ..SynthesisOptions::default()
        };
        let unit = synthesize(header, &[], &JavaType::new("int"), body("1"), "one", &options)
            .unwrap();
        assert!(unit.header.imports.is_empty());
    }

    #[test]
    fn test_dedent_continuation_lines() {
        let expression = InitializerExpression::new("items.stream()\n            .count()", "        ");
        assert_eq!(expression.as_str(), "items.stream()\n    .count()");

        let shallow = InitializerExpression::new("a +\n  b", "        ");
        assert_eq!(shallow.as_str(), "a +\nb");
    }

    #[test]
    fn test_header_from_tree() {
        let source = "package com.acme.util;\n\nimport java.util.List;\nimport static java.lang.Math.max;\n\nclass A {}\n";
        let tree = JavaParser.parse(source, "A.java").unwrap();
        let header = UnitHeader::from_tree(&tree);
        assert_eq!(header.package.as_deref(), Some("com.acme.util"));
        assert_eq!(
            header.imports,
            vec![
                "import java.util.List;".to_string(),
                "import static java.lang.Math.max;".to_string()
            ]
        );
    }

    #[test]
    fn test_initializer_from_statement() {
        let source = "class A {\n    void m(java.util.List<String> items) {\n        long n = items.stream()\n            .count();\n    }\n}\n";
        let tree = JavaParser.parse(source, "A.java").unwrap();
        let statement = crate::select::select(&tree, "3:9-3:9".parse().unwrap()).unwrap();
        let parts = StatementParts::of(&tree, statement).unwrap();
        let expression = InitializerExpression::from_statement(&tree, &parts);
        assert_eq!(expression.as_str(), "items.stream()\n    .count()");
    }

    #[test]
    fn test_array_initializer_becomes_array_creation() {
        let source = "class A {\n    void m() {\n        int v[] = {1, 2};\n        String[] names = {\"a\", \"b\"};\n    }\n}\n";
        let tree = JavaParser.parse(source, "A.java").unwrap();

        let statement = crate::select::select(&tree, "3:9-3:9".parse().unwrap()).unwrap();
        let parts = StatementParts::of(&tree, statement).unwrap();
        let expression = InitializerExpression::from_statement(&tree, &parts);
        assert_eq!(expression.as_str(), "new int[] {1, 2}");

        let statement = crate::select::select(&tree, "4:9-4:9".parse().unwrap()).unwrap();
        let parts = StatementParts::of(&tree, statement).unwrap();
        let expression = InitializerExpression::from_statement(&tree, &parts);
        assert_eq!(expression.as_str(), "new String[] {\"a\", \"b\"}");
    }
}
