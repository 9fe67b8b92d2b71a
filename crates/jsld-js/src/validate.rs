//! Early errors the grammar itself accepts.

use std::collections::HashMap;

use jsld_types::{ErrorCode, LinkError, Span};
use tree_sitter::Node;

use crate::parse::{ParsedSource, SourceKind};
use crate::scope::{import_locals, pattern_names};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Binding {
    Var,
    Lexical,
}

/// Check a parsed file for early errors.
///
/// Returns every problem found; an empty list means the file is valid.
pub fn validate(parsed: &ParsedSource) -> Vec<LinkError> {
    let mut errors = Vec::new();
    let root = parsed.root();
    let mut declared: HashMap<String, Binding> = HashMap::new();
    let mut exported: HashMap<String, Span> = HashMap::new();

    let error = |node: Node<'_>, message: String| {
        LinkError::new(ErrorCode::JS_INVALID, message)
            .in_file(parsed.name())
            .at(parsed.span(node))
    };

    let mut cursor = root.walk();
    for node in root.named_children(&mut cursor) {
        let kind = node.kind();
        if parsed.kind == SourceKind::Script && matches!(kind, "import_statement" | "export_statement")
        {
            errors.push(error(
                node,
                format!(
                    "'{}' is a script and cannot contain import or export declarations",
                    parsed.name()
                ),
            ));
            continue;
        }

        let mut names = Vec::new();
        let binding = declaration_names(parsed, node, &mut names);
        if let Some(binding) = binding {
            for name in names {
                match declared.get(&name) {
                    Some(previous) if *previous == Binding::Lexical || binding == Binding::Lexical => {
                        errors.push(error(
                            node,
                            format!("'{name}' has already been declared in '{}'", parsed.name()),
                        ));
                    }
                    _ => {
                        declared.insert(name, binding);
                    }
                }
            }
        }

        if kind == "export_statement" {
            for name in exported_names(parsed, node) {
                if exported.insert(name.clone(), parsed.span(node)).is_some() {
                    errors.push(error(
                        node,
                        format!("duplicate export '{name}' in '{}'", parsed.name()),
                    ));
                }
            }
        }
    }
    errors
}

fn declaration_names(parsed: &ParsedSource, node: Node<'_>, out: &mut Vec<String>) -> Option<Binding> {
    let function_binding = match parsed.kind {
        SourceKind::Module => Binding::Lexical,
        SourceKind::Script => Binding::Var,
    };
    match node.kind() {
        "lexical_declaration" | "variable_declaration" => {
            let mut cursor = node.walk();
            for declarator in node.named_children(&mut cursor) {
                if let Some(name) = declarator.child_by_field_name("name") {
                    pattern_names(parsed, name, out);
                }
            }
            Some(if node.kind() == "lexical_declaration" {
                Binding::Lexical
            } else {
                Binding::Var
            })
        }
        "class_declaration" | "function_declaration" | "generator_function_declaration" => {
            let name = node.child_by_field_name("name")?;
            out.push(parsed.text(name).to_string());
            Some(if node.kind() == "class_declaration" {
                Binding::Lexical
            } else {
                function_binding
            })
        }
        "import_statement" => {
            import_locals(parsed, node, out);
            Some(Binding::Lexical)
        }
        "export_statement" => {
            let declaration = node.child_by_field_name("declaration")?;
            declaration_names(parsed, declaration, out)
        }
        _ => None,
    }
}

/// Public names introduced by an export statement. `export *` introduces
/// none that can be checked statically.
fn exported_names(parsed: &ParsedSource, node: Node<'_>) -> Vec<String> {
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    if children.iter().any(|c| c.kind() == "default") {
        return vec!["default".to_string()];
    }
    if let Some(clause) = children.iter().find(|c| c.kind() == "export_clause") {
        let mut names = Vec::new();
        let mut cursor = clause.walk();
        for spec in clause.named_children(&mut cursor) {
            let name = spec
                .child_by_field_name("alias")
                .or_else(|| spec.child_by_field_name("name"));
            if let Some(name) = name {
                names.push(if name.kind() == "string" {
                    parsed.string_value(name)
                } else {
                    parsed.text(name).to_string()
                });
            }
        }
        return names;
    }
    let mut names = Vec::new();
    if let Some(declaration) = node.child_by_field_name("declaration") {
        declaration_names(parsed, declaration, &mut names);
    }
    names
}
