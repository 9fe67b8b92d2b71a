//! Top-level item extraction.
//!
//! Splits a module into its import declarations, export declarations and
//! the remaining statements. Exported declarations are returned with the
//! declaration itself as a plain [`Statement`], so the linker can emit the
//! code without the `export` keyword.

use jsld_types::{ErrorCode, LinkError, Result, Span};
use tree_sitter::Node;

use crate::parse::ParsedSource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportBinding {
    /// `import x from '...'`
    Default { local: String },
    /// `import { imported as local } from '...'`
    Named { imported: String, local: String },
    /// `import * as local from '...'`
    Namespace { local: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDecl {
    pub specifier: String,
    /// Empty for a side-effect-only import.
    pub bindings: Vec<ImportBinding>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSpec {
    pub local: String,
    pub exported: String,
}

/// A name bound by an exported declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclaredName {
    Identifier(String),
    /// An object or array destructuring pattern.
    Pattern(Span),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportDecl {
    /// `export function f() {}`, `export const a = 1, b = 2`, ...
    Declaration {
        names: Vec<DeclaredName>,
        statement: Statement,
    },
    /// `export { a as b }`, optionally `from '...'`.
    Clause {
        specs: Vec<ExportSpec>,
        source: Option<String>,
        span: Span,
    },
    /// `export default ...`
    Default { span: Span },
    /// `export * from '...'` and `export * as ns from '...'`
    All { source: String, span: Span },
}

/// A statement kept as source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub text: String,
    /// Contains a string or template literal spanning several lines, so
    /// the text must not be re-indented.
    pub verbatim: bool,
    pub span: Span,
}

impl Statement {
    fn from_node(parsed: &ParsedSource, node: Node<'_>) -> Self {
        Self {
            text: parsed.text(node).to_string(),
            verbatim: has_multiline_literal(node),
            span: parsed.span(node),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopLevelItem {
    /// A directive of the leading prologue, such as `"use strict";`.
    Directive(Statement),
    Import(ImportDecl),
    Export(ExportDecl),
    Statement(Statement),
}

/// Classify the top-level items of a parsed module, in source order.
///
/// Comments and empty statements are dropped.
pub fn top_level_items(parsed: &ParsedSource) -> Result<Vec<TopLevelItem>> {
    let root = parsed.root();
    let mut cursor = root.walk();
    let mut items = Vec::new();
    let mut in_prologue = true;
    for node in root.named_children(&mut cursor) {
        let kind = node.kind();
        if matches!(kind, "comment" | "hash_bang_line") {
            continue;
        }
        if in_prologue && is_directive(node) {
            items.push(TopLevelItem::Directive(Statement::from_node(parsed, node)));
            continue;
        }
        in_prologue = false;
        let item = match kind {
            "empty_statement" => continue,
            "import_statement" => TopLevelItem::Import(import_decl(parsed, node)?),
            "export_statement" => TopLevelItem::Export(export_decl(parsed, node)?),
            _ => TopLevelItem::Statement(Statement::from_node(parsed, node)),
        };
        items.push(item);
    }
    Ok(items)
}

fn malformed(parsed: &ParsedSource, node: Node<'_>, what: &str) -> LinkError {
    LinkError::new(
        ErrorCode::JS_INVALID,
        format!("malformed {what} in '{}'", parsed.name()),
    )
    .in_file(parsed.name())
    .at(parsed.span(node))
}

/// The value of an export or import name: an identifier or a string.
fn module_export_name(parsed: &ParsedSource, node: Node<'_>) -> String {
    if node.kind() == "string" {
        parsed.string_value(node)
    } else {
        parsed.text(node).to_string()
    }
}

fn import_decl(parsed: &ParsedSource, node: Node<'_>) -> Result<ImportDecl> {
    let source = node
        .child_by_field_name("source")
        .ok_or_else(|| malformed(parsed, node, "import declaration"))?;
    let mut bindings = Vec::new();

    let mut cursor = node.walk();
    let clause = node
        .named_children(&mut cursor)
        .find(|c| c.kind() == "import_clause");
    if let Some(clause) = clause {
        let mut cursor = clause.walk();
        for child in clause.named_children(&mut cursor) {
            match child.kind() {
                "identifier" => bindings.push(ImportBinding::Default {
                    local: parsed.text(child).to_string(),
                }),
                "namespace_import" => {
                    let mut inner = child.walk();
                    let local = child
                        .named_children(&mut inner)
                        .find(|c| c.kind() == "identifier")
                        .ok_or_else(|| malformed(parsed, child, "namespace import"))?;
                    bindings.push(ImportBinding::Namespace {
                        local: parsed.text(local).to_string(),
                    });
                }
                "named_imports" => {
                    let mut inner = child.walk();
                    for spec in child.named_children(&mut inner) {
                        if spec.kind() != "import_specifier" {
                            continue;
                        }
                        let name = spec
                            .child_by_field_name("name")
                            .ok_or_else(|| malformed(parsed, spec, "import specifier"))?;
                        let imported = module_export_name(parsed, name);
                        let local = match spec.child_by_field_name("alias") {
                            Some(alias) => parsed.text(alias).to_string(),
                            None => imported.clone(),
                        };
                        bindings.push(ImportBinding::Named { imported, local });
                    }
                }
                _ => {}
            }
        }
    }

    Ok(ImportDecl {
        specifier: parsed.string_value(source),
        bindings,
        span: parsed.span(node),
    })
}

fn export_decl(parsed: &ParsedSource, node: Node<'_>) -> Result<ExportDecl> {
    let span = parsed.span(node);
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();

    if children.iter().any(|c| c.kind() == "default") {
        return Ok(ExportDecl::Default { span });
    }

    let source = node
        .child_by_field_name("source")
        .map(|s| parsed.string_value(s));

    if children
        .iter()
        .any(|c| c.kind() == "*" || c.kind() == "namespace_export")
    {
        let source = source.ok_or_else(|| malformed(parsed, node, "export declaration"))?;
        return Ok(ExportDecl::All { source, span });
    }

    if let Some(clause) = children.iter().find(|c| c.kind() == "export_clause") {
        let mut specs = Vec::new();
        let mut cursor = clause.walk();
        for spec in clause.named_children(&mut cursor) {
            if spec.kind() != "export_specifier" {
                continue;
            }
            let name = spec
                .child_by_field_name("name")
                .ok_or_else(|| malformed(parsed, spec, "export specifier"))?;
            let local = module_export_name(parsed, name);
            let exported = match spec.child_by_field_name("alias") {
                Some(alias) => module_export_name(parsed, alias),
                None => local.clone(),
            };
            specs.push(ExportSpec { local, exported });
        }
        return Ok(ExportDecl::Clause {
            specs,
            source,
            span,
        });
    }

    let declaration = node
        .child_by_field_name("declaration")
        .ok_or_else(|| malformed(parsed, node, "export declaration"))?;
    let mut names = Vec::new();
    match declaration.kind() {
        "lexical_declaration" | "variable_declaration" => {
            let mut cursor = declaration.walk();
            for declarator in declaration.named_children(&mut cursor) {
                if declarator.kind() != "variable_declarator" {
                    continue;
                }
                let Some(name) = declarator.child_by_field_name("name") else {
                    continue;
                };
                names.push(if name.kind() == "identifier" {
                    DeclaredName::Identifier(parsed.text(name).to_string())
                } else {
                    DeclaredName::Pattern(parsed.span(name))
                });
            }
        }
        _ => {
            let name = declaration
                .child_by_field_name("name")
                .ok_or_else(|| malformed(parsed, declaration, "exported declaration"))?;
            names.push(DeclaredName::Identifier(parsed.text(name).to_string()));
        }
    }

    Ok(ExportDecl::Declaration {
        names,
        statement: Statement::from_node(parsed, declaration),
    })
}

fn is_directive(node: Node<'_>) -> bool {
    node.kind() == "expression_statement"
        && node.named_child_count() == 1
        && node.named_child(0).is_some_and(|c| c.kind() == "string")
}

fn has_multiline_literal(node: Node<'_>) -> bool {
    let mut stack = vec![node];
    while let Some(node) = stack.pop() {
        if matches!(node.kind(), "string" | "template_string")
            && node.start_position().row != node.end_position().row
        {
            return true;
        }
        let mut cursor = node.walk();
        stack.extend(node.named_children(&mut cursor));
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_module;

    fn items(source: &str) -> Vec<TopLevelItem> {
        top_level_items(&parse_module("test.js", source).unwrap()).unwrap()
    }

    #[test]
    fn imports() {
        let items = items(
            "import $, { ajax as get, \"odd-name\" as odd } from 'jquery';\n\
             import * as ns from 'ns';\n\
             import 'polyfill';\n",
        );
        let TopLevelItem::Import(first) = &items[0] else {
            panic!("expected import");
        };
        assert_eq!(first.specifier, "jquery");
        assert_eq!(
            first.bindings,
            vec![
                ImportBinding::Default { local: "$".into() },
                ImportBinding::Named {
                    imported: "ajax".into(),
                    local: "get".into()
                },
                ImportBinding::Named {
                    imported: "odd-name".into(),
                    local: "odd".into()
                },
            ]
        );
        assert!(matches!(
            &items[1],
            TopLevelItem::Import(ImportDecl { bindings, .. })
                if bindings == &vec![ImportBinding::Namespace { local: "ns".into() }]
        ));
        assert!(matches!(
            &items[2],
            TopLevelItem::Import(ImportDecl { specifier, bindings, .. })
                if specifier == "polyfill" && bindings.is_empty()
        ));
    }

    #[test]
    fn export_shapes() {
        let items = items(
            "export default 1;\n\
             export * from 'a';\n\
             export { x, y as z };\n\
             export { p as q } from 'b';\n",
        );
        assert!(matches!(items[0], TopLevelItem::Export(ExportDecl::Default { .. })));
        assert!(matches!(
            &items[1],
            TopLevelItem::Export(ExportDecl::All { source, .. }) if source == "a"
        ));
        let TopLevelItem::Export(ExportDecl::Clause { specs, source, .. }) = &items[2] else {
            panic!("expected export clause");
        };
        assert_eq!(source, &None);
        assert_eq!(specs[1].local, "y");
        assert_eq!(specs[1].exported, "z");
        assert!(matches!(
            &items[3],
            TopLevelItem::Export(ExportDecl::Clause { source: Some(s), .. }) if s == "b"
        ));
    }

    #[test]
    fn exported_declarations_drop_the_keyword() {
        let items = items("export function f() {}\nexport const a = 1, { b } = o;\n");
        let TopLevelItem::Export(ExportDecl::Declaration { names, statement }) = &items[0] else {
            panic!("expected declaration");
        };
        assert_eq!(names, &vec![DeclaredName::Identifier("f".into())]);
        assert_eq!(statement.text, "function f() {}");

        let TopLevelItem::Export(ExportDecl::Declaration { names, .. }) = &items[1] else {
            panic!("expected declaration");
        };
        assert_eq!(names[0], DeclaredName::Identifier("a".into()));
        assert!(matches!(names[1], DeclaredName::Pattern(_)));
    }

    #[test]
    fn directive_prologue() {
        let items = items("'use strict';\n\"use asm\";\nf();\n'not a directive';\n");
        assert!(matches!(&items[0], TopLevelItem::Directive(s) if s.text == "'use strict';"));
        assert!(matches!(&items[1], TopLevelItem::Directive(_)));
        assert!(matches!(&items[2], TopLevelItem::Statement(_)));
        assert!(matches!(&items[3], TopLevelItem::Statement(_)));
    }

    #[test]
    fn statements_and_comments() {
        let items = items("// leading\nconst a = 1;;\nconsole.log(`x\ny`);\n");
        assert_eq!(items.len(), 2);
        let TopLevelItem::Statement(first) = &items[0] else {
            panic!("expected statement");
        };
        assert_eq!(first.text, "const a = 1;");
        assert!(!first.verbatim);
        let TopLevelItem::Statement(second) = &items[1] else {
            panic!("expected statement");
        };
        assert!(second.verbatim);
    }
}
