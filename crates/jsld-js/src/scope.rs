//! Free-variable analysis.
//!
//! Scopes are tracked as a stack of name sets, one per function or block.
//! Declarations are collected when a scope is entered so that hoisted
//! `var`s and function declarations resolve references that precede them.

use std::collections::HashSet;

use tree_sitter::Node;

use crate::parse::ParsedSource;

/// Names referenced but never declared anywhere in the file, in first-seen
/// order.
pub fn free_variables(parsed: &ParsedSource) -> Vec<String> {
    let mut analyzer = ScopeAnalyzer::new(parsed);
    analyzer.program(parsed.root());
    analyzer.free
}

/// The variables of the global scope: top-level declarations followed by
/// free references, without duplicates.
///
/// Meaningful for scripts, whose top-level declarations are globals.
pub fn global_variables(parsed: &ParsedSource) -> Vec<String> {
    let mut analyzer = ScopeAnalyzer::new(parsed);
    analyzer.program(parsed.root());
    let mut seen = HashSet::new();
    analyzer
        .top_level
        .into_iter()
        .chain(analyzer.free)
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

// ══════════════════════════════════════════════════════════════════════════════
// Declaration collection
// ══════════════════════════════════════════════════════════════════════════════

/// Append the names bound by a binding pattern.
pub(crate) fn pattern_names(parsed: &ParsedSource, node: Node<'_>, out: &mut Vec<String>) {
    match node.kind() {
        "identifier" | "shorthand_property_identifier_pattern" => {
            out.push(parsed.text(node).to_string());
        }
        "assignment_pattern" | "object_assignment_pattern" => {
            if let Some(left) = node.child_by_field_name("left") {
                pattern_names(parsed, left, out);
            }
        }
        "pair_pattern" => {
            if let Some(value) = node.child_by_field_name("value") {
                pattern_names(parsed, value, out);
            }
        }
        "object_pattern" | "array_pattern" | "rest_pattern" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                pattern_names(parsed, child, out);
            }
        }
        _ => {}
    }
}

/// Local names bound by an import statement.
pub(crate) fn import_locals(parsed: &ParsedSource, node: Node<'_>, out: &mut Vec<String>) {
    let mut cursor = node.walk();
    let Some(clause) = node
        .named_children(&mut cursor)
        .find(|c| c.kind() == "import_clause")
    else {
        return;
    };
    let mut cursor = clause.walk();
    for child in clause.named_children(&mut cursor) {
        match child.kind() {
            "identifier" => out.push(parsed.text(child).to_string()),
            "namespace_import" => {
                let mut inner = child.walk();
                if let Some(id) = child
                    .named_children(&mut inner)
                    .find(|c| c.kind() == "identifier")
                {
                    out.push(parsed.text(id).to_string());
                };
            }
            "named_imports" => {
                let mut inner = child.walk();
                for spec in child.named_children(&mut inner) {
                    if spec.kind() != "import_specifier" {
                        continue;
                    }
                    if let Some(local) = spec
                        .child_by_field_name("alias")
                        .or_else(|| spec.child_by_field_name("name"))
                    {
                        out.push(parsed.text(local).to_string());
                    }
                }
            }
            _ => {}
        }
    }
}

fn declarator_names(parsed: &ParsedSource, declaration: Node<'_>, out: &mut Vec<String>) {
    let mut cursor = declaration.walk();
    for declarator in declaration.named_children(&mut cursor) {
        if declarator.kind() == "variable_declarator" {
            if let Some(name) = declarator.child_by_field_name("name") {
                pattern_names(parsed, name, out);
            }
        }
    }
}

/// Names declared with block scope directly in a statement list.
fn lexical_names(parsed: &ParsedSource, list: Node<'_>, out: &mut Vec<String>) {
    let mut cursor = list.walk();
    for child in list.named_children(&mut cursor) {
        lexical_declaration_names(parsed, child, out);
    }
}

fn lexical_declaration_names(parsed: &ParsedSource, node: Node<'_>, out: &mut Vec<String>) {
    match node.kind() {
        "lexical_declaration" => declarator_names(parsed, node, out),
        "class_declaration" | "function_declaration" | "generator_function_declaration" => {
            if let Some(name) = node.child_by_field_name("name") {
                out.push(parsed.text(name).to_string());
            }
        }
        "export_statement" => {
            if let Some(declaration) = node.child_by_field_name("declaration") {
                lexical_declaration_names(parsed, declaration, out);
            }
        }
        "import_statement" => import_locals(parsed, node, out),
        _ => {}
    }
}

fn is_function_boundary(kind: &str) -> bool {
    matches!(
        kind,
        "function_declaration"
            | "generator_function_declaration"
            | "function_expression"
            | "function"
            | "generator_function"
            | "arrow_function"
            | "method_definition"
            | "class_declaration"
            | "class"
    )
}

/// `var` declarations hoisted to the function containing `node`.
fn hoisted_vars(parsed: &ParsedSource, node: Node<'_>, out: &mut Vec<String>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            kind if is_function_boundary(kind) => {}
            "variable_declaration" => declarator_names(parsed, child, out),
            "for_in_statement" => {
                let is_var = child
                    .child_by_field_name("kind")
                    .is_some_and(|k| parsed.text(k) == "var");
                if is_var {
                    if let Some(left) = child.child_by_field_name("left") {
                        pattern_names(parsed, left, out);
                    }
                }
                hoisted_vars(parsed, child, out);
            }
            _ => hoisted_vars(parsed, child, out),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Analyzer
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq)]
enum FunctionKind {
    Declaration,
    Expression,
    Arrow,
    Method,
}

struct ScopeAnalyzer<'p> {
    parsed: &'p ParsedSource,
    scopes: Vec<HashSet<String>>,
    top_level: Vec<String>,
    free: Vec<String>,
    seen_free: HashSet<String>,
}

impl<'p> ScopeAnalyzer<'p> {
    fn new(parsed: &'p ParsedSource) -> Self {
        Self {
            parsed,
            scopes: Vec::new(),
            top_level: Vec::new(),
            free: Vec::new(),
            seen_free: HashSet::new(),
        }
    }

    fn push_scope(&mut self, names: Vec<String>) {
        self.scopes.push(names.into_iter().collect());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn is_bound(&self, name: &str) -> bool {
        self.scopes.iter().rev().any(|scope| scope.contains(name))
    }

    fn reference(&mut self, node: Node<'_>) {
        let name = self.parsed.text(node);
        if !self.is_bound(name) && self.seen_free.insert(name.to_string()) {
            self.free.push(name.to_string());
        }
    }

    fn visit_children(&mut self, node: Node<'_>) {
        let mut cursor = node.walk();
        let children: Vec<_> = node.named_children(&mut cursor).collect();
        for child in children {
            self.visit(child);
        }
    }

    fn program(&mut self, root: Node<'_>) {
        let mut names = Vec::new();
        hoisted_vars(self.parsed, root, &mut names);
        lexical_names(self.parsed, root, &mut names);
        self.top_level = names.clone();
        self.push_scope(names);
        self.visit_children(root);
        self.pop_scope();
    }

    fn visit(&mut self, node: Node<'_>) {
        match node.kind() {
            "identifier" | "shorthand_property_identifier" | "shorthand_property_identifier_pattern" => {
                self.reference(node)
            }
            "import_statement" => {}
            "export_statement" => {
                if node.child_by_field_name("source").is_none() {
                    self.visit_children(node);
                }
            }
            "export_specifier" => {
                if let Some(name) = node.child_by_field_name("name") {
                    if name.kind() == "identifier" {
                        self.reference(name);
                    }
                }
            }
            "variable_declarator" => {
                if let Some(name) = node.child_by_field_name("name") {
                    self.pattern(name);
                }
                if let Some(value) = node.child_by_field_name("value") {
                    self.visit(value);
                }
            }
            "function_declaration" | "generator_function_declaration" => {
                self.function(node, FunctionKind::Declaration)
            }
            "function_expression" | "function" | "generator_function" => {
                self.function(node, FunctionKind::Expression)
            }
            "arrow_function" => self.function(node, FunctionKind::Arrow),
            "method_definition" => self.function(node, FunctionKind::Method),
            "class_declaration" | "class" => self.class(node),
            "statement_block" | "switch_body" => self.block(node),
            "for_statement" => {
                let mut names = Vec::new();
                if let Some(init) = node.child_by_field_name("initializer") {
                    if init.kind() == "lexical_declaration" {
                        declarator_names(self.parsed, init, &mut names);
                    }
                }
                self.push_scope(names);
                self.visit_children(node);
                self.pop_scope();
            }
            "for_in_statement" => self.for_in(node),
            "catch_clause" => {
                let mut names = Vec::new();
                let parameter = node.child_by_field_name("parameter");
                if let Some(parameter) = parameter {
                    pattern_names(self.parsed, parameter, &mut names);
                }
                self.push_scope(names);
                if let Some(parameter) = parameter {
                    self.pattern(parameter);
                }
                if let Some(body) = node.child_by_field_name("body") {
                    self.visit(body);
                }
                self.pop_scope();
            }
            "pair" => {
                // Only computed keys are expressions.
                if let Some(key) = node.child_by_field_name("key") {
                    if key.kind() == "computed_property_name" {
                        self.visit(key);
                    }
                }
                if let Some(value) = node.child_by_field_name("value") {
                    self.visit(value);
                }
            }
            _ => self.visit_children(node),
        }
    }

    /// Walk a binding pattern: binding names are skipped, default values
    /// and computed keys are ordinary expressions.
    fn pattern(&mut self, node: Node<'_>) {
        match node.kind() {
            "identifier" | "shorthand_property_identifier_pattern" => {}
            "assignment_pattern" | "object_assignment_pattern" => {
                if let Some(left) = node.child_by_field_name("left") {
                    self.pattern(left);
                }
                if let Some(right) = node.child_by_field_name("right") {
                    self.visit(right);
                }
            }
            "pair_pattern" => {
                if let Some(key) = node.child_by_field_name("key") {
                    if key.kind() == "computed_property_name" {
                        self.visit(key);
                    }
                }
                if let Some(value) = node.child_by_field_name("value") {
                    self.pattern(value);
                }
            }
            "object_pattern" | "array_pattern" | "rest_pattern" => {
                let mut cursor = node.walk();
                let children: Vec<_> = node.named_children(&mut cursor).collect();
                for child in children {
                    self.pattern(child);
                }
            }
            _ => self.visit(node),
        }
    }

    fn function(&mut self, node: Node<'_>, kind: FunctionKind) {
        if kind == FunctionKind::Method {
            if let Some(name) = node.child_by_field_name("name") {
                if name.kind() == "computed_property_name" {
                    self.visit(name);
                }
            }
        }

        let mut names = Vec::new();
        if kind == FunctionKind::Expression {
            if let Some(name) = node.child_by_field_name("name") {
                names.push(self.parsed.text(name).to_string());
            }
        }
        if kind != FunctionKind::Arrow {
            names.push("arguments".to_string());
        }
        let params = node
            .child_by_field_name("parameters")
            .or_else(|| node.child_by_field_name("parameter"));
        if let Some(params) = params {
            if params.kind() == "formal_parameters" {
                let mut cursor = params.walk();
                for param in params.named_children(&mut cursor) {
                    pattern_names(self.parsed, param, &mut names);
                }
            } else {
                pattern_names(self.parsed, params, &mut names);
            }
        }
        let body = node.child_by_field_name("body");
        if let Some(body) = body.filter(|b| b.kind() == "statement_block") {
            hoisted_vars(self.parsed, body, &mut names);
            lexical_names(self.parsed, body, &mut names);
        }

        self.push_scope(names);
        match params {
            Some(params) if params.kind() == "formal_parameters" => {
                let mut cursor = params.walk();
                let list: Vec<_> = params.named_children(&mut cursor).collect();
                for param in list {
                    self.pattern(param);
                }
            }
            Some(param) => self.pattern(param),
            None => {}
        }
        match body {
            Some(body) if body.kind() == "statement_block" => self.visit_children(body),
            Some(body) => self.visit(body),
            None => {}
        }
        self.pop_scope();
    }

    fn class(&mut self, node: Node<'_>) {
        let mut names = Vec::new();
        if let Some(name) = node.child_by_field_name("name") {
            names.push(self.parsed.text(name).to_string());
        }
        self.push_scope(names);
        let mut cursor = node.walk();
        let children: Vec<_> = node.named_children(&mut cursor).collect();
        for child in children {
            match child.kind() {
                "identifier" => {}
                _ => self.visit(child),
            }
        }
        self.pop_scope();
    }

    fn block(&mut self, node: Node<'_>) {
        let mut names = Vec::new();
        if node.kind() == "switch_body" {
            let mut cursor = node.walk();
            for case in node.named_children(&mut cursor) {
                lexical_names(self.parsed, case, &mut names);
            }
        } else {
            lexical_names(self.parsed, node, &mut names);
        }
        self.push_scope(names);
        self.visit_children(node);
        self.pop_scope();
    }

    fn for_in(&mut self, node: Node<'_>) {
        let declares = node.child_by_field_name("kind").is_some();
        let left = node.child_by_field_name("left");
        let mut names = Vec::new();
        if let (true, Some(left)) = (declares, left) {
            pattern_names(self.parsed, left, &mut names);
        }
        self.push_scope(names);
        if let Some(left) = left {
            if declares {
                self.pattern(left);
            } else {
                self.visit(left);
            }
        }
        for field in ["right", "body"] {
            if let Some(child) = node.child_by_field_name(field) {
                self.visit(child);
            }
        }
        self.pop_scope();
    }
}
