//! Parsing JavaScript source text with tree-sitter.

use jsld_types::{ErrorCode, LinkError, Result, SourceFile, Span};
use tracing::debug;
use tree_sitter::{Node, Parser, Tree};

/// How a source file is to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// An ECMAScript module: symbols and exports files.
    Module,
    /// A classic script: externs files and the assembled program.
    Script,
}

/// A syntactically valid source file together with its syntax tree.
#[derive(Debug)]
pub struct ParsedSource {
    pub file: SourceFile,
    pub kind: SourceKind,
    tree: Tree,
}

impl ParsedSource {
    /// Display name of the file.
    pub fn name(&self) -> &str {
        &self.file.name
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Source text covered by `node`.
    pub fn text(&self, node: Node<'_>) -> &str {
        self.file.source.get(node.byte_range()).unwrap_or_default()
    }

    pub fn span(&self, node: Node<'_>) -> Span {
        self.file.span(node.start_byte(), node.end_byte())
    }

    /// The value of a `string` literal node, with escapes decoded.
    pub fn string_value(&self, node: Node<'_>) -> String {
        let mut value = Utf16Decoder::default();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "string_fragment" => value.push_str(self.text(child)),
                "escape_sequence" => {
                    if let Some(code) = decode_escape(self.text(child)) {
                        value.push_code(code);
                    }
                }
                _ => {}
            }
        }
        value.finish()
    }

    /// Every ERROR and MISSING node, in source order.
    fn syntax_errors(&self) -> Vec<(Span, String)> {
        let mut errors = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(node) = stack.pop() {
            if node.is_missing() {
                errors.push((self.span(node), format!("missing `{}`", node.kind())));
                continue;
            }
            if node.is_error() {
                errors.push((self.span(node), format!("unexpected `{}`", excerpt(self.text(node)))));
                continue;
            }
            if node.has_error() {
                let mut cursor = node.walk();
                let children: Vec<_> = node.children(&mut cursor).collect();
                stack.extend(children.into_iter().rev());
            }
        }
        errors
    }
}

/// Parse `source` as an ECMAScript module.
pub fn parse_module(name: &str, source: &str) -> Result<ParsedSource> {
    parse(name, source, SourceKind::Module)
}

/// Parse `source` as a classic script.
pub fn parse_script(name: &str, source: &str) -> Result<ParsedSource> {
    parse(name, source, SourceKind::Script)
}

fn parse(name: &str, source: &str, kind: SourceKind) -> Result<ParsedSource> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_javascript::LANGUAGE.into())
        .map_err(|e| LinkError::internal(format!("cannot load the JavaScript grammar: {e}")))?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| LinkError::internal("JavaScript parser produced no tree").in_file(name))?;

    let parsed = ParsedSource {
        file: SourceFile::new(name, source),
        kind,
        tree,
    };
    let errors = parsed.syntax_errors();
    if let Some((span, _)) = errors.first() {
        return Err(
            LinkError::new(ErrorCode::JS_PARSE, format!("cannot parse '{name}'"))
                .in_file(name)
                .at(*span)
                .with_items(errors.iter().map(|(span, msg)| format!("{span}: {msg}"))),
        );
    }
    debug!(file = name, ?kind, "parsed");
    Ok(parsed)
}

fn excerpt(text: &str) -> String {
    const MAX: usize = 24;
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > MAX {
        format!("{}...", line.chars().take(MAX).collect::<String>())
    } else {
        line.to_string()
    }
}

/// The code point or UTF-16 code unit an escape denotes. `None` for a
/// line continuation.
fn decode_escape(escape: &str) -> Option<u32> {
    let body = &escape[1..];
    let code = match body.chars().next()? {
        'n' => '\n' as u32,
        'r' => '\r' as u32,
        't' => '\t' as u32,
        'b' => 0x8,
        'f' => 0xc,
        'v' => 0xb,
        '0' if body.len() == 1 => 0,
        'x' => u32::from_str_radix(&body[1..], 16).ok()?,
        'u' => {
            let hex = body[1..].trim_start_matches('{').trim_end_matches('}');
            u32::from_str_radix(hex, 16).ok()?
        }
        // Line continuation.
        '\n' | '\r' => return None,
        c => c as u32,
    };
    Some(code)
}

/// Builds a string from text and escaped code units, joining surrogate
/// pairs. Unpaired surrogates become U+FFFD.
#[derive(Default)]
struct Utf16Decoder {
    out: String,
    high: Option<u32>,
}

impl Utf16Decoder {
    fn push_str(&mut self, text: &str) {
        self.flush();
        self.out.push_str(text);
    }

    fn push_code(&mut self, code: u32) {
        match code {
            0xD800..=0xDBFF => {
                self.flush();
                self.high = Some(code);
            }
            0xDC00..=0xDFFF => match self.high.take() {
                Some(high) => {
                    let combined = 0x10000 + ((high - 0xD800) << 10) + (code - 0xDC00);
                    self.out
                        .push(char::from_u32(combined).unwrap_or(char::REPLACEMENT_CHARACTER));
                }
                None => self.out.push(char::REPLACEMENT_CHARACTER),
            },
            _ => {
                self.flush();
                self.out
                    .push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
        }
    }

    fn flush(&mut self) {
        if self.high.take().is_some() {
            self.out.push(char::REPLACEMENT_CHARACTER);
        }
    }

    fn finish(mut self) -> String {
        self.flush();
        self.out
    }
}
