//! Reserved names and identifier escaping.
//!
//! Anything the linker generates that could collide with user or
//! third-party code uses a double-underscore prefix.

/// Module specifier JS files import cross-file symbols from.
pub const SYMBOLS_MODULE: &str = "__symbols";

/// Wasm import module whose entries are linker symbols.
pub const WASM_SYMBOLS_MODULE: &str = "env";

/// Wasm export that runs static constructors when there is no start section.
pub const CALL_CTORS_EXPORT: &str = "__wasm_call_ctors";

/// ECMAScript reserved words (including strict-mode and module reserved words).
const RESERVED_WORDS: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "implements", "import", "in", "instanceof", "interface", "let", "new", "null",
    "package", "private", "protected", "public", "return", "static", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// Whether `name` is an ECMAScript reserved word.
pub fn is_reserved_word(name: &str) -> bool {
    RESERVED_WORDS.contains(&name)
}

fn is_identifier_start(c: char) -> bool {
    c == '$' || c == '_' || c.is_alphabetic()
}

fn is_identifier_part(c: char) -> bool {
    c == '$' || c == '_' || c.is_alphanumeric()
}

/// Whether `name` can be used as a plain JS binding identifier.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if is_identifier_start(first) => {
            chars.all(is_identifier_part) && !is_reserved_word(name)
        }
        _ => false,
    }
}

/// Turn an arbitrary name into a valid JS binding identifier.
///
/// Characters outside `[A-Za-z0-9_$]` (and other Unicode letters/digits)
/// become `_`; a leading digit gets a `_` prefix; a reserved word gets a
/// `_` suffix. Names that are already identifiers are returned unchanged.
pub fn escape_identifier(name: &str) -> String {
    if is_identifier(name) {
        return name.to_string();
    }
    let mut out: String = name
        .chars()
        .map(|c| if is_identifier_part(c) { c } else { '_' })
        .collect();
    if !out.chars().next().is_some_and(is_identifier_start) {
        out.insert(0, '_');
    }
    if is_reserved_word(&out) {
        out.push('_');
    }
    out
}
