//! JavaScript literal syntax.

use std::fmt::Write;

/// Quote `value` as a double-quoted JavaScript string literal.
pub fn string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// `object["name"]`.
///
/// Always the computed form, so any export name is accepted.
pub fn member(object: &str, name: &str) -> String {
    format!("{object}[{}]", string_literal(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_and_escapes() {
        assert_eq!(string_literal("plain"), r#""plain""#);
        assert_eq!(string_literal("a\"b\\c"), r#""a\"b\\c""#);
        assert_eq!(string_literal("line\nbreak\u{1}"), r#""line\nbreak\u0001""#);
        assert_eq!(string_literal("\u{2028}"), r#""\u2028""#);
        assert_eq!(string_literal("ünï"), "\"ünï\"");
    }

    #[test]
    fn member_access() {
        assert_eq!(member("__symbols", "puts"), r#"__symbols["puts"]"#);
        assert_eq!(member("__exports", "my-fn"), r#"__exports["my-fn"]"#);
    }
}
