//! Indenting line writer.

const INDENT: &str = "  ";

/// Accumulates generated JavaScript one line at a time.
#[derive(Debug, Default)]
pub struct JsWriter {
    out: String,
    depth: usize,
}

impl JsWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write one line at the current depth.
    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.depth {
                self.out.push_str(INDENT);
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    /// Write a line that opens a block, then indent.
    pub fn open(&mut self, text: impl AsRef<str>) {
        self.line(text);
        self.depth += 1;
    }

    /// Dedent, then write the line that closes a block.
    pub fn close(&mut self, text: impl AsRef<str>) {
        self.depth = self.depth.saturating_sub(1);
        self.line(text);
    }

    pub fn indent(&mut self) {
        self.depth += 1;
    }

    pub fn dedent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Write a statement taken from an input file.
    ///
    /// The text starts at its first token; continuation lines keep their
    /// original indentation relative to the least indented of them. A
    /// `verbatim` statement holds multi-line literals whose content must
    /// not change, so only its first line is indented.
    pub fn statement(&mut self, text: &str, verbatim: bool) {
        let mut lines = text.lines();
        let Some(first) = lines.next() else {
            return;
        };
        self.line(first);
        if verbatim {
            for line in lines {
                self.out.push_str(line);
                self.out.push('\n');
            }
            return;
        }

        let rest: Vec<&str> = lines.map(str::trim_end).collect();
        let common = rest
            .iter()
            .filter(|l| !l.is_empty())
            .map(|l| &l[..l.len() - l.trim_start().len()])
            .reduce(common_prefix)
            .unwrap_or("");
        for line in rest {
            self.line(line.strip_prefix(common).unwrap_or(line));
        }
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// The longest prefix shared by `a` and `b`, compared character by character.
fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let end = a
        .char_indices()
        .zip(b.chars())
        .find(|((_, x), y)| x != y)
        .map_or(a.len().min(b.len()), |((i, _), _)| i);
    &a[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_indent() {
        let mut w = JsWriter::new();
        w.open("if (x) {");
        w.line("f();");
        w.line("");
        w.close("}");
        assert_eq!(w.finish(), "if (x) {\n  f();\n\n}\n");
    }

    #[test]
    fn statements_are_reindented() {
        let mut w = JsWriter::new();
        w.indent();
        w.statement("function f() {\n    return 1;\n  }", false);
        assert_eq!(w.finish(), "  function f() {\n    return 1;\n  }\n");
    }

    #[test]
    fn mixed_whitespace_indentation_keeps_every_line() {
        let mut w = JsWriter::new();
        w.statement("if (x) {\n\u{a0}g();\n h(); }", false);
        assert_eq!(w.finish(), "if (x) {\n\u{a0}g();\n h(); }\n");

        let mut w = JsWriter::new();
        w.statement("if (x) {\n\t\u{a0}g();\n\t\th(); }", false);
        assert_eq!(w.finish(), "if (x) {\n\u{a0}g();\n\th(); }\n");
    }

    #[test]
    fn verbatim_statements_keep_their_lines() {
        let mut w = JsWriter::new();
        w.indent();
        w.statement("const s = `a\n  b\nc`;", true);
        assert_eq!(w.finish(), "  const s = `a\n  b\nc`;\n");
    }

    #[test]
    fn close_never_underflows() {
        let mut w = JsWriter::new();
        w.close("}");
        assert_eq!(w.finish(), "}\n");
    }
}
