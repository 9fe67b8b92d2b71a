//! The universal module wrapper.
//!
//! The program body becomes a factory function. The wrapper locates the
//! host global object and the running script, builds a byte fetcher for
//! the Wasm file, then hands the factory to whichever module system is
//! present: AMD `define`, CommonJS `module.exports`, or a property on the
//! global object.

use tracing::trace;

use crate::literal::{member, string_literal};
use crate::runtime::{FETCHER, ROOT};
use crate::writer::JsWriter;

/// An external module the factory receives as a parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactoryParam {
    pub specifier: String,
    pub ident: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UmdWrapper {
    module_name: String,
    requirements: Vec<FactoryParam>,
}

impl UmdWrapper {
    /// `module_name` is the AMD module id and the global property name.
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            requirements: Vec::new(),
        }
    }

    /// Append a requirement; factory parameters follow insertion order.
    pub fn requirement(mut self, specifier: impl Into<String>, ident: impl Into<String>) -> Self {
        self.requirements.push(FactoryParam {
            specifier: specifier.into(),
            ident: ident.into(),
        });
        self
    }

    pub fn requirements(&self) -> &[FactoryParam] {
        &self.requirements
    }

    /// Emit the wrapper, with `body` writing the factory's statements.
    pub fn emit(&self, w: &mut JsWriter, body: impl FnOnce(&mut JsWriter)) {
        trace!(
            module = %self.module_name,
            requirements = self.requirements.len(),
            "emitting universal wrapper"
        );
        let name = string_literal(&self.module_name);
        let args = |each: &dyn Fn(&FactoryParam) -> String| {
            self.requirements
                .iter()
                .map(each)
                .collect::<Vec<_>>()
                .join(", ")
        };

        w.line("\"use strict\";");
        w.open("(function(factory) {");
        self.emit_root_detection(w);
        emit_fetcher(w);
        w.line("const bound = factory.bind(null, root, fetcher);");

        w.open("if (typeof root.define === \"function\" && root.define.amd) {");
        let specifiers = args(&|r| string_literal(&r.specifier));
        w.line(format!("root.define({name}, [{specifiers}], bound);"));
        w.dedent();
        w.open("} else if (typeof module === \"object\" && module.exports) {");
        let required = args(&|r| format!("require({})", string_literal(&r.specifier)));
        w.line(format!("module.exports = bound({required});"));
        w.dedent();
        w.open("} else {");
        let globals = args(&|r| member("root", &r.specifier));
        w.line(format!("{} = bound({globals});", member("root", &self.module_name)));
        w.close("}");

        let params = std::iter::once(ROOT.to_string())
            .chain(std::iter::once(FETCHER.to_string()))
            .chain(self.requirements.iter().map(|r| r.ident.clone()))
            .collect::<Vec<_>>()
            .join(", ");
        w.dedent();
        w.open(format!("}})(function({params}) {{"));
        body(w);
        w.close("});");
    }

    fn emit_root_detection(&self, w: &mut JsWriter) {
        w.line("let root;");
        w.line("let isNode = false;");
        w.open("if (typeof global === \"object\") {");
        w.line("root = global;");
        w.line("isNode = true;");
        w.dedent();
        w.open("} else if (typeof self === \"object\") {");
        w.line("root = self;");
        w.dedent();
        w.open("} else {");
        w.line(format!(
            "throw new Error({});",
            string_literal(&format!("{}: cannot locate the global object", self.module_name))
        ));
        w.close("}");
        w.line("const currentScript = isNode ? __dirname : root.document.currentScript.src;");
    }
}

/// `fetcher(name)` resolves `name` against the running script's location
/// and yields the file's bytes.
fn emit_fetcher(w: &mut JsWriter) {
    w.open("function fetcher(name) {");
    w.open("if (isNode) {");
    w.open("return new Promise(function(resolve, reject) {");
    w.line("const file = require(\"path\").join(currentScript, name);");
    w.open("require(\"fs\").readFile(file, function(err, data) {");
    w.open("if (err) {");
    w.line("reject(err);");
    w.dedent();
    w.open("} else {");
    w.line("resolve(data);");
    w.close("}");
    w.close("});");
    w.close("});");
    w.close("}");
    w.open("return root.fetch(new root.URL(name, currentScript)).then(function(response) {");
    w.open("if (!response.ok) {");
    w.line("throw new Error(\"cannot fetch \" + name + \": \" + response.status);");
    w.close("}");
    w.line("return response.arrayBuffer();");
    w.close("});");
    w.close("}");
}
