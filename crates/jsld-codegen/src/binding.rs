//! Bindings emitted at the top and bottom of each linked file's block.
//!
//! A linked file sees three kinds of outside names:
//!
//! - requirement imports, bound once from the factory parameter holding
//!   the external module
//! - symbol imports, bound lazily through [`LATE_BINDING`] so that files
//!   and the Wasm instance can reference each other regardless of load
//!   order
//! - its own exports, installed into a linkage container at the end

use crate::literal::{member, string_literal};
use crate::runtime::{LATE_BINDING, SYMBOLS};
use crate::writer::JsWriter;

/// How a requirement import binds its local name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequirementBinding {
    /// The module object itself.
    Whole { local: String },
    /// One property of the module object.
    Property { name: String, local: String },
}

/// `const local = __lib;` or `const local = __lib["name"];`
pub fn emit_requirement_binding(w: &mut JsWriter, ident: &str, binding: &RequirementBinding) {
    match binding {
        RequirementBinding::Whole { local } => w.line(format!("const {local} = {ident};")),
        RequirementBinding::Property { name, local } => {
            w.line(format!("const {local} = {};", member(ident, name)))
        }
    }
}

/// Define the late-binding trampoline factory.
///
/// Each trampoline is a two-state machine: while unresolved, a call looks
/// the symbol up in the symbols container, requires it to be a function,
/// records it and hands it to `rebind` so the importing file's variable
/// stops pointing at the trampoline. Every call is forwarded with the
/// original `this` and arguments.
pub fn emit_late_binding_helper(w: &mut JsWriter) {
    w.open(format!("function {LATE_BINDING}(name, rebind) {{"));
    w.line("let state = { resolved: false, value: undefined };");
    w.open("return function(...args) {");
    w.open("if (!state.resolved) {");
    w.line(format!("const value = {SYMBOLS}[name];"));
    w.open("if (typeof value !== \"function\") {");
    w.line("throw new Error(\"linked symbol '\" + name + \"' is not a function\");");
    w.close("}");
    w.line("state = { resolved: true, value: value };");
    w.line("rebind(value);");
    w.close("}");
    w.line("return state.value.apply(this, args);");
    w.close("};");
    w.close("}");
}

/// `let local = __lateBinding("symbol", function(value) { local = value; });`
pub fn emit_late_binding(w: &mut JsWriter, local: &str, symbol: &str) {
    w.line(format!(
        "let {local} = {LATE_BINDING}({}, function(value) {{ {local} = value; }});",
        string_literal(symbol)
    ));
}

/// `container["exported"] = local;`
pub fn emit_install(w: &mut JsWriter, container: &str, exported: &str, local: &str) {
    w.line(format!("{} = {local};", member(container, exported)));
}
