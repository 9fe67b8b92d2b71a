//! The asynchronous instantiation pipeline.
//!
//! The postamble is a promise chain: one head expression followed by one
//! `.then` continuation per stage. A rejected stage short-circuits every
//! later one, so the factory's return value either resolves to the frozen
//! public exports or rejects with the first failure.

use jsld_types::Limits;

use crate::literal::{member, string_literal};
use crate::runtime::{EXPORTS, FETCHER, SYMBOLS};
use crate::writer::JsWriter;

/// A memory import the linker provides itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryImport {
    pub name: String,
    pub limits: Limits,
}

/// A Wasm export to install into the symbols container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportInstall {
    /// Installed through the re-entrancy guard.
    Function { name: String },
    /// Tables, memories and globals, installed by reference.
    Object { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// `bytes -> WebAssembly.Module`
    Compile,
    /// Create linker-provided memories, build the import object and
    /// instantiate. `imports` maps each Wasm import module other than the
    /// symbol module to the expression supplying it.
    Instantiate {
        symbol_module: String,
        memories: Vec<MemoryImport>,
        imports: Vec<(String, String)>,
    },
    /// Install the used exports, run static constructors if requested,
    /// then freeze and return the public exports.
    InstallExports {
        exports: Vec<ExportInstall>,
        call_ctors: Option<String>,
    },
}

impl Stage {
    /// Name of the continuation's parameter.
    fn input(&self) -> &'static str {
        match self {
            Self::Compile => "bytes",
            Self::Instantiate { .. } => "wasmModule",
            Self::InstallExports { .. } => "wasmInstance",
        }
    }

    fn emit_body(&self, w: &mut JsWriter) {
        match self {
            Self::Compile => w.line("return WebAssembly.compile(bytes);"),
            Self::Instantiate {
                symbol_module,
                memories,
                imports,
            } => {
                for memory in memories {
                    w.line(format!(
                        "{} = new WebAssembly.Memory({});",
                        member(SYMBOLS, &memory.name),
                        memory_descriptor(memory.limits)
                    ));
                }
                w.open("return WebAssembly.instantiate(wasmModule, {");
                w.line(format!("{}: {SYMBOLS},", string_literal(symbol_module)));
                for (module, expr) in imports {
                    w.line(format!("{}: {expr},", string_literal(module)));
                }
                w.close("});");
            }
            Self::InstallExports {
                exports,
                call_ctors,
            } => {
                w.line("const wasmExports = wasmInstance.exports;");
                emit_export_guard(w);
                for export in exports {
                    match export {
                        ExportInstall::Function { name } => w.line(format!(
                            "{} = wrapExport({});",
                            member(SYMBOLS, name),
                            string_literal(name)
                        )),
                        ExportInstall::Object { name } => w.line(format!(
                            "{} = {};",
                            member(SYMBOLS, name),
                            member("wasmExports", name)
                        )),
                    }
                }
                if let Some(ctors) = call_ctors {
                    w.line(format!("wrapExport({})();", string_literal(ctors)));
                }
                w.line(format!("return Object.freeze({EXPORTS});"));
            }
        }
    }
}

/// `{ initial: 2, maximum: 16 }`
fn memory_descriptor(limits: Limits) -> String {
    match limits.max {
        Some(max) => format!("{{ initial: {}, maximum: {max} }}", limits.min),
        None => format!("{{ initial: {} }}", limits.min),
    }
}

/// Define `wrapExport(name)`, which returns a guarded forwarder to a Wasm
/// export. Once any guarded export throws, the instance is considered
/// poisoned and every later call fails without entering it.
fn emit_export_guard(w: &mut JsWriter) {
    w.line("let wasmFailure = null;");
    w.open("function wrapExport(name) {");
    w.line("const fn = wasmExports[name];");
    w.open("return function(...args) {");
    w.open("if (wasmFailure !== null) {");
    w.line("throw new Error(\"WebAssembly previously threw: \" + wasmFailure.error);");
    w.close("}");
    w.open("try {");
    w.line("return fn.apply(this, args);");
    w.dedent();
    w.open("} catch (e) {");
    w.line("wasmFailure = { error: e };");
    w.line("throw e;");
    w.close("}");
    w.close("};");
    w.close("}");
}

/// Fetch, then the stages in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    wasm_file: String,
    stages: Vec<Stage>,
}

impl Pipeline {
    /// A pipeline that starts by fetching `wasm_file`.
    pub fn fetch(wasm_file: impl Into<String>) -> Self {
        Self {
            wasm_file: wasm_file.into(),
            stages: Vec::new(),
        }
    }

    pub fn then(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Emit `return __fetcher(...).then(...)...;`
    pub fn emit(&self, w: &mut JsWriter) {
        let head = format!("return {FETCHER}({})", string_literal(&self.wasm_file));
        if self.stages.is_empty() {
            w.line(format!("{head};"));
            return;
        }
        w.line(head);
        w.indent();
        let last = self.stages.len() - 1;
        for (i, stage) in self.stages.iter().enumerate() {
            w.open(format!(".then(function({}) {{", stage.input()));
            stage.emit_body(w);
            w.close(if i == last { "});" } else { "})" });
        }
        w.dedent();
    }
}
