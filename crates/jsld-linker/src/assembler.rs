//! Program assembly.
//!
//! ```text
//! preamble                 const __exports = {}; const __symbols = {};
//! live symbols files       installed into __symbols
//! every exports file       installed into __exports
//! postamble                fetch -> compile -> instantiate -> install
//! ```
//!
//! The whole body is then wrapped in the universal module wrapper whose
//! factory receives one parameter per requirement.

use jsld_codegen::runtime::{EXPORTS, SYMBOLS};
use jsld_codegen::{
    emit_install, emit_late_binding, emit_late_binding_helper, emit_requirement_binding,
    ExportInstall, JsWriter, MemoryImport, Pipeline, Stage, UmdWrapper,
};
use jsld_types::names::{CALL_CTORS_EXPORT, WASM_SYMBOLS_MODULE};
use jsld_types::{ObjectKind, Result};
use jsld_wasm::WasmModule;
use tracing::{debug, info};

use crate::link::LinkOptions;
use crate::loader::{FileKind, JsModule};
use crate::requirement_table::RequirementTable;
use crate::symbol_table::{MemoryDefinition, SymbolTable};

pub struct ModuleAssembler<'a> {
    options: &'a LinkOptions,
    symbols: &'a SymbolTable,
    requirements: &'a RequirementTable,
    wasm: &'a WasmModule,
    memories: &'a [MemoryDefinition],
    symbols_files: &'a [JsModule],
    exports_files: &'a [JsModule],
}

impl<'a> ModuleAssembler<'a> {
    /// An assembler over fully resolved tables.
    pub fn new(
        options: &'a LinkOptions,
        symbols: &'a SymbolTable,
        requirements: &'a RequirementTable,
        wasm: &'a WasmModule,
    ) -> Self {
        Self {
            options,
            symbols,
            requirements,
            wasm,
            memories: &[],
            symbols_files: &[],
            exports_files: &[],
        }
    }

    /// Memories the linker creates before instantiation.
    pub fn memories(mut self, memories: &'a [MemoryDefinition]) -> Self {
        self.memories = memories;
        self
    }

    pub fn symbols_files(mut self, files: &'a [JsModule]) -> Self {
        self.symbols_files = files;
        self
    }

    pub fn exports_files(mut self, files: &'a [JsModule]) -> Self {
        self.exports_files = files;
        self
    }

    /// Whether any export of a symbols file is used.
    pub fn is_live(&self, file: &JsModule) -> bool {
        match file.kind {
            FileKind::Symbols => file.exported_names().any(|name| self.symbols.is_used(name)),
            FileKind::Exports => true,
        }
    }

    /// Produce the complete program text.
    pub fn assemble(&self) -> Result<String> {
        let mut wrapper = UmdWrapper::new(&self.options.module_name);
        for requirement in self.requirements.iter() {
            wrapper = wrapper.requirement(&requirement.specifier, &requirement.ident);
        }
        let pipeline = self.pipeline()?;

        let mut w = JsWriter::new();
        let mut result = Ok(());
        wrapper.emit(&mut w, |w| result = self.emit_body(w, &pipeline));
        result?;

        let program = w.finish();
        info!(
            module = %self.options.module_name,
            bytes = program.len(),
            "assembled program"
        );
        Ok(program)
    }

    fn emit_body(&self, w: &mut JsWriter, pipeline: &Pipeline) -> Result<()> {
        let live: Vec<&JsModule> = self
            .symbols_files
            .iter()
            .filter(|file| {
                let live = self.is_live(file);
                if !live {
                    debug!(file = %file.path, "dropping unused symbols file");
                }
                live
            })
            .chain(self.exports_files.iter())
            .collect();

        w.line(format!("const {EXPORTS} = {{}};"));
        w.line(format!("const {SYMBOLS} = {{}};"));
        if live.iter().any(|file| !file.symbol_imports.is_empty()) {
            emit_late_binding_helper(w);
        }
        for file in live {
            self.emit_file(w, file)?;
        }
        pipeline.emit(w);
        Ok(())
    }

    /// One file's block: directives, bindings, code, then installs.
    fn emit_file(&self, w: &mut JsWriter, file: &JsModule) -> Result<()> {
        w.line(format!("// {}", file.path.replace(['\n', '\r'], " ")));
        w.open("(function() {");
        for directive in &file.directives {
            w.statement(&directive.text, directive.verbatim);
        }
        for import in &file.requirement_imports {
            if let Some(binding) = &import.binding {
                let requirement = self.requirements.get(&import.specifier)?;
                emit_requirement_binding(w, &requirement.ident, binding);
            }
        }
        for import in &file.symbol_imports {
            emit_late_binding(w, &import.local, &import.symbol);
        }
        for statement in &file.code {
            w.statement(&statement.text, statement.verbatim);
        }
        match file.kind {
            FileKind::Symbols => {
                for export in &file.exports {
                    if self.symbols.is_used(&export.exported) {
                        emit_install(w, SYMBOLS, &export.exported, &export.local);
                    }
                }
            }
            FileKind::Exports => {
                for export in &file.exports {
                    emit_install(w, EXPORTS, &export.exported, &export.local);
                }
            }
        }
        w.close("})();");
        Ok(())
    }

    fn pipeline(&self) -> Result<Pipeline> {
        let memories = self
            .memories
            .iter()
            .map(|m| MemoryImport {
                name: m.name.clone(),
                limits: m.limits,
            })
            .collect();
        let imports = self
            .wasm
            .requirement_modules()
            .into_iter()
            .map(|module| {
                let requirement = self.requirements.get(module)?;
                Ok((module.to_string(), requirement.ident.clone()))
            })
            .collect::<Result<Vec<_>>>()?;
        let exports = self
            .wasm
            .exports
            .iter()
            .filter(|e| self.symbols.is_used(&e.name))
            .map(|e| match e.descriptor.kind() {
                ObjectKind::Function => ExportInstall::Function {
                    name: e.name.clone(),
                },
                ObjectKind::Table | ObjectKind::Memory | ObjectKind::Global => {
                    ExportInstall::Object {
                        name: e.name.clone(),
                    }
                }
            })
            .collect();
        let call_ctors = self
            .wasm
            .needs_ctor_call()
            .then(|| CALL_CTORS_EXPORT.to_string());

        Ok(Pipeline::fetch(&self.options.wasm_file)
            .then(Stage::Compile)
            .then(Stage::Instantiate {
                symbol_module: WASM_SYMBOLS_MODULE.to_string(),
                memories,
                imports,
            })
            .then(Stage::InstallExports {
                exports,
                call_ctors,
            }))
    }
}
