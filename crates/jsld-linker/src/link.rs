//! Link entry points.

use std::collections::HashMap;
use std::path::Path;

use jsld_types::{ErrorCode, LinkError, Result};
use jsld_wasm::WasmModule;
use tracing::{debug, info, instrument};

use crate::assembler::ModuleAssembler;
use crate::externs::ExternsFile;
use crate::loader::{load_exports_file, load_symbols_file, JsModule};
use crate::requirement_table::RequirementTable;
use crate::symbol_table::{Definition, SymbolTable};
use crate::validator::validate_externs;

/// Settings that shape the generated program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOptions {
    /// AMD module id and global property name.
    pub module_name: String,
    /// File name the runtime fetches, relative to the output script.
    pub wasm_file: String,
    /// Globals the output may reference besides the runtime's own.
    pub externs: Vec<String>,
}

impl LinkOptions {
    pub fn new(module_name: impl Into<String>, wasm_file: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            wasm_file: wasm_file.into(),
            externs: Vec::new(),
        }
    }

    /// Options for writing `output` next to `wasm`: the module is named
    /// after the output file and the Wasm file is fetched by its file name.
    pub fn for_output(output: &Path, wasm: &Path) -> Self {
        let file_name = |path: &Path| {
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        };
        Self::new(module_name_for(&file_name(output)), file_name(wasm))
    }

    pub fn with_externs<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.externs.extend(names.into_iter().map(Into::into));
        self
    }
}

/// `app.js` -> `app`, `app.min.js` -> `app.min`. Only a trailing
/// all-lowercase extension is removed.
pub fn module_name_for(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() && ext.bytes().all(|b| b.is_ascii_lowercase()) => {
            stem.to_string()
        }
        _ => file_name.to_string(),
    }
}

/// A JS input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInput {
    pub path: String,
    pub text: String,
}

impl SourceInput {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }
}

/// Everything a link reads, already loaded into memory.
#[derive(Debug, Clone, Default)]
pub struct LinkInputs {
    pub wasm_path: String,
    pub wasm_bytes: Vec<u8>,
    pub symbols_files: Vec<SourceInput>,
    pub exports_files: Vec<SourceInput>,
    pub externs_files: Vec<SourceInput>,
}

/// Link the inputs into one program.
///
/// Files are loaded in order: symbols files, exports files, then the Wasm
/// module. Any failure aborts the whole link.
#[instrument(skip_all, fields(module = %options.module_name))]
pub fn link(options: &LinkOptions, inputs: &LinkInputs) -> Result<String> {
    let mut symbols = SymbolTable::new();
    let mut requirements = RequirementTable::new();

    let symbols_files = inputs
        .symbols_files
        .iter()
        .map(|f| load_symbols_file(&f.path, &f.text, &mut symbols, &mut requirements))
        .collect::<Result<Vec<_>>>()?;
    let exports_files = inputs
        .exports_files
        .iter()
        .map(|f| load_exports_file(&f.path, &f.text, &mut symbols, &mut requirements))
        .collect::<Result<Vec<_>>>()?;
    check_public_exports(&exports_files)?;

    let wasm = WasmModule::parse(&inputs.wasm_bytes)
        .map_err(|e| e.into_link_error(&inputs.wasm_path))?;
    register_wasm(&wasm, &inputs.wasm_path, &mut symbols, &mut requirements)?;

    let memories = symbols.provide_undefined_memories();
    symbols.report_undefined()?;
    info!(
        symbols = symbols.len(),
        requirements = requirements.len(),
        memories = memories.len(),
        "resolved"
    );

    let mut externs = options.externs.clone();
    for file in &inputs.externs_files {
        externs.extend(ExternsFile::load(&file.path, &file.text)?.names);
    }

    let program = ModuleAssembler::new(options, &symbols, &requirements, &wasm)
        .memories(&memories)
        .symbols_files(&symbols_files)
        .exports_files(&exports_files)
        .assemble()?;
    validate_externs(&program, &options.module_name, &externs)?;
    Ok(program)
}

/// Every symbol name the symbols files define or import, in first-seen
/// order.
#[instrument(skip_all, fields(files = symbols_files.len()))]
pub fn generate_imports(symbols_files: &[SourceInput]) -> Result<Vec<String>> {
    let mut symbols = SymbolTable::new();
    let mut requirements = RequirementTable::new();
    for file in symbols_files {
        load_symbols_file(&file.path, &file.text, &mut symbols, &mut requirements)?;
    }
    Ok(symbols.names().map(str::to_owned).collect())
}

/// Symbol imports become used references, exports become definitions and
/// every other import module becomes a requirement.
fn register_wasm(
    wasm: &WasmModule,
    path: &str,
    symbols: &mut SymbolTable,
    requirements: &mut RequirementTable,
) -> Result<()> {
    for import in wasm.symbol_imports() {
        let id = symbols.add_undefined(&import.name);
        symbols.mark_used(id);
        symbols.set_descriptor(id, import.descriptor.clone())?;
    }
    for export in &wasm.exports {
        let id = symbols.add_defined(
            &export.name,
            Definition::Wasm {
                file: path.to_string(),
            },
        )?;
        symbols.set_descriptor(id, export.descriptor.clone())?;
    }
    for module in wasm.requirement_modules() {
        requirements.add(module);
    }
    debug!(
        imports = wasm.imports.len(),
        exports = wasm.exports.len(),
        ctors = wasm.needs_ctor_call(),
        "registered Wasm module"
    );
    Ok(())
}

/// Public export names must be unique across exports files.
fn check_public_exports(files: &[JsModule]) -> Result<()> {
    let mut owners: HashMap<&str, &str> = HashMap::new();
    let mut duplicates = Vec::new();
    for file in files {
        for name in file.exported_names() {
            if let Some(first) = owners.insert(name, &file.path) {
                duplicates.push((name, first, file.path.as_str()));
            }
        }
    }
    let Some(&(name, first, second)) = duplicates.first() else {
        return Ok(());
    };
    Err(LinkError::new(
        ErrorCode::DUPLICATE_EXPORT,
        format!("public export '{name}' is defined in both '{first}' and '{second}'"),
    )
    .in_file(second)
    .for_symbol(name)
    .with_items(
        duplicates
            .iter()
            .map(|(name, first, second)| format!("{name}: {first}, {second}")),
    ))
}
