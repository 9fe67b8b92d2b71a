//! The decoded module model.
//!
//! [`WasmModule::parse`] walks the section stream and collects the
//! signatures of every function, table, memory and global, imported ones
//! first, then locally defined ones, so that export and start indices can
//! be resolved to full object descriptors.

use std::collections::HashSet;

use jsld_types::names::{CALL_CTORS_EXPORT, WASM_SYMBOLS_MODULE};
use jsld_types::{
    FunctionSignature, GlobalSignature, MemorySignature, ObjectDescriptor, ObjectKind,
    TableSignature,
};
use tracing::{debug, trace};

use crate::error::{ReadError, WasmError};
use crate::reader::Reader;

// ── Header ───────────────────────────────────────────────────────────────────

/// `\0asm` read as a little-endian `u32`.
pub const MAGIC: u32 = 0x6d73_6100;
/// The only supported binary version.
pub const VERSION: u32 = 0x0000_0001;

// ── Section ids ──────────────────────────────────────────────────────────────

pub const CUSTOM_SECTION_ID: u8 = 0;
pub const TYPE_SECTION_ID: u8 = 1;
pub const IMPORT_SECTION_ID: u8 = 2;
pub const FUNCTION_SECTION_ID: u8 = 3;
pub const TABLE_SECTION_ID: u8 = 4;
pub const MEMORY_SECTION_ID: u8 = 5;
pub const GLOBAL_SECTION_ID: u8 = 6;
pub const EXPORT_SECTION_ID: u8 = 7;
pub const START_SECTION_ID: u8 = 8;
pub const ELEMENT_SECTION_ID: u8 = 9;
pub const CODE_SECTION_ID: u8 = 10;
pub const DATA_SECTION_ID: u8 = 11;
pub const DATA_COUNT_SECTION_ID: u8 = 12;

// ── Opcodes ──────────────────────────────────────────────────────────────────

/// Form byte introducing a function type.
const FUNC_TYPE_FORM: u8 = 0x60;

const OPCODE_END: u8 = 0x0b;
const OPCODE_GET_GLOBAL: u8 = 0x23;
const OPCODE_I32_CONST: u8 = 0x41;
const OPCODE_I64_CONST: u8 = 0x42;
const OPCODE_F32_CONST: u8 = 0x43;
const OPCODE_F64_CONST: u8 = 0x44;

fn section_name(id: u8) -> &'static str {
    match id {
        CUSTOM_SECTION_ID => "custom",
        TYPE_SECTION_ID => "type",
        IMPORT_SECTION_ID => "import",
        FUNCTION_SECTION_ID => "function",
        TABLE_SECTION_ID => "table",
        MEMORY_SECTION_ID => "memory",
        GLOBAL_SECTION_ID => "global",
        EXPORT_SECTION_ID => "export",
        START_SECTION_ID => "start",
        ELEMENT_SECTION_ID => "element",
        CODE_SECTION_ID => "code",
        DATA_SECTION_ID => "data",
        DATA_COUNT_SECTION_ID => "data count",
        _ => "unknown",
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Model
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEntry {
    pub module: String,
    pub name: String,
    pub descriptor: ObjectDescriptor,
}

impl ImportEntry {
    /// Whether this import is resolved by the linker's symbol table.
    pub fn is_symbol(&self) -> bool {
        self.module == WASM_SYMBOLS_MODULE
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportEntry {
    pub name: String,
    pub descriptor: ObjectDescriptor,
}

/// A decoded WebAssembly module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WasmModule {
    /// Type section.
    pub types: Vec<FunctionSignature>,
    /// Import section, in declaration order.
    pub imports: Vec<ImportEntry>,
    pub function_imports: Vec<FunctionSignature>,
    pub table_imports: Vec<TableSignature>,
    pub memory_imports: Vec<MemorySignature>,
    pub global_imports: Vec<GlobalSignature>,
    /// Function section: locally defined functions.
    pub functions: Vec<FunctionSignature>,
    pub tables: Vec<TableSignature>,
    pub memories: Vec<MemorySignature>,
    pub globals: Vec<GlobalSignature>,
    /// Export section, in declaration order.
    pub exports: Vec<ExportEntry>,
    /// Start section.
    pub start: Option<u32>,
}

impl WasmModule {
    /// Decode and validate a module.
    pub fn parse(bytes: &[u8]) -> Result<Self, WasmError> {
        let mut reader = Reader::new(bytes);
        if reader.read_u32_le()? != MAGIC {
            return Err(ReadError::BadMagic.into());
        }
        let version = reader.read_u32_le()?;
        if version != VERSION {
            return Err(ReadError::BadVersion(version).into());
        }

        let mut module = WasmModule::default();
        let mut previous: Option<u8> = None;
        while !reader.at_end() {
            let id = reader.read_u8()?;
            let name = section_name(id);
            let len = reader.read_uleb32()? as usize;
            if id != CUSTOM_SECTION_ID {
                if let Some(prev) = previous {
                    if id < prev {
                        return Err(WasmError::new(
                            Some(name),
                            ReadError::SectionOutOfOrder { id, previous: prev },
                        ));
                    }
                }
                previous = Some(id);
            }

            let mut section = reader
                .sub_reader(len)
                .map_err(|e| WasmError::new(Some(name), e))?;
            module
                .read_section(id, &mut section)
                .map_err(|e| WasmError::new(Some(name), e))?;
            if !section.at_end() {
                return Err(WasmError::new(Some(name), ReadError::TrailingSectionData));
            }
            trace!(section = name, len, "decoded section");
        }

        let duplicates = module.duplicate_symbol_names();
        if !duplicates.is_empty() {
            return Err(ReadError::DuplicateNames { names: duplicates }.into());
        }

        debug!(
            imports = module.imports.len(),
            exports = module.exports.len(),
            start = ?module.start,
            "decoded Wasm module"
        );
        Ok(module)
    }

    fn read_section(&mut self, id: u8, r: &mut Reader<'_>) -> Result<(), ReadError> {
        match id {
            TYPE_SECTION_ID => self.read_types(r),
            IMPORT_SECTION_ID => self.read_imports(r),
            FUNCTION_SECTION_ID => self.read_functions(r),
            TABLE_SECTION_ID => read_vec(r, |r| r.read_table_type(), &mut self.tables),
            MEMORY_SECTION_ID => read_vec(r, |r| r.read_memory_type(), &mut self.memories),
            GLOBAL_SECTION_ID => read_vec(
                r,
                |r| {
                    let signature = r.read_global_type()?;
                    skip_const_expr(r)?;
                    Ok(signature)
                },
                &mut self.globals,
            ),
            EXPORT_SECTION_ID => self.read_exports(r),
            START_SECTION_ID => self.read_start(r),
            // Custom, element, code, data and unknown sections carry
            // nothing the linker needs.
            _ => r.skip(r.remaining()),
        }
    }

    // ── Section decoders ─────────────────────────────────────────────────

    fn read_types(&mut self, r: &mut Reader<'_>) -> Result<(), ReadError> {
        let count = r.read_uleb32()?;
        for _ in 0..count {
            let offset = r.offset();
            let form = r.read_u8()?;
            if form != FUNC_TYPE_FORM {
                return Err(ReadError::BadTag {
                    what: "type form",
                    byte: form,
                    offset,
                });
            }
            let mut params = Vec::new();
            read_vec(r, |r| r.read_val_type(), &mut params)?;
            let mut results = Vec::new();
            read_vec(r, |r| r.read_val_type(), &mut results)?;
            self.types.push(FunctionSignature::new(params, results));
        }
        Ok(())
    }

    fn read_imports(&mut self, r: &mut Reader<'_>) -> Result<(), ReadError> {
        let count = r.read_uleb32()?;
        for _ in 0..count {
            let module = r.read_string()?;
            let name = r.read_string()?;
            let descriptor = match read_kind(r)? {
                ObjectKind::Function => {
                    let signature = self.type_at(r.read_index()?)?;
                    self.function_imports.push(signature.clone());
                    ObjectDescriptor::Function(signature)
                }
                ObjectKind::Table => {
                    let signature = r.read_table_type()?;
                    self.table_imports.push(signature);
                    ObjectDescriptor::Table(signature)
                }
                ObjectKind::Memory => {
                    let signature = r.read_memory_type()?;
                    self.memory_imports.push(signature);
                    ObjectDescriptor::Memory(signature)
                }
                ObjectKind::Global => {
                    let signature = r.read_global_type()?;
                    self.global_imports.push(signature);
                    ObjectDescriptor::Global(signature)
                }
            };
            trace!(%module, %name, kind = %descriptor.kind(), "import");
            self.imports.push(ImportEntry {
                module,
                name,
                descriptor,
            });
        }
        Ok(())
    }

    fn read_functions(&mut self, r: &mut Reader<'_>) -> Result<(), ReadError> {
        let count = r.read_uleb32()?;
        for _ in 0..count {
            let signature = self.type_at(r.read_index()?)?;
            self.functions.push(signature);
        }
        Ok(())
    }

    fn read_exports(&mut self, r: &mut Reader<'_>) -> Result<(), ReadError> {
        let count = r.read_uleb32()?;
        for _ in 0..count {
            let name = r.read_string()?;
            let kind = read_kind(r)?;
            let index = r.read_index()?;
            let descriptor = self.resolve(kind, index)?;
            trace!(%name, %kind, index, "export");
            self.exports.push(ExportEntry { name, descriptor });
        }
        Ok(())
    }

    fn read_start(&mut self, r: &mut Reader<'_>) -> Result<(), ReadError> {
        let index = r.read_index()?;
        self.function(index).ok_or(ReadError::BadIndex {
            what: "start function",
            index,
        })?;
        self.start = Some(index);
        Ok(())
    }

    fn type_at(&self, index: u32) -> Result<FunctionSignature, ReadError> {
        self.types
            .get(index as usize)
            .cloned()
            .ok_or(ReadError::BadIndex { what: "type", index })
    }

    // ── Index spaces ─────────────────────────────────────────────────────

    /// Resolve an index in the combined (imports then locals) space of `kind`.
    pub fn resolve(&self, kind: ObjectKind, index: u32) -> Result<ObjectDescriptor, ReadError> {
        let descriptor = match kind {
            ObjectKind::Function => self.function(index).cloned().map(ObjectDescriptor::Function),
            ObjectKind::Table => {
                lookup(&self.table_imports, &self.tables, index).map(ObjectDescriptor::Table)
            }
            ObjectKind::Memory => {
                lookup(&self.memory_imports, &self.memories, index).map(ObjectDescriptor::Memory)
            }
            ObjectKind::Global => {
                lookup(&self.global_imports, &self.globals, index).map(ObjectDescriptor::Global)
            }
        };
        descriptor.ok_or(ReadError::BadIndex {
            what: kind_index_name(kind),
            index,
        })
    }

    pub fn function(&self, index: u32) -> Option<&FunctionSignature> {
        let index = index as usize;
        let imported = self.function_imports.len();
        if index < imported {
            self.function_imports.get(index)
        } else {
            self.functions.get(index - imported)
        }
    }

    // ── Linker views ─────────────────────────────────────────────────────

    /// Imports from the linker's symbol module.
    pub fn symbol_imports(&self) -> impl Iterator<Item = &ImportEntry> {
        self.imports.iter().filter(|i| i.is_symbol())
    }

    /// Distinct non-symbol import modules, in first-seen order.
    pub fn requirement_modules(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.imports
            .iter()
            .filter(|i| !i.is_symbol())
            .map(|i| i.module.as_str())
            .filter(|m| seen.insert(*m))
            .collect()
    }

    pub fn has_start_function(&self) -> bool {
        self.start.is_some()
    }

    /// Whether the static-constructor export must be called explicitly
    /// after instantiation.
    pub fn needs_ctor_call(&self) -> bool {
        !self.has_start_function() && self.exports.iter().any(|e| e.name == CALL_CTORS_EXPORT)
    }

    /// Names that occur more than once among symbol imports and exports,
    /// once per extra occurrence.
    pub fn duplicate_symbol_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.symbol_imports()
            .map(|i| i.name.as_str())
            .chain(self.exports.iter().map(|e| e.name.as_str()))
            .filter(|name| !seen.insert(*name))
            .map(str::to_owned)
            .collect()
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn read_vec<'a, T>(
    r: &mut Reader<'a>,
    mut item: impl FnMut(&mut Reader<'a>) -> Result<T, ReadError>,
    out: &mut Vec<T>,
) -> Result<(), ReadError> {
    let count = r.read_uleb32()?;
    for _ in 0..count {
        out.push(item(r)?);
    }
    Ok(())
}

fn read_kind(r: &mut Reader<'_>) -> Result<ObjectKind, ReadError> {
    let offset = r.offset();
    let byte = r.read_u8()?;
    ObjectKind::from_byte(byte).ok_or(ReadError::BadTag {
        what: "object kind",
        byte,
        offset,
    })
}

fn lookup<T: Copy>(imported: &[T], local: &[T], index: u32) -> Option<T> {
    let index = index as usize;
    if index < imported.len() {
        imported.get(index).copied()
    } else {
        local.get(index - imported.len()).copied()
    }
}

fn kind_index_name(kind: ObjectKind) -> &'static str {
    match kind {
        ObjectKind::Function => "function",
        ObjectKind::Table => "table",
        ObjectKind::Memory => "memory",
        ObjectKind::Global => "global",
    }
}

/// Step over a constant initializer expression up to its `end` opcode.
fn skip_const_expr(r: &mut Reader<'_>) -> Result<(), ReadError> {
    loop {
        let offset = r.offset();
        match r.read_u8()? {
            OPCODE_END => return Ok(()),
            OPCODE_GET_GLOBAL => {
                r.read_uleb32()?;
            }
            OPCODE_I32_CONST => {
                r.read_sleb32()?;
            }
            OPCODE_I64_CONST => {
                r.read_sleb64()?;
            }
            OPCODE_F32_CONST => r.skip(4)?,
            OPCODE_F64_CONST => r.skip(8)?,
            opcode => return Err(ReadError::BadConstExpr { opcode, offset }),
        }
    }
}
