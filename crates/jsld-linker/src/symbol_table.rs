//! The symbol table.
//!
//! Symbols are created lazily on first mention, by definition or by
//! reference, and keep their first-seen order. A symbol is defined at most
//! once and carries at most one Wasm object descriptor.

use std::collections::HashMap;
use std::fmt;

use jsld_types::{ErrorCode, Limits, LinkError, ObjectDescriptor, ObjectKind, Result};
use tracing::{debug, trace};

/// A memory the linker creates at runtime for an unsatisfied memory import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryDefinition {
    pub name: String,
    pub limits: Limits,
}

/// Where a symbol's definition came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Definition {
    /// Exported by a symbols file.
    Js { file: String },
    /// Exported by the Wasm module.
    Wasm { file: String },
    /// Synthesized by the linker.
    Memory(MemoryDefinition),
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Js { file } | Self::Wasm { file } => write!(f, "{file}"),
            Self::Memory(_) => write!(f, "<linker-provided memory>"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    name: String,
    used: bool,
    definition: Option<Definition>,
    descriptor: Option<ObjectDescriptor>,
}

impl Symbol {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            used: false,
            definition: None,
            descriptor: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_used(&self) -> bool {
        self.used
    }

    pub fn is_defined(&self) -> bool {
        self.definition.is_some()
    }

    pub fn definition(&self) -> Option<&Definition> {
        self.definition.as_ref()
    }

    pub fn descriptor(&self) -> Option<&ObjectDescriptor> {
        self.descriptor.as_ref()
    }
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    by_name: HashMap<String, SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&mut self, name: &str) -> SymbolId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = SymbolId(self.symbols.len());
        self.symbols.push(Symbol::new(name));
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Attach `definition` to `name`, creating the symbol if needed.
    ///
    /// Fails if the symbol already has a definition; the error names both
    /// sources.
    pub fn add_defined(&mut self, name: &str, definition: Definition) -> Result<SymbolId> {
        let id = self.intern(name);
        let symbol = &mut self.symbols[id.0];
        if let Some(existing) = &symbol.definition {
            return Err(LinkError::new(
                ErrorCode::DUPLICATE_SYMBOL,
                format!("symbol '{name}' from {definition} is already defined in {existing}"),
            )
            .for_symbol(name)
            .with_items([existing.to_string(), definition.to_string()]));
        }
        trace!(symbol = name, source = %definition, "defined");
        symbol.definition = Some(definition);
        Ok(id)
    }

    /// Look up `name`, creating an undefined, unused symbol if absent.
    pub fn add_undefined(&mut self, name: &str) -> SymbolId {
        self.intern(name)
    }

    /// Idempotent; a used symbol never becomes unused.
    pub fn mark_used(&mut self, id: SymbolId) {
        self.symbols[id.0].used = true;
    }

    pub fn is_used(&self, name: &str) -> bool {
        self.get(name).is_some_and(Symbol::is_used)
    }

    pub fn set_descriptor(&mut self, id: SymbolId, descriptor: ObjectDescriptor) -> Result<()> {
        let symbol = &mut self.symbols[id.0];
        if let Some(existing) = &symbol.descriptor {
            return Err(LinkError::new(
                ErrorCode::DESCRIPTOR_CONFLICT,
                format!(
                    "symbol '{}' already has a {} descriptor, cannot attach a {} descriptor",
                    symbol.name,
                    existing.kind(),
                    descriptor.kind()
                ),
            )
            .for_symbol(symbol.name.clone()));
        }
        symbol.descriptor = Some(descriptor);
        Ok(())
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0]
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.by_name.get(name).map(|id| &self.symbols[id.0])
    }

    /// All symbols, in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(Symbol::name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Define every still-undefined memory symbol as a linker-provided
    /// memory with the limits its import declared.
    pub fn provide_undefined_memories(&mut self) -> Vec<MemoryDefinition> {
        let mut provided = Vec::new();
        for symbol in &mut self.symbols {
            if symbol.definition.is_some() {
                continue;
            }
            let Some(descriptor) = &symbol.descriptor else {
                continue;
            };
            if descriptor.kind() != ObjectKind::Memory {
                continue;
            }
            let Some(limits) = descriptor.memory_limits() else {
                continue;
            };
            let memory = MemoryDefinition {
                name: symbol.name.clone(),
                limits,
            };
            debug!(symbol = %memory.name, min = limits.min, max = ?limits.max, "providing memory");
            symbol.definition = Some(Definition::Memory(memory.clone()));
            provided.push(memory);
        }
        provided
    }

    /// Fail listing every symbol that still has no definition.
    pub fn report_undefined(&self) -> Result<()> {
        let undefined: Vec<&str> = self
            .symbols
            .iter()
            .filter(|s| !s.is_defined())
            .map(Symbol::name)
            .collect();
        if undefined.is_empty() {
            return Ok(());
        }
        Err(LinkError::new(
            ErrorCode::UNDEFINED_SYMBOL,
            format!("{} undefined symbol(s)", undefined.len()),
        )
        .with_items(undefined))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsld_types::{FunctionSignature, MemorySignature};

    fn js(file: &str) -> Definition {
        Definition::Js { file: file.into() }
    }

    fn memory(min: u32, max: Option<u32>) -> ObjectDescriptor {
        ObjectDescriptor::Memory(MemorySignature {
            limits: Limits::new(min, max),
        })
    }

    #[test]
    fn references_create_symbols_lazily() {
        let mut table = SymbolTable::new();
        let id = table.add_undefined("helper");
        assert_eq!(table.add_undefined("helper"), id);
        let symbol = table.symbol(id);
        assert!(!symbol.is_used());
        assert!(!symbol.is_defined());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn definition_after_reference_is_the_same_symbol() {
        let mut table = SymbolTable::new();
        let referenced = table.add_undefined("helper");
        table.mark_used(referenced);
        let defined = table.add_defined("helper", js("a.js")).unwrap();
        assert_eq!(referenced, defined);
        assert!(table.is_used("helper"));
        assert!(table.symbol(defined).is_defined());
    }

    #[test]
    fn second_definition_names_both_sources() {
        let mut table = SymbolTable::new();
        table.add_defined("config", js("a.js")).unwrap();
        let err = table
            .add_defined("config", Definition::Wasm { file: "b.wasm".into() })
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DUPLICATE_SYMBOL);
        assert_eq!(err.symbol.as_deref(), Some("config"));
        assert!(err.message.contains("a.js"));
        assert!(err.message.contains("b.wasm"));
        assert_eq!(err.items, vec!["a.js", "b.wasm"]);
    }

    #[test]
    fn mark_used_is_idempotent() {
        let mut table = SymbolTable::new();
        let id = table.add_undefined("x");
        table.mark_used(id);
        table.mark_used(id);
        assert!(table.is_used("x"));
        assert!(!table.is_used("missing"));
    }

    #[test]
    fn descriptor_is_set_once() {
        let mut table = SymbolTable::new();
        let id = table.add_undefined("f");
        let function = ObjectDescriptor::Function(FunctionSignature::default());
        table.set_descriptor(id, function.clone()).unwrap();
        assert_eq!(table.symbol(id).descriptor(), Some(&function));
        let err = table.set_descriptor(id, memory(1, None)).unwrap_err();
        assert_eq!(err.code, ErrorCode::DESCRIPTOR_CONFLICT);
    }

    #[test]
    fn undefined_memories_are_provided() {
        let mut table = SymbolTable::new();
        let mem = table.add_undefined("memory");
        table.set_descriptor(mem, memory(2, Some(16))).unwrap();
        let defined_mem = table.add_defined("heap", js("heap.js")).unwrap();
        table.set_descriptor(defined_mem, memory(1, None)).unwrap();
        table.add_undefined("puts");

        let provided = table.provide_undefined_memories();
        assert_eq!(
            provided,
            vec![MemoryDefinition {
                name: "memory".into(),
                limits: Limits::new(2, Some(16)),
            }]
        );
        assert!(matches!(
            table.get("memory").and_then(Symbol::definition),
            Some(Definition::Memory(_))
        ));
        assert!(table.provide_undefined_memories().is_empty());

        let err = table.report_undefined().unwrap_err();
        assert_eq!(err.code, ErrorCode::UNDEFINED_SYMBOL);
        assert_eq!(err.items, vec!["puts"]);
    }

    #[test]
    fn report_undefined_lists_all_in_order() {
        let mut table = SymbolTable::new();
        table.add_undefined("b");
        table.add_defined("c", js("c.js")).unwrap();
        table.add_undefined("a");
        let err = table.report_undefined().unwrap_err();
        assert_eq!(err.items, vec!["b", "a"]);

        let mut table = SymbolTable::new();
        table.add_defined("c", js("c.js")).unwrap();
        assert!(table.report_undefined().is_ok());
    }
}
