//! WebAssembly object descriptors.
//!
//! A descriptor records the kind of a Wasm import or export together with
//! its structural signature. The linker attaches one to every symbol that
//! crosses the Wasm boundary so the assembler knows whether to wrap it as a
//! function, hand it over by reference, or synthesize a memory for it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A Wasm value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValType {
    I32,
    I64,
    F32,
    F64,
}

impl ValType {
    /// Decode a value-type byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x7f => Some(Self::I32),
            0x7e => Some(Self::I64),
            0x7d => Some(Self::F32),
            0x7c => Some(Self::F64),
            _ => None,
        }
    }
}

impl fmt::Display for ValType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I32 => write!(f, "i32"),
            Self::I64 => write!(f, "i64"),
            Self::F32 => write!(f, "f32"),
            Self::F64 => write!(f, "f64"),
        }
    }
}

/// A table element type. The MVP only knows `anyfunc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElemType {
    AnyFunc,
}

impl ElemType {
    /// Decode an element-type byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x70 => Some(Self::AnyFunc),
            _ => None,
        }
    }
}

/// Size limits of a table or memory, in elements or 64 KiB pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Limits {
    pub min: u32,
    pub max: Option<u32>,
}

impl Limits {
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub params: Vec<ValType>,
    pub results: Vec<ValType>,
}

impl FunctionSignature {
    pub fn new(params: Vec<ValType>, results: Vec<ValType>) -> Self {
        Self { params, results }
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |tys: &[ValType]| {
            tys.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(f, "({}) -> ({})", join(&self.params), join(&self.results))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableSignature {
    pub elem_type: ElemType,
    pub limits: Limits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemorySignature {
    pub limits: Limits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GlobalSignature {
    pub val_type: ValType,
    pub mutable: bool,
}

/// The kind byte of an import or export entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Function,
    Table,
    Memory,
    Global,
}

impl ObjectKind {
    /// Decode an external-kind byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Function),
            0x01 => Some(Self::Table),
            0x02 => Some(Self::Memory),
            0x03 => Some(Self::Global),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function => write!(f, "function"),
            Self::Table => write!(f, "table"),
            Self::Memory => write!(f, "memory"),
            Self::Global => write!(f, "global"),
        }
    }
}

/// A Wasm object kind together with its full signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ObjectDescriptor {
    Function(FunctionSignature),
    Table(TableSignature),
    Memory(MemorySignature),
    Global(GlobalSignature),
}

impl ObjectDescriptor {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Function(_) => ObjectKind::Function,
            Self::Table(_) => ObjectKind::Table,
            Self::Memory(_) => ObjectKind::Memory,
            Self::Global(_) => ObjectKind::Global,
        }
    }

    /// The memory limits, if this describes a memory.
    pub fn memory_limits(&self) -> Option<Limits> {
        match self {
            Self::Memory(sig) => Some(sig.limits),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_val_type_bytes() {
        assert_eq!(ValType::from_byte(0x7f), Some(ValType::I32));
        assert_eq!(ValType::from_byte(0x7c), Some(ValType::F64));
        assert_eq!(ValType::from_byte(0x7b), None);
    }

    #[test]
    fn test_object_kind_bytes() {
        assert_eq!(ObjectKind::from_byte(0), Some(ObjectKind::Function));
        assert_eq!(ObjectKind::from_byte(3), Some(ObjectKind::Global));
        assert_eq!(ObjectKind::from_byte(4), None);
    }

    #[test]
    fn test_signature_display() {
        let sig = FunctionSignature::new(vec![ValType::I32, ValType::F64], vec![ValType::I64]);
        assert_eq!(sig.to_string(), "(i32, f64) -> (i64)");
        assert_eq!(FunctionSignature::default().to_string(), "() -> ()");
    }

    #[test]
    fn test_memory_limits_only_for_memories() {
        let mem = ObjectDescriptor::Memory(MemorySignature {
            limits: Limits::new(2, Some(16)),
        });
        assert_eq!(mem.kind(), ObjectKind::Memory);
        assert_eq!(mem.memory_limits(), Some(Limits::new(2, Some(16))));

        let global = ObjectDescriptor::Global(GlobalSignature {
            val_type: ValType::I32,
            mutable: false,
        });
        assert_eq!(global.memory_limits(), None);
    }
}
