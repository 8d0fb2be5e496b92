//! Minimal LLVM IR text model.
//!
//! Only the parts of a module that matter for rebinding are modelled:
//! target lines, named type definitions, function headers, opaque bodies and
//! function metadata attachments. Instruction bodies are carried as raw text
//! lines; they are never interpreted.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};

mod parse;
mod write;

pub use parse::{parse_module, IrParseError};

/// Metadata key under which the recovered address is stored.
pub const ADDR_METADATA_KEY: &str = "addr";

static NEXT_MODULE_ID: AtomicU32 = AtomicU32::new(1);

/// Identity of a parsed module; used as the owning-module back-reference of
/// its functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleId(u32);

impl ModuleId {
    /// Allocate an id that no other module in this process shares.
    pub fn fresh() -> Self {
        Self(NEXT_MODULE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// `target datalayout` / `target triple` lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetInfo {
    pub datalayout: Option<String>,
    pub triple: Option<String>,
}

/// A named type definition, e.g. `%struct.POINT = type { i32, i32 }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDef {
    /// Type name including the `%` sigil.
    pub name: String,
    /// Everything to the right of `=`, e.g. `type { i32, i32 }` or `type opaque`.
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Type and parameter attributes as written (`ptr noundef`).
    pub ty: String,
    /// Local name (`%0`), if the header named the parameter.
    pub name: Option<String>,
}

impl Param {
    pub fn new(ty: impl Into<String>) -> Self {
        Self { ty: ty.into(), name: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataNode {
    String(String),
}

/// A metadata tuple attached to a function (`!addr !0`, `!0 = !{!"0x401000"}`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub nodes: Vec<MetadataNode>,
}

impl Metadata {
    pub fn string(value: impl Into<String>) -> Self {
        Self { nodes: vec![MetadataNode::String(value.into())] }
    }

    /// The value of a single-string tuple.
    pub fn as_single_string(&self) -> Option<&str> {
        match self.nodes.as_slice() {
            [MetadataNode::String(s)] => Some(s.as_str()),
            _ => None,
        }
    }
}

/// A function declaration or definition taken from a compiled module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFunction {
    /// Source-level name, without the `@` sigil or quotes.
    pub name: String,
    /// Return type plus calling convention and return attributes
    /// (`x86_stdcallcc noundef i32`).
    pub prefix: String,
    pub params: Vec<Param>,
    pub variadic: bool,
    /// Body lines of a definition; empty for declarations.
    pub blocks: Vec<String>,
    /// Module the function was compiled into; `None` once detached.
    pub parent: Option<ModuleId>,
    pub metadata: BTreeMap<String, Metadata>,
}

impl CompiledFunction {
    pub fn declaration(name: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
            params: Vec::new(),
            variadic: false,
            blocks: Vec::new(),
            parent: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Drop the body and the owning-module reference, keeping only the
    /// declaration shape.
    pub fn detach(mut self) -> Self {
        self.parent = None;
        self.blocks = Vec::new();
        self
    }

    /// Replace all metadata with a single `!addr` string.
    pub fn stamp_address(&mut self, addr: &str) {
        self.metadata = BTreeMap::new();
        self.metadata.insert(ADDR_METADATA_KEY.to_string(), Metadata::string(addr));
    }

    /// The `!addr` string, if present and well-formed.
    pub fn address_metadata(&self) -> Option<&str> {
        self.metadata.get(ADDR_METADATA_KEY).and_then(Metadata::as_single_string)
    }
}

/// Module produced by compiling a header.
#[derive(Debug, Clone)]
pub struct CompiledModule {
    pub id: ModuleId,
    pub target: TargetInfo,
    pub type_defs: Vec<TypeDef>,
    pub functions: Vec<CompiledFunction>,
}

impl CompiledModule {
    pub fn new() -> Self {
        Self {
            id: ModuleId::fresh(),
            target: TargetInfo::default(),
            type_defs: Vec::new(),
            functions: Vec::new(),
        }
    }

    /// Add a function owned by this module.
    pub fn push_function(&mut self, mut function: CompiledFunction) {
        function.parent = Some(self.id);
        self.functions.push(function);
    }
}

impl Default for CompiledModule {
    fn default() -> Self {
        Self::new()
    }
}

/// Self-contained module of rebound declarations, ready for emission.
///
/// `Display` renders it as LLVM IR text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputModule {
    pub target: TargetInfo,
    pub type_defs: Vec<TypeDef>,
    pub functions: Vec<CompiledFunction>,
}
