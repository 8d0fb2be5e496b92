//! Resolution and rebinding engine.
//!
//! - `index`: name → arena slot lookup over a compiled module's functions.
//! - `resolver`: decoration-stripping rule chain from recovered names to slots.
//! - `rebind`: per-address resolution and ownership transfer of declarations.
//! - `assemble`: placement of rebound declarations into an output module.

use thiserror::Error;

use crate::ir::{CompiledModule, OutputModule};
use crate::model::Address;
use crate::sigs::AddressTable;

pub mod assemble;
pub mod index;
pub mod rebind;
pub mod resolver;

pub use assemble::assemble;
pub use index::{FuncId, ModuleIndex};
pub use rebind::{AliasPolicy, Binding, Rebinder};
pub use resolver::{AliasTable, Demangler, NameResolver, UnresolvedName};

/// Error type for resolution and rebinding.
///
/// Every variant is fatal for the run; no partial output is produced.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RebindError {
    /// Two functions in the compiled module share a name.
    #[error("Function name {name:?} already present in compiled module")]
    DuplicateName { name: String },

    /// No rewrite of the recovered name matches a compiled function.
    #[error("Unable to locate function {name:?} (address {addr})")]
    Unresolved { addr: Address, name: String },

    /// Two addresses resolve to the same compiled function and aliasing is
    /// rejected by configuration.
    #[error(
        "Addresses {first_addr} ({first_name:?}) and {second_addr} ({second_name:?}) resolve to the same function"
    )]
    AliasedFunction {
        first_addr: Address,
        first_name: String,
        second_addr: Address,
        second_name: String,
    },
}

/// Run the whole engine over a compiled module: index, resolve, rebind and
/// assemble.
///
/// The module's target lines and type definitions are carried over; its
/// functions are consumed.
pub fn convert_module(
    rebinder: &Rebinder,
    table: &AddressTable,
    module: CompiledModule,
) -> Result<OutputModule, RebindError> {
    let CompiledModule { target, type_defs, functions, .. } = module;
    let functions = rebinder.rebind(table, functions)?;
    Ok(assemble(target, type_defs, functions))
}
