//! h2ll-core
//!
//! Core library for rebinding recovered function addresses to declarations
//! compiled from a C header.
//!
//! This crate defines the address/signature model, a small LLVM IR text layer,
//! the name-resolution and rebinding engine, and the compiler capability used
//! to turn header source into IR.
//!
//! All substantive logic lives here so it is fully testable without invoking
//! an external compiler; the CLI is a thin frontend.

pub mod model;
pub mod ir;
pub mod sigs;
pub mod services;
pub mod compiler;
pub mod config;

/// Returns the library version as encoded at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
