//! Header compilers: turn C header source into a parsed IR module.
//!
//! The engine only needs the [`HeaderCompiler`] capability, so tests can supply
//! a module directly instead of invoking an external tool.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use crate::ir::{CompiledModule, IrParseError};

mod clang;

pub use clang::{resolve_clang_path, ClangCompiler, DEFAULT_CLANG_ARGS, FAKE_IR_ENV};

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Failed to spawn compiler {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while talking to compiler: {0}")]
    Io(#[from] std::io::Error),

    #[error("Compiler {program} exited with {status}: {stderr}")]
    Failed { program: PathBuf, status: ExitStatus, stderr: String },

    #[error("Compiler output is not valid UTF-8")]
    NonUtf8Output,

    #[error("Failed to read substitute IR from {path}: {source}")]
    FakeOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] IrParseError),
}

/// Trait implemented by anything that can compile header source to IR.
pub trait HeaderCompiler: Send + Sync {
    fn compile(&self, source: &str) -> Result<CompiledModule, CompileError>;
    fn name(&self) -> &'static str;
}
