use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::compiler::{CompileError, HeaderCompiler};
use crate::config::CompilerConfig;
use crate::ir::{parse_module, CompiledModule};

/// Arguments for a 32-bit C compile of stdin to LLVM IR text on stdout.
pub const DEFAULT_CLANG_ARGS: &[&str] = &[
    "-m32",
    "-S",
    "-emit-llvm",
    "-x",
    "c",
    "-Wno-return-type",
    "-Wno-invalid-noreturn",
    "-o",
    "-",
    "-",
];

/// When set, names a file whose contents are used instead of running clang.
pub const FAKE_IR_ENV: &str = "H2LL_FAKE_IR";

/// Clang-backed compiler that pipes the header through `clang -emit-llvm`.
#[derive(Debug, Clone)]
pub struct ClangCompiler {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ClangCompiler {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), args: CompilerConfig::default().args }
    }

    /// Configured program, else `CLANG_BIN`, else `clang` on `PATH`.
    pub fn from_config(config: &CompilerConfig) -> Self {
        let program = config.program.clone().unwrap_or_else(resolve_clang_path);
        Self { program, args: config.args.clone() }
    }

    fn run(&self, source: &str) -> Result<String, CompileError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CompileError::Spawn { program: self.program.clone(), source })?;

        // Feed stdin from a separate thread so a large header cannot deadlock
        // against a full stdout pipe.
        let writer = child.stdin.take().map(|mut stdin| {
            let input = source.to_string();
            std::thread::spawn(move || stdin.write_all(input.as_bytes()))
        });

        let output = child.wait_with_output()?;
        if let Some(handle) = writer {
            match handle.join() {
                Ok(result) => result?,
                Err(_) => {
                    return Err(CompileError::Io(std::io::Error::other("stdin writer panicked")))
                }
            }
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(CompileError::Failed {
                program: self.program.clone(),
                status: output.status,
                stderr,
            });
        }
        for line in stderr.lines() {
            log::warn!("{}: {line}", self.program.display());
        }
        String::from_utf8(output.stdout).map_err(|_| CompileError::NonUtf8Output)
    }
}

impl Default for ClangCompiler {
    fn default() -> Self {
        Self::new(resolve_clang_path())
    }
}

impl HeaderCompiler for ClangCompiler {
    fn compile(&self, source: &str) -> Result<CompiledModule, CompileError> {
        // Allow tests to feed pre-built IR via env to avoid needing clang installed.
        let ir = if let Some(fake) = std::env::var_os(FAKE_IR_ENV) {
            let path = PathBuf::from(fake);
            log::info!("using substitute IR from {}", path.display());
            std::fs::read_to_string(&path)
                .map_err(|source| CompileError::FakeOutput { path, source })?
        } else {
            log::info!("compiling header ({} bytes) with {}", source.len(), self.program.display());
            self.run(source)?
        };
        Ok(parse_module(&ir)?)
    }

    fn name(&self) -> &'static str {
        "clang"
    }
}

pub fn resolve_clang_path() -> PathBuf {
    std::env::var_os("CLANG_BIN").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("clang"))
}
