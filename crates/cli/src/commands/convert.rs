use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use h2ll_core::compiler::{ClangCompiler, HeaderCompiler};
use h2ll_core::config::{load_config, H2llConfig};
use h2ll_core::services::{convert_module, AliasPolicy};
use h2ll_core::sigs::load_sigs;

/// Inputs of a header → declarations conversion.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub header: PathBuf,
    pub sigs: PathBuf,
    pub output: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub compiler: Option<PathBuf>,
    pub reject_aliasing: bool,
}

/// Merge the optional config file with command-line overrides.
pub fn effective_config(opts: &ConvertOptions) -> Result<H2llConfig> {
    let mut config = match &opts.config {
        Some(path) => load_config(path)?,
        None => H2llConfig::default(),
    };
    if let Some(compiler) = &opts.compiler {
        config.compiler.program = Some(compiler.clone());
    }
    if opts.reject_aliasing {
        config.aliasing = AliasPolicy::Reject;
    }
    Ok(config)
}

/// Produce the LLVM IR text of the rebound declarations.
pub fn render_declarations(opts: &ConvertOptions) -> Result<String> {
    let config = effective_config(opts)?;

    let table = load_sigs(&opts.sigs)
        .with_context(|| format!("Failed to load signatures from {}", opts.sigs.display()))?;
    let header = fs::read_to_string(&opts.header)
        .with_context(|| format!("Failed to read header {}", opts.header.display()))?;

    let compiler = ClangCompiler::from_config(&config.compiler);
    let module = compiler
        .compile(&header)
        .with_context(|| format!("Failed to compile header {}", opts.header.display()))?;
    log::info!(
        "{} produced {} functions, {} type definitions",
        compiler.name(),
        module.functions.len(),
        module.type_defs.len()
    );

    let output = convert_module(&config.rebinder(), &table, module)
        .context("Failed to rebind function declarations")?;
    Ok(output.to_string())
}

/// Convert a header and write the declarations to the output path or stdout.
///
/// The output file is only created once the whole module has been produced.
pub fn convert_command(opts: &ConvertOptions) -> Result<()> {
    let text = render_declarations(opts)?;
    match &opts.output {
        Some(path) => fs::write(path, text)
            .with_context(|| format!("Failed to write output {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes()).context("Failed to write to stdout")?;
            stdout.flush().context("Failed to write to stdout")?;
        }
    }
    Ok(())
}
