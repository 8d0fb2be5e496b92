use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use h2ll::commands::{convert_command, ConvertOptions};

/// Convert C headers to LLVM IR function declarations (*.h -> *.ll).
///
/// Each address in the signature file is matched to a function compiled from
/// the header, and emitted as a declaration annotated with `!addr`.
#[derive(Parser, Debug)]
#[command(
    name = "h2ll",
    version,
    about = "Convert C headers to LLVM IR function declarations",
    long_about = None
)]
struct Cli {
    /// C header declaring the functions.
    header: PathBuf,

    /// JSON file with function signatures (address -> {name, sig}).
    #[arg(long, default_value = "sigs.json")]
    sigs: PathBuf,

    /// Output path. Defaults to stdout.
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Optional JSON or YAML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Compiler executable (overrides config and CLANG_BIN).
    #[arg(long)]
    compiler: Option<PathBuf>,

    /// Fail when two addresses resolve to the same function.
    #[arg(long, default_value_t = false)]
    reject_aliasing: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    convert_command(&ConvertOptions {
        header: cli.header,
        sigs: cli.sigs,
        output: cli.output,
        config: cli.config,
        compiler: cli.compiler,
        reject_aliasing: cli.reject_aliasing,
    })
}
