use std::path::{Path, PathBuf};

use h2ll::commands::{effective_config, render_declarations, ConvertOptions};
use h2ll_core::services::AliasPolicy;
use tempfile::tempdir;

fn options(dir: &Path) -> ConvertOptions {
    ConvertOptions {
        header: dir.join("api.h"),
        sigs: dir.join("sigs.json"),
        output: None,
        config: None,
        compiler: None,
        reject_aliasing: false,
    }
}

#[test]
fn cli_flags_override_config_file() {
    let temp = tempdir().unwrap();
    let config_path = temp.path().join("h2ll.json");
    std::fs::write(&config_path, r#"{"compiler": {"program": "/usr/bin/clang-15"}}"#).unwrap();

    let mut opts = options(temp.path());
    opts.config = Some(config_path);
    let config = effective_config(&opts).unwrap();
    assert_eq!(config.compiler.program, Some(PathBuf::from("/usr/bin/clang-15")));
    assert_eq!(config.aliasing, AliasPolicy::Allow);

    opts.compiler = Some(PathBuf::from("/opt/llvm/bin/clang"));
    opts.reject_aliasing = true;
    let config = effective_config(&opts).unwrap();
    assert_eq!(config.compiler.program, Some(PathBuf::from("/opt/llvm/bin/clang")));
    assert_eq!(config.aliasing, AliasPolicy::Reject);
}

#[test]
fn missing_sigs_file_fails_before_compiling() {
    let temp = tempdir().unwrap();
    let err = render_declarations(&options(temp.path())).unwrap_err();
    assert!(err.to_string().contains("Failed to load signatures"), "unexpected error: {err}");
}

#[test]
fn missing_header_is_reported() {
    let temp = tempdir().unwrap();
    std::fs::write(temp.path().join("sigs.json"), "{}").unwrap();
    let err = render_declarations(&options(temp.path())).unwrap_err();
    assert!(err.to_string().contains("Failed to read header"), "unexpected error: {err}");
}
