//! Run configuration.
//!
//! Every field has a default, so an empty file (or no file) is valid. Files
//! ending in `.yaml`/`.yml` are read as YAML, anything else as JSON.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::compiler::DEFAULT_CLANG_ARGS;
use crate::services::{AliasPolicy, AliasTable, NameResolver, Rebinder};

/// How to invoke the header compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Explicit compiler path. When absent, `CLANG_BIN` or `clang` is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<PathBuf>,
    pub args: Vec<String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self { program: None, args: DEFAULT_CLANG_ARGS.iter().map(|a| a.to_string()).collect() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct H2llConfig {
    pub compiler: CompilerConfig,
    /// Policy for several addresses resolving to one function.
    pub aliasing: AliasPolicy,
    /// Extra mangled-name → header-name aliases, on top of the built-ins.
    pub aliases: BTreeMap<String, String>,
}

impl H2llConfig {
    /// Alias table with built-ins plus configured extras (extras win).
    pub fn alias_table(&self) -> AliasTable {
        let mut table = AliasTable::builtin();
        table.extend(self.aliases.iter().map(|(k, v)| (k.clone(), v.clone())));
        table
    }

    pub fn rebinder(&self) -> Rebinder {
        Rebinder::new(NameResolver::with_demangler(self.alias_table()), self.aliasing)
    }
}

/// Load a configuration file from disk.
pub fn load_config(path: &Path) -> Result<H2llConfig> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config at {}", path.display()))?;
    let is_yaml =
        matches!(path.extension().and_then(|e| e.to_str()), Some("yaml") | Some("yml"));
    let config = if is_yaml {
        serde_yaml::from_str(&body).context("Failed to parse config YAML")?
    } else {
        serde_json::from_str(&body).context("Failed to parse config JSON")?
    };
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let config: H2llConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, H2llConfig::default());
        assert_eq!(config.compiler.args.first().map(String::as_str), Some("-m32"));
        assert_eq!(config.aliasing, AliasPolicy::Allow);
    }

    #[test]
    fn configured_aliases_extend_builtins() {
        let config: H2llConfig =
            serde_json::from_str(r#"{"aliases": {"??0Foo@@QAE@XZ": "Foo_ctor"}}"#).unwrap();
        assert_eq!(config.alias_table().len(), 3);
    }
}
