use std::collections::{BTreeMap, HashSet};
use std::fmt;

use thiserror::Error;

use crate::services::{FuncId, ModuleIndex};

/// Prefix IDA puts on imported symbols (`__imp_ExitProcess`).
pub const IMPORT_PREFIX: &str = "__imp_";

/// Mangled C++ names with a known C-level helper in the headers.
pub const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("??1type_info@@UAE@XZ", "type_info_create"),
    ("??_Gtype_info@@UAEPAXI@Z", "type_info_delete"),
];

/// Capability that maps a mangled symbol to the name it is declared under.
pub trait Demangler: Send + Sync {
    fn alias<'a>(&'a self, name: &str) -> Option<&'a str>;
}

/// Literal mangled-name → helper-name table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTable {
    aliases: BTreeMap<String, String>,
}

impl AliasTable {
    /// Table holding only [`BUILTIN_ALIASES`].
    pub fn builtin() -> Self {
        let aliases =
            BUILTIN_ALIASES.iter().map(|(from, to)| (from.to_string(), to.to_string())).collect();
        Self { aliases }
    }

    pub fn empty() -> Self {
        Self { aliases: BTreeMap::new() }
    }

    /// Builder-style helper to add (or override) one alias.
    pub fn with_alias(mut self, mangled: impl Into<String>, name: impl Into<String>) -> Self {
        self.aliases.insert(mangled.into(), name.into());
        self
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Extend<(String, String)> for AliasTable {
    fn extend<I: IntoIterator<Item = (String, String)>>(&mut self, iter: I) {
        self.aliases.extend(iter);
    }
}

impl Demangler for AliasTable {
    fn alias<'a>(&'a self, name: &str) -> Option<&'a str> {
        self.aliases.get(name).map(String::as_str)
    }
}

/// No rewrite of the requested name matched any compiled function.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unable to locate function {name:?}")]
pub struct UnresolvedName {
    pub name: String,
}

#[derive(Debug, Clone, Copy)]
enum Rule {
    ImportPrefix,
    LeadingUnderscore,
    Alias,
    DecorationSuffix,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Rule::ImportPrefix => "import prefix",
            Rule::LeadingUnderscore => "leading underscore",
            Rule::Alias => "alias",
            Rule::DecorationSuffix => "decoration suffix",
        };
        f.write_str(label)
    }
}

/// Maps disassembler symbol names onto compiled header names.
///
/// Rules, tried in order, each recursing on the rewritten name:
/// 1. exact match;
/// 2. strip `__imp_`;
/// 3. strip one leading `_`;
/// 4. demangler alias (`??1type_info@@UAE@XZ` → `type_info_create`);
/// 5. truncate at the first `@` (`_WinMain@16` → `_WinMain`).
///
/// A rewrite whose recursion fails falls through to the next rule. Matching is
/// exact and case-sensitive.
pub struct NameResolver {
    demangler: Box<dyn Demangler>,
}

impl NameResolver {
    pub fn new() -> Self {
        Self::with_demangler(AliasTable::builtin())
    }

    pub fn with_demangler<D: Demangler + 'static>(demangler: D) -> Self {
        Self { demangler: Box::new(demangler) }
    }

    pub fn resolve(&self, requested: &str, index: &ModuleIndex) -> Result<FuncId, UnresolvedName> {
        let mut tried = HashSet::new();
        self.locate(requested, index, &mut tried)
            .ok_or_else(|| UnresolvedName { name: requested.to_string() })
    }

    fn locate(&self, name: &str, index: &ModuleIndex, tried: &mut HashSet<String>) -> Option<FuncId> {
        // Each name is attempted once; revisits are either known failures or
        // alias cycles.
        if !tried.insert(name.to_string()) {
            return None;
        }
        if let Some(id) = index.lookup(name) {
            return Some(id);
        }
        if let Some(rest) = name.strip_prefix(IMPORT_PREFIX) {
            if let Some(id) = self.rewrite(Rule::ImportPrefix, name, rest, index, tried) {
                return Some(id);
            }
        }
        if let Some(rest) = name.strip_prefix('_') {
            if let Some(id) = self.rewrite(Rule::LeadingUnderscore, name, rest, index, tried) {
                return Some(id);
            }
        }
        if let Some(alias) = self.demangler.alias(name) {
            if let Some(id) = self.rewrite(Rule::Alias, name, alias, index, tried) {
                return Some(id);
            }
        }
        if let Some(pos) = name.find('@') {
            if let Some(id) = self.rewrite(Rule::DecorationSuffix, name, &name[..pos], index, tried)
            {
                return Some(id);
            }
        }
        None
    }

    fn rewrite(
        &self,
        rule: Rule,
        from: &str,
        to: &str,
        index: &ModuleIndex,
        tried: &mut HashSet<String>,
    ) -> Option<FuncId> {
        let found = self.locate(to, index, tried);
        if found.is_some() {
            log::debug!("{from:?} -> {to:?} ({rule})");
        }
        found
    }
}

impl Default for NameResolver {
    fn default() -> Self {
        Self::new()
    }
}
