use std::collections::HashMap;

use crate::ir::CompiledFunction;
use crate::services::RebindError;

/// Position of a function in the compiled module's function list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncId(usize);

impl FuncId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Lookup from source-level function name to its slot.
///
/// Built once per run; names are guaranteed unique.
#[derive(Debug, Clone, Default)]
pub struct ModuleIndex {
    by_name: HashMap<String, FuncId>,
}

impl ModuleIndex {
    /// Index `functions` in order, failing on the first repeated name.
    pub fn build(functions: &[CompiledFunction]) -> Result<Self, RebindError> {
        let mut by_name = HashMap::with_capacity(functions.len());
        for (idx, function) in functions.iter().enumerate() {
            if by_name.insert(function.name.clone(), FuncId(idx)).is_some() {
                return Err(RebindError::DuplicateName { name: function.name.clone() });
            }
        }
        Ok(Self { by_name })
    }

    pub fn lookup(&self, name: &str) -> Option<FuncId> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
