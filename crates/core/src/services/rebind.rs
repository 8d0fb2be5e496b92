use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ir::CompiledFunction;
use crate::model::Address;
use crate::services::{FuncId, ModuleIndex, NameResolver, RebindError};
use crate::sigs::AddressTable;

/// What to do when two addresses resolve to the same compiled function
/// (e.g. import thunks of one symbol).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasPolicy {
    /// Emit one declaration per address; they differ only in `!addr`.
    #[default]
    Allow,
    /// Fail the run with `RebindError::AliasedFunction`.
    Reject,
}

/// One resolved address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub addr: Address,
    pub func: FuncId,
}

/// Resolves every address of a table and turns the matched functions into
/// standalone, address-stamped declarations.
pub struct Rebinder {
    resolver: NameResolver,
    policy: AliasPolicy,
}

impl Rebinder {
    pub fn new(resolver: NameResolver, policy: AliasPolicy) -> Self {
        Self { resolver, policy }
    }

    /// Resolve every address in ascending order without touching any function.
    pub fn plan(
        &self,
        table: &AddressTable,
        index: &ModuleIndex,
    ) -> Result<Vec<Binding>, RebindError> {
        let mut owners: HashMap<FuncId, (Address, &str)> = HashMap::new();
        let mut bindings = Vec::with_capacity(table.len());

        for (addr, sig) in table.iter() {
            let func = self
                .resolver
                .resolve(&sig.name, index)
                .map_err(|err| RebindError::Unresolved { addr, name: err.name })?;

            if let Some(&(first_addr, first_name)) = owners.get(&func) {
                match self.policy {
                    AliasPolicy::Reject => {
                        return Err(RebindError::AliasedFunction {
                            first_addr,
                            first_name: first_name.to_string(),
                            second_addr: addr,
                            second_name: sig.name.clone(),
                        });
                    }
                    AliasPolicy::Allow => log::warn!(
                        "{addr} ({}) resolves to the same function as {first_addr} ({first_name})",
                        sig.name
                    ),
                }
            } else {
                owners.insert(func, (addr, sig.name.as_str()));
            }
            bindings.push(Binding { addr, func });
        }

        Ok(bindings)
    }

    /// Index `functions`, resolve every address of `table`, and move each
    /// matched function out as a detached declaration carrying `!addr`.
    ///
    /// Output is in ascending address order with exactly one entry per
    /// address. On any error nothing is returned.
    pub fn rebind(
        &self,
        table: &AddressTable,
        functions: Vec<CompiledFunction>,
    ) -> Result<Vec<CompiledFunction>, RebindError> {
        let index = ModuleIndex::build(&functions)?;
        let bindings = self.plan(table, &index)?;

        let mut uses: HashMap<FuncId, usize> = HashMap::new();
        for binding in &bindings {
            *uses.entry(binding.func).or_default() += 1;
        }

        let mut arena: Vec<Option<CompiledFunction>> = functions.into_iter().map(Some).collect();
        let mut out = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let slot = &mut arena[binding.func.index()];
            // The last binding of a slot moves it; earlier aliases copy it.
            let function = match uses.get_mut(&binding.func) {
                Some(remaining) if *remaining > 1 => {
                    *remaining -= 1;
                    slot.clone()
                }
                _ => slot.take(),
            };
            if let Some(function) = function {
                let mut decl = function.detach();
                decl.stamp_address(&binding.addr.to_string());
                out.push(decl);
            }
        }

        log::info!("rebound {} declarations from {} compiled functions", out.len(), arena.len());
        Ok(out)
    }
}

impl Default for Rebinder {
    fn default() -> Self {
        Self::new(NameResolver::new(), AliasPolicy::default())
    }
}
