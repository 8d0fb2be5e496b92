use crate::ir::{CompiledFunction, OutputModule, TargetInfo, TypeDef};

/// Place rebound declarations and carried-over type definitions into a new
/// module. Order of `functions` is preserved.
pub fn assemble(
    target: TargetInfo,
    type_defs: Vec<TypeDef>,
    functions: Vec<CompiledFunction>,
) -> OutputModule {
    OutputModule { target, type_defs, functions }
}
