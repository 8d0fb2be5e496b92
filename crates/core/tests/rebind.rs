use h2ll_core::ir::{CompiledFunction, CompiledModule, Param};
use h2ll_core::model::{Address, FuncSig};
use h2ll_core::services::{AliasPolicy, NameResolver, RebindError, Rebinder};
use h2ll_core::sigs::AddressTable;

/// Module with a defined `WinMain`, declared `ExitProcess` and `crt_cpp_init`.
fn compiled() -> CompiledModule {
    let mut module = CompiledModule::new();
    let mut win_main = CompiledFunction::declaration("WinMain", "x86_stdcallcc i32");
    win_main.params = vec![Param::new("ptr noundef"), Param::new("i32 noundef")];
    win_main.blocks = vec!["  ret i32 0".to_string()];
    module.push_function(win_main);
    let mut exit = CompiledFunction::declaration("ExitProcess", "void");
    exit.params = vec![Param::new("i32 noundef")];
    module.push_function(exit);
    module.push_function(CompiledFunction::declaration("crt_cpp_init", "void"));
    module
}

fn table(entries: &[(u64, &str)]) -> AddressTable {
    entries.iter().map(|(addr, name)| (Address(*addr), FuncSig::new(*name, ""))).collect()
}

#[test]
fn output_follows_ascending_address_order() {
    let sigs = table(&[(0x403000, "_crt_cpp_init"), (0x401000, "_WinMain@16"), (0x402000, "__imp_ExitProcess")]);
    let out = Rebinder::default().rebind(&sigs, compiled().functions).expect("rebind");

    let names: Vec<&str> = out.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["WinMain", "ExitProcess", "crt_cpp_init"]);
    let addrs: Vec<&str> = out.iter().filter_map(|f| f.address_metadata()).collect();
    assert_eq!(addrs, ["0x401000", "0x402000", "0x403000"]);
}

#[test]
fn rebinding_is_deterministic() {
    let sigs = table(&[(0x20, "__imp_ExitProcess"), (0x10, "_WinMain@16")]);
    let first = Rebinder::default().rebind(&sigs, compiled().functions).unwrap();
    let second = Rebinder::default().rebind(&sigs, compiled().functions).unwrap();
    assert_eq!(first, second);
}

#[test]
fn every_output_function_is_detached() {
    let sigs = table(&[(0x10, "_WinMain@16"), (0x20, "ExitProcess")]);
    let out = Rebinder::default().rebind(&sigs, compiled().functions).unwrap();
    assert_eq!(out.len(), sigs.len());
    for function in &out {
        assert!(function.blocks.is_empty(), "{} kept its body", function.name);
        assert!(function.parent.is_none(), "{} kept its owner", function.name);
        assert_eq!(function.metadata.len(), 1);
    }
    // Declaration shape survives.
    assert_eq!(out[0].prefix, "x86_stdcallcc i32");
    assert_eq!(out[0].params.len(), 2);
}

#[test]
fn one_unresolved_address_fails_the_whole_run() {
    let sigs = table(&[(0x10, "_WinMain@16"), (0x20, "totally_unknown"), (0x30, "ExitProcess")]);
    let err = Rebinder::default().rebind(&sigs, compiled().functions).unwrap_err();
    assert_eq!(
        err,
        RebindError::Unresolved { addr: Address(0x20), name: "totally_unknown".to_string() }
    );
    assert!(err.to_string().contains("0x20"));
}

#[test]
fn duplicate_compiled_names_abort_before_resolution() {
    let functions = vec![
        CompiledFunction::declaration("f", "void"),
        CompiledFunction::declaration("f", "i32"),
    ];
    // The unresolvable entry proves resolution never starts.
    let sigs = table(&[(0x10, "missing")]);
    let err = Rebinder::default().rebind(&sigs, functions).unwrap_err();
    assert_eq!(err, RebindError::DuplicateName { name: "f".to_string() });
}

#[test]
fn aliasing_allowed_yields_one_declaration_per_address() {
    let sigs = table(&[(0x10, "ExitProcess"), (0x20, "__imp_ExitProcess")]);
    let out = Rebinder::new(NameResolver::new(), AliasPolicy::Allow)
        .rebind(&sigs, compiled().functions)
        .unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].name, out[1].name);
    assert_eq!(out[0].params, out[1].params);
    assert_eq!(out[0].address_metadata(), Some("0x10"));
    assert_eq!(out[1].address_metadata(), Some("0x20"));
}

#[test]
fn aliasing_rejected_names_both_addresses() {
    let sigs = table(&[(0x10, "ExitProcess"), (0x20, "__imp_ExitProcess")]);
    let err = Rebinder::new(NameResolver::new(), AliasPolicy::Reject)
        .rebind(&sigs, compiled().functions)
        .unwrap_err();
    match err {
        RebindError::AliasedFunction { first_addr, second_addr, second_name, .. } => {
            assert_eq!(first_addr, Address(0x10));
            assert_eq!(second_addr, Address(0x20));
            assert_eq!(second_name, "__imp_ExitProcess");
        }
        other => panic!("expected AliasedFunction, got {other:?}"),
    }
}

#[test]
fn empty_table_yields_empty_output() {
    let out = Rebinder::default().rebind(&AddressTable::default(), compiled().functions).unwrap();
    assert!(out.is_empty());
}
