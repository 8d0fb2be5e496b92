use std::fmt::{self, Write as _};

use super::{CompiledFunction, Metadata, MetadataNode, OutputModule};

impl fmt::Display for OutputModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(datalayout) = &self.target.datalayout {
            writeln!(f, "target datalayout = \"{datalayout}\"")?;
        }
        if let Some(triple) = &self.target.triple {
            writeln!(f, "target triple = \"{triple}\"")?;
        }
        if self.target.datalayout.is_some() || self.target.triple.is_some() {
            writeln!(f)?;
        }

        if !self.type_defs.is_empty() {
            for def in &self.type_defs {
                writeln!(f, "{} = {}", def.name, def.body)?;
            }
            writeln!(f)?;
        }

        // Numbered metadata is emitted after all functions, in attachment order.
        let mut nodes: Vec<&Metadata> = Vec::new();
        for function in &self.functions {
            let mut attachments = String::new();
            for (key, md) in &function.metadata {
                write!(attachments, " !{key} !{}", nodes.len())?;
                nodes.push(md);
            }
            write_function(f, function, &attachments)?;
        }

        if !nodes.is_empty() {
            writeln!(f)?;
            for (id, md) in nodes.iter().enumerate() {
                let operands: Vec<String> = md
                    .nodes
                    .iter()
                    .map(|MetadataNode::String(s)| format!("!\"{}\"", escape(s)))
                    .collect();
                writeln!(f, "!{id} = !{{{}}}", operands.join(", "))?;
            }
        }
        Ok(())
    }
}

fn write_function(
    f: &mut fmt::Formatter<'_>,
    function: &CompiledFunction,
    attachments: &str,
) -> fmt::Result {
    let keyword = if function.is_declaration() { "declare" } else { "define" };
    let mut params: Vec<String> = function
        .params
        .iter()
        .map(|p| match (&p.name, function.is_declaration()) {
            (Some(name), false) => format!("{} {name}", p.ty),
            _ => p.ty.clone(),
        })
        .collect();
    if function.variadic {
        params.push("...".to_string());
    }

    write!(f, "{keyword} ")?;
    if !function.prefix.is_empty() {
        write!(f, "{} ", function.prefix)?;
    }
    write!(f, "@{}({}){attachments}", global_name(&function.name), params.join(", "))?;

    if function.is_declaration() {
        writeln!(f)
    } else {
        writeln!(f, " {{")?;
        for line in &function.blocks {
            writeln!(f, "{line}")?;
        }
        writeln!(f, "}}")
    }
}

/// Render a global name, quoting it when it contains characters outside the
/// bare identifier set (`_WinMain@16` becomes `"_WinMain\4016"`).
fn global_name(name: &str) -> String {
    let bare = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '$' | '-'));
    if bare {
        name.to_string()
    } else {
        format!("\"{}\"", escape(name))
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        if b == b'"' || b == b'\\' || b == b'@' || !(0x20..0x7f).contains(&b) {
            // Infallible for String.
            let _ = write!(out, "\\{b:02X}");
        } else {
            out.push(b as char);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{parse_module, Param, TargetInfo, TypeDef};

    fn sample() -> OutputModule {
        let mut win_main = CompiledFunction::declaration("WinMain", "x86_stdcallcc i32");
        win_main.params = vec![Param::new("ptr noundef"), Param::new("i32 noundef")];
        win_main.stamp_address("0x401000");

        let mut printf = CompiledFunction::declaration("printf", "i32");
        printf.params = vec![Param::new("ptr noundef")];
        printf.variadic = true;
        printf.stamp_address("0x402000");

        OutputModule {
            target: TargetInfo {
                datalayout: Some("e-m:e-p:32:32".into()),
                triple: Some("i386-pc-linux-gnu".into()),
            },
            type_defs: vec![TypeDef { name: "%struct.POINT".into(), body: "type { i32, i32 }".into() }],
            functions: vec![win_main, printf],
        }
    }

    #[test]
    fn renders_declarations_with_addr_metadata() {
        let text = sample().to_string();
        let expected = "\
target datalayout = \"e-m:e-p:32:32\"
target triple = \"i386-pc-linux-gnu\"

%struct.POINT = type { i32, i32 }

declare x86_stdcallcc i32 @WinMain(ptr noundef, i32 noundef) !addr !0
declare i32 @printf(ptr noundef, ...) !addr !1

!0 = !{!\"0x401000\"}
!1 = !{!\"0x402000\"}
";
        assert_eq!(text, expected);
    }

    #[test]
    fn output_reparses_with_same_shape() {
        let module = sample();
        let reparsed = parse_module(&module.to_string()).expect("reparse");
        assert_eq!(reparsed.target, module.target);
        assert_eq!(reparsed.type_defs, module.type_defs);
        assert_eq!(reparsed.functions.len(), 2);
        assert_eq!(reparsed.functions[0].address_metadata(), Some("0x401000"));
        assert_eq!(reparsed.functions[1].address_metadata(), Some("0x402000"));
        assert!(reparsed.functions[1].variadic);
    }

    #[test]
    fn quotes_names_outside_identifier_set() {
        assert_eq!(global_name("WinMain"), "WinMain");
        assert_eq!(global_name("_WinMain@16"), "\"_WinMain\\4016\"");
        assert_eq!(global_name("1st"), "\"1st\"");
    }
}
