use std::collections::HashMap;

use thiserror::Error;

use super::{CompiledFunction, CompiledModule, Metadata, MetadataNode, Param, TypeDef};

/// Linkage keywords that only make sense on a definition; they are dropped so
/// the header can be re-emitted as a plain `declare`.
const DEFINITION_ONLY_KEYWORDS: &[&str] = &[
    "internal",
    "private",
    "linkonce",
    "linkonce_odr",
    "weak",
    "weak_odr",
    "available_externally",
    "dso_local",
];

/// Error raised while reading LLVM IR text.
#[derive(Debug, Error)]
#[error("IR parse error at line {line}: {message}")]
pub struct IrParseError {
    pub line: usize,
    pub message: String,
}

impl IrParseError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self { line, message: message.into() }
    }
}

/// Function header parsed from a `declare`/`define` line, plus the metadata
/// attachments (`!name !N`) that still need resolving.
struct ParsedHeader {
    function: CompiledFunction,
    attachments: Vec<(String, u32)>,
    line: usize,
}

struct PendingAttachment {
    function: usize,
    key: String,
    node: u32,
    line: usize,
}

/// Parse the LLVM IR text emitted by the header compiler.
///
/// Global variables, attribute groups, comments and named metadata are
/// skipped. Numbered metadata is only read to resolve function attachments:
/// string tuples are kept, any other node (`!DISubprogram(...)`, mixed tuples)
/// is dropped from the function.
pub fn parse_module(text: &str) -> Result<CompiledModule, IrParseError> {
    let mut module = CompiledModule::new();
    let mut open: Option<ParsedHeader> = None;
    let mut pending: Vec<PendingAttachment> = Vec::new();
    let mut metadata_nodes: HashMap<u32, Option<Metadata>> = HashMap::new();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();

        if let Some(mut header) = open.take() {
            if line == "}" {
                finish_function(&mut module, header, &mut pending);
            } else {
                if !line.is_empty() {
                    header.function.blocks.push(raw.trim_end().to_string());
                }
                open = Some(header);
            }
            continue;
        }

        if line.is_empty() || line.starts_with(';') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("target datalayout") {
            module.target.datalayout = Some(parse_quoted_value(rest, line_no)?);
        } else if let Some(rest) = line.strip_prefix("target triple") {
            module.target.triple = Some(parse_quoted_value(rest, line_no)?);
        } else if let Some(rest) = line.strip_prefix("declare ") {
            let header = parse_header(rest, line_no)?;
            finish_function(&mut module, header, &mut pending);
        } else if let Some(rest) = line.strip_prefix("define ") {
            let rest = rest.strip_suffix('{').ok_or_else(|| {
                IrParseError::new(line_no, "expected '{' at end of function definition header")
            })?;
            open = Some(parse_header(rest, line_no)?);
        } else if line.starts_with('%') {
            if let Some((name, body)) = line.split_once(" = ") {
                if body.starts_with("type") {
                    module.type_defs.push(TypeDef {
                        name: name.trim().to_string(),
                        body: body.trim().to_string(),
                    });
                }
            }
        } else if line.starts_with('!') {
            if let Some((id, node)) = parse_metadata_definition(line) {
                metadata_nodes.insert(id, node);
            }
        }
    }

    if let Some(header) = open {
        return Err(IrParseError::new(
            header.line,
            format!("unterminated body of function @{}", header.function.name),
        ));
    }

    for attachment in pending {
        let node = metadata_nodes.get(&attachment.node).ok_or_else(|| {
            IrParseError::new(attachment.line, format!("undefined metadata node !{}", attachment.node))
        })?;
        if let Some(node) = node {
            module.functions[attachment.function].metadata.insert(attachment.key, node.clone());
        }
    }

    Ok(module)
}

fn finish_function(
    module: &mut CompiledModule,
    header: ParsedHeader,
    pending: &mut Vec<PendingAttachment>,
) {
    let index = module.functions.len();
    for (key, node) in header.attachments {
        pending.push(PendingAttachment { function: index, key, node, line: header.line });
    }
    module.push_function(header.function);
}

/// Parse everything after `declare `/`define ` (and before a trailing `{`).
fn parse_header(rest: &str, line: usize) -> Result<ParsedHeader, IrParseError> {
    let at = find_unquoted(rest, '@')
        .ok_or_else(|| IrParseError::new(line, "function header has no @name"))?;
    let prefix = clean_prefix(&rest[..at]);
    let (name, after_name) = parse_global_name(&rest[at + 1..])
        .ok_or_else(|| IrParseError::new(line, "malformed function name"))?;
    let params_src = after_name
        .trim_start()
        .strip_prefix('(')
        .ok_or_else(|| IrParseError::new(line, format!("expected '(' after @{name}")))?;
    let close = matching_close(params_src)
        .ok_or_else(|| IrParseError::new(line, format!("unbalanced parameter list of @{name}")))?;

    let mut function = CompiledFunction::declaration(name, prefix);
    for piece in split_top_level(&params_src[..close]) {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        if piece == "..." {
            function.variadic = true;
        } else {
            function.params.push(parse_param(piece));
        }
    }
    let attachments = parse_attachments(&params_src[close + 1..]);

    Ok(ParsedHeader { function, attachments, line })
}

fn clean_prefix(prefix: &str) -> String {
    prefix
        .split_whitespace()
        .filter(|tok| !DEFINITION_ONLY_KEYWORDS.contains(tok))
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '$' | '-')
}

/// Read a global name following `@`; returns the name and the remaining text.
fn parse_global_name(s: &str) -> Option<(String, &str)> {
    if let Some(quoted) = s.strip_prefix('"') {
        let end = quoted.find('"')?;
        return Some((unescape(&quoted[..end]), &quoted[end + 1..]));
    }
    let end = s.find(|c: char| !is_ident_char(c)).unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    Some((s[..end].to_string(), &s[end..]))
}

fn parse_param(piece: &str) -> Param {
    if let Some((ty, last)) = piece.rsplit_once(' ') {
        if is_local_name(last) {
            return Param { ty: ty.trim_end().to_string(), name: Some(last.to_string()) };
        }
    }
    Param::new(piece)
}

fn is_local_name(token: &str) -> bool {
    match token.strip_prefix('%') {
        Some(rest) if rest.starts_with('"') => rest.len() > 1 && rest.ends_with('"'),
        Some(rest) => !rest.is_empty() && rest.chars().all(is_ident_char),
        None => false,
    }
}

/// Collect `!kind !N` pairs from the text after the parameter list.
fn parse_attachments(s: &str) -> Vec<(String, u32)> {
    let tokens: Vec<&str> = s.split_whitespace().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let key = tokens[i].strip_prefix('!').filter(|k| !k.is_empty());
        let node = tokens
            .get(i + 1)
            .and_then(|t| t.strip_prefix('!'))
            .and_then(|n| n.parse::<u32>().ok());
        match (key, node) {
            (Some(key), Some(node)) => {
                out.push((key.to_string(), node));
                i += 2;
            }
            _ => i += 1,
        }
    }
    out
}

/// Parse a numbered metadata definition `!N = ...`.
///
/// Returns `None` for named metadata (`!llvm.ident = ...`). The node value is
/// `Some` only for tuples of strings such as `!{!"a", !"b"}`.
fn parse_metadata_definition(line: &str) -> Option<(u32, Option<Metadata>)> {
    let (id, value) = line.strip_prefix('!')?.split_once(" = ")?;
    let id: u32 = id.trim().parse().ok()?;
    Some((id, parse_string_tuple(value)))
}

fn parse_string_tuple(value: &str) -> Option<Metadata> {
    let value = value.trim();
    let value = value.strip_prefix("distinct ").unwrap_or(value);
    let inner = value.strip_prefix("!{")?.strip_suffix('}')?;
    let nodes = split_top_level(inner)
        .into_iter()
        .map(|operand| {
            let text = operand.trim().strip_prefix("!\"")?.strip_suffix('"')?;
            Some(MetadataNode::String(unescape(text)))
        })
        .collect::<Option<Vec<_>>>()?;
    Some(Metadata { nodes })
}

fn parse_quoted_value(rest: &str, line: usize) -> Result<String, IrParseError> {
    rest.trim()
        .strip_prefix('=')
        .map(str::trim)
        .and_then(|v| v.strip_prefix('"'))
        .and_then(|v| v.strip_suffix('"'))
        .map(str::to_string)
        .ok_or_else(|| IrParseError::new(line, "expected `= \"...\"`"))
}

fn find_unquoted(s: &str, needle: char) -> Option<usize> {
    let mut in_quotes = false;
    for (idx, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            c if c == needle && !in_quotes => return Some(idx),
            _ => {}
        }
    }
    None
}

/// Index of the `)` closing a list whose `(` has already been consumed.
fn matching_close(s: &str) -> Option<usize> {
    let mut depth = 1usize;
    let mut in_quotes = false;
    for (idx, c) in s.char_indices() {
        if c == '"' {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        match c {
            '(' | '[' | '{' | '<' => depth += 1,
            ')' | ']' | '}' | '>' => {
                depth -= 1;
                if depth == 0 {
                    return (c == ')').then_some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on commas that are not nested inside brackets or quotes.
fn split_top_level(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut start = 0;
    for (idx, c) in s.char_indices() {
        if c == '"' {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        match c {
            '(' | '[' | '{' | '<' => depth += 1,
            ')' | ']' | '}' | '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                out.push(&s[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    out.push(&s[start..]);
    out
}

/// Decode `\XX` hex escapes used in quoted LLVM names and metadata strings.
fn unescape(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(b) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
