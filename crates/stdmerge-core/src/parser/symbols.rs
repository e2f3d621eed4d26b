//! Function signature extraction from source code.
//!
//! Python, TypeScript, Go and Java are scanned line by line with regexes.
//! Each adapter joins multi-line headers, splits the parameter list at
//! top-level commas, measures the body extent (indentation or braces) and
//! attaches the nearest doc block together with any examples found in it.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{
    split_top_level, FunctionSignature, Module, Parameter, SourceLocation, TypeRef,
};
use crate::parser::docs::{
    balanced_group, brace_extent, collect_header, doc_before, docstring_at, extract_examples,
    indent_extent, indent_of, python_docstring, skip_annotations_up,
};

/// One ecosystem's source-file adapter.
pub trait LanguageAdapter: Send + Sync {
    /// Ecosystem tag this adapter produces signatures for.
    fn ecosystem(&self) -> &str;

    /// File extensions (with leading dot) this adapter reads.
    fn extensions(&self) -> &[&'static str];

    /// Parse one source file into a module. `rel_path` is relative to the
    /// library root and uses `/` separators.
    fn parse_source(&self, source: &str, rel_path: &str) -> Result<Module, String>;
}

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

/// Convert a file path to a dotted module name.
///
/// Strips the file extension and joins path components with dots,
/// skipping any leading `/` or `.` segments.
pub fn to_module_name(path: &str) -> String {
    let p = Path::new(path);
    let without_ext = p.with_extension("");
    let parts: Vec<&str> = without_ext
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(os) => os.to_str(),
            _ => None,
        })
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    parts.join(".")
}

/// "private" if the name starts with `_`, else "public".
pub fn visibility(name: &str) -> &'static str {
    if name.starts_with('_') {
        "private"
    } else {
        "public"
    }
}

fn join_lines(lines: &[&str], start: usize, end: usize) -> String {
    lines[start..=end.min(lines.len() - 1)].join("\n")
}

fn end_column(lines: &[&str], end: usize) -> u32 {
    lines
        .get(end)
        .map(|l| l.chars().count() as u32 + 1)
        .unwrap_or(1)
}

/// Everything a language scanner knows about one declaration.
struct Declaration<'a> {
    name: String,
    params: Vec<Parameter>,
    return_type: TypeRef,
    decl: usize,
    first: usize,
    end: usize,
    doc: Option<(String, Option<usize>)>,
    visibility: &'a str,
}

fn build_signature(
    lines: &[&str],
    rel_path: &str,
    module_path: &str,
    ecosystem: &str,
    d: Declaration<'_>,
) -> FunctionSignature {
    let location = SourceLocation::new(
        rel_path,
        d.decl as u32 + 1,
        indent_of(lines[d.decl]) as u32 + 1,
    )
    .with_end(d.end as u32 + 1, end_column(lines, d.end));

    let mut sig = FunctionSignature::new(d.name, module_path, location).with_ecosystem(ecosystem);
    sig.parameters = d.params;
    sig.return_type = d.return_type;
    if let Some((text, start)) = d.doc {
        sig.examples = extract_examples(&text);
        sig.documentation = text;
        sig.doc_start_line = start.map(|s| s as u32 + 1);
    }
    if d.first < d.decl && sig.doc_start_line.is_none() {
        sig.doc_start_line = Some(d.first as u32 + 1);
    }
    sig.source_text = Some(join_lines(lines, d.first, d.end));
    sig.metadata
        .insert("visibility".to_string(), d.visibility.to_string());
    sig
}

fn leading_doc_block(lines: &[&str], line_prefix: &str) -> String {
    let mut idx = 0;
    while idx < lines.len() && lines[idx].trim().is_empty() {
        idx += 1;
    }
    if idx >= lines.len() {
        return String::new();
    }
    // Find the end of the first comment block and reuse the backward scanner.
    let first = lines[idx].trim_start();
    let mut end = idx;
    if first.starts_with("/*") {
        while end + 1 < lines.len() && !lines[end].contains("*/") {
            end += 1;
        }
    } else if first.starts_with(line_prefix) {
        while end + 1 < lines.len() && lines[end + 1].trim_start().starts_with(line_prefix) {
            end += 1;
        }
    } else {
        return String::new();
    }
    // A block glued to the next declaration documents that declaration.
    if lines.get(end + 1).is_some_and(|l| !l.trim().is_empty()) {
        return String::new();
    }
    doc_before(lines, end + 1, line_prefix)
        .map(|d| d.text)
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Compiled regex patterns (LazyLock for one-time init)
// ---------------------------------------------------------------------------

// -- Python --

static PY_DEF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)(?:async\s+)?def\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap());

static PY_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)class\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap());

// -- TypeScript --

static TS_FUNCTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(export\s+)?(?:default\s+)?(?:declare\s+)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$][A-Za-z0-9_$]*)\s*(?:<[^(]*>)?\s*\(",
    )
    .unwrap()
});

static TS_ARROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(export\s+)?(?:const|let|var)\s+([A-Za-z_$][A-Za-z0-9_$]*)\s*(?::[^=]+)?=\s*(?:async\s+)?(?:<[^(]*>)?\s*\(",
    )
    .unwrap()
});

static TS_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+([A-Za-z_$][A-Za-z0-9_$]*)")
        .unwrap()
});

static TS_METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(public\s+|private\s+|protected\s+)?(?:static\s+)?(?:readonly\s+)?(?:async\s+)?([A-Za-z_$][A-Za-z0-9_$]*)\s*(?:<[^(]*>)?\s*\(",
    )
    .unwrap()
});

const TS_NON_METHODS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "function", "constructor", "super", "new",
    "typeof", "await",
];

// -- Go --

static GO_PACKAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*package\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap());

static GO_FUNC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^func\s*(\([^)]*\)\s*)?([A-Za-z_][A-Za-z0-9_]*)\s*(?:\[[^\]]*\])?\s*\(").unwrap()
});

// -- Java --

static JAVA_PACKAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*package\s+([A-Za-z0-9_.]+)\s*;").unwrap());

static JAVA_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:public\s+|private\s+|protected\s+)?(?:static\s+)?(?:abstract\s+|final\s+)?(?:class|interface|enum|record)\s+([A-Za-z_][A-Za-z0-9_]*)",
    )
    .unwrap()
});

static JAVA_METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*((?:(?:public|private|protected|static|final|abstract|synchronized|native|default|strictfp)\s+)*)(?:<.+?>\s+)?([A-Za-z_][A-Za-z0-9_<>\[\],.? ]*?)\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(",
    )
    .unwrap()
});

static JAVA_THROWS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*throws\s+([A-Za-z0-9_.,\s]+)").unwrap());

// Statement keywords, plus modifiers that show up in the type slot when a
// constructor (`public Foo(`) is matched.
const JAVA_NON_TYPES: &[&str] = &[
    "return", "new", "else", "throw", "case", "public", "private", "protected", "static",
    "final", "abstract", "synchronized", "native", "default",
];

// ---------------------------------------------------------------------------
// Parameter parsing
// ---------------------------------------------------------------------------

fn split_default(chunk: &str) -> (&str, Option<String>) {
    let mut depth = 0i32;
    let mut previous = ' ';
    for (i, ch) in chunk.char_indices() {
        match ch {
            '<' | '[' | '(' | '{' => depth += 1,
            '>' if previous == '=' => {}
            '>' | ']' | ')' | '}' => depth -= 1,
            '=' if depth == 0 => {
                let next = chunk[i + 1..].chars().next().unwrap_or(' ');
                if previous != '=' && previous != '!' && next != '=' && next != '>' {
                    let default = chunk[i + 1..].trim();
                    return (
                        chunk[..i].trim(),
                        (!default.is_empty()).then(|| default.to_string()),
                    );
                }
            }
            _ => {}
        }
        previous = ch;
    }
    (chunk.trim(), None)
}

fn split_annotation(chunk: &str) -> (&str, Option<&str>) {
    let mut depth = 0i32;
    for (i, ch) in chunk.char_indices() {
        match ch {
            '<' | '[' | '(' | '{' => depth += 1,
            '>' | ']' | ')' | '}' => depth -= 1,
            ':' if depth == 0 => return (chunk[..i].trim(), Some(chunk[i + 1..].trim())),
            _ => {}
        }
    }
    (chunk.trim(), None)
}

/// Parse a Python parameter list (`self`/`cls` and bare markers dropped).
pub fn python_parameters(raw: &str) -> Vec<Parameter> {
    let mut params = Vec::new();
    for chunk in split_top_level(raw, ',') {
        let (decl, default) = split_default(&chunk);
        let (name, annotation) = split_annotation(decl);
        let name = name.trim_start_matches('*').trim();
        if name.is_empty() || matches!(name, "self" | "cls" | "/") {
            continue;
        }
        params.push(Parameter {
            name: name.to_string(),
            type_ref: annotation.map(TypeRef::parse).unwrap_or_else(TypeRef::unknown),
            default_value: default,
        });
    }
    params
}

/// Parse a TypeScript parameter list.
pub fn typescript_parameters(raw: &str) -> Vec<Parameter> {
    let mut params = Vec::new();
    for (position, chunk) in split_top_level(raw, ',').iter().enumerate() {
        let (decl, default) = split_default(chunk);
        let (name, annotation) = split_annotation(decl);
        let mut name = name
            .trim_start_matches("...")
            .trim_end_matches('?')
            .trim()
            .to_string();
        if name.is_empty() {
            continue;
        }
        if name.starts_with('{') || name.starts_with('[') {
            name = format!("arg{position}");
        }
        if name == "this" {
            continue;
        }
        params.push(Parameter {
            name,
            type_ref: annotation.map(TypeRef::parse).unwrap_or_else(TypeRef::unknown),
            default_value: default,
        });
    }
    params
}

/// Parse a Go parameter list, distributing grouped types (`a, b int`).
pub fn go_parameters(raw: &str) -> Vec<Parameter> {
    let mut params: Vec<Parameter> = Vec::new();
    let mut pending: Vec<String> = Vec::new();
    for chunk in split_top_level(raw, ',') {
        let chunk = chunk.trim();
        if chunk.is_empty() {
            continue;
        }
        match chunk.split_once(char::is_whitespace) {
            Some((name, type_text)) => {
                let type_ref = TypeRef::parse(type_text.trim().trim_start_matches("..."));
                for waiting in pending.drain(..) {
                    params.push(Parameter::new(waiting, type_ref.clone()));
                }
                params.push(Parameter::new(name.trim(), type_ref));
            }
            None => pending.push(chunk.to_string()),
        }
    }
    // Unnamed parameters (`func(int, string)`) are types, not names.
    for waiting in pending {
        params.push(Parameter::new(format!("arg{}", params.len()), TypeRef::parse(&waiting)));
    }
    params
}

/// Parse a Java parameter list: last token is the name, the rest the type.
pub fn java_parameters(raw: &str) -> Vec<Parameter> {
    let mut params = Vec::new();
    for chunk in split_top_level(raw, ',') {
        let cleaned: Vec<&str> = chunk
            .split_whitespace()
            .filter(|t| *t != "final" && !t.starts_with('@'))
            .collect();
        let Some((name, type_parts)) = cleaned.split_last() else {
            continue;
        };
        let type_text = type_parts.join(" ").replace("...", "[]");
        params.push(Parameter::new(
            name.replace("...", ""),
            if type_text.is_empty() {
                TypeRef::unknown()
            } else {
                TypeRef::parse(&type_text)
            },
        ));
    }
    params
}

// ---------------------------------------------------------------------------
// Python extraction
// ---------------------------------------------------------------------------

pub struct PythonAdapter;

impl LanguageAdapter for PythonAdapter {
    fn ecosystem(&self) -> &str {
        "python"
    }

    fn extensions(&self) -> &[&'static str] {
        &[".py", ".pyi"]
    }

    fn parse_source(&self, source: &str, rel_path: &str) -> Result<Module, String> {
        Ok(python_module(source, rel_path))
    }
}

/// Extract module-level functions and class methods from Python source.
///
/// Nested functions are skipped by jumping past each function's extent.
fn python_module(source: &str, rel_path: &str) -> Module {
    let lines: Vec<&str> = source.lines().collect();
    let module_name = to_module_name(rel_path);
    let mut module = Module {
        name: module_name.clone(),
        path: rel_path.to_string(),
        documentation: python_module_doc(&lines),
        location: Some(
            SourceLocation::new(rel_path, 1, 1).with_end(lines.len().max(1) as u32, 1),
        ),
        ..Default::default()
    };

    // (indent, class name)
    let mut class_stack: Vec<(usize, String)> = Vec::new();
    let mut idx = 0;
    while idx < lines.len() {
        let line = lines[idx];
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            idx += 1;
            continue;
        }
        let indent = indent_of(line);
        while class_stack.last().is_some_and(|(ci, _)| indent <= *ci) {
            class_stack.pop();
        }

        if let Some(caps) = PY_CLASS_RE.captures(line) {
            class_stack.push((caps[1].len(), caps[2].to_string()));
            idx += 1;
            continue;
        }

        let Some(caps) = PY_DEF_RE.captures(line) else {
            idx += 1;
            continue;
        };
        let name = caps[2].to_string();
        let (header, header_end) = collect_header(&lines, idx);
        let Some(open) = header.find('(') else {
            idx += 1;
            continue;
        };
        let Some((params_raw, close)) = balanced_group(&header, open) else {
            idx = header_end + 1;
            continue;
        };
        let tail = header[close + 1..].trim();
        let return_type = tail
            .strip_prefix("->")
            .and_then(|rest| rest.split_once(':').map(|(t, _)| t.trim()))
            .map(TypeRef::parse)
            .unwrap_or_else(TypeRef::unknown);

        let first = skip_annotations_up(&lines, idx);
        let end = indent_extent(&lines, idx, header_end);
        let doc = match python_docstring(&lines, header_end) {
            Some((text, _)) => Some((text, None)),
            None => doc_before(&lines, first, "#").map(|d| (d.text, Some(d.start))),
        };

        let module_path = match class_stack.last() {
            Some((_, class)) => format!("{module_name}.{class}"),
            None => module_name.clone(),
        };
        let owner = class_stack.last().map(|(_, class)| class.clone());
        let is_static = lines[first..idx]
            .iter()
            .any(|l| l.trim() == "@staticmethod");
        let vis = visibility(&name);
        let mut sig = build_signature(
            &lines,
            rel_path,
            &module_path,
            "python",
            Declaration {
                name,
                params: python_parameters(params_raw),
                return_type,
                decl: idx,
                first,
                end,
                doc,
                visibility: vis,
            },
        );
        if let Some(owner) = owner {
            sig = sig.with_owner(&owner, is_static);
        }
        module.functions.push(sig);
        idx = end + 1;
    }
    module
}

fn python_module_doc(lines: &[&str]) -> String {
    let mut idx = 0;
    while idx < lines.len() {
        let t = lines[idx].trim();
        if t.is_empty() || t.starts_with('#') {
            idx += 1;
            continue;
        }
        break;
    }
    docstring_at(lines, idx).map(|(d, _)| d).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// TypeScript extraction
// ---------------------------------------------------------------------------

pub struct TypeScriptAdapter;

impl LanguageAdapter for TypeScriptAdapter {
    fn ecosystem(&self) -> &str {
        "typescript"
    }

    fn extensions(&self) -> &[&'static str] {
        &[".ts", ".tsx", ".mts"]
    }

    fn parse_source(&self, source: &str, rel_path: &str) -> Result<Module, String> {
        Ok(typescript_module(source, rel_path))
    }
}

/// Return type written after the parameter list (`): T {` or `): T =>`).
fn ts_return_type(tail: &str) -> TypeRef {
    let Some(rest) = tail.trim_start().strip_prefix(':') else {
        return TypeRef::unknown();
    };
    let mut end = rest.len();
    for marker in ["=>", "{", ";"] {
        if let Some(pos) = rest.find(marker) {
            // An object literal type starts right after the colon.
            if marker == "{" && rest[..pos].trim().is_empty() {
                continue;
            }
            end = end.min(pos);
        }
    }
    TypeRef::parse(rest[..end].trim())
}

fn typescript_module(source: &str, rel_path: &str) -> Module {
    let lines: Vec<&str> = source.lines().collect();
    let module_name = to_module_name(rel_path);
    let mut module = Module {
        name: module_name.clone(),
        path: rel_path.to_string(),
        documentation: leading_doc_block(&lines, "//"),
        location: Some(
            SourceLocation::new(rel_path, 1, 1).with_end(lines.len().max(1) as u32, 1),
        ),
        ..Default::default()
    };

    // (class name, last line index of the class body)
    let mut current_class: Option<(String, usize)> = None;
    let mut idx = 0;
    while idx < lines.len() {
        let line = lines[idx];
        if current_class.as_ref().is_some_and(|(_, end)| idx > *end) {
            current_class = None;
        }

        if let Some(caps) = TS_CLASS_RE.captures(line) {
            let class_end = brace_extent(&lines, idx, idx);
            current_class = Some((caps[1].to_string(), class_end));
            idx += 1;
            continue;
        }

        let mut is_arrow = false;
        let (name, exported, in_class) = if let Some(caps) = TS_FUNCTION_RE.captures(line) {
            (caps[2].to_string(), caps.get(1).is_some(), false)
        } else if let Some(caps) = TS_ARROW_RE.captures(line) {
            is_arrow = true;
            (caps[2].to_string(), caps.get(1).is_some(), false)
        } else if current_class.is_some() {
            match TS_METHOD_RE.captures(line) {
                Some(caps) if !TS_NON_METHODS.contains(&&caps[2]) => {
                    let private = caps
                        .get(1)
                        .is_some_and(|m| m.as_str().trim() != "public");
                    (caps[2].to_string(), !private, true)
                }
                _ => {
                    idx += 1;
                    continue;
                }
            }
        } else {
            idx += 1;
            continue;
        };

        let (header, header_end) = collect_header(&lines, idx);
        let Some(open) = header.find('(') else {
            idx += 1;
            continue;
        };
        let Some((params_raw, close)) = balanced_group(&header, open) else {
            idx = header_end + 1;
            continue;
        };
        let tail = &header[close + 1..];
        // `const x = (a + b) * 2;` is a parenthesised expression, not a function.
        if is_arrow && !tail.contains("=>") {
            idx = header_end + 1;
            continue;
        }
        let return_type = ts_return_type(tail);
        let first = skip_annotations_up(&lines, idx);
        let end = brace_extent(&lines, idx, header_end);
        let doc = doc_before(&lines, first, "//").map(|d| (d.text, Some(d.start)));

        let module_path = match (&current_class, in_class) {
            (Some((class, _)), true) => format!("{module_name}.{class}"),
            _ => module_name.clone(),
        };
        let owner = current_class
            .as_ref()
            .filter(|_| in_class)
            .map(|(class, _)| class.clone());
        let is_static = line
            .split_whitespace()
            .take_while(|w| matches!(*w, "public" | "private" | "protected" | "static" | "readonly" | "async"))
            .any(|w| w == "static");
        let mut sig = build_signature(
            &lines,
            rel_path,
            &module_path,
            "typescript",
            Declaration {
                name,
                params: typescript_parameters(params_raw),
                return_type,
                decl: idx,
                first,
                end,
                doc,
                visibility: if exported { "public" } else { "private" },
            },
        );
        if let Some(owner) = owner {
            sig = sig.with_owner(&owner, is_static);
        }
        module.functions.push(sig);
        idx = end + 1;
    }
    module
}

// ---------------------------------------------------------------------------
// Go extraction
// ---------------------------------------------------------------------------

pub struct GoAdapter;

impl LanguageAdapter for GoAdapter {
    fn ecosystem(&self) -> &str {
        "go"
    }

    fn extensions(&self) -> &[&'static str] {
        &[".go"]
    }

    fn parse_source(&self, source: &str, rel_path: &str) -> Result<Module, String> {
        if rel_path.ends_with("_test.go") {
            return Err("test file".to_string());
        }
        go_module(source, rel_path)
    }
}

/// Exported identifiers start with an upper-case letter.
fn go_visibility(name: &str) -> &'static str {
    if name.chars().next().is_some_and(|c| c.is_uppercase()) {
        "public"
    } else {
        "private"
    }
}

/// Go results: nothing means `void`, otherwise one type or a tuple.
fn go_return_type(tail: &str) -> TypeRef {
    let text = match tail.rfind('{') {
        Some(pos) => &tail[..pos],
        None => tail,
    };
    let text = text.trim();
    if text.is_empty() {
        return TypeRef::named("void");
    }
    if text.starts_with('(') && text.ends_with(')') {
        let params = go_parameters(&text[1..text.len() - 1]);
        // Named results keep only their types.
        return TypeRef::generic("tuple", params.into_iter().map(|p| p.type_ref).collect());
    }
    TypeRef::parse(text)
}

fn go_module(source: &str, rel_path: &str) -> Result<Module, String> {
    let lines: Vec<&str> = source.lines().collect();
    let package_idx = lines
        .iter()
        .position(|l| GO_PACKAGE_RE.is_match(l))
        .ok_or_else(|| format!("missing package clause in {rel_path}"))?;
    let package = GO_PACKAGE_RE
        .captures(lines[package_idx])
        .map(|c| c[1].to_string())
        .unwrap_or_default();

    let module_name = {
        let dir = to_module_name(
            Path::new(rel_path)
                .parent()
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_default()
                .as_str(),
        );
        if dir.is_empty() {
            package.clone()
        } else {
            dir
        }
    };
    let mut module = Module {
        name: to_module_name(rel_path),
        path: rel_path.to_string(),
        documentation: doc_before(&lines, package_idx, "//")
            .map(|d| d.text)
            .unwrap_or_default(),
        location: Some(
            SourceLocation::new(rel_path, 1, 1).with_end(lines.len().max(1) as u32, 1),
        ),
        ..Default::default()
    };

    let mut idx = package_idx + 1;
    while idx < lines.len() {
        let line = lines[idx];
        let Some(caps) = GO_FUNC_RE.captures(line) else {
            idx += 1;
            continue;
        };
        let name = caps[2].to_string();
        let receiver = caps.get(1).map(|m| m.as_str().to_string());
        let (header, header_end) = collect_header(&lines, idx);
        // The parameter list is the group right after the name.
        let name_pos = caps.get(2).map(|m| m.end()).unwrap_or(0);
        let Some(open) = header[name_pos..].find('(').map(|p| p + name_pos) else {
            idx += 1;
            continue;
        };
        let Some((params_raw, close)) = balanced_group(&header, open) else {
            idx = header_end + 1;
            continue;
        };
        let return_type = go_return_type(&header[close + 1..]);
        let end = brace_extent(&lines, idx, header_end);
        let doc = doc_before(&lines, idx, "//").map(|d| (d.text, Some(d.start)));

        let owner = receiver.as_deref().map(|r| {
            go_receiver_type(r).unwrap_or_else(|| r.trim().to_string())
        });
        let module_path = match receiver.as_deref().and_then(go_receiver_type) {
            Some(owner) => format!("{module_name}.{owner}"),
            None => module_name.clone(),
        };
        let vis = go_visibility(&name);
        let mut sig = build_signature(
            &lines,
            rel_path,
            &module_path,
            "go",
            Declaration {
                name,
                params: go_parameters(params_raw),
                return_type,
                decl: idx,
                first: idx,
                end,
                doc,
                visibility: vis,
            },
        );
        if let Some(owner) = owner {
            sig = sig.with_owner(&owner, false);
        }
        module.functions.push(sig);
        idx = end + 1;
    }
    Ok(module)
}

/// `(b *Buffer)` → `Buffer`.
fn go_receiver_type(receiver: &str) -> Option<String> {
    let inner = receiver.trim().trim_start_matches('(').trim_end_matches(')');
    let type_text = inner.split_whitespace().last()?;
    let owner = type_text.trim_start_matches('*');
    let owner = owner.split('[').next().unwrap_or(owner);
    (!owner.is_empty()).then(|| owner.to_string())
}

// ---------------------------------------------------------------------------
// Java extraction
// ---------------------------------------------------------------------------

pub struct JavaAdapter;

impl LanguageAdapter for JavaAdapter {
    fn ecosystem(&self) -> &str {
        "java"
    }

    fn extensions(&self) -> &[&'static str] {
        &[".java"]
    }

    fn parse_source(&self, source: &str, rel_path: &str) -> Result<Module, String> {
        Ok(java_module(source, rel_path))
    }
}

/// Extract methods from Java source. Each top-level type becomes a nested
/// module of the file module, tracked with a class stack and brace extents.
fn java_module(source: &str, rel_path: &str) -> Module {
    let lines: Vec<&str> = source.lines().collect();
    let mut package_name = String::new();
    let mut module = Module {
        name: to_module_name(rel_path),
        path: rel_path.to_string(),
        documentation: leading_doc_block(&lines, "//"),
        location: Some(
            SourceLocation::new(rel_path, 1, 1).with_end(lines.len().max(1) as u32, 1),
        ),
        ..Default::default()
    };

    // (class module, last line index of the class body)
    let mut class_stack: Vec<(Module, usize)> = Vec::new();
    let mut idx = 0;
    while idx < lines.len() {
        let line = lines[idx];
        while class_stack.last().is_some_and(|(_, end)| idx > *end) {
            close_class(&mut class_stack, &mut module);
        }

        if let Some(caps) = JAVA_PACKAGE_RE.captures(line) {
            package_name = caps[1].to_string();
            idx += 1;
            continue;
        }

        if let Some(caps) = JAVA_CLASS_RE.captures(line) {
            let class_name = caps[1].to_string();
            let qualified = match class_stack.last() {
                Some((outer, _)) => format!("{}.{class_name}", outer.name),
                None if package_name.is_empty() => class_name.clone(),
                None => format!("{package_name}.{class_name}"),
            };
            let end = brace_extent(&lines, idx, idx);
            let first = skip_annotations_up(&lines, idx);
            let class_doc = doc_before(&lines, first, "//")
                .map(|d| d.text)
                .unwrap_or_default();
            class_stack.push((
                Module {
                    name: qualified,
                    path: rel_path.to_string(),
                    documentation: class_doc,
                    location: Some(
                        SourceLocation::new(rel_path, idx as u32 + 1, 1)
                            .with_end(end as u32 + 1, end_column(&lines, end)),
                    ),
                    ..Default::default()
                },
                end,
            ));
            idx += 1;
            continue;
        }

        let method = JAVA_METHOD_RE
            .captures(line)
            .filter(|caps| !JAVA_NON_TYPES.contains(&caps[2].trim()))
            .filter(|_| !class_stack.is_empty());
        let Some(caps) = method else {
            idx += 1;
            continue;
        };
        let modifiers = caps[1].to_string();
        let name = caps[3].to_string();
        let return_text = caps[2].trim().to_string();

        let (header, header_end) = collect_header(&lines, idx);
        let name_pos = header.find(&format!("{name}(")).or_else(|| header.find(&name));
        let Some(open) = name_pos.and_then(|p| header[p..].find('(').map(|o| o + p)) else {
            idx += 1;
            continue;
        };
        let Some((params_raw, close)) = balanced_group(&header, open) else {
            idx = header_end + 1;
            continue;
        };
        let tail = &header[close + 1..];
        let throws = JAVA_THROWS_RE
            .captures(tail)
            .map(|c| c[1].trim().trim_end_matches('{').trim().to_string());

        let first = skip_annotations_up(&lines, idx);
        let end = brace_extent(&lines, idx, header_end);
        let doc = doc_before(&lines, first, "//").map(|d| (d.text, Some(d.start)));

        let vis = if modifiers.contains("public") {
            "public"
        } else if modifiers.contains("private") {
            "private"
        } else if modifiers.contains("protected") {
            "protected"
        } else {
            "package"
        };
        let Some((owner, _)) = class_stack.last_mut() else {
            idx += 1;
            continue;
        };
        let mut sig = build_signature(
            &lines,
            rel_path,
            &owner.name,
            "java",
            Declaration {
                name,
                params: java_parameters(params_raw),
                return_type: TypeRef::parse(&return_text),
                decl: idx,
                first,
                end,
                doc,
                visibility: vis,
            },
        );
        let owner_name = owner.name.clone();
        sig = sig.with_owner(&owner_name, modifiers.contains("static"));
        if let Some(throws) = throws {
            sig.metadata.insert("throws".to_string(), throws);
        }
        owner.functions.push(sig);
        idx = end + 1;
    }
    while !class_stack.is_empty() {
        close_class(&mut class_stack, &mut module);
    }
    module
}

fn close_class(stack: &mut Vec<(Module, usize)>, file: &mut Module) {
    if let Some((class, _)) = stack.pop() {
        match stack.last_mut() {
            Some((outer, _)) => outer.submodules.push(class),
            None => file.submodules.push(class),
        }
    }
}
