//! Per-target source emitters.
//!
//! Everything that knows the surface syntax of a target ecosystem lives
//! here: file naming, identifier conventions, doc comments, module
//! wrappers, "not implemented" stubs and the import statements the stripper
//! inserts.

use crate::naming::{camel_case, pascal_case, snake_case};

/// Ecosystems the extractor can emit modules for.
pub const SUPPORTED_TARGETS: &[&str] = &["python", "typescript", "go", "java"];

/// Package holding every unified module: the Go package, the Java
/// package and the Python/TypeScript directory the stripper imports from.
pub const UNIFIED_PACKAGE: &str = "unified";

const JAVA_MODIFIERS: &[&str] = &[
    "public", "protected", "private", "static", "final", "synchronized", "abstract", "native",
    "strictfp", "default",
];

const TS_MODIFIERS: &[&str] = &[
    "export", "default", "declare", "public", "protected", "private", "static", "readonly", "async",
];

const PYTHON_KEYWORDS: &[&str] = &[
    "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del", "elif",
    "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda",
    "nonlocal", "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
];
const TYPESCRIPT_KEYWORDS: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "default", "delete", "do", "else",
    "enum", "export", "extends", "finally", "for", "function", "if", "import", "in", "new",
    "return", "super", "switch", "this", "throw", "try", "typeof", "var", "void", "while", "with",
];
const GO_KEYWORDS: &[&str] = &[
    "break", "case", "chan", "const", "continue", "default", "defer", "else", "fallthrough", "for",
    "func", "go", "goto", "if", "import", "interface", "map", "package", "range", "return",
    "select", "struct", "switch", "type", "var",
];
const JAVA_KEYWORDS: &[&str] = &[
    "abstract", "boolean", "break", "byte", "case", "catch", "char", "class", "const", "continue",
    "default", "do", "double", "else", "enum", "extends", "final", "finally", "float", "for",
    "if", "implements", "import", "int", "interface", "long", "new", "package", "private",
    "protected", "public", "return", "short", "static", "super", "switch", "this", "throw",
    "throws", "try", "void", "while",
];

pub fn is_supported(target: &str) -> bool {
    SUPPORTED_TARGETS.contains(&target)
}

pub fn extension(target: &str) -> Option<&'static str> {
    match target {
        "python" => Some("py"),
        "typescript" => Some("ts"),
        "go" => Some("go"),
        "java" => Some("java"),
        _ => None,
    }
}

/// Line comment marker of an ecosystem's syntax.
pub fn comment_prefix(ecosystem: &str) -> &'static str {
    match ecosystem {
        "python" | "ruby" | "elixir" | "shell" => "#",
        "haskell" | "lua" | "sql" => "--",
        _ => "//",
    }
}

/// Function name in the target's naming convention.
pub fn conventional_name(name: &str, target: &str) -> String {
    let converted = match target {
        "python" => snake_case(name),
        "go" => pascal_case(name),
        "typescript" | "java" => camel_case(name),
        _ => name.to_string(),
    };
    if converted.is_empty() {
        name.to_string()
    } else {
        converted
    }
}

/// Name of the function inside a pattern's unified module: the pattern name
/// in target convention, or the winner's own name when normalization is off.
pub fn unified_function_name(
    pattern_name: &str,
    winner_name: &str,
    target: &str,
    normalize: bool,
) -> String {
    if normalize {
        conventional_name(pattern_name, target)
    } else {
        sanitize_ident(winner_name, target)
    }
}

/// Class (java) or module (others) identifier for a pattern.
pub fn module_identifier(pattern_name: &str, target: &str) -> String {
    match target {
        "java" => pascal_case(pattern_name),
        _ => snake_case(pattern_name),
    }
}

/// File name of the unified module for `pattern_name`.
pub fn module_file_name(pattern_name: &str, target: &str) -> Option<String> {
    let ext = extension(target)?;
    Some(format!("{}.{ext}", module_identifier(pattern_name, target)))
}

/// Turn a parameter name into a legal identifier for `target`.
pub fn sanitize_ident(name: &str, target: &str) -> String {
    let cleaned: String = name
        .trim_start_matches(['*', '&', '.', '$'])
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    let mut ident = if cleaned.is_empty() {
        "arg".to_string()
    } else if cleaned.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{cleaned}")
    } else {
        cleaned
    };
    let keywords = match target {
        "python" => PYTHON_KEYWORDS,
        "typescript" => TYPESCRIPT_KEYWORDS,
        "go" => GO_KEYWORDS,
        "java" => JAVA_KEYWORDS,
        _ => &[],
    };
    if keywords.contains(&ident.as_str()) {
        ident.push('_');
    }
    ident
}

/// Escape text for a double-quoted string literal.
pub fn escape_str(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

pub fn indent(code: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    code.lines()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove the common leading whitespace of all non-blank lines.
pub fn dedent(code: &str) -> String {
    let common = code
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    code.lines()
        .map(|l| l.get(common..).unwrap_or_else(|| l.trim_start()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drop whole-line comments, including `/* */` blocks in C-like syntax.
pub fn strip_comment_lines(code: &str, ecosystem: &str) -> String {
    let prefix = comment_prefix(ecosystem);
    let block_comments = prefix == "//";
    let mut in_block = false;
    let mut kept = Vec::new();
    for line in code.lines() {
        let trimmed = line.trim_start();
        if in_block {
            if trimmed.contains("*/") {
                in_block = false;
            }
            continue;
        }
        if block_comments && trimmed.starts_with("/*") {
            in_block = !trimmed.contains("*/");
            continue;
        }
        if trimmed.starts_with(prefix) {
            continue;
        }
        kept.push(line);
    }
    kept.join("\n")
}

/// Doc comment in the target's style, `width` spaces indented.
pub fn doc_comment(doc: &str, target: &str, width: usize) -> String {
    let doc = doc.trim();
    if doc.is_empty() {
        return String::new();
    }
    let pad = " ".repeat(width);
    match target {
        "python" => {
            let body = doc.replace('\\', "\\\\").replace("\"\"\"", "\\\"\\\"\\\"");
            // A trailing quote would merge with the closing delimiter.
            let body = if body.ends_with('"') { format!("{body} ") } else { body };
            let mut out = format!("{pad}\"\"\"");
            for (i, line) in body.lines().enumerate() {
                if i > 0 {
                    out.push('\n');
                    if !line.trim().is_empty() {
                        out.push_str(&pad);
                    }
                }
                out.push_str(line);
            }
            if body.lines().count() > 1 {
                out.push('\n');
                out.push_str(&pad);
            }
            out.push_str("\"\"\"\n");
            out
        }
        "go" => doc
            .lines()
            .map(|l| {
                if l.trim().is_empty() {
                    format!("{pad}//\n")
                } else {
                    format!("{pad}// {l}\n")
                }
            })
            .collect(),
        _ => {
            let mut out = format!("{pad}/**\n");
            for line in doc.replace("*/", "* /").lines() {
                if line.trim().is_empty() {
                    out.push_str(&format!("{pad} *\n"));
                } else {
                    out.push_str(&format!("{pad} * {line}\n"));
                }
            }
            out.push_str(&format!("{pad} */\n"));
            out
        }
    }
}

/// A function to be rendered from scratch (placeholder or signature-only
/// translation). Types are already in target syntax; `None` means the
/// target gets no annotation.
#[derive(Clone, Debug, Default)]
pub struct FunctionSpec {
    pub name: String,
    pub params: Vec<(String, Option<String>)>,
    pub return_type: Option<String>,
    pub doc: Option<String>,
    /// Message of the raised "not implemented" error.
    pub message: String,
}

/// Render a function whose body raises "not implemented".
pub fn render_stub(target: &str, spec: &FunctionSpec) -> String {
    let message = escape_str(&spec.message);
    let doc = spec.doc.as_deref().unwrap_or("");
    match target {
        "python" => {
            let params: Vec<String> = spec
                .params
                .iter()
                .map(|(name, ty)| match ty {
                    Some(ty) => format!("{name}: {ty}"),
                    None => name.clone(),
                })
                .collect();
            let ret = spec
                .return_type
                .as_ref()
                .map(|t| format!(" -> {t}"))
                .unwrap_or_default();
            format!(
                "def {}({}){ret}:\n{}    raise NotImplementedError(\"{message}\")\n",
                spec.name,
                params.join(", "),
                doc_comment(doc, "python", 4)
            )
        }
        "typescript" => {
            let params: Vec<String> = spec
                .params
                .iter()
                .map(|(name, ty)| format!("{name}: {}", ty.as_deref().unwrap_or("any")))
                .collect();
            let ret = spec
                .return_type
                .as_ref()
                .map(|t| format!(": {t}"))
                .unwrap_or_default();
            format!(
                "{}export function {}({}){ret} {{\n  throw new Error(\"{message}\");\n}}\n",
                doc_comment(doc, "typescript", 0),
                spec.name,
                params.join(", ")
            )
        }
        "go" => {
            let params: Vec<String> = spec
                .params
                .iter()
                .map(|(name, ty)| format!("{name} {}", ty.as_deref().unwrap_or("interface{}")))
                .collect();
            let ret = spec
                .return_type
                .as_ref()
                .map(|t| format!(" {t}"))
                .unwrap_or_default();
            format!(
                "{}func {}({}){ret} {{\n\tpanic(\"{message}\")\n}}\n",
                doc_comment(doc, "go", 0),
                spec.name,
                params.join(", ")
            )
        }
        "java" => {
            let params: Vec<String> = spec
                .params
                .iter()
                .map(|(name, ty)| format!("{} {name}", ty.as_deref().unwrap_or("Object")))
                .collect();
            format!(
                "{}public static {} {}({}) {{\n    throw new UnsupportedOperationException(\"{message}\");\n}}\n",
                doc_comment(doc, "java", 0),
                spec.return_type.as_deref().unwrap_or("void"),
                spec.name,
                params.join(", ")
            )
        }
        _ => String::new(),
    }
}

/// Replace every identifier-bounded occurrence of `old` with `new`.
/// Attribute accesses (`obj.old`) are left alone.
pub fn rename_identifier(code: &str, old: &str, new: &str) -> String {
    if old == new || old.is_empty() {
        return code.to_string();
    }
    let is_ident = |c: char| c.is_alphanumeric() || c == '_' || c == '$';
    let mut out = String::with_capacity(code.len());
    let mut copied = 0;
    let mut from = 0;
    while let Some(offset) = code[from..].find(old) {
        let start = from + offset;
        let end = start + old.len();
        let before_ok = code[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !is_ident(c) && c != '.');
        let after_ok = code[end..].chars().next().map_or(true, |c| !is_ident(c));
        if before_ok && after_ok {
            out.push_str(&code[copied..start]);
            out.push_str(new);
            copied = end;
        }
        from = end;
    }
    out.push_str(&code[copied..]);
    out
}

/// Rewrite a declaration so it is a public module-level function of the
/// unified module. Python drops `@staticmethod`, Java declarations become
/// `public static` members of the module class, TypeScript declarations are
/// exported functions. Other targets are returned unchanged.
pub fn as_module_function(code: &str, target: &str) -> String {
    let mut rewritten = false;
    let mut lines = Vec::new();
    for line in code.lines() {
        let trimmed = line.trim_start();
        if target == "python" && trimmed == "@staticmethod" {
            continue;
        }
        if rewritten || is_preamble_line(trimmed) {
            lines.push(line.to_string());
            continue;
        }
        rewritten = true;
        let pad = &line[..line.len() - trimmed.len()];
        let declaration = match target {
            "java" => {
                let (rest, _) = strip_leading_words(trimmed, JAVA_MODIFIERS);
                format!("{pad}public static {rest}")
            }
            "typescript" => {
                let (rest, stripped) = strip_leading_words(trimmed, TS_MODIFIERS);
                let is_function_form = rest.starts_with("function ")
                    || rest.starts_with("function*")
                    || ["const ", "let ", "var "].iter().any(|kw| rest.starts_with(kw));
                let mut decl = if is_function_form {
                    rest.to_string()
                } else {
                    format!("function {rest}")
                };
                if stripped.contains(&"async") {
                    decl = format!("async {decl}");
                }
                format!("{pad}export {decl}")
            }
            _ => line.to_string(),
        };
        lines.push(declaration);
    }
    lines.join("\n")
}

fn is_preamble_line(trimmed: &str) -> bool {
    trimmed.is_empty()
        || trimmed.starts_with('@')
        || trimmed.starts_with('#')
        || trimmed.starts_with("//")
        || trimmed.starts_with("/*")
        || trimmed.starts_with('*')
}

fn strip_leading_words<'a>(mut text: &'a str, words: &[&str]) -> (&'a str, Vec<&'a str>) {
    let mut stripped = Vec::new();
    while let Some((word, rest)) = text.split_once(char::is_whitespace) {
        if !words.contains(&word) {
            break;
        }
        stripped.push(word);
        text = rest.trim_start();
    }
    (text, stripped)
}

/// True when a TypeScript declaration can stand at module level.
pub fn is_top_level_typescript(code: &str) -> bool {
    code.lines()
        .map(str::trim_start)
        .find(|l| !l.is_empty() && !l.starts_with('@') && !l.starts_with("//"))
        .is_some_and(|first| {
            ["export ", "function ", "async function", "const ", "let ", "var ", "declare "]
                .iter()
                .any(|kw| first.starts_with(kw))
        })
}

/// Wrap function-level code in a complete module for `target`.
///
/// `header` becomes the module documentation. Java methods are placed in a
/// final class named `module_name`; TypeScript class methods in an exported
/// class of the same name.
pub fn render_module(target: &str, module_name: &str, header: &str, function_code: &str) -> String {
    let function_code = function_code.trim_end();
    match target {
        "python" => format!(
            "{}\n\nfrom __future__ import annotations\n\n\n{function_code}\n",
            doc_comment(header, "python", 0).trim_end()
        ),
        "typescript" => {
            let body = if is_top_level_typescript(function_code) {
                function_code.to_string()
            } else {
                format!(
                    "export class {} {{\n{}\n}}",
                    pascal_case(module_name),
                    indent(function_code, 2)
                )
            };
            format!("{}\n{body}\n", doc_comment(header, "typescript", 0))
        }
        "go" => format!(
            "{}package {UNIFIED_PACKAGE}\n\n{function_code}\n",
            doc_comment(header, "go", 0)
        ),
        "java" => format!(
            "package {UNIFIED_PACKAGE};\n\n{}public final class {module_name} {{\n    private {module_name}() {{}}\n\n{}\n}}\n",
            doc_comment(header, "java", 0),
            indent(function_code, 4)
        ),
        _ => format!("{function_code}\n"),
    }
}

/// Statement making `function_name` of the unified module visible in a
/// file of `ecosystem`. `None` for ecosystems without an import form.
pub fn import_statement(ecosystem: &str, pattern_name: &str, function_name: &str) -> Option<String> {
    let module = module_identifier(pattern_name, ecosystem);
    match ecosystem {
        "python" => Some(format!("from unified.{module} import {function_name}")),
        "typescript" => Some(format!("import {{ {function_name} }} from \"./unified/{module}\";")),
        "go" => Some(format!("import {UNIFIED_PACKAGE} \"{UNIFIED_PACKAGE}\"")),
        "java" => Some(format!("import static unified.{module}.{function_name};")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::syntax::check_syntax;

    fn spec(name: &str) -> FunctionSpec {
        FunctionSpec {
            name: name.to_string(),
            params: vec![("a".into(), None), ("b".into(), Some("int".into()))],
            return_type: None,
            doc: Some("Adds \"two\" values.\nSecond line.".into()),
            message: "not implemented: add (winner: go)".into(),
        }
    }

    #[test]
    fn test_stubs_are_valid_in_every_target() {
        for target in SUPPORTED_TARGETS {
            let name = conventional_name("add_values", target);
            let mut s = spec(&name);
            if *target == "typescript" {
                s.params[1].1 = Some("number".into());
            }
            let code = render_stub(target, &s);
            let module = render_module(
                target,
                &module_identifier("add_values", target),
                "Unified add_values.",
                &code,
            );
            assert_eq!(check_syntax(&module, target), Ok(true), "{target}:\n{module}");
        }
    }

    #[test]
    fn test_stub_raises_not_implemented() {
        assert!(render_stub("python", &spec("add")).contains("raise NotImplementedError("));
        assert!(render_stub("typescript", &spec("add")).contains("throw new Error("));
        assert!(render_stub("go", &spec("Add")).contains("panic(\""));
        assert!(render_stub("java", &spec("add")).contains("UnsupportedOperationException"));
    }

    #[test]
    fn test_naming_conventions() {
        assert_eq!(conventional_name("splitLines", "python"), "split_lines");
        assert_eq!(conventional_name("split_lines", "go"), "SplitLines");
        assert_eq!(conventional_name("split_lines", "java"), "splitLines");
        assert_eq!(module_file_name("split_lines", "java").unwrap(), "SplitLines.java");
        assert_eq!(module_file_name("split_lines", "python").unwrap(), "split_lines.py");
        assert!(module_file_name("x", "cobol").is_none());
    }

    #[test]
    fn test_sanitize_ident() {
        assert_eq!(sanitize_ident("*args", "python"), "args");
        assert_eq!(sanitize_ident("from", "python"), "from_");
        assert_eq!(sanitize_ident("type", "go"), "type_");
        assert_eq!(sanitize_ident("...rest", "typescript"), "rest");
        assert_eq!(sanitize_ident("", "java"), "arg");
    }

    #[test]
    fn test_strip_comment_lines() {
        let code = "def f():\n    # note\n    return 1";
        assert_eq!(strip_comment_lines(code, "python"), "def f():\n    return 1");
        let c = "/* a\n b */\nint f() {\n  // x\n  return 1; // keep\n}";
        assert_eq!(strip_comment_lines(c, "java"), "int f() {\n  return 1; // keep\n}");
    }

    #[test]
    fn test_dedent_and_class_wrapping() {
        let method = "    trim(s: string): string {\n      return s.trim();\n    }";
        let dedented = dedent(method);
        assert!(dedented.starts_with("trim("));
        assert!(!is_top_level_typescript(&dedented));
        let module = render_module("typescript", "trim", "Unified trim.", &dedented);
        assert!(module.contains("export class Trim {"));
        assert_eq!(check_syntax(&module, "typescript"), Ok(true));
    }

    #[test]
    fn test_rename_identifier_covers_recursive_calls() {
        let code = "def flattenDeep(xs):\n    \"\"\">>> flattenDeep([[1]])\"\"\"\n    return [y for x in xs for y in (flattenDeep(x) if isinstance(x, list) else [x])]";
        let renamed = rename_identifier(code, "flattenDeep", "flatten_deep");
        assert!(!renamed.contains("flattenDeep"), "{renamed}");
        assert!(renamed.starts_with("def flatten_deep(xs):"));
        assert!(renamed.contains("(flatten_deep(x) if"));
        assert_eq!(
            rename_identifier("splitLinesX(); splitLines(); s.splitLines()", "splitLines", "split_lines"),
            "splitLinesX(); split_lines(); s.splitLines()"
        );
    }

    #[test]
    fn test_as_module_function() {
        let java = "@Deprecated\nprivate static int twice(int x) {\n    return x * 2;\n}";
        assert_eq!(
            as_module_function(java, "java"),
            "@Deprecated\npublic static int twice(int x) {\n    return x * 2;\n}"
        );
        let ts = "static async load(path: string): Promise<string> {\n  return path;\n}";
        let exported = as_module_function(ts, "typescript");
        assert!(exported.starts_with("export async function load(path: string)"), "{exported}");
        assert!(is_top_level_typescript(&exported));
        assert_eq!(
            as_module_function("const twice = (n: number) => n * 2;", "typescript"),
            "export const twice = (n: number) => n * 2;"
        );
        assert_eq!(
            as_module_function("export function f() {}", "typescript"),
            "export function f() {}"
        );
        assert_eq!(
            as_module_function("@staticmethod\ndef trim(s):\n    return s.strip()", "python"),
            "def trim(s):\n    return s.strip()"
        );
    }

    #[test]
    fn test_java_module_is_importable() {
        let code = as_module_function("static int twice(int x) {\n    return x * 2;\n}", "java");
        let module = render_module("java", &module_identifier("twice", "java"), "Unified twice.", &code);
        assert!(module.starts_with("package unified;\n"));
        assert!(module.contains("    public static int twice(int x) {"));
        assert_eq!(check_syntax(&module, "java"), Ok(true), "{module}");
        let import = import_statement("java", "twice", "twice").unwrap();
        let class = module_identifier("twice", "java");
        assert_eq!(import, format!("import static {UNIFIED_PACKAGE}.{class}.twice;"));
        assert!(module.contains(&format!("public final class {class} {{")));
    }

    #[test]
    fn test_import_statements() {
        assert_eq!(
            import_statement("python", "split_lines", "split_lines").unwrap(),
            "from unified.split_lines import split_lines"
        );
        assert_eq!(
            import_statement("java", "split_lines", "splitLines").unwrap(),
            "import static unified.SplitLines.splitLines;"
        );
        assert!(import_statement("cobol", "x", "x").is_none());
    }
}
