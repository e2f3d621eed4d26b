//! Line-scanning helpers shared by the language adapters: header joining,
//! extent detection, doc-comment discovery and example extraction.

use std::sync::LazyLock;

use regex::Regex;

/// Signatures spread over more lines than this are not joined further.
const MAX_HEADER_LINES: usize = 40;

static EXAMPLE_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*examples?\s*:?\s*$").unwrap());

/// Join a declaration that may span several lines until its parameter list
/// closes. Returns the joined text and the index of the last consumed line.
pub fn collect_header(lines: &[&str], start: usize) -> (String, usize) {
    let mut header = String::new();
    let mut depth = 0i32;
    let mut seen_open = false;
    let last = (start + MAX_HEADER_LINES).min(lines.len());
    for (idx, line) in lines.iter().enumerate().take(last).skip(start) {
        if !header.is_empty() {
            header.push(' ');
        }
        header.push_str(line.trim());
        for ch in line.chars() {
            match ch {
                '(' => {
                    depth += 1;
                    seen_open = true;
                }
                ')' => depth -= 1,
                _ => {}
            }
        }
        if seen_open && depth <= 0 {
            return (header, idx);
        }
    }
    (header, last.saturating_sub(1).max(start))
}

/// Find the parenthesised group opening at `open_idx` and return its inner
/// text plus the byte index of the closing parenthesis.
pub fn balanced_group(text: &str, open_idx: usize) -> Option<(&str, usize)> {
    let bytes = text.as_bytes();
    if bytes.get(open_idx) != Some(&b'(') {
        return None;
    }
    let mut depth = 0i32;
    for (offset, ch) in text[open_idx..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    let close = open_idx + offset;
                    return Some((&text[open_idx + 1..close], close));
                }
            }
            _ => {}
        }
    }
    None
}

/// Count brace depth change of one line, ignoring string literals and
/// `//` comments.
fn brace_delta(line: &str) -> (i32, bool) {
    let mut delta = 0i32;
    let mut opened = false;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut previous = ' ';
    for ch in line.chars() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            previous = ch;
            continue;
        }
        match ch {
            '"' | '\'' | '`' => quote = Some(ch),
            '/' if previous == '/' => break,
            '{' => {
                delta += 1;
                opened = true;
            }
            '}' => delta -= 1,
            _ => {}
        }
        previous = ch;
    }
    (delta, opened)
}

/// Last line index of a brace-delimited body whose header starts at `start`.
///
/// Declarations without a body (`;` terminated) end on `header_end`.
pub fn brace_extent(lines: &[&str], start: usize, header_end: usize) -> usize {
    let mut depth = 0i32;
    let mut opened = false;
    for (idx, line) in lines.iter().enumerate().skip(start) {
        let (delta, saw_open) = brace_delta(line);
        depth += delta;
        opened |= saw_open;
        if opened && depth <= 0 {
            return idx;
        }
        if !opened && idx >= header_end {
            let trimmed = line.trim_end();
            if trimmed.ends_with(';') {
                return idx;
            }
            // Arrow functions with an expression body continue until `;`.
            if idx > header_end + MAX_HEADER_LINES {
                return header_end;
            }
        }
    }
    lines.len().saturating_sub(1).max(header_end)
}

pub fn indent_of(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

/// Last line index of an indentation-delimited body (Python).
pub fn indent_extent(lines: &[&str], decl: usize, header_end: usize) -> usize {
    let base = indent_of(lines[decl]);
    let mut end = header_end;
    for (idx, line) in lines.iter().enumerate().skip(header_end + 1) {
        if line.trim().is_empty() {
            continue;
        }
        if indent_of(line) <= base {
            break;
        }
        end = idx;
    }
    end
}

/// Walk upward from `decl` over annotation/decorator lines.
/// Returns the index of the first annotation line (or `decl` itself).
pub fn skip_annotations_up(lines: &[&str], decl: usize) -> usize {
    let mut first = decl;
    while first > 0 {
        let trimmed = lines[first - 1].trim();
        if trimmed.starts_with('@') {
            first -= 1;
        } else {
            break;
        }
    }
    first
}

/// Doc block found immediately above a declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct DocBlock {
    pub text: String,
    pub start: usize,
}

/// Scan backward from `above` (exclusive) for the nearest doc comment.
///
/// Blank lines between the comment and the declaration are allowed; any
/// other code line ends the search. `line_prefix` is the single-line comment
/// marker of the ecosystem (`//` or `#`).
pub fn doc_before(lines: &[&str], above: usize, line_prefix: &str) -> Option<DocBlock> {
    let mut idx = above;
    while idx > 0 && lines[idx - 1].trim().is_empty() {
        idx -= 1;
    }
    if idx == 0 {
        return None;
    }
    let last = lines[idx - 1].trim();

    if last.ends_with("*/") {
        let mut start = idx - 1;
        loop {
            if lines[start].trim_start().starts_with("/*") {
                break;
            }
            if start == 0 {
                return None;
            }
            start -= 1;
        }
        let raw: Vec<&str> = lines[start..idx].to_vec();
        return Some(DocBlock {
            text: clean_block_comment(&raw),
            start,
        });
    }

    if last.starts_with(line_prefix) {
        let mut start = idx - 1;
        while start > 0 && lines[start - 1].trim().starts_with(line_prefix) {
            start -= 1;
        }
        let text = lines[start..idx]
            .iter()
            .map(|l| strip_line_comment(l.trim(), line_prefix))
            .collect::<Vec<_>>()
            .join("\n");
        return Some(DocBlock {
            text: text.trim().to_string(),
            start,
        });
    }
    None
}

fn strip_line_comment<'a>(line: &'a str, prefix: &str) -> &'a str {
    let mut rest = line.trim_start_matches(prefix);
    // `///` and `#!` style variants
    rest = rest.trim_start_matches('/').trim_start_matches('!');
    rest.strip_prefix(' ').unwrap_or(rest).trim_end()
}

/// Strip `/** ... */` delimiters and leading `*` gutters.
pub fn clean_block_comment(raw: &[&str]) -> String {
    let mut out = Vec::new();
    for line in raw {
        let mut text = line.trim();
        text = text.trim_start_matches("/**").trim_start_matches("/*");
        text = text.trim_end_matches("*/");
        let text = text.trim();
        let text = text.strip_prefix('*').unwrap_or(text);
        out.push(text.strip_prefix(' ').unwrap_or(text).trim_end().to_string());
    }
    out.join("\n").trim().to_string()
}

/// Read a Python docstring starting at the first non-blank line after
/// `header_end`. Returns the cleaned text and the index of its last line.
pub fn python_docstring(lines: &[&str], header_end: usize) -> Option<(String, usize)> {
    let mut idx = header_end + 1;
    while idx < lines.len() && lines[idx].trim().is_empty() {
        idx += 1;
    }
    docstring_at(lines, idx)
}

/// Docstring literal beginning on line `idx`, if any.
pub fn docstring_at(lines: &[&str], idx: usize) -> Option<(String, usize)> {
    let first = lines.get(idx)?.trim();
    let body = first.trim_start_matches(['r', 'R', 'u', 'U']);
    let delim = if body.starts_with("\"\"\"") {
        "\"\"\""
    } else if body.starts_with("'''") {
        "'''"
    } else {
        return None;
    };
    let after_open = &body[3..];
    if let Some(close) = after_open.find(delim) {
        return Some((after_open[..close].trim().to_string(), idx));
    }

    let mut collected = vec![after_open.to_string()];
    for (offset, line) in lines.iter().enumerate().skip(idx + 1) {
        if let Some(close) = line.find(delim) {
            collected.push(line[..close].to_string());
            return Some((dedent(&collected), offset));
        }
        collected.push(line.to_string());
    }
    None
}

fn dedent(lines: &[String]) -> String {
    let common = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| indent_of(l))
        .min()
        .unwrap_or(0);
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            out.push(line.trim().to_string());
        } else {
            out.push(line.chars().skip(common).collect::<String>().trim_end().to_string());
        }
    }
    out.join("\n").trim().to_string()
}

/// Pull usage examples out of a doc block.
///
/// Recognises fenced code blocks, `>>>` doctest runs, `@example` sections,
/// `<pre>` blocks and indented lines under an `Example:` heading.
pub fn extract_examples(doc: &str) -> Vec<String> {
    let mut examples = Vec::new();
    let lines: Vec<&str> = doc.lines().collect();
    let mut i = 0;
    while i < lines.len() {
        let trimmed = lines[i].trim();

        if trimmed.starts_with("```") {
            let mut block = Vec::new();
            i += 1;
            while i < lines.len() && !lines[i].trim().starts_with("```") {
                block.push(lines[i]);
                i += 1;
            }
            push_example(&mut examples, &block);
            i += 1;
            continue;
        }

        if trimmed.starts_with(">>>") {
            let mut block = Vec::new();
            while i < lines.len() {
                let t = lines[i].trim();
                if t.is_empty() {
                    break;
                }
                block.push(lines[i]);
                i += 1;
            }
            push_example(&mut examples, &block);
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix("@example") {
            let mut block = Vec::new();
            if !rest.trim().is_empty() {
                block.push(rest.trim());
            }
            i += 1;
            while i < lines.len() && !lines[i].trim().starts_with('@') {
                block.push(lines[i]);
                i += 1;
            }
            push_example(&mut examples, &block);
            continue;
        }

        if trimmed.starts_with("<pre>") {
            let mut block = Vec::new();
            let first = trimmed.trim_start_matches("<pre>");
            if let Some(inline) = first.strip_suffix("</pre>") {
                push_example(&mut examples, &[inline]);
                i += 1;
                continue;
            }
            if !first.trim().is_empty() {
                block.push(first);
            }
            i += 1;
            while i < lines.len() && !lines[i].contains("</pre>") {
                block.push(lines[i]);
                i += 1;
            }
            push_example(&mut examples, &block);
            i += 1;
            continue;
        }

        if EXAMPLE_HEADING_RE.is_match(lines[i]) {
            let mut block = Vec::new();
            i += 1;
            while i < lines.len() {
                let line = lines[i];
                if line.trim().is_empty() && block.is_empty() {
                    i += 1;
                    continue;
                }
                if line.trim().is_empty() || indent_of(line) == 0 {
                    break;
                }
                block.push(line);
                i += 1;
            }
            push_example(&mut examples, &block);
            continue;
        }

        i += 1;
    }
    examples
}

fn push_example(examples: &mut Vec<String>, block: &[&str]) {
    let text = block
        .iter()
        .map(|l| l.trim_end())
        .collect::<Vec<_>>()
        .join("\n");
    let text = text.trim();
    if !text.is_empty() {
        examples.push(text.to_string());
    }
}
