//! Source rewriting capability used by the stripper.

use crate::models::FunctionSignature;

pub trait SourceRewriter: Send + Sync {
    fn can_rewrite(&self, ecosystem: &str) -> bool;

    /// Remove `removals` from one file's `source` and insert `references`
    /// after its header.
    fn rewrite(
        &self,
        source: &str,
        ecosystem: &str,
        removals: &[&FunctionSignature],
        references: &[String],
    ) -> Result<String, String>;
}

/// Removes each declaration's line range, from its doc block through its
/// last line, as recorded by the parser.
#[derive(Debug, Default, Clone, Copy)]
pub struct LineRangeRewriter;

const REWRITABLE: &[&str] = &["python", "typescript", "go", "java"];

impl SourceRewriter for LineRangeRewriter {
    fn can_rewrite(&self, ecosystem: &str) -> bool {
        REWRITABLE.contains(&ecosystem)
    }

    fn rewrite(
        &self,
        source: &str,
        ecosystem: &str,
        removals: &[&FunctionSignature],
        references: &[String],
    ) -> Result<String, String> {
        let lines: Vec<&str> = source.lines().collect();
        let mut removed = vec![false; lines.len()];
        for sig in removals {
            let start = sig.removal_start_line() as usize;
            let end = sig.location.end_line as usize;
            if start == 0 || end < start || end > lines.len() {
                return Err(format!(
                    "{} spans lines {start}-{end}, outside the {} line file",
                    sig.qualified_name(),
                    lines.len()
                ));
            }
            for flag in &mut removed[start - 1..end] {
                *flag = true;
            }
        }

        let header_end = header_end(&lines, ecosystem);
        let mut out: Vec<String> = Vec::with_capacity(lines.len() + references.len() + 2);
        for (idx, line) in lines.iter().enumerate() {
            if idx == header_end && !references.is_empty() {
                push_references(&mut out, references);
            }
            if !removed[idx] {
                out.push((*line).to_string());
            }
        }
        if header_end >= lines.len() && !references.is_empty() {
            push_references(&mut out, references);
        }

        if ecosystem == "python" {
            fill_empty_python_blocks(&mut out);
        }
        let max_blank = if ecosystem == "python" { 2 } else { 1 };
        let mut text = collapse_blank_runs(&out, max_blank).join("\n");
        text.push('\n');
        Ok(text)
    }
}

fn push_references(out: &mut Vec<String>, references: &[String]) {
    if out.last().is_some_and(|l| !l.trim().is_empty()) {
        out.push(String::new());
    }
    out.extend(references.iter().cloned());
    out.push(String::new());
}

/// Index of the first line after the file header: leading comments, the
/// python module docstring and `__future__` imports, or the `package`
/// clause in go and java.
fn header_end(lines: &[&str], ecosystem: &str) -> usize {
    match ecosystem {
        "go" | "java" => lines
            .iter()
            .position(|l| l.trim_start().starts_with("package "))
            .map(|idx| idx + 1)
            .unwrap_or(0),
        "python" => {
            let mut idx = skip_leading_comments(lines, 0, "#");
            if let Some(first) = lines.get(idx).map(|l| l.trim_start()) {
                let quote = ["\"\"\"", "'''"].into_iter().find(|q| first.starts_with(q));
                if let Some(quote) = quote {
                    let rest = &first[3..];
                    if !rest.contains(quote) {
                        idx += 1;
                        while idx < lines.len() && !lines[idx].contains(quote) {
                            idx += 1;
                        }
                    }
                    idx += 1;
                }
            }
            while idx < lines.len()
                && (lines[idx].trim().is_empty() || lines[idx].starts_with("from __future__"))
            {
                idx += 1;
            }
            idx.min(lines.len())
        }
        _ => skip_leading_comments(lines, 0, "//"),
    }
}

fn skip_leading_comments(lines: &[&str], mut idx: usize, prefix: &str) -> usize {
    let mut in_block = false;
    while idx < lines.len() {
        let trimmed = lines[idx].trim_start();
        if in_block {
            in_block = !trimmed.contains("*/");
        } else if prefix == "//" && trimmed.starts_with("/*") {
            in_block = !trimmed.contains("*/");
        } else if !(trimmed.is_empty() || trimmed.starts_with(prefix)) {
            break;
        }
        idx += 1;
    }
    idx
}

/// A python block whose whole body was removed needs a `pass`.
fn fill_empty_python_blocks(lines: &mut Vec<String>) {
    let mut idx = 0;
    while idx < lines.len() {
        let line = &lines[idx];
        let trimmed = line.trim();
        let opens_block = trimmed.ends_with(':')
            && ["class ", "def ", "async def ", "if ", "else", "try", "with ", "for ", "while "]
                .iter()
                .any(|kw| trimmed.starts_with(kw));
        if opens_block {
            let indent = line.len() - line.trim_start().len();
            let body = lines[idx + 1..]
                .iter()
                .find(|l| !l.trim().is_empty())
                .map(|l| l.len() - l.trim_start().len());
            if body.map_or(true, |b| b <= indent) {
                lines.insert(idx + 1, format!("{}pass", " ".repeat(indent + 4)));
            }
        }
        idx += 1;
    }
}

fn collapse_blank_runs(lines: &[String], max_blank: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut blanks = 0;
    for line in lines {
        if line.trim().is_empty() {
            blanks += 1;
            if blanks > max_blank {
                continue;
            }
        } else {
            blanks = 0;
        }
        out.push(line.clone());
    }
    while out.last().is_some_and(|l| l.trim().is_empty()) {
        out.pop();
    }
    out
}
