//! Syntax check of generated code with the native tree-sitter grammars.

/// Ecosystems with a bundled grammar.
pub const CHECKED_ECOSYSTEMS: &[&str] = &["python", "typescript", "go", "java"];

fn grammar(ecosystem: &str) -> Option<tree_sitter::Language> {
    let language = match ecosystem {
        "python" => tree_sitter_python::LANGUAGE,
        "typescript" => tree_sitter_typescript::LANGUAGE_TYPESCRIPT,
        "go" => tree_sitter_go::LANGUAGE,
        "java" => tree_sitter_java::LANGUAGE,
        _ => return None,
    };
    Some(language.into())
}

/// `Ok(true)` when `source` parses without error nodes, `Ok(false)` when it
/// has syntax errors, `Err` when no grammar is available or the parser
/// could not run.
pub fn check_syntax(source: &str, ecosystem: &str) -> Result<bool, String> {
    let language =
        grammar(ecosystem).ok_or_else(|| format!("No tree-sitter grammar for: {ecosystem}"))?;
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&language)
        .map_err(|e| format!("Failed to set language: {e}"))?;
    let tree = parser
        .parse(source.as_bytes(), None)
        .ok_or_else(|| format!("Failed to parse generated {ecosystem} code"))?;
    Ok(!tree.root_node().has_error())
}
