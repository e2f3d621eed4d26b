//! Shared typed models flowing between the parse, match, rank, extract and
//! strip stages.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Sentinel type name for declarations without an explicit annotation.
pub const UNKNOWN_TYPE: &str = "unknown";

/// Metadata key carrying the owning ecosystem tag of a signature.
pub const ECOSYSTEM_KEY: &str = "ecosystem";

/// Metadata key naming the class or receiver type that owns a method.
pub const OWNER_KEY: &str = "owner";

/// Metadata key set to `"true"` for static methods.
pub const STATIC_KEY: &str = "static";

// ---------------------------------------------------------------------------
// 1. SourceLocation
// ---------------------------------------------------------------------------

/// File span of an extracted entity. Lines and columns are 1-based.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, start_line: u32, start_column: u32) -> Self {
        Self {
            file: file.into(),
            start_line,
            start_column,
            end_line: start_line,
            end_column: start_column,
        }
    }

    pub fn with_end(mut self, end_line: u32, end_column: u32) -> Self {
        self.end_line = end_line.max(self.start_line);
        self.end_column = end_column;
        self
    }

    pub fn line_count(&self) -> u32 {
        self.end_line - self.start_line + 1
    }
}

// ---------------------------------------------------------------------------
// 2. TypeRef
// ---------------------------------------------------------------------------

/// A type name with nested type parameters, e.g. `List<String>`.
///
/// Unions (`string | null`) are represented with the name `union` and tuples
/// (`(int, error)`) with the name `tuple`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<TypeRef>,
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
        }
    }

    pub fn generic(name: impl Into<String>, params: Vec<TypeRef>) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    pub fn unknown() -> Self {
        Self::named(UNKNOWN_TYPE)
    }

    pub fn is_unknown(&self) -> bool {
        self.name == UNKNOWN_TYPE
    }

    /// True for return types that carry no value.
    pub fn is_void(&self) -> bool {
        matches!(
            self.name.to_ascii_lowercase().as_str(),
            "void" | "none" | "unit" | "()"
        )
    }

    /// Parse a raw annotation as written in source.
    ///
    /// Understands angle-bracket and square-bracket generics, `T[]` and `[]T`
    /// arrays, `*T` pointers, `A | B` unions and parenthesised tuples. Anything
    /// it cannot split is kept verbatim as a bare name.
    pub fn parse(raw: &str) -> Self {
        let text = raw.trim().trim_end_matches(';').trim();
        if text.is_empty() {
            return Self::unknown();
        }

        let union_parts = split_top_level(text, '|');
        if union_parts.len() > 1 {
            return Self::generic(
                "union",
                union_parts.iter().map(|part| Self::parse(part)).collect(),
            );
        }

        if text.starts_with('(') && text.ends_with(')') {
            let inner = &text[1..text.len() - 1];
            let parts = split_top_level(inner, ',');
            if parts.len() == 1 {
                return Self::parse(&parts[0]);
            }
            return Self::generic("tuple", parts.iter().map(|p| Self::parse(p)).collect());
        }

        if let Some(rest) = text.strip_prefix("[]") {
            return Self::generic("Array", vec![Self::parse(rest)]);
        }
        if let Some(rest) = text.strip_suffix("[]") {
            return Self::generic("Array", vec![Self::parse(rest)]);
        }
        if let Some(rest) = text.strip_prefix('*') {
            return Self::generic("Pointer", vec![Self::parse(rest)]);
        }

        for (open, close) in [('<', '>'), ('[', ']')] {
            if let Some(start) = text.find(open) {
                if text.ends_with(close) && start > 0 {
                    let name = text[..start].trim();
                    let inner = &text[start + 1..text.len() - 1];
                    let params = split_top_level(inner, ',')
                        .iter()
                        .filter(|p| !p.trim().is_empty())
                        .map(|p| Self::parse(p))
                        .collect();
                    return Self::generic(name, params);
                }
            }
        }

        Self::named(text)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name.as_str() {
            "union" => {
                let parts: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
                write!(f, "{}", parts.join(" | "))
            }
            "tuple" => {
                let parts: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
                write!(f, "({})", parts.join(", "))
            }
            _ if self.params.is_empty() => write!(f, "{}", self.name),
            _ => {
                let parts: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
                write!(f, "{}<{}>", self.name, parts.join(", "))
            }
        }
    }
}

/// Split `text` on `separator` occurrences that are not nested in brackets
/// or string literals.
pub fn split_top_level(text: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    let mut previous = ' ';
    let mut quote: Option<char> = None;
    for ch in text.chars() {
        if let Some(q) = quote {
            if ch == q && previous != '\\' {
                quote = None;
            }
            previous = ch;
            current.push(ch);
            continue;
        }
        match ch {
            '"' | '\'' | '`' => quote = Some(ch),
            '<' | '[' | '(' | '{' => depth += 1,
            // `=>` in arrow types is not a closing bracket
            '>' if previous == '=' => {}
            '>' | ']' | ')' | '}' => depth = (depth - 1).max(0),
            _ => {}
        }
        previous = ch;
        if ch == separator && depth == 0 {
            parts.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(ch);
        }
    }
    if !current.trim().is_empty() || !parts.is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

// ---------------------------------------------------------------------------
// 3. Parameter / FunctionSignature
// ---------------------------------------------------------------------------

/// A single declared parameter of a function.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub type_ref: TypeRef,
    pub default_value: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, type_ref: TypeRef) -> Self {
        Self {
            name: name.into(),
            type_ref,
            default_value: None,
        }
    }
}

/// A function declaration extracted from one library.
///
/// Identity is `(module_path, name)`; overloads may share it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub name: String,
    pub module_path: String,
    pub parameters: Vec<Parameter>,
    pub return_type: TypeRef,
    pub documentation: String,
    pub examples: Vec<String>,
    pub location: SourceLocation,
    /// First line of the doc block when it precedes the declaration.
    pub doc_start_line: Option<u32>,
    /// Verbatim declaration text, when the adapter could capture it.
    pub source_text: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl FunctionSignature {
    pub fn new(
        name: impl Into<String>,
        module_path: impl Into<String>,
        location: SourceLocation,
    ) -> Self {
        Self {
            name: name.into(),
            module_path: module_path.into(),
            parameters: Vec::new(),
            return_type: TypeRef::unknown(),
            documentation: String::new(),
            examples: Vec::new(),
            location,
            doc_start_line: None,
            source_text: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn qualified_name(&self) -> String {
        if self.module_path.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.module_path, self.name)
        }
    }

    /// Owning ecosystem tag stashed in the metadata map by the parser.
    pub fn ecosystem(&self) -> &str {
        self.metadata
            .get(ECOSYSTEM_KEY)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn with_ecosystem(mut self, ecosystem: &str) -> Self {
        self.metadata
            .insert(ECOSYSTEM_KEY.to_string(), ecosystem.to_string());
        self
    }

    /// Record the class or receiver type owning this declaration.
    pub fn with_owner(mut self, owner: &str, is_static: bool) -> Self {
        self.metadata.insert(OWNER_KEY.to_string(), owner.to_string());
        if is_static {
            self.metadata
                .insert(STATIC_KEY.to_string(), "true".to_string());
        }
        self
    }

    pub fn owner(&self) -> Option<&str> {
        self.metadata.get(OWNER_KEY).map(String::as_str)
    }

    pub fn is_static(&self) -> bool {
        self.metadata.get(STATIC_KEY).is_some_and(|v| v == "true")
    }

    /// A method bound to an instance (or a go receiver): its body refers
    /// to state that does not exist outside the owning type.
    pub fn is_instance_method(&self) -> bool {
        self.owner().is_some() && !self.is_static()
    }

    /// First line of the stripped range: the doc block if it precedes the
    /// declaration, otherwise the declaration itself.
    pub fn removal_start_line(&self) -> u32 {
        self.doc_start_line
            .map(|line| line.min(self.location.start_line))
            .unwrap_or(self.location.start_line)
    }

    /// A one-line rendering used in reports and similarity prompts.
    pub fn render(&self) -> String {
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| {
                if p.type_ref.is_unknown() {
                    p.name.clone()
                } else {
                    format!("{}: {}", p.name, p.type_ref)
                }
            })
            .collect();
        format!("{}({}) -> {}", self.name, params.join(", "), self.return_type)
    }
}

// ---------------------------------------------------------------------------
// 4. Module / Library
// ---------------------------------------------------------------------------

/// One source unit (file, or a class nested in a file).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub path: String,
    pub functions: Vec<FunctionSignature>,
    pub submodules: Vec<Module>,
    pub documentation: String,
    pub location: Option<SourceLocation>,
}

impl Module {
    /// All functions, including those owned by nested modules, in source order.
    pub fn all_functions(&self) -> Vec<&FunctionSignature> {
        let mut out: Vec<&FunctionSignature> = self.functions.iter().collect();
        for sub in &self.submodules {
            out.extend(sub.all_functions());
        }
        out
    }
}

/// A per-file failure recorded during a safe parse.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParseWarning {
    pub path: String,
    pub reason: String,
}

/// One analyzed standard library. Immutable once the parser returns it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Library {
    pub ecosystem: String,
    pub root: PathBuf,
    pub modules: IndexMap<String, Module>,
    pub functions: Vec<FunctionSignature>,
    pub metadata: BTreeMap<String, String>,
    pub parse_warnings: Vec<ParseWarning>,
}

impl Library {
    pub fn new(ecosystem: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            ecosystem: ecosystem.into(),
            root: root.into(),
            modules: IndexMap::new(),
            functions: Vec::new(),
            metadata: BTreeMap::new(),
            parse_warnings: Vec::new(),
        }
    }

    /// Append a module and its functions to the flattened list.
    pub fn add_module(&mut self, module: Module) {
        self.functions
            .extend(module.all_functions().into_iter().cloned());
        self.modules.insert(module.name.clone(), module);
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

// ---------------------------------------------------------------------------
// 5. Cluster / Pattern
// ---------------------------------------------------------------------------

/// Transient group of name-similar functions.
#[derive(Clone, Debug)]
pub struct Cluster {
    pub members: Vec<FunctionSignature>,
    pub centroid: String,
    pub mean_distance: f64,
}

/// Cross-ecosystem equivalence class.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub id: String,
    pub name: String,
    /// Ecosystem tag → chosen representative, in lexical tag order.
    pub implementations: IndexMap<String, FunctionSignature>,
    pub similarity_score: f64,
    pub is_universal: bool,
    pub category: String,
    pub metadata: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// 6. Ranking
// ---------------------------------------------------------------------------

/// Scored comparison of a pattern's implementations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    pub pattern: Pattern,
    pub scores: IndexMap<String, f64>,
    /// Ecosystem → criterion name → raw criterion score.
    pub criterion_scores: IndexMap<String, IndexMap<String, f64>>,
    pub best_ecosystem: String,
    pub best_implementation: FunctionSignature,
    pub justification: String,
}

// ---------------------------------------------------------------------------
// 7. Translation / ExtractedModule / StrippedLibrary
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub source_ecosystem: String,
    pub target_ecosystem: String,
    pub source_code: String,
    pub target_code: String,
    pub confidence: f64,
    pub warnings: Vec<String>,
}

/// How an extracted module's body was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionKind {
    /// Winner already in the target ecosystem.
    Direct,
    /// A registered translator produced the code.
    Translated,
    /// No usable translation; the module raises "not implemented".
    Placeholder,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractedModule {
    pub pattern: Pattern,
    pub ranking: Ranking,
    pub translation: Option<Translation>,
    pub kind: ExtractionKind,
    pub output_path: PathBuf,
    pub code: String,
    pub warnings: Vec<String>,
}

/// Whether stripping mutated source or only documented the removals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StripMode {
    Rewritten,
    DocumentationOnly,
}

impl fmt::Display for StripMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StripMode::Rewritten => write!(f, "rewritten"),
            StripMode::DocumentationOnly => write!(f, "documentation-only"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StrippedLibrary {
    pub library: Arc<Library>,
    pub removed: Vec<FunctionSignature>,
    pub added_references: Vec<String>,
    pub output_dir: PathBuf,
    pub migration_note: PathBuf,
    pub mode: StripMode,
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// 8. MergeResult
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MergeResult {
    pub patterns: Vec<Pattern>,
    pub rankings: Vec<Ranking>,
    pub extracted: Vec<ExtractedModule>,
    pub stripped: Vec<StrippedLibrary>,
    pub reports: IndexMap<String, PathBuf>,
    pub statistics: IndexMap<String, u64>,
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_ref_generic() {
        let t = TypeRef::parse("List<String>");
        assert_eq!(t.name, "List");
        assert_eq!(t.params, vec![TypeRef::named("String")]);
        assert_eq!(t.to_string(), "List<String>");
    }

    #[test]
    fn test_type_ref_nested_generic() {
        let t = TypeRef::parse("Map<String, List<Integer>>");
        assert_eq!(t.name, "Map");
        assert_eq!(t.params.len(), 2);
        assert_eq!(t.params[1].name, "List");
        assert_eq!(t.params[1].params[0].name, "Integer");
    }

    #[test]
    fn test_type_ref_python_brackets() {
        let t = TypeRef::parse("Optional[str]");
        assert_eq!(t.name, "Optional");
        assert_eq!(t.params[0].name, "str");
    }

    #[test]
    fn test_type_ref_union_and_tuple() {
        let u = TypeRef::parse("string | null");
        assert_eq!(u.name, "union");
        assert_eq!(u.params.len(), 2);

        let t = TypeRef::parse("(int, error)");
        assert_eq!(t.name, "tuple");
        assert_eq!(t.params[1].name, "error");
    }

    #[test]
    fn test_type_ref_arrays() {
        assert_eq!(TypeRef::parse("[]string").name, "Array");
        assert_eq!(TypeRef::parse("number[]").params[0].name, "number");
    }

    #[test]
    fn test_type_ref_empty_is_unknown() {
        assert!(TypeRef::parse("  ").is_unknown());
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(TypeRef::parse("List<int>"), TypeRef::parse("List< int >"));
    }

    #[test]
    fn test_split_top_level_respects_nesting() {
        let parts = split_top_level("a: Map<K, V>, b: int", ',');
        assert_eq!(parts, vec!["a: Map<K, V>", "b: int"]);

        let quoted = split_top_level("sep: str = \",\", n", ',');
        assert_eq!(quoted, vec!["sep: str = \",\"", "n"]);
    }

    #[test]
    fn test_library_flattens_nested_functions() {
        let loc = SourceLocation::new("A.java", 3, 5);
        let mut class = Module {
            name: "A".into(),
            ..Default::default()
        };
        class
            .functions
            .push(FunctionSignature::new("run", "A", loc.clone()));
        let file = Module {
            name: "pkg.A".into(),
            submodules: vec![class],
            ..Default::default()
        };
        let mut lib = Library::new("java", "/tmp");
        lib.add_module(file);
        assert_eq!(lib.functions.len(), 1);
        assert_eq!(lib.functions[0].name, "run");
    }

    #[test]
    fn test_removal_start_prefers_doc_block() {
        let mut sig = FunctionSignature::new("f", "m", SourceLocation::new("m.go", 10, 1));
        assert_eq!(sig.removal_start_line(), 10);
        sig.doc_start_line = Some(7);
        assert_eq!(sig.removal_start_line(), 7);
    }
}
