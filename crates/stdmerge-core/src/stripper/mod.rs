//! Library Stripper: removes the functions a unified module now provides
//! and points each library at the replacement.
//!
//! Stripping never edits the original library root. It writes a rewritten
//! copy under `<output>/stripped_libraries/<ecosystem>/` when a rewriter
//! supports the ecosystem and rewriting is enabled. Otherwise it only
//! writes the migration note and says so in it.

pub mod rewrite;

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, info, warn};

use crate::config::{ExtractionConfig, StripConfig};
use crate::errors::StdResult;
use crate::extractor::emit;
use crate::models::{FunctionSignature, Library, Pattern, Ranking, StripMode, StrippedLibrary};
pub use rewrite::{LineRangeRewriter, SourceRewriter};

pub const STRIPPED_DIR: &str = "stripped_libraries";
pub const MIGRATION_NOTE: &str = "MIGRATION.md";

/// One planned removal and the reference that replaces it.
#[derive(Clone, Debug)]
struct Removal {
    sig: FunctionSignature,
    pattern: String,
    module_file: String,
    replacement: String,
    reference: String,
}

pub struct Stripper {
    config: StripConfig,
    target: String,
    normalize_api: bool,
    rewriters: Vec<Arc<dyn SourceRewriter>>,
    winners: HashMap<String, String>,
}

impl Stripper {
    pub fn new(config: StripConfig, extraction: &ExtractionConfig) -> Self {
        Self {
            config,
            target: extraction.target_ecosystem.clone(),
            normalize_api: extraction.normalize_api,
            rewriters: vec![Arc::new(LineRangeRewriter)],
            winners: HashMap::new(),
        }
    }

    /// Use the winners' names for references when names are not normalized.
    pub fn with_rankings(mut self, rankings: &[Ranking]) -> Self {
        for ranking in rankings {
            self.winners.insert(
                ranking.pattern.id.clone(),
                ranking.best_implementation.name.clone(),
            );
        }
        self
    }

    /// Rewriters registered later take precedence.
    pub fn with_rewriter(mut self, rewriter: Arc<dyn SourceRewriter>) -> Self {
        self.rewriters.insert(0, rewriter);
        self
    }

    /// Only documentation is produced; no rewriter is consulted.
    pub fn documentation_only(mut self) -> Self {
        self.rewriters.clear();
        self
    }

    fn rewriter_for(&self, ecosystem: &str) -> Option<&Arc<dyn SourceRewriter>> {
        if !self.config.rewrite_sources {
            return None;
        }
        self.rewriters.iter().find(|r| r.can_rewrite(ecosystem))
    }

    fn unified_name(&self, pattern: &Pattern) -> String {
        let winner = self
            .winners
            .get(&pattern.id)
            .map(String::as_str)
            .unwrap_or(pattern.name.as_str());
        emit::unified_function_name(&pattern.name, winner, &self.target, self.normalize_api)
    }

    fn plan(&self, library: &Library, patterns: &[Pattern]) -> Vec<Removal> {
        let ecosystem = library.ecosystem.as_str();
        let same_target = ecosystem == self.target;
        let prefix = emit::comment_prefix(ecosystem);
        patterns
            .iter()
            .filter_map(|pattern| {
                let sig = pattern.implementations.get(ecosystem)?;
                let replacement = self.unified_name(pattern);
                let module_file = emit::module_file_name(&pattern.name, &self.target)
                    .unwrap_or_else(|| pattern.name.clone());
                let import = if same_target {
                    emit::import_statement(ecosystem, &pattern.name, &replacement)
                } else {
                    None
                };
                let reference = import.unwrap_or_else(|| {
                    format!(
                        "{prefix} {} moved to unified module {module_file} ({}: {replacement})",
                        sig.qualified_name(),
                        self.target
                    )
                });
                Some(Removal {
                    sig: sig.clone(),
                    pattern: pattern.name.clone(),
                    module_file,
                    replacement,
                    reference,
                })
            })
            .collect()
    }

    pub fn strip(
        &self,
        library: &Arc<Library>,
        patterns: &[Pattern],
        output_root: &Path,
    ) -> StdResult<StrippedLibrary> {
        let ecosystem = library.ecosystem.as_str();
        let output_dir = output_root.join(STRIPPED_DIR).join(ecosystem);
        std::fs::create_dir_all(&output_dir)?;

        let removals = self.plan(library, patterns);
        let mut warnings = Vec::new();
        let mode = match self.rewriter_for(ecosystem) {
            Some(rewriter) => {
                self.write_rewritten_tree(library, rewriter.as_ref(), &removals, &output_dir, &mut warnings)?;
                StripMode::Rewritten
            }
            None => {
                let reason = if self.config.rewrite_sources {
                    format!("no source rewriter for {ecosystem}")
                } else {
                    "source rewriting disabled".to_string()
                };
                let warning = format!(
                    "library {ecosystem}: {reason}; stripping is documentation-only"
                );
                warn!(ecosystem, "{warning}");
                warnings.push(warning);
                StripMode::DocumentationOnly
            }
        };

        let references: Vec<String> = removals
            .iter()
            .map(|r| r.reference.clone())
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect();
        let migration_note = output_dir.join(MIGRATION_NOTE);
        let note = render_migration_note(library, &removals, &references, mode, &self.target, &warnings);
        std::fs::write(&migration_note, note)?;

        info!(
            ecosystem,
            mode = %mode,
            removed = removals.len(),
            output = %output_dir.display(),
            "library stripped"
        );
        Ok(StrippedLibrary {
            library: Arc::clone(library),
            removed: removals.into_iter().map(|r| r.sig).collect(),
            added_references: references,
            output_dir,
            migration_note,
            mode,
            warnings,
        })
    }

    pub fn strip_all(
        &self,
        libraries: &[Arc<Library>],
        patterns: &[Pattern],
        output_root: &Path,
    ) -> StdResult<Vec<StrippedLibrary>> {
        libraries
            .iter()
            .map(|lib| self.strip(lib, patterns, output_root))
            .collect()
    }

    /// Copy every parsed file into `output_dir`, rewriting those that lose
    /// functions. A file the rewriter rejects is copied unchanged.
    fn write_rewritten_tree(
        &self,
        library: &Library,
        rewriter: &dyn SourceRewriter,
        removals: &[Removal],
        output_dir: &Path,
        warnings: &mut Vec<String>,
    ) -> StdResult<()> {
        let mut by_file: IndexMap<&str, Vec<&Removal>> = IndexMap::new();
        for removal in removals {
            by_file
                .entry(removal.sig.location.file.as_str())
                .or_default()
                .push(removal);
        }

        let files: IndexSet<&str> = library.modules.values().map(|m| m.path.as_str()).collect();
        for rel in files {
            let source = std::fs::read_to_string(library.root.join(rel))?;
            let content = match by_file.get(rel) {
                Some(file_removals) => {
                    let sigs: Vec<&FunctionSignature> = file_removals.iter().map(|r| &r.sig).collect();
                    let refs: Vec<String> = file_removals
                        .iter()
                        .map(|r| r.reference.clone())
                        .collect::<IndexSet<_>>()
                        .into_iter()
                        .collect();
                    match rewriter.rewrite(&source, &library.ecosystem, &sigs, &refs) {
                        Ok(rewritten) => {
                            debug!(file = rel, removed = sigs.len(), "file rewritten");
                            rewritten
                        }
                        Err(reason) => {
                            let warning = format!(
                                "{}/{rel}: rewrite failed ({reason}); copied unchanged",
                                library.ecosystem
                            );
                            warn!("{warning}");
                            warnings.push(warning);
                            source
                        }
                    }
                }
                None => source,
            };
            let dest: PathBuf = output_dir.join(rel);
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(dest, content)?;
        }
        Ok(())
    }
}

/// Strip one library with the built-in rewriter.
pub fn strip(
    library: &Arc<Library>,
    patterns: &[Pattern],
    output_root: &Path,
    config: &StripConfig,
    extraction: &ExtractionConfig,
) -> StdResult<StrippedLibrary> {
    Stripper::new(config.clone(), extraction).strip(library, patterns, output_root)
}

fn render_migration_note(
    library: &Library,
    removals: &[Removal],
    references: &[String],
    mode: StripMode,
    target: &str,
    warnings: &[String],
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Migration: {} library\n", library.ecosystem);
    let _ = writeln!(out, "- Mode: **{mode}**");
    let _ = writeln!(out, "- Source root: `{}`", library.root.display());
    let _ = writeln!(out, "- Unified modules: {target}");
    let _ = writeln!(out, "- Functions removed: {}\n", removals.len());

    if mode == StripMode::DocumentationOnly {
        let _ = writeln!(
            out,
            "> Source files were NOT modified. Remove the functions below by hand \
             and add the listed references.\n"
        );
    }

    let _ = writeln!(out, "## Removed functions\n");
    if removals.is_empty() {
        let _ = writeln!(out, "None of this library's functions matched a unified pattern.\n");
    } else {
        let _ = writeln!(out, "| Function | Location | Pattern | Unified module | Replacement |");
        let _ = writeln!(out, "|---|---|---|---|---|");
        for r in removals {
            let _ = writeln!(
                out,
                "| `{}` | {}:{}-{} | {} | `{}` | `{}` |",
                r.sig.qualified_name(),
                r.sig.location.file,
                r.sig.removal_start_line(),
                r.sig.location.end_line,
                r.pattern,
                r.module_file,
                r.replacement
            );
        }
        let _ = writeln!(out);
    }

    if !references.is_empty() {
        let _ = writeln!(out, "## References to add\n");
        let _ = writeln!(out, "```{}", library.ecosystem);
        for reference in references {
            let _ = writeln!(out, "{reference}");
        }
        let _ = writeln!(out, "```\n");
    }

    if !warnings.is_empty() {
        let _ = writeln!(out, "## Warnings\n");
        for warning in warnings {
            let _ = writeln!(out, "- {warning}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_library;
    use std::collections::BTreeMap;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn pattern_for(name: &str, sig: &FunctionSignature) -> Pattern {
        let mut implementations = IndexMap::new();
        implementations.insert(sig.ecosystem().to_string(), sig.clone());
        Pattern {
            id: format!("{name}-id"),
            name: name.into(),
            implementations,
            similarity_score: 1.0,
            is_universal: true,
            category: "string".into(),
            metadata: BTreeMap::new(),
        }
    }

    fn go_library(root: &Path) -> Arc<Library> {
        write(
            root,
            "strs/strs.go",
            "package strs\n\n// Trim trims.\nfunc Trim(s string) string {\n\treturn s\n}\n\nfunc Keep() int {\n\treturn 1\n}\n",
        );
        write(root, "other/other.go", "package other\n\nfunc Untouched() {}\n");
        Arc::new(parse_library(root, "go").unwrap())
    }

    fn extraction(target: &str) -> ExtractionConfig {
        ExtractionConfig {
            target_ecosystem: target.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_rewrites_file_and_copies_the_rest() {
        let lib_dir = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let library = go_library(lib_dir.path());
        let trim = library.functions.iter().find(|f| f.name == "Trim").unwrap();
        let patterns = vec![pattern_for("trim", trim)];

        let stripped = strip(&library, &patterns, out.path(), &StripConfig::default(), &extraction("python")).unwrap();
        assert_eq!(stripped.mode, StripMode::Rewritten);
        assert_eq!(stripped.removed.len(), 1);
        assert_eq!(
            stripped.added_references,
            vec!["// strs.Trim moved to unified module trim.py (python: trim)".to_string()]
        );

        let rewritten = std::fs::read_to_string(stripped.output_dir.join("strs/strs.go")).unwrap();
        assert!(!rewritten.contains("func Trim"));
        assert!(!rewritten.contains("// Trim trims."));
        assert!(rewritten.contains("func Keep() int"));
        assert!(rewritten.contains("moved to unified module trim.py"));
        assert!(stripped.output_dir.join("other/other.go").exists());

        let note = std::fs::read_to_string(&stripped.migration_note).unwrap();
        assert!(note.contains("Mode: **rewritten**"));
        assert!(note.contains("`strs.Trim`"));

        // Original library untouched.
        let original = std::fs::read_to_string(lib_dir.path().join("strs/strs.go")).unwrap();
        assert!(original.contains("func Trim"));
    }

    #[test]
    fn test_same_ecosystem_gets_real_import() {
        let lib_dir = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let library = go_library(lib_dir.path());
        let trim = library.functions.iter().find(|f| f.name == "Trim").unwrap();
        let stripped = strip(
            &library,
            &[pattern_for("trim", trim)],
            out.path(),
            &StripConfig::default(),
            &extraction("go"),
        )
        .unwrap();
        assert_eq!(stripped.added_references, vec!["import unified \"unified\"".to_string()]);
    }

    #[test]
    fn test_documentation_only_is_explicit() {
        let lib_dir = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let library = go_library(lib_dir.path());
        let trim = library.functions.iter().find(|f| f.name == "Trim").unwrap();
        let config = StripConfig {
            rewrite_sources: false,
        };
        let stripped = strip(&library, &[pattern_for("trim", trim)], out.path(), &config, &extraction("python")).unwrap();
        assert_eq!(stripped.mode, StripMode::DocumentationOnly);
        assert_eq!(stripped.removed.len(), 1);
        assert!(!stripped.warnings.is_empty());
        assert!(!stripped.output_dir.join("strs/strs.go").exists());
        let note = std::fs::read_to_string(&stripped.migration_note).unwrap();
        assert!(note.contains("documentation-only"));
        assert!(note.contains("NOT modified"));
    }

    #[test]
    fn test_library_without_matches_removes_nothing() {
        let lib_dir = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let library = go_library(lib_dir.path());
        let stripped = Stripper::new(StripConfig::default(), &extraction("python"))
            .strip(&library, &[], out.path())
            .unwrap();
        assert!(stripped.removed.is_empty());
        assert!(stripped.added_references.is_empty());
        let kept = std::fs::read_to_string(stripped.output_dir.join("strs/strs.go")).unwrap();
        assert!(kept.contains("func Trim"));
    }

    #[test]
    fn test_unnormalized_reference_uses_winner_name() {
        let lib_dir = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let library = go_library(lib_dir.path());
        let trim = library.functions.iter().find(|f| f.name == "Trim").unwrap().clone();
        let pattern = pattern_for("trim", &trim);
        let mut ranking_scores = IndexMap::new();
        ranking_scores.insert("go".to_string(), 1.0);
        let mut winner = trim.clone();
        winner.name = "trimSpace".into();
        let ranking = Ranking {
            pattern: pattern.clone(),
            scores: ranking_scores,
            criterion_scores: IndexMap::new(),
            best_ecosystem: "go".into(),
            best_implementation: winner,
            justification: String::new(),
        };
        let mut ext = extraction("typescript");
        ext.normalize_api = false;
        let stripped = Stripper::new(StripConfig::default(), &ext)
            .with_rankings(&[ranking])
            .strip(&library, &[pattern], out.path())
            .unwrap();
        assert!(stripped.added_references[0].ends_with("(typescript: trimSpace)"));
    }
}
