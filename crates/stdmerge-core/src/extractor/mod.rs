//! Module Extractor: turns each ranking's winner into one unified module.
//!
//! A winner already in the target ecosystem is emitted from its verbatim
//! source. Otherwise the translator registered for the ecosystem pair is
//! used; without one the module is a placeholder that raises "not
//! implemented" and carries a zero-confidence `Translation`.

pub mod emit;
pub mod syntax;
pub mod translate;

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::ExtractionConfig;
use crate::errors::{MergeError, StdResult};
use crate::models::{ExtractedModule, ExtractionKind, Ranking, Translation};
use emit::FunctionSpec;
pub use translate::{SignatureTranslator, Translator, TranslatorRegistry};

pub struct Extractor {
    config: ExtractionConfig,
    translators: TranslatorRegistry,
}

impl Extractor {
    /// Extractor for `config`. The signature translator is registered for
    /// every supported pair when `signature_translation` is set.
    pub fn new(config: ExtractionConfig) -> Self {
        let translators = if config.signature_translation {
            TranslatorRegistry::with_signature_translation()
        } else {
            TranslatorRegistry::new()
        };
        Self::with_translators(config, translators)
    }

    pub fn with_translators(config: ExtractionConfig, translators: TranslatorRegistry) -> Self {
        Self {
            config,
            translators,
        }
    }

    pub fn register(&mut self, from: &str, to: &str, translator: Arc<dyn Translator>) {
        self.translators.register(from, to, translator);
    }

    pub fn target(&self) -> &str {
        &self.config.target_ecosystem
    }

    /// Build the module for `ranking` without touching the filesystem.
    pub fn plan(&self, ranking: &Ranking, output_root: &Path) -> StdResult<ExtractedModule> {
        let target = self.config.target_ecosystem.as_str();
        let file_name = emit::module_file_name(&ranking.pattern.name, target).ok_or_else(|| {
            MergeError::UnsupportedEcosystem {
                ecosystem: target.to_string(),
            }
        })?;
        let module_name = emit::module_identifier(&ranking.pattern.name, target);
        let winner = &ranking.best_implementation;
        let source = ranking.best_ecosystem.as_str();
        let mut warnings = Vec::new();

        let (kind, translation, code, note) = if let Some(owner) =
            winner.owner().filter(|_| winner.is_instance_method())
        {
            // A bound method reads state of its owner; it cannot be emitted
            // as a free function from its body or from a translation.
            let reason = format!(
                "selected {source} implementation {} is an instance method of {owner}",
                winner.qualified_name()
            );
            let note = format!(
                "PLACEHOLDER: the selected implementation is a method of {owner} and depends on \
                 its instance state. Every function in this module raises a not-implemented error \
                 until it is ported."
            );
            self.placeholder(ranking, &reason, note, &mut warnings)
        } else if source == target {
            let code = self.direct_code(ranking, &mut warnings);
            (ExtractionKind::Direct, None, code, None)
        } else {
            match self.translators.translate(winner, source, target) {
                Ok(translation) => {
                    warnings.extend(translation.warnings.iter().cloned());
                    let note = format!(
                        "Translated from {source} with confidence {:.2}.",
                        translation.confidence
                    );
                    let code = emit::rename_identifier(
                        &translation.target_code,
                        &emit::conventional_name(&winner.name, target),
                        &self.function_name(ranking),
                    );
                    (ExtractionKind::Translated, Some(translation), code, Some(note))
                }
                Err(e) => {
                    let note = format!(
                        "PLACEHOLDER: no translator from {source} to {target} is registered. \
                         Every function in this module raises a not-implemented error until it is ported."
                    );
                    self.placeholder(ranking, &e.to_string(), note, &mut warnings)
                }
            }
        };

        let header = module_header(ranking, note.as_deref());
        let module = emit::render_module(target, &module_name, &header, &code);
        match syntax::check_syntax(&module, target) {
            Ok(true) => {}
            Ok(false) => {
                let warning = format!(
                    "generated {target} module for '{}' has syntax errors",
                    ranking.pattern.name
                );
                warn!(pattern = %ranking.pattern.name, "{warning}");
                warnings.push(warning);
            }
            Err(e) => warnings.push(format!("syntax check skipped: {e}")),
        }

        Ok(ExtractedModule {
            pattern: ranking.pattern.clone(),
            ranking: ranking.clone(),
            translation,
            kind,
            output_path: output_root.join(file_name),
            code: module,
            warnings,
        })
    }

    /// Plan the module and write it under `output_root`.
    pub fn extract(&self, ranking: &Ranking, output_root: &Path) -> StdResult<ExtractedModule> {
        let module = self.plan(ranking, output_root)?;
        std::fs::create_dir_all(output_root)?;
        std::fs::write(&module.output_path, &module.code)?;
        debug!(
            pattern = %module.pattern.name,
            kind = ?module.kind,
            path = %module.output_path.display(),
            "module written"
        );
        Ok(module)
    }

    pub fn extract_all(
        &self,
        rankings: &[Ranking],
        output_root: &Path,
    ) -> StdResult<Vec<ExtractedModule>> {
        let mut modules = Vec::with_capacity(rankings.len());
        for ranking in rankings {
            modules.push(self.extract(ranking, output_root)?);
        }
        let placeholders = modules
            .iter()
            .filter(|m| m.kind == ExtractionKind::Placeholder)
            .count();
        info!(
            target_ecosystem = %self.config.target_ecosystem,
            modules = modules.len(),
            placeholders,
            "extraction complete"
        );
        Ok(modules)
    }

    /// Name the emitted function gets in the unified module.
    pub fn function_name(&self, ranking: &Ranking) -> String {
        emit::unified_function_name(
            &ranking.pattern.name,
            &ranking.best_implementation.name,
            &self.config.target_ecosystem,
            self.config.normalize_api,
        )
    }

    /// Stub module raising "not implemented", recorded as a zero-confidence
    /// translation with a warning naming `reason`.
    fn placeholder(
        &self,
        ranking: &Ranking,
        reason: &str,
        note: String,
        warnings: &mut Vec<String>,
    ) -> (ExtractionKind, Option<Translation>, String, Option<String>) {
        let target = self.config.target_ecosystem.as_str();
        let source = ranking.best_ecosystem.as_str();
        let winner = &ranking.best_implementation;
        let message = format!("not implemented: {} ({reason})", ranking.pattern.name);
        let code = emit::render_stub(target, &self.placeholder_spec(ranking, message));
        let warning = format!("{reason}; emitted a placeholder module");
        warn!(pattern = %ranking.pattern.name, from = source, to = target, "{warning}");
        warnings.push(warning.clone());
        let translation = Translation {
            source_ecosystem: source.to_string(),
            target_ecosystem: target.to_string(),
            source_code: winner.source_text.clone().unwrap_or_else(|| winner.render()),
            target_code: code.clone(),
            confidence: 0.0,
            warnings: vec![warning],
        };
        (ExtractionKind::Placeholder, Some(translation), code, Some(note))
    }

    fn direct_code(&self, ranking: &Ranking, warnings: &mut Vec<String>) -> String {
        let target = self.config.target_ecosystem.as_str();
        let winner = &ranking.best_implementation;
        let Some(source) = winner.source_text.as_deref() else {
            warnings.push(format!(
                "source of {} unavailable; emitted a stub",
                winner.qualified_name()
            ));
            let message = format!("not implemented: {} (source unavailable)", winner.qualified_name());
            let mut spec = self.placeholder_spec(ranking, message);
            spec.params = winner
                .parameters
                .iter()
                .map(|p| {
                    (
                        emit::sanitize_ident(&p.name, target),
                        translate::map_type(&p.type_ref, target),
                    )
                })
                .collect();
            spec.return_type = translate::map_return(&winner.return_type, target);
            return emit::render_stub(target, &spec);
        };

        let mut code = emit::dedent(source);
        if !self.config.preserve_comments {
            code = emit::strip_comment_lines(&code, target);
        }
        code = emit::rename_identifier(&code, &winner.name, &self.function_name(ranking));
        code = emit::as_module_function(&code, target);
        if self.config.add_docstrings && target != "python" {
            let doc = emit::doc_comment(&winner.documentation, target, 0);
            if !doc.is_empty() && !code.trim_start().starts_with("/**") {
                code = format!("{doc}{code}");
            }
        }
        code
    }

    fn placeholder_spec(&self, ranking: &Ranking, message: String) -> FunctionSpec {
        let target = self.config.target_ecosystem.as_str();
        let winner = &ranking.best_implementation;
        FunctionSpec {
            name: self.function_name(ranking),
            params: winner
                .parameters
                .iter()
                .map(|p| (emit::sanitize_ident(&p.name, target), None))
                .collect(),
            return_type: None,
            doc: (self.config.add_docstrings && !winner.documentation.trim().is_empty())
                .then(|| winner.documentation.clone()),
            message,
        }
    }
}

/// Extract one ranking with a fresh extractor for `config`.
pub fn extract(
    ranking: &Ranking,
    output_root: &Path,
    config: &ExtractionConfig,
) -> StdResult<ExtractedModule> {
    Extractor::new(config.clone()).extract(ranking, output_root)
}

fn module_header(ranking: &Ranking, note: Option<&str>) -> String {
    let winner = &ranking.best_implementation;
    let score = ranking
        .scores
        .get(&ranking.best_ecosystem)
        .copied()
        .unwrap_or(0.0);
    let mut header = format!(
        "Unified `{}` ({}).\n\nImplementation selected from {}: {} (score {score:.2}).\n{}",
        ranking.pattern.name,
        ranking.pattern.category,
        ranking.best_ecosystem,
        winner.qualified_name(),
        ranking.justification
    );
    if let Some(note) = note {
        header.push_str("\n\n");
        header.push_str(note);
    }
    header
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FunctionSignature, Parameter, Pattern, SourceLocation, TypeRef};
    use indexmap::IndexMap;
    use std::collections::BTreeMap;

    fn ranking_for(sig: FunctionSignature) -> Ranking {
        let eco = sig.ecosystem().to_string();
        let mut implementations = IndexMap::new();
        implementations.insert(eco.clone(), sig.clone());
        let pattern = Pattern {
            id: "0badc0de".into(),
            name: "split_lines".into(),
            implementations,
            similarity_score: 1.0,
            is_universal: true,
            category: "string".into(),
            metadata: BTreeMap::new(),
        };
        let mut scores = IndexMap::new();
        scores.insert(eco.clone(), 0.8);
        Ranking {
            pattern,
            scores,
            criterion_scores: IndexMap::new(),
            best_ecosystem: eco,
            best_implementation: sig,
            justification: "It won.".into(),
        }
    }

    fn python_sig() -> FunctionSignature {
        let mut sig = FunctionSignature::new("splitLines", "text", SourceLocation::new("text.py", 4, 1))
            .with_ecosystem("python");
        sig.parameters = vec![Parameter::new("s", TypeRef::named("str"))];
        sig.return_type = TypeRef::parse("list[str]");
        sig.documentation = "Split on newlines.".into();
        sig.source_text = Some(
            "    def splitLines(s: str) -> list[str]:\n        \"\"\"Split on newlines.\"\"\"\n        # fast path\n        return s.split(\"\\n\")"
                .into(),
        );
        sig
    }

    fn go_sig() -> FunctionSignature {
        let mut sig = FunctionSignature::new("SplitLines", "text", SourceLocation::new("text.go", 4, 1))
            .with_ecosystem("go");
        sig.parameters = vec![Parameter::new("s", TypeRef::named("string"))];
        sig.return_type = TypeRef::parse("[]string");
        sig.documentation = "SplitLines splits on newlines.".into();
        sig.source_text = Some("func SplitLines(s string) []string {\n\treturn strings.Split(s, \"\\n\")\n}".into());
        sig
    }

    fn config(target: &str) -> ExtractionConfig {
        ExtractionConfig {
            target_ecosystem: target.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_same_ecosystem_is_direct_without_translation() {
        let dir = tempfile::tempdir().unwrap();
        let module = extract(&ranking_for(python_sig()), dir.path(), &config("python")).unwrap();
        assert_eq!(module.kind, ExtractionKind::Direct);
        assert!(module.translation.is_none());
        assert_eq!(module.output_path, dir.path().join("split_lines.py"));
        assert!(module.code.contains("def split_lines(s: str) -> list[str]:"));
        assert!(module.code.contains("# fast path"));
        assert!(module.warnings.is_empty(), "{:?}", module.warnings);
        let written = std::fs::read_to_string(&module.output_path).unwrap();
        assert_eq!(written, module.code);
    }

    #[test]
    fn test_comments_dropped_when_not_preserved() {
        let mut cfg = config("python");
        cfg.preserve_comments = false;
        let module = Extractor::new(cfg)
            .plan(&ranking_for(python_sig()), Path::new("/out"))
            .unwrap();
        assert!(!module.code.contains("# fast path"));
    }

    #[test]
    fn test_missing_translator_gives_placeholder() {
        let module = Extractor::new(config("python"))
            .plan(&ranking_for(go_sig()), Path::new("/out"))
            .unwrap();
        assert_eq!(module.kind, ExtractionKind::Placeholder);
        let translation = module.translation.as_ref().unwrap();
        assert_eq!(translation.confidence, 0.0);
        assert!(!translation.warnings.is_empty());
        assert!(module.code.contains("PLACEHOLDER"));
        assert!(module.code.contains("raise NotImplementedError("));
        assert!(module.code.contains("def split_lines(s):"));
        assert_eq!(syntax::check_syntax(&module.code, "python"), Ok(true));
    }

    #[test]
    fn test_placeholders_are_valid_in_every_target() {
        for target in emit::SUPPORTED_TARGETS {
            let mut sig = python_sig();
            if *target == "python" {
                sig = go_sig();
            }
            let module = Extractor::new(config(target))
                .plan(&ranking_for(sig), Path::new("/out"))
                .unwrap();
            assert_eq!(module.kind, ExtractionKind::Placeholder);
            assert_eq!(module.translation.as_ref().unwrap().confidence, 0.0);
            assert_eq!(syntax::check_syntax(&module.code, target), Ok(true), "{}", module.code);
        }
    }

    #[test]
    fn test_signature_translation_when_enabled() {
        let mut cfg = config("java");
        cfg.signature_translation = true;
        let module = Extractor::new(cfg)
            .plan(&ranking_for(go_sig()), Path::new("/out"))
            .unwrap();
        assert_eq!(module.kind, ExtractionKind::Translated);
        assert_eq!(module.translation.as_ref().unwrap().confidence, 0.5);
        assert_eq!(module.output_path, Path::new("/out").join("SplitLines.java"));
        assert!(module.code.contains("public static List<String> splitLines(String s)"));
    }

    #[test]
    fn test_go_direct_keeps_package_and_doc() {
        let module = Extractor::new(config("go"))
            .plan(&ranking_for(go_sig()), Path::new("/out"))
            .unwrap();
        assert_eq!(module.kind, ExtractionKind::Direct);
        assert!(module.code.contains("package unified"));
        assert!(module.code.contains("// SplitLines splits on newlines.\nfunc SplitLines("));
    }

    #[test]
    fn test_unsupported_target() {
        let err = Extractor::new(config("cobol"))
            .plan(&ranking_for(go_sig()), Path::new("/out"))
            .unwrap_err();
        assert!(matches!(err, MergeError::UnsupportedEcosystem { .. }));
    }

    #[test]
    fn test_renamed_function_keeps_recursive_calls_resolvable() {
        let mut sig = python_sig();
        sig.name = "flattenDeep".into();
        sig.source_text = Some(
            "def flattenDeep(xs: list) -> list:\n    out = []\n    for x in xs:\n        out.extend(flattenDeep(x) if isinstance(x, list) else [x])\n    return out".into(),
        );
        let mut ranking = ranking_for(sig);
        ranking.pattern.name = "flatten_deep".into();
        let module = Extractor::new(config("python"))
            .plan(&ranking, Path::new("/out"))
            .unwrap();
        assert_eq!(module.kind, ExtractionKind::Direct);
        assert!(module.code.contains("def flatten_deep(xs: list) -> list:"));
        assert!(module.code.contains("out.extend(flatten_deep(x) if"));
        assert!(!module.code.contains("flattenDeep"), "{}", module.code);
    }

    #[test]
    fn test_instance_method_winner_becomes_placeholder() {
        let mut sig = FunctionSignature::new("trim", "text.Str", SourceLocation::new("text.py", 2, 5))
            .with_ecosystem("python")
            .with_owner("Str", false);
        sig.parameters = vec![Parameter::new("chars", TypeRef::named("str"))];
        sig.source_text = Some(
            "    def trim(self, chars: str = None) -> str:\n        return self.value.strip(chars)".into(),
        );
        let module = Extractor::new(config("python"))
            .plan(&ranking_for(sig), Path::new("/out"))
            .unwrap();
        assert_eq!(module.kind, ExtractionKind::Placeholder);
        assert_eq!(module.translation.as_ref().unwrap().confidence, 0.0);
        assert!(!module.code.contains("self.value"), "{}", module.code);
        assert!(module.code.contains("raise NotImplementedError("));
        assert!(module.warnings.iter().any(|w| w.contains("instance method of Str")));
        assert_eq!(syntax::check_syntax(&module.code, "python"), Ok(true));
    }

    #[test]
    fn test_go_receiver_method_becomes_placeholder() {
        let mut sig = go_sig().with_owner("Splitter", false);
        sig.source_text =
            Some("func (s *Splitter) SplitLines(text string) []string {\n\treturn s.split(text)\n}".into());
        let module = Extractor::new(config("go"))
            .plan(&ranking_for(sig), Path::new("/out"))
            .unwrap();
        assert_eq!(module.kind, ExtractionKind::Placeholder);
        assert!(!module.code.contains("*Splitter"));
        assert_eq!(syntax::check_syntax(&module.code, "go"), Ok(true));
    }

    #[test]
    fn test_static_java_method_extracted_as_public_static() {
        let mut sig = FunctionSignature::new("splitLines", "util.Text", SourceLocation::new("Text.java", 3, 5))
            .with_ecosystem("java")
            .with_owner("util.Text", true);
        sig.parameters = vec![Parameter::new("s", TypeRef::named("String"))];
        sig.source_text = Some(
            "    static String[] splitLines(String s) {\n        return s.split(\"\\n\");\n    }".into(),
        );
        let module = Extractor::new(config("java"))
            .plan(&ranking_for(sig), Path::new("/out"))
            .unwrap();
        assert_eq!(module.kind, ExtractionKind::Direct);
        assert!(module.code.starts_with("package unified;"));
        assert!(module.code.contains("public static String[] splitLines(String s) {"));
        assert_eq!(syntax::check_syntax(&module.code, "java"), Ok(true), "{}", module.code);
    }
}
