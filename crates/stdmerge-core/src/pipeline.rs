//! Pipeline Orchestrator: parse → match → rank → extract → strip → report.
//!
//! Root-level problems (bad config, missing library root, unsupported
//! ecosystem, empty library) abort the run with a `MergeError::Stage` naming
//! the stage and input. Everything recoverable ends up in
//! `MergeResult::warnings`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;
use tracing::{info, warn};

use crate::config::MergeConfig;
use crate::errors::{MergeError, Stage, StdResult};
use crate::extractor::{Extractor, Translator};
use crate::matcher::{MatchOutcome, PatternMatcher, SemanticValidator, SimilarityService};
use crate::matcher::similarity::normalize_name;
use crate::models::{ExtractedModule, ExtractionKind, Library, MergeResult, Pattern, Ranking, StrippedLibrary};
use crate::parser::ParserRegistry;
use crate::ranker::{rank_all, BuiltinPriors, QualityCriteria};
use crate::report::{write_reports, ReportInputs};
use crate::store::SimilarityCache;
use crate::stripper::{SourceRewriter, Stripper};

/// `(ecosystem tag, library root)`.
pub type LibraryInput = (String, PathBuf);

pub const STAT_KEYS: [&str; 10] = [
    "libraries_parsed",
    "functions_parsed",
    "files_skipped",
    "pattern_count",
    "universal_pattern_count",
    "modules_generated",
    "placeholder_modules",
    "translated_modules",
    "total_generated_lines",
    "functions_removed",
];

/// State shared by the stages of one run.
struct Run {
    warnings: Vec<String>,
    statistics: IndexMap<String, u64>,
}

impl Run {
    fn new() -> Self {
        Self {
            warnings: Vec::new(),
            statistics: STAT_KEYS.iter().map(|k| (k.to_string(), 0)).collect(),
        }
    }

    fn add(&mut self, key: &str, n: usize) {
        *self.statistics.entry(key.to_string()).or_insert(0) += n as u64;
    }

    fn warn(&mut self, message: String) {
        warn!("{message}");
        self.warnings.push(message);
    }

    fn into_result(self) -> MergeResult {
        MergeResult {
            statistics: self.statistics,
            warnings: self.warnings,
            ..MergeResult::default()
        }
    }
}

pub struct Pipeline {
    config: MergeConfig,
    parsers: ParserRegistry,
    cache: Arc<SimilarityCache>,
    service: Option<Arc<dyn SimilarityService>>,
    criteria: QualityCriteria,
    extractor: Extractor,
    rewriters: Vec<Arc<dyn SourceRewriter>>,
}

impl Pipeline {
    /// Validate `config` and build the default stage implementations.
    pub fn new(config: MergeConfig) -> StdResult<Self> {
        config.validate().map_err(|e| e.at(Stage::Config, "configuration"))?;
        let cache = match config.similarity.as_ref().and_then(|s| s.cache_path.as_ref()) {
            Some(path) => SimilarityCache::persistent(path)
                .map_err(|e| e.at(Stage::Config, path.display().to_string()))?,
            None => SimilarityCache::in_memory(),
        };
        let criteria = QualityCriteria::from_weights(&config.quality, Arc::new(BuiltinPriors));
        let extractor = Extractor::new(config.extraction.clone());
        Ok(Self {
            config,
            parsers: ParserRegistry::default(),
            cache: Arc::new(cache),
            service: None,
            criteria,
            extractor,
            rewriters: Vec::new(),
        })
    }

    pub fn from_config_file(path: &Path) -> StdResult<Self> {
        let config =
            MergeConfig::load(path).map_err(|e| e.at(Stage::Config, path.display().to_string()))?;
        Self::new(config)
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<SimilarityCache> {
        &self.cache
    }

    pub fn with_parsers(mut self, parsers: ParserRegistry) -> Self {
        self.parsers = parsers;
        self
    }

    pub fn with_criteria(mut self, criteria: QualityCriteria) -> Self {
        self.criteria = criteria;
        self
    }

    /// Validate clusters with `service` instead of the configured HTTP one.
    pub fn with_similarity_service(mut self, service: Arc<dyn SimilarityService>) -> Self {
        self.service = Some(service);
        self
    }

    pub fn with_translator(mut self, from: &str, to: &str, translator: Arc<dyn Translator>) -> Self {
        self.extractor.register(from, to, translator);
        self
    }

    pub fn with_rewriter(mut self, rewriter: Arc<dyn SourceRewriter>) -> Self {
        self.rewriters.push(rewriter);
        self
    }

    // -- Operations ---------------------------------------------------------

    /// Run every stage and write all artifacts under `output_root`.
    pub fn merge(&self, inputs: &[LibraryInput], output_root: &Path) -> StdResult<MergeResult> {
        let started = Instant::now();
        let mut run = Run::new();
        let libraries = self.parse_stage(inputs, true, &mut run)?;
        let ecosystems = ecosystems_of(&libraries);
        let patterns = self.match_stage(&libraries, &mut run);
        let rankings = self.rank_stage(&patterns);
        let extracted = self.extract_stage(&rankings, output_root, &mut run)?;
        let libraries: Vec<Arc<Library>> = libraries.into_iter().map(Arc::new).collect();
        let stripped = self.strip_stage(&libraries, &patterns, &rankings, output_root, &mut run)?;

        let reports = write_reports(
            output_root,
            &ReportInputs {
                ecosystems: &ecosystems,
                patterns: &patterns,
                rankings: &rankings,
                extracted: &extracted,
                stripped: &stripped,
                warnings: &run.warnings,
            },
        )
        .map_err(|e| e.at(Stage::Report, output_root.display().to_string()))?;

        info!(
            patterns = patterns.len(),
            modules = extracted.len(),
            warnings = run.warnings.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "merge complete"
        );
        Ok(MergeResult {
            patterns,
            rankings,
            extracted,
            stripped,
            reports,
            ..run.into_result()
        })
    }

    /// Parse and match only; nothing is written. A library that fails to
    /// parse or has no functions is reported as a warning and left out.
    pub fn analyze(&self, inputs: &[LibraryInput]) -> StdResult<MergeResult> {
        let mut run = Run::new();
        let libraries = self.parse_stage(inputs, false, &mut run)?;
        let patterns = self.match_stage(&libraries, &mut run);
        Ok(MergeResult {
            patterns,
            ..run.into_result()
        })
    }

    /// Match and rank, returning the ranking of the pattern called `name`.
    /// The name is compared after case folding and separator removal.
    pub fn rank_pattern(&self, inputs: &[LibraryInput], name: &str) -> StdResult<Option<Ranking>> {
        let mut run = Run::new();
        let libraries = self.parse_stage(inputs, false, &mut run)?;
        let patterns = self.match_stage(&libraries, &mut run);
        let wanted = normalize_name(name);
        let found: Vec<Pattern> = patterns
            .into_iter()
            .filter(|p| p.id == name || normalize_name(&p.name) == wanted)
            .collect();
        Ok(self.rank_stage(&found).into_iter().next())
    }

    /// Parse, match, rank and write the unified modules.
    pub fn extract_only(&self, inputs: &[LibraryInput], output_root: &Path) -> StdResult<MergeResult> {
        let mut run = Run::new();
        let libraries = self.parse_stage(inputs, true, &mut run)?;
        let patterns = self.match_stage(&libraries, &mut run);
        let rankings = self.rank_stage(&patterns);
        let extracted = self.extract_stage(&rankings, output_root, &mut run)?;
        Ok(MergeResult {
            patterns,
            rankings,
            extracted,
            ..run.into_result()
        })
    }

    /// Parse, match, rank and write the stripped libraries. Unified modules
    /// are not generated.
    pub fn strip_only(&self, inputs: &[LibraryInput], output_root: &Path) -> StdResult<MergeResult> {
        let mut run = Run::new();
        let libraries = self.parse_stage(inputs, true, &mut run)?;
        let patterns = self.match_stage(&libraries, &mut run);
        let rankings = self.rank_stage(&patterns);
        let libraries: Vec<Arc<Library>> = libraries.into_iter().map(Arc::new).collect();
        let stripped = self.strip_stage(&libraries, &patterns, &rankings, output_root, &mut run)?;
        Ok(MergeResult {
            patterns,
            rankings,
            stripped,
            ..run.into_result()
        })
    }

    /// Parse, match, rank and write the reports only.
    pub fn report_only(&self, inputs: &[LibraryInput], output_root: &Path) -> StdResult<MergeResult> {
        let mut run = Run::new();
        let libraries = self.parse_stage(inputs, true, &mut run)?;
        let ecosystems = ecosystems_of(&libraries);
        let patterns = self.match_stage(&libraries, &mut run);
        let rankings = self.rank_stage(&patterns);
        let reports = write_reports(
            output_root,
            &ReportInputs {
                ecosystems: &ecosystems,
                patterns: &patterns,
                rankings: &rankings,
                warnings: &run.warnings,
                ..ReportInputs::default()
            },
        )
        .map_err(|e| e.at(Stage::Report, output_root.display().to_string()))?;
        Ok(MergeResult {
            patterns,
            rankings,
            reports,
            ..run.into_result()
        })
    }

    // -- Stages -------------------------------------------------------------

    /// In strict mode any library failure aborts; otherwise it becomes a
    /// warning and the library is dropped. An ecosystem without an adapter
    /// aborts in both modes.
    fn parse_stage(&self, inputs: &[LibraryInput], strict: bool, run: &mut Run) -> StdResult<Vec<Library>> {
        if inputs.is_empty() {
            return Err(MergeError::Config("at least one library is required".to_string())
                .at(Stage::Config, "libraries"));
        }
        let mut seen = HashSet::new();
        for (ecosystem, root) in inputs {
            if !seen.insert(ecosystem.as_str()) {
                return Err(MergeError::Config(format!("library ecosystem '{ecosystem}' given twice"))
                    .at(Stage::Config, input_label(ecosystem, root)));
            }
            if self.parsers.get(ecosystem).is_none() {
                return Err(MergeError::UnsupportedEcosystem {
                    ecosystem: ecosystem.clone(),
                }
                .at(Stage::Parse, input_label(ecosystem, root)));
            }
        }

        let results = self.parsers.parse_all(inputs, self.config.workers);
        let mut libraries = Vec::with_capacity(inputs.len());
        for ((ecosystem, root), result) in inputs.iter().zip(results) {
            let label = input_label(ecosystem, root);
            let library = match result {
                Ok(library) if library.is_empty() => {
                    let err = MergeError::EmptyLibrary {
                        ecosystem: ecosystem.clone(),
                        path: root.clone(),
                    };
                    if strict {
                        return Err(err.at(Stage::Parse, label));
                    }
                    run.warn(format!("{label}: {err}; library ignored"));
                    continue;
                }
                Ok(library) => library,
                Err(err) if strict => return Err(err.at(Stage::Parse, label)),
                Err(err) => {
                    run.warn(format!("{label}: {err}; library ignored"));
                    continue;
                }
            };
            for skipped in &library.parse_warnings {
                run.warn(format!("{ecosystem}: skipped {} ({})", skipped.path, skipped.reason));
            }
            run.add("libraries_parsed", 1);
            run.add("functions_parsed", library.functions.len());
            run.add("files_skipped", library.parse_warnings.len());
            libraries.push(library);
        }
        Ok(libraries)
    }

    fn match_stage(&self, libraries: &[Library], run: &mut Run) -> Vec<Pattern> {
        let mut matcher = PatternMatcher::new(self.config.matching.clone());
        let max_retries = self
            .config
            .similarity
            .as_ref()
            .map(|s| s.max_retries)
            .unwrap_or_default();
        if let Some(service) = &self.service {
            matcher = matcher.with_validator(SemanticValidator::new(
                Arc::clone(service),
                Arc::clone(&self.cache),
                max_retries,
            ));
        } else if let Some(service) = &self.config.similarity {
            matcher = matcher.with_service_config(service, Arc::clone(&self.cache));
        }

        let MatchOutcome {
            patterns,
            warnings,
            degraded,
        } = matcher.run(libraries);
        if degraded {
            info!("semantic validation degraded to name similarity");
        }
        run.warnings.extend(warnings);
        run.add("pattern_count", patterns.len());
        run.add("universal_pattern_count", patterns.iter().filter(|p| p.is_universal).count());
        patterns
    }

    fn rank_stage(&self, patterns: &[Pattern]) -> Vec<Ranking> {
        rank_all(patterns, &self.criteria)
    }

    fn extract_stage(
        &self,
        rankings: &[Ranking],
        output_root: &Path,
        run: &mut Run,
    ) -> StdResult<Vec<ExtractedModule>> {
        let modules = self
            .extractor
            .extract_all(rankings, output_root)
            .map_err(|e| e.at(Stage::Extract, output_root.display().to_string()))?;
        for module in &modules {
            match module.kind {
                ExtractionKind::Placeholder => run.add("placeholder_modules", 1),
                ExtractionKind::Translated => run.add("translated_modules", 1),
                ExtractionKind::Direct => {}
            }
            run.add("total_generated_lines", module.code.lines().count());
            for warning in &module.warnings {
                run.warn(format!("pattern {}: {warning}", module.pattern.name));
            }
        }
        run.add("modules_generated", modules.len());
        Ok(modules)
    }

    fn strip_stage(
        &self,
        libraries: &[Arc<Library>],
        patterns: &[Pattern],
        rankings: &[Ranking],
        output_root: &Path,
        run: &mut Run,
    ) -> StdResult<Vec<StrippedLibrary>> {
        let mut stripper = Stripper::new(self.config.stripping.clone(), &self.config.extraction)
            .with_rankings(rankings);
        for rewriter in &self.rewriters {
            stripper = stripper.with_rewriter(Arc::clone(rewriter));
        }

        let mut stripped = Vec::with_capacity(libraries.len());
        for library in libraries {
            let result = stripper
                .strip(library, patterns, output_root)
                .map_err(|e| e.at(Stage::Strip, input_label(&library.ecosystem, &library.root)))?;
            run.add("functions_removed", result.removed.len());
            run.warnings.extend(result.warnings.iter().cloned());
            stripped.push(result);
        }
        Ok(stripped)
    }
}

/// Full merge with the built-in stage implementations.
pub fn merge(inputs: &[LibraryInput], output_root: &Path, config: MergeConfig) -> StdResult<MergeResult> {
    Pipeline::new(config)?.merge(inputs, output_root)
}

fn input_label(ecosystem: &str, root: &Path) -> String {
    format!("{ecosystem}={}", root.display())
}

fn ecosystems_of(libraries: &[Library]) -> Vec<String> {
    let mut tags: Vec<String> = libraries.iter().map(|l| l.ecosystem.clone()).collect();
    tags.sort();
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_no_inputs_is_config_error() {
        let pipeline = Pipeline::new(MergeConfig::default()).unwrap();
        let err = pipeline.analyze(&[]).unwrap_err();
        assert!(err.to_string().starts_with("config stage failed"));
    }

    #[test]
    fn test_duplicate_ecosystem_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(MergeConfig::default()).unwrap();
        let inputs = vec![
            ("go".to_string(), dir.path().to_path_buf()),
            ("go".to_string(), dir.path().to_path_buf()),
        ];
        let err = pipeline.analyze(&inputs).unwrap_err();
        assert!(err.to_string().contains("given twice"));
    }

    #[test]
    fn test_invalid_config_fails_at_config_stage() {
        let mut config = MergeConfig::default();
        config.matching.name_similarity_threshold = 2.0;
        let err = Pipeline::new(config).err().unwrap();
        assert!(matches!(err, MergeError::Stage { stage: Stage::Config, .. }));
    }

    #[test]
    fn test_empty_library_fatal_in_merge_warning_in_analyze() {
        let py = tempfile::tempdir().unwrap();
        let go = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write(py.path(), "text.py", "def trim(s):\n    return s.strip()\n");
        write(go.path(), "README.md", "nothing here\n");
        let inputs = vec![
            ("python".to_string(), py.path().to_path_buf()),
            ("go".to_string(), go.path().to_path_buf()),
        ];
        let pipeline = Pipeline::new(MergeConfig::default()).unwrap();

        let err = pipeline.merge(&inputs, out.path()).unwrap_err();
        match err {
            MergeError::Stage { stage, input, source } => {
                assert_eq!(stage, Stage::Parse);
                assert!(input.starts_with("go="));
                assert!(matches!(*source, MergeError::EmptyLibrary { .. }));
            }
            other => panic!("unexpected {other:?}"),
        }

        let analysis = pipeline.analyze(&inputs).unwrap();
        assert_eq!(analysis.statistics["libraries_parsed"], 1);
        assert!(analysis.warnings.iter().any(|w| w.contains("contains no functions")));
    }

    #[test]
    fn test_analyze_keeps_going_when_a_root_is_missing() {
        let py = tempfile::tempdir().unwrap();
        write(py.path(), "text.py", "def trim(s):\n    return s.strip()\n");
        let inputs = vec![
            ("python".to_string(), py.path().to_path_buf()),
            ("go".to_string(), PathBuf::from("/nonexistent/go-stdlib")),
        ];
        let pipeline = Pipeline::new(MergeConfig::default()).unwrap();
        let analysis = pipeline.analyze(&inputs).unwrap();
        assert_eq!(analysis.statistics["libraries_parsed"], 1);
        assert!(analysis.warnings.iter().any(|w| w.starts_with("go=/nonexistent")));
        assert!(analysis.patterns.is_empty());
    }

    #[test]
    fn test_unsupported_ecosystem_is_fatal_in_analyze() {
        let py = tempfile::tempdir().unwrap();
        let cobol = tempfile::tempdir().unwrap();
        write(py.path(), "text.py", "def trim(s):\n    return s.strip()\n");
        write(cobol.path(), "TRIM.cbl", "PROCEDURE DIVISION.\n");
        let inputs = vec![
            ("python".to_string(), py.path().to_path_buf()),
            ("cobol".to_string(), cobol.path().to_path_buf()),
        ];
        let pipeline = Pipeline::new(MergeConfig::default()).unwrap();
        match pipeline.analyze(&inputs).unwrap_err() {
            MergeError::Stage { stage, input, source } => {
                assert_eq!(stage, Stage::Parse);
                assert!(input.starts_with("cobol="));
                assert!(matches!(*source, MergeError::UnsupportedEcosystem { .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(pipeline.rank_pattern(&inputs, "trim").is_err());
    }

    #[test]
    fn test_statistics_start_with_every_key() {
        let run = Run::new();
        let keys: Vec<&str> = run.statistics.keys().map(String::as_str).collect();
        assert_eq!(keys, STAT_KEYS.to_vec());
        assert!(run.statistics.values().all(|v| *v == 0));
    }
}
