//! Pattern Matcher: clusters name-similar functions across libraries and
//! turns validated clusters into cross-ecosystem `Pattern`s.

pub mod category;
pub mod cluster;
pub mod http;
pub mod semantic;
pub mod similarity;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::config::{MatchingConfig, SimilarityServiceConfig};
use crate::models::{Cluster, FunctionSignature, Library, Pattern};
use crate::naming::snake_case;
use crate::store::SimilarityCache;
use category::categorize;
use cluster::cluster_functions;
use http::HttpSimilarityService;
pub use semantic::{SemanticValidator, SimilarityService, UnavailableService};

/// Patterns plus the recoverable problems met while finding them.
#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    pub patterns: Vec<Pattern>,
    pub warnings: Vec<String>,
    /// True when a configured similarity service failed and matching fell
    /// back to name similarity alone.
    pub degraded: bool,
}

pub struct PatternMatcher {
    config: MatchingConfig,
    validator: Option<SemanticValidator>,
}

impl PatternMatcher {
    pub fn new(config: MatchingConfig) -> Self {
        Self {
            config,
            validator: None,
        }
    }

    pub fn with_validator(mut self, validator: SemanticValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Attach the HTTP service described by `service`. A service that cannot
    /// be built (missing credential) is still attached so the first
    /// validation records the degradation warning.
    pub fn with_service_config(
        self,
        service: &SimilarityServiceConfig,
        cache: Arc<SimilarityCache>,
    ) -> Self {
        let backend: Arc<dyn SimilarityService> = match HttpSimilarityService::from_config(service)
        {
            Ok(http) => Arc::new(http),
            Err(e) => Arc::new(UnavailableService::new(e)),
        };
        self.with_validator(SemanticValidator::new(backend, cache, service.max_retries))
    }

    pub fn run(&mut self, libraries: &[Library]) -> MatchOutcome {
        let mut ordered: Vec<&Library> = libraries.iter().collect();
        ordered.sort_by(|a, b| a.ecosystem.cmp(&b.ecosystem));

        let all_ecosystems: BTreeSet<&str> =
            ordered.iter().map(|l| l.ecosystem.as_str()).collect();
        let functions: Vec<FunctionSignature> = ordered
            .iter()
            .flat_map(|lib| {
                lib.functions.iter().map(move |f| {
                    if f.ecosystem().is_empty() {
                        f.clone().with_ecosystem(&lib.ecosystem)
                    } else {
                        f.clone()
                    }
                })
            })
            .collect();

        let clusters = cluster_functions(&functions, self.config.name_similarity_threshold);
        info!(
            libraries = libraries.len(),
            functions = functions.len(),
            clusters = clusters.len(),
            "name clustering finished"
        );

        let mut patterns = Vec::new();
        let mut used_names: HashMap<String, usize> = HashMap::new();
        for cluster in clusters {
            let ecosystems: BTreeSet<&str> =
                cluster.members.iter().map(|m| m.ecosystem()).collect();
            if ecosystems.len() < 2 {
                debug!(centroid = %cluster.centroid, "cluster covers a single ecosystem");
                continue;
            }
            if self.config.require_all_libraries && ecosystems != all_ecosystems {
                debug!(
                    centroid = %cluster.centroid,
                    covered = ecosystems.len(),
                    required = all_ecosystems.len(),
                    "cluster misses a library"
                );
                continue;
            }

            let implementations = representatives(&cluster);
            let mut metadata = BTreeMap::new();
            if let Some(validator) = self.validator.as_mut() {
                let fragments: Vec<String> = implementations
                    .values()
                    .map(|sig| format!("{}\n{}", sig.render(), sig.documentation))
                    .collect();
                if let Some(confidence) = validator.confidence(&fragments) {
                    if confidence < self.config.semantic_similarity_threshold {
                        debug!(centroid = %cluster.centroid, confidence, "rejected by semantic check");
                        continue;
                    }
                    metadata.insert("semantic_confidence".to_string(), format!("{confidence:.3}"));
                }
            }

            let pattern = build_pattern(
                &cluster,
                implementations,
                metadata,
                libraries.len(),
                &mut used_names,
            );
            debug!(pattern = %pattern.name, universal = pattern.is_universal, "pattern accepted");
            patterns.push(pattern);
        }

        let (warnings, degraded) = match self.validator.as_mut() {
            Some(v) => (v.take_warnings(), v.is_degraded()),
            None => (Vec::new(), false),
        };
        info!(patterns = patterns.len(), degraded, "pattern matching finished");
        MatchOutcome {
            patterns,
            warnings,
            degraded,
        }
    }
}

/// Name-only matching with the given thresholds.
pub fn find_patterns(libraries: &[Library], config: &MatchingConfig) -> Vec<Pattern> {
    PatternMatcher::new(config.clone()).run(libraries).patterns
}

/// One member per ecosystem, in lexical tag order. Among several members of
/// one ecosystem the longest documentation wins, first seen on ties.
fn representatives(cluster: &Cluster) -> IndexMap<String, FunctionSignature> {
    let mut chosen: BTreeMap<String, &FunctionSignature> = BTreeMap::new();
    for member in &cluster.members {
        let eco = member.ecosystem().to_string();
        match chosen.get(&eco) {
            Some(current) if current.documentation.len() >= member.documentation.len() => {}
            _ => {
                chosen.insert(eco, member);
            }
        }
    }
    chosen.into_iter().map(|(eco, sig)| (eco, sig.clone())).collect()
}

fn build_pattern(
    cluster: &Cluster,
    implementations: IndexMap<String, FunctionSignature>,
    mut metadata: BTreeMap<String, String>,
    library_count: usize,
    used_names: &mut HashMap<String, usize>,
) -> Pattern {
    let base = {
        let snake = snake_case(&cluster.centroid);
        if snake.is_empty() {
            "pattern".to_string()
        } else {
            snake
        }
    };
    let seen = used_names.entry(base.clone()).or_insert(0);
    *seen += 1;
    let name = if *seen == 1 {
        base
    } else {
        format!("{base}_{seen}")
    };

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(name.as_bytes());
    for (eco, sig) in &implementations {
        hasher.update(b"\0");
        hasher.update(eco.as_bytes());
        hasher.update(b":");
        hasher.update(sig.qualified_name().as_bytes());
    }
    let id = format!("{:08x}", hasher.finalize());

    metadata.insert("centroid".to_string(), cluster.centroid.clone());
    metadata.insert("cluster_size".to_string(), cluster.members.len().to_string());
    metadata.insert(
        "mean_distance".to_string(),
        format!("{:.4}", cluster.mean_distance),
    );

    Pattern {
        id,
        category: categorize(&name).to_string(),
        is_universal: implementations.len() == library_count,
        similarity_score: (1.0 - cluster.mean_distance).clamp(0.0, 1.0),
        name,
        implementations,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExternalServiceError;
    use crate::models::{SourceLocation, TypeRef};
    use std::time::Duration;

    fn sig(name: &str, eco: &str, doc: &str) -> FunctionSignature {
        let mut f = FunctionSignature::new(name, "m", SourceLocation::new("m", 1, 1))
            .with_ecosystem(eco);
        f.documentation = doc.to_string();
        f.return_type = TypeRef::named("int");
        f
    }

    fn lib(eco: &str, names: &[&str]) -> Library {
        let mut l = Library::new(eco, "/tmp");
        for n in names {
            l.functions.push(sig(n, eco, ""));
        }
        l
    }

    #[test]
    fn test_two_libraries_two_universal_patterns() {
        let libs = vec![lib("python", &["add", "concat"]), lib("go", &["Add", "Concat"])];
        let patterns = find_patterns(&libs, &MatchingConfig::default());
        let names: Vec<&str> = patterns.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["add", "concat"]);
        assert!(patterns.iter().all(|p| p.is_universal));
        assert!(patterns.iter().all(|p| p.implementations.len() == 2));
        assert_eq!(patterns[0].similarity_score, 1.0);
        // go sorts before python
        let ecos: Vec<&String> = patterns[0].implementations.keys().collect();
        assert_eq!(ecos, vec!["go", "python"]);
    }

    #[test]
    fn test_require_all_libraries_excludes_partial_cluster() {
        let libs = vec![
            lib("python", &["split", "join"]),
            lib("go", &["Split", "Join"]),
            lib("java", &["join"]),
        ];
        let patterns = find_patterns(&libs, &MatchingConfig::default());
        let names: Vec<&str> = patterns.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["join"]);

        let relaxed = MatchingConfig {
            require_all_libraries: false,
            ..Default::default()
        };
        let patterns = find_patterns(&libs, &relaxed);
        assert_eq!(patterns.len(), 2);
        let split = patterns.iter().find(|p| p.name == "split").unwrap();
        assert!(!split.is_universal);
    }

    #[test]
    fn test_same_ecosystem_cluster_is_not_a_pattern() {
        let libs = vec![lib("python", &["trim", "trim"]), lib("go", &["Other"])];
        let relaxed = MatchingConfig {
            require_all_libraries: false,
            ..Default::default()
        };
        assert!(find_patterns(&libs, &relaxed).is_empty());
    }

    #[test]
    fn test_representative_prefers_longer_docs() {
        let mut py = Library::new("python", "/tmp");
        py.functions.push(sig("split", "python", "short"));
        py.functions.push(sig("split", "python", "a much longer description"));
        let go = lib("go", &["Split"]);
        let patterns = find_patterns(&[py, go], &MatchingConfig::default());
        assert_eq!(patterns.len(), 1);
        assert_eq!(
            patterns[0].implementations["python"].documentation,
            "a much longer description"
        );
        assert_eq!(patterns[0].category, "string");
    }

    #[test]
    fn test_pattern_ids_are_distinct_hex() {
        let libs = vec![
            lib("python", &["to_upper", "lstrip"]),
            lib("go", &["ToUpper", "Lstrip"]),
        ];
        let patterns = find_patterns(&libs, &MatchingConfig::default());
        assert_eq!(patterns.len(), 2);
        assert_eq!(patterns[0].name, "to_upper");
        assert_ne!(patterns[0].id, patterns[1].id);
        assert!(patterns
            .iter()
            .all(|p| p.id.len() == 8 && p.id.chars().all(|c| c.is_ascii_hexdigit())));
    }

    #[test]
    fn test_repeated_pattern_names_get_suffix() {
        let cluster = Cluster {
            members: vec![sig("splitLines", "go", ""), sig("split_lines", "python", "")],
            centroid: "splitLines".to_string(),
            mean_distance: 0.0,
        };
        let mut used = HashMap::new();
        let first = build_pattern(&cluster, representatives(&cluster), BTreeMap::new(), 2, &mut used);
        let second = build_pattern(&cluster, representatives(&cluster), BTreeMap::new(), 2, &mut used);
        assert_eq!(first.name, "split_lines");
        assert_eq!(second.name, "split_lines_2");
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_matching_is_deterministic() {
        let libs = vec![
            lib("typescript", &["map", "filter", "reduce"]),
            lib("python", &["map", "filter", "reduce"]),
        ];
        let reversed: Vec<Library> = libs.iter().rev().cloned().collect();
        let a = find_patterns(&libs, &MatchingConfig::default());
        let b = find_patterns(&reversed, &MatchingConfig::default());
        assert_eq!(a, b);
    }

    struct FixedService(f64);

    impl SimilarityService for FixedService {
        fn provider(&self) -> &str {
            "fixed"
        }
        fn model(&self) -> &str {
            "fixed"
        }
        fn similarity(&self, _: &[String]) -> Result<f64, ExternalServiceError> {
            Ok(self.0)
        }
    }

    #[test]
    fn test_semantic_rejection_below_threshold() {
        let libs = vec![lib("python", &["add"]), lib("go", &["Add"])];
        let validator = SemanticValidator::new(
            Arc::new(FixedService(0.2)),
            Arc::new(SimilarityCache::in_memory()),
            0,
        );
        let outcome = PatternMatcher::new(MatchingConfig::default())
            .with_validator(validator)
            .run(&libs);
        assert!(outcome.patterns.is_empty());
        assert!(!outcome.degraded);
    }

    #[test]
    fn test_unreachable_service_degrades_to_names() {
        let libs = vec![lib("python", &["add"]), lib("go", &["Add"])];
        let validator = SemanticValidator::new(
            Arc::new(UnavailableService::new(ExternalServiceError::Timeout(1))),
            Arc::new(SimilarityCache::in_memory()),
            1,
        )
        .with_backoff(Duration::ZERO);
        let outcome = PatternMatcher::new(MatchingConfig::default())
            .with_validator(validator)
            .run(&libs);
        assert_eq!(outcome.patterns.len(), 1);
        assert!(outcome.degraded);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(!outcome.patterns[0].metadata.contains_key("semantic_confidence"));
    }
}
