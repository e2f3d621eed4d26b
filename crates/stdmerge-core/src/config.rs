//! Pipeline configuration loaded from a JSON document.
//!
//! Every field has a default so an empty `{}` document is valid. Environment
//! flags are applied after parsing:
//!
//! - `STDMERGE_SEMANTIC=off` drops the external similarity service
//! - `STDMERGE_WORKERS=<n>` overrides the parser worker count

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{MergeError, StdResult};
use crate::extractor::emit::SUPPORTED_TARGETS;

pub const DEFAULT_CREDENTIAL_ENV: &str = "STDMERGE_SIMILARITY_API_KEY";
pub const KNOWN_PROVIDERS: &[&str] = &["anthropic", "openai"];

/// Weights of the six quality criteria, each in `[0, 1]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityWeights {
    pub clarity: f64,
    pub performance: f64,
    pub error_handling: f64,
    pub text_support: f64,
    pub safety: f64,
    pub composability: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            clarity: 0.8,
            performance: 0.5,
            error_handling: 0.9,
            text_support: 0.6,
            safety: 0.8,
            composability: 0.7,
        }
    }
}

impl QualityWeights {
    pub fn as_pairs(&self) -> [(&'static str, f64); 6] {
        [
            ("clarity", self.clarity),
            ("performance", self.performance),
            ("error_handling", self.error_handling),
            ("text_support", self.text_support),
            ("safety", self.safety),
            ("composability", self.composability),
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub name_similarity_threshold: f64,
    pub semantic_similarity_threshold: f64,
    pub require_all_libraries: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            name_similarity_threshold: 0.8,
            semantic_similarity_threshold: 0.7,
            require_all_libraries: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub target_ecosystem: String,
    pub normalize_api: bool,
    pub add_docstrings: bool,
    pub preserve_comments: bool,
    /// Register the built-in signature translator for every supported pair.
    pub signature_translation: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            target_ecosystem: "python".to_string(),
            normalize_api: true,
            add_docstrings: true,
            preserve_comments: true,
            signature_translation: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StripConfig {
    /// When false every library is stripped in documentation-only mode.
    pub rewrite_sources: bool,
}

impl Default for StripConfig {
    fn default() -> Self {
        Self {
            rewrite_sources: true,
        }
    }
}

/// Settings for the optional external semantic-similarity service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityServiceConfig {
    pub provider: String,
    pub model: String,
    /// Override for the provider's default API URL.
    pub endpoint: Option<String>,
    pub credential_env: String,
    pub max_retries: u32,
    pub timeout_seconds: u64,
    /// SQLite file persisting responses across runs.
    pub cache_path: Option<PathBuf>,
}

impl Default for SimilarityServiceConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-3-5-haiku-latest".to_string(),
            endpoint: None,
            credential_env: DEFAULT_CREDENTIAL_ENV.to_string(),
            max_retries: 3,
            timeout_seconds: 30,
            cache_path: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub quality: QualityWeights,
    pub matching: MatchingConfig,
    pub extraction: ExtractionConfig,
    pub stripping: StripConfig,
    pub similarity: Option<SimilarityServiceConfig>,
    pub workers: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            quality: QualityWeights::default(),
            matching: MatchingConfig::default(),
            extraction: ExtractionConfig::default(),
            stripping: StripConfig::default(),
            similarity: None,
            workers: 4,
        }
    }
}

impl MergeConfig {
    /// Read, parse, apply environment overrides and validate.
    pub fn load(path: &Path) -> StdResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MergeError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> StdResult<Self> {
        let mut config: MergeConfig = serde_json::from_str(content)
            .map_err(|e| MergeError::Config(format!("invalid config document: {e}")))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if !semantic_enabled() {
            self.similarity = None;
        }
        if let Ok(raw) = std::env::var("STDMERGE_WORKERS") {
            if let Ok(workers) = raw.trim().parse::<usize>() {
                self.workers = workers;
            }
        }
    }

    pub fn validate(&self) -> StdResult<()> {
        for (name, weight) in self.quality.as_pairs() {
            check_unit(&format!("quality.{name}"), weight)?;
        }
        check_unit(
            "matching.name_similarity_threshold",
            self.matching.name_similarity_threshold,
        )?;
        check_unit(
            "matching.semantic_similarity_threshold",
            self.matching.semantic_similarity_threshold,
        )?;

        let target = self.extraction.target_ecosystem.as_str();
        if !SUPPORTED_TARGETS.contains(&target) {
            return Err(MergeError::UnsupportedEcosystem {
                ecosystem: target.to_string(),
            });
        }

        if let Some(service) = &self.similarity {
            if !KNOWN_PROVIDERS.contains(&service.provider.as_str()) {
                return Err(MergeError::Config(format!(
                    "unknown similarity provider '{}', expected one of: {}",
                    service.provider,
                    KNOWN_PROVIDERS.join(", ")
                )));
            }
            if service.timeout_seconds == 0 {
                return Err(MergeError::Config(
                    "similarity.timeout_seconds must be greater than 0".to_string(),
                ));
            }
            if service.model.trim().is_empty() {
                return Err(MergeError::Config(
                    "similarity.model cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn check_unit(name: &str, value: f64) -> StdResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(MergeError::Config(format!(
            "{name} must be between 0.0 and 1.0, got {value}"
        )))
    }
}

fn semantic_enabled() -> bool {
    match std::env::var("STDMERGE_SEMANTIC") {
        Ok(val) => {
            let v = val.trim().to_lowercase();
            !matches!(v.as_str(), "0" | "false" | "no" | "off")
        }
        Err(_) => true,
    }
}
