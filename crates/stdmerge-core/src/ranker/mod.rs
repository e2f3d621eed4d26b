//! Implementation Ranker: scores every implementation of a pattern and
//! picks the winner.
//!
//! Each criterion score is multiplied by its weight, summed and divided by
//! the sum of weights. Implementations are visited in the pattern's
//! (lexical) ecosystem order and only a strictly higher score replaces the
//! current winner, so ties go to the lexically first ecosystem.

pub mod heuristics;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::QualityWeights;
use crate::models::{FunctionSignature, Pattern, Ranking, SourceLocation};
pub use heuristics::{BuiltinPriors, EcosystemPriors, TablePriors};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CriterionKind {
    Clarity,
    Performance,
    ErrorHandling,
    TextSupport,
    Safety,
    Composability,
}

impl CriterionKind {
    pub const ALL: [CriterionKind; 6] = [
        CriterionKind::Clarity,
        CriterionKind::Performance,
        CriterionKind::ErrorHandling,
        CriterionKind::TextSupport,
        CriterionKind::Safety,
        CriterionKind::Composability,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CriterionKind::Clarity => "clarity",
            CriterionKind::Performance => "performance",
            CriterionKind::ErrorHandling => "error_handling",
            CriterionKind::TextSupport => "text_support",
            CriterionKind::Safety => "safety",
            CriterionKind::Composability => "composability",
        }
    }
}

impl fmt::Display for CriterionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Scorer = Arc<dyn Fn(&FunctionSignature) -> f64 + Send + Sync>;

/// A weight in `[0, 1]` and a scoring function into `[0, 1]`.
#[derive(Clone)]
pub struct Criterion {
    pub weight: f64,
    pub scorer: Scorer,
}

impl Criterion {
    pub fn new(weight: f64, scorer: Scorer) -> Self {
        Self { weight, scorer }
    }

    pub fn score(&self, sig: &FunctionSignature) -> f64 {
        let value = (self.scorer)(sig);
        if value.is_finite() {
            value.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// The six named criteria, in `CriterionKind::ALL` order.
#[derive(Clone)]
pub struct QualityCriteria {
    criteria: IndexMap<CriterionKind, Criterion>,
}

impl Default for QualityCriteria {
    fn default() -> Self {
        Self::from_weights(&QualityWeights::default(), Arc::new(BuiltinPriors))
    }
}

impl QualityCriteria {
    /// Default heuristics with the given weights and ecosystem priors.
    pub fn from_weights(weights: &QualityWeights, priors: Arc<dyn EcosystemPriors>) -> Self {
        let mut criteria = IndexMap::new();
        for kind in CriterionKind::ALL {
            let weight = match kind {
                CriterionKind::Clarity => weights.clarity,
                CriterionKind::Performance => weights.performance,
                CriterionKind::ErrorHandling => weights.error_handling,
                CriterionKind::TextSupport => weights.text_support,
                CriterionKind::Safety => weights.safety,
                CriterionKind::Composability => weights.composability,
            };
            criteria.insert(kind, Criterion::new(weight, default_scorer(kind, &priors)));
        }
        Self { criteria }
    }

    /// Replace the scoring function of one criterion, keeping its weight.
    pub fn with_scorer(mut self, kind: CriterionKind, scorer: Scorer) -> Self {
        if let Some(criterion) = self.criteria.get_mut(&kind) {
            criterion.scorer = scorer;
        }
        self
    }

    pub fn with_weight(mut self, kind: CriterionKind, weight: f64) -> Self {
        if let Some(criterion) = self.criteria.get_mut(&kind) {
            criterion.weight = weight;
        }
        self
    }

    pub fn get(&self, kind: CriterionKind) -> Option<&Criterion> {
        self.criteria.get(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CriterionKind, &Criterion)> {
        self.criteria.iter().map(|(k, c)| (*k, c))
    }

    pub fn total_weight(&self) -> f64 {
        self.criteria.values().map(|c| c.weight).sum()
    }
}

fn default_scorer(kind: CriterionKind, priors: &Arc<dyn EcosystemPriors>) -> Scorer {
    let priors = Arc::clone(priors);
    match kind {
        CriterionKind::Clarity => Arc::new(heuristics::clarity_score),
        CriterionKind::ErrorHandling => Arc::new(heuristics::error_handling_score),
        CriterionKind::Performance => {
            Arc::new(move |s: &FunctionSignature| priors.performance(s.ecosystem()))
        }
        CriterionKind::TextSupport => {
            Arc::new(move |s: &FunctionSignature| priors.text_support(s.ecosystem()))
        }
        CriterionKind::Safety => Arc::new(move |s: &FunctionSignature| priors.safety(s.ecosystem())),
        CriterionKind::Composability => Arc::new(move |s: &FunctionSignature| {
            heuristics::composability_score(s, priors.composition(s.ecosystem()))
        }),
    }
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

const NOTABLE_CLARITY: f64 = 0.8;
const NOTABLE_TEXT_SUPPORT: f64 = 0.9;
const NOTABLE_PRIOR: f64 = 0.9;
const NOTABLE_COMPOSABILITY: f64 = 0.8;

/// Score every implementation of `pattern` and pick the best one.
pub fn rank(pattern: &Pattern, criteria: &QualityCriteria) -> Ranking {
    let total_weight = criteria.total_weight();
    let mut scores = IndexMap::new();
    let mut criterion_scores = IndexMap::new();
    let mut best: Option<(&str, f64)> = None;

    for (ecosystem, sig) in &pattern.implementations {
        let mut breakdown = IndexMap::new();
        let mut weighted = 0.0;
        for (kind, criterion) in criteria.iter() {
            let value = criterion.score(sig);
            weighted += value * criterion.weight;
            breakdown.insert(kind.as_str().to_string(), value);
        }
        let normalized = if total_weight > 0.0 {
            weighted / total_weight
        } else {
            0.0
        };
        debug!(pattern = %pattern.name, ecosystem = %ecosystem, score = normalized, "scored implementation");

        if best.map_or(true, |(_, top)| normalized > top) {
            best = Some((ecosystem.as_str(), normalized));
        }
        scores.insert(ecosystem.clone(), normalized);
        criterion_scores.insert(ecosystem.clone(), breakdown);
    }

    let Some((best_ecosystem, _)) = best else {
        return Ranking {
            pattern: pattern.clone(),
            scores,
            criterion_scores,
            best_ecosystem: String::new(),
            best_implementation: FunctionSignature::new(
                pattern.name.clone(),
                "",
                SourceLocation::new("", 0, 0),
            ),
            justification: format!("Pattern '{}' has no implementations to rank.", pattern.name),
        };
    };
    let best_ecosystem = best_ecosystem.to_string();
    let best_implementation = pattern.implementations[best_ecosystem.as_str()].clone();
    let justification = justify(pattern, &best_ecosystem, &scores, &criterion_scores);

    Ranking {
        pattern: pattern.clone(),
        scores,
        criterion_scores,
        best_ecosystem,
        best_implementation,
        justification,
    }
}

/// Rank every pattern in parallel. Output order matches input order.
pub fn rank_all(patterns: &[Pattern], criteria: &QualityCriteria) -> Vec<Ranking> {
    let rankings: Vec<Ranking> = patterns.par_iter().map(|p| rank(p, criteria)).collect();
    info!(patterns = rankings.len(), "ranking complete");
    rankings
}

fn justify(
    pattern: &Pattern,
    best: &str,
    scores: &IndexMap<String, f64>,
    breakdown: &IndexMap<String, IndexMap<String, f64>>,
) -> String {
    let winner_score = scores.get(best).copied().unwrap_or(0.0);
    let mut text = format!(
        "{best} wins '{}' with a score of {winner_score:.2}.",
        pattern.name
    );

    let notable = breakdown.get(best).map(notable_strengths).unwrap_or_default();
    if notable.is_empty() {
        text.push_str(" No single criterion stood out.");
    } else {
        text.push_str(&format!(" Strengths: {}.", notable.join("; ")));
    }

    let deficits: Vec<String> = scores
        .iter()
        .filter(|(eco, _)| eco.as_str() != best)
        .map(|(eco, score)| format!("{eco} {score:.2} (-{:.2})", winner_score - score))
        .collect();
    if !deficits.is_empty() {
        text.push_str(&format!(" Others: {}.", deficits.join(", ")));
    }
    text
}

fn notable_strengths(scores: &IndexMap<String, f64>) -> Vec<String> {
    let get = |kind: CriterionKind| scores.get(kind.as_str()).copied().unwrap_or(0.0);
    let mut out = Vec::new();

    let clarity = get(CriterionKind::Clarity);
    if clarity > NOTABLE_CLARITY {
        out.push(format!("clear naming and documentation ({clarity:.2})"));
    }
    let errors = get(CriterionKind::ErrorHandling);
    if errors >= 1.0 {
        out.push("explicit result-style error handling".to_string());
    } else if errors >= 0.7 {
        out.push("optional-style return for missing values".to_string());
    }
    let text = get(CriterionKind::TextSupport);
    if text >= NOTABLE_TEXT_SUPPORT {
        out.push(format!("strong unicode/text support ({text:.2})"));
    }
    if get(CriterionKind::Performance) >= NOTABLE_PRIOR {
        out.push("high-performance runtime".to_string());
    }
    if get(CriterionKind::Safety) >= NOTABLE_PRIOR {
        out.push("strong safety guarantees".to_string());
    }
    if get(CriterionKind::Composability) >= NOTABLE_COMPOSABILITY {
        out.push("composes well".to_string());
    }
    out
}
