//! Optional semantic validation of clusters through an external service.
//!
//! The service is only ever consulted through `SemanticValidator`, which adds
//! the response cache, bounded retries with exponential backoff and the
//! switch to name-only matching once the service has failed for good.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::errors::ExternalServiceError;
use crate::store::SimilarityCache;

const DEFAULT_BACKOFF: Duration = Duration::from_millis(250);

/// "Given N text fragments, how likely do they describe the same operation?"
pub trait SimilarityService: Send + Sync {
    fn provider(&self) -> &str;

    fn model(&self) -> &str;

    /// Confidence in `[0, 1]`.
    fn similarity(&self, fragments: &[String]) -> Result<f64, ExternalServiceError>;
}

/// A service that is configured but can never answer, e.g. because its
/// credential is missing. Validation degrades on the first call.
pub struct UnavailableService {
    reason: ExternalServiceError,
}

impl UnavailableService {
    pub fn new(reason: ExternalServiceError) -> Self {
        Self { reason }
    }
}

impl SimilarityService for UnavailableService {
    fn provider(&self) -> &str {
        "unavailable"
    }

    fn model(&self) -> &str {
        ""
    }

    fn similarity(&self, _fragments: &[String]) -> Result<f64, ExternalServiceError> {
        Err(self.reason.clone())
    }
}

pub struct SemanticValidator {
    service: Arc<dyn SimilarityService>,
    cache: Arc<SimilarityCache>,
    max_retries: u32,
    backoff: Duration,
    degraded: bool,
    warnings: Vec<String>,
}

impl SemanticValidator {
    pub fn new(
        service: Arc<dyn SimilarityService>,
        cache: Arc<SimilarityCache>,
        max_retries: u32,
    ) -> Self {
        Self {
            service,
            cache,
            max_retries,
            backoff: DEFAULT_BACKOFF,
            degraded: false,
            warnings: Vec::new(),
        }
    }

    /// Base delay before the first retry; doubles on each further retry.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    /// Confidence for `fragments`, or `None` when the service is degraded and
    /// the caller must rely on name similarity alone.
    pub fn confidence(&mut self, fragments: &[String]) -> Option<f64> {
        if self.degraded {
            return None;
        }
        let key = SimilarityCache::key(fragments);
        if let Some(hit) = self.cache.get(&key) {
            debug!(key = %&key[..12], confidence = hit, "similarity cache hit");
            return Some(hit);
        }

        let attempts = self.max_retries + 1;
        let mut last_error = ExternalServiceError::Disabled;
        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.backoff.saturating_mul(1 << (attempt - 1).min(16));
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
            }
            match self.service.similarity(fragments) {
                Ok(value) => {
                    let value = value.clamp(0.0, 1.0);
                    self.cache
                        .put(&key, value, self.service.provider(), self.service.model());
                    return Some(value);
                }
                Err(e) => {
                    warn!(
                        provider = self.service.provider(),
                        attempt = attempt + 1,
                        attempts,
                        error = %e,
                        "similarity request failed"
                    );
                    let permanent = matches!(
                        e,
                        ExternalServiceError::MissingCredential(_) | ExternalServiceError::Disabled
                    );
                    last_error = e;
                    if permanent {
                        break;
                    }
                }
            }
        }

        self.degraded = true;
        let message = format!(
            "similarity service '{}' unavailable ({last_error}); falling back to name similarity",
            self.service.provider()
        );
        warn!("{message}");
        self.warnings.push(message);
        None
    }
}
