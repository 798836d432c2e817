use std::sync::Arc;

use crate::config::Config;
use crate::matching::scoring::MatchScorer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Scorer for the configured default policy. Requests may ask for the other one.
    pub scorer: Arc<dyn MatchScorer>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let scorer = Arc::from(config.scoring_policy.scorer());
        AppState { config, scorer }
    }
}
