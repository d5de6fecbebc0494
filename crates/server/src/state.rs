use std::sync::Arc;

use buyerflow_core::Config;
use buyerflow_rules::loader::{LoadStatus, RuleLoader};
use buyerflow_rules::ScoringConfig;
use tracing::{info, warn};

/// Shared server state.
///
/// The loader owns the document registry behind its own lock (and keeps it
/// current when watching), so handlers only ever take `&self` on it. Each
/// request compiles a fresh snapshot of the rule set it needs.
pub struct AppState {
    pub config: Config,
    pub loader: RuleLoader,
}

impl AppState {
    /// Load every document under the configured rules directory and, when
    /// enabled, start watching it for changes.
    pub fn init(config: Config) -> anyhow::Result<Arc<Self>> {
        let mut loader = RuleLoader::new(config.rules.dir.clone());
        let results = loader.load_all()?;
        let failed = results
            .iter()
            .filter(|r| matches!(r.status, LoadStatus::Failed { .. }))
            .count();
        if failed > 0 {
            warn!(failed, "some rule documents failed to load");
        }
        info!("Loaded {} rule documents from {}", loader.len(), loader.rules_dir().display());

        if config.rules.watch {
            if let Err(e) = loader.watch() {
                warn!(error = %e, "failed to watch rules directory; hot reload disabled");
            }
        }

        Ok(Arc::new(Self { config, loader }))
    }

    /// The configured scoring document, or the built-in defaults when it is
    /// not loaded.
    pub fn default_scoring(&self) -> ScoringConfig {
        let id = &self.config.rules.scoring_config_id;
        self.loader.scoring_config(id).unwrap_or_else(|_| {
            warn!(id = %id, "scoring config not loaded; using built-in weights");
            ScoringConfig::default()
        })
    }
}
