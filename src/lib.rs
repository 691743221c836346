pub mod config;
pub mod models;
pub mod db;
pub mod authorization;
pub mod pipeline;

#[cfg(test)]
mod test_support;

use tracing_subscriber::EnvFilter;

pub use pipeline::analysis::{
    AnalysisError, AnalysisOutcome, AnalysisRequest, AnalysisStage, ReportAnalyzer,
};

/// Install the global fmt subscriber. `RUST_LOG` wins over the crate default.
/// Safe to call more than once; only the first call installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
    }
}
