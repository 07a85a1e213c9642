//! Curation pipeline entry point.
//!
//! Runs exactly one batch: L1 fetch -> L2 vector filter -> L3 LLM
//! judgement -> Post-L3 LLM review. The exit code carries the §6 Trigger
//! contract (`statusCode=200 <-> 0`, `statusCode=500 <-> 1`): `0` once a
//! batch log was written, even if individual stages recorded errors;
//! `1` only if the orchestrator could not be entered at all (bad config,
//! no database connection).

mod analyzer;
mod arxiv;
mod errors;
mod llm_judge;
mod llm_review;
mod object_store;
mod orchestrator;
mod pdf;
mod reviewer;
mod selector;
mod types;

use curator_common::config::PipelineConfig;
use curator_common::db::DbPool;
use curator_common::VERSION;
use tracing::{error, info};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    dotenvy::dotenv().ok();

    let config = match PipelineConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            return std::process::ExitCode::from(1);
        }
    };

    curator_common::logging::init(&config.observability);
    curator_common::metrics::register_metrics();

    info!(version = VERSION, "starting curation pipeline run");

    let pool = match DbPool::new(&config.database).await {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, "failed to connect to database");
            return std::process::ExitCode::from(1);
        }
    };

    let now = chrono::Utc::now();
    let stats = orchestrator::run_pipeline(config, pool, now).await;

    if !stats.errors.is_empty() {
        error!(errors = ?stats.errors, "curation run completed with stage errors");
    }
    info!(stats = ?stats, "curation run finished");

    std::process::ExitCode::from(0)
}
