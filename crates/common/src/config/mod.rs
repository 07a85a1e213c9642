//! Layered configuration for the curation pipeline.
//!
//! Precedence, lowest to highest: compiled-in [`Default`] impl → an optional
//! `config/*.toml` file → environment variables prefixed `CURATOR__` with
//! `__` as the nesting separator (e.g. `CURATOR__L2__THRESHOLD=0.4`).

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    pub database: DatabaseConfig,
    pub arxiv: ArxivConfig,
    pub embedding: EmbeddingConfig,
    pub l2: L2Config,
    pub llm: LlmConfig,
    pub object_store: ObjectStoreConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// `DATABASE_URL` env var, or the value resolved from `DB_SECRET_ARN`.
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArxivConfig {
    #[serde(default = "default_arxiv_base_url")]
    pub base_url: String,
    #[serde(default = "default_arxiv_rate_limit_secs")]
    pub rate_limit_secs: u64,
    #[serde(default = "default_arxiv_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_arxiv_max_retries")]
    pub max_retries: u32,
}

impl ArxivConfig {
    pub fn rate_limit(&self) -> Duration {
        Duration::from_secs(self.rate_limit_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_embedding_api_base")]
    pub api_base: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,
    #[serde(default = "default_embedding_batch_cap")]
    pub batch_cap: usize,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct L2Config {
    #[serde(default = "default_l2_threshold")]
    pub threshold: f64,
    #[serde(default = "default_anchor_count")]
    pub anchor_count: u32,
    #[serde(default = "default_weight_max_score")]
    pub weight_max_score: f64,
    #[serde(default = "default_weight_hit_count")]
    pub weight_hit_count: f64,
    #[serde(default = "default_weight_matched_queries")]
    pub weight_matched_queries: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    pub gemini_api_key: Option<String>,
    #[serde(default = "default_gemini_api_base")]
    pub gemini_api_base: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,

    #[serde(default = "default_l3_concurrency")]
    pub l3_concurrency: usize,
    #[serde(default = "default_l3_request_interval_ms")]
    pub l3_request_interval_ms: u64,
    #[serde(default = "default_l3_temperature")]
    pub l3_temperature: f64,
    #[serde(default = "default_l3_max_output_tokens")]
    pub l3_max_output_tokens: u32,
    #[serde(default = "default_max_retries")]
    pub l3_max_retries: u32,
    #[serde(default = "default_l3_timeout_secs")]
    pub l3_timeout_secs: u64,

    #[serde(default = "default_post_l3_concurrency")]
    pub post_l3_concurrency: usize,
    #[serde(default = "default_post_l3_temperature")]
    pub post_l3_temperature: f64,
    #[serde(default = "default_post_l3_max_output_tokens")]
    pub post_l3_max_output_tokens: u32,
    #[serde(default = "default_max_retries")]
    pub post_l3_max_retries: u32,
    #[serde(default = "default_post_l3_timeout_secs")]
    pub post_l3_timeout_secs: u64,

    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,
    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObjectStoreConfig {
    /// `FIGURE_BUCKET`
    pub bucket: Option<String>,
    /// `CDN_DOMAIN`
    pub cdn_domain: Option<String>,
    #[serde(default = "default_figure_min_width")]
    pub figure_min_width: u32,
    #[serde(default = "default_figure_min_height")]
    pub figure_min_height: u32,
    #[serde(default = "default_figure_s3_prefix")]
    pub figure_s3_prefix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// `pretty` for local dev, `json` for deployed runs.
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

fn default_max_connections() -> u32 {
    5
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_arxiv_base_url() -> String {
    "http://export.arxiv.org/api/query".to_string()
}
fn default_arxiv_rate_limit_secs() -> u64 {
    3
}
fn default_arxiv_timeout_secs() -> u64 {
    30
}
fn default_arxiv_max_retries() -> u32 {
    3
}
fn default_embedding_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_embedding_dimension() -> usize {
    1536
}
fn default_embedding_batch_cap() -> usize {
    2048
}
fn default_embedding_timeout_secs() -> u64 {
    30
}
fn default_l2_threshold() -> f64 {
    0.40
}
fn default_anchor_count() -> u32 {
    6
}
fn default_weight_max_score() -> f64 {
    0.6
}
fn default_weight_hit_count() -> f64 {
    0.3
}
fn default_weight_matched_queries() -> f64 {
    0.1
}
fn default_gemini_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_l3_concurrency() -> usize {
    5
}
fn default_l3_request_interval_ms() -> u64 {
    200
}
fn default_l3_temperature() -> f64 {
    0.1
}
fn default_l3_max_output_tokens() -> u32 {
    500
}
fn default_max_retries() -> u32 {
    3
}
fn default_l3_timeout_secs() -> u64 {
    30
}
fn default_post_l3_concurrency() -> usize {
    3
}
fn default_post_l3_temperature() -> f64 {
    0.3
}
fn default_post_l3_max_output_tokens() -> u32 {
    4096
}
fn default_post_l3_timeout_secs() -> u64 {
    60
}
fn default_backoff_base_secs() -> u64 {
    1
}
fn default_backoff_max_secs() -> u64 {
    32
}
fn default_figure_min_width() -> u32 {
    100
}
fn default_figure_min_height() -> u32 {
    100
}
fn default_figure_s3_prefix() -> String {
    "figures".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_metrics_port() -> u16 {
    9090
}

impl PipelineConfig {
    /// Load configuration from an optional `config/*.toml` file and
    /// `CURATOR__`-prefixed environment variables, falling back to defaults.
    /// `DATABASE_URL`/`OPENAI_API_KEY`/`GEMINI_API_KEY`/`FIGURE_BUCKET`/
    /// `CDN_DOMAIN` are accepted bare (without the `CURATOR__` prefix) since
    /// they are the contract named in the external interfaces section.
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("CURATOR_ENV").unwrap_or_else(|_| "development".to_string());

        let builder = Config::builder()
            .set_default("database.url", "postgres://localhost/curator")?
            .set_default("arxiv.base_url", default_arxiv_base_url())?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{env}")).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("CURATOR")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut config: Self = builder.build()?.try_deserialize()?;

        // Bare env vars (or their `_ARN` fallbacks, via `crate::secrets`) win
        // over everything loaded above — they are the contract named in §6,
        // not a `CURATOR__`-prefixed override.
        if let Some(url) = crate::secrets::database_url() {
            config.database.url = url;
        }
        if let Some(key) = crate::secrets::openai_api_key() {
            config.embedding.api_key = Some(key);
        }
        if let Some(key) = crate::secrets::gemini_api_key() {
            config.llm.gemini_api_key = Some(key);
        }
        if let Ok(bucket) = std::env::var("FIGURE_BUCKET") {
            config.object_store.bucket = Some(bucket);
        }
        if let Ok(cdn) = std::env::var("CDN_DOMAIN") {
            config.object_store.cdn_domain = Some(cdn);
        }

        Ok(config)
    }

    pub fn arxiv_rate_limit(&self) -> Duration {
        Duration::from_secs(self.arxiv.rate_limit_secs)
    }

    pub fn arxiv_timeout(&self) -> Duration {
        Duration::from_secs(self.arxiv.timeout_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_secs(self.llm.backoff_base_secs)
    }

    pub fn backoff_cap(&self) -> Duration {
        Duration::from_secs(self.llm.backoff_max_secs)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgres://localhost/curator".to_string(),
                max_connections: default_max_connections(),
                connect_timeout_secs: default_connect_timeout(),
            },
            arxiv: ArxivConfig {
                base_url: default_arxiv_base_url(),
                rate_limit_secs: default_arxiv_rate_limit_secs(),
                timeout_secs: default_arxiv_timeout_secs(),
                max_retries: default_arxiv_max_retries(),
            },
            embedding: EmbeddingConfig {
                api_key: None,
                api_base: default_embedding_api_base(),
                model: default_embedding_model(),
                dimension: default_embedding_dimension(),
                batch_cap: default_embedding_batch_cap(),
                timeout_secs: default_embedding_timeout_secs(),
            },
            l2: L2Config {
                threshold: default_l2_threshold(),
                anchor_count: default_anchor_count(),
                weight_max_score: default_weight_max_score(),
                weight_hit_count: default_weight_hit_count(),
                weight_matched_queries: default_weight_matched_queries(),
            },
            llm: LlmConfig {
                gemini_api_key: None,
                gemini_api_base: default_gemini_api_base(),
                model: default_gemini_model(),
                l3_concurrency: default_l3_concurrency(),
                l3_request_interval_ms: default_l3_request_interval_ms(),
                l3_temperature: default_l3_temperature(),
                l3_max_output_tokens: default_l3_max_output_tokens(),
                l3_max_retries: default_max_retries(),
                l3_timeout_secs: default_l3_timeout_secs(),
                post_l3_concurrency: default_post_l3_concurrency(),
                post_l3_temperature: default_post_l3_temperature(),
                post_l3_max_output_tokens: default_post_l3_max_output_tokens(),
                post_l3_max_retries: default_max_retries(),
                post_l3_timeout_secs: default_post_l3_timeout_secs(),
                backoff_base_secs: default_backoff_base_secs(),
                backoff_max_secs: default_backoff_max_secs(),
            },
            object_store: ObjectStoreConfig {
                bucket: None,
                cdn_domain: None,
                figure_min_width: default_figure_min_width(),
                figure_min_height: default_figure_min_height(),
                figure_s3_prefix: default_figure_s3_prefix(),
            },
            observability: ObservabilityConfig {
                log_format: default_log_format(),
                log_level: default_log_level(),
                metrics_port: default_metrics_port(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_constants() {
        let config = PipelineConfig::default();
        assert_eq!(config.embedding.dimension, 1536);
        assert_eq!(config.l2.threshold, 0.40);
        assert_eq!(config.llm.l3_concurrency, 5);
        assert_eq!(config.llm.post_l3_concurrency, 3);
        assert_eq!(config.llm.backoff_max_secs, 32);
    }

    #[test]
    fn arxiv_backoff_durations_derive_correctly() {
        let config = PipelineConfig::default();
        assert_eq!(config.arxiv_rate_limit(), Duration::from_secs(3));
        assert_eq!(config.backoff_cap(), Duration::from_secs(32));
    }
}
