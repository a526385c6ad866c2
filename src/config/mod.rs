mod parser;
use crate::core::rag::SimilarityMetric;
use serde::{Deserialize, Serialize};

pub use parser::{load_style_catalog, resolve_config, validate_config};

/// Main application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AppConfig {
    /// Retry bound of the workflow loop
    #[serde(default)]
    pub workflow: WorkflowConfig,
    /// Similarity search parameters used by the augmenter
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Quality critic parameters
    #[serde(default)]
    pub critic: CriticConfig,
    /// Chat model used for classification and assessment
    #[serde(default)]
    pub llm: LlmConfig,
    /// Embedding backend of the style index
    #[serde(default)]
    pub embedder: EmbedderConfig,
    /// Artifact generation backend
    #[serde(default)]
    pub artifacts: ArtifactConfig,
    /// Optional YAML file with extra style records
    #[serde(default)]
    pub styles_file: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WorkflowConfig {
    #[serde(default = "default_max_retry_count")]
    pub max_retry_count: u32,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_retry_count: default_max_retry_count(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Maximum number of styles folded into the prompt
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f64,
    #[serde(default)]
    pub metric: SimilarityMetric,
    /// Scale factor of the distance transform
    #[serde(default = "default_distance_scale")]
    pub distance_scale: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            min_similarity: default_min_similarity(),
            metric: SimilarityMetric::default(),
            distance_scale: default_distance_scale(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CriticConfig {
    #[serde(default = "default_pass_threshold")]
    pub pass_threshold: f64,
    #[serde(default)]
    pub use_external_assessment: bool,
    /// Bound of the random perturbation applied by the heuristic scorer
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

impl Default for CriticConfig {
    fn default() -> Self {
        Self {
            pass_threshold: default_pass_threshold(),
            use_external_assessment: false,
            jitter: default_jitter(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
        }
    }
}

/// Embedder configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EmbedderConfig {
    /// "hashing" or "openai"
    #[serde(default = "default_embedder_provider")]
    pub provider: String,
    #[serde(default = "default_embedder_model")]
    pub model: String,
    /// Vector size of the hashing embedder
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            provider: default_embedder_provider(),
            model: default_embedder_model(),
            dimensions: default_dimensions(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ArtifactConfig {
    /// "url_template" or "http"
    #[serde(default = "default_artifact_provider")]
    pub provider: String,
    #[serde(default = "default_artifact_base_url")]
    pub base_url: String,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            provider: default_artifact_provider(),
            base_url: default_artifact_base_url(),
        }
    }
}

fn default_max_retry_count() -> u32 {
    3
}

fn default_limit() -> usize {
    3
}

fn default_min_similarity() -> f64 {
    0.3
}

fn default_distance_scale() -> f64 {
    1.0
}

fn default_pass_threshold() -> f64 {
    0.7
}

fn default_jitter() -> f64 {
    0.1
}

fn default_llm_provider() -> String {
    "openai".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_embedder_provider() -> String {
    "hashing".to_string()
}

fn default_embedder_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_dimensions() -> usize {
    256
}

fn default_artifact_provider() -> String {
    "url_template".to_string()
}

fn default_artifact_base_url() -> String {
    "https://image.pollinations.ai/prompt/".to_string()
}
