#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serde error: {0}")]
    SerdeError(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
    #[error("Schema error: {0}")]
    Schema(String),
    #[error("LLM error: {0}")]
    Llm(String),
    #[error("LLM did not follow the format after {0} attempts")]
    InvalidFormat(usize),
    #[error("{0} environment variable not set")]
    MissingEnv(&'static str),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Embedding error: {0}")]
    Embedding(String),
    #[error("Artifact backend error: {0}")]
    Artifact(String),
    #[error("Style record '{0}' not found")]
    RecordNotFound(String),
    #[error("Style record '{0}' already exists")]
    DuplicateRecord(String),
    #[error("Style record '{id}' is system protected: {reason}")]
    ProtectedRecord { id: String, reason: String },
    #[error("Invariant violated: {0}")]
    Invariant(String),
}

impl From<jsonschema::ValidationError<'_>> for Error {
    fn from(e: jsonschema::ValidationError<'_>) -> Self {
        Error::Schema(e.to_string())
    }
}
