use thiserror::Error;

/// Missing or invalid required configuration. Fatal before any unit runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    MissingVar(&'static str),

    #[error("invalid value for {key}: {value}")]
    InvalidVar { key: &'static str, value: String },

    #[error("identity table {path}: {message}")]
    IdentityTable { path: String, message: String },
}

/// Malformed run parameter. Fatal before any provider call.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid season {0:?}")]
    Season(String),

    #[error("season {season} outside supported range {min}..={max}")]
    SeasonOutOfRange { season: u16, min: u16, max: u16 },

    #[error("no seasons requested")]
    NoSeasons,

    #[error("invalid team filter {0:?}")]
    TeamFilter(String),
}

/// A provider call that did not yield usable data. Never retried here; the
/// caller decides whether to fall back or skip.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http {status} for {path}")]
    Http { status: u16, path: String },

    #[error("provider error for {path}: {message}")]
    Envelope { path: String, message: String },

    #[error("request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid payload for {path}: {message}")]
    Decode { path: String, message: String },
}

impl ProviderError {
    pub fn path(&self) -> &str {
        match self {
            ProviderError::Http { path, .. }
            | ProviderError::Envelope { path, .. }
            | ProviderError::Transport { path, .. }
            | ProviderError::Decode { path, .. } => path,
        }
    }
}

/// Failure writing to the row store or the snapshot directory.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("snapshot {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
