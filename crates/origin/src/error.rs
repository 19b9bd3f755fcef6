use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum OriginError {
    #[error("stream allocation failed with HTTP {status}: {body}")]
    Allocation { status: StatusCode, body: String },

    #[error("HTTP request failed: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    #[error("encoder push failed: {reason}")]
    Push { reason: String },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("configuration error: {reason}")]
    Configuration { reason: String },
}

impl OriginError {
    pub fn push(reason: impl Into<String>) -> Self {
        Self::Push {
            reason: reason.into(),
        }
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }
}
