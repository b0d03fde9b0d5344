use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Non success status other than 404, with the API's own message
    #[error("Neon API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("request to the Neon API failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response from the Neon API: {0}")]
    Decode(String),
    #[error("invalid API key: {0}")]
    InvalidApiKey(String),
    #[error("branch {branch} is in state `{state}`")]
    BranchFailed { branch: String, state: String },
    #[error(
        "branch {branch} was not ready after {seconds}s (last state: `{state}`), check the Neon console"
    )]
    NotReady {
        branch: String,
        state: String,
        seconds: u64,
    },
}

impl ProviderError {
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
