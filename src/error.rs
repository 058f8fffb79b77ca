/// Message shown when neither the server nor the error itself has anything useful to say.
pub const GENERIC_FAILURE: &str = "Something went wrong.";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request failed with status {status}")]
    Api { status: u16, message: Option<String> },

    #[error("Malformed data: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("{0}")]
    Internal(String),
}

impl ClientError {
    /// Human-readable message for the `error` field of a store.
    ///
    /// Prefers the message the server put in the response body, then the
    /// error's own description, then [`GENERIC_FAILURE`].
    pub fn user_message(&self) -> String {
        if let ClientError::Api {
            message: Some(message),
            ..
        } = self
        {
            if !message.trim().is_empty() {
                return message.clone();
            }
        }

        let own = self.to_string();
        if own.trim().is_empty() {
            GENERIC_FAILURE.to_string()
        } else {
            own
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// A failure that has already been absorbed into a store's state.
///
/// Carries only the display string so it can be cloned into views and
/// compared in tests.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct Failure {
    pub message: String,
}

impl Failure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<&ClientError> for Failure {
    fn from(err: &ClientError) -> Self {
        Failure::new(err.user_message())
    }
}

impl From<ClientError> for Failure {
    fn from(err: ClientError) -> Self {
        Failure::from(&err)
    }
}
