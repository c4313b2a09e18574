use kaflow_api::ApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("message is empty")]
    EmptyMessage,

    #[error("transport failure: {0}")]
    Transport(#[from] ApiError),
}

impl SessionError {
    #[must_use]
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Transport(error) => Some(error),
            Self::EmptyMessage => None,
        }
    }
}
