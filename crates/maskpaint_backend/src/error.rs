use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid JSON from backend: {0}")]
    Json(#[from] serde_json::Error),

    /// The backend answered with `success: false`.
    #[error("Backend rejected request: {0}")]
    Rejected(String),

    #[error("Malformed data URL: {0}")]
    DataUrl(String),

    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackendError {
    pub fn data_url(message: impl Into<String>) -> Self {
        Self::DataUrl(message.into())
    }
}

impl From<ureq::Error> for BackendError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => {
                let body = response.into_string().unwrap_or_default();
                BackendError::Status { status, body }
            }
            ureq::Error::Transport(transport) => BackendError::Transport(transport.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, BackendError>;
