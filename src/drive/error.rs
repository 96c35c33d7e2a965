use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriveError {
    #[error("File storage is not configured: {0}")]
    NotConfigured(String),
    #[error("Invalid service account credentials: {0}")]
    InvalidCredentials(String),
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Drive API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Not Found: {0}")]
    NotFound(String),
}
