use thiserror::Error;

#[derive(Error, Debug)]
pub enum TagStoreError {
    #[error("Tag database is not configured (set TURSO_CONNECTION_URL and TURSO_AUTH_TOKEN)")]
    NotConfigured,
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Query failed: {0}")]
    Query(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Unexpected row shape: {0}")]
    Decode(String),
}
