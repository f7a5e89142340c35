use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiverError {
    #[error("required setting missing: {0}")]
    MissingCredential(&'static str),
    #[error("invalid linkding base url `{url}`: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("expected success status code for {target}, was {status}")]
    UnexpectedStatus {
        target: String,
        status: reqwest::StatusCode,
    },
    #[error("unknown MIME type for {0}")]
    UnknownMimeType(String),
}
