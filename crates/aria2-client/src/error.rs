use thiserror::Error;

/// Errors from the aria2 RPC client.
#[derive(Debug, Error)]
pub enum Aria2Error {
    /// HTTP transport error (connection refused, timeout, bad body).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The daemon answered with a JSON-RPC error object.
    #[error("aria2 rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The response carried neither a result nor an error.
    #[error("aria2 response missing result")]
    MissingResult,
}
