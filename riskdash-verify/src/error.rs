use riskdash_http::HttpError;
use thiserror::Error;

/// Shown when the service rejects a transaction without a usable `detail`.
pub const VERIFY_FALLBACK_MESSAGE: &str = "Failed to verify transaction";

/// Every way a verification call can fail.
///
/// `Display` is exactly the message surfaced to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// No response could be obtained.
    #[error("{0}")]
    Transport(String),
    /// The service answered with a non-success status.
    #[error("{message}")]
    Rejected { status: u16, message: String },
    /// A success status whose body does not match the expected schema.
    #[error("Invalid verification response: {0}")]
    InvalidResponse(String),
}

impl From<HttpError> for VerifyError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Network(message) => VerifyError::Transport(message),
            HttpError::Url(message) | HttpError::Build(message) => {
                VerifyError::Transport(message)
            }
            HttpError::Decode(message, _) => VerifyError::InvalidResponse(message),
            HttpError::Api { status, detail, .. } => VerifyError::Rejected {
                status: status.as_u16(),
                message: detail.unwrap_or_else(|| VERIFY_FALLBACK_MESSAGE.to_string()),
            },
        }
    }
}
