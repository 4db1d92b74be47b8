//! Transaction verification against the risk-scoring service.
//!
//! This crate holds the wire types ([`TransactionSubmission`],
//! [`RiskAssessmentResult`]), the [`Verifier`] seam with its HTTP
//! implementation, and the [`VerificationController`] that owns the
//! dashboard's [`WorkflowState`].
//!
//! # Examples
//! ```no_run
//! use riskdash_verify::{HttpVerifier, TransactionSubmission, VerificationController};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let verifier = HttpVerifier::from_base_url("http://localhost:8000")?;
//! let mut controller = VerificationController::new();
//!
//! let payload = TransactionSubmission::new("card_123", "merch_456", 100.0)?;
//! let state = controller.submit(&verifier, payload).await?;
//! if let Some(result) = state.result() {
//!     println!("risk level: {}", result.risk_level);
//! } else {
//!     println!("error: {}", state.error_message());
//! }
//! # Ok(())
//! # }
//! ```
pub mod controller;
pub mod error;
pub mod http;
pub mod traits;
pub mod types;

pub use controller::{
    PendingVerification, Phase, Ticket, VerificationController, WorkflowError, WorkflowState,
};
pub use error::{VerifyError, VERIFY_FALLBACK_MESSAGE};
pub use http::HttpVerifier;
pub use traits::Verifier;
pub use types::{
    HealthStatus, RiskAssessmentResult, RiskLevel, SubmissionError, TransactionSubmission,
};
