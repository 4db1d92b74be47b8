use crate::error::VerifyError;
use crate::types::{HealthStatus, RiskAssessmentResult, TransactionSubmission};
use async_trait::async_trait;

/// The scoring service as seen by the dashboard.
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Issue exactly one verification request for `submission`.
    ///
    /// Implementations must not retry and must return a schema-checked result.
    async fn verify(
        &self,
        submission: &TransactionSubmission,
    ) -> Result<RiskAssessmentResult, VerifyError>;

    /// Probe service liveness.
    async fn health(&self) -> Result<HealthStatus, VerifyError>;
}
