use crate::error::VerifyError;
use crate::traits::Verifier;
use crate::types::{HealthStatus, RiskAssessmentResult, TransactionSubmission};
use async_trait::async_trait;
use riskdash_http::{HttpClient, HttpError};

pub const DEFAULT_VERIFY_PATH: &str = "/api/v1/transactions/verify";
pub const DEFAULT_HEALTH_PATH: &str = "/api/v1/health";

/// [`Verifier`] backed by the scoring service's JSON API.
#[derive(Clone)]
pub struct HttpVerifier {
    client: HttpClient,
    verify_path: String,
    health_path: String,
}

impl HttpVerifier {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            verify_path: DEFAULT_VERIFY_PATH.to_string(),
            health_path: DEFAULT_HEALTH_PATH.to_string(),
        }
    }

    /// ```
    /// use riskdash_verify::HttpVerifier;
    ///
    /// let verifier = HttpVerifier::from_base_url("http://localhost:8000").unwrap();
    /// assert_eq!(verifier.verify_path(), "/api/v1/transactions/verify");
    /// assert!(HttpVerifier::from_base_url("not a url").is_err());
    /// ```
    pub fn from_base_url(base: &str) -> Result<Self, HttpError> {
        Ok(Self::new(HttpClient::new(base)?))
    }

    pub fn with_paths(mut self, verify_path: impl Into<String>, health_path: impl Into<String>) -> Self {
        self.verify_path = verify_path.into();
        self.health_path = health_path.into();
        self
    }

    pub fn verify_path(&self) -> &str {
        &self.verify_path
    }

    pub fn health_path(&self) -> &str {
        &self.health_path
    }
}

#[async_trait]
impl Verifier for HttpVerifier {
    async fn verify(
        &self,
        submission: &TransactionSubmission,
    ) -> Result<RiskAssessmentResult, VerifyError> {
        let result: RiskAssessmentResult =
            self.client.post_json(&self.verify_path, submission).await?;
        result.validate().map_err(|reason| {
            tracing::warn!(%reason, "verify.response.schema_mismatch");
            VerifyError::InvalidResponse(reason)
        })?;
        Ok(result)
    }

    async fn health(&self) -> Result<HealthStatus, VerifyError> {
        let status: HealthStatus = self.client.get_json(&self.health_path).await?;
        Ok(status)
    }
}
