use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a [`TransactionSubmission`] could not be built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmissionError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("amount must be a finite number, got {0}")]
    InvalidAmount(String),
}

/// Outbound payload for `POST /api/v1/transactions/verify`.
///
/// Optional fields are omitted from the JSON when absent, never sent as
/// `null` or an empty string.
///
/// ```
/// use riskdash_verify::TransactionSubmission;
///
/// let payload = TransactionSubmission::new("card_123", "merch_456", 100.0)
///     .unwrap()
///     .with_location_id(Some(42))
///     .with_device_id("   ");
/// let json = serde_json::to_value(&payload).unwrap();
/// assert_eq!(json["location_id"], 42);
/// assert!(json.get("device_id").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionSubmission {
    card_id: String,
    merchant_id: String,
    amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    location_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ip_address: Option<String>,
}

impl TransactionSubmission {
    pub fn new(
        card_id: impl Into<String>,
        merchant_id: impl Into<String>,
        amount: f64,
    ) -> Result<Self, SubmissionError> {
        let card_id = card_id.into();
        let merchant_id = merchant_id.into();
        if card_id.is_empty() {
            return Err(SubmissionError::Missing("card_id"));
        }
        if merchant_id.is_empty() {
            return Err(SubmissionError::Missing("merchant_id"));
        }
        if !amount.is_finite() {
            return Err(SubmissionError::InvalidAmount(amount.to_string()));
        }
        Ok(Self {
            card_id,
            merchant_id,
            amount,
            location_id: None,
            device_id: None,
            ip_address: None,
        })
    }

    pub fn with_location_id(mut self, location_id: Option<i64>) -> Self {
        self.location_id = location_id;
        self
    }

    /// Blank values are treated as absent.
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = non_blank(device_id.into());
        self
    }

    /// Blank values are treated as absent.
    pub fn with_ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = non_blank(ip_address.into());
        self
    }

    pub fn card_id(&self) -> &str {
        &self.card_id
    }

    pub fn merchant_id(&self) -> &str {
        &self.merchant_id
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn location_id(&self) -> Option<i64> {
        self.location_id
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    /// Card id reduced to its last four characters, for logs.
    pub fn masked_card_id(&self) -> String {
        riskdash_http::mask_card_id(&self.card_id)
    }
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Display category for the overall risk badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    High,
    Medium,
    Low,
    /// Anything outside the three known levels. Rendered neutrally.
    Unrecognized,
}

impl RiskLevel {
    /// Case-insensitive match against `high` / `medium` / `low`.
    ///
    /// ```
    /// use riskdash_verify::RiskLevel;
    ///
    /// assert_eq!(RiskLevel::parse("HIGH"), RiskLevel::High);
    /// assert_eq!(RiskLevel::parse("Medium"), RiskLevel::Medium);
    /// assert_eq!(RiskLevel::parse("critical"), RiskLevel::Unrecognized);
    /// ```
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "high" => RiskLevel::High,
            "medium" => RiskLevel::Medium,
            "low" => RiskLevel::Low,
            _ => RiskLevel::Unrecognized,
        }
    }
}

/// Resolved record returned by the scoring service. Read-only to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessmentResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<i64>,
    pub card_id: String,
    pub merchant_id: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<i64>,
    pub timestamp: String,
    pub risk_level: String,
    pub fraud_probability: f64,
    pub pattern_risk_score: f64,
    pub location_risk_score: f64,
    pub merchant_risk_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_risk_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_behavior_risk_score: Option<f64>,
    pub status: String,
}

impl RiskAssessmentResult {
    pub fn level(&self) -> RiskLevel {
        RiskLevel::parse(&self.risk_level)
    }

    /// Check the fields serde cannot: every score lies in [0, 1] and the
    /// amount is finite. An unknown `risk_level` is not a schema error.
    pub fn validate(&self) -> Result<(), String> {
        if !self.amount.is_finite() {
            return Err(format!("amount is not finite: {}", self.amount));
        }
        let scores = [
            ("fraud_probability", Some(self.fraud_probability)),
            ("pattern_risk_score", Some(self.pattern_risk_score)),
            ("location_risk_score", Some(self.location_risk_score)),
            ("merchant_risk_score", Some(self.merchant_risk_score)),
            ("amount_risk_score", self.amount_risk_score),
            ("user_behavior_risk_score", self.user_behavior_risk_score),
        ];
        for (name, value) in scores {
            if let Some(v) = value {
                if !(0.0..=1.0).contains(&v) {
                    return Err(format!("{name} must lie in [0, 1], got {v}"));
                }
            }
        }
        Ok(())
    }
}

/// Body of `GET /api/v1/health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub model_loaded: bool,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}
