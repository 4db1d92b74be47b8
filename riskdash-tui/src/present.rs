//! Pure mapping from a [`RiskAssessmentResult`] to what the screen shows.
//!
//! Nothing here touches the terminal, so every rule is unit-testable and the
//! same result always renders the same way.
use chrono::{DateTime, Local, NaiveDateTime};
use riskdash_verify::{HealthStatus, RiskAssessmentResult, RiskLevel, VerifyError};

const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Colour band for a 0-100 score. Each band includes its lower bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Nominal,
    Caution,
    HighAlert,
}

pub fn tier_for(score: f64) -> Tier {
    if score >= 75.0 {
        Tier::HighAlert
    } else if score >= 50.0 {
        Tier::Caution
    } else {
        Tier::Nominal
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskIndicator {
    pub label: &'static str,
    /// Fraction scaled to 0-100, unrounded. Drives the tier and the bar.
    pub score: f64,
    /// `score` rounded for the number shown.
    pub display: i64,
    pub tier: Tier,
}

impl RiskIndicator {
    fn new(label: &'static str, fraction: f64) -> Self {
        let score = fraction * 100.0;
        Self {
            label,
            score,
            display: score.round() as i64,
            tier: tier_for(score),
        }
    }

    /// Bar fill in [0, 1].
    pub fn fill_ratio(&self) -> f64 {
        if self.score.is_finite() {
            (self.score / 100.0).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

pub fn risk_indicators(result: &RiskAssessmentResult) -> [RiskIndicator; 4] {
    [
        RiskIndicator::new("Fraud Probability", result.fraud_probability),
        RiskIndicator::new("Pattern Risk", result.pattern_risk_score),
        RiskIndicator::new("Location Risk", result.location_risk_score),
        RiskIndicator::new("Merchant Risk", result.merchant_risk_score),
    ]
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailValue {
    Text(String),
    Badge { text: String, level: RiskLevel },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailRow {
    pub label: &'static str,
    pub value: DetailValue,
}

impl DetailRow {
    fn text(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: DetailValue::Text(value.into()),
        }
    }
}

pub fn detail_view(result: &RiskAssessmentResult) -> Vec<DetailRow> {
    let mut rows = Vec::with_capacity(11);
    if let Some(id) = result.transaction_id {
        rows.push(DetailRow::text("Transaction ID", id.to_string()));
    }
    rows.push(DetailRow::text("Card ID", result.card_id.as_str()));
    rows.push(DetailRow::text("Amount", format!("${}", to_fixed(result.amount, 2))));
    rows.push(DetailRow::text("Merchant ID", result.merchant_id.as_str()));
    rows.push(DetailRow::text(
        "Location ID",
        result
            .location_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "N/A".to_string()),
    ));
    rows.push(DetailRow::text(
        "Timestamp",
        format_timestamp(&result.timestamp),
    ));
    rows.push(DetailRow {
        label: "Risk Level",
        value: DetailValue::Badge {
            text: result.risk_level.clone(),
            level: result.level(),
        },
    });
    rows.push(DetailRow::text(
        "Fraud Probability",
        percent(result.fraud_probability),
    ));
    if let Some(score) = result.amount_risk_score {
        rows.push(DetailRow::text("Amount Risk", percent(score)));
    }
    if let Some(score) = result.user_behavior_risk_score {
        rows.push(DetailRow::text("Behavior Risk", percent(score)));
    }
    rows.push(DetailRow::text("Status", result.status.as_str()));
    rows
}

fn percent(fraction: f64) -> String {
    format!("{}%", to_fixed(fraction * 100.0, 1))
}

/// Fixed decimals with ties rounded away from zero; `{:.N}` alone rounds
/// ties to even.
fn to_fixed(value: f64, places: usize) -> String {
    let scale = 10f64.powi(places as i32);
    format!("{:.*}", places, (value * scale).round() / scale)
}

/// Human-readable local time. Anything unparseable comes back unchanged.
///
/// Offsets are converted to local time; naive timestamps are taken as
/// already local.
pub fn format_timestamp(raw: &str) -> String {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts
            .with_timezone(&Local)
            .format(DISPLAY_TIME_FORMAT)
            .to_string();
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, pattern) {
            return ts.format(DISPLAY_TIME_FORMAT).to_string();
        }
    }
    raw.to_string()
}

/// Last known scoring-service health, for the status bar.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ServiceHealth {
    #[default]
    Unknown,
    Checking,
    Healthy {
        model_loaded: bool,
    },
    Degraded(String),
    Unreachable(String),
}

impl ServiceHealth {
    pub fn from_probe(probe: Result<HealthStatus, VerifyError>) -> Self {
        match probe {
            Ok(status) if status.is_healthy() => ServiceHealth::Healthy {
                model_loaded: status.model_loaded,
            },
            Ok(status) => ServiceHealth::Degraded(status.status),
            Err(err) => ServiceHealth::Unreachable(err.to_string()),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ServiceHealth::Unknown => "service: unknown".into(),
            ServiceHealth::Checking => "service: checking…".into(),
            ServiceHealth::Healthy { model_loaded: true } => {
                "service: healthy (model loaded)".into()
            }
            ServiceHealth::Healthy { model_loaded: false } => {
                "service: healthy (model not loaded)".into()
            }
            ServiceHealth::Degraded(status) => format!("service: {status}"),
            ServiceHealth::Unreachable(msg) => format!("service: unreachable: {msg}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> RiskAssessmentResult {
        RiskAssessmentResult {
            transaction_id: None,
            card_id: "card_123".into(),
            merchant_id: "merch_456".into(),
            amount: 100.0,
            location_id: None,
            timestamp: "2024-01-01T12:00:00".into(),
            risk_level: "HIGH".into(),
            fraud_probability: 0.82,
            pattern_risk_score: 0.5,
            location_risk_score: 0.1,
            merchant_risk_score: 0.749,
            amount_risk_score: None,
            user_behavior_risk_score: None,
            status: "fraud".into(),
        }
    }

    fn value_of<'a>(rows: &'a [DetailRow], label: &str) -> Option<&'a DetailValue> {
        rows.iter().find(|r| r.label == label).map(|r| &r.value)
    }

    fn text(s: &str) -> DetailValue {
        DetailValue::Text(s.into())
    }

    #[test]
    fn tiers_include_lower_bound() {
        assert_eq!(tier_for(0.0), Tier::Nominal);
        assert_eq!(tier_for(49.99), Tier::Nominal);
        assert_eq!(tier_for(50.0), Tier::Caution);
        assert_eq!(tier_for(74.9), Tier::Caution);
        assert_eq!(tier_for(75.0), Tier::HighAlert);
        assert_eq!(tier_for(100.0), Tier::HighAlert);
    }

    #[test]
    fn indicators_scale_and_round() {
        let [fraud, pattern, location, merchant] = risk_indicators(&result());

        assert_eq!(fraud.label, "Fraud Probability");
        assert_eq!(fraud.display, 82);
        assert_eq!(fraud.tier, Tier::HighAlert);

        assert_eq!(pattern.display, 50);
        assert_eq!(pattern.tier, Tier::Caution);

        assert_eq!(location.tier, Tier::Nominal);
        assert!((location.fill_ratio() - 0.1).abs() < 1e-9);

        // 74.9 shows as 75 but keeps the caution colour.
        assert_eq!(merchant.display, 75);
        assert_eq!(merchant.tier, Tier::Caution);
    }

    #[test]
    fn fill_ratio_is_clamped() {
        let mut r = result();
        r.fraud_probability = 1.3;
        r.pattern_risk_score = -0.2;
        r.location_risk_score = f64::NAN;
        let [fraud, pattern, location, _] = risk_indicators(&r);
        assert_eq!(fraud.fill_ratio(), 1.0);
        assert_eq!(pattern.fill_ratio(), 0.0);
        assert_eq!(location.fill_ratio(), 0.0);
    }

    #[test]
    fn detail_view_formats_fields() {
        let rows = detail_view(&result());
        assert_eq!(value_of(&rows, "Amount"), Some(&text("$100.00")));
        assert_eq!(value_of(&rows, "Fraud Probability"), Some(&text("82.0%")));
        assert_eq!(value_of(&rows, "Location ID"), Some(&text("N/A")));
        assert_eq!(
            value_of(&rows, "Timestamp"),
            Some(&text("2024-01-01 12:00:00"))
        );
        assert_eq!(
            value_of(&rows, "Risk Level"),
            Some(&DetailValue::Badge {
                text: "HIGH".into(),
                level: RiskLevel::High
            })
        );
        assert_eq!(value_of(&rows, "Transaction ID"), None);
        assert_eq!(value_of(&rows, "Amount Risk"), None);
    }

    #[test]
    fn optional_fields_appear_when_present() {
        let mut r = result();
        r.transaction_id = Some(17);
        r.location_id = Some(0);
        r.amount_risk_score = Some(0.3);
        r.user_behavior_risk_score = Some(0.125);
        let rows = detail_view(&r);
        assert_eq!(rows[0].label, "Transaction ID");
        assert_eq!(value_of(&rows, "Location ID"), Some(&text("0")));
        assert_eq!(value_of(&rows, "Amount Risk"), Some(&text("30.0%")));
        assert!(value_of(&rows, "Behavior Risk").is_some());
    }

    #[test]
    fn unknown_level_is_a_neutral_badge() {
        let mut r = result();
        r.risk_level = "critical".into();
        assert_eq!(
            value_of(&detail_view(&r), "Risk Level"),
            Some(&DetailValue::Badge {
                text: "critical".into(),
                level: RiskLevel::Unrecognized
            })
        );
    }

    #[test]
    fn malformed_timestamp_is_shown_raw() {
        assert_eq!(format_timestamp("yesterday-ish"), "yesterday-ish");
        assert_eq!(format_timestamp(""), "");
        assert_eq!(
            format_timestamp("2024-03-05 08:09:10.123"),
            "2024-03-05 08:09:10"
        );

        let utc = "2024-01-01T12:00:00Z";
        let expected = DateTime::parse_from_rfc3339(utc)
            .unwrap()
            .with_timezone(&Local)
            .format(DISPLAY_TIME_FORMAT)
            .to_string();
        assert_eq!(format_timestamp(utc), expected);
    }

    #[test]
    fn ties_round_away_from_zero() {
        let mut r = result();
        r.fraud_probability = 0.1225;
        r.amount = 10.125;
        let rows = detail_view(&r);
        assert_eq!(
            value_of(&rows, "Fraud Probability"),
            Some(&text("12.3%"))
        );
        assert_eq!(value_of(&rows, "Amount"), Some(&text("$10.13")));

        r.fraud_probability = 0.0025;
        assert_eq!(
            value_of(&detail_view(&r), "Fraud Probability"),
            Some(&text("0.3%"))
        );
    }

    #[test]
    fn detail_view_is_deterministic() {
        let r = result();
        assert_eq!(detail_view(&r), detail_view(&r));
    }

    #[test]
    fn health_descriptions() {
        let healthy = ServiceHealth::from_probe(Ok(HealthStatus {
            status: "healthy".into(),
            model_loaded: true,
        }));
        assert_eq!(healthy.describe(), "service: healthy (model loaded)");

        let down = ServiceHealth::from_probe(Err(VerifyError::Transport(
            "connection refused".into(),
        )));
        assert_eq!(down.describe(), "service: unreachable: connection refused");
    }
}
