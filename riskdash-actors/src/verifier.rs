use crate::actor::{Actor, Context};
use anyhow::Result;
use riskdash_verify::{
    HealthStatus, RiskAssessmentResult, TransactionSubmission, Verifier, VerifyError,
};
use std::sync::Arc;
use tokio::sync::oneshot;

pub enum VerifierMsg {
    Verify {
        payload: TransactionSubmission,
        reply: oneshot::Sender<Result<RiskAssessmentResult, VerifyError>>,
    },
    Health {
        reply: oneshot::Sender<Result<HealthStatus, VerifyError>>,
    },
}

/// Owns the outbound [`Verifier`]. Each call runs on its own task so a slow
/// service never blocks the mailbox or shutdown.
pub struct VerifierActor {
    verifier: Arc<dyn Verifier>,
}

impl VerifierActor {
    pub fn new(verifier: Arc<dyn Verifier>) -> Self {
        Self { verifier }
    }
}

#[async_trait::async_trait]
impl Actor for VerifierActor {
    type Msg = VerifierMsg;

    async fn handle(&mut self, msg: Self::Msg, _ctx: &mut Context<Self>) -> Result<()> {
        match msg {
            VerifierMsg::Verify { payload, reply } => {
                let verifier = self.verifier.clone();
                tokio::spawn(async move {
                    let outcome = verifier.verify(&payload).await;
                    if reply.send(outcome).is_err() {
                        tracing::debug!("verify reply dropped; requester went away");
                    }
                });
            }
            VerifierMsg::Health { reply } => {
                let verifier = self.verifier.clone();
                tokio::spawn(async move {
                    let _ = reply.send(verifier.health().await);
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::spawn_actor;
    use async_trait::async_trait;

    struct Canned;

    #[async_trait]
    impl Verifier for Canned {
        async fn verify(
            &self,
            submission: &TransactionSubmission,
        ) -> Result<RiskAssessmentResult, VerifyError> {
            if submission.merchant_id() == "blocked" {
                return Err(VerifyError::Rejected {
                    status: 403,
                    message: "merchant blocked".into(),
                });
            }
            Ok(RiskAssessmentResult {
                transaction_id: Some(9),
                card_id: submission.card_id().to_string(),
                merchant_id: submission.merchant_id().to_string(),
                amount: submission.amount(),
                location_id: submission.location_id(),
                timestamp: "2024-01-01T12:00:00".into(),
                risk_level: "low".into(),
                fraud_probability: 0.05,
                pattern_risk_score: 0.1,
                location_risk_score: 0.1,
                merchant_risk_score: 0.1,
                amount_risk_score: None,
                user_behavior_risk_score: None,
                status: "legit".into(),
            })
        }

        async fn health(&self) -> Result<HealthStatus, VerifyError> {
            Err(VerifyError::Transport("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn replies_with_verifier_outcome() {
        let handle = spawn_actor(VerifierActor::new(Arc::new(Canned)), 4);

        let (tx, rx) = oneshot::channel();
        let payload = TransactionSubmission::new("card_1", "merch_1", 20.0)
            .unwrap()
            .with_location_id(Some(3));
        assert!(handle
            .addr
            .send(VerifierMsg::Verify { payload, reply: tx })
            .await
            .is_ok());
        let result = rx.await.unwrap().unwrap();
        assert_eq!(result.location_id, Some(3));

        let (tx, rx) = oneshot::channel();
        let payload = TransactionSubmission::new("card_1", "blocked", 20.0).unwrap();
        assert!(handle
            .addr
            .send(VerifierMsg::Verify { payload, reply: tx })
            .await
            .is_ok());
        assert_eq!(rx.await.unwrap().unwrap_err().to_string(), "merchant blocked");
    }

    #[tokio::test]
    async fn health_errors_are_forwarded() {
        let handle = spawn_actor(VerifierActor::new(Arc::new(Canned)), 4);
        let (tx, rx) = oneshot::channel();
        assert!(handle.addr.send(VerifierMsg::Health { reply: tx }).await.is_ok());
        assert!(matches!(
            rx.await.unwrap(),
            Err(VerifyError::Transport(_))
        ));
    }
}
