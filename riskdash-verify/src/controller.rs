//! The verify-and-display workflow.
//!
//! ```text
//!   Idle ──begin──▶ Submitting ──settle(Ok)──▶ SettledSuccess ─┐
//!                       ▲      └─settle(Err)─▶ SettledError  ──┤
//!                       └──────────────begin───────────────────┘
//! ```
//!
//! There is no terminal state. At most one call is in flight: `begin` refuses
//! while `Submitting`, so results always land in submission order.
use crate::error::{VerifyError, VERIFY_FALLBACK_MESSAGE};
use crate::traits::Verifier;
use crate::types::{RiskAssessmentResult, TransactionSubmission};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Submitting,
    SettledSuccess,
    SettledError,
}

/// The dashboard's single workflow state. Only the controller mutates it;
/// the presentation layer reads it by reference.
#[derive(Debug, Clone, Default)]
pub struct WorkflowState {
    phase: Phase,
    error_message: String,
    result: Option<RiskAssessmentResult>,
}

impl WorkflowState {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_submitting(&self) -> bool {
        self.phase == Phase::Submitting
    }

    /// Empty when there is no error to show.
    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    /// The latest successful result. A failed call leaves it in place.
    pub fn result(&self) -> Option<&RiskAssessmentResult> {
        self.result.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("a verification is already in flight")]
    AlreadySubmitting,
}

/// Identifies one in-flight call; [`VerificationController::settle`] only
/// accepts the ticket issued by the matching `begin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

impl Ticket {
    pub fn seq(self) -> u64 {
        self.0
    }
}

/// A started call: the payload to send and the ticket to settle it with.
#[derive(Debug)]
pub struct PendingVerification {
    pub ticket: Ticket,
    pub payload: TransactionSubmission,
}

#[derive(Debug, Default)]
pub struct VerificationController {
    state: WorkflowState,
    next_seq: u64,
    in_flight: Option<Ticket>,
}

impl VerificationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Enter `Submitting` and clear the previous error.
    ///
    /// The previous result stays visible until the new call settles.
    pub fn begin(
        &mut self,
        payload: TransactionSubmission,
    ) -> Result<PendingVerification, WorkflowError> {
        if let Some(ticket) = self.in_flight {
            tracing::warn!(in_flight = ticket.seq(), "verify.rejected_in_flight");
            return Err(WorkflowError::AlreadySubmitting);
        }

        self.next_seq += 1;
        let ticket = Ticket(self.next_seq);
        self.in_flight = Some(ticket);
        self.state.phase = Phase::Submitting;
        self.state.error_message.clear();

        tracing::info!(
            seq = ticket.seq(),
            card = %payload.masked_card_id(),
            merchant_id = %payload.merchant_id(),
            amount = payload.amount(),
            has_location = payload.location_id().is_some(),
            "verify.submit"
        );
        Ok(PendingVerification { ticket, payload })
    }

    /// Apply the outcome of the call identified by `ticket`.
    ///
    /// Returns `false` (and changes nothing) when `ticket` is not the call in
    /// flight.
    pub fn settle(
        &mut self,
        ticket: Ticket,
        outcome: Result<RiskAssessmentResult, VerifyError>,
    ) -> bool {
        if self.in_flight != Some(ticket) {
            tracing::warn!(
                seq = ticket.seq(),
                in_flight = ?self.in_flight.map(Ticket::seq),
                "verify.stale_settlement"
            );
            return false;
        }
        self.in_flight = None;

        match outcome {
            Ok(result) => {
                tracing::info!(
                    seq = ticket.seq(),
                    risk_level = %result.risk_level,
                    fraud_probability = result.fraud_probability,
                    status = %result.status,
                    "verify.settled.success"
                );
                self.state.result = Some(result);
                self.state.phase = Phase::SettledSuccess;
            }
            Err(err) => {
                let mut message = err.to_string();
                if message.is_empty() {
                    message = VERIFY_FALLBACK_MESSAGE.to_string();
                }
                tracing::warn!(seq = ticket.seq(), error = ?err, "verify.settled.error");
                self.state.error_message = message;
                self.state.phase = Phase::SettledError;
            }
        }
        true
    }

    /// `begin`, one call to `verifier`, then `settle`.
    ///
    /// Dropping the returned future mid-call settles the ticket as a
    /// cancelled transport failure, so the controller never stays stuck in
    /// `Submitting`.
    pub async fn submit<V>(
        &mut self,
        verifier: &V,
        payload: TransactionSubmission,
    ) -> Result<&WorkflowState, WorkflowError>
    where
        V: Verifier + ?Sized,
    {
        let pending = self.begin(payload)?;
        let mut guard = SettleOnDrop {
            controller: &mut *self,
            ticket: Some(pending.ticket),
        };
        let outcome = verifier.verify(&pending.payload).await;
        if let Some(ticket) = guard.ticket.take() {
            guard.controller.settle(ticket, outcome);
        }
        drop(guard);
        Ok(&self.state)
    }
}

struct SettleOnDrop<'a> {
    controller: &'a mut VerificationController,
    ticket: Option<Ticket>,
}

impl Drop for SettleOnDrop<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            self.controller.settle(
                ticket,
                Err(VerifyError::Transport(CANCELLED_MESSAGE.into())),
            );
        }
    }
}

const CANCELLED_MESSAGE: &str = "verification was cancelled";
