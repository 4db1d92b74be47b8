use crate::{
    form::{FormAction, SubmissionForm},
    present::ServiceHealth,
    view::{self, ViewSnap},
};
use anyhow::Result;
use async_trait::async_trait;
use crossterm::{
    cursor::Show,
    event::{Event as CtEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::{Backend, CrosstermBackend},
};
use riskdash_actors::{
    VerifierActor, VerifierMsg,
    actor::{Actor, Addr, Context},
    system::ShutdownHandle,
};
use riskdash_verify::{
    HealthStatus, RiskAssessmentResult, Ticket, VerificationController, VerifyError,
};
use std::{
    io::{self, Stdout},
    time::{Duration, Instant},
};
use tokio::sync::oneshot;

const BRAILLE_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub enum TuiMsg {
    InputEvent(CtEvent),
    Tick,
    /// Same as pressing Enter.
    Submit,
    VerifyDone {
        ticket: Ticket,
        outcome: Result<RiskAssessmentResult, VerifyError>,
    },
    ProbeHealth,
    HealthDone(Result<HealthStatus, VerifyError>),
    OpError(String),
    Shutdown,
}

/// Leave raw mode and the alternate screen. Safe to call more than once.
pub fn restore_terminal() {
    disable_raw_mode().ok();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, Show);
}

/// Owns the screen, the form and the workflow. Every state change happens
/// inside `handle`, one message at a time.
pub struct TuiActor<B: Backend = CrosstermBackend<Stdout>> {
    verifier: Addr<VerifierActor>,

    // terminal
    term: Terminal<B>,
    owns_screen: bool,
    tick_rate: Duration,
    last_tick: Instant,

    // ui state
    form: SubmissionForm,
    controller: VerificationController,
    health: ServiceHealth,
    dirty: bool,
    spin_idx: usize,

    shutdown: ShutdownHandle,
}

impl TuiActor<CrosstermBackend<Stdout>> {
    /// Take over stdout: raw mode plus the alternate screen.
    pub fn new(verifier: Addr<VerifierActor>, shutdown: ShutdownHandle) -> Result<Self> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            restore_terminal();
            return Err(e.into());
        }
        let term = match Terminal::new(CrosstermBackend::new(stdout)) {
            Ok(mut term) => {
                term.clear()?;
                term
            }
            Err(e) => {
                restore_terminal();
                return Err(e.into());
            }
        };

        let mut actor = Self::with_terminal(term, verifier, shutdown);
        actor.owns_screen = true;
        Ok(actor)
    }
}

impl<B: Backend + Send + 'static> TuiActor<B> {
    /// Drive an existing terminal. The caller keeps responsibility for its modes.
    pub fn with_terminal(
        term: Terminal<B>,
        verifier: Addr<VerifierActor>,
        shutdown: ShutdownHandle,
    ) -> Self {
        Self {
            verifier,
            term,
            owns_screen: false,
            tick_rate: Duration::from_millis(80),
            last_tick: Instant::now(),
            form: SubmissionForm::new(),
            controller: VerificationController::new(),
            health: ServiceHealth::Unknown,
            dirty: true,
            spin_idx: 0,
            shutdown,
        }
    }

    pub fn with_tick_rate(mut self, tick_rate: Duration) -> Self {
        self.tick_rate = tick_rate;
        self
    }

    fn busy(&self) -> bool {
        self.controller.state().is_submitting() || self.health == ServiceHealth::Checking
    }

    fn spinner(&self) -> &'static str {
        if self.busy() {
            BRAILLE_FRAMES[self.spin_idx % BRAILLE_FRAMES.len()]
        } else {
            " "
        }
    }

    fn step_spinner(&mut self) {
        if self.busy() {
            self.spin_idx = (self.spin_idx + 1) % BRAILLE_FRAMES.len();
            self.dirty = true;
        }
    }

    fn draw(&mut self) -> Result<()> {
        let spinner = self.spinner();
        let snap = ViewSnap {
            form: &self.form,
            state: self.controller.state(),
            health: &self.health,
            spinner,
        };
        view::draw(&mut self.term, &snap)
    }

    /// Keys act immediately; nothing is re-queued onto our own mailbox,
    /// which the input thread may be holding full.
    fn handle_key(&mut self, key: KeyEvent, ctx: &mut Context<Self>) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
        {
            self.quit(ctx);
            return;
        }
        if key.code == KeyCode::F(5) {
            self.probe_health(ctx.addr());
            return;
        }
        match self.form.handle_key(key) {
            FormAction::Submit => self.submit(ctx.addr()),
            FormAction::Changed => self.dirty = true,
            FormAction::Ignored => {}
        }
    }

    fn quit(&mut self, ctx: &mut Context<Self>) {
        self.release_screen();
        self.shutdown.signal();
        ctx.stop();
    }

    fn submit(&mut self, me: Addr<TuiActor<B>>) {
        // The button is disabled while a call is in flight.
        if self.controller.state().is_submitting() {
            tracing::debug!("tui.submit.ignored_in_flight");
            return;
        }

        let payload = match self.form.to_submission() {
            Ok(payload) => payload,
            Err(err) => {
                tracing::debug!(error = %err, "tui.submit.invalid_form");
                self.form.reject(&err);
                self.dirty = true;
                return;
            }
        };

        let pending = match self.controller.begin(payload) {
            Ok(pending) => pending,
            Err(_) => return,
        };
        self.dirty = true;

        let verifier = self.verifier.clone();
        let ticket = pending.ticket;
        let payload = pending.payload;
        tokio::spawn(async move {
            let (tx, rx) = oneshot::channel();
            let outcome = if verifier
                .send(VerifierMsg::Verify { payload, reply: tx })
                .await
                .is_err()
            {
                Err(VerifyError::Transport("verifier is not running".into()))
            } else {
                rx.await.unwrap_or_else(|_| {
                    Err(VerifyError::Transport(
                        "verification ended without a response".into(),
                    ))
                })
            };
            let _ = me.send(TuiMsg::VerifyDone { ticket, outcome }).await;
        });
    }

    fn probe_health(&mut self, me: Addr<TuiActor<B>>) {
        if self.health == ServiceHealth::Checking {
            return;
        }
        self.health = ServiceHealth::Checking;
        self.dirty = true;

        let verifier = self.verifier.clone();
        tokio::spawn(async move {
            let (tx, rx) = oneshot::channel();
            let probe = if verifier.send(VerifierMsg::Health { reply: tx }).await.is_err() {
                Err(VerifyError::Transport("verifier is not running".into()))
            } else {
                rx.await.unwrap_or_else(|_| {
                    Err(VerifyError::Transport("health probe was dropped".into()))
                })
            };
            let _ = me.send(TuiMsg::HealthDone(probe)).await;
        });
    }

    fn release_screen(&mut self) {
        if self.owns_screen {
            restore_terminal();
            self.owns_screen = false;
        }
    }
}

impl<B: Backend> Drop for TuiActor<B> {
    fn drop(&mut self) {
        if self.owns_screen {
            restore_terminal();
        }
    }
}

#[async_trait]
impl<B: Backend + Send + 'static> Actor for TuiActor<B> {
    type Msg = TuiMsg;

    async fn handle(&mut self, msg: Self::Msg, ctx: &mut Context<Self>) -> Result<()> {
        match msg {
            TuiMsg::InputEvent(CtEvent::Key(key)) => self.handle_key(key, ctx),
            TuiMsg::InputEvent(CtEvent::Resize(_, _)) => self.dirty = true,
            TuiMsg::InputEvent(_) => {}
            TuiMsg::Submit => self.submit(ctx.addr()),
            TuiMsg::VerifyDone { ticket, outcome } => {
                if self.controller.settle(ticket, outcome) {
                    self.dirty = true;
                }
            }
            TuiMsg::ProbeHealth => self.probe_health(ctx.addr()),
            TuiMsg::HealthDone(probe) => {
                match &probe {
                    Ok(status) => tracing::info!(
                        status = %status.status,
                        model_loaded = status.model_loaded,
                        "service.health"
                    ),
                    Err(err) => tracing::warn!(error = %err, "service.health.unreachable"),
                }
                self.health = ServiceHealth::from_probe(probe);
                self.dirty = true;
            }
            TuiMsg::OpError(e) => {
                tracing::warn!(error = %e, "tui.op_error");
            }
            TuiMsg::Tick => {
                self.step_spinner();
                if self.dirty || self.last_tick.elapsed() >= self.tick_rate {
                    self.draw()?;
                    self.last_tick = Instant::now();
                    self.dirty = false;
                }
            }
            TuiMsg::Shutdown => self.quit(ctx),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use riskdash_actors::actor::{ActorHandle, spawn_actor};
    use riskdash_actors::system::ActorSystem;
    use riskdash_verify::{TransactionSubmission, Verifier};
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    };
    use tokio::sync::Semaphore;

    /// Holds every call until the test hands out a permit.
    struct Gated {
        calls: AtomicUsize,
        seen: Mutex<Vec<TransactionSubmission>>,
        gate: Semaphore,
    }

    impl Gated {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
                gate: Semaphore::new(0),
            })
        }
    }

    #[async_trait]
    impl Verifier for Gated {
        async fn verify(
            &self,
            submission: &TransactionSubmission,
        ) -> Result<RiskAssessmentResult, VerifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(submission.clone());
            self.gate.acquire().await.unwrap().forget();
            Err(VerifyError::Rejected {
                status: 404,
                message: "card not found".into(),
            })
        }

        async fn health(&self) -> Result<HealthStatus, VerifyError> {
            Ok(HealthStatus {
                status: "healthy".into(),
                model_loaded: true,
            })
        }
    }

    fn key(code: KeyCode) -> TuiMsg {
        TuiMsg::InputEvent(CtEvent::Key(KeyEvent::new(code, KeyModifiers::NONE)))
    }

    async fn type_str(tui: &Addr<TuiActor<TestBackend>>, s: &str) {
        for ch in s.chars() {
            assert!(tui.send(key(KeyCode::Char(ch))).await.is_ok());
        }
    }

    async fn wait_for_calls(verifier: &Gated, n: usize) {
        for _ in 0..200 {
            if verifier.calls.load(Ordering::SeqCst) >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {n} verify calls");
    }

    fn start(verifier: Arc<Gated>, sys: &ActorSystem) -> ActorHandle<TuiActor<TestBackend>> {
        start_with_mailbox(verifier, sys, 64)
    }

    fn start_with_mailbox(
        verifier: Arc<Gated>,
        sys: &ActorSystem,
        mailbox: usize,
    ) -> ActorHandle<TuiActor<TestBackend>> {
        let verifier_addr = spawn_actor(VerifierActor::new(verifier), 8).addr;
        let term = Terminal::new(TestBackend::new(120, 40)).unwrap();
        spawn_actor(
            TuiActor::with_terminal(term, verifier_addr, sys.shutdown_handle()),
            mailbox,
        )
    }

    async fn fill_required(tui: &Addr<TuiActor<TestBackend>>) {
        type_str(tui, "card_1").await;
        assert!(tui.send(key(KeyCode::Tab)).await.is_ok());
        type_str(tui, "merch_1").await;
        assert!(tui.send(key(KeyCode::Tab)).await.is_ok());
        type_str(tui, "12.5").await;
    }

    #[tokio::test]
    async fn enter_while_verifying_issues_no_second_request() {
        let sys = ActorSystem::new();
        let verifier = Gated::new();
        let tui = start(verifier.clone(), &sys);

        fill_required(&tui.addr).await;
        assert!(tui.addr.send(key(KeyCode::Enter)).await.is_ok());
        assert!(tui.addr.send(key(KeyCode::Enter)).await.is_ok());
        assert!(tui.addr.send(TuiMsg::Submit).await.is_ok());

        wait_for_calls(&verifier, 1).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 1);
        {
            let seen = verifier.seen.lock().unwrap();
            assert_eq!(seen[0].card_id(), "card_1");
            assert_eq!(seen[0].merchant_id(), "merch_1");
            assert_eq!(seen[0].amount(), 12.5);
            assert_eq!(seen[0].location_id(), None);
        }

        // Once the first call settles, the form can be resubmitted.
        verifier.gate.add_permits(1);
        for _ in 0..200 {
            assert!(tui.addr.send(TuiMsg::Submit).await.is_ok());
            if verifier.calls.load(Ordering::SeqCst) >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 2);

        verifier.gate.add_permits(1);
        assert!(tui.addr.send(TuiMsg::Shutdown).await.is_ok());
        tui.task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn enter_on_a_full_mailbox_still_submits() {
        let sys = ActorSystem::new();
        let verifier = Gated::new();
        let tui = start_with_mailbox(verifier.clone(), &sys, 2);

        fill_required(&tui.addr).await;
        assert!(tui.addr.send(key(KeyCode::Enter)).await.is_ok());
        assert!(tui.addr.send(key(KeyCode::Right)).await.is_ok());
        assert!(tui.addr.send(key(KeyCode::Right)).await.is_ok());

        wait_for_calls(&verifier, 1).await;
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 1);

        verifier.gate.add_permits(1);
        let quit = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(tui.addr.send(TuiMsg::InputEvent(CtEvent::Key(quit))).await.is_ok());
        tui.task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn incomplete_form_sends_nothing() {
        let sys = ActorSystem::new();
        let verifier = Gated::new();
        let tui = start(verifier.clone(), &sys);

        type_str(&tui.addr, "card_1").await;
        assert!(tui.addr.send(key(KeyCode::Enter)).await.is_ok());
        assert!(tui.addr.send(TuiMsg::Tick).await.is_ok());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);

        assert!(tui.addr.send(TuiMsg::Shutdown).await.is_ok());
        tui.task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn ctrl_q_signals_shutdown() {
        let sys = ActorSystem::new();
        let mut notified = sys.shutdown_notifier();
        let tui = start(Gated::new(), &sys);

        let quit = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL);
        assert!(tui.addr.send(TuiMsg::InputEvent(CtEvent::Key(quit))).await.is_ok());
        tui.task.await.unwrap().unwrap();
        assert!(notified.recv().await.is_ok());
    }
}
