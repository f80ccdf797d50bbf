//! Debounced input pipeline
//!
//! Turns a burst of keystroke-driven password values into a throttled stream
//! of evaluations, and keeps only the most recently requested result live.

use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::calculator::PasswordStrengthCalculator;
use crate::config::SessionConfig;
use crate::evaluator::StrengthEvaluator;
use crate::result::PasswordStrengthResult;
use crate::strength::PasswordStrength;
use crate::view::{self, StrengthView};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Strength session has shut down")]
pub struct SessionClosed;

/// Identifies one triggered evaluation, in trigger order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Issues tickets and decides whether a completed evaluation may be applied.
///
/// Only the latest issued ticket is accepted, whatever order evaluations
/// finish in.
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: u64,
}

impl RequestTracker {
    pub fn issue(&mut self) -> Ticket {
        self.latest += 1;
        Ticket(self.latest)
    }

    pub fn is_latest(&self, ticket: Ticket) -> bool {
        ticket.0 == self.latest
    }
}

/// Everything the screen is rendered from.
#[derive(Debug)]
pub struct SessionState {
    pub password: SecretString,
    pub show_password: bool,
    pub calculator: PasswordStrengthCalculator,
    pub result: PasswordStrengthResult,
}

impl SessionState {
    fn new(calculator: PasswordStrengthCalculator) -> Self {
        Self {
            password: SecretString::new("".into()),
            show_password: false,
            calculator,
            result: PasswordStrengthResult::initial(),
        }
    }

    pub fn view(&self) -> StrengthView {
        view::render(&self.password, self.show_password, &self.result, self.calculator)
    }
}

enum SessionEvent {
    PasswordChanged(SecretString),
    CalculatorSelected(PasswordStrengthCalculator),
    ToggleVisibility,
}

/// Handle to a running strength session.
///
/// Dropping the handle stops the session; [`StrengthSession::shutdown`] also
/// waits until backend contexts are released.
pub struct StrengthSession {
    events: mpsc::UnboundedSender<SessionEvent>,
    state: watch::Receiver<SessionState>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl StrengthSession {
    /// Starts the session loop on the current tokio runtime.
    pub fn spawn(evaluator: Arc<StrengthEvaluator>, config: SessionConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SessionState::new(evaluator.selected()));
        let shutdown = CancellationToken::new();
        let session_loop = SessionLoop::new(evaluator, config, events_rx, state_tx, shutdown.clone());

        Self {
            events: events_tx,
            state: state_rx,
            shutdown,
            task: Some(tokio::spawn(session_loop.run())),
        }
    }

    pub fn set_password(&self, password: impl Into<String>) -> Result<(), SessionClosed> {
        let password: String = password.into();
        let password = SecretString::new(password.into_boxed_str());
        self.send(SessionEvent::PasswordChanged(password))
    }

    /// Switches backend and re-evaluates the current password right away.
    pub fn select_calculator(&self, calculator: PasswordStrengthCalculator) -> Result<(), SessionClosed> {
        self.send(SessionEvent::CalculatorSelected(calculator))
    }

    pub fn toggle_password_visibility(&self) -> Result<(), SessionClosed> {
        self.send(SessionEvent::ToggleVisibility)
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    pub fn result(&self) -> PasswordStrengthResult {
        self.state.borrow().result
    }

    pub fn view(&self) -> StrengthView {
        self.state.borrow().view()
    }

    /// Stops the loop, cancels in-flight work and releases backend contexts.
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                #[cfg(feature = "tracing")]
                tracing::error!("strength session task failed: {}", e);
            }
        }
    }

    fn send(&self, event: SessionEvent) -> Result<(), SessionClosed> {
        self.events.send(event).map_err(|_| SessionClosed)
    }
}

impl Drop for StrengthSession {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

struct SessionLoop {
    evaluator: Arc<StrengthEvaluator>,
    config: SessionConfig,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    state: watch::Sender<SessionState>,
    shutdown: CancellationToken,
    tracker: RequestTracker,
    in_flight: Option<CancellationToken>,
    completed_tx: mpsc::UnboundedSender<(Ticket, PasswordStrengthResult)>,
    completed_rx: mpsc::UnboundedReceiver<(Ticket, PasswordStrengthResult)>,
}

impl SessionLoop {
    fn new(
        evaluator: Arc<StrengthEvaluator>,
        config: SessionConfig,
        events: mpsc::UnboundedReceiver<SessionEvent>,
        state: watch::Sender<SessionState>,
        shutdown: CancellationToken,
    ) -> Self {
        let (completed_tx, completed_rx) = mpsc::unbounded_channel();
        Self {
            evaluator,
            config,
            events,
            state,
            shutdown,
            tracker: RequestTracker::default(),
            in_flight: None,
            completed_tx,
            completed_rx,
        }
    }

    async fn run(mut self) {
        let mut deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                Some((ticket, result)) = self.completed_rx.recv() => self.apply(ticket, result),
                event = self.events.recv() => match event {
                    Some(SessionEvent::PasswordChanged(password)) => {
                        if self.replace_password(password) {
                            deadline = Some(Instant::now() + self.config.debounce);
                        }
                    }
                    Some(SessionEvent::CalculatorSelected(calculator)) => {
                        // The immediate evaluation covers any pending debounce
                        deadline = None;
                        self.evaluator.select(calculator);
                        self.state.send_modify(|s| s.calculator = calculator);
                        self.trigger(calculator);
                    }
                    Some(SessionEvent::ToggleVisibility) => {
                        self.state.send_modify(|s| s.show_password = !s.show_password);
                    }
                    None => break,
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    deadline = None;
                    self.trigger(self.evaluator.selected());
                }
            }
        }

        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
        self.evaluator.shutdown().await;

        #[cfg(feature = "tracing")]
        tracing::info!("strength session stopped");
    }

    /// Stores a new input value. Returns `false` when it equals the current one.
    fn replace_password(&mut self, password: SecretString) -> bool {
        self.state.send_if_modified(|s| {
            if s.password.expose_secret() == password.expose_secret() {
                return false;
            }
            s.password = password;
            true
        })
    }

    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn trigger(&mut self, calculator: PasswordStrengthCalculator) {
        if let Some(previous) = self.in_flight.take() {
            previous.cancel();
        }

        let ticket = self.tracker.issue();
        let token = self.shutdown.child_token();
        self.in_flight = Some(token.clone());

        let password = SecretString::new(self.state.borrow().password.expose_secret().into());
        let evaluator = Arc::clone(&self.evaluator);
        let completed = self.completed_tx.clone();

        #[cfg(feature = "tracing")]
        tracing::debug!("evaluation {:?} triggered with {} backend", ticket, calculator);

        tokio::spawn(async move {
            let started = Instant::now();
            // A panicking backend takes down only its own task
            let worker = tokio::spawn(async move {
                evaluator
                    .evaluate_cancellable(&password, calculator, token)
                    .await
            });

            let result = match worker.await {
                Ok(Some(result)) => result,
                Ok(None) => return,
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!("evaluation {:?} panicked: {}", ticket, e);
                    PasswordStrengthResult::new(PasswordStrength::FALLBACK, started.elapsed())
                }
            };

            let _ = completed.send((ticket, result));
        });
    }

    fn apply(&mut self, ticket: Ticket, result: PasswordStrengthResult) {
        if !self.tracker.is_latest(ticket) {
            #[cfg(feature = "tracing")]
            tracing::debug!("discarding stale evaluation {:?}", ticket);
            return;
        }
        self.in_flight = None;
        self.state.send_modify(|s| s.result = result);
    }
}
