//! Discovery and report cycle driver

use std::collections::BTreeSet;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use versionops_api::{AgentEvent, DiscoveryMethod, ReportOutcome};
use versionops_client::{Reporter, cancellable_sleep};
use versionops_discovery::DiscoveryEngine;

use crate::agent_state::AgentState;
use crate::error::CoreError;
use crate::state::SchedulerState;
use crate::store::StateStore;

const EVENT_CAPACITY: usize = 64;

/// Runs discovery and report cycles, once or on an interval.
///
/// The scheduler is the only writer of [`AgentState`]. Each cycle's report
/// resolves before the next discovery starts, so at most one report is in
/// flight.
pub struct Scheduler {
    engine: DiscoveryEngine,
    reporter: Reporter,
    store: StateStore,
    state: AgentState,
    phase: SchedulerState,
    enabled: BTreeSet<DiscoveryMethod>,
    interval: Duration,
    cancel: CancellationToken,
    event_tx: broadcast::Sender<AgentEvent>,
}

impl Scheduler {
    /// Create a scheduler, restoring state from `store`
    pub fn new(
        engine: DiscoveryEngine,
        reporter: Reporter,
        store: StateStore,
        enabled: BTreeSet<DiscoveryMethod>,
        interval: Duration,
    ) -> Self {
        let state = store.load();
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);

        info!(
            cycles = state.cycle_count,
            last_outcome = %state.last_report_outcome,
            "scheduler initialised"
        );

        Self {
            engine,
            reporter,
            store,
            state,
            phase: SchedulerState::Idle,
            enabled,
            interval,
            cancel: CancellationToken::new(),
            event_tx,
        }
    }

    /// Token that stops the scheduler when cancelled
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Subscribe to lifecycle events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.event_tx.subscribe()
    }

    #[must_use]
    pub fn phase(&self) -> SchedulerState {
        self.phase
    }

    #[must_use]
    pub fn state(&self) -> &AgentState {
        &self.state
    }

    /// Remember the identifier the backend assigned to this host
    pub fn record_registration(&mut self, host_id: String) {
        if self.state.backend_host_id.as_deref() == Some(host_id.as_str()) {
            return;
        }
        self.state.backend_host_id = Some(host_id);
        if let Err(e) = self.store.save(&self.state) {
            error!(error = %e, "failed to persist agent state");
        }
    }

    /// Transition to a new phase with validation and event emission
    fn transition_to(&mut self, new_phase: SchedulerState) -> Result<(), CoreError> {
        if !self.phase.can_transition_to(new_phase) {
            return Err(CoreError::InvalidTransition {
                from: self.phase,
                to: new_phase,
            });
        }

        let old_phase = self.phase;
        self.phase = new_phase;

        info!(from = %old_phase, to = %new_phase, "state transition");

        // No subscribers is fine
        let _ = self.event_tx.send(AgentEvent::PhaseChanged {
            from: old_phase.to_string(),
            to: new_phase.to_string(),
        });

        Ok(())
    }

    fn shut_down(&mut self, reason: &str) {
        if self.phase.is_terminal() {
            return;
        }
        if let Err(e) = self.transition_to(SchedulerState::ShuttingDown) {
            warn!(error = %e, "unexpected shutdown transition");
        }
        info!(reason, "scheduler stopped");
        let _ = self.event_tx.send(AgentEvent::ShuttingDown {
            reason: reason.to_string(),
        });
    }

    /// One discovery and report cycle, from `Idle` to `Reporting`.
    ///
    /// Returns `None` if shutdown interrupted discovery; the partial snapshot
    /// is not reported since the backend treats every snapshot as complete.
    #[instrument(skip(self), fields(cycle = self.state.cycle_count + 1))]
    async fn run_cycle(&mut self) -> Result<Option<ReportOutcome>, CoreError> {
        self.transition_to(SchedulerState::Discovering)?;
        let discovery = self.engine.run_cycle(&self.enabled, &self.cancel).await;

        for (plugin, error) in discovery.errors() {
            warn!(%plugin, %error, "plugin error this cycle");
        }

        if self.cancel.is_cancelled() {
            warn!("discovery interrupted by shutdown, not reporting partial inventory");
            return Ok(None);
        }

        self.transition_to(SchedulerState::Reporting)?;
        let records = discovery.snapshot.len();
        let plugin_failures = discovery.failure_count();
        let attempt = self.reporter.send(&discovery.snapshot, &self.cancel).await;

        self.state.complete_cycle(discovery.snapshot, &attempt);
        if let Err(e) = self.store.save(&self.state) {
            error!(error = %e, "failed to persist agent state");
        }

        match &attempt.error {
            None => info!(
                records,
                requests = attempt.requests,
                "cycle complete, inventory delivered"
            ),
            Some(e) => warn!(
                records,
                requests = attempt.requests,
                error = %e,
                "cycle complete, delivery failed"
            ),
        }

        let _ = self.event_tx.send(AgentEvent::CycleCompleted {
            cycle: self.state.cycle_count,
            records,
            plugin_failures,
            outcome: attempt.outcome,
        });

        Ok(Some(attempt.outcome))
    }

    /// Run a single cycle and stop.
    ///
    /// Returns the report outcome; a cycle interrupted before reporting counts
    /// as failed.
    ///
    /// # Errors
    /// Returns `CoreError::InvalidTransition` if the scheduler already ran
    pub async fn run_once(&mut self) -> Result<ReportOutcome, CoreError> {
        let outcome = self.run_cycle().await?;
        self.shut_down("single run complete");
        Ok(outcome.unwrap_or(ReportOutcome::Failed))
    }

    /// Run cycles every `interval` until cancelled.
    ///
    /// A cycle in progress when cancellation arrives finishes its report
    /// request; backoff and interval waits end immediately.
    ///
    /// # Errors
    /// Returns `CoreError::InvalidTransition` if the scheduler already ran
    pub async fn run_daemon(&mut self) -> Result<(), CoreError> {
        info!(interval = ?self.interval, "starting periodic discovery");

        while !self.cancel.is_cancelled() {
            if self.run_cycle().await?.is_none() {
                break;
            }
            self.transition_to(SchedulerState::Sleeping)?;

            if !cancellable_sleep(self.interval, &self.cancel).await {
                break;
            }
            self.transition_to(SchedulerState::Idle)?;
        }

        self.shut_down("cancelled");
        Ok(())
    }
}
