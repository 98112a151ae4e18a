// LotKeeper - Round health monitoring
//
// A round can wedge in three ways: the daily trigger never fired, the
// oracle never resolved a requested draw, or payout never landed after
// resolution. Recovery for all of them is the same idempotent operation,
// because only an authority-gated ledger instruction may legitimately clear
// is_drawing; the monitor never resets anything itself.
use std::sync::Arc;
use std::time::Duration;

use crate::gateway::{fetch_round_state, LedgerWriter};
use crate::orchestrator::{unix_now, DrawOrchestrator};
use crate::state::RoundState;

/// How long a requested draw may sit unresolved past the round's end before
/// it counts as stuck.
pub const STUCK_DRAWING_GRACE_SECS: u64 = 3600;

/// How long a resolved winner may sit unpaid past the round's end before it
/// counts as overdue (payout normally rolls the round over within seconds).
pub const UNPAID_WINNER_GRACE_SECS: u64 = 300;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

/// Named fault conditions computed from a round's current state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HealthCondition {
    /// Round expired with entries and no draw was ever requested
    ExpiredNoDraw,
    /// Draw requested but randomness unresolved well past the round's end
    StuckDrawing,
    /// Winner resolved but payout has not rolled the round over
    UnpaidWinner,
}

impl HealthCondition {
    pub fn severity(&self) -> Severity {
        match self {
            HealthCondition::ExpiredNoDraw => Severity::High,
            HealthCondition::StuckDrawing => Severity::Critical,
            HealthCondition::UnpaidWinner => Severity::Critical,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            HealthCondition::ExpiredNoDraw => "round expired with entries and no draw requested",
            HealthCondition::StuckDrawing => "draw requested but randomness still unresolved",
            HealthCondition::UnpaidWinner => "winner resolved but payout has not completed",
        }
    }
}

/// Evaluate every fault condition against a round snapshot.
pub fn evaluate(state: &RoundState, now: u64) -> Vec<HealthCondition> {
    let mut found = Vec::new();
    let past_end = now.saturating_sub(state.end_timestamp);

    if state.has_ended(now)
        && state.total_participants > 0
        && state.winner_ticket_index == 0
        && !state.is_drawing
    {
        found.push(HealthCondition::ExpiredNoDraw);
    }

    if state.is_drawing && past_end > STUCK_DRAWING_GRACE_SECS {
        found.push(HealthCondition::StuckDrawing);
    }

    if state.winner_ticket_index != 0
        && state.total_participants > 0
        && past_end > UNPAID_WINNER_GRACE_SECS
    {
        found.push(HealthCondition::UnpaidWinner);
    }

    found
}

/// Periodically inspects round state and retries the draw when it finds the
/// round wedged mid-lifecycle.
pub struct HealthMonitor<G: LedgerWriter> {
    orchestrator: Arc<DrawOrchestrator<G>>,
    gateway: Arc<G>,
    interval: Duration,
}

impl<G: LedgerWriter> HealthMonitor<G> {
    pub fn new(orchestrator: Arc<DrawOrchestrator<G>>, gateway: Arc<G>, interval: Duration) -> Self {
        Self {
            orchestrator,
            gateway,
            interval,
        }
    }

    /// One sweep: evaluate conditions, log them, and recover by retrying
    /// the idempotent draw when anything fired.
    pub async fn check_once(&self) {
        let state = match fetch_round_state(
            self.gateway.as_ref(),
            &self.orchestrator.program_id(),
        )
        .await
        {
            Ok(state) => state,
            Err(err) => {
                eprintln!("health check could not read round state: {}", err);
                return;
            }
        };

        let conditions = evaluate(&state, unix_now());
        if conditions.is_empty() {
            return;
        }

        for condition in &conditions {
            eprintln!(
                "[{}] round {}: {}",
                condition.severity().as_str(),
                state.round_id,
                condition.describe()
            );
        }

        match self.orchestrator.execute_draw().await {
            Ok(outcome) => println!("health recovery attempt finished: {:?}", outcome),
            Err(err) => eprintln!("health recovery attempt failed: {}", err),
        }
    }

    /// Run sweeps forever at the configured interval.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.check_once().await;
        }
    }
}
