// LotKeeper - Draw orchestration
//
// Drives one round through Open -> Ended -> Drawing -> Resolved -> PaidOut.
// "Request draw" and "resolve randomness" are two separate operations
// connected only by the oracle, so every step re-fetches round state from
// the ledger instead of trusting anything cached locally; the ledger's own
// is_drawing flag is the authoritative serializer, and this process only
// adds a best-effort local guard on top of it.
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use solana_program::pubkey::Pubkey;
use solana_sdk::signature::Signature;

use crate::error::KeeperError;
use crate::gateway::{fetch_round_state, fetch_ticket, LedgerWriter};
use crate::instruction;
use crate::pda::{find_pot_vault_address, find_ticket_address};
use crate::retry::{poll_until, PollBudget};
use crate::state::{split_pot, RoundState};

/// Where a round currently sits in its lifecycle, as observed from its
/// on-ledger record at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundPhase {
    /// Still open for entries
    Waiting,
    /// Ended with participants and no draw requested yet
    Eligible,
    /// Draw requested, randomness not resolved
    Drawing,
    /// Winner index resolved, payout outstanding
    Resolved,
    /// Ended with zero participants; rolls over without a draw
    Empty,
}

pub fn classify(state: &RoundState, now: u64) -> RoundPhase {
    if state.winner_ticket_index != 0 {
        return RoundPhase::Resolved;
    }
    if now < state.end_timestamp {
        return RoundPhase::Waiting;
    }
    if state.total_participants == 0 {
        return RoundPhase::Empty;
    }
    if state.is_drawing {
        RoundPhase::Drawing
    } else {
        RoundPhase::Eligible
    }
}

/// What a single `execute_draw` invocation did.
#[derive(Debug)]
pub enum DrawOutcome {
    /// Another draw is in flight in this process
    AlreadyRunning,
    /// The round has not ended yet
    NotDue { ends_in_secs: u64 },
    /// The round ended with no entries; nothing to draw
    EmptyRound { round_id: u64 },
    /// Poll budget exhausted before the oracle resolved; state untouched
    TimedOut { round_id: u64 },
    /// Winner paid and round rolled over
    PaidOut {
        round_id: u64,
        winner: Pubkey,
        prize_lamports: u64,
        signature: Signature,
    },
}

enum KeeperPhase {
    Idle,
    Drawing,
}

// Restores Idle on every exit path, including errors.
struct InFlight<'a>(&'a Mutex<KeeperPhase>);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Ok(mut phase) = self.0.lock() {
            *phase = KeeperPhase::Idle;
        }
    }
}

/// Owns the round lifecycle for a single keeper process. One instance per
/// process; the in-flight guard does not serialize across processes.
pub struct DrawOrchestrator<G: LedgerWriter> {
    gateway: Arc<G>,
    program_id: Pubkey,
    oracle_queue: Pubkey,
    poll: PollBudget,
    phase: Mutex<KeeperPhase>,
}

impl<G: LedgerWriter> DrawOrchestrator<G> {
    pub fn new(gateway: Arc<G>, program_id: Pubkey, oracle_queue: Pubkey, poll: PollBudget) -> Self {
        Self {
            gateway,
            program_id,
            oracle_queue,
            poll,
            phase: Mutex::new(KeeperPhase::Idle),
        }
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    /// Run one draw attempt to whatever completion the ledger allows.
    ///
    /// Safe to invoke from the daily schedule, the health monitor, and the
    /// HTTP triggers at once: the first caller proceeds, the rest observe
    /// `AlreadyRunning`. Resumes idempotently if a previous invocation (or
    /// an external trigger) already requested the draw.
    pub async fn execute_draw(&self) -> Result<DrawOutcome, KeeperError> {
        let _in_flight = match self.try_begin() {
            Some(guard) => guard,
            None => return Ok(DrawOutcome::AlreadyRunning),
        };

        let state = fetch_round_state(self.gateway.as_ref(), &self.program_id).await?;
        let now = unix_now();

        match classify(&state, now) {
            RoundPhase::Waiting => Ok(DrawOutcome::NotDue {
                ends_in_secs: state.end_timestamp - now,
            }),
            RoundPhase::Empty => {
                println!(
                    "round {} ended with no entries, skipping draw",
                    state.round_id
                );
                Ok(DrawOutcome::EmptyRound {
                    round_id: state.round_id,
                })
            }
            RoundPhase::Resolved => self.finish_payout(&state).await,
            RoundPhase::Eligible => {
                let ix = instruction::request_draw(
                    &self.program_id,
                    &self.gateway.authority(),
                    &self.oracle_queue,
                );
                let signature = self.gateway.submit(ix).await?;
                println!(
                    "draw requested for round {} ({} entries): {}",
                    state.round_id, state.total_participants, signature
                );
                self.await_resolution(state.round_id).await
            }
            RoundPhase::Drawing => {
                println!(
                    "draw already requested for round {}, resuming poll",
                    state.round_id
                );
                self.await_resolution(state.round_id).await
            }
        }
    }

    /// Roll an expired, empty round over. No-op unless the round is
    /// actually empty; the program rejects resets of rounds with entries.
    pub async fn execute_reset(&self) -> Result<Option<Signature>, KeeperError> {
        let state = fetch_round_state(self.gateway.as_ref(), &self.program_id).await?;
        if classify(&state, unix_now()) != RoundPhase::Empty {
            return Ok(None);
        }
        let ix = instruction::reset(&self.program_id, &self.gateway.authority());
        let signature = self.gateway.submit(ix).await?;
        println!("empty round {} rolled over: {}", state.round_id, signature);
        Ok(Some(signature))
    }

    /// Entry point for the daily schedule: draw, and roll the round over
    /// when it turns out to be empty.
    pub async fn run_scheduled(&self) {
        match self.execute_draw().await {
            Ok(DrawOutcome::EmptyRound { round_id }) => {
                if let Err(err) = self.execute_reset().await {
                    eprintln!("reset of empty round {} failed: {}", round_id, err);
                }
            }
            Ok(outcome) => println!("scheduled draw finished: {:?}", outcome),
            Err(err) => eprintln!("scheduled draw failed: {}", err),
        }
    }

    fn try_begin(&self) -> Option<InFlight<'_>> {
        let mut phase = self.phase.lock().ok()?;
        match *phase {
            KeeperPhase::Drawing => None,
            KeeperPhase::Idle => {
                *phase = KeeperPhase::Drawing;
                Some(InFlight(&self.phase))
            }
        }
    }

    // Poll until the oracle writes a winner index. On budget exhaustion the
    // round is left exactly as it is for the next scheduled or health-check
    // attempt; a round is never force-failed.
    async fn await_resolution(&self, round_id: u64) -> Result<DrawOutcome, KeeperError> {
        let resolved = poll_until(self.poll, || async {
            let state = fetch_round_state(self.gateway.as_ref(), &self.program_id).await?;
            if state.winner_ticket_index != 0 {
                Ok(Some(state))
            } else {
                Ok(None)
            }
        })
        .await;

        match resolved {
            Ok(state) => self.finish_payout(&state).await,
            Err(KeeperError::PollTimeout { attempts }) => {
                eprintln!(
                    "randomness for round {} unresolved after {} attempts, leaving for retry",
                    round_id, attempts
                );
                Ok(DrawOutcome::TimedOut { round_id })
            }
            Err(err) => Err(err),
        }
    }

    // Recover the winner from the winning ticket and submit payout. The
    // payout instruction is also what rolls the round over on the ledger.
    async fn finish_payout(&self, state: &RoundState) -> Result<DrawOutcome, KeeperError> {
        let Some(index) = state.winning_ticket_index() else {
            return Err(KeeperError::InstructionRejected(
                "payout attempted before a winner was resolved".to_string(),
            ));
        };

        let (ticket_address, _) = find_ticket_address(&self.program_id, state.round_id, index);
        let ticket = fetch_ticket(self.gateway.as_ref(), &ticket_address)
            .await?
            .ok_or(KeeperError::AccountMissing(ticket_address))?;

        let (pot_vault, _) = find_pot_vault_address(&self.program_id);
        let pot_balance = self.gateway.fetch_balance(&pot_vault).await?;
        let (fee, prize) = split_pot(pot_balance, state.platform_fee_bps);

        let ix = instruction::payout(
            &self.program_id,
            &self.gateway.authority(),
            &state.platform_wallet,
            state.round_id,
            index,
            &ticket.owner,
        );
        let signature = self.gateway.submit(ix).await?;
        println!(
            "round {} paid out: winner {} receives {} lamports (platform fee {}): {}",
            state.round_id, ticket.owner, prize, fee, signature
        );

        Ok(DrawOutcome::PaidOut {
            round_id: state.round_id,
            winner: ticket.owner,
            prize_lamports: prize,
            signature,
        })
    }
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs()
}
