// LotKeeper - Participant-side result resolution
//
// Answers "what happened to my ticket" for a wallet without the wallet ever
// naming a round: the current round's receipt means the round is still
// theirs, the previous round's receipt means they are owed a result, and no
// receipt in either means they have not entered.
use std::sync::Arc;

use async_trait::async_trait;
use solana_program::pubkey::Pubkey;

use crate::error::KeeperError;
use crate::gateway::{
    fetch_entry_receipt, fetch_round_state, fetch_ticket, LedgerReader, LedgerWriter,
};
use crate::orchestrator::{unix_now, DrawOrchestrator};
use crate::pda::{find_entry_receipt_address, find_ticket_address};
use crate::retry::{poll_until, PollBudget};
use crate::state::{lamports_to_sol, EntryReceipt};

/// Hard cap on the winner scan. Tickets are created densely from index 0,
/// so the scan also stops at the first index with no account.
pub const WINNER_SCAN_CAP: u64 = 256;

/// Optional display-name lookup. Absence of a profile (or of the whole
/// service) never blocks resolution.
#[async_trait]
pub trait ProfileLookup: Send + Sync {
    async fn display_handle(&self, address: &Pubkey) -> Option<String>;
}

/// No profile service configured.
pub struct NoProfiles;

#[async_trait]
impl ProfileLookup for NoProfiles {
    async fn display_handle(&self, _address: &Pubkey) -> Option<String> {
        None
    }
}

/// Something that can kick off a draw on the participant's behalf.
#[async_trait]
pub trait DrawTrigger: Send + Sync {
    async fn trigger_draw(&self) -> Result<(), KeeperError>;
}

#[async_trait]
impl<G: LedgerWriter> DrawTrigger for DrawOrchestrator<G> {
    async fn trigger_draw(&self) -> Result<(), KeeperError> {
        // Outcome is reported through round state; AlreadyRunning and
        // NotDue are both fine from the participant's point of view.
        self.execute_draw().await.map(|_| ())
    }
}

/// The winner of a completed round, surfaced for display.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundWinner {
    pub address: Pubkey,
    pub display_handle: Option<String>,
    pub ticket_index: u64,
    pub prize_lamports: u64,
    pub prize_sol: f64,
}

/// What the participant should be shown.
#[derive(Debug, Clone, PartialEq)]
pub enum LotteryView {
    /// Entered the current round, which is still open
    Countdown {
        round_id: u64,
        ticket_number: u64,
        end_timestamp: u64,
        total_participants: u64,
    },
    /// Entered the current round, which has closed and is drawing
    Drawing { round_id: u64, ticket_number: u64 },
    /// Won the previous round
    Won {
        round_id: u64,
        prize_lamports: u64,
        prize_sol: f64,
    },
    /// Lost the previous round; the actual winner is surfaced
    Lost {
        round_id: u64,
        winner: Option<RoundWinner>,
    },
    /// No receipt in the current or previous round
    NotEntered {
        round_id: u64,
        last_winner: Option<RoundWinner>,
    },
}

/// Read-only resolver running on the participant side.
pub struct ResultResolver<G: LedgerReader, P: ProfileLookup> {
    gateway: Arc<G>,
    program_id: Pubkey,
    profiles: P,
}

impl<G: LedgerReader, P: ProfileLookup> ResultResolver<G, P> {
    pub fn new(gateway: Arc<G>, program_id: Pubkey, profiles: P) -> Self {
        Self {
            gateway,
            program_id,
            profiles,
        }
    }

    /// Resolve the view for a participant from on-ledger history alone.
    pub async fn resolve(&self, participant: &Pubkey) -> Result<LotteryView, KeeperError> {
        let state = fetch_round_state(self.gateway.as_ref(), &self.program_id).await?;
        let current = state.round_id;

        // Current-round receipt: the round is still theirs.
        if let Some(receipt) = self.receipt_for(participant, current).await? {
            return Ok(if state.has_ended(unix_now()) {
                LotteryView::Drawing {
                    round_id: current,
                    ticket_number: receipt.ticket_number,
                }
            } else {
                LotteryView::Countdown {
                    round_id: current,
                    ticket_number: receipt.ticket_number,
                    end_timestamp: state.end_timestamp,
                    total_participants: state.total_participants,
                }
            });
        }

        // Previous-round receipt: they are owed a result, not a draw.
        if let Some(previous) = current.checked_sub(1) {
            if let Some(receipt) = self.receipt_for(participant, previous).await? {
                let (ticket_address, _) =
                    find_ticket_address(&self.program_id, previous, receipt.ticket_number);
                let ticket = fetch_ticket(self.gateway.as_ref(), &ticket_address)
                    .await?
                    .ok_or(KeeperError::AccountMissing(ticket_address))?;

                if ticket.is_winner {
                    return Ok(LotteryView::Won {
                        round_id: previous,
                        prize_lamports: ticket.prize_amount,
                        prize_sol: lamports_to_sol(ticket.prize_amount),
                    });
                }

                let winner = self.find_round_winner(previous).await?;
                return Ok(LotteryView::Lost {
                    round_id: previous,
                    winner,
                });
            }
        }

        // Not entered; surface the last round's winner for display.
        let last_winner = match current.checked_sub(1) {
            Some(previous) => self.find_round_winner(previous).await?,
            None => None,
        };
        Ok(LotteryView::NotEntered {
            round_id: current,
            last_winner,
        })
    }

    /// Manual "check my result": kick the draw path and wait for the round
    /// to roll over, then resolve. Times out with `PollTimeout` when the
    /// rollover does not land within the budget.
    pub async fn check_result(
        &self,
        participant: &Pubkey,
        trigger: &dyn DrawTrigger,
        budget: PollBudget,
    ) -> Result<LotteryView, KeeperError> {
        let before = fetch_round_state(self.gateway.as_ref(), &self.program_id)
            .await?
            .round_id;

        trigger.trigger_draw().await?;

        poll_until(budget, || async {
            let state = fetch_round_state(self.gateway.as_ref(), &self.program_id).await?;
            if state.round_id > before {
                Ok(Some(()))
            } else {
                Ok(None)
            }
        })
        .await?;

        self.resolve(participant).await
    }

    /// Bounded scan for a completed round's winning ticket: walk indices
    /// from 0, stop at the first winner, a missing ticket, or the cap.
    pub async fn find_round_winner(
        &self,
        round_id: u64,
    ) -> Result<Option<RoundWinner>, KeeperError> {
        for index in 0..WINNER_SCAN_CAP {
            let (ticket_address, _) = find_ticket_address(&self.program_id, round_id, index);
            let Some(ticket) = fetch_ticket(self.gateway.as_ref(), &ticket_address).await? else {
                return Ok(None);
            };
            if ticket.is_winner {
                let display_handle = self.profiles.display_handle(&ticket.owner).await;
                return Ok(Some(RoundWinner {
                    address: ticket.owner,
                    display_handle,
                    ticket_index: index,
                    prize_lamports: ticket.prize_amount,
                    prize_sol: lamports_to_sol(ticket.prize_amount),
                }));
            }
        }
        Ok(None)
    }

    async fn receipt_for(
        &self,
        participant: &Pubkey,
        round_id: u64,
    ) -> Result<Option<EntryReceipt>, KeeperError> {
        let (address, _) = find_entry_receipt_address(&self.program_id, participant, round_id);
        fetch_entry_receipt(self.gateway.as_ref(), &address).await
    }
}
