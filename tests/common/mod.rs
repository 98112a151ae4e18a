// Shared test fixtures: an in-memory ledger that mimics the lottery
// program's state transitions, so keeper flows can be driven end to end
// without a validator.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use solana_program::{instruction::Instruction, pubkey::Pubkey};
use solana_sdk::signature::Signature;

use lotkeeper::error::KeeperError;
use lotkeeper::gateway::{LedgerReader, LedgerWriter};
use lotkeeper::instruction::method_discriminator;
use lotkeeper::pda::{
    find_entry_receipt_address, find_pot_vault_address, find_round_state_address,
    find_ticket_address,
};
use lotkeeper::resolver::{DrawTrigger, ProfileLookup};
use lotkeeper::state::{split_pot, EntryReceipt, RoundState, Ticket};

pub struct MockLedger {
    pub program_id: Pubkey,
    pub authority: Pubkey,
    accounts: Mutex<HashMap<Pubkey, Vec<u8>>>,
    balances: Mutex<HashMap<Pubkey, u64>>,
    submitted: Mutex<Vec<&'static str>>,
    fetch_log: Mutex<Vec<Pubkey>>,
    // (remaining round-state fetches, winner index) armed by a test; when
    // the counter hits zero while the round is drawing, the "oracle"
    // resolves by writing winner_ticket_index = index + 1.
    resolve_script: Mutex<Option<(u32, u64)>>,
    submit_delay: Mutex<Option<Duration>>,
}

impl MockLedger {
    pub fn new(program_id: Pubkey, authority: Pubkey) -> Self {
        Self {
            program_id,
            authority,
            accounts: Mutex::new(HashMap::new()),
            balances: Mutex::new(HashMap::new()),
            submitted: Mutex::new(Vec::new()),
            fetch_log: Mutex::new(Vec::new()),
            resolve_script: Mutex::new(None),
            submit_delay: Mutex::new(None),
        }
    }

    pub fn seed_round(&self, state: &RoundState) {
        let (address, _) = find_round_state_address(&self.program_id);
        self.accounts.lock().unwrap().insert(address, state.encode());
    }

    pub fn round_state(&self) -> RoundState {
        let (address, _) = find_round_state_address(&self.program_id);
        let accounts = self.accounts.lock().unwrap();
        RoundState::decode(accounts.get(&address).expect("round state seeded")).unwrap()
    }

    pub fn seed_ticket(&self, round_id: u64, index: u64, ticket: &Ticket) {
        let (address, _) = find_ticket_address(&self.program_id, round_id, index);
        self.accounts.lock().unwrap().insert(address, ticket.encode());
    }

    pub fn seed_receipt(&self, receipt: &EntryReceipt) {
        let (address, _) = find_entry_receipt_address(
            &self.program_id,
            &receipt.participant,
            receipt.round_id,
        );
        self.accounts.lock().unwrap().insert(address, receipt.encode());
    }

    pub fn set_pot_balance(&self, lamports: u64) {
        let (pot_vault, _) = find_pot_vault_address(&self.program_id);
        self.balances.lock().unwrap().insert(pot_vault, lamports);
    }

    /// Arm the scripted oracle: after `fetches` more round-state reads while
    /// the round is drawing, resolve to `winner_index`.
    pub fn resolve_randomness_after(&self, fetches: u32, winner_index: u64) {
        *self.resolve_script.lock().unwrap() = Some((fetches, winner_index));
    }

    pub fn set_submit_delay(&self, delay: Duration) {
        *self.submit_delay.lock().unwrap() = Some(delay);
    }

    pub fn submitted_methods(&self) -> Vec<&'static str> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn fetched(&self, address: &Pubkey) -> bool {
        self.fetch_log.lock().unwrap().contains(address)
    }

    /// Write a resolved winner index directly, as the oracle would.
    pub fn force_winner(&self, winner_index: u64) {
        let mut state = self.round_state();
        state.winner_ticket_index = winner_index + 1;
        state.is_drawing = false;
        self.seed_round(&state);
    }

    /// Apply the program's payout transition: flag the winning ticket with
    /// its prize, drain the pot, and roll the round over.
    pub fn apply_payout(&self) -> Result<(), KeeperError> {
        let mut state = self.round_state();
        let index = match state.winning_ticket_index() {
            Some(index) => index,
            None => {
                return Err(KeeperError::InstructionRejected(
                    "DrawNotRequested".to_string(),
                ))
            }
        };

        let (pot_vault, _) = find_pot_vault_address(&self.program_id);
        let pot = self
            .balances
            .lock()
            .unwrap()
            .get(&pot_vault)
            .copied()
            .unwrap_or(0);
        let (_fee, prize) = split_pot(pot, state.platform_fee_bps);

        let (ticket_address, _) = find_ticket_address(&self.program_id, state.round_id, index);
        {
            let mut accounts = self.accounts.lock().unwrap();
            let data = accounts
                .get(&ticket_address)
                .ok_or(KeeperError::InstructionRejected("InvalidWinner".to_string()))?;
            let mut ticket = Ticket::decode(data).unwrap();
            ticket.is_winner = true;
            ticket.prize_amount = prize;
            accounts.insert(ticket_address, ticket.encode());
        }
        self.balances.lock().unwrap().insert(pot_vault, 0);

        state.total_participants = 0;
        state.winner_ticket_index = 0;
        state.round_id += 1;
        state.end_timestamp += 86_400;
        state.is_drawing = false;
        state.commit_slot = 0;
        self.seed_round(&state);
        Ok(())
    }

    fn apply_request_draw(&self) -> Result<(), KeeperError> {
        let mut state = self.round_state();
        if state.is_drawing {
            return Err(KeeperError::InstructionRejected(
                "DrawAlreadyRequested".to_string(),
            ));
        }
        state.is_drawing = true;
        state.commit_slot = 1000;
        self.seed_round(&state);
        Ok(())
    }

    fn apply_reset(&self) -> Result<(), KeeperError> {
        let mut state = self.round_state();
        if state.total_participants > 0 {
            return Err(KeeperError::InstructionRejected(
                "CannotRolloverWithPlayers".to_string(),
            ));
        }
        state.round_id += 1;
        state.end_timestamp += 86_400;
        state.winner_ticket_index = 0;
        state.is_drawing = false;
        self.seed_round(&state);
        Ok(())
    }

    fn method_name(data: &[u8]) -> &'static str {
        const METHODS: [&str; 5] = [
            "enter_round",
            "request_draw",
            "payout",
            "reset",
            "update_config",
        ];
        for name in METHODS {
            if data.len() >= 8 && data[..8] == method_discriminator(name) {
                return name;
            }
        }
        "unknown"
    }

    fn maybe_resolve(&self) {
        let mut script = self.resolve_script.lock().unwrap();
        let Some((remaining, winner_index)) = *script else {
            return;
        };
        if !self.round_state().is_drawing {
            return;
        }
        if remaining > 1 {
            *script = Some((remaining - 1, winner_index));
            return;
        }
        *script = None;
        drop(script);
        self.force_winner(winner_index);
    }
}

#[async_trait]
impl LedgerReader for MockLedger {
    async fn fetch_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, KeeperError> {
        self.fetch_log.lock().unwrap().push(*address);
        let (round_state_address, _) = find_round_state_address(&self.program_id);
        if *address == round_state_address {
            self.maybe_resolve();
        }
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }

    async fn fetch_balance(&self, address: &Pubkey) -> Result<u64, KeeperError> {
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(address)
            .copied()
            .unwrap_or(0))
    }
}

#[async_trait]
impl LedgerWriter for MockLedger {
    fn authority(&self) -> Pubkey {
        self.authority
    }

    async fn submit(&self, instruction: Instruction) -> Result<Signature, KeeperError> {
        let delay = *self.submit_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let method = Self::method_name(&instruction.data);
        self.submitted.lock().unwrap().push(method);

        match method {
            "request_draw" => self.apply_request_draw()?,
            "payout" => self.apply_payout()?,
            "reset" => self.apply_reset()?,
            _ => {}
        }
        Ok(Signature::new_unique())
    }
}

/// A round state with sensible defaults for tests.
pub fn base_round_state(
    program_id: &Pubkey,
    authority: Pubkey,
    round_id: u64,
    end_timestamp: u64,
    total_participants: u64,
) -> RoundState {
    let (pot_vault, pot_vault_bump) = find_pot_vault_address(program_id);
    let (_, round_state_bump) = find_round_state_address(program_id);
    RoundState {
        authority,
        pot_vault,
        platform_wallet: Pubkey::new_unique(),
        platform_fee_bps: 1000,
        ticket_price: 25_000_000,
        winner_ticket_index: 0,
        round_id,
        total_participants,
        is_drawing: false,
        end_timestamp,
        commit_slot: 0,
        round_state_bump,
        pot_vault_bump,
    }
}

pub fn make_ticket(owner: Pubkey, round_id: u64) -> Ticket {
    Ticket {
        owner,
        round_id,
        is_winner: false,
        prize_amount: 0,
        bump: 255,
    }
}

/// Trigger that resolves randomness and completes payout, as a healthy
/// keeper process would.
pub struct RolloverTrigger {
    pub ledger: std::sync::Arc<MockLedger>,
    pub winner_index: u64,
}

#[async_trait]
impl DrawTrigger for RolloverTrigger {
    async fn trigger_draw(&self) -> Result<(), KeeperError> {
        self.ledger.force_winner(self.winner_index);
        self.ledger.apply_payout()
    }
}

/// Trigger that acknowledges and never completes anything.
pub struct NoopTrigger;

#[async_trait]
impl DrawTrigger for NoopTrigger {
    async fn trigger_draw(&self) -> Result<(), KeeperError> {
        Ok(())
    }
}

/// Profile lookup backed by a fixed map.
pub struct MapProfiles(pub HashMap<Pubkey, String>);

#[async_trait]
impl ProfileLookup for MapProfiles {
    async fn display_handle(&self, address: &Pubkey) -> Option<String> {
        self.0.get(address).cloned()
    }
}
