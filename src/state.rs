// LotKeeper - Account state layouts
//
// Raw account data as stored by the lottery program: an 8-byte leading tag
// (skipped, never interpreted) followed by fixed-width little-endian fields
// at fixed offsets. Decoding is strict: a short buffer fails with
// `DecodeError::Truncated` and never yields a partial record.
use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use solana_program::pubkey::Pubkey;

use crate::error::DecodeError;

/// Length of the leading account tag written by the program.
pub const ACCOUNT_TAG_LEN: usize = 8;

/// The singleton per-deployment round record, mutated in place by the
/// program and logically rolled over at payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundState {
    /// Keeper authority allowed to sign draw/payout instructions
    pub authority: Pubkey,
    /// Vault PDA holding the round's pot
    pub pot_vault: Pubkey,
    /// Wallet receiving the platform fee at payout
    pub platform_wallet: Pubkey,
    /// Fee in basis points (1000 = 10%)
    pub platform_fee_bps: u16,
    /// Price per entry in lamports
    pub ticket_price: u64,
    /// 0 while undrawn; otherwise the winning ticket index plus one
    pub winner_ticket_index: u64,
    /// Identifies the current round while open, the completed round right
    /// after payout
    pub round_id: u64,
    /// Entries in the current round; doubles as the next ticket number
    pub total_participants: u64,
    /// True strictly between draw request and randomness resolution
    pub is_drawing: bool,
    /// Unix seconds at which the round closes for new entries
    pub end_timestamp: u64,
    /// Ledger slot at which randomness was requested
    pub commit_slot: u64,
    /// Bump seed of this record's own address
    pub round_state_bump: u8,
    /// Bump seed of the pot vault address
    pub pot_vault_bump: u8,
}

impl RoundState {
    pub const BODY_LEN: usize = 32 + 32 + 32 + 2 + 8 + 8 + 8 + 8 + 1 + 8 + 8 + 1 + 1;
    pub const ACCOUNT_LEN: usize = ACCOUNT_TAG_LEN + Self::BODY_LEN;

    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < Self::ACCOUNT_LEN {
            return Err(DecodeError::Truncated {
                expected: Self::ACCOUNT_LEN,
                actual: data.len(),
            });
        }
        let src = array_ref![data, ACCOUNT_TAG_LEN, RoundState::BODY_LEN];
        let (
            authority,
            pot_vault,
            platform_wallet,
            platform_fee_bps,
            ticket_price,
            winner_ticket_index,
            round_id,
            total_participants,
            is_drawing,
            end_timestamp,
            commit_slot,
            round_state_bump,
            pot_vault_bump,
        ) = array_refs![src, 32, 32, 32, 2, 8, 8, 8, 8, 1, 8, 8, 1, 1];

        Ok(RoundState {
            authority: Pubkey::new_from_array(*authority),
            pot_vault: Pubkey::new_from_array(*pot_vault),
            platform_wallet: Pubkey::new_from_array(*platform_wallet),
            platform_fee_bps: u16::from_le_bytes(*platform_fee_bps),
            ticket_price: u64::from_le_bytes(*ticket_price),
            winner_ticket_index: u64::from_le_bytes(*winner_ticket_index),
            round_id: u64::from_le_bytes(*round_id),
            total_participants: u64::from_le_bytes(*total_participants),
            is_drawing: decode_bool(is_drawing[0], "round_state.is_drawing"),
            end_timestamp: u64::from_le_bytes(*end_timestamp),
            commit_slot: u64::from_le_bytes(*commit_slot),
            round_state_bump: round_state_bump[0],
            pot_vault_bump: pot_vault_bump[0],
        })
    }

    pub fn encode_into(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, ACCOUNT_TAG_LEN, RoundState::BODY_LEN];
        let (
            authority_dst,
            pot_vault_dst,
            platform_wallet_dst,
            platform_fee_bps_dst,
            ticket_price_dst,
            winner_ticket_index_dst,
            round_id_dst,
            total_participants_dst,
            is_drawing_dst,
            end_timestamp_dst,
            commit_slot_dst,
            round_state_bump_dst,
            pot_vault_bump_dst,
        ) = mut_array_refs![dst, 32, 32, 32, 2, 8, 8, 8, 8, 1, 8, 8, 1, 1];

        authority_dst.copy_from_slice(self.authority.as_ref());
        pot_vault_dst.copy_from_slice(self.pot_vault.as_ref());
        platform_wallet_dst.copy_from_slice(self.platform_wallet.as_ref());
        *platform_fee_bps_dst = self.platform_fee_bps.to_le_bytes();
        *ticket_price_dst = self.ticket_price.to_le_bytes();
        *winner_ticket_index_dst = self.winner_ticket_index.to_le_bytes();
        *round_id_dst = self.round_id.to_le_bytes();
        *total_participants_dst = self.total_participants.to_le_bytes();
        is_drawing_dst[0] = self.is_drawing as u8;
        *end_timestamp_dst = self.end_timestamp.to_le_bytes();
        *commit_slot_dst = self.commit_slot.to_le_bytes();
        round_state_bump_dst[0] = self.round_state_bump;
        pot_vault_bump_dst[0] = self.pot_vault_bump;
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![0u8; Self::ACCOUNT_LEN];
        self.encode_into(&mut out);
        out
    }

    /// The winning ticket index once drawn. `winner_ticket_index` stores the
    /// actual index plus one so that zero can mean "undrawn".
    pub fn winning_ticket_index(&self) -> Option<u64> {
        self.winner_ticket_index.checked_sub(1)
    }

    pub fn has_ended(&self, now: u64) -> bool {
        now >= self.end_timestamp
    }
}

/// Proof that a wallet entered a specific round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryReceipt {
    pub participant: Pubkey,
    pub round_id: u64,
    /// 0-indexed; assigned as `total_participants` at entry time
    pub ticket_number: u64,
    pub bump: u8,
}

impl EntryReceipt {
    pub const BODY_LEN: usize = 32 + 8 + 8 + 1;
    pub const ACCOUNT_LEN: usize = ACCOUNT_TAG_LEN + Self::BODY_LEN;

    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < Self::ACCOUNT_LEN {
            return Err(DecodeError::Truncated {
                expected: Self::ACCOUNT_LEN,
                actual: data.len(),
            });
        }
        let src = array_ref![data, ACCOUNT_TAG_LEN, EntryReceipt::BODY_LEN];
        let (participant, round_id, ticket_number, bump) = array_refs![src, 32, 8, 8, 1];

        Ok(EntryReceipt {
            participant: Pubkey::new_from_array(*participant),
            round_id: u64::from_le_bytes(*round_id),
            ticket_number: u64::from_le_bytes(*ticket_number),
            bump: bump[0],
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![0u8; Self::ACCOUNT_LEN];
        let dst = array_mut_ref![out, ACCOUNT_TAG_LEN, EntryReceipt::BODY_LEN];
        let (participant_dst, round_id_dst, ticket_number_dst, bump_dst) =
            mut_array_refs![dst, 32, 8, 8, 1];
        participant_dst.copy_from_slice(self.participant.as_ref());
        *round_id_dst = self.round_id.to_le_bytes();
        *ticket_number_dst = self.ticket_number.to_le_bytes();
        bump_dst[0] = self.bump;
        out
    }
}

/// One entry in a round. Created at entry time; flagged as the winner with
/// its prize as part of the payout operation, never at entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub owner: Pubkey,
    pub round_id: u64,
    pub is_winner: bool,
    pub prize_amount: u64,
    pub bump: u8,
}

impl Ticket {
    pub const BODY_LEN: usize = 32 + 8 + 1 + 8 + 1;
    pub const ACCOUNT_LEN: usize = ACCOUNT_TAG_LEN + Self::BODY_LEN;

    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < Self::ACCOUNT_LEN {
            return Err(DecodeError::Truncated {
                expected: Self::ACCOUNT_LEN,
                actual: data.len(),
            });
        }
        let src = array_ref![data, ACCOUNT_TAG_LEN, Ticket::BODY_LEN];
        let (owner, round_id, is_winner, prize_amount, bump) = array_refs![src, 32, 8, 1, 8, 1];

        Ok(Ticket {
            owner: Pubkey::new_from_array(*owner),
            round_id: u64::from_le_bytes(*round_id),
            is_winner: decode_bool(is_winner[0], "ticket.is_winner"),
            prize_amount: u64::from_le_bytes(*prize_amount),
            bump: bump[0],
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![0u8; Self::ACCOUNT_LEN];
        let dst = array_mut_ref![out, ACCOUNT_TAG_LEN, Ticket::BODY_LEN];
        let (owner_dst, round_id_dst, is_winner_dst, prize_amount_dst, bump_dst) =
            mut_array_refs![dst, 32, 8, 1, 8, 1];
        owner_dst.copy_from_slice(self.owner.as_ref());
        *round_id_dst = self.round_id.to_le_bytes();
        is_winner_dst[0] = self.is_winner as u8;
        *prize_amount_dst = self.prize_amount.to_le_bytes();
        bump_dst[0] = self.bump;
        out
    }
}

// The program only ever writes 0 or 1. Anything else is upstream corruption
// we surface but do not fail on.
fn decode_bool(byte: u8, field: &str) -> bool {
    if byte > 1 {
        eprintln!("anomaly: non-canonical bool byte {} in {}", byte, field);
    }
    byte != 0
}

/// Split a pot balance into (platform fee, winner prize) using the same
/// integer math as the program's payout handler.
pub fn split_pot(pot_balance: u64, platform_fee_bps: u16) -> (u64, u64) {
    let fee = (pot_balance as u128 * platform_fee_bps as u128 / 10_000) as u64;
    (fee, pot_balance.saturating_sub(fee))
}

/// Convert lamports to SOL (for display purposes)
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / 1_000_000_000.0
}
