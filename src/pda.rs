// LotKeeper - Program-derived addresses
//
// Every on-ledger record the keeper touches lives at an address derived
// deterministically from a seed prefix plus little-endian-encoded numeric
// auxiliaries. The addressing contract is fixed: identical inputs must yield
// identical addresses forever.
use solana_program::pubkey::Pubkey;

pub const ROUND_STATE_SEED: &[u8] = b"lottery_state";
pub const POT_VAULT_SEED: &[u8] = b"pot_vault";
pub const ENTRY_RECEIPT_SEED: &[u8] = b"user_entry";
pub const TICKET_SEED: &[u8] = b"user_ticket";

/// The kinds of on-ledger records the program stores, with the auxiliary
/// seed material each one requires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeedKind {
    RoundState,
    PotVault,
    EntryReceipt { participant: Pubkey, round_id: u64 },
    Ticket { round_id: u64, ticket_index: u64 },
}

/// Derive the address and bump seed for a record.
pub fn derive(program_id: &Pubkey, kind: SeedKind) -> (Pubkey, u8) {
    match kind {
        SeedKind::RoundState => Pubkey::find_program_address(&[ROUND_STATE_SEED], program_id),
        SeedKind::PotVault => Pubkey::find_program_address(&[POT_VAULT_SEED], program_id),
        SeedKind::EntryReceipt {
            participant,
            round_id,
        } => Pubkey::find_program_address(
            &[
                ENTRY_RECEIPT_SEED,
                participant.as_ref(),
                &round_id.to_le_bytes(),
            ],
            program_id,
        ),
        SeedKind::Ticket {
            round_id,
            ticket_index,
        } => Pubkey::find_program_address(
            &[
                TICKET_SEED,
                &round_id.to_le_bytes(),
                &ticket_index.to_le_bytes(),
            ],
            program_id,
        ),
    }
}

/// Find the singleton round state address
pub fn find_round_state_address(program_id: &Pubkey) -> (Pubkey, u8) {
    derive(program_id, SeedKind::RoundState)
}

/// Find the singleton pot vault address
pub fn find_pot_vault_address(program_id: &Pubkey) -> (Pubkey, u8) {
    derive(program_id, SeedKind::PotVault)
}

/// Find the entry receipt address for a participant in a round
pub fn find_entry_receipt_address(
    program_id: &Pubkey,
    participant: &Pubkey,
    round_id: u64,
) -> (Pubkey, u8) {
    derive(
        program_id,
        SeedKind::EntryReceipt {
            participant: *participant,
            round_id,
        },
    )
}

/// Find the ticket address for a (round, index) pair
pub fn find_ticket_address(program_id: &Pubkey, round_id: u64, ticket_index: u64) -> (Pubkey, u8) {
    derive(
        program_id,
        SeedKind::Ticket {
            round_id,
            ticket_index,
        },
    )
}
