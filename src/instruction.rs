// LotKeeper - Instruction builders
//
// The lottery program's call convention: instruction data is an 8-byte
// method discriminator (sha256("global:<method>")[..8]) followed by
// Borsh-serialized arguments.
use borsh::BorshSerialize;
use solana_program::{
    hash::hash,
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program,
};

use crate::pda::{
    find_entry_receipt_address, find_pot_vault_address, find_round_state_address,
    find_ticket_address,
};

/// Compute the 8-byte discriminator for a program method.
pub fn method_discriminator(name: &str) -> [u8; 8] {
    let preimage = format!("global:{}", name);
    let digest = hash(preimage.as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest.to_bytes()[..8]);
    out
}

/// Optional config updates, each applied only when present.
#[derive(BorshSerialize, Debug, Clone, Default)]
pub struct UpdateConfigArgs {
    pub new_ticket_price: Option<u64>,
    pub new_platform_fee_bps: Option<u16>,
    pub new_platform_wallet: Option<Pubkey>,
    pub new_end_timestamp: Option<u64>,
}

/// Create an enter_round instruction
///
/// Accounts expected:
/// 0. `[signer, writable]` The participant paying the ticket price
/// 1. `[writable]` The round state account
/// 2. `[writable]` The pot vault
/// 3. `[writable]` The new entry receipt for (participant, round)
/// 4. `[writable]` The new ticket for (round, ticket_index)
/// 5. `[]` The system program
///
/// `ticket_index` must equal the round's `total_participants` at submission
/// time; the program assigns the same number on-ledger.
pub fn enter_round(
    program_id: &Pubkey,
    participant: &Pubkey,
    round_id: u64,
    ticket_index: u64,
) -> Instruction {
    let (round_state, _) = find_round_state_address(program_id);
    let (pot_vault, _) = find_pot_vault_address(program_id);
    let (entry_receipt, _) = find_entry_receipt_address(program_id, participant, round_id);
    let (ticket, _) = find_ticket_address(program_id, round_id, ticket_index);

    let accounts = vec![
        AccountMeta::new(*participant, true),
        AccountMeta::new(round_state, false),
        AccountMeta::new(pot_vault, false),
        AccountMeta::new(entry_receipt, false),
        AccountMeta::new(ticket, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Instruction {
        program_id: *program_id,
        accounts,
        data: method_discriminator("enter_round").to_vec(),
    }
}

/// Create a request_draw instruction
///
/// Accounts expected:
/// 0. `[signer]` The keeper authority
/// 1. `[writable]` The round state account
/// 2. `[]` The randomness oracle queue
pub fn request_draw(program_id: &Pubkey, authority: &Pubkey, oracle_queue: &Pubkey) -> Instruction {
    let (round_state, _) = find_round_state_address(program_id);

    let accounts = vec![
        AccountMeta::new(*authority, true),
        AccountMeta::new(round_state, false),
        AccountMeta::new_readonly(*oracle_queue, false),
    ];

    Instruction {
        program_id: *program_id,
        accounts,
        data: method_discriminator("request_draw").to_vec(),
    }
}

/// Create a payout instruction
///
/// Accounts expected:
/// 0. `[signer, writable]` The keeper authority
/// 1. `[writable]` The round state account
/// 2. `[writable]` The pot vault
/// 3. `[writable]` The platform wallet
/// 4. `[writable]` The winning ticket for (round, winner_ticket_index - 1)
/// 5. `[writable]` The winner's wallet
/// 6. `[]` The system program
///
/// On the ledger this is the operation that also rolls the round over:
/// counters reset, round id increments, end timestamp advances one day.
pub fn payout(
    program_id: &Pubkey,
    authority: &Pubkey,
    platform_wallet: &Pubkey,
    round_id: u64,
    winning_ticket_index: u64,
    winner: &Pubkey,
) -> Instruction {
    let (round_state, _) = find_round_state_address(program_id);
    let (pot_vault, _) = find_pot_vault_address(program_id);
    let (winning_ticket, _) = find_ticket_address(program_id, round_id, winning_ticket_index);

    let accounts = vec![
        AccountMeta::new(*authority, true),
        AccountMeta::new(round_state, false),
        AccountMeta::new(pot_vault, false),
        AccountMeta::new(*platform_wallet, false),
        AccountMeta::new(winning_ticket, false),
        AccountMeta::new(*winner, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Instruction {
        program_id: *program_id,
        accounts,
        data: method_discriminator("payout").to_vec(),
    }
}

/// Create a reset instruction
///
/// Rolls an expired round with zero participants over to the next day.
/// The program rejects a reset of a round that has entries.
///
/// Accounts expected:
/// 0. `[signer]` The keeper authority
/// 1. `[writable]` The round state account
pub fn reset(program_id: &Pubkey, authority: &Pubkey) -> Instruction {
    let (round_state, _) = find_round_state_address(program_id);

    let accounts = vec![
        AccountMeta::new(*authority, true),
        AccountMeta::new(round_state, false),
    ];

    Instruction {
        program_id: *program_id,
        accounts,
        data: method_discriminator("reset").to_vec(),
    }
}

/// Create an update_config instruction
///
/// Accounts expected:
/// 0. `[signer]` The keeper authority
/// 1. `[writable]` The round state account
pub fn update_config(
    program_id: &Pubkey,
    authority: &Pubkey,
    args: &UpdateConfigArgs,
) -> Instruction {
    let (round_state, _) = find_round_state_address(program_id);

    let accounts = vec![
        AccountMeta::new(*authority, true),
        AccountMeta::new(round_state, false),
    ];

    let mut data = method_discriminator("update_config").to_vec();
    data.extend_from_slice(&args.try_to_vec().expect("borsh encode update_config args"));

    Instruction {
        program_id: *program_id,
        accounts,
        data,
    }
}
