// LotKeeper - Errors
use solana_program::pubkey::Pubkey;
use thiserror::Error;

/// Errors produced when decoding raw account data.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Buffer shorter than the fixed layout requires. The decoder never
    /// returns a partially populated record.
    #[error("account data truncated: need {expected} bytes, have {actual}")]
    Truncated { expected: usize, actual: usize },
}

/// Errors that may be returned by keeper operations
#[derive(Error, Debug)]
pub enum KeeperError {
    /// Malformed account data
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// An account the operation requires does not exist on the ledger
    #[error("account not found: {0}")]
    AccountMissing(Pubkey),

    /// Ledger read failed (network / RPC flakiness)
    #[error("ledger read failed: {0}")]
    LedgerRead(String),

    /// Ledger write failed before the program saw the instruction
    #[error("ledger write failed: {0}")]
    LedgerWrite(String),

    /// The ledger program refused the instruction
    #[error("instruction rejected: {0}")]
    InstructionRejected(String),

    /// A bounded poll ran out of attempts
    #[error("poll budget exhausted after {attempts} attempts")]
    PollTimeout { attempts: u32 },
}

impl KeeperError {
    /// Short, human-readable form safe to surface to end users. Never
    /// includes raw ledger error payloads.
    pub fn user_message(&self) -> &'static str {
        match self {
            KeeperError::Decode(_) | KeeperError::AccountMissing(_) => {
                "lottery data is unavailable right now, please retry"
            }
            KeeperError::LedgerRead(_) | KeeperError::LedgerWrite(_) => {
                "the ledger is not responding, please retry"
            }
            KeeperError::InstructionRejected(_) => {
                "the draw could not be completed, please retry later"
            }
            KeeperError::PollTimeout { .. } => {
                "the draw is taking longer than expected, check back soon"
            }
        }
    }
}
