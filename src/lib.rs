// LotKeeper
// Keeper service for an on-ledger daily lottery: derives record addresses,
// decodes account state, drives rounds through draw and payout, recovers
// wedged rounds, and resolves outcomes for participants.

pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod instruction;
pub mod monitor;
pub mod orchestrator;
pub mod pda;
pub mod resolver;
pub mod retry;
pub mod state;
