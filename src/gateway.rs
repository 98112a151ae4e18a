// LotKeeper - Ledger gateway
//
// Thin read/write boundary to the ledger: fetch raw account bytes, fetch
// lamport balances, submit an authority-signed instruction and wait for
// confirmation. Everything above this module works against the traits, not
// the RPC client.
use async_trait::async_trait;
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_program::{instruction::Instruction, pubkey::Pubkey};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::Transaction,
};

use crate::error::KeeperError;
use crate::pda::find_round_state_address;
use crate::state::{EntryReceipt, RoundState, Ticket};

/// Signing capability. Implemented per wallet backend; holders of this
/// capability can authorize ledger mutations and nothing else should need it.
pub trait KeeperSigner: Send + Sync {
    fn pubkey(&self) -> Pubkey;
    fn sign(&self, message: &[u8]) -> Signature;
}

impl KeeperSigner for Keypair {
    fn pubkey(&self) -> Pubkey {
        Signer::pubkey(self)
    }

    fn sign(&self, message: &[u8]) -> Signature {
        self.sign_message(message)
    }
}

/// Read-only ledger access.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Fetch raw account data; `None` if the account does not exist.
    async fn fetch_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, KeeperError>;

    /// Fetch an account's lamport balance (0 if the account does not exist).
    async fn fetch_balance(&self, address: &Pubkey) -> Result<u64, KeeperError>;
}

/// Ledger access with instruction submission rights. The implementation
/// signs with the keeper authority and waits for confirmation.
#[async_trait]
pub trait LedgerWriter: LedgerReader {
    fn authority(&self) -> Pubkey;

    async fn submit(&self, instruction: Instruction) -> Result<Signature, KeeperError>;
}

/// RPC-backed gateway used by the running keeper.
pub struct RpcGateway<S: KeeperSigner> {
    rpc: RpcClient,
    signer: S,
}

impl<S: KeeperSigner> RpcGateway<S> {
    pub fn new(rpc_url: String, signer: S) -> Self {
        let rpc = RpcClient::new_with_commitment(rpc_url, CommitmentConfig::confirmed());
        Self { rpc, signer }
    }
}

#[async_trait]
impl<S: KeeperSigner> LedgerReader for RpcGateway<S> {
    async fn fetch_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, KeeperError> {
        let response = self
            .rpc
            .get_account_with_commitment(address, CommitmentConfig::confirmed())
            .await
            .map_err(|e| KeeperError::LedgerRead(e.to_string()))?;
        Ok(response.value.map(|account| account.data))
    }

    async fn fetch_balance(&self, address: &Pubkey) -> Result<u64, KeeperError> {
        self.rpc
            .get_balance(address)
            .await
            .map_err(|e| KeeperError::LedgerRead(e.to_string()))
    }
}

#[async_trait]
impl<S: KeeperSigner> LedgerWriter for RpcGateway<S> {
    fn authority(&self) -> Pubkey {
        self.signer.pubkey()
    }

    async fn submit(&self, instruction: Instruction) -> Result<Signature, KeeperError> {
        let payer = self.signer.pubkey();
        let blockhash = self
            .rpc
            .get_latest_blockhash()
            .await
            .map_err(|e| KeeperError::LedgerWrite(e.to_string()))?;

        let mut tx = Transaction::new_with_payer(&[instruction], Some(&payer));
        tx.message.recent_blockhash = blockhash;
        let signature = self.signer.sign(&tx.message_data());
        tx.signatures = vec![signature];

        self.rpc
            .send_and_confirm_transaction(&tx)
            .await
            .map_err(classify_submit_error)
    }
}

// A rejection carries a transaction error from the program; anything else is
// transport-level flakiness the caller's own retry budget covers.
fn classify_submit_error(err: ClientError) -> KeeperError {
    match &err.kind {
        ClientErrorKind::TransactionError(tx_err) => {
            KeeperError::InstructionRejected(tx_err.to_string())
        }
        _ => KeeperError::LedgerWrite(err.to_string()),
    }
}

/// Fetch and decode the singleton round state.
pub async fn fetch_round_state<G: LedgerReader + ?Sized>(
    gateway: &G,
    program_id: &Pubkey,
) -> Result<RoundState, KeeperError> {
    let (address, _) = find_round_state_address(program_id);
    let data = gateway
        .fetch_account(&address)
        .await?
        .ok_or(KeeperError::AccountMissing(address))?;
    Ok(RoundState::decode(&data)?)
}

/// Fetch and decode a ticket; `None` if it was never created.
pub async fn fetch_ticket<G: LedgerReader + ?Sized>(
    gateway: &G,
    address: &Pubkey,
) -> Result<Option<Ticket>, KeeperError> {
    match gateway.fetch_account(address).await? {
        Some(data) => Ok(Some(Ticket::decode(&data)?)),
        None => Ok(None),
    }
}

/// Fetch and decode an entry receipt; `None` if the participant never
/// entered that round.
pub async fn fetch_entry_receipt<G: LedgerReader + ?Sized>(
    gateway: &G,
    address: &Pubkey,
) -> Result<Option<EntryReceipt>, KeeperError> {
    match gateway.fetch_account(address).await? {
        Some(data) => Ok(Some(EntryReceipt::decode(&data)?)),
        None => Ok(None),
    }
}
