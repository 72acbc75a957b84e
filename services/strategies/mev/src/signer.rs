//! Signing and chain-state seams
//!
//! The strategy never holds keys or talks to a node directly. It asks a
//! [`SigningService`] for signed bytes and a [`LedgerView`] for block height
//! and account nonces. The ethers-backed implementations below are what the
//! binary wires in.

use async_trait::async_trait;
use ethers::providers::Middleware;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{BlockNumber, TransactionRequest, H160, U256};
use std::sync::Arc;
use tracing::debug;
use types::{Address, SignedTransactionBytes, SigningRequest};

use crate::error::{MevError, Result};

#[async_trait]
pub trait SigningService: Send + Sync {
    /// Account that signs every request
    fn address(&self) -> Address;

    async fn sign(&self, request: &SigningRequest) -> Result<SignedTransactionBytes>;
}

#[async_trait]
pub trait LedgerView: Send + Sync {
    /// Latest block height
    async fn block_number(&self) -> Result<u64>;

    /// Next nonce for `account`, counting pending transactions
    async fn pending_nonce(&self, account: Address) -> Result<u64>;
}

/// Local private key plus a node connection for filling missing fields
pub struct WalletSigner<M> {
    wallet: LocalWallet,
    client: Arc<M>,
}

impl<M: Middleware> WalletSigner<M> {
    pub fn new(private_key: &str, chain_id: u64, client: Arc<M>) -> Result<Self> {
        let wallet = private_key
            .trim()
            .trim_start_matches("0x")
            .parse::<LocalWallet>()
            .map_err(|e| MevError::Configuration(format!("Invalid private key format: {}", e)))?
            .with_chain_id(chain_id);

        Ok(Self { wallet, client })
    }

    pub fn chain_id(&self) -> u64 {
        self.wallet.chain_id()
    }
}

#[async_trait]
impl<M> SigningService for WalletSigner<M>
where
    M: Middleware + 'static,
{
    fn address(&self) -> Address {
        Address::from_bytes(self.wallet.address().0)
    }

    async fn sign(&self, request: &SigningRequest) -> Result<SignedTransactionBytes> {
        let mut tx = TransactionRequest::new()
            .from(self.wallet.address())
            .to(H160::from(request.to.0))
            .value(U256::from(request.value))
            .chain_id(self.wallet.chain_id());

        if let Some(nonce) = request.nonce {
            tx = tx.nonce(nonce);
        }
        if let Some(gas_limit) = request.gas_limit {
            tx = tx.gas(gas_limit);
        }
        if let Some(gas_price) = request.gas_price {
            tx = tx.gas_price(U256::from(gas_price));
        }

        let mut typed: TypedTransaction = tx.into();

        let complete = request.nonce.is_some()
            && request.gas_limit.is_some()
            && request.gas_price.is_some();
        if !complete {
            self.client
                .fill_transaction(&mut typed, None)
                .await
                .map_err(|e| MevError::Signing(format!("Failed to fill transaction: {}", e)))?;
        }

        let signature = self
            .wallet
            .sign_transaction(&typed)
            .await
            .map_err(|e| MevError::Signing(e.to_string()))?;
        let raw = typed.rlp_signed(&signature);

        debug!(
            "✍️ Signed transfer of {} wei to {} ({} bytes)",
            request.value,
            request.to,
            raw.len()
        );
        Ok(SignedTransactionBytes::new(raw.to_vec()))
    }
}

/// Chain state read through any ethers middleware
pub struct ProviderLedger<M> {
    client: Arc<M>,
}

impl<M> ProviderLedger<M> {
    pub fn new(client: Arc<M>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<M> LedgerView for ProviderLedger<M>
where
    M: Middleware + 'static,
{
    async fn block_number(&self) -> Result<u64> {
        let height = self
            .client
            .get_block_number()
            .await
            .map_err(|e| MevError::Ledger(format!("eth_blockNumber failed: {}", e)))?;
        Ok(height.as_u64())
    }

    async fn pending_nonce(&self, account: Address) -> Result<u64> {
        let nonce = self
            .client
            .get_transaction_count(H160::from(account.0), Some(BlockNumber::Pending.into()))
            .await
            .map_err(|e| MevError::Ledger(format!("eth_getTransactionCount failed: {}", e)))?;
        Ok(nonce.as_u64())
    }
}
