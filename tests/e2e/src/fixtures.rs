//! Chain-side fixtures

use async_trait::async_trait;
use ethers::providers::{MockProvider, Provider};
use mev::{LedgerView, WalletSigner};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use types::Address;

/// Well-known development key; never funded on a real network
pub const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const TEST_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

/// Wallet signer over a mocked provider.
///
/// Requests must carry nonce, gas limit and gas price; the mock has no
/// responses queued for filling.
pub fn test_signer(chain_id: u64) -> WalletSigner<Provider<MockProvider>> {
    let (provider, _mock) = Provider::mocked();
    WalletSigner::new(TEST_KEY, chain_id, Arc::new(provider)).expect("test key parses")
}

/// Fixed chain height and nonce
pub struct StaticLedger {
    height: u64,
    nonce: u64,
    queries: AtomicUsize,
}

impl StaticLedger {
    pub fn new(height: u64, nonce: u64) -> Self {
        Self {
            height,
            nonce,
            queries: AtomicUsize::new(0),
        }
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerView for StaticLedger {
    async fn block_number(&self) -> mev::Result<u64> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.height)
    }

    async fn pending_nonce(&self, _account: Address) -> mev::Result<u64> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.nonce)
    }
}

/// Full pending legacy transaction as a feed would deliver it.
///
/// `seed` fills the hash so distinct seeds give distinct transactions.
pub fn pending_transaction(seed: u8) -> Value {
    json!({
        "hash": format!("0x{}", format!("{:02x}", seed).repeat(32)),
        "nonce": format!("0x{:x}", seed),
        "blockHash": null,
        "blockNumber": null,
        "transactionIndex": null,
        "from": "0xa7d9ddbe1f17865597fbd27ec712455208b6b76d",
        "to": "0xf02c1c8e6114b1dbe8937a39260b5b0a374432bb",
        "value": "0xf3dbb76162000",
        "gasPrice": "0x4a817c800",
        "gas": "0x5208",
        "input": "0x",
        "v": "0x25",
        "r": "0x1b5e176d927f8e9ab405058b2d2457392da3e20f328b16ddabcebc33eaac5fea",
        "s": "0x4ba69724e8f69de52f0125ad8b3c5c2cef33019bac3249e2c0a2192766d1721c"
    })
}
