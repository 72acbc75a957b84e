//! Payload construction for triggered transactions

use std::sync::Arc;
use tracing::{debug, info};
use types::{HexBytes, ObservedTransaction, SignedTransactionBytes};

use crate::error::{MevError, Result};
use crate::payload::{BundleSubmission, PrivateTransaction, PrivateTransactions, SubmissionPayload};
use crate::policy::{BundleRouting, FollowUpIntent, SubmissionPolicy, SubmissionStrategy};
use crate::signer::{LedgerView, SigningService};

/// Turns a trigger plus a policy into ready-to-send payloads
pub struct BundleBuilder {
    signer: Arc<dyn SigningService>,
    ledger: Arc<dyn LedgerView>,
}

impl BundleBuilder {
    pub fn new(signer: Arc<dyn SigningService>, ledger: Arc<dyn LedgerView>) -> Self {
        Self { signer, ledger }
    }

    /// Sign every follow-up, resolve the target block if needed, assemble.
    ///
    /// All or nothing: any signing or ledger failure yields `BuildFailed`.
    pub async fn build(
        &self,
        trigger: &ObservedTransaction,
        policy: &SubmissionPolicy,
    ) -> Result<Vec<SubmissionPayload>> {
        self.assemble(trigger, policy)
            .await
            .map_err(MevError::build_failed)
    }

    async fn assemble(
        &self,
        trigger: &ObservedTransaction,
        policy: &SubmissionPolicy,
    ) -> Result<Vec<SubmissionPayload>> {
        policy.validate()?;

        let signed = self.sign_follow_ups(&policy.follow_ups).await?;

        let target_block = if policy.needs_target_block() {
            Some(self.ledger.block_number().await? + 1)
        } else {
            None
        };

        match &policy.strategy {
            SubmissionStrategy::Bundle(routing) => {
                let block_number = target_block.ok_or_else(|| {
                    MevError::Ledger("No target block for bundle".to_string())
                })?;
                let bundle = bundle_submission(trigger, signed, block_number, routing);
                info!(
                    "📦 Bundle for block {} backrunning {} ({} txs)",
                    block_number,
                    trigger.hash(),
                    bundle.txs.len()
                );
                Ok(vec![SubmissionPayload::Bundle(bundle)])
            }
            SubmissionStrategy::PrivateTransactions { .. } => {
                let legs: Vec<SubmissionPayload> = policy
                    .follow_ups
                    .iter()
                    .zip(signed)
                    .map(|(intent, tx)| {
                        SubmissionPayload::Private(private_leg(intent, tx, target_block))
                    })
                    .collect();
                info!(
                    "📦 {} private legs after {}",
                    legs.len(),
                    trigger.hash()
                );
                Ok(legs)
            }
        }
    }

    /// Sign in declaration order. Missing nonces are filled consecutively from
    /// the account's pending nonce so later legs land after earlier ones.
    async fn sign_follow_ups(
        &self,
        follow_ups: &[FollowUpIntent],
    ) -> Result<Vec<SignedTransactionBytes>> {
        let needs_nonces =
            follow_ups.len() > 1 && follow_ups.iter().any(|f| f.request.nonce.is_none());
        let mut next_nonce = if needs_nonces {
            Some(self.ledger.pending_nonce(self.signer.address()).await?)
        } else {
            None
        };

        let mut signed = Vec::with_capacity(follow_ups.len());
        for intent in follow_ups {
            let mut request = intent.request.clone();
            if let Some(nonce) = next_nonce.as_mut() {
                match request.nonce {
                    Some(explicit) => *nonce = explicit + 1,
                    None => {
                        request.nonce = Some(*nonce);
                        *nonce += 1;
                    }
                }
            }

            debug!("Signing follow-up '{}' (nonce {:?})", intent.label, request.nonce);
            signed.push(self.signer.sign(&request).await?);
        }

        Ok(signed)
    }
}

fn bundle_submission(
    trigger: &ObservedTransaction,
    signed: Vec<SignedTransactionBytes>,
    block_number: u64,
    routing: &BundleRouting,
) -> BundleSubmission {
    let mut txs: Vec<HexBytes> = Vec::with_capacity(signed.len() + 1);
    txs.push(trigger.to_hex_bytes());
    txs.extend(signed.into_iter().map(SignedTransactionBytes::into_hex_bytes));

    BundleSubmission {
        txs,
        block_number,
        use_public_mempool: false,
        await_receipt: routing.await_receipt,
        await_receipt_timeout_ms: routing.receipt_timeout.as_millis() as u64,
        mev_builders: routing.mev_builders.clone(),
        refund_percent: routing.refund.map(|r| r.percent),
        refund_index: routing.refund.map(|r| r.index),
    }
}

fn private_leg(
    intent: &FollowUpIntent,
    tx: SignedTransactionBytes,
    block_number: Option<u64>,
) -> PrivateTransaction {
    let tx = tx.into_hex_bytes();
    let transactions = if intent.single_form {
        PrivateTransactions::Single(tx)
    } else {
        PrivateTransactions::Many(vec![tx])
    };

    PrivateTransaction {
        transactions,
        block_number,
        use_public_mempool: intent.routing.use_public_mempool,
        await_receipt: intent.routing.await_receipt,
        await_receipt_timeout_ms: intent.routing.receipt_timeout.as_millis() as u64,
        mev_builders: intent.routing.mev_builders.clone(),
    }
}
