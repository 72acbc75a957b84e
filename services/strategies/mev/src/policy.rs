//! What to submit once a transaction triggers
//!
//! A [`SubmissionPolicy`] lists the self-authored follow-up transactions in
//! dependency order and picks one of two delivery strategies:
//!
//! - **Bundle**: trigger plus follow-ups as a single ordered `eth_sendBundle`
//! - **PrivateTransactions**: each follow-up as its own
//!   `eth_sendPrivateRawTransaction`, with per-leg routing

use config::{StrategyKind, SubmissionSettings};
use std::time::Duration;
use types::{Address, SigningRequest};

use crate::error::{MevError, Result};
use crate::payload::BlockBuilder;

/// Per-leg delivery options for private submissions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingOptions {
    pub use_public_mempool: bool,
    pub await_receipt: bool,
    pub receipt_timeout: Duration,
    pub mev_builders: Option<Vec<BlockBuilder>>,
}

impl RoutingOptions {
    /// Broadcast through the public mempool
    pub fn public(receipt_timeout: Duration) -> Self {
        Self {
            use_public_mempool: true,
            await_receipt: true,
            receipt_timeout,
            mev_builders: None,
        }
    }

    /// Send only to the given builders
    pub fn private(receipt_timeout: Duration, builders: Vec<BlockBuilder>) -> Self {
        Self {
            use_public_mempool: false,
            await_receipt: true,
            receipt_timeout,
            mev_builders: (!builders.is_empty()).then_some(builders),
        }
    }

    pub fn without_receipt(mut self) -> Self {
        self.await_receipt = false;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Refund {
    /// Share of the bundle's value returned, 0..=100
    pub percent: u8,
    /// Bundle position of the transaction receiving the refund
    pub index: u32,
}

/// Delivery options for a bundle. Bundles never touch the public mempool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleRouting {
    pub await_receipt: bool,
    pub receipt_timeout: Duration,
    pub mev_builders: Option<Vec<BlockBuilder>>,
    pub refund: Option<Refund>,
}

/// One transaction to sign after a trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowUpIntent {
    pub label: String,
    pub request: SigningRequest,
    /// Used by the private strategy only
    pub routing: RoutingOptions,
    /// Emit `tx` instead of `txs` for this leg
    pub single_form: bool,
}

impl FollowUpIntent {
    pub fn new(label: impl Into<String>, request: SigningRequest, routing: RoutingOptions) -> Self {
        Self {
            label: label.into(),
            request,
            routing,
            single_form: false,
        }
    }

    pub fn single_form(mut self) -> Self {
        self.single_form = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionStrategy {
    Bundle(BundleRouting),
    PrivateTransactions {
        /// Attach `blockNumber = height + 1` to every leg
        pin_target_block: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionPolicy {
    pub strategy: SubmissionStrategy,
    /// Dependency order: each entry may rely on the ones before it
    pub follow_ups: Vec<FollowUpIntent>,
}

impl SubmissionPolicy {
    pub fn bundle(routing: BundleRouting, follow_ups: Vec<FollowUpIntent>) -> Self {
        Self {
            strategy: SubmissionStrategy::Bundle(routing),
            follow_ups,
        }
    }

    pub fn private_transactions(follow_ups: Vec<FollowUpIntent>) -> Self {
        Self {
            strategy: SubmissionStrategy::PrivateTransactions {
                pin_target_block: false,
            },
            follow_ups,
        }
    }

    pub fn pin_target_block(mut self) -> Self {
        if let SubmissionStrategy::PrivateTransactions { pin_target_block } = &mut self.strategy {
            *pin_target_block = true;
        }
        self
    }

    /// Whether building needs the current block height
    pub fn needs_target_block(&self) -> bool {
        match &self.strategy {
            SubmissionStrategy::Bundle(_) => true,
            SubmissionStrategy::PrivateTransactions { pin_target_block } => *pin_target_block,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.follow_ups.is_empty() {
            return Err(MevError::Configuration(
                "Submission policy has no follow-up transactions".to_string(),
            ));
        }

        match &self.strategy {
            SubmissionStrategy::Bundle(routing) => {
                if routing.await_receipt && routing.receipt_timeout.is_zero() {
                    return Err(MevError::Configuration(
                        "Bundle receipt timeout must be greater than zero".to_string(),
                    ));
                }
                if let Some(refund) = routing.refund {
                    if refund.percent > 100 {
                        return Err(MevError::Configuration(format!(
                            "Refund percent {} exceeds 100",
                            refund.percent
                        )));
                    }
                    // Bundle holds the trigger plus every follow-up
                    let bundle_len = self.follow_ups.len() + 1;
                    if refund.index as usize >= bundle_len {
                        return Err(MevError::Configuration(format!(
                            "Refund index {} outside bundle of {} transactions",
                            refund.index, bundle_len
                        )));
                    }
                }
            }
            SubmissionStrategy::PrivateTransactions { .. } => {
                for leg in &self.follow_ups {
                    if leg.routing.await_receipt && leg.routing.receipt_timeout.is_zero() {
                        return Err(MevError::Configuration(format!(
                            "Leg '{}' receipt timeout must be greater than zero",
                            leg.label
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Policy described by configuration, sending follow-ups back to `account`.
    ///
    /// Bundle: one self-transfer backrunning the trigger.
    /// Private: a public approval leg followed by a private swap leg.
    pub fn from_settings(settings: &SubmissionSettings, account: Address) -> Result<Self> {
        let builders = BlockBuilder::parse_list(&settings.mev_builders);
        let receipt_timeout = Duration::from_millis(settings.receipt_timeout_ms);

        let follow_up = |value: u64| {
            let request = SigningRequest::transfer(account, value as u128);
            match settings.gas_price_wei {
                Some(gas_price) => request.with_gas_price(gas_price as u128),
                None => request,
            }
        };

        let policy = match settings.strategy {
            StrategyKind::Bundle => {
                let refund = match (settings.refund_percent, settings.refund_index) {
                    (Some(percent), index) => Some(Refund {
                        percent,
                        index: index.unwrap_or(0),
                    }),
                    (None, Some(_)) => {
                        return Err(MevError::Configuration(
                            "refund_index set without refund_percent".to_string(),
                        ))
                    }
                    (None, None) => None,
                };

                let routing = BundleRouting {
                    await_receipt: settings.await_receipt,
                    receipt_timeout,
                    mev_builders: (!builders.is_empty()).then_some(builders.clone()),
                    refund,
                };
                let backrun = FollowUpIntent::new(
                    "backrun",
                    follow_up(settings.follow_up_value_wei),
                    RoutingOptions::private(receipt_timeout, builders),
                );
                SubmissionPolicy::bundle(routing, vec![backrun])
            }
            StrategyKind::PrivateLegs => {
                let mut approval_routing =
                    RoutingOptions::public(Duration::from_millis(settings.public_leg_timeout_ms));
                let mut swap_routing = RoutingOptions::private(receipt_timeout, builders);
                if !settings.await_receipt {
                    approval_routing = approval_routing.without_receipt();
                    swap_routing = swap_routing.without_receipt();
                }

                let value = settings.follow_up_value_wei;
                let approval =
                    FollowUpIntent::new("approval", follow_up(value), approval_routing).single_form();
                let swap = FollowUpIntent::new("swap", follow_up(value), swap_routing);
                SubmissionPolicy::private_transactions(vec![approval, swap])
            }
        };

        policy.validate()?;
        Ok(policy)
    }
}
