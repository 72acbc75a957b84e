//! Trigger budget for observed transactions
//!
//! The gate is the only state shared between the dispatch loop and anything
//! else that inspects the client, so it is a single atomic counter rather than
//! a lock. A successful [`DecisionGate::should_trigger`] spends one unit of the
//! budget in the same compare-and-swap that checks it.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use types::ObservedTransaction;

/// Filter evaluated before any budget is spent
pub type TriggerPredicate = Box<dyn Fn(&ObservedTransaction) -> bool + Send + Sync>;

pub struct DecisionGate {
    remaining: AtomicU32,
    predicate: Option<TriggerPredicate>,
}

impl DecisionGate {
    /// Fire on the first matching transaction only
    pub fn single_fire() -> Self {
        Self::n_shot(1)
    }

    /// Fire on at most `budget` matching transactions
    pub fn n_shot(budget: u32) -> Self {
        Self {
            remaining: AtomicU32::new(budget),
            predicate: None,
        }
    }

    /// Only transactions matching `predicate` may spend the budget
    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&ObservedTransaction) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Box::new(predicate));
        self
    }

    /// True at most `budget` times over the gate's lifetime, across all threads
    pub fn should_trigger(&self, tx: &ObservedTransaction) -> bool {
        if let Some(predicate) = &self.predicate {
            if !predicate(tx) {
                return false;
            }
        }

        let mut current = self.remaining.load(Ordering::Acquire);
        loop {
            if current == 0 {
                return false;
            }
            match self.remaining.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }

    /// Reset the budget. Explicit policy hook; the gate never reopens on its own.
    pub fn rearm(&self, budget: u32) {
        self.remaining.store(budget, Ordering::Release);
    }

    pub fn remaining(&self) -> u32 {
        self.remaining.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.remaining() == 0
    }
}

impl fmt::Debug for DecisionGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecisionGate")
            .field("remaining", &self.remaining())
            .field("filtered", &self.predicate.is_some())
            .finish()
    }
}
