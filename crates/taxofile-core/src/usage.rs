//! Token usage reporting.
//!
//! The sampler reports usage for every oracle call that returned a response.
//! Reporting is fire-and-forget: the core never reads anything back.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl Usage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Receives usage reports. Owned by the caller for as long as it wants
/// totals to accumulate (typically the whole process).
pub trait UsageAccounting: Send + Sync {
    fn record(&self, usage: &Usage);
}

/// Discards every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAccounting;

impl UsageAccounting for NoopAccounting {
    fn record(&self, _usage: &Usage) {}
}

/// Running totals across calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageTotals {
    pub calls: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl UsageTotals {
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Thread-safe in-memory ledger.
#[derive(Debug, Default)]
pub struct UsageLedger {
    totals: Mutex<UsageTotals>,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn totals(&self) -> UsageTotals {
        *self.totals.lock()
    }

    pub fn reset(&self) -> UsageTotals {
        std::mem::take(&mut *self.totals.lock())
    }
}

impl UsageAccounting for UsageLedger {
    fn record(&self, usage: &Usage) {
        let mut totals = self.totals.lock();
        totals.calls += 1;
        totals.prompt_tokens += usage.prompt_tokens;
        totals.completion_tokens += usage.completion_tokens;
    }
}
