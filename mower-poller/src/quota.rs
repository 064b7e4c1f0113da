//! Monthly API call counter
//!
//! The Automower Connect API allows a fixed number of calls per calendar
//! month. The counter is owned by the poller, seeded from a persisted
//! snapshot and exported after every change so the host can store it.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Persisted form of the counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallCounterSnapshot {
    pub year: i32,
    pub month: u32,
    pub calls: u32,
}

/// Calls issued in the current UTC calendar month
#[derive(Debug, Clone)]
pub struct CallCounter {
    year: i32,
    month: u32,
    calls: u32,
    quota: u32,
}

impl CallCounter {
    /// A fresh counter for the month containing `now`
    pub fn new(quota: u32, now: DateTime<Utc>) -> Self {
        Self {
            year: now.year(),
            month: now.month(),
            calls: 0,
            quota,
        }
    }

    /// Restore a persisted counter, discarding it if it belongs to another month
    pub fn restore(snapshot: CallCounterSnapshot, quota: u32, now: DateTime<Utc>) -> Self {
        let mut counter = Self {
            year: snapshot.year,
            month: snapshot.month,
            calls: snapshot.calls,
            quota,
        };
        if counter.roll_over(now) {
            tracing::debug!(
                "Discarding call counter of {}-{:02}, a new month has started",
                snapshot.year,
                snapshot.month
            );
        }
        counter
    }

    /// Reset the counter when `now` is in a later month; returns true on reset
    pub fn roll_over(&mut self, now: DateTime<Utc>) -> bool {
        if (now.year(), now.month()) == (self.year, self.month) {
            return false;
        }
        self.year = now.year();
        self.month = now.month();
        self.calls = 0;
        true
    }

    pub fn record(&mut self, calls: u32, now: DateTime<Utc>) {
        self.roll_over(now);
        self.calls = self.calls.saturating_add(calls);
    }

    /// Mark the month as used up after the API answered 429
    pub fn saturate(&mut self, now: DateTime<Utc>) {
        self.roll_over(now);
        self.calls = self.calls.max(self.quota);
    }

    pub fn calls(&self) -> u32 {
        self.calls
    }

    pub fn quota(&self) -> u32 {
        self.quota
    }

    pub fn remaining(&self) -> u32 {
        self.quota.saturating_sub(self.calls)
    }

    pub fn is_exhausted(&self) -> bool {
        self.calls >= self.quota
    }

    pub fn snapshot(&self) -> CallCounterSnapshot {
        CallCounterSnapshot {
            year: self.year,
            month: self.month,
            calls: self.calls,
        }
    }
}
