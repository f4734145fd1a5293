// crates/abraxas-executor/src/limiter.rs
// ============================================================================
// Module: In-Flight Byte Limiter
// Description: Counted gate bounding bytes concurrently held by workers.
// Purpose: Keep peak in-flight bytes at or below the configured cap.
// Dependencies: std::sync
// ============================================================================

//! ## Overview
//! Requests larger than the cap are clamped to the cap so a single oversized
//! unit cannot deadlock the gate. A cap of zero disables blocking entirely;
//! peak tracking stays active either way so the observed peak can be
//! reported to the perf ledger.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Condvar;
use std::sync::Mutex;

// ============================================================================
// SECTION: Limiter
// ============================================================================

/// Interior counters of the limiter.
#[derive(Debug)]
struct LimiterState {
    /// Bytes still available under the cap.
    available: u64,
    /// Bytes currently held by running handlers.
    in_flight: u64,
    /// Highest observed `in_flight` value.
    peak: u64,
}

/// Counted gate with capacity `max_inflight_bytes`.
///
/// # Invariants
/// - With a non-zero cap, `in_flight` never exceeds the cap.
#[derive(Debug)]
pub struct ByteLimiter {
    /// Configured cap; zero disables blocking.
    cap: u64,
    /// Guarded counters.
    state: Mutex<LimiterState>,
    /// Wakes waiters when bytes are released.
    released: Condvar,
}

impl ByteLimiter {
    /// Creates a limiter with the given cap; zero disables blocking.
    #[must_use]
    pub const fn new(cap: u64) -> Self {
        Self {
            cap,
            state: Mutex::new(LimiterState {
                available: cap,
                in_flight: 0,
                peak: 0,
            }),
            released: Condvar::new(),
        }
    }

    /// Clamps a request to the cap.
    const fn clamp(&self, amount: u64) -> u64 {
        if self.cap == 0 { amount } else if amount > self.cap { self.cap } else { amount }
    }

    /// Acquires bytes before a handler runs, blocking while over the cap.
    pub fn acquire(&self, amount: u64) {
        let amount = self.clamp(amount);
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if self.cap > 0 {
            while state.available < amount {
                let Ok(next) = self.released.wait(state) else {
                    return;
                };
                state = next;
            }
            state.available -= amount;
        }
        state.in_flight += amount;
        if state.in_flight > state.peak {
            state.peak = state.in_flight;
        }
    }

    /// Releases bytes after a handler completes.
    pub fn release(&self, amount: u64) {
        let amount = self.clamp(amount);
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        state.in_flight = state.in_flight.saturating_sub(amount);
        if self.cap > 0 {
            state.available = (state.available + amount).min(self.cap);
            drop(state);
            self.released.notify_all();
        }
    }

    /// Returns the highest observed in-flight byte count.
    #[must_use]
    pub fn peak(&self) -> u64 {
        self.state.lock().map_or(0, |state| state.peak)
    }
}
