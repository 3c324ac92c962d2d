//! Process-wide source of transient identity tickets.
//!
//! This is the only process-wide state in the crate and the atomic
//! increment below is the only synchronization primitive the collections
//! require. Ticket `0` is reserved to mean "no transient"; the counter
//! therefore starts at 1. Overflow is not defended against: at 10^9
//! tickets per second the counter wraps in roughly 585 years.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TICKET: AtomicU64 = AtomicU64::new(1);

/// Hand out the next process-unique, nonzero ticket.
pub fn next() -> u64 {
    NEXT_TICKET.fetch_add(1, Ordering::Relaxed)
}
