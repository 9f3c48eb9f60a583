//! Instance-wide call ledger.
//!
//! Every dispatch reserves a sequence number when its route decides, and the
//! finished call is inserted at that position. In-flight pass-through calls
//! therefore land in dispatch order, not completion order, and a dispatch
//! dropped before completion leaves no entry behind.

use crate::message::Call;
use crate::route::Route;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub(crate) struct Ledger {
    next_seq: AtomicU64,
    entries: Mutex<Vec<(u64, Call)>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the dispatch position of a call about to be resolved.
    pub fn reserve(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Record a finished call, on the ledger and on its route, in one step.
    pub fn record(&self, seq: u64, route: Option<&Route>, call: Call) {
        let mut entries = self.entries.lock();
        if let Some(route) = route {
            route.record(seq, call.clone());
        }
        insert_ordered(&mut entries, seq, call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.entries
            .lock()
            .iter()
            .map(|(_, call)| call.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// Insert keeping entries sorted by sequence number.
pub(crate) fn insert_ordered(entries: &mut Vec<(u64, Call)>, seq: u64, call: Call) {
    let position = entries.partition_point(|(existing, _)| *existing < seq);
    entries.insert(position, (seq, call));
}
