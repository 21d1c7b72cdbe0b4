// src/save/gate.rs
// =============================================================================
// The limit gate: caps how many images one run may save.
//
// Many downloads finish at the same time, so "is there room?" and "take the
// room" must be one step. A job first reserves a slot with an atomic
// compare-and-swap, fetches and writes its file, and then commits. A
// reservation that is dropped without committing (HTTP error, decode error,
// write error) hands its slot back.
//
// Jobs that find every slot reserved but not yet committed wait instead of
// giving up: the slot may still come back. They give up only once `saved`
// itself reaches the limit.
//
// reserved <= limit holds at every instant, so the number of files written
// never exceeds the limit, however many workers run in parallel.
// =============================================================================

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

#[derive(Debug)]
pub struct LimitGate {
    limit: usize,
    reserved: AtomicUsize,
    saved: AtomicUsize,
    // signalled on every commit and release
    changed: Notify,
}

impl LimitGate {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            reserved: AtomicUsize::new(0),
            saved: AtomicUsize::new(0),
            changed: Notify::new(),
        }
    }

    /// Claims one slot, or returns None while every slot is reserved.
    pub fn reserve(&self) -> Option<Reservation<'_>> {
        self.reserved
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |reserved| {
                (reserved < self.limit).then_some(reserved + 1)
            })
            .ok()
            .map(|_| Reservation {
                gate: self,
                committed: false,
            })
    }

    /// Claims one slot, waiting while the gate is full of uncommitted
    /// reservations. Returns None once `limit` images are saved.
    pub async fn reserve_or_wait(&self) -> Option<Reservation<'_>> {
        loop {
            let changed = self.changed.notified();
            tokio::pin!(changed);
            // register before checking so a release in between is not missed
            changed.as_mut().enable();

            if let Some(slot) = self.reserve() {
                return Some(slot);
            }
            if self.is_full() {
                return None;
            }
            changed.await;
        }
    }

    /// True once `limit` images are saved; no slot can come back after that.
    pub fn is_full(&self) -> bool {
        self.saved() >= self.limit
    }

    /// Images actually written so far.
    pub fn saved(&self) -> usize {
        self.saved.load(Ordering::Acquire)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

/// A claimed slot. Call `commit` once the file is on disk.
#[must_use = "dropping a reservation releases its slot"]
#[derive(Debug)]
pub struct Reservation<'a> {
    gate: &'a LimitGate,
    committed: bool,
}

impl Reservation<'_> {
    /// Counts the image as saved and returns the new total.
    pub fn commit(mut self) -> usize {
        self.committed = true;
        let total = self.gate.saved.fetch_add(1, Ordering::AcqRel) + 1;
        self.gate.changed.notify_waiters();
        total
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.gate.reserved.fetch_sub(1, Ordering::AcqRel);
            self.gate.changed.notify_waiters();
        }
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why fetch_update instead of load + store?
//    - Two tasks could both load 9, both see room under a limit of 10
//    - fetch_update retries the compare-and-swap until it wins or the closure
//      says no, so only one of them gets the last slot
//
// 2. What is Reservation<'a>?
//    - A guard that borrows the gate for as long as the save is in progress
//    - commit() consumes it; dropping it without commit() releases the slot
//
// 3. Why Notify and enable()?
//    - notify_waiters() only wakes futures that are already registered
//    - enable() registers us before we look at the counters, so a release
//      that happens between the check and the .await still wakes us
// -----------------------------------------------------------------------------
