//! Level-triggered event for pacing the send task
//!
//! One signaler (the receive loop) and one waiter (the send task). The
//! waiter's clear-then-wait is race-free because nobody else clears; a
//! signal landing between clear and wait only costs one extra cycle of
//! latency, since the next received packet signals again.

use parking_lot::{Condvar, Mutex};

/// Binary synchronization event
///
/// `set` leaves the event signaled until someone calls `clear`; `wait`
/// returns immediately if the event is already signaled. The waiter is
/// suspended, never spinning.
#[derive(Default)]
pub struct SyncEvent {
    signaled: Mutex<bool>,
    cond: Condvar,
}

impl SyncEvent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal the event and wake the waiter
    pub fn set(&self) {
        *self.signaled.lock() = true;
        self.cond.notify_one();
    }

    /// Reset the event to unsignaled
    pub fn clear(&self) {
        *self.signaled.lock() = false;
    }

    /// Block until the event is signaled
    pub fn wait(&self) {
        let mut signaled = self.signaled.lock();
        while !*signaled {
            self.cond.wait(&mut signaled);
        }
    }
}
