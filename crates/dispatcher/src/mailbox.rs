//! ResultMailbox - single-slot, latest-value-wins hand-off
//!
//! One mailbox per publisher. The producer pushes into every mailbox on each
//! cycle; exactly one publisher pops from each.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::InferenceResult;
use tokio::sync::Notify;

/// Mailbox carrying shared results
pub type SharedMailbox = Arc<ResultMailbox<Arc<InferenceResult>>>;

/// Outcome of a [`ResultMailbox::push`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Slot was empty, value stored
    Stored,
    /// A pending value was overwritten
    Replaced,
    /// Mailbox is closed, value discarded
    Closed,
}

#[derive(Debug)]
struct Slot<T> {
    value: Option<T>,
    closed: bool,
}

/// Single-slot mailbox
#[derive(Debug)]
pub struct ResultMailbox<T> {
    slot: Mutex<Slot<T>>,
    notify: Notify,
}

impl<T> Default for ResultMailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ResultMailbox<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                value: None,
                closed: false,
            }),
            notify: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a value, overwriting any pending one
    ///
    /// Never blocks.
    pub fn push(&self, value: T) -> PushOutcome {
        let outcome = {
            let mut slot = self.lock();
            if slot.closed {
                return PushOutcome::Closed;
            }
            match slot.value.replace(value) {
                Some(_) => PushOutcome::Replaced,
                None => PushOutcome::Stored,
            }
        };
        self.notify.notify_one();
        outcome
    }

    /// Wait for the next value
    ///
    /// Returns `None` once the mailbox is closed and nothing is pending.
    pub async fn pop(&self) -> Option<T> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut slot = self.lock();
                if let Some(value) = slot.value.take() {
                    return Some(value);
                }
                if slot.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Take the pending value without waiting
    pub fn try_pop(&self) -> Option<T> {
        self.lock().value.take()
    }

    /// Close the mailbox and wake every waiter
    ///
    /// Idempotent. A pending value can still be popped.
    pub fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn has_pending(&self) -> bool {
        self.lock().value.is_some()
    }
}
