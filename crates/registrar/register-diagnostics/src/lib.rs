/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Fan-out diagnostics bus for registrar crates.
//!
//! A [`DiagnosticBus`] hands every emitted event to each live subscriber.
//! Emission is fire-and-forget: channels are unbounded, so publishing never
//! blocks the caller, and a subscriber that dropped its receiver is pruned on
//! the next emit. Nothing a subscriber does can change what the emitter
//! returns.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;

/// Shared diagnostics bus. Cloning yields another handle to the same subscriber set.
pub struct DiagnosticBus<E> {
    inner: Arc<BusInner<E>>,
}

struct BusInner<E> {
    subscribers: Mutex<Vec<Sender<E>>>,
    emitted: AtomicU64,
    dropped_subscribers: AtomicU64,
}

impl<E: Clone + Send + 'static> DiagnosticBus<E> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                subscribers: Mutex::new(Vec::new()),
                emitted: AtomicU64::new(0),
                dropped_subscribers: AtomicU64::new(0),
            }),
        }
    }

    /// Attach a new subscriber. Events emitted before this call are not replayed.
    pub fn subscribe(&self) -> Receiver<E> {
        let (tx, rx) = unbounded();
        self.inner.subscribers.lock().push(tx);
        rx
    }

    pub fn emit(&self, event: E) {
        self.inner.emitted.fetch_add(1, Ordering::Relaxed);

        let mut subscribers = self.inner.subscribers.lock();
        if subscribers.is_empty() {
            return;
        }

        let before = subscribers.len();
        // The last live subscriber takes the original; everyone else gets a clone.
        let last = subscribers.len() - 1;
        let mut event = Some(event);
        let mut index = 0;
        subscribers.retain(|tx| {
            let payload = if index == last {
                event.take()
            } else {
                event.clone()
            };
            index += 1;
            match payload {
                Some(payload) => tx.send(payload).is_ok(),
                None => true,
            }
        });

        let pruned = before - subscribers.len();
        if pruned > 0 {
            self.inner
                .dropped_subscribers
                .fetch_add(pruned as u64, Ordering::Relaxed);
            log::debug!("diagnostics bus pruned {pruned} disconnected subscriber(s)");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    pub fn snapshot(&self) -> BusSnapshot {
        BusSnapshot {
            emitted: self.inner.emitted.load(Ordering::Relaxed),
            dropped_subscribers: self.inner.dropped_subscribers.load(Ordering::Relaxed),
            live_subscribers: self.subscriber_count(),
        }
    }
}

impl<E> Clone for DiagnosticBus<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Clone + Send + 'static> Default for DiagnosticBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for DiagnosticBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticBus")
            .field("subscribers", &self.inner.subscribers.lock().len())
            .field("emitted", &self.inner.emitted.load(Ordering::Relaxed))
            .finish()
    }
}

/// Counters for a bus, for startup self-checks and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusSnapshot {
    pub emitted: u64,
    pub dropped_subscribers: u64,
    pub live_subscribers: usize,
}
