// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Subscriber handles: one bounded queue per consumer
//!
//! The producer side ([`HandleSlot`]) lives in the session's subscriber set and
//! only ever `try_send`s. The consumer side ([`SampleStream`]) is handed out by
//! `subscribe`. Closing the slot drops the only sender, so the stream yields
//! whatever is still buffered and then `None`.

use futures_util::Stream;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

use super::sample::{Sample, SessionKey};

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Outcome of a non-blocking enqueue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    Delivered,
    /// Queue full, sample skipped for this handle
    Dropped,
    /// Handle already closed
    Closed,
}

/// Producer side of a subscriber handle
pub(crate) struct HandleSlot {
    id: u64,
    tx: Mutex<Option<mpsc::Sender<Sample>>>,
    /// Fires once the handle is finished from either side
    done: CancellationToken,
}

impl HandleSlot {
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn done(&self) -> CancellationToken {
        self.done.clone()
    }

    pub(crate) fn try_deliver(&self, sample: Sample) -> Delivery {
        let guard = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = guard.as_ref() else {
            return Delivery::Closed;
        };
        match tx.try_send(sample) {
            Ok(()) => Delivery::Delivered,
            Err(TrySendError::Full(_)) => Delivery::Dropped,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    /// Closes the queue; returns `true` only for the call that closed it
    pub(crate) fn close(&self) -> bool {
        let sender = self
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.done.cancel();
        sender.is_some()
    }
}

/// Creates a connected slot/stream pair with the given queue capacity
pub(crate) fn channel(key: SessionKey, capacity: usize) -> (HandleSlot, SampleStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let done = CancellationToken::new();
    let id = NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed);

    let slot = HandleSlot {
        id,
        tx: Mutex::new(Some(tx)),
        done: done.clone(),
    };
    let stream = SampleStream { key, id, rx, done };
    (slot, stream)
}

/// Consumer endpoint of a subscription
///
/// Yields samples in FIFO order (minus any dropped while the queue was full).
/// `None` means the subscription is closed for good. Dropping the stream
/// detaches it from its session.
#[derive(Debug)]
pub struct SampleStream {
    key: SessionKey,
    id: u64,
    rx: mpsc::Receiver<Sample>,
    done: CancellationToken,
}

impl SampleStream {
    /// Waits for the next sample; `None` once closed and drained
    pub async fn recv(&mut self) -> Option<Sample> {
        self.rx.recv().await
    }

    /// Returns a buffered sample without waiting
    pub fn try_recv(&mut self) -> Option<Sample> {
        self.rx.try_recv().ok()
    }

    /// Samples currently waiting in the queue
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.rx.len()
    }

    #[must_use]
    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Stream for SampleStream {
    type Item = Sample;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Sample>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for SampleStream {
    fn drop(&mut self) {
        self.done.cancel();
    }
}
