//! Rendezvous queue implementation

use std::collections::VecDeque;
use std::fmt;
use std::mem;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio::time::Instant;

use super::error::QueueError;

/// Timeout used when a caller does not pick one
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(1000);

/// Snapshot of the queue's current mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueStatus {
    /// Nothing buffered, nobody waiting
    Empty,
    /// Items waiting to be requested
    Buffered(usize),
    /// Requests waiting for items
    Awaiting(usize),
}

/// A consumer parked until the next push
struct Waiter<T> {
    ticket: u64,
    tx: oneshot::Sender<T>,
}

enum QueueState<T> {
    Empty,
    Buffered(VecDeque<T>),
    Awaiting(VecDeque<Waiter<T>>),
}

impl<T> Default for QueueState<T> {
    fn default() -> Self {
        QueueState::Empty
    }
}

struct Inner<T> {
    state: QueueState<T>,
    next_ticket: u64,
}

impl<T> Inner<T> {
    /// Hand an item to the oldest live waiter, or buffer it
    fn deliver(&mut self, item: T) {
        let mut item = item;

        self.state = match mem::take(&mut self.state) {
            QueueState::Empty => QueueState::Buffered(VecDeque::from([item])),
            QueueState::Buffered(mut items) => {
                items.push_back(item);
                QueueState::Buffered(items)
            }
            QueueState::Awaiting(mut waiters) => loop {
                match waiters.pop_front() {
                    Some(waiter) => match waiter.tx.send(item) {
                        Ok(()) if waiters.is_empty() => break QueueState::Empty,
                        Ok(()) => break QueueState::Awaiting(waiters),
                        // Receiver dropped before its ticket was cancelled
                        Err(unclaimed) => item = unclaimed,
                    },
                    None => break QueueState::Buffered(VecDeque::from([item])),
                }
            },
        };
    }

    /// Pop the oldest buffered item, if any
    fn take(&mut self) -> Option<T> {
        match mem::take(&mut self.state) {
            QueueState::Buffered(mut items) => {
                let item = items.pop_front();
                if !items.is_empty() {
                    self.state = QueueState::Buffered(items);
                }
                item
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Register a new waiter. Only called after `take()` came back empty.
    fn enqueue(&mut self) -> (u64, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        let ticket = self.next_ticket;
        self.next_ticket = self.next_ticket.wrapping_add(1);

        let waiter = Waiter { ticket, tx };
        match &mut self.state {
            QueueState::Awaiting(waiters) => waiters.push_back(waiter),
            _ => self.state = QueueState::Awaiting(VecDeque::from([waiter])),
        }

        (ticket, rx)
    }

    /// Remove exactly one waiter. Returns false if it was already served.
    fn cancel(&mut self, ticket: u64) -> bool {
        let QueueState::Awaiting(waiters) = &mut self.state else {
            return false;
        };

        let before = waiters.len();
        waiters.retain(|waiter| waiter.ticket != ticket);
        let removed = waiters.len() != before;

        if waiters.is_empty() {
            self.state = QueueState::Empty;
        }
        removed
    }

    /// Put items back at the head of the queue, oldest first
    fn restore(&mut self, items: Vec<T>) {
        match mem::take(&mut self.state) {
            QueueState::Buffered(rest) => {
                let mut items = VecDeque::from(items);
                items.extend(rest);
                self.state = QueueState::Buffered(items);
            }
            other => {
                self.state = other;
                for item in items {
                    self.deliver(item);
                }
            }
        }
    }

    /// Give a single item back ahead of everything else
    fn requeue_front(&mut self, item: T) {
        self.restore(vec![item]);
    }

    fn status(&self) -> QueueStatus {
        match &self.state {
            QueueState::Empty => QueueStatus::Empty,
            QueueState::Buffered(items) => QueueStatus::Buffered(items.len()),
            QueueState::Awaiting(waiters) => QueueStatus::Awaiting(waiters.len()),
        }
    }
}

/// FIFO rendezvous between pushed items and awaiting requests
///
/// `push` is synchronous so it can be called from transport callbacks;
/// `request` suspends until an item is pushed, the timeout elapses, or the
/// queue is disposed. The Nth push always satisfies the Nth outstanding
/// request.
pub struct RendezvousQueue<T> {
    inner: Mutex<Inner<T>>,
}

impl<T> RendezvousQueue<T> {
    /// Create an empty queue
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: QueueState::Empty,
                next_ticket: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Push an item, completing the oldest pending request if there is one
    pub fn push(&self, item: T) {
        self.lock().deliver(item);
    }

    /// Wait for the next item
    ///
    /// Resolves immediately when an item is buffered. Otherwise the request
    /// joins the back of the waiting line and fails with
    /// [`QueueError::Timeout`] if nothing arrives in time. Only this request
    /// is removed on timeout; other waiters are unaffected.
    pub async fn request(&self, timeout: Duration) -> Result<T, QueueError> {
        self.request_until(Instant::now() + timeout, timeout).await
    }

    /// Wait for the next `count` items, in order
    ///
    /// All requests share one deadline. If it passes before `count` items
    /// arrive, the items collected so far are put back at the head of the
    /// queue and the whole call fails.
    pub async fn request_n(&self, count: usize, timeout: Duration) -> Result<Vec<T>, QueueError> {
        let deadline = Instant::now() + timeout;
        let mut batch = BatchGuard {
            queue: self,
            items: Vec::with_capacity(count),
        };

        for _ in 0..count {
            match self.request_until(deadline, timeout).await {
                Ok(item) => batch.items.push(item),
                Err(QueueError::Timeout(budget)) => {
                    tracing::trace!(
                        received = batch.items.len(),
                        expected = count,
                        "Batch request timed out, restoring received items"
                    );
                    return Err(QueueError::Timeout(budget));
                }
                Err(QueueError::Disposed) => {
                    batch.items.clear();
                    return Err(QueueError::Disposed);
                }
            }
        }

        Ok(mem::take(&mut batch.items))
    }

    async fn request_until(&self, deadline: Instant, budget: Duration) -> Result<T, QueueError> {
        let (ticket, rx) = {
            let mut inner = self.lock();
            if let Some(item) = inner.take() {
                return Ok(item);
            }
            inner.enqueue()
        };
        let mut guard = TicketGuard {
            queue: self,
            ticket,
            rx,
            settled: false,
        };

        let result = match tokio::time::timeout_at(deadline, &mut guard.rx).await {
            Ok(Ok(item)) => Ok(item),
            Ok(Err(_)) => Err(QueueError::Disposed),
            Err(_) => {
                if self.lock().cancel(ticket) {
                    Err(QueueError::Timeout(budget))
                } else {
                    // A push or dispose won the race against the timer
                    match guard.rx.try_recv() {
                        Ok(item) => Ok(item),
                        Err(TryRecvError::Closed) => Err(QueueError::Disposed),
                        Err(TryRecvError::Empty) => Err(QueueError::Timeout(budget)),
                    }
                }
            }
        };

        guard.settled = true;
        result
    }

    /// Fail every pending request with [`QueueError::Disposed`] and reset
    ///
    /// Buffered items are discarded. Disposing an empty queue is a no-op, and
    /// the queue behaves like a fresh one afterwards.
    pub fn dispose(&self) {
        let state = mem::take(&mut self.lock().state);

        match state {
            QueueState::Awaiting(waiters) => {
                tracing::debug!(pending = waiters.len(), "Disposing queue with pending requests");
                // Dropping the senders fails each receiver
                drop(waiters);
            }
            QueueState::Buffered(items) => {
                tracing::debug!(discarded = items.len(), "Disposing queue with buffered items");
            }
            QueueState::Empty => {}
        }
    }

    /// Current mode and its length
    pub fn status(&self) -> QueueStatus {
        self.lock().status()
    }

    /// Number of buffered items
    pub fn len(&self) -> usize {
        match self.status() {
            QueueStatus::Buffered(n) => n,
            _ => 0,
        }
    }

    /// Whether no items are buffered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of requests waiting for an item
    pub fn pending_requests(&self) -> usize {
        match self.status() {
            QueueStatus::Awaiting(n) => n,
            _ => 0,
        }
    }
}

impl<T> Default for RendezvousQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for RendezvousQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendezvousQueue")
            .field("status", &self.status())
            .finish()
    }
}

/// Cleans up after a request future dropped before it settled
///
/// An unserved waiter leaves the line. A waiter that was already handed an
/// item gives it back to the head of the queue.
struct TicketGuard<'a, T> {
    queue: &'a RendezvousQueue<T>,
    ticket: u64,
    rx: oneshot::Receiver<T>,
    settled: bool,
}

impl<T> Drop for TicketGuard<'_, T> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        let mut inner = self.queue.lock();
        if inner.cancel(self.ticket) {
            return;
        }
        if let Ok(item) = self.rx.try_recv() {
            tracing::trace!(ticket = self.ticket, "Request dropped after delivery, requeueing item");
            inner.requeue_front(item);
        }
    }
}

/// Puts the items of an unfinished batch back at the head of the queue
struct BatchGuard<'a, T> {
    queue: &'a RendezvousQueue<T>,
    items: Vec<T>,
}

impl<T> Drop for BatchGuard<'_, T> {
    fn drop(&mut self) {
        if !self.items.is_empty() {
            self.queue.lock().restore(mem::take(&mut self.items));
        }
    }
}
