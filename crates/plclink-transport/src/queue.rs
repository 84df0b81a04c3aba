use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use crossbeam_channel::{bounded, select, TryRecvError};
use tracing::trace;

use crate::error::{Result, TransportError};
use crate::traits::{ByteChunk, Receiver, Sender};

/// Bounded FIFO shared between a producer and a consumer.
///
/// Pushing never blocks: a full queue hands the item back. Popping blocks
/// up to a timeout. Clones share the same queue.
pub struct BoundedQueue<T> {
    tx: crossbeam_channel::Sender<T>,
    rx: crossbeam_channel::Receiver<T>,
    capacity: usize,
    // Nothing is ever sent here; dropping the sender marks the queue closed
    // and wakes every consumer blocked in `pop_timeout`.
    close_tx: Arc<Mutex<Option<crossbeam_channel::Sender<()>>>>,
    closed: crossbeam_channel::Receiver<()>,
}

impl<T> BoundedQueue<T> {
    /// Create a queue holding at most `capacity` items.
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        let (close_tx, closed) = bounded(0);
        Self {
            tx,
            rx,
            capacity,
            close_tx: Arc::new(Mutex::new(Some(close_tx))),
            closed,
        }
    }

    /// Maximum number of queued items.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Free slots. A closed queue reports none.
    pub fn send_capacity(&self) -> usize {
        if self.is_closed() {
            return 0;
        }
        self.capacity.saturating_sub(self.rx.len())
    }

    /// Append an item, or return it if the queue is full or closed.
    pub fn try_push(&self, item: T) -> std::result::Result<(), T> {
        if self.is_closed() {
            return Err(item);
        }
        self.tx.try_send(item).map_err(|err| err.into_inner())
    }

    /// Take the oldest item without waiting.
    pub fn try_pop(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Take the oldest item, waiting up to `timeout` for one to arrive.
    ///
    /// Items queued before [`close`](Self::close) are still returned;
    /// `Closed` is reported only once the queue is drained.
    pub fn pop_timeout(&self, timeout: Duration) -> Result<T> {
        if let Some(item) = self.try_pop() {
            return Ok(item);
        }
        select! {
            recv(self.rx) -> item => item.map_err(|_| TransportError::Closed),
            recv(self.closed) -> _ => self.try_pop().ok_or(TransportError::Closed),
            default(timeout) => Err(TransportError::Timeout(timeout)),
        }
    }

    /// Refuse further pushes and wake any waiting consumer.
    pub fn close(&self) {
        self.close_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.closed.try_recv(), Err(TryRecvError::Disconnected))
    }
}

impl<T> Clone for BoundedQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
            capacity: self.capacity,
            close_tx: Arc::clone(&self.close_tx),
            closed: self.closed.clone(),
        }
    }
}

impl<T> std::fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// One end of an in-memory serial link.
///
/// Stands in for the interrupt-fed receive mailbox and the transmit queue
/// of a UART. Dropping an end closes its transmit direction, so the peer
/// reads any remaining chunks and then sees [`TransportError::Closed`].
#[derive(Debug)]
pub struct QueueLink {
    rx: BoundedQueue<ByteChunk>,
    tx: BoundedQueue<ByteChunk>,
}

impl QueueLink {
    /// Create two connected ends, each direction holding `capacity` chunks.
    pub fn pair(capacity: usize) -> (Self, Self) {
        let a_to_b = BoundedQueue::new(capacity);
        let b_to_a = BoundedQueue::new(capacity);
        (
            Self {
                rx: b_to_a.clone(),
                tx: a_to_b.clone(),
            },
            Self {
                rx: a_to_b,
                tx: b_to_a,
            },
        )
    }

    /// Deliver a raw chunk to the peer, including any line error flag.
    pub fn deliver(&self, chunk: ByteChunk) -> Result<()> {
        self.tx.try_push(chunk).map_err(|_| TransportError::BufferFull {
            capacity: self.tx.capacity(),
        })
    }

    /// Close the transmit direction.
    pub fn close(&self) {
        self.tx.close();
    }
}

impl Receiver for QueueLink {
    fn receive(&mut self, timeout: Duration) -> Result<ByteChunk> {
        let chunk = self.rx.pop_timeout(timeout)?;
        trace!(len = chunk.len(), "chunk received");
        Ok(chunk)
    }
}

impl Sender for QueueLink {
    fn send_capacity(&self) -> usize {
        self.tx.send_capacity()
    }

    fn enqueue(&mut self, bytes: &[u8]) -> Result<()> {
        self.deliver(ByteChunk::new(Bytes::copy_from_slice(bytes)))
    }
}

impl Drop for QueueLink {
    fn drop(&mut self) {
        self.tx.close();
    }
}
