use std::collections::VecDeque;
use std::time::{Duration, Instant};

use plclink_transport::{Receiver, TransportError};

use crate::codec::{Frame, FrameConfig};
use crate::error::{ProtocolError, Result};
use crate::reassembler::{Event, Reassembler};

/// Reads complete frames from a [`Receiver`].
///
/// Handles partial chunks internally. Callers get one frame or one error
/// per call, in arrival order.
pub struct FrameReader<R> {
    inner: R,
    reassembler: Reassembler,
    ready: VecDeque<Event>,
}

impl<R: Receiver> FrameReader<R> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: R) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: R, config: FrameConfig) -> Self {
        Self {
            inner,
            reassembler: Reassembler::new(config),
            ready: VecDeque::new(),
        }
    }

    /// Read the next frame (blocking up to `receive_timeout`).
    ///
    /// On timeout the partial frame is dropped and `ProtocolError::Timeout`
    /// returned; the next call starts clean. A transport that closes with a
    /// frame half received also reports `Timeout` once, since that frame can
    /// never complete; the following call sees the close. Other transport
    /// failures drop the partial frame.
    pub fn read_frame(&mut self) -> Result<Frame> {
        let timeout = self.reassembler.config().receive_timeout;
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(event) = self.ready.pop_front() {
                return event;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(self.timed_out(timeout));
            }

            match self.inner.receive(remaining) {
                Ok(chunk) => {
                    let events = self.reassembler.feed(&chunk);
                    self.ready.extend(events);
                }
                Err(TransportError::Timeout(_)) => return Err(self.timed_out(timeout)),
                Err(TransportError::Closed) if !self.reassembler.is_idle() => {
                    return Err(self.timed_out(timeout));
                }
                Err(err) => {
                    self.reassembler.abandon();
                    return Err(ProtocolError::Transport(err));
                }
            }
        }
    }

    fn timed_out(&mut self, timeout: Duration) -> ProtocolError {
        self.reassembler.abandon();
        ProtocolError::Timeout(timeout)
    }

    /// Borrow the underlying receiver.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Mutably borrow the underlying receiver.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Consume the reader and return the inner receiver.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Update the per-frame receive timeout. Drops any partial frame.
    pub fn set_receive_timeout(&mut self, timeout: Duration) {
        let config = FrameConfig {
            receive_timeout: timeout,
            ..self.reassembler.config().clone()
        };
        self.reassembler = Reassembler::new(config);
        self.ready.clear();
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        self.reassembler.config()
    }

    /// True when no frame is half received and no events are buffered.
    pub fn is_idle(&self) -> bool {
        self.ready.is_empty() && self.reassembler.is_idle()
    }
}

impl<R> std::fmt::Debug for FrameReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameReader")
            .field("reassembler", &self.reassembler)
            .field("buffered", &self.ready.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use bytes::Bytes;
    use plclink_transport::{ByteChunk, LineError, QueueLink, Sender};

    use super::*;
    use crate::codec::format_outgoing;
    use crate::control::STX;

    fn short_timeout() -> FrameConfig {
        FrameConfig {
            receive_timeout: Duration::from_millis(30),
            ..FrameConfig::default()
        }
    }

    fn wire(msg_type: u8, payload: &'static [u8]) -> Bytes {
        format_outgoing(
            &Frame::data(msg_type, Bytes::from_static(payload)),
            &FrameConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn read_single_frame() {
        let (mut plc, acu) = QueueLink::pair(8);
        plc.enqueue(&wire(0x31, b"1234567")).unwrap();

        let mut reader = FrameReader::with_config(acu, short_timeout());
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame, Frame::data(0x31, Bytes::from_static(b"1234567")));
        assert!(reader.is_idle());
    }

    #[test]
    fn read_frame_delivered_byte_by_byte() {
        let (mut plc, acu) = QueueLink::pair(32);
        for byte in wire(0x31, b"1234567").iter() {
            plc.enqueue(&[*byte]).unwrap();
        }

        let mut reader = FrameReader::with_config(acu, short_timeout());
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.into_message().unwrap().payload.as_ref(), b"1234567");
    }

    #[test]
    fn buffered_events_returned_one_per_call() {
        let (mut plc, acu) = QueueLink::pair(8);
        let mut chunk = wire(0x31, b"1111111").to_vec();
        chunk.extend_from_slice(&wire(0x32, b"2222222"));
        plc.enqueue(&chunk).unwrap();

        let mut reader = FrameReader::with_config(acu, short_timeout());
        let first = reader.read_frame().unwrap().into_message().unwrap();
        let second = reader.read_frame().unwrap().into_message().unwrap();
        assert_eq!((first.msg_type, second.msg_type), (0x31, 0x32));
    }

    #[test]
    fn timeout_discards_partial_frame() {
        let (mut plc, acu) = QueueLink::pair(8);
        plc.enqueue(&[STX, 0x31, b'1', b'2']).unwrap();

        let mut reader = FrameReader::with_config(acu, short_timeout());
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, ProtocolError::Timeout(_)));
        assert!(reader.is_idle());

        plc.enqueue(&wire(0x33, b"abcdefg")).unwrap();
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.into_message().unwrap().msg_type, 0x33);
    }

    #[test]
    fn timeout_on_silent_line() {
        let (_plc, acu) = QueueLink::pair(8);
        let mut reader = FrameReader::with_config(acu, short_timeout());

        let started = Instant::now();
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, ProtocolError::Timeout(t) if t == Duration::from_millis(30)));
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn frame_arriving_from_other_thread() {
        let (mut plc, acu) = QueueLink::pair(8);
        let writer = thread::spawn(move || {
            let bytes = wire(0x31, b"1234567");
            let (head, tail) = bytes.split_at(4);
            plc.enqueue(head).unwrap();
            thread::sleep(Duration::from_millis(10));
            plc.enqueue(tail).unwrap();
            plc
        });

        let mut reader = FrameReader::with_config(
            acu,
            FrameConfig {
                receive_timeout: Duration::from_secs(5),
                ..FrameConfig::default()
            },
        );
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.kind(), "data");
        let _plc = writer.join().unwrap();
    }

    #[test]
    fn line_error_surfaces_as_protocol_error() {
        let (plc, acu) = QueueLink::pair(8);
        plc.deliver(ByteChunk::with_error(&b"\xFF"[..], LineError::Overrun))
            .unwrap();

        let mut reader = FrameReader::with_config(acu, short_timeout());
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, ProtocolError::Line(LineError::Overrun)));
    }

    #[test]
    fn closed_transport_propagates() {
        let (plc, acu) = QueueLink::pair(8);
        drop(plc);

        let mut reader = FrameReader::with_config(acu, short_timeout());
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Transport(TransportError::Closed)
        ));
    }

    #[test]
    fn close_mid_frame_reports_timeout_then_close() {
        let (mut plc, acu) = QueueLink::pair(8);
        plc.enqueue(&[STX, 0x31, b'A', b'B']).unwrap();
        drop(plc);

        let mut reader = FrameReader::with_config(acu, short_timeout());
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, ProtocolError::Timeout(_)));
        assert!(reader.is_idle());
        assert!(matches!(
            reader.read_frame().unwrap_err(),
            ProtocolError::Transport(TransportError::Closed)
        ));
    }

    #[test]
    fn set_receive_timeout_keeps_payload_len() {
        let (_plc, acu) = QueueLink::pair(1);
        let mut reader = FrameReader::with_config(acu, FrameConfig::with_payload_len(3));
        reader.set_receive_timeout(Duration::from_millis(5));

        assert_eq!(reader.config().payload_len, 3);
        assert_eq!(reader.config().receive_timeout, Duration::from_millis(5));
    }
}
