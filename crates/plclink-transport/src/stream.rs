use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::error::{Result, TransportError};
use crate::traits::{ByteChunk, Receiver, Sender};

// `set_read_timeout` rejects a zero duration.
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// Buffer sizes for a [`StreamPort`].
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Largest chunk returned by one receive. Default: 64 bytes.
    pub read_chunk: usize,
    /// Frames that can wait in the transmit queue. Default: 16.
    pub tx_slots: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            read_chunk: 64,
            tx_slots: 16,
        }
    }
}

/// Streams whose blocking reads can be bounded by a timeout.
pub trait ReadTimeout {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()>;
}

#[cfg(unix)]
impl ReadTimeout for std::os::unix::net::UnixStream {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()> {
        std::os::unix::net::UnixStream::set_read_timeout(self, timeout)
    }
}

impl ReadTimeout for std::net::TcpStream {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()> {
        std::net::TcpStream::set_read_timeout(self, timeout)
    }
}

/// A byte stream (typically a socket bridged to a serial tty) driven as a
/// half-duplex serial port.
///
/// Outgoing frames wait in a bounded queue and go out on [`flush`](Sender::flush)
/// or, at the latest, when the port turns around to receive.
pub struct StreamPort<T> {
    inner: T,
    pending: VecDeque<Bytes>,
    config: StreamConfig,
}

impl<T: Read + Write> StreamPort<T> {
    /// Wrap a stream with default buffer sizes.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, StreamConfig::default())
    }

    /// Wrap a stream with explicit buffer sizes.
    pub fn with_config(inner: T, config: StreamConfig) -> Self {
        Self {
            inner,
            pending: VecDeque::with_capacity(config.tx_slots),
            config,
        }
    }

    /// Frames queued but not yet written.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the port and return the inner stream. Unflushed frames are lost.
    pub fn into_inner(self) -> T {
        self.inner
    }

    fn write_pending(&mut self) -> Result<()> {
        while let Some(frame) = self.pending.front() {
            let mut offset = 0usize;
            while offset < frame.len() {
                match self.inner.write(&frame[offset..]) {
                    Ok(0) => return Err(TransportError::Closed),
                    Ok(n) => offset += n,
                    Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                    Err(err) => return Err(TransportError::Io(err)),
                }
            }
            trace!(len = frame.len(), "frame written");
            self.pending.pop_front();
        }
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }
}

#[cfg(unix)]
impl StreamPort<std::os::unix::net::UnixStream> {
    /// Connect to a serial bridge listening on a Unix domain socket.
    pub fn connect_unix(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let stream =
            std::os::unix::net::UnixStream::connect(path).map_err(|e| TransportError::Connect {
                path: path.to_path_buf(),
                source: e,
            })?;
        debug!(?path, "connected to serial bridge");
        Ok(Self::new(stream))
    }
}

impl<T: Read + Write + ReadTimeout> Receiver for StreamPort<T> {
    fn receive(&mut self, timeout: Duration) -> Result<ByteChunk> {
        // Half duplex: the line is ours until the queued frames are out.
        self.write_pending()?;
        self.inner
            .set_read_timeout(Some(timeout.max(MIN_READ_TIMEOUT)))?;

        let mut buf = vec![0u8; self.config.read_chunk.max(1)];
        loop {
            match self.inner.read(&mut buf) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => {
                    buf.truncate(n);
                    return Ok(ByteChunk::new(buf));
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    return Err(TransportError::Timeout(timeout));
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }
}

impl<T: Read + Write> Sender for StreamPort<T> {
    fn send_capacity(&self) -> usize {
        self.config.tx_slots.saturating_sub(self.pending.len())
    }

    fn enqueue(&mut self, bytes: &[u8]) -> Result<()> {
        if self.send_capacity() == 0 {
            return Err(TransportError::BufferFull {
                capacity: self.config.tx_slots,
            });
        }
        self.pending.push_back(Bytes::copy_from_slice(bytes));
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.write_pending()
    }
}

impl<T> std::fmt::Debug for StreamPort<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamPort")
            .field("pending", &self.pending.len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::{Read, Write};
    use std::os::unix::net::UnixStream;

    use super::*;

    #[test]
    fn receive_returns_available_bytes() {
        let (left, mut right) = UnixStream::pair().unwrap();
        let mut port = StreamPort::new(left);

        right.write_all(b"\x02abc").unwrap();
        let chunk = port.receive(Duration::from_millis(200)).unwrap();
        assert_eq!(chunk.bytes.as_ref(), b"\x02abc");
        assert_eq!(chunk.line_error, None);
    }

    #[test]
    fn receive_times_out_on_silent_line() {
        let (left, _right) = UnixStream::pair().unwrap();
        let mut port = StreamPort::new(left);

        let err = port.receive(Duration::from_millis(10)).unwrap_err();
        assert!(matches!(err, TransportError::Timeout(_)));
    }

    #[test]
    fn receive_reports_closed_peer() {
        let (left, right) = UnixStream::pair().unwrap();
        let mut port = StreamPort::new(left);
        drop(right);

        let err = port.receive(Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }

    #[test]
    fn read_chunk_bounds_chunk_size() {
        let (left, mut right) = UnixStream::pair().unwrap();
        let mut port = StreamPort::with_config(
            left,
            StreamConfig {
                read_chunk: 2,
                ..StreamConfig::default()
            },
        );

        right.write_all(b"\x06\x15\x06").unwrap();
        let first = port.receive(Duration::from_millis(200)).unwrap();
        let second = port.receive(Duration::from_millis(200)).unwrap();
        assert_eq!(first.bytes.as_ref(), b"\x06\x15");
        assert_eq!(second.bytes.as_ref(), b"\x06");
    }

    #[test]
    fn enqueue_respects_tx_slots() {
        let (left, _right) = UnixStream::pair().unwrap();
        let mut port = StreamPort::with_config(
            left,
            StreamConfig {
                tx_slots: 1,
                ..StreamConfig::default()
            },
        );

        port.enqueue(b"\x06").unwrap();
        assert_eq!(port.send_capacity(), 0);
        assert!(matches!(
            port.enqueue(b"\x06"),
            Err(TransportError::BufferFull { capacity: 1 })
        ));
    }

    #[test]
    fn flush_writes_queued_frames_in_order() {
        let (left, mut right) = UnixStream::pair().unwrap();
        let mut port = StreamPort::new(left);

        port.enqueue(b"\x06").unwrap();
        port.enqueue(b"\x15").unwrap();
        assert_eq!(port.pending(), 2);
        port.flush().unwrap();
        assert_eq!(port.pending(), 0);

        let mut buf = [0u8; 2];
        right.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"\x06\x15");
    }

    #[test]
    fn receive_flushes_before_listening() {
        let (left, mut right) = UnixStream::pair().unwrap();
        let mut port = StreamPort::new(left);

        port.enqueue(b"\x06").unwrap();
        let _ = port.receive(Duration::from_millis(5));

        let mut buf = [0u8; 1];
        right.read_exact(&mut buf).unwrap();
        assert_eq!(buf[0], 0x06);
    }

    #[test]
    fn connect_unix_reports_missing_path() {
        let err = StreamPort::connect_unix("/nonexistent/plclink-test.sock").unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
    }
}
