use bytes::{BufMut, BytesMut};
use plclink_transport::ByteChunk;
use tracing::{debug, warn};

use crate::checksum::{self, CHECKSUM_DIGITS};
use crate::codec::{Frame, FrameConfig};
use crate::control::{is_control, ACK, NAK, STX};
use crate::error::ProtocolError;

/// Outcome of one complete frame or one detected fault in the stream.
pub type Event = Result<Frame, ProtocolError>;

#[derive(Debug)]
enum State {
    Idle,
    /// Bytes after STX: type, payload, checksum digits.
    InFrame(BytesMut),
}

/// Rebuilds frames from received byte chunks.
///
/// Each serial channel owns its own reassembler. Data frames have no end
/// delimiter: a frame completes once `config.frame_len()` bytes have
/// followed STX, and is then checksum-verified.
#[derive(Debug)]
pub struct Reassembler {
    state: State,
    config: FrameConfig,
}

impl Reassembler {
    pub fn new(config: FrameConfig) -> Self {
        Self {
            state: State::Idle,
            config,
        }
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// True when no data frame is in progress.
    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::Idle)
    }

    /// Drop any partial frame. Returns true if one was in progress.
    pub fn abandon(&mut self) -> bool {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Idle => false,
            State::InFrame(buf) => {
                debug!(received = buf.len(), "partial frame discarded");
                true
            }
        }
    }

    /// Process one chunk from the transport.
    ///
    /// A chunk flagged with a line error is not trusted: the partial frame
    /// is dropped and the error is the only event.
    pub fn feed(&mut self, chunk: &ByteChunk) -> Vec<Event> {
        if let Some(line_error) = chunk.line_error {
            self.abandon();
            warn!(%line_error, len = chunk.len(), "serial line error");
            return vec![Err(ProtocolError::Line(line_error))];
        }
        self.feed_bytes(&chunk.bytes)
    }

    /// Process raw bytes, returning completed frames and errors in arrival order.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Vec<Event> {
        let mut events = Vec::new();
        // A run of stray bytes between frames is reported once.
        let mut in_noise = false;
        let mut i = 0usize;

        while i < bytes.len() {
            let byte = bytes[i];
            i += 1;

            match byte {
                ACK => {
                    self.abandon();
                    in_noise = false;
                    events.push(Ok(Frame::Ack));
                }
                NAK => {
                    self.abandon();
                    in_noise = false;
                    let code = match bytes.get(i) {
                        Some(&next) if !is_control(next) => {
                            i += 1;
                            Some(next)
                        }
                        _ => None,
                    };
                    events.push(Ok(Frame::Nak { code }));
                }
                STX => {
                    if self.abandon() {
                        debug!("STX inside frame, restarting");
                    }
                    in_noise = false;
                    self.state = State::InFrame(BytesMut::with_capacity(self.config.frame_len()));
                }
                _ => match &mut self.state {
                    State::Idle => {
                        if !in_noise {
                            debug!(byte, "byte outside frame");
                            events.push(Err(ProtocolError::UnknownFrameType(byte)));
                            in_noise = true;
                        }
                    }
                    State::InFrame(buf) => {
                        buf.put_u8(byte);
                        if buf.len() >= self.config.frame_len() {
                            let body = std::mem::take(buf);
                            self.state = State::Idle;
                            events.push(complete(body));
                        }
                    }
                },
            }
        }

        events
    }
}

fn complete(mut body: BytesMut) -> Event {
    let digits = body.split_off(body.len() - CHECKSUM_DIGITS);
    let body = body.freeze();
    let msg_type = body[0];
    let payload = body.slice(1..);
    let computed = checksum::compute(msg_type, &payload);

    if !checksum::verify(msg_type, &payload, &digits) {
        let claimed = String::from_utf8_lossy(&digits).into_owned();
        warn!(msg_type, computed, %claimed, "checksum mismatch");
        return Err(ProtocolError::ChecksumMismatch { computed, claimed });
    }

    Ok(Frame::Data {
        msg_type,
        payload,
        checksum: computed,
    })
}
