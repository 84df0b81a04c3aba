use plclink_frame::{Event, Frame, Message};
use plclink_transport::BoundedQueue;
use tracing::{trace, warn};

/// Logical message handed to the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Ack,
    Nak { code: Option<u8> },
    Data(Message),
    /// Something went wrong on the line. Details go to the fault register.
    Error,
}

impl Inbound {
    /// Reduce a reassembler event to what the application sees.
    pub fn from_event(event: Event) -> Self {
        match event {
            Ok(Frame::Ack) => Inbound::Ack,
            Ok(Frame::Nak { code }) => Inbound::Nak { code },
            Ok(Frame::Data {
                msg_type, payload, ..
            }) => Inbound::Data(Message { msg_type, payload }),
            Err(_) => Inbound::Error,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Inbound::Ack => "ack",
            Inbound::Nak { .. } => "nak",
            Inbound::Data(_) => "data",
            Inbound::Error => "error",
        }
    }
}

/// Destination for dispatched messages.
///
/// Capacity is counted in messages. `enqueue` must not block.
pub trait Mailbox {
    /// Messages that can be accepted right now.
    fn send_capacity(&self) -> usize;

    /// Queue a message, handing it back if there is no room.
    fn enqueue(&self, message: Inbound) -> std::result::Result<(), Inbound>;
}

impl Mailbox for BoundedQueue<Inbound> {
    fn send_capacity(&self) -> usize {
        BoundedQueue::send_capacity(self)
    }

    fn enqueue(&self, message: Inbound) -> std::result::Result<(), Inbound> {
        self.try_push(message)
    }
}

impl<M: Mailbox + ?Sized> Mailbox for &M {
    fn send_capacity(&self) -> usize {
        (**self).send_capacity()
    }

    fn enqueue(&self, message: Inbound) -> std::result::Result<(), Inbound> {
        (**self).enqueue(message)
    }
}

/// What happened to a dispatched message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// The mailbox was full. The message is gone.
    Dropped,
}

/// Hand one reassembler result to `destination`.
///
/// Never blocks and never retries. A full mailbox drops the message.
pub fn dispatch<M: Mailbox + ?Sized>(event: Event, destination: &M) -> Delivery {
    let message = Inbound::from_event(event);

    if destination.send_capacity() == 0 {
        warn!(kind = message.kind(), "mailbox full, message dropped");
        return Delivery::Dropped;
    }

    match destination.enqueue(message) {
        Ok(()) => {
            trace!("message dispatched");
            Delivery::Delivered
        }
        Err(message) => {
            warn!(kind = message.kind(), "mailbox full, message dropped");
            Delivery::Dropped
        }
    }
}
