/// Errors that can occur on a PLC link.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] plclink_transport::TransportError),

    /// Framing error that could not be reported through the mailbox.
    #[error("protocol error: {0}")]
    Protocol(#[from] plclink_frame::ProtocolError),

    /// The fault register refused an update.
    #[error("fault register error: {0}")]
    Fault(#[from] plclink_fault::FaultError),
}

pub type Result<T> = std::result::Result<T, LinkError>;
