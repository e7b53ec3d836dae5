use std::net::SocketAddr;

/// Per-session protocol events, published to the configured sink.
///
/// Sinks must tolerate concurrent publication from many sessions.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Connected { peer: SocketAddr },
    CommandReceived { verb: String, arg: String },
    ReplySent { code: u16, text: String },
    TransferStarted { path: String },
    TransferFinished { path: String, bytes: u64, ok: bool },
    Disconnected,
}

pub trait EventSink: Send + Sync {
    fn publish(&self, session_id: u64, event: SessionEvent);
}
