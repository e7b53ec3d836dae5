use log::{debug, info};

use super::events::{EventSink, SessionEvent};

/// Default sink: forwards session events to the `log` facade.
pub struct LogSink;

impl EventSink for LogSink {
    fn publish(&self, session_id: u64, event: SessionEvent) {
        match event {
            SessionEvent::Connected { peer } => {
                info!("[session {}] new connection from {}", session_id, peer);
            }
            SessionEvent::CommandReceived { verb, arg } => {
                if arg.is_empty() {
                    info!("[session {}] received: {}", session_id, verb);
                } else {
                    info!("[session {}] received: {} {}", session_id, verb, arg);
                }
            }
            SessionEvent::ReplySent { code, text } => {
                debug!("[session {}] sent: {} {}", session_id, code, text);
            }
            SessionEvent::TransferStarted { path } => {
                info!("[session {}] transfer started: {}", session_id, path);
            }
            SessionEvent::TransferFinished { path, bytes, ok } => {
                info!(
                    "[session {}] transfer {}: {} ({} bytes)",
                    session_id,
                    if ok { "complete" } else { "aborted" },
                    path,
                    bytes
                );
            }
            SessionEvent::Disconnected => {
                info!("[session {}] connection closed", session_id);
            }
        }
    }
}
