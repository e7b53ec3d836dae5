use log::info;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::core_log::{EventSink, SessionEvent};

/// Write side of the control channel. Replies go through `send` so every
/// line is flushed and published to the event sink.
pub struct ControlConn {
    writer: OwnedWriteHalf,
    sink: Arc<dyn EventSink>,
    session_id: u64,
}

impl ControlConn {
    pub fn new(writer: OwnedWriteHalf, sink: Arc<dyn EventSink>, session_id: u64) -> Self {
        Self {
            writer,
            sink,
            session_id,
        }
    }

    pub async fn send(&mut self, message: &[u8]) -> Result<(), std::io::Error> {
        self.writer.write_all(message).await?;
        self.writer.flush().await?;

        let line = String::from_utf8_lossy(message);
        let line = line.trim_end();
        let code = line.get(..3).and_then(|c| c.parse().ok()).unwrap_or(0);
        let text = line.get(4..).unwrap_or("").to_string();
        self.sink
            .publish(self.session_id, SessionEvent::ReplySent { code, text });
        Ok(())
    }
}

pub type ControlWriter = Arc<Mutex<ControlConn>>;

/// Sends a response to the client.
pub async fn send_response(
    writer: &ControlWriter,
    message: &[u8],
) -> Result<(), std::io::Error> {
    let mut writer = writer.lock().await;
    writer.send(message).await
}

// Helper function to log configuration options
pub fn log_config(config: &Config) {
    info!("  Listen Port: {}", config.listen_port());
    info!("  Root Path: {}", config.server.root_path);
    info!("  Idle Timeout: {}s", config.idle_timeout().as_secs());
    match config.server.pasv_port_range {
        Some((lo, hi)) => info!("  PASV Port Range: {}-{}", lo, hi),
        None => info!("  PASV Port Range: OS-chosen"),
    }
    if let Some(addr) = &config.server.pasv_address {
        info!("  PASV Address: {}", addr);
    }
    info!(
        "  Upload Buffer Size: {} KB",
        config.upload_buffer_size() / 1024
    );
    info!(
        "  Download Buffer Size: {} KB",
        config.download_buffer_size() / 1024
    );
}
