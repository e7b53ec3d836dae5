use log::{error, info, warn};
use std::sync::Arc;
use tokio::fs::File;
use tokio::sync::Mutex;

use crate::core_ftpcommand::utils::resolve_client_path;
use crate::core_log::SessionEvent;
use crate::core_network::data;
use crate::helpers::{send_response, ControlWriter};
use crate::server::ServerContext;
use crate::session::Session;

/// Handles the RETR (Retrieve File) FTP command.
///
/// Sends the resolved file over the data channel armed by the preceding
/// PORT or PASV. The file is opened before the channel is established so
/// a missing file costs the client nothing but a 550.
pub async fn handle_retr_command(
    writer: ControlWriter,
    ctx: Arc<ServerContext>,
    session: Arc<Mutex<Session>>,
    arg: String,
) -> Result<(), std::io::Error> {
    if arg.trim().is_empty() {
        send_response(&writer, b"501 Missing file name.\r\n").await?;
        return Ok(());
    }

    if !session.lock().await.has_data_channel() {
        send_response(&writer, b"425 Can't open data connection.\r\n").await?;
        return Ok(());
    }

    let current_dir = session.lock().await.current_dir.clone();
    let (virtual_path, fs_path) = match resolve_client_path(&ctx.config, &current_dir, &arg) {
        Some(resolved) => resolved,
        None => {
            send_response(&writer, b"550 Path is outside of the allowed area.\r\n").await?;
            return Ok(());
        }
    };

    let mut file = match File::open(&fs_path).await {
        Ok(file) => file,
        Err(e) => {
            warn!("RETR failed to open {:?}: {}", fs_path, e);
            send_response(&writer, b"550 Failed to open file.\r\n").await?;
            return Ok(());
        }
    };

    let (channel, session_id) = {
        let mut session = session.lock().await;
        (session.take_data_channel(), session.id)
    };
    let channel = match channel {
        Some(channel) => channel,
        None => {
            send_response(&writer, b"425 Can't open data connection.\r\n").await?;
            return Ok(());
        }
    };

    let mut stream = match channel.establish().await {
        Ok(stream) => stream,
        Err(e) => {
            error!("RETR data connection failed: {}", e);
            send_response(&writer, e.to_reply()).await?;
            return Ok(());
        }
    };

    send_response(
        &writer,
        b"150 Opening data connection for file download.\r\n",
    )
    .await?;
    ctx.sink.publish(
        session_id,
        SessionEvent::TransferStarted {
            path: virtual_path.clone(),
        },
    );

    match data::send_file(&mut stream, &mut file, ctx.config.download_buffer_size()).await {
        Ok(bytes) => {
            info!("File sent: {:?} ({} bytes)", fs_path, bytes);
            send_response(&writer, b"226 Transfer complete.\r\n").await?;
            ctx.sink.publish(
                session_id,
                SessionEvent::TransferFinished {
                    path: virtual_path,
                    bytes,
                    ok: true,
                },
            );
        }
        Err(e) => {
            error!("RETR transfer failed for {:?}: {}", fs_path, e);
            send_response(&writer, e.to_reply()).await?;
            ctx.sink.publish(
                session_id,
                SessionEvent::TransferFinished {
                    path: virtual_path,
                    bytes: 0,
                    ok: false,
                },
            );
        }
    }

    Ok(())
}
