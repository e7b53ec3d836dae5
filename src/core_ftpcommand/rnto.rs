use log::{error, info};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::core_ftpcommand::utils::{resolve_client_path, to_filesystem};
use crate::helpers::{send_response, ControlWriter};
use crate::server::ServerContext;
use crate::session::Session;

/// Handles the RNTO (Rename To) FTP command.
///
/// Valid only when the immediately preceding command was a successful
/// RNFR; the pending path is consumed either way.
pub async fn handle_rnto_command(
    writer: ControlWriter,
    ctx: Arc<ServerContext>,
    session: Arc<Mutex<Session>>,
    arg: String,
) -> Result<(), std::io::Error> {
    let (from_virtual, current_dir) = {
        let mut session = session.lock().await;
        let from = session.rename_from.take();
        (from, session.current_dir.clone())
    };

    let from_virtual = match from_virtual {
        Some(path) => path,
        None => {
            send_response(&writer, b"503 RNFR required first.\r\n").await?;
            return Ok(());
        }
    };

    if arg.trim().is_empty() {
        send_response(&writer, b"501 Missing file name.\r\n").await?;
        return Ok(());
    }

    let to_path = match resolve_client_path(&ctx.config, &current_dir, &arg) {
        Some((_, fs_path)) => fs_path,
        None => {
            send_response(&writer, b"550 Path is outside of the allowed area.\r\n").await?;
            return Ok(());
        }
    };
    let from_path = to_filesystem(Path::new(&ctx.config.server.root_path), &from_virtual);

    // Renaming over an existing entry is refused rather than clobbering it.
    if to_path.exists() {
        send_response(&writer, b"550 Failed to rename file.\r\n").await?;
        return Ok(());
    }

    match tokio::fs::rename(&from_path, &to_path).await {
        Ok(()) => {
            info!("Renamed {:?} to {:?}", from_path, to_path);
            send_response(&writer, b"250 File renamed.\r\n").await?;
        }
        Err(e) => {
            error!("Failed to rename {:?} to {:?}: {}", from_path, to_path, e);
            send_response(&writer, b"550 Failed to rename file.\r\n").await?;
        }
    }
    Ok(())
}
