use log::{error, info};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::core_ftpcommand::utils::resolve_client_path;
use crate::helpers::{send_response, ControlWriter};
use crate::server::ServerContext;
use crate::session::Session;

pub async fn handle_dele_command(
    writer: ControlWriter,
    ctx: Arc<ServerContext>,
    session: Arc<Mutex<Session>>,
    arg: String,
) -> Result<(), std::io::Error> {
    if arg.trim().is_empty() {
        send_response(&writer, b"501 Missing file name.\r\n").await?;
        return Ok(());
    }

    let current_dir = session.lock().await.current_dir.clone();
    let fs_path = match resolve_client_path(&ctx.config, &current_dir, &arg) {
        Some((_, fs_path)) => fs_path,
        None => {
            send_response(&writer, b"550 Path is outside of the allowed area.\r\n").await?;
            return Ok(());
        }
    };

    match tokio::fs::remove_file(&fs_path).await {
        Ok(()) => {
            info!("File deleted: {:?}", fs_path);
            send_response(&writer, b"250 File deleted.\r\n").await?;
        }
        Err(e) => {
            error!("Failed to delete file {:?}: {}", fs_path, e);
            send_response(&writer, b"550 Failed to delete file.\r\n").await?;
        }
    }
    Ok(())
}
