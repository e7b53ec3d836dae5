use log::{error, info};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::core_ftpcommand::utils::resolve_client_path;
use crate::helpers::{send_response, ControlWriter};
use crate::server::ServerContext;
use crate::session::Session;

pub async fn handle_mkd_command(
    writer: ControlWriter,
    ctx: Arc<ServerContext>,
    session: Arc<Mutex<Session>>,
    arg: String,
) -> Result<(), std::io::Error> {
    if arg.trim().is_empty() {
        send_response(&writer, b"501 Missing directory name.\r\n").await?;
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

    match tokio::fs::create_dir(&fs_path).await {
        Ok(()) => {
            info!("Directory created: {:?}", fs_path);
            let response = format!("257 \"{}\" created\r\n", virtual_path);
            send_response(&writer, response.as_bytes()).await?;
        }
        Err(e) => {
            error!("Failed to create directory {:?}: {}", fs_path, e);
            send_response(&writer, b"550 Failed to create directory.\r\n").await?;
        }
    }
    Ok(())
}
