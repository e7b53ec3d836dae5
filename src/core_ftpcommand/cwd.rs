use std::sync::Arc;
use tokio::sync::Mutex;

use crate::core_ftpcommand::utils::resolve_client_path;
use crate::helpers::{send_response, ControlWriter};
use crate::server::ServerContext;
use crate::session::Session;

/// Handles the CWD FTP command. The working directory only moves when the
/// target resolves inside the root and exists on disk; on failure it is
/// left unchanged.
pub async fn handle_cwd_command(
    writer: ControlWriter,
    ctx: Arc<ServerContext>,
    session: Arc<Mutex<Session>>,
    arg: String,
) -> Result<(), std::io::Error> {
    let mut session = session.lock().await;

    let (virtual_path, fs_path) =
        match resolve_client_path(&ctx.config, &session.current_dir, &arg) {
            Some(resolved) => resolved,
            None => {
                drop(session);
                send_response(&writer, b"550 Path is outside of the allowed area.\r\n").await?;
                return Ok(());
            }
        };

    if fs_path.is_dir() {
        session.current_dir = virtual_path.clone();
        drop(session);
        let response = format!("250 Directory changed to {}.\r\n", virtual_path);
        send_response(&writer, response.as_bytes()).await?;
    } else {
        drop(session);
        send_response(&writer, b"550 Directory not found.\r\n").await?;
    }
    Ok(())
}
