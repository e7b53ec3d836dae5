use std::sync::Arc;
use tokio::sync::Mutex;

use crate::core_ftpcommand::utils::resolve_client_path;
use crate::helpers::{send_response, ControlWriter};
use crate::server::ServerContext;
use crate::session::Session;

/// Handles the RNFR (Rename From) FTP command.
///
/// Records the source path for the rename when it exists. The recorded
/// path is consumed by an immediately following RNTO and discarded by any
/// other command.
pub async fn handle_rnfr_command(
    writer: ControlWriter,
    ctx: Arc<ServerContext>,
    session: Arc<Mutex<Session>>,
    arg: String,
) -> Result<(), std::io::Error> {
    if arg.trim().is_empty() {
        session.lock().await.rename_from = None;
        send_response(&writer, b"501 Missing file name.\r\n").await?;
        return Ok(());
    }

    let mut session = session.lock().await;
    let resolved = resolve_client_path(&ctx.config, &session.current_dir, &arg);

    match resolved {
        Some((virtual_path, fs_path)) if fs_path.exists() => {
            session.rename_from = Some(virtual_path);
            drop(session);
            send_response(&writer, b"350 Ready for RNTO.\r\n").await?;
        }
        Some(_) => {
            session.rename_from = None;
            drop(session);
            send_response(&writer, b"550 File not found.\r\n").await?;
        }
        None => {
            session.rename_from = None;
            drop(session);
            send_response(&writer, b"550 Path is outside of the allowed area.\r\n").await?;
        }
    }
    Ok(())
}
