use log::{info, warn};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::helpers::{send_response, ControlWriter};
use crate::server::ServerContext;
use crate::session::Session;

/// Handles the PASS FTP command, completing the USER handshake against the
/// server's auth predicate. Out-of-order PASS is a sequencing error; a
/// failed login drops back to the pre-USER state so the client can retry.
pub async fn handle_pass_command(
    writer: ControlWriter,
    ctx: Arc<ServerContext>,
    session: Arc<Mutex<Session>>,
    arg: String,
) -> Result<(), std::io::Error> {
    let authenticated = {
        let mut session = session.lock().await;
        if !session.awaiting_password {
            drop(session);
            send_response(&writer, b"503 Bad sequence of commands.\r\n").await?;
            return Ok(());
        }
        session.awaiting_password = false;

        let username = session.username.clone().unwrap_or_default();
        let ok = ctx.auth.authenticate(&username, &arg);
        session.is_authenticated = ok;
        if ok {
            info!("User {} logged in", username);
        } else {
            warn!("Login incorrect for user {}", username);
        }
        ok
    };

    if authenticated {
        send_response(&writer, b"230 User logged in, proceed.\r\n").await?;
    } else {
        send_response(&writer, b"530 Login incorrect.\r\n").await?;
    }
    Ok(())
}
