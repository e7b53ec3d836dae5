use std::sync::Arc;
use tokio::sync::Mutex;

use crate::helpers::{send_response, ControlWriter};
use crate::server::ServerContext;
use crate::session::Session;

pub async fn handle_user_command(
    writer: ControlWriter,
    _ctx: Arc<ServerContext>,
    session: Arc<Mutex<Session>>,
    arg: String,
) -> Result<(), std::io::Error> {
    {
        let mut session = session.lock().await;
        session.username = Some(arg);
        session.is_authenticated = false;
        session.awaiting_password = true;
    }
    send_response(&writer, b"331 User name okay, need password.\r\n").await?;
    Ok(())
}
