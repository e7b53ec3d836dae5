use std::sync::Arc;
use tokio::sync::Mutex;

use crate::helpers::{send_response, ControlWriter};
use crate::server::ServerContext;
use crate::session::{Session, TransferType};

/// Handles the TYPE FTP command. Accepted representation types are
/// `A`/`A N` and `I`/`L 8`; everything else is unimplemented.
pub async fn handle_type_command(
    writer: ControlWriter,
    _ctx: Arc<ServerContext>,
    session: Arc<Mutex<Session>>,
    arg: String,
) -> Result<(), std::io::Error> {
    match arg.trim().to_ascii_uppercase().as_str() {
        "A" | "A N" => {
            session.lock().await.transfer_type = TransferType::Ascii;
            send_response(&writer, b"200 Type set to ASCII.\r\n").await?;
        }
        "I" | "L 8" => {
            session.lock().await.transfer_type = TransferType::Binary;
            send_response(&writer, b"200 Type set to Binary.\r\n").await?;
        }
        _ => {
            send_response(&writer, b"504 Type not implemented.\r\n").await?;
        }
    }
    Ok(())
}
