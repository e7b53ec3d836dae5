use crate::helpers::{send_response, ControlWriter};

pub async fn handle_quit_command(writer: ControlWriter) -> Result<(), std::io::Error> {
    send_response(&writer, b"221 Goodbye.\r\n").await?;
    Ok(())
}
