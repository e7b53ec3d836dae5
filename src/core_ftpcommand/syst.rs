use crate::helpers::{send_response, ControlWriter};

pub async fn handle_syst_command(writer: ControlWriter) -> Result<(), std::io::Error> {
    send_response(&writer, b"215 UNIX Type: L8\r\n").await?;
    Ok(())
}
