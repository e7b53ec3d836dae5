use log::info;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::core_network::data::DataChannel;
use crate::helpers::{send_response, ControlWriter};
use crate::server::ServerContext;
use crate::session::Session;

/// Parses the PORT argument: six comma-separated decimal fields, each in
/// 0..=255, port = p1*256 + p2. Anything else is a syntax error.
pub fn parse_port_argument(arg: &str) -> Option<SocketAddr> {
    let parts: Vec<&str> = arg.split(',').collect();
    if parts.len() != 6 {
        return None;
    }

    let mut fields = [0u8; 6];
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        fields[i] = part.parse::<u8>().ok()?;
    }

    let ip = Ipv4Addr::new(fields[0], fields[1], fields[2], fields[3]);
    let port = (u16::from(fields[4]) << 8) | u16::from(fields[5]);
    Some(SocketAddr::new(IpAddr::V4(ip), port))
}

/// Handles the PORT (Active Mode) FTP command.
///
/// Records the client-supplied endpoint; the connection itself is made by
/// the next transfer command.
pub async fn handle_port_command(
    writer: ControlWriter,
    _ctx: Arc<ServerContext>,
    session: Arc<Mutex<Session>>,
    arg: String,
) -> Result<(), std::io::Error> {
    let addr = match parse_port_argument(arg.trim()) {
        Some(addr) => addr,
        None => {
            send_response(&writer, b"501 Invalid PORT command.\r\n").await?;
            return Ok(());
        }
    };

    info!("PORT endpoint set to {}", addr);
    {
        let mut session = session.lock().await;
        session.set_data_channel(DataChannel::Active { addr });
    }
    send_response(&writer, b"200 PORT command successful.\r\n").await?;
    Ok(())
}
