use log::{debug, error, warn};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::core_network::data::DataChannel;
use crate::helpers::{send_response, ControlWriter};
use crate::server::ServerContext;
use crate::session::Session;

/// Handles the PASV (Passive Mode) FTP command.
///
/// Binds a fresh listener, advertises its endpoint in the 227 reply, and
/// arms the session's data channel. The listener accepts a single
/// connection when the next transfer command runs.
pub async fn handle_pasv_command(
    writer: ControlWriter,
    ctx: Arc<ServerContext>,
    session: Arc<Mutex<Session>>,
    _arg: String,
) -> Result<(), std::io::Error> {
    let listener = match bind_pasv_listener(&ctx.config).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind passive listener: {}", e);
            send_response(&writer, b"425 Can't open data connection.\r\n").await?;
            return Ok(());
        }
    };
    let port = listener.local_addr()?.port();

    let ip = {
        let mut session = session.lock().await;
        let ip = advertised_ip(&ctx.config, session.local_ip);
        session.set_data_channel(DataChannel::Passive { listener });
        ip
    };

    debug!("PASV listener bound on {}:{}", ip, port);
    let octets = ip.octets();
    let response = format!(
        "227 Entering Passive Mode ({},{},{},{},{},{})\r\n",
        octets[0],
        octets[1],
        octets[2],
        octets[3],
        port >> 8,
        port & 0xFF
    );
    send_response(&writer, response.as_bytes()).await?;
    Ok(())
}

/// Binds the passive listener: first free port in the configured range, or
/// an OS-chosen port when no range is set.
async fn bind_pasv_listener(config: &Config) -> Result<TcpListener, std::io::Error> {
    match config.server.pasv_port_range {
        Some((lo, hi)) => {
            for port in lo..=hi {
                if let Ok(listener) = TcpListener::bind(("0.0.0.0", port)).await {
                    return Ok(listener);
                }
            }
            Err(std::io::Error::new(
                std::io::ErrorKind::AddrInUse,
                format!("no free port in passive range {}-{}", lo, hi),
            ))
        }
        None => TcpListener::bind(("0.0.0.0", 0)).await,
    }
}

/// The address placed in the 227 reply: the configured override when
/// present, else the control socket's local IPv4 address, else 127.0.0.1.
fn advertised_ip(config: &Config, local_ip: IpAddr) -> Ipv4Addr {
    if let Some(configured) = &config.server.pasv_address {
        match configured.parse::<Ipv4Addr>() {
            Ok(ip) => return ip,
            Err(_) => warn!("Ignoring unparseable pasv_address: {}", configured),
        }
    }
    match local_ip {
        IpAddr::V4(ip) => ip,
        IpAddr::V6(_) => Ipv4Addr::LOCALHOST,
    }
}
