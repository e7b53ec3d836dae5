use anyhow::Result;
use log::debug;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, Notify};
use tokio::time;

use crate::constants::WELCOME_TEXT;
use crate::core_ftpcommand::handlers::{dispatch_command, CommandOutcome};
use crate::core_log::SessionEvent;
use crate::helpers::{send_response, ControlConn, ControlWriter};
use crate::server::ServerContext;
use crate::session::Session;

/// Runs one control connection to completion.
///
/// The loop ends on peer disconnect, QUIT, the idle deadline, or the
/// server's shutdown signal. Everything the session owns (control socket,
/// data channel, file handles) is dropped on every exit path.
pub async fn handle_connection(
    socket: TcpStream,
    ctx: Arc<ServerContext>,
    session_id: u64,
    shutdown: Arc<Notify>,
) -> Result<()> {
    let peer_addr = socket.peer_addr()?;
    let local_addr = socket.local_addr()?;
    let (read_half, write_half) = socket.into_split();

    let writer: ControlWriter = Arc::new(Mutex::new(ControlConn::new(
        write_half,
        Arc::clone(&ctx.sink),
        session_id,
    )));
    let mut reader = BufReader::new(read_half);

    ctx.sink
        .publish(session_id, SessionEvent::Connected { peer: peer_addr });
    send_response(&writer, format!("220 {}\r\n", WELCOME_TEXT).as_bytes()).await?;

    let session = Arc::new(Mutex::new(Session::new(session_id, local_addr.ip())));
    let idle_timeout = ctx.config.idle_timeout();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let n = tokio::select! {
            _ = shutdown.notified() => {
                debug!("session {}: shutdown requested", session_id);
                break;
            }
            read = time::timeout(idle_timeout, reader.read_line(&mut buffer)) => match read {
                Ok(Ok(n)) => n,
                Ok(Err(e)) => {
                    // Fatal control-channel error: close without a reply.
                    debug!("session {}: control channel error: {}", session_id, e);
                    break;
                }
                Err(_) => {
                    send_response(&writer, b"421 Timeout: closing control connection.\r\n")
                        .await
                        .ok();
                    break;
                }
            },
        };

        if n == 0 {
            break; // EOF
        }

        let line = buffer.trim_end();
        if line.is_empty() {
            continue;
        }

        let (verb, arg) = match line.split_once(' ') {
            Some((verb, arg)) => (verb.to_ascii_uppercase(), arg.to_string()),
            None => (line.to_ascii_uppercase(), String::new()),
        };

        ctx.sink.publish(
            session_id,
            SessionEvent::CommandReceived {
                verb: verb.clone(),
                arg: if verb == "PASS" {
                    String::from("****")
                } else {
                    arg.clone()
                },
            },
        );

        match dispatch_command(
            Arc::clone(&writer),
            Arc::clone(&ctx),
            Arc::clone(&session),
            &verb,
            arg,
        )
        .await
        {
            Ok(CommandOutcome::Continue) => {}
            Ok(CommandOutcome::Quit) => break,
            Err(e) => {
                debug!("session {}: reply write failed: {}", session_id, e);
                break;
            }
        }
    }

    ctx.sink.publish(session_id, SessionEvent::Disconnected);
    Ok(())
}
