use std::sync::Arc;
use tokio::sync::Mutex;

use crate::core_ftpcommand::ftpcommand::FtpCommand;
use crate::core_network::{pasv, port};
use crate::helpers::{send_response, ControlWriter};
use crate::server::ServerContext;
use crate::session::Session;

/// Whether the command loop keeps running after a command.
#[derive(Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    Continue,
    Quit,
}

/// Dispatches one parsed command line.
///
/// Sequencing gates run before the per-command handlers: the USER/PASS
/// handshake window, the login requirement, and the RNFR pending-rename
/// rule (any command other than RNTO discards the recorded path).
pub async fn dispatch_command(
    writer: ControlWriter,
    ctx: Arc<ServerContext>,
    session: Arc<Mutex<Session>>,
    verb: &str,
    arg: String,
) -> Result<CommandOutcome, std::io::Error> {
    let cmd = FtpCommand::from_str(verb);

    // The handshake window admits only USER, PASS, QUIT, and NOOP;
    // everything else, recognized or not, is refused.
    if session.lock().await.awaiting_password
        && !matches!(
            cmd,
            Some(FtpCommand::USER | FtpCommand::PASS | FtpCommand::QUIT | FtpCommand::NOOP)
        )
    {
        send_response(&writer, b"530 Not logged in.\r\n").await?;
        return Ok(CommandOutcome::Continue);
    }

    let cmd = match cmd {
        Some(cmd) => cmd,
        None => {
            session.lock().await.rename_from = None;
            send_response(&writer, b"502 Command not implemented.\r\n").await?;
            return Ok(CommandOutcome::Continue);
        }
    };

    {
        let mut session = session.lock().await;

        if cmd.requires_login() && !session.is_authenticated {
            drop(session);
            send_response(&writer, b"530 Not logged in.\r\n").await?;
            return Ok(CommandOutcome::Continue);
        }

        // RNFR survives only into an immediately following RNTO.
        if !matches!(cmd, FtpCommand::RNFR | FtpCommand::RNTO) {
            session.rename_from = None;
        }
    }

    match cmd {
        FtpCommand::USER => {
            crate::core_ftpcommand::user::handle_user_command(writer, ctx, session, arg).await?
        }
        FtpCommand::PASS => {
            crate::core_ftpcommand::pass::handle_pass_command(writer, ctx, session, arg).await?
        }
        FtpCommand::SYST => {
            crate::core_ftpcommand::syst::handle_syst_command(writer).await?
        }
        FtpCommand::TYPE => {
            crate::core_ftpcommand::type_::handle_type_command(writer, ctx, session, arg).await?
        }
        FtpCommand::NOOP => {
            crate::core_ftpcommand::noop::handle_noop_command(writer).await?
        }
        FtpCommand::QUIT => {
            crate::core_ftpcommand::quit::handle_quit_command(writer).await?;
            return Ok(CommandOutcome::Quit);
        }
        FtpCommand::PORT => {
            port::handle_port_command(writer, ctx, session, arg).await?
        }
        FtpCommand::PASV => {
            pasv::handle_pasv_command(writer, ctx, session, arg).await?
        }
        FtpCommand::LIST => {
            crate::core_ftpcommand::list::handle_list_command(writer, ctx, session, arg).await?
        }
        FtpCommand::CWD => {
            crate::core_ftpcommand::cwd::handle_cwd_command(writer, ctx, session, arg).await?
        }
        FtpCommand::PWD => {
            crate::core_ftpcommand::pwd::handle_pwd_command(writer, session).await?
        }
        FtpCommand::MKD => {
            crate::core_ftpcommand::mkd::handle_mkd_command(writer, ctx, session, arg).await?
        }
        FtpCommand::RMD => {
            crate::core_ftpcommand::rmd::handle_rmd_command(writer, ctx, session, arg).await?
        }
        FtpCommand::DELE => {
            crate::core_ftpcommand::dele::handle_dele_command(writer, ctx, session, arg).await?
        }
        FtpCommand::RNFR => {
            crate::core_ftpcommand::rnfr::handle_rnfr_command(writer, ctx, session, arg).await?
        }
        FtpCommand::RNTO => {
            crate::core_ftpcommand::rnto::handle_rnto_command(writer, ctx, session, arg).await?
        }
        FtpCommand::STOR => {
            crate::core_ftpcommand::stor::handle_stor_command(writer, ctx, session, arg).await?
        }
        FtpCommand::RETR => {
            crate::core_ftpcommand::retr::handle_retr_command(writer, ctx, session, arg).await?
        }
    }

    Ok(CommandOutcome::Continue)
}
