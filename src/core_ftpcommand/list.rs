use chrono::{DateTime, Datelike, Local};
use log::{error, warn};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::Mutex;

use crate::core_ftpcommand::utils::resolve_client_path;
use crate::core_log::SessionEvent;
use crate::core_network::data;
use crate::helpers::{send_response, ControlWriter};
use crate::server::ServerContext;
use crate::session::Session;

/// Handles the LIST FTP command.
///
/// Builds a Unix-style listing of the resolved directory and streams it
/// over the data channel armed by the preceding PORT or PASV.
pub async fn handle_list_command(
    writer: ControlWriter,
    ctx: Arc<ServerContext>,
    session: Arc<Mutex<Session>>,
    arg: String,
) -> Result<(), std::io::Error> {
    if !session.lock().await.has_data_channel() {
        send_response(&writer, b"425 Can't open data connection.\r\n").await?;
        return Ok(());
    }

    let current_dir = session.lock().await.current_dir.clone();
    let (virtual_path, fs_path) = match resolve_client_path(&ctx.config, &current_dir, &arg) {
        Some(resolved) => resolved,
        None => {
            send_response(&writer, b"550 Path is outside of the allowed area.\r\n").await?;
            return Ok(());
        }
    };

    let mut entries = match tokio::fs::read_dir(&fs_path).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("LIST failed to read {:?}: {}", fs_path, e);
            send_response(&writer, b"550 Directory not found.\r\n").await?;
            return Ok(());
        }
    };

    let mut lines: Vec<String> = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name().to_string_lossy().to_string();
        // Hidden entries stay out of listings, like `.` and `..`.
        if name.starts_with('.') {
            continue;
        }
        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(_) => continue,
        };
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        lines.push(format_list_entry(
            &name,
            metadata.is_dir(),
            metadata.len(),
            modified,
        ));
    }
    lines.sort();
    let listing = lines.concat();

    let (channel, session_id) = {
        let mut session = session.lock().await;
        (session.take_data_channel(), session.id)
    };
    let channel = match channel {
        Some(channel) => channel,
        None => {
            send_response(&writer, b"425 Can't open data connection.\r\n").await?;
            return Ok(());
        }
    };

    let mut stream = match channel.establish().await {
        Ok(stream) => stream,
        Err(e) => {
            error!("LIST data connection failed: {}", e);
            send_response(&writer, e.to_reply()).await?;
            return Ok(());
        }
    };

    send_response(
        &writer,
        b"150 Opening data connection for directory listing.\r\n",
    )
    .await?;
    ctx.sink.publish(
        session_id,
        SessionEvent::TransferStarted {
            path: virtual_path.clone(),
        },
    );

    match data::send_listing(&mut stream, listing.as_bytes()).await {
        Ok(()) => {
            send_response(&writer, b"226 Transfer complete.\r\n").await?;
            ctx.sink.publish(
                session_id,
                SessionEvent::TransferFinished {
                    path: virtual_path,
                    bytes: listing.len() as u64,
                    ok: true,
                },
            );
        }
        Err(e) => {
            error!("LIST transfer failed: {}", e);
            send_response(&writer, e.to_reply()).await?;
            ctx.sink.publish(
                session_id,
                SessionEvent::TransferFinished {
                    path: virtual_path,
                    bytes: 0,
                    ok: false,
                },
            );
        }
    }

    Ok(())
}

/// One `ls -l`-style line. Permissions and ownership are fixed strings;
/// the date column switches to the year form when the entry was modified
/// in a different calendar year than now.
pub fn format_list_entry(name: &str, is_dir: bool, size: u64, modified: SystemTime) -> String {
    let permissions = if is_dir { "drw-r--r--" } else { "-rw-r--r--" };

    let modified: DateTime<Local> = modified.into();
    let date = if modified.year() == Local::now().year() {
        modified.format("%b %d %H:%M")
    } else {
        modified.format("%b %d  %Y")
    };

    format!(
        "{} {:>3} {:>8} {:>8} {:>8} {} {}\r\n",
        permissions, 1, "owner", "group", size, date, name
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn files_and_directories_differ_in_first_column() {
        let now = SystemTime::now();
        let file = format_list_entry("a.txt", false, 42, now);
        let dir = format_list_entry("sub", true, 4096, now);
        assert!(file.starts_with("-rw-r--r-- "));
        assert!(dir.starts_with("drw-r--r-- "));
        assert!(file.ends_with(" a.txt\r\n"));
        assert!(dir.ends_with(" sub\r\n"));
    }

    #[test]
    fn columns_are_right_aligned() {
        let line = format_list_entry("f", false, 7, SystemTime::now());
        assert!(line.contains("   1    owner    group        7 "));
    }

    #[test]
    fn old_entries_show_the_year() {
        // ~3 years ago always falls in a different calendar year.
        let old = SystemTime::now() - Duration::from_secs(3 * 365 * 24 * 3600);
        let line = format_list_entry("f", false, 0, old);
        let date: DateTime<Local> = old.into();
        assert!(line.contains(&format!("  {}", date.year())));
        assert!(!line.contains(':'));
    }

    #[test]
    fn recent_entries_show_the_time_of_day() {
        let line = format_list_entry("f", false, 0, SystemTime::now());
        assert!(line.contains(':'));
    }
}
