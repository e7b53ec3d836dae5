// src/constants.rs

pub const DEFAULT_LISTEN_PORT: u16 = 21;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

// Connect/accept deadline for the data channel
pub const DATA_CHANNEL_TIMEOUT_SECS: u64 = 5;

// How long stop() waits for a session before tearing it down
pub const SHUTDOWN_GRACE_SECS: u64 = 5;

pub const WELCOME_TEXT: &str = "FTP Server Ready";
