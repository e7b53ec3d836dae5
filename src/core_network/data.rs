//! Data-channel lifecycle: establishing the per-transfer TCP connection in
//! active or passive mode and pumping bytes between it and a local file.

use log::debug;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use crate::constants::DATA_CHANNEL_TIMEOUT_SECS;

#[derive(Debug, Error)]
pub enum DataChannelError {
    #[error("data connection timed out")]
    Timeout,
    #[error("data connection failed: {0}")]
    Connect(#[source] std::io::Error),
    #[error("data transfer failed: {0}")]
    Transfer(#[source] std::io::Error),
}

impl DataChannelError {
    /// Maps the failure onto the control-channel reply: setup failures are
    /// 425, failures after the transfer started are 426.
    pub fn to_reply(&self) -> &'static [u8] {
        match self {
            DataChannelError::Timeout | DataChannelError::Connect(_) => {
                b"425 Can't open data connection.\r\n"
            }
            DataChannelError::Transfer(_) => b"426 Connection closed; transfer aborted.\r\n",
        }
    }
}

/// One data connection in the making. Armed by PORT or PASV, consumed by
/// the next transfer command.
#[derive(Debug)]
pub enum DataChannel {
    /// Active mode: the server connects out to the client-supplied endpoint.
    Active { addr: SocketAddr },
    /// Passive mode: the client connects to a listener we already bound.
    Passive { listener: TcpListener },
}

impl DataChannel {
    /// Establishes the transfer socket, consuming the channel. Both modes
    /// are bounded by the 5 s data-channel deadline. A passive listener
    /// accepts exactly once and is closed on return.
    pub async fn establish(self) -> Result<TcpStream, DataChannelError> {
        let deadline = Duration::from_secs(DATA_CHANNEL_TIMEOUT_SECS);
        match self {
            DataChannel::Active { addr } => {
                let stream = timeout(deadline, TcpStream::connect(addr))
                    .await
                    .map_err(|_| DataChannelError::Timeout)?
                    .map_err(DataChannelError::Connect)?;
                debug!("data connection established with {}", addr);
                Ok(stream)
            }
            DataChannel::Passive { listener } => {
                let (stream, addr) = timeout(deadline, listener.accept())
                    .await
                    .map_err(|_| DataChannelError::Timeout)?
                    .map_err(DataChannelError::Connect)?;
                debug!("accepted data connection from {}", addr);
                Ok(stream)
            }
        }
    }
}

/// Streams a file to the data socket in chunks, then closes the write side.
pub async fn send_file(
    stream: &mut TcpStream,
    file: &mut File,
    buffer_size: usize,
) -> Result<u64, DataChannelError> {
    let mut buffer = vec![0u8; buffer_size];
    let mut total: u64 = 0;
    loop {
        let n = file
            .read(&mut buffer)
            .await
            .map_err(DataChannelError::Transfer)?;
        if n == 0 {
            break;
        }
        stream
            .write_all(&buffer[..n])
            .await
            .map_err(DataChannelError::Transfer)?;
        total += n as u64;
    }
    stream.shutdown().await.map_err(DataChannelError::Transfer)?;
    Ok(total)
}

/// Reads from the data socket until the peer closes, writing to the file.
pub async fn receive_file(
    stream: &mut TcpStream,
    file: &mut File,
    buffer_size: usize,
) -> Result<u64, DataChannelError> {
    let mut buffer = vec![0u8; buffer_size];
    let mut total: u64 = 0;
    loop {
        let n = stream
            .read(&mut buffer)
            .await
            .map_err(DataChannelError::Transfer)?;
        if n == 0 {
            break;
        }
        file.write_all(&buffer[..n])
            .await
            .map_err(DataChannelError::Transfer)?;
        total += n as u64;
    }
    file.flush().await.map_err(DataChannelError::Transfer)?;
    Ok(total)
}

/// Writes a prepared listing and closes the write side.
pub async fn send_listing(
    stream: &mut TcpStream,
    listing: &[u8],
) -> Result<(), DataChannelError> {
    stream
        .write_all(listing)
        .await
        .map_err(DataChannelError::Transfer)?;
    stream.shutdown().await.map_err(DataChannelError::Transfer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn active_connect_to_dead_port_is_setup_failure() {
        // Port 1 on localhost is assumed closed.
        let channel = DataChannel::Active {
            addr: SocketAddr::from(([127, 0, 0, 1], 1)),
        };
        let err = channel.establish().await.unwrap_err();
        assert_eq!(err.to_reply(), b"425 Can't open data connection.\r\n");
    }

    #[tokio::test]
    async fn passive_accepts_exactly_one_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let channel = DataChannel::Passive { listener };

        let client = tokio::spawn(async move { TcpStream::connect(addr).await.unwrap() });
        let stream = channel.establish().await.unwrap();
        let _client = client.await.unwrap();
        drop(stream);

        // The listener is gone; a second connection attempt is refused.
        assert!(TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn transfer_error_maps_to_426() {
        let err = DataChannelError::Transfer(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        ));
        assert_eq!(
            err.to_reply(),
            b"426 Connection closed; transfer aborted.\r\n"
        );
    }
}
