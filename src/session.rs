use std::net::IpAddr;

use crate::core_network::data::DataChannel;

/// The primary transfer type (A or I). Neither performs byte translation;
/// ASCII uploads and downloads carry bytes unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferType {
    Ascii,
    Binary,
}

/// Per-connection state driven by the command loop.
#[derive(Debug)]
pub struct Session {
    pub id: u64,
    /// Virtual working directory, always a normalized absolute path.
    pub current_dir: String,
    pub username: Option<String>,
    pub is_authenticated: bool,
    pub awaiting_password: bool,
    pub transfer_type: TransferType,
    /// Virtual path recorded by RNFR, consumed by RNTO.
    pub rename_from: Option<String>,
    data_channel: Option<DataChannel>,
    /// Local address of the control socket, advertised by PASV.
    pub local_ip: IpAddr,
}

impl Session {
    pub fn new(id: u64, local_ip: IpAddr) -> Self {
        Self {
            id,
            current_dir: String::from("/"),
            username: None,
            is_authenticated: false,
            awaiting_password: false,
            transfer_type: TransferType::Ascii,
            rename_from: None,
            data_channel: None,
            local_ip,
        }
    }

    /// Installs a new data channel. The previous one, if any, is dropped,
    /// which closes its socket or passive listener.
    pub fn set_data_channel(&mut self, channel: DataChannel) {
        self.data_channel = Some(channel);
    }

    pub fn has_data_channel(&self) -> bool {
        self.data_channel.is_some()
    }

    /// Hands the data channel to a transfer; each PORT/PASV arms exactly
    /// one transfer.
    pub fn take_data_channel(&mut self) -> Option<DataChannel> {
        self.data_channel.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, SocketAddr};

    fn test_session() -> Session {
        Session::new(1, IpAddr::V4(Ipv4Addr::LOCALHOST))
    }

    #[test]
    fn starts_unauthenticated_at_root() {
        let session = test_session();
        assert_eq!(session.current_dir, "/");
        assert!(!session.is_authenticated);
        assert!(!session.awaiting_password);
        assert!(session.username.is_none());
        assert!(session.rename_from.is_none());
        assert_eq!(session.transfer_type, TransferType::Ascii);
        assert!(!session.has_data_channel());
    }

    #[test]
    fn data_channel_is_consumed_by_take() {
        let mut session = test_session();
        session.set_data_channel(DataChannel::Active {
            addr: SocketAddr::from(([127, 0, 0, 1], 6000)),
        });
        assert!(session.has_data_channel());
        assert!(session.take_data_channel().is_some());
        assert!(session.take_data_channel().is_none());
    }
}
