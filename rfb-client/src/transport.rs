//! TCP transport for VNC connections.

use crate::errors::RfbClientError;
use rfb_protocol::socket::TcpSocket;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

/// An established byte-stream connection to a VNC server.
///
/// Splits into independent read and write halves so the reader task and the
/// driver task can each own one side without sharing a lock over the whole
/// connection.
pub struct Transport {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
}

impl Transport {
    /// Resolve `host` and connect to `port` over TCP.
    ///
    /// # Errors
    ///
    /// Returns [`RfbClientError::HostnameUnresolved`] if `host` cannot be
    /// resolved, or [`RfbClientError::ConnectFailed`] if resolution succeeds
    /// but the connection attempt itself fails (refused, unreachable, etc.).
    pub async fn connect(host: &str, port: u16) -> Result<Self, RfbClientError> {
        tokio::net::lookup_host((host, port))
            .await
            .map_err(|_| RfbClientError::HostnameUnresolved(host.to_string()))?
            .next()
            .ok_or_else(|| RfbClientError::HostnameUnresolved(host.to_string()))?;

        let socket = TcpSocket::connect(host, port)
            .await
            .map_err(|e| RfbClientError::ConnectFailed(e.to_string()))?;

        let (reader, writer) = socket.into_inner().into_split();
        Ok(Self { reader, writer })
    }

    /// Splits the transport into independent read and write halves.
    #[must_use]
    pub fn split(self) -> (OwnedReadHalf, OwnedWriteHalf) {
        (self.reader, self.writer)
    }
}
