//! High-level connection management and handshake.
//!
//! Establishes a TCP transport, performs the RFB version and security
//! handshakes, sends ClientInit, and reads ServerInit. Returns buffered RFB
//! input/output streams ready for normal operation.

use crate::{config::Config, errors::RfbClientError, transport::Transport};
use rfb_protocol::handshake::{
    negotiate_security, negotiate_version, recv_server_init, send_client_init, SecurityOutcome,
};
use rfb_protocol::io::{RfbInStream, RfbOutStream};
use rfb_protocol::messages::ServerInit;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

/// Connected RFB session components.
pub struct Connection<R, W> {
    /// Buffered input stream for reading RFB data.
    pub input: RfbInStream<R>,
    /// Buffered output stream for writing RFB data.
    pub output: RfbOutStream<W>,
    /// Initial server parameters (framebuffer size, pixel format, name).
    pub server_init: ServerInit,
}

impl<R: AsyncRead + Unpin, W: AsyncWrite + Unpin> Connection<R, W> {
    /// Returns the negotiated framebuffer width and height.
    #[must_use]
    pub fn size(&self) -> (u16, u16) {
        (
            self.server_init.framebuffer_width,
            self.server_init.framebuffer_height,
        )
    }
}

/// Map a handshake I/O error onto the appropriate client error.
///
/// `InvalidData`/`Unsupported` mean the peer sent something that does not
/// parse as RFB (a malformed version string, an unsupported major version);
/// everything else is a genuine transport failure.
fn map_handshake_err(e: std::io::Error) -> RfbClientError {
    match e.kind() {
        std::io::ErrorKind::InvalidData | std::io::ErrorKind::Unsupported => {
            RfbClientError::ProtocolParseError(e.to_string())
        }
        _ => RfbClientError::TransportError(e),
    }
}

/// Establish a new RFB connection using the given configuration.
///
/// Steps:
/// 1. Open the TCP transport
/// 2. Split into read/write halves and wrap with `RfbInStream`/`RfbOutStream`
/// 3. Negotiate the protocol version (client always speaks RFB 3.3)
/// 4. Negotiate security (`None` or VNC auth)
/// 5. Send ClientInit
/// 6. Read ServerInit (framebuffer size, pixel format, desktop name)
pub async fn establish(
    config: &Config,
) -> Result<Connection<OwnedReadHalf, OwnedWriteHalf>, RfbClientError> {
    let transport = Transport::connect(&config.connection.host, config.connection.port).await?;
    let (read_half, write_half) = transport.split();

    let mut input = RfbInStream::new(read_half);
    let mut output = RfbOutStream::new(write_half);

    negotiate_version(&mut input, &mut output)
        .await
        .map_err(map_handshake_err)?;

    let mut password = config.connection.password.clone();
    let outcome = negotiate_security(&mut input, &mut output, &mut password)
        .await
        .map_err(map_handshake_err)?;

    match outcome {
        SecurityOutcome::Ok => {}
        SecurityOutcome::Rejected(reason) => {
            return Err(RfbClientError::ConnectionRejected(reason));
        }
        SecurityOutcome::AuthFailed => return Err(RfbClientError::AuthFailed),
        SecurityOutcome::Unsupported(scheme) => {
            return Err(RfbClientError::UnsupportedAuth(scheme));
        }
    }

    send_client_init(&mut output, config.connection.shared)
        .await
        .map_err(RfbClientError::TransportError)?;

    let server_init = recv_server_init(&mut input)
        .await
        .map_err(RfbClientError::TransportError)?;

    Ok(Connection {
        input,
        output,
        server_init,
    })
}
