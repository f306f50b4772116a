//! RFB protocol handshake implementation.
//!
//! This module implements the three-phase RFB (Remote Framebuffer) protocol handshake:
//!
//! 1. **Protocol Version Negotiation** - client and server exchange version strings
//! 2. **Security Handshake** - a single `scheme:u32` is read and acted on directly
//!    (no RFB 3.7+ security-type list negotiation)
//! 3. **Initialization** - exchange of ClientInit/ServerInit messages
//!
//! # Supported Protocol Version
//!
//! The client always advertises and speaks the RFB 3.3 sub-protocol, regardless of
//! what version the server reports (as long as its major version is at least 3). This
//! keeps the security handshake to a single `scheme:u32` read, with no security-type
//! list negotiation, which in turn is what lets the VNC authentication path below be a
//! single straight-line read/encrypt/write/read sequence.
//!
//! # Security Types
//!
//! - `0 Failed` - connection rejected, with a reason string
//! - `1 None` - no authentication required
//! - `2 VNCAuth` - DES-ECB challenge/response authentication (see [`crate::auth`])
//! - any other value - unsupported by this client
//!
//! # Wire Format
//!
//! All multi-byte integers use **big-endian** (network byte order) per RFB specification.
//!
//! # Error Handling
//!
//! This module follows the project's fail-fast policy: invalid protocol versions,
//! rejected connections, and unsupported security types all fail immediately with a
//! descriptive error. There are no defensive fallbacks or silent degradations.

use crate::auth;
use crate::io::{RfbInStream, RfbOutStream};
use crate::messages;
use tokio::io::{AsyncRead, AsyncWrite};

/// RFB protocol version string sent by the client.
///
/// This implementation always pins the wire sub-protocol to 3.3's bare
/// `scheme:u32` security handshake, so it always echoes back 3.3 regardless of
/// what the server advertised.
const CLIENT_VERSION_BYTES: &[u8; 12] = b"RFB 003.003\n";

/// Security type: no authentication required.
pub const SECURITY_TYPE_NONE: u32 = 1;

/// Security type: VNC (DES challenge/response) authentication.
pub const SECURITY_TYPE_VNC_AUTH: u32 = 2;

/// Supplies the password used for VNC authentication.
///
/// Called at most once per connection attempt, only when the server requests
/// [`SECURITY_TYPE_VNC_AUTH`]. Only the first 8 bytes of the returned password
/// are significant; a `None` (or empty) password is attempted as-is and will
/// typically be rejected by the server.
pub trait PasswordProvider {
    /// Returns the password to use for this authentication attempt.
    fn provide_password(&mut self) -> Option<Vec<u8>>;
}

impl PasswordProvider for Option<String> {
    fn provide_password(&mut self) -> Option<Vec<u8>> {
        self.as_ref().map(|s| s.as_bytes().to_vec())
    }
}

/// Negotiate the RFB protocol version with the server.
///
/// Reads the server's 12-byte version string, validates that its major
/// version is at least 3, and always writes back `"RFB 003.003\n"`.
pub async fn negotiate_version<R: AsyncRead + Unpin, W: AsyncWrite + Unpin>(
    instream: &mut RfbInStream<R>,
    outstream: &mut RfbOutStream<W>,
) -> std::io::Result<()> {
    let mut version_buf = [0u8; 12];
    instream.read_bytes(&mut version_buf).await?;

    if &version_buf[0..4] != b"RFB " || version_buf[11] != b'\n' || version_buf[7] != b'.' {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "invalid RFB version string: expected 'RFB xxx.yyy\\n', got {:?}",
                String::from_utf8_lossy(&version_buf)
            ),
        ));
    }

    let major_str = std::str::from_utf8(&version_buf[4..7]).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("invalid major version digits: {}", e),
        )
    })?;
    let minor_str = std::str::from_utf8(&version_buf[8..11]).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("invalid minor version digits: {}", e),
        )
    })?;

    let major: u32 = major_str.parse().map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("invalid major version number: {}", e),
        )
    })?;
    let minor: u32 = minor_str.parse().map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("invalid minor version number: {}", e),
        )
    })?;

    if major < 3 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            format!("unsupported RFB version {}.{} (< 3.x)", major, minor),
        ));
    }

    outstream.write_bytes(CLIENT_VERSION_BYTES);
    outstream.flush().await?;

    Ok(())
}

/// Outcome of a security negotiation.
#[derive(Debug)]
pub enum SecurityOutcome {
    /// Authentication succeeded (or none was required); normal operation may proceed.
    Ok,
    /// The server rejected the connection outright (`scheme == 0`), with a human-readable reason.
    Rejected(String),
    /// VNC authentication was attempted but the server rejected the response.
    AuthFailed,
    /// The server requested a security scheme this client does not implement.
    Unsupported(u32),
}

/// Negotiate security with the server using the bare RFB 3.3 `scheme:u32` handshake.
///
/// `password` is consulted only if the server requests [`SECURITY_TYPE_VNC_AUTH`].
pub async fn negotiate_security<R: AsyncRead + Unpin, W: AsyncWrite + Unpin>(
    instream: &mut RfbInStream<R>,
    outstream: &mut RfbOutStream<W>,
    password: &mut dyn PasswordProvider,
) -> std::io::Result<SecurityOutcome> {
    let scheme = instream.read_u32().await?;

    match scheme {
        0 => {
            let reason_len = instream.read_u32().await? as usize;
            let mut reason_buf = vec![0u8; reason_len];
            instream.read_bytes(&mut reason_buf).await?;
            Ok(SecurityOutcome::Rejected(
                String::from_utf8_lossy(&reason_buf).into_owned(),
            ))
        }
        SECURITY_TYPE_NONE => Ok(SecurityOutcome::Ok),
        SECURITY_TYPE_VNC_AUTH => {
            let mut challenge = [0u8; auth::CHALLENGE_LEN];
            instream.read_bytes(&mut challenge).await?;

            let pw = password.provide_password().unwrap_or_default();
            let response = auth::encrypt_challenge(&pw, &challenge);
            outstream.write_bytes(&response);
            outstream.flush().await?;

            let result = instream.read_u32().await?;
            match result {
                0 => Ok(SecurityOutcome::Ok),
                1 | 2 => Ok(SecurityOutcome::AuthFailed),
                other => Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("invalid VNC auth result value: {}", other),
                )),
            }
        }
        other => Ok(SecurityOutcome::Unsupported(other)),
    }
}

/// Send ClientInit message to the server.
pub async fn send_client_init<W: AsyncWrite + Unpin>(
    outstream: &mut RfbOutStream<W>,
    shared: bool,
) -> std::io::Result<()> {
    let client_init = messages::ClientInit { shared };
    client_init.write_to(outstream);
    outstream.flush().await?;
    Ok(())
}

/// Receive ServerInit message from the server.
pub async fn recv_server_init<R: AsyncRead + Unpin>(
    instream: &mut RfbInStream<R>,
) -> std::io::Result<messages::ServerInit> {
    messages::ServerInit::read_from(instream).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::types::PixelFormat;

    fn create_duplex_pair() -> (
        (RfbInStream<tokio::io::DuplexStream>, RfbOutStream<tokio::io::DuplexStream>),
        (RfbInStream<tokio::io::DuplexStream>, RfbOutStream<tokio::io::DuplexStream>),
    ) {
        let (client_read, server_write) = tokio::io::duplex(1024);
        let (server_read, client_write) = tokio::io::duplex(1024);
        (
            (RfbInStream::new(client_read), RfbOutStream::new(client_write)),
            (RfbInStream::new(server_read), RfbOutStream::new(server_write)),
        )
    }

    #[tokio::test]
    async fn version_negotiation_always_replies_3_3() {
        let ((mut client_in, mut client_out), (mut server_in, mut server_out)) = create_duplex_pair();

        server_out.write_bytes(b"RFB 003.008\n");
        server_out.flush().await.unwrap();

        negotiate_version(&mut client_in, &mut client_out).await.unwrap();

        let mut buf = [0u8; 12];
        server_in.read_bytes(&mut buf).await.unwrap();
        assert_eq!(&buf, b"RFB 003.003\n");
    }

    #[tokio::test]
    async fn version_negotiation_accepts_pure_3_3_server() {
        let ((mut client_in, mut client_out), (mut server_in, mut server_out)) = create_duplex_pair();

        server_out.write_bytes(b"RFB 003.003\n");
        server_out.flush().await.unwrap();

        negotiate_version(&mut client_in, &mut client_out).await.unwrap();

        let mut buf = [0u8; 12];
        server_in.read_bytes(&mut buf).await.unwrap();
        assert_eq!(&buf, b"RFB 003.003\n");
    }

    #[tokio::test]
    async fn version_negotiation_rejects_major_below_3() {
        let ((mut client_in, mut client_out), (_, mut server_out)) = create_duplex_pair();

        server_out.write_bytes(b"RFB 002.002\n");
        server_out.flush().await.unwrap();

        let result = negotiate_version(&mut client_in, &mut client_out).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn security_none_succeeds() {
        let ((mut client_in, mut client_out), (_, mut server_out)) = create_duplex_pair();

        server_out.write_u32(SECURITY_TYPE_NONE);
        server_out.flush().await.unwrap();

        let mut password: Option<String> = None;
        let outcome = negotiate_security(&mut client_in, &mut client_out, &mut password)
            .await
            .unwrap();
        assert!(matches!(outcome, SecurityOutcome::Ok));
    }

    #[tokio::test]
    async fn security_rejected_carries_reason() {
        let ((mut client_in, mut client_out), (_, mut server_out)) = create_duplex_pair();

        server_out.write_u32(0);
        let reason = b"too many connections";
        server_out.write_u32(reason.len() as u32);
        server_out.write_bytes(reason);
        server_out.flush().await.unwrap();

        let mut password: Option<String> = None;
        let outcome = negotiate_security(&mut client_in, &mut client_out, &mut password)
            .await
            .unwrap();
        match outcome {
            SecurityOutcome::Rejected(r) => assert_eq!(r, "too many connections"),
            other => panic!("expected Rejected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn security_unsupported_scheme() {
        let ((mut client_in, mut client_out), (_, mut server_out)) = create_duplex_pair();

        server_out.write_u32(19); // VeNCrypt, unsupported here
        server_out.flush().await.unwrap();

        let mut password: Option<String> = None;
        let outcome = negotiate_security(&mut client_in, &mut client_out, &mut password)
            .await
            .unwrap();
        assert!(matches!(outcome, SecurityOutcome::Unsupported(19)));
    }

    #[tokio::test]
    async fn security_vnc_auth_round_trip_success() {
        let ((mut client_in, mut client_out), (mut server_in, mut server_out)) = create_duplex_pair();

        server_out.write_u32(SECURITY_TYPE_VNC_AUTH);
        let challenge = [0x00u8, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F];
        server_out.write_bytes(&challenge);
        server_out.flush().await.unwrap();

        let expected_response = auth::encrypt_challenge(b"pass", &challenge);

        let server_task = tokio::spawn(async move {
            let mut response = [0u8; auth::CHALLENGE_LEN];
            server_in.read_bytes(&mut response).await.unwrap();
            server_out.write_u32(if response == expected_response { 0 } else { 1 });
            server_out.flush().await.unwrap();
        });

        let mut password = Some("pass".to_string());
        let outcome = negotiate_security(&mut client_in, &mut client_out, &mut password)
            .await
            .unwrap();
        server_task.await.unwrap();
        assert!(matches!(outcome, SecurityOutcome::Ok));
    }

    #[tokio::test]
    async fn security_vnc_auth_rejected_on_wrong_password() {
        let ((mut client_in, mut client_out), (mut server_in, mut server_out)) = create_duplex_pair();

        server_out.write_u32(SECURITY_TYPE_VNC_AUTH);
        let challenge = [0u8; auth::CHALLENGE_LEN];
        server_out.write_bytes(&challenge);
        server_out.flush().await.unwrap();

        let server_task = tokio::spawn(async move {
            let mut response = [0u8; auth::CHALLENGE_LEN];
            server_in.read_bytes(&mut response).await.unwrap();
            server_out.write_u32(1); // Failed
            server_out.flush().await.unwrap();
        });

        let mut password = Some("wrong".to_string());
        let outcome = negotiate_security(&mut client_in, &mut client_out, &mut password)
            .await
            .unwrap();
        server_task.await.unwrap();
        assert!(matches!(outcome, SecurityOutcome::AuthFailed));
    }

    #[tokio::test]
    async fn client_init_sent_shared_true() {
        let ((_, mut client_out), (mut server_in, _)) = create_duplex_pair();

        send_client_init(&mut client_out, true).await.unwrap();

        let shared_byte = server_in.read_u8().await.unwrap();
        assert_eq!(shared_byte, 1);
    }

    #[tokio::test]
    async fn server_init_parsing() {
        let ((mut client_in, _), (_, mut server_out)) = create_duplex_pair();

        server_out.write_u16(1920);
        server_out.write_u16(1080);

        let pf = PixelFormat {
            bits_per_pixel: 32,
            depth: 24,
            big_endian: 0,
            true_color: 1,
            red_max: 255,
            green_max: 255,
            blue_max: 255,
            red_shift: 16,
            green_shift: 8,
            blue_shift: 0,
        };
        pf.write_to(&mut server_out).unwrap();

        let name = b"Test Desktop";
        server_out.write_u32(name.len() as u32);
        server_out.write_bytes(name);
        server_out.flush().await.unwrap();

        let server_init = recv_server_init(&mut client_in).await.unwrap();
        assert_eq!(server_init.framebuffer_width, 1920);
        assert_eq!(server_init.framebuffer_height, 1080);
        assert_eq!(server_init.pixel_format, pf);
        assert_eq!(server_init.name, "Test Desktop");
    }
}
