//! Error types for the RFB client.
//!
//! Every variant here is a terminal outcome: once the reader task returns one
//! of these, the session is over. Nothing is retried at this layer — retry
//! policy, if any, belongs to the caller.

use std::io;
use thiserror::Error;

/// Errors that can occur during VNC client operation.
#[derive(Debug, Error)]
pub enum RfbClientError {
    /// The configured hostname could not be resolved to an address.
    #[error("hostname could not be resolved: {0}")]
    HostnameUnresolved(String),

    /// The TCP connection to the server could not be established.
    #[error("connection failed: {0}")]
    ConnectFailed(String),

    /// A fixed-format handshake block (version string, `ServerInit`) was malformed.
    #[error("protocol parse error: {0}")]
    ProtocolParseError(String),

    /// The server refused the connection during security negotiation, with a reason string.
    #[error("connection rejected by server: {0}")]
    ConnectionRejected(String),

    /// VNC authentication failed: wrong password, or the server's attempt limit was hit.
    #[error("authentication failed")]
    AuthFailed,

    /// The server proposed a security type this client does not implement.
    #[error("unsupported security type: {0}")]
    UnsupportedAuth(u32),

    /// The server used a feature this client intentionally does not implement
    /// (e.g. `SetColourMapEntries`, or an unrecognized message/encoding type).
    #[error("unsupported feature: {0}")]
    Unsupported(String),

    /// A framebuffer update violated a protocol invariant: a rectangle out of
    /// bounds, a Hextile tile referencing an undefined color, or a payload
    /// length mismatch.
    #[error("malformed framebuffer update: {0}")]
    MalformedUpdate(String),

    /// The transport was closed in an orderly fashion before the expected
    /// number of bytes arrived.
    #[error("transport closed")]
    TransportClosed,

    /// An I/O error occurred on the transport.
    #[error("transport error: {0}")]
    TransportError(#[from] io::Error),

    /// The driver requested the session be closed.
    #[error("closed by caller")]
    UserAbort,
}

impl From<anyhow::Error> for RfbClientError {
    /// Decoder and framing failures arrive as `anyhow::Error`; they are all
    /// protocol-level malformations from the session's point of view.
    fn from(err: anyhow::Error) -> Self {
        RfbClientError::MalformedUpdate(err.to_string())
    }
}
