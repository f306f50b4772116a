//! RFB (Remote Framebuffer) protocol implementation.
//!
//! This crate provides the core networking and protocol layer for VNC client connections.
//! It handles socket connections, buffered I/O streams, message serialization/deserialization,
//! and the RFB protocol handshake (version negotiation, security, VNC authentication).
//!
//! # Modules
//!
//! - [`socket`] - Socket abstractions (TCP)
//! - [`io`] - Buffered big-endian RFB input/output streams
//! - [`messages`] - Wire message types (client-to-server and server-to-client)
//! - [`handshake`] - Version negotiation, security negotiation, and VNC authentication
//!
//! # Examples
//!
//! ```no_run
//! use rfb_protocol::{TcpSocket, VncSocket};
//!
//! # async fn example() -> anyhow::Result<()> {
//! // Connect to a VNC server
//! let socket = TcpSocket::connect("localhost", 5900).await?;
//! println!("Connected to: {}", socket.peer_endpoint());
//! # Ok(())
//! # }
//! ```

pub mod socket;
pub mod io;
pub mod messages;
pub mod handshake;
pub mod auth;

// Re-export commonly used types
pub use socket::{VncSocket, TcpSocket};
