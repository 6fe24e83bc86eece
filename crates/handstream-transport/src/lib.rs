//! Network transports for handstream.
//!
//! Two transports are provided:
//! - [`DuplexStream`]: a connected TCP stream with `TCP_NODELAY`, used for
//!   outbound frames and inbound poses on the same connection
//! - [`DatagramSocket`]: a bound IPv4 UDP socket, used by the receive-only path
//!
//! This is the lowest layer of handstream. Framing lives in `handstream-frame`.

pub mod error;
pub mod state;
pub mod tcp;
pub mod udp;

pub use error::{Result, TransportError};
pub use state::ConnectionState;
pub use tcp::{DuplexStream, TcpTransport};
pub use udp::{
    is_closed_socket_error, loopback, DatagramSocket, MAX_DATAGRAM_SIZE, RECV_BUFFER_SIZE,
};
