use std::net::SocketAddr;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The host name did not resolve to any socket address.
    #[error("could not resolve {host}:{port}")]
    Resolve { host: String, port: u16 },

    /// Failed to connect to the remote peer.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to bind the local datagram port.
    #[error("failed to bind udp port {port}: {source}")]
    Bind { port: u16, source: std::io::Error },

    /// An I/O error occurred on an established transport.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    pub(crate) fn connect(addr: SocketAddr, source: std::io::Error) -> Self {
        Self::Connect {
            addr: addr.to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
