use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tracing::info;

use crate::error::{Result, TransportError};

/// Largest payload an IPv4 UDP datagram can carry (65535 - 8 UDP - 20 IP).
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Receive buffer size. Anything larger than [`MAX_DATAGRAM_SIZE`] cannot
/// arrive over IPv4, so the extra bytes only guard against truncation.
pub const RECV_BUFFER_SIZE: usize = 64 * 1024;

/// IPv4 UDP socket bound on all local interfaces, used by the receive-only path.
pub struct DatagramSocket {
    socket: UdpSocket,
    port: u16,
}

impl DatagramSocket {
    /// Bind `0.0.0.0:port` with `SO_REUSEADDR` so a quick restart does not
    /// fail on a lingering socket. Port `0` picks an ephemeral port.
    pub fn bind(port: u16) -> Result<Self> {
        let socket = bind_reuse(port).map_err(|source| TransportError::Bind { port, source })?;
        let port = socket.local_addr()?.port();
        info!(port, "listening for datagrams");
        Ok(Self { socket, port })
    }

    /// Bound port (the ephemeral one when bound with `0`).
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(Into::into)
    }

    /// Bound each [`DatagramSocket::receive`] call so the caller can observe
    /// a stop flag between waits. `None` blocks indefinitely.
    pub fn set_poll_interval(&self, interval: Option<Duration>) -> Result<()> {
        self.socket.set_read_timeout(interval).map_err(Into::into)
    }

    /// Receive the next datagram into `buf`.
    ///
    /// Returns `Ok(None)` when the poll interval elapsed without data or the
    /// call was interrupted.
    pub fn receive(&self, buf: &mut [u8]) -> std::io::Result<Option<(usize, SocketAddr)>> {
        match self.socket.recv_from(buf) {
            Ok((len, sender)) => Ok(Some((len, sender))),
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) =>
            {
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Send a datagram. Used by the mock peer to forward poses.
    pub fn send_to(&self, payload: &[u8], target: SocketAddr) -> Result<usize> {
        self.socket.send_to(payload, target).map_err(Into::into)
    }
}

/// Returns true when a receive error means the local socket itself is gone.
///
/// Everything else, such as ICMP port-unreachable feedback from an earlier
/// send, leaves the socket usable.
pub fn is_closed_socket_error(err: &std::io::Error) -> bool {
    if err.kind() == ErrorKind::NotConnected {
        return true;
    }
    #[cfg(unix)]
    {
        err.raw_os_error() == Some(libc::EBADF)
    }
    #[cfg(not(unix))]
    {
        false
    }
}

impl std::fmt::Debug for DatagramSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatagramSocket")
            .field("port", &self.port)
            .finish()
    }
}

fn bind_reuse(port: u16) -> std::io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port).into())?;
    Ok(socket.into())
}

/// Loopback address for a bound port, for tests and local forwarding.
pub fn loopback(port: u16) -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_forces_ipv4_any() {
        let socket = DatagramSocket::bind(0).unwrap();
        let addr = socket.local_addr().unwrap();
        assert!(addr.is_ipv4());
        assert!(addr.ip().is_unspecified());
        assert_ne!(socket.port(), 0);
    }

    #[test]
    fn test_receive_returns_sender() {
        let socket = DatagramSocket::bind(0).unwrap();
        socket
            .set_poll_interval(Some(Duration::from_secs(2)))
            .unwrap();

        let client = UdpSocket::bind("127.0.0.1:0").unwrap();
        client.send_to(b"pose", loopback(socket.port())).unwrap();

        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        let (len, sender) = socket.receive(&mut buf).unwrap().unwrap();
        assert_eq!(&buf[..len], b"pose");
        assert_eq!(sender, client.local_addr().unwrap());
    }

    #[test]
    fn test_poll_interval_elapses_without_data() {
        let socket = DatagramSocket::bind(0).unwrap();
        socket
            .set_poll_interval(Some(Duration::from_millis(10)))
            .unwrap();

        let mut buf = [0u8; 16];
        assert!(socket.receive(&mut buf).unwrap().is_none());
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_rebind_same_port_with_reuse() {
        let first = DatagramSocket::bind(0).unwrap();
        let second = DatagramSocket::bind(first.port());
        assert!(second.is_ok());
    }

    #[test]
    fn test_bind_sets_reuse_address() {
        let socket = DatagramSocket::bind(0).unwrap();
        let reuse = socket2::SockRef::from(&socket.socket)
            .reuse_address()
            .unwrap();
        assert!(reuse);
    }

    #[test]
    fn test_closed_socket_error_classification() {
        assert!(is_closed_socket_error(&ErrorKind::NotConnected.into()));
        assert!(!is_closed_socket_error(&ErrorKind::ConnectionReset.into()));
        assert!(!is_closed_socket_error(&ErrorKind::ConnectionRefused.into()));
        assert!(!is_closed_socket_error(&std::io::Error::other("driver hiccup")));
    }

    #[test]
    #[cfg(unix)]
    fn test_bad_descriptor_counts_as_closed() {
        let err = std::io::Error::from_raw_os_error(libc::EBADF);
        assert!(is_closed_socket_error(&err));
    }
}
