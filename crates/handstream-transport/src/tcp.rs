use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// A connected TCP stream used by the duplex path. Implements `Read + Write`.
///
/// Small writes are never coalesced: `TCP_NODELAY` is enabled on every
/// stream this module hands out, so a single frame is flushed promptly.
pub struct DuplexStream {
    inner: TcpStream,
}

impl Read for DuplexStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for DuplexStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl DuplexStream {
    fn from_tcp(stream: TcpStream) -> Result<Self> {
        stream.set_nodelay(true)?;
        Ok(Self { inner: stream })
    }

    /// Clone the handle so reads and writes can run on different threads.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            inner: self.inner.try_clone()?,
        })
    }

    /// Shut down both directions of the connection.
    ///
    /// A read blocked on any clone of this stream returns 0 afterwards. Errors
    /// from an already disconnected socket are ignored.
    pub fn shutdown(&self) {
        if let Err(err) = self.inner.shutdown(Shutdown::Both) {
            debug!(error = %err, "tcp shutdown on already closed stream");
        }
    }

    pub fn peer_addr(&self) -> Result<SocketAddr> {
        self.inner.peer_addr().map_err(Into::into)
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.inner.local_addr().map_err(Into::into)
    }

    pub fn nodelay(&self) -> Result<bool> {
        self.inner.nodelay().map_err(Into::into)
    }
}

impl std::fmt::Debug for DuplexStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplexStream")
            .field("peer", &self.inner.peer_addr().ok())
            .finish()
    }
}

/// TCP transport.
///
/// Clients use [`TcpTransport::connect`]. The listening side exists for the
/// mock peer and tests.
pub struct TcpTransport {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl TcpTransport {
    /// Connect to `host:port`, trying each resolved address once.
    ///
    /// There is no retry: the first pass over the resolved addresses either
    /// yields a stream or the last connect error.
    pub fn connect(host: &str, port: u16) -> Result<DuplexStream> {
        Self::connect_inner(host, port, None)
    }

    /// Like [`TcpTransport::connect`], bounding each attempt by `timeout`.
    pub fn connect_timeout(host: &str, port: u16, timeout: Duration) -> Result<DuplexStream> {
        Self::connect_inner(host, port, Some(timeout))
    }

    fn connect_inner(host: &str, port: u16, timeout: Option<Duration>) -> Result<DuplexStream> {
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|source| TransportError::Connect {
                addr: format!("{host}:{port}"),
                source,
            })?
            .collect();

        let mut last_err = None;
        for addr in addrs {
            let attempt = match timeout {
                Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => {
                    let stream = DuplexStream::from_tcp(stream)?;
                    info!(%addr, "connected to duplex peer");
                    return Ok(stream);
                }
                Err(err) => {
                    debug!(%addr, error = %err, "connect attempt failed");
                    last_err = Some(TransportError::connect(addr, err));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| TransportError::Resolve {
            host: host.to_string(),
            port,
        }))
    }

    /// Bind and listen on `addr`.
    pub fn listen(addr: impl ToSocketAddrs) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, "listening for duplex clients");
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<DuplexStream> {
        let (stream, peer) = self.listener.accept()?;
        debug!(%peer, "accepted duplex client");
        DuplexStream::from_tcp(stream)
    }

    /// The address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listen_accept_connect() {
        let listener = TcpTransport::listen("127.0.0.1:0").unwrap();
        let port = listener.local_addr().port();

        let handle = std::thread::spawn(move || {
            let mut client = TcpTransport::connect("127.0.0.1", port).unwrap();
            assert!(client.nodelay().unwrap());
            client.write_all(b"hello").unwrap();
        });

        let mut server = listener.accept().unwrap();
        let mut buf = [0u8; 5];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");

        handle.join().unwrap();
    }

    #[test]
    fn test_connect_refused_fails_fast() {
        // Grab a free port, then release it so nothing is listening there.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let result = TcpTransport::connect("127.0.0.1", port);
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }

    #[test]
    fn test_shutdown_unblocks_reader_clone() {
        let listener = TcpTransport::listen("127.0.0.1:0").unwrap();
        let port = listener.local_addr().port();

        let client = TcpTransport::connect("127.0.0.1", port).unwrap();
        let _server = listener.accept().unwrap();

        let mut reader = client.try_clone().unwrap();
        let handle = std::thread::spawn(move || {
            let mut buf = [0u8; 4];
            reader.read(&mut buf).unwrap_or(0)
        });

        std::thread::sleep(Duration::from_millis(20));
        client.shutdown();
        assert_eq!(handle.join().unwrap(), 0);

        // Second shutdown on an already closed stream is harmless.
        client.shutdown();
    }

    #[test]
    fn test_unresolvable_host() {
        let result = TcpTransport::connect("host.invalid", 5055);
        assert!(matches!(
            result,
            Err(TransportError::Connect { .. }) | Err(TransportError::Resolve { .. })
        ));
    }
}
