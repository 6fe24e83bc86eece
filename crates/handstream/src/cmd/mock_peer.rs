use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs};

use handstream_client::HandPose;
use handstream_frame::{FrameError, FrameReader, FrameWriter};
use handstream_transport::{DatagramSocket, TcpTransport};
use tracing::{debug, info, warn};

use crate::cmd::MockPeerArgs;
use crate::exit::{
    client_error, frame_error, io_error, transport_error, CliError, CliResult, SUCCESS, USAGE,
};

/// Stands in for a hand tracker: one client, one pose per received frame.
pub fn run(args: MockPeerArgs) -> CliResult<i32> {
    let pose = HandPose::from_json(&args.pose).map_err(|err| client_error("--pose", err))?;
    let reply = pose
        .to_json()
        .map_err(|err| client_error("--pose", err))?
        .into_bytes();

    let forward = match args.forward_udp.as_deref() {
        Some(addr) => {
            let target = resolve(addr)?;
            let socket = DatagramSocket::bind(0)
                .map_err(|err| transport_error("udp socket failed", err))?;
            Some((target, socket))
        }
        None => None,
    };

    let listener =
        TcpTransport::listen(&args.bind).map_err(|err| transport_error("bind failed", err))?;
    info!(addr = %listener.local_addr(), "mock peer waiting for a client");

    let stream = listener
        .accept()
        .map_err(|err| transport_error("accept failed", err))?;
    let peer = stream.peer_addr().ok();
    info!(peer = ?peer, "client connected");

    let reader_stream = stream
        .try_clone()
        .map_err(|err| transport_error("clone failed", err))?;
    let mut reader = FrameReader::new(reader_stream);
    let mut writer = FrameWriter::new(stream);

    let mut frames = 0u64;
    loop {
        let frame = match reader.read_frame() {
            Ok(frame) => frame,
            Err(err) if err.is_recoverable() => {
                warn!(error = %err, "skipping frame header");
                continue;
            }
            Err(err) if is_disconnect(&err) => break,
            Err(err) => return Err(frame_error("receive failed", err)),
        };
        frames += 1;
        debug!(frames, bytes = frame.payload.len(), "frame received");

        if !args.no_reply {
            match writer.send(&reply) {
                Ok(()) => {}
                Err(err) if is_disconnect(&err) => break,
                Err(err) => return Err(frame_error("reply failed", err)),
            }
        }
        if let Some((target, socket)) = &forward {
            if let Err(err) = socket.send_to(&reply, *target) {
                warn!(error = %err, %target, "pose forward failed");
            }
        }
    }

    info!(frames, "client disconnected");
    Ok(SUCCESS)
}

fn is_disconnect(err: &FrameError) -> bool {
    match err {
        FrameError::ConnectionClosed => true,
        FrameError::Io(source) | FrameError::Write(source) => matches!(
            source.kind(),
            ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe
        ),
        _ => false,
    }
}

fn resolve(addr: &str) -> CliResult<SocketAddr> {
    addr.to_socket_addrs()
        .map_err(|err| io_error(&format!("invalid address {addr}"), err))?
        .next()
        .ok_or_else(|| CliError::new(USAGE, format!("address {addr} did not resolve")))
}
