use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use handstream_client::{DuplexClient, DuplexConfig, FrameSize, FrameSource, TickOutcome};
use tracing::{debug, info};

use crate::cmd::{listen::install_ctrlc_handler, parse_duration, StreamArgs};
use crate::exit::{client_error, io_error, CliError, CliResult, FAILURE, SUCCESS, USAGE};
use crate::output::{print_pose, OutputFormat};

/// Tick period of the foreground loop; well under one frame interval.
const TICK: Duration = Duration::from_millis(2);

pub fn run(args: StreamArgs, format: OutputFormat) -> CliResult<i32> {
    let connect_timeout = parse_duration(&args.connect_timeout)?;
    let mut source = FileFrames::load(&args.files, args.frame_size)?;

    let config = DuplexConfig::new(args.host.clone(), args.port)
        .with_target_fps(args.fps)
        .with_jpeg_quality(args.quality)
        .with_connect_timeout(connect_timeout);
    let mut client =
        DuplexClient::open(config).map_err(|err| client_error("connect failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0u64;
    while running.load(Ordering::SeqCst) {
        match client.tick_send(&mut source) {
            Ok(TickOutcome::Sent { bytes }) => debug!(bytes, "frame sent"),
            Ok(_) => {}
            Err(err) => return Err(client_error("send failed", err)),
        }

        if let Some(message) = client.poll() {
            printed = printed.saturating_add(1);
            print_pose(&message, &args.host, printed, format);
            if args.count.is_some_and(|count| printed >= count) {
                break;
            }
        }

        if !client.is_running() {
            client.close();
            return Err(CliError::new(FAILURE, "peer closed the connection"));
        }

        std::thread::sleep(TICK);
    }

    info!(
        sent = client.frames_sent(),
        received = client.received_packet_count(),
        "stream finished"
    );
    client.close();
    Ok(SUCCESS)
}

/// Frame source that cycles through pre-encoded image files.
#[derive(Debug)]
struct FileFrames {
    frames: Vec<Bytes>,
    size: FrameSize,
    next: usize,
}

impl FileFrames {
    fn load(paths: &[PathBuf], size: FrameSize) -> CliResult<Self> {
        if paths.is_empty() {
            return Err(CliError::new(USAGE, "at least one --file is required"));
        }
        let frames = paths
            .iter()
            .map(|path| {
                fs::read(path)
                    .map(Bytes::from)
                    .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))
            })
            .collect::<CliResult<Vec<_>>>()?;

        Ok(Self::from_frames(frames, size))
    }

    fn from_frames(frames: Vec<Bytes>, size: FrameSize) -> Self {
        Self {
            frames,
            size,
            next: 0,
        }
    }
}

impl FrameSource for FileFrames {
    fn is_active(&self) -> bool {
        !self.frames.is_empty()
    }

    fn frame_size(&self) -> FrameSize {
        self.size
    }

    // Files are already encoded; quality only matters to a live encoder.
    fn encode_frame(&mut self, _quality: u8) -> io::Result<Bytes> {
        let frame = self
            .frames
            .get(self.next)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no frames loaded"))?;
        self.next = (self.next + 1) % self.frames.len();
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_frames_cycle_in_order() {
        let mut frames = FileFrames::from_frames(
            vec![Bytes::from_static(b"one"), Bytes::from_static(b"two")],
            FrameSize::new(640, 480),
        );
        assert!(frames.is_active());
        assert_eq!(frames.encode_frame(70).unwrap(), Bytes::from_static(b"one"));
        assert_eq!(frames.encode_frame(70).unwrap(), Bytes::from_static(b"two"));
        assert_eq!(frames.encode_frame(70).unwrap(), Bytes::from_static(b"one"));
    }

    #[test]
    fn empty_source_is_inactive() {
        let mut frames = FileFrames::from_frames(Vec::new(), FrameSize::new(640, 480));
        assert!(!frames.is_active());
        assert!(frames.encode_frame(70).is_err());
    }

    #[test]
    fn missing_file_is_reported() {
        let err = FileFrames::load(
            &[PathBuf::from("/nonexistent/handstream/frame.jpg")],
            FrameSize::new(640, 480),
        )
        .unwrap_err();
        assert!(err.message.contains("failed reading"));
    }
}
