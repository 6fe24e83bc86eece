use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use handstream_client::FrameSize;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod listen;
pub mod mock_peer;
pub mod stream;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Stream image files to a duplex peer and print the poses it returns.
    Stream(StreamArgs),
    /// Receive poses as UDP datagrams and print them.
    Listen(ListenArgs),
    /// Accept one duplex client and answer every frame with a fixed pose.
    MockPeer(MockPeerArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Stream(args) => stream::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::MockPeer(args) => mock_peer::run(args),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct StreamArgs {
    /// Peer host name or address.
    #[arg(long, env = "HANDSTREAM_HOST", default_value = "127.0.0.1")]
    pub host: String,
    /// Peer port.
    #[arg(long, env = "HANDSTREAM_PORT", default_value_t = handstream_client::config::DEFAULT_DUPLEX_PORT)]
    pub port: u16,
    /// Encoded image to send; repeat to cycle through several.
    #[arg(long = "file", required = true, value_name = "PATH")]
    pub files: Vec<PathBuf>,
    /// Frames per second. 0 disables sending.
    #[arg(long, env = "HANDSTREAM_FPS", default_value_t = handstream_client::config::DEFAULT_TARGET_FPS)]
    pub fps: u32,
    /// Quality hint reported with each frame (1-100).
    #[arg(long, default_value_t = handstream_client::config::DEFAULT_JPEG_QUALITY)]
    pub quality: u8,
    /// Dimensions of the images, e.g. 640x480.
    #[arg(long, default_value = "640x480")]
    pub frame_size: FrameSize,
    /// Exit after printing N poses.
    #[arg(long)]
    pub count: Option<u64>,
    /// Connect timeout (e.g. 2s, 500ms).
    #[arg(long, default_value = "5s")]
    pub connect_timeout: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Local UDP port. 0 picks a free port.
    #[arg(long, env = "HANDSTREAM_LISTEN_PORT", default_value_t = handstream_client::config::DEFAULT_LISTEN_PORT)]
    pub port: u16,
    /// Exit after printing N poses.
    #[arg(long)]
    pub count: Option<u64>,
    /// Give up after this long without finishing (e.g. 10s).
    #[arg(long)]
    pub timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct MockPeerArgs {
    /// Address to accept the duplex client on.
    #[arg(long, default_value = "127.0.0.1:5055")]
    pub bind: String,
    /// Also send every pose as a datagram to this address.
    #[arg(long, value_name = "ADDR")]
    pub forward_udp: Option<String>,
    /// Pose JSON to answer with.
    #[arg(
        long,
        default_value = r#"{"left":{"x":320,"y":240,"pinch":0.5},"right":null}"#
    )]
    pub pose: String,
    /// Do not answer on the duplex connection; only forward over UDP.
    #[arg(long, requires = "forward_udp")]
    pub no_reply: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("  ").is_err());
    }
}
