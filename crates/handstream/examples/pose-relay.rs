//! Streams a synthetic frame to a duplex peer and mirrors the returned pose
//! into a receive-only consumer through the adapter.
//!
//! Start a peer first:
//!   cargo run --features cli -- mock-peer --bind 127.0.0.1:5055
//!
//! Then:
//!   cargo run --example pose-relay

use std::time::{Duration, Instant};

use bytes::Bytes;
use handstream::client::{
    DuplexClient, DuplexConfig, FrameSize, FrameSource, HandReceiver, PoseSource, ReceiveMode,
};

/// A fixed blob standing in for an encoded camera frame.
struct TestPattern;

impl FrameSource for TestPattern {
    fn is_active(&self) -> bool {
        true
    }

    fn frame_size(&self) -> FrameSize {
        FrameSize::new(640, 480)
    }

    fn encode_frame(&mut self, _quality: u8) -> std::io::Result<Bytes> {
        Ok(Bytes::from(vec![0xA5u8; 4096]))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut client = DuplexClient::open(DuplexConfig::default().with_target_fps(10))?;
    let mut consumer = HandReceiver::open(ReceiveMode::Adapter)?;
    let mut source = TestPattern;

    eprintln!("Connected; streaming for five seconds");
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline && client.is_running() {
        client.tick_send(&mut source)?;
        client.poll();
        consumer.poll(Some(&client as &dyn PoseSource))?;

        if let Some(left) = consumer.pose().left {
            eprintln!("left hand at ({}, {}) pinch {:.2}", left.x, left.y, left.pinch);
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    eprintln!(
        "Sent {} frames, received {} poses",
        client.frames_sent(),
        client.received_packet_count()
    );
    client.close();
    consumer.close();
    Ok(())
}
