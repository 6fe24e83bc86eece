//! Receive-only consumers.
//!
//! A [`HandReceiver`] either owns a [`DatagramReceiver`] or mirrors the pose
//! another component already holds, such as a [`crate::DuplexClient`] that is
//! also streaming frames. Mirroring goes through a [`PoseAdapter`], which only
//! ever reads from its source.

use tracing::{debug, trace};

use crate::config::DatagramConfig;
use crate::datagram::DatagramReceiver;
use crate::error::{ClientError, Result};
use crate::pose::HandPose;

/// Anything that holds a most recent hand pose.
pub trait PoseSource {
    fn current_pose(&self) -> &HandPose;
}

impl PoseSource for HandPose {
    fn current_pose(&self) -> &HandPose {
        self
    }
}

/// Copies a source's pose into a locally owned one on every tick.
#[derive(Debug, Clone, Default)]
pub struct PoseAdapter {
    pose: HandPose,
}

impl PoseAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy both sides from `source`. A side the source does not have is
    /// cleared here too.
    pub fn tick<S: PoseSource + ?Sized>(&mut self, source: &S) {
        let upstream = source.current_pose();
        self.pose.left = upstream.left;
        self.pose.right = upstream.right;
    }

    pub fn pose(&self) -> &HandPose {
        &self.pose
    }
}

/// Where a [`HandReceiver`] gets its poses from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveMode {
    /// Open a UDP socket on `listen_port`.
    Datagram { listen_port: u16 },
    /// Mirror a [`PoseSource`] passed to each [`HandReceiver::poll`].
    Adapter,
}

impl ReceiveMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiveMode::Datagram { .. } => "datagram",
            ReceiveMode::Adapter => "adapter",
        }
    }
}

#[derive(Debug)]
enum Inner {
    Datagram(DatagramReceiver),
    Adapter(PoseAdapter),
    Closed,
}

/// A consumer that only receives poses.
#[derive(Debug)]
pub struct HandReceiver {
    mode: ReceiveMode,
    inner: Inner,
    pose: HandPose,
}

impl HandReceiver {
    /// Open with default datagram settings for the chosen mode.
    pub fn open(mode: ReceiveMode) -> Result<Self> {
        match mode {
            ReceiveMode::Datagram { listen_port } => {
                Self::open_datagram(DatagramConfig::new(listen_port))
            }
            ReceiveMode::Adapter => Ok(Self {
                mode,
                inner: Inner::Adapter(PoseAdapter::new()),
                pose: HandPose::default(),
            }),
        }
    }

    pub fn open_datagram(config: DatagramConfig) -> Result<Self> {
        let mode = ReceiveMode::Datagram {
            listen_port: config.listen_port,
        };
        let receiver = DatagramReceiver::open(config)?;
        Ok(Self {
            mode,
            inner: Inner::Datagram(receiver),
            pose: HandPose::default(),
        })
    }

    /// Refresh [`HandReceiver::pose`]. Returns true if it was updated.
    ///
    /// In adapter mode `source` is mirrored on every call; without one the
    /// pose is left unchanged. In datagram mode `source` is ignored.
    pub fn poll(&mut self, source: Option<&dyn PoseSource>) -> Result<bool> {
        match &mut self.inner {
            Inner::Datagram(receiver) => match receiver.poll() {
                Some(message) => {
                    self.pose = message.pose;
                    Ok(true)
                }
                None => Ok(false),
            },
            Inner::Adapter(adapter) => {
                let Some(source) = source else {
                    trace!("adapter poll without a source");
                    return Ok(false);
                };
                adapter.tick(source);
                self.pose = *adapter.pose();
                Ok(true)
            }
            Inner::Closed => Err(ClientError::NotOpen),
        }
    }

    pub fn pose(&self) -> &HandPose {
        &self.pose
    }

    pub fn mode(&self) -> ReceiveMode {
        self.mode
    }

    /// Locally bound UDP port in datagram mode.
    pub fn port(&self) -> Option<u16> {
        match &self.inner {
            Inner::Datagram(receiver) => Some(receiver.port()),
            _ => None,
        }
    }

    pub fn received_packet_count(&self) -> u64 {
        match &self.inner {
            Inner::Datagram(receiver) => receiver.received_packet_count(),
            _ => 0,
        }
    }

    pub fn close(&mut self) {
        if let Inner::Datagram(mut receiver) = std::mem::replace(&mut self.inner, Inner::Closed) {
            receiver.close();
        }
        debug!(mode = self.mode.as_str(), "hand receiver closed");
    }
}

impl PoseSource for HandReceiver {
    fn current_pose(&self) -> &HandPose {
        &self.pose
    }
}

#[cfg(test)]
mod tests {
    use std::net::UdpSocket;
    use std::time::{Duration, Instant};

    use handstream_transport::loopback;

    use super::*;
    use crate::pose::HandData;

    fn hand(x: i32, y: i32, pinch: f32) -> Option<HandData> {
        Some(HandData { x, y, pinch })
    }

    #[test]
    fn adapter_copies_both_sides() {
        let upstream = HandPose {
            left: hand(10, 20, 0.25),
            right: hand(-3, 4, 1.0),
        };
        let mut adapter = PoseAdapter::new();
        adapter.tick(&upstream);
        assert_eq!(adapter.pose(), &upstream);
    }

    #[test]
    fn adapter_propagates_absence() {
        let mut adapter = PoseAdapter::new();
        adapter.tick(&HandPose {
            left: hand(1, 1, 0.5),
            right: hand(2, 2, 0.5),
        });

        adapter.tick(&HandPose {
            left: None,
            right: hand(5, 5, 0.0),
        });
        assert!(adapter.pose().left.is_none());
        assert_eq!(adapter.pose().right, hand(5, 5, 0.0));
    }

    #[test]
    fn adapter_does_not_touch_source() {
        let upstream = HandPose {
            left: hand(7, 8, 0.9),
            right: None,
        };
        let before = upstream;
        let mut adapter = PoseAdapter::new();
        adapter.tick(&upstream);
        adapter.tick(&upstream);
        assert_eq!(upstream, before);
    }

    #[test]
    fn receiver_in_adapter_mode_mirrors_source() {
        let mut receiver = HandReceiver::open(ReceiveMode::Adapter).unwrap();
        assert_eq!(receiver.port(), None);
        assert!(!receiver.poll(None).unwrap());

        let upstream = HandPose {
            left: None,
            right: hand(3, 4, 0.5),
        };
        assert!(receiver.poll(Some(&upstream)).unwrap());
        assert_eq!(receiver.pose(), &upstream);
    }

    #[test]
    fn receiver_in_datagram_mode_receives() {
        let mut receiver = HandReceiver::open_datagram(
            DatagramConfig::new(0).with_poll_interval(Duration::from_millis(10)),
        )
        .unwrap();
        let target = loopback(receiver.port().unwrap());

        let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
        peer.send_to(br#"{"left":{"x":1,"y":2,"pinch":0.5}}"#, target)
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        let mut updated = false;
        while !updated && Instant::now() < deadline {
            updated = receiver.poll(None).unwrap();
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(updated);
        assert_eq!(receiver.pose().left, hand(1, 2, 0.5));
        assert!(receiver.pose().right.is_none());
    }

    #[test]
    fn closed_receiver_rejects_poll() {
        let mut receiver = HandReceiver::open(ReceiveMode::Adapter).unwrap();
        receiver.close();
        receiver.close();
        assert!(matches!(receiver.poll(None), Err(ClientError::NotOpen)));
    }
}
