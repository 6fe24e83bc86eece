//! Duplex frame streaming and latest-pose handoff.
//!
//! This is the "just works" layer. [`DuplexClient`] sends camera frames and
//! receives hand poses on one TCP connection; [`DatagramReceiver`] receives
//! the same poses over UDP. Both run a background receive thread that hands
//! the newest pose to the caller through a [`Mailbox`], dropping any pose the
//! caller did not poll in time.

pub mod adapter;
pub mod config;
pub mod datagram;
pub mod duplex;
pub mod error;
pub mod mailbox;
pub mod pose;
pub mod receiver;
pub mod sender;

pub use adapter::{HandReceiver, PoseAdapter, PoseSource, ReceiveMode};
pub use config::{DatagramConfig, DuplexConfig};
pub use datagram::DatagramReceiver;
pub use duplex::DuplexClient;
pub use error::{ClientError, Result};
pub use mailbox::Mailbox;
pub use pose::{HandData, HandPose, PoseMessage};
pub use receiver::{ReceiveStats, StatsSnapshot};
pub use sender::{FrameSender, FrameSize, FrameSource, RateGate, TickOutcome};
