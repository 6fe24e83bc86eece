use std::sync::Arc;

use handstream_transport::DatagramSocket;
use tracing::{debug, info};

use crate::adapter::PoseSource;
use crate::config::DatagramConfig;
use crate::error::Result;
use crate::pose::{HandPose, PoseMessage};
use crate::receiver::{run_datagram_loop, LoopShared, ReceiveWorker, StatsSnapshot};

/// Receives unframed JSON poses on a local UDP port.
///
/// One datagram carries one pose. Datagrams that are empty after trimming
/// whitespace are ignored.
pub struct DatagramReceiver {
    config: DatagramConfig,
    port: u16,
    shared: Arc<LoopShared>,
    worker: Option<ReceiveWorker>,
    pose: HandPose,
}

impl DatagramReceiver {
    /// Bind the port and start the receive thread.
    pub fn open(config: DatagramConfig) -> Result<Self> {
        let socket = DatagramSocket::bind(config.listen_port)?;
        socket.set_poll_interval(Some(config.poll_interval))?;
        let port = socket.port();

        let shared = Arc::new(LoopShared::new());
        let worker = {
            let shared = Arc::clone(&shared);
            ReceiveWorker::spawn("handstream-datagram-rx", move || {
                run_datagram_loop(socket, &shared)
            })?
        };

        info!(port, "datagram receiver listening");

        Ok(Self {
            config,
            port,
            shared,
            worker: Some(worker),
            pose: HandPose::default(),
        })
    }

    /// Copy the newest pose, if any, into [`DatagramReceiver::current_pose`].
    pub fn poll(&mut self) -> Option<PoseMessage> {
        let message = self.try_consume_latest()?;
        self.pose = message.pose;
        debug!(json = %message.json, sender = ?message.sender, "hand pose");
        Some(message)
    }

    pub fn try_consume_latest(&self) -> Option<PoseMessage> {
        self.shared.mailbox.take_if_new()
    }

    /// Stop the receive thread. The socket is released when the thread
    /// exits, at most one poll interval later.
    pub fn close(&mut self) {
        let Some(mut worker) = self.worker.take() else {
            return;
        };
        self.shared.stop();
        worker.join_timeout(self.config.join_timeout);
        debug!(port = self.port, "datagram receiver closed");
    }

    pub fn current_pose(&self) -> &HandPose {
        &self.pose
    }

    /// Locally bound port; differs from the configured one when that was `0`.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn received_packet_count(&self) -> u64 {
        self.shared.stats.received_packets()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }
}

impl PoseSource for DatagramReceiver {
    fn current_pose(&self) -> &HandPose {
        &self.pose
    }
}

impl Drop for DatagramReceiver {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for DatagramReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatagramReceiver")
            .field("port", &self.port)
            .field("running", &self.shared.is_running())
            .finish()
    }
}
