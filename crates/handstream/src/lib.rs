//! Frame streaming to a hand-tracking peer, with hand poses coming back.
//!
//! handstream sends compressed camera frames over a length-prefixed TCP
//! connection and receives JSON hand poses, either on the same connection or
//! as UDP datagrams. Only the newest pose is kept for the caller.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP duplex streams and the reusable UDP socket
//! - [`frame`]: little-endian length-prefixed framing
//! - [`client`]: duplex client, datagram receiver and latest-pose mailbox
//!   (behind the `client` feature)

/// Re-export transport types.
pub mod transport {
    pub use handstream_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use handstream_frame::*;
}

/// Re-export client types (requires `client` feature).
#[cfg(feature = "client")]
pub mod client {
    pub use handstream_client::*;
}
