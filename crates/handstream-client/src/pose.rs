use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// Position of one hand in image pixels plus a pinch strength in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HandData {
    pub x: i32,
    pub y: i32,
    pub pinch: f32,
}

/// One hand-tracking result. A side that was not detected is `None`.
///
/// Wire form: `{"left":{"x":1,"y":2,"pinch":0.5},"right":null}`. A missing
/// key reads as absent and unknown keys are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HandPose {
    pub left: Option<HandData>,
    pub right: Option<HandData>,
}

impl HandPose {
    /// Decode a pose from UTF-8 JSON bytes, ignoring surrounding whitespace.
    pub fn from_slice(payload: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(payload)?;
        Self::from_json(text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ClientError::EmptyPayload);
        }
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Returns true when neither hand is present.
    pub fn is_empty(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// A decoded pose as handed from a receive loop to the consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseMessage {
    /// The payload text as received, whitespace-trimmed.
    pub json: String,
    pub pose: HandPose,
    /// Datagram sender. `None` on the duplex path, where the peer is fixed.
    pub sender: Option<SocketAddr>,
}

impl PoseMessage {
    /// Decode a message from raw payload bytes.
    pub fn decode(payload: &[u8], sender: Option<SocketAddr>) -> Result<Self> {
        let text = std::str::from_utf8(payload)?.trim();
        let pose = HandPose::from_json(text)?;
        Ok(Self {
            json: text.to_string(),
            pose,
            sender,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_left_present_right_null() {
        let pose =
            HandPose::from_json(r#"{"left":{"x":1,"y":2,"pinch":0.5},"right":null}"#).unwrap();
        assert_eq!(
            pose.left,
            Some(HandData {
                x: 1,
                y: 2,
                pinch: 0.5
            })
        );
        assert!(pose.right.is_none());
    }

    #[test]
    fn missing_keys_are_absent() {
        let pose = HandPose::from_json(r#"{"right":{"x":640,"y":360,"pinch":0.0}}"#).unwrap();
        assert!(pose.left.is_none());
        assert_eq!(pose.right.map(|h| h.x), Some(640));

        assert!(HandPose::from_json("{}").unwrap().is_empty());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let pose =
            HandPose::from_json(r#"{"left":{"x":3,"y":4,"pinch":1.0,"z":9},"ts":12}"#).unwrap();
        assert_eq!(pose.left.map(|h| (h.x, h.y)), Some((3, 4)));
    }

    #[test]
    fn whitespace_only_is_empty_payload() {
        let err = HandPose::from_json("  \n").unwrap_err();
        assert!(matches!(err, ClientError::EmptyPayload));
        assert!(err.is_decode_error());
    }

    #[test]
    fn invalid_json_and_utf8_are_decode_errors() {
        assert!(HandPose::from_json("{not json").unwrap_err().is_decode_error());
        assert!(HandPose::from_slice(&[0xFF, 0xFE])
            .unwrap_err()
            .is_decode_error());
    }

    #[test]
    fn message_keeps_trimmed_text_and_sender() {
        let sender: SocketAddr = "127.0.0.1:5000".parse().unwrap();
        let msg = PoseMessage::decode(b"  {\"left\":null,\"right\":null}\n", Some(sender)).unwrap();
        assert_eq!(msg.json, r#"{"left":null,"right":null}"#);
        assert_eq!(msg.sender, Some(sender));
        assert!(msg.pose.is_empty());
    }

    #[test]
    fn serializes_absent_side_as_null() {
        let pose = HandPose {
            left: None,
            right: Some(HandData {
                x: 10,
                y: 20,
                pinch: 0.25,
            }),
        };
        assert_eq!(
            pose.to_json().unwrap(),
            r#"{"left":null,"right":{"x":10,"y":20,"pinch":0.25}}"#
        );
    }
}
