//! # Finger Joint Messages
//!
//! The finger joint has two topics, both carrying a single `f64`:
//!
//! - `target`: the demanded joint position, published by whatever commands the finger.
//! - `command`: the effort demand computed by the control loop, consumed by the actuator driver.
//!
//! On the wire a message is a single UTF-8 frame of the form `"<topic> <value>"`. The topic prefix
//! lets subscribers filter with `set_subscribe()`. The value is written using the standard float
//! formatting so that `NaN` and `inf` make it across unchanged.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Topic on which target positions are published.
pub const TARGET_TOPIC: &str = "target";

/// Topic on which effort commands are published.
pub const COMMAND_TOPIC: &str = "command";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single message on one of the finger topics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FingerMsg {
    /// Which topic the message belongs to
    pub topic: FingerTopic,

    /// The carried value. For `Target` this is a position in radians, for `Command` it's an effort.
    pub data: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The topics used by the finger joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FingerTopic {
    Target,
    Command,
}

/// Errors which can occur while decoding a frame.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FrameError {
    #[error("The frame is not valid UTF-8")]
    NotUtf8,

    #[error("Expected a frame of the form \"<topic> <value>\", found {0:?}")]
    Malformed(String),

    #[error("Unknown topic {0:?}")]
    UnknownTopic(String),

    #[error("Could not parse the value {0:?} as a float")]
    InvalidValue(String),

    #[error("Expected a message on the {expected:?} topic, found one on {found:?}")]
    WrongTopic {
        expected: FingerTopic,
        found: FingerTopic,
    },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FingerMsg {
    /// Build a new target message.
    pub fn target(target_rad: f64) -> Self {
        Self {
            topic: FingerTopic::Target,
            data: target_rad,
        }
    }

    /// Build a new command message.
    pub fn command(command: f64) -> Self {
        Self {
            topic: FingerTopic::Command,
            data: command,
        }
    }

    /// Encode the message into its wire frame.
    pub fn to_frame(&self) -> String {
        format!("{} {}", self.topic, self.data)
    }

    /// Decode a message from a wire frame.
    pub fn from_frame(frame: &str) -> Result<Self, FrameError> {
        let mut parts = frame.trim().splitn(2, ' ');

        let (topic, value) = match (parts.next(), parts.next()) {
            (Some(t), Some(v)) => (t, v.trim()),
            _ => return Err(FrameError::Malformed(frame.to_string())),
        };

        let topic = topic.parse::<FingerTopic>()?;
        let data = value
            .parse::<f64>()
            .map_err(|_| FrameError::InvalidValue(value.to_string()))?;

        Ok(Self { topic, data })
    }

    /// Decode a raw zmq message payload.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        let frame = std::str::from_utf8(bytes).map_err(|_| FrameError::NotUtf8)?;
        Self::from_frame(frame)
    }

    /// Return the carried value if this message is on the `expected` topic.
    pub fn expect_topic(self, expected: FingerTopic) -> Result<f64, FrameError> {
        if self.topic == expected {
            Ok(self.data)
        } else {
            Err(FrameError::WrongTopic {
                expected,
                found: self.topic,
            })
        }
    }
}

impl FingerTopic {
    /// The topic string used as the frame prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            FingerTopic::Target => TARGET_TOPIC,
            FingerTopic::Command => COMMAND_TOPIC,
        }
    }
}

impl fmt::Display for FingerTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FingerTopic {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            TARGET_TOPIC => Ok(FingerTopic::Target),
            COMMAND_TOPIC => Ok(FingerTopic::Command),
            t => Err(FrameError::UnknownTopic(t.to_string())),
        }
    }
}
