//! Codec limits.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Largest payload the protocol accepts for a single packet.
pub const PROTOCOL_MAX_PAYLOAD: usize = 0x6400_0000;

/// Limits applied to every decode, encode, size and validation walk.
///
/// Loadable from any serde format; missing keys take their defaults:
///
/// ```
/// use hyproto_codec::CodecOptions;
///
/// let opts: CodecOptions = serde_json::from_str(r#"{ "max_depth": 8 }"#).unwrap();
/// assert_eq!(opts.max_depth, 8);
/// assert_eq!(opts.max_packet_size, hyproto_codec::PROTOCOL_MAX_PAYLOAD);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecOptions {
    /// How many nested records (including polymorphic members) may sit
    /// below the root before the walk fails with `DepthExceeded`.
    pub max_depth: usize,
    /// Upper bound applied to every encoded packet, on top of its own
    /// declared maximum.
    pub max_packet_size: usize,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_packet_size: PROTOCOL_MAX_PAYLOAD,
        }
    }
}

/// Remaining recursion budget, threaded by value through every walk.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Depth {
    level: usize,
    max: usize,
}

impl Depth {
    pub(crate) fn root(options: &CodecOptions) -> Self {
        Self {
            level: 0,
            max: options.max_depth,
        }
    }

    /// Budget for one level further down.
    pub(crate) fn descend(self) -> Result<Self, ProtocolError> {
        let level = self.level + 1;
        if level > self.max {
            return Err(ProtocolError::DepthExceeded {
                max_depth: self.max,
            });
        }
        Ok(Self { level, ..self })
    }
}
