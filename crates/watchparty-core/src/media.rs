//! Media identity and transport verbs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identity of the title or stream loaded in a room.
///
/// The relay sends this as the `videoUrl` of an `init` message; the engine
/// only compares it for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(String);

impl MediaId {
    /// Create a media id from a URL or other opaque string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MediaId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for MediaId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Transport verb shared by wire messages, player events and the echo guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Seek,
    Play,
    Pause,
}

impl TransportKind {
    /// All verbs, in index order.
    pub const ALL: [TransportKind; 3] = [TransportKind::Seek, TransportKind::Play, TransportKind::Pause];

    /// Stable slot index (0..3).
    pub fn index(self) -> usize {
        match self {
            TransportKind::Seek => 0,
            TransportKind::Play => 1,
            TransportKind::Pause => 2,
        }
    }

    /// Wire event name.
    pub fn as_str(self) -> &'static str {
        match self {
            TransportKind::Seek => "seek",
            TransportKind::Play => "play",
            TransportKind::Pause => "pause",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod media_id {
        use super::*;

        #[test]
        fn compares_by_value() {
            assert_eq!(MediaId::new("https://cdn/a.m3u8"), MediaId::from("https://cdn/a.m3u8"));
            assert_ne!(MediaId::new("a"), MediaId::new("b"));
        }

        #[test]
        fn serializes_as_plain_string() {
            let json = serde_json::to_string(&MediaId::new("movie.mp4")).unwrap();
            assert_eq!(json, "\"movie.mp4\"");
        }
    }

    mod transport_kind {
        use super::*;

        #[test]
        fn indices_are_distinct() {
            let mut seen = [false; 3];
            for kind in TransportKind::ALL {
                assert!(!seen[kind.index()]);
                seen[kind.index()] = true;
            }
        }

        #[test]
        fn names_match_wire_events() {
            assert_eq!(TransportKind::Seek.to_string(), "seek");
            assert_eq!(TransportKind::Play.to_string(), "play");
            assert_eq!(TransportKind::Pause.to_string(), "pause");
        }
    }
}
