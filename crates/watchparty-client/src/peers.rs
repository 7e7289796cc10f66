//! Telemetry about the other members of a room.

use std::collections::HashMap;
use watchparty_core::StatsUpdate;

/// Last `statsUpdate` seen from one peer.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerInfo {
    pub username: String,
    /// One-way latency to the relay, in milliseconds.
    pub latency_ms: f64,
    /// Peer's playback position in seconds.
    pub position: f64,
    pub platform: String,
    /// Local time (ms) the update arrived.
    pub last_seen_ms: i64,
}

/// Room members keyed by username.
#[derive(Debug, Default)]
pub struct PeerTable {
    peers: HashMap<String, PeerInfo>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an update. Returns the stored entry.
    pub fn update(&mut self, stats: &StatsUpdate, now_ms: i64) -> &PeerInfo {
        let entry = self
            .peers
            .entry(stats.username.clone())
            .or_insert_with(|| PeerInfo {
                username: stats.username.clone(),
                latency_ms: 0.0,
                position: 0.0,
                platform: String::new(),
                last_seen_ms: now_ms,
            });
        entry.latency_ms = stats.latency;
        entry.position = stats.time;
        entry.platform.clone_from(&stats.platform);
        entry.last_seen_ms = now_ms;
        entry
    }

    pub fn get(&self, username: &str) -> Option<&PeerInfo> {
        self.peers.get(username)
    }

    /// Get peers.
    pub fn peers(&self) -> impl Iterator<Item = &PeerInfo> {
        self.peers.values()
    }

    /// Get peer count.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Drop peers not heard from since `cutoff_ms`.
    pub fn prune(&mut self, cutoff_ms: i64) -> usize {
        let before = self.peers.len();
        self.peers.retain(|_, p| p.last_seen_ms >= cutoff_ms);
        before - self.peers.len()
    }
}
