//! Playback synchronization state machine.
//!
//! The controller owns the room record, the clock estimator and the echo
//! guard, and drives a [`PlaybackAdapter`]. It performs no I/O itself:
//! every handler queues outbound relay messages and session events, which
//! the owning session drains after each call. All handlers run on one task,
//! so they never interleave.

use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, warn};
use watchparty_core::{
    Chat, GetState, Init, JoinRoom, MediaId, Message, PongCheck, Result, StatsUpdate, SyncState,
    TransportKind,
};
use watchparty_timing::{ClockSync, LocalClock};
use crate::{EchoGuard, PeerTable, PlaybackAdapter, RoomState, SessionEvent, SyncConfig, SyncStats};

/// Why a drift-correction tick did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No clock probe has completed yet.
    NoClockEstimate,
    /// No room state has been received yet.
    NoRoomState,
}

/// Result of one drift-correction tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    Skipped(SkipReason),
    /// Drift exceeded the hard threshold; the player was seeked.
    HardResync { expected: f64, diff: f64 },
    /// Playback rate adjusted to converge drift.
    Nudged { rate: f64, diff: f64 },
    /// The player refused the correction; retried next tick.
    AdapterFailed,
}

/// Synchronization engine for one client in one room.
pub struct SyncController<A: PlaybackAdapter> {
    config: SyncConfig,
    room_id: String,
    username: String,
    adapter: A,
    clock: ClockSync,
    guard: EchoGuard,
    room: Option<RoomState>,
    /// `room.last_update_at` is in local time, stamped before the first clock
    /// estimate; rebased onto relay time when the estimate arrives.
    stamped_locally: bool,
    /// Media the adapter last loaded successfully.
    loaded_media: Option<MediaId>,
    peers: PeerTable,
    stats: Arc<SyncStats>,
    ticks: u64,
    outbox: VecDeque<Message>,
    events: VecDeque<SessionEvent>,
}

impl<A: PlaybackAdapter> SyncController<A> {
    /// Create a controller for `username` in `room_id`.
    ///
    /// Fails with [`Error::InvalidConfig`](watchparty_core::Error::InvalidConfig)
    /// if `config` does not validate.
    pub fn new(
        config: SyncConfig,
        room_id: impl Into<String>,
        username: impl Into<String>,
        adapter: A,
        clock: Arc<dyn LocalClock>,
    ) -> Result<Self> {
        config.validate()?;
        let mut clock_sync = ClockSync::new(clock);
        if let Some(alpha) = config.clock_smoothing {
            clock_sync = clock_sync.with_smoothing(alpha);
        }
        let guard = EchoGuard::new(config.echo_window_ms());
        Ok(Self {
            config,
            room_id: room_id.into(),
            username: username.into(),
            adapter,
            clock: clock_sync,
            guard,
            room: None,
            stamped_locally: false,
            loaded_media: None,
            peers: PeerTable::new(),
            stats: SyncStats::new(),
            ticks: 0,
            outbox: VecDeque::new(),
            events: VecDeque::new(),
        })
    }

    /// Share an existing statistics block.
    pub fn with_stats(mut self, stats: Arc<SyncStats>) -> Self {
        self.stats = stats;
        self
    }

    // Relay link lifecycle

    /// Relay link (re)established: join, then pull state immediately.
    ///
    /// Anything broadcast while disconnected was lost, so waiting for the
    /// periodic pull would leave the room diverged for up to a full cycle.
    pub fn on_connected(&mut self) {
        info!(room = %self.room_id, user = %self.username, "Joining room");
        self.outbox.push_back(Message::JoinRoom(JoinRoom {
            room_id: self.room_id.clone(),
            username: self.username.clone(),
        }));
        self.request_full_sync();
        self.send_probe();
        self.events.push_back(SessionEvent::Connected);
    }

    /// Relay link lost. The room record goes stale until reconnect.
    pub fn on_disconnected(&mut self) {
        warn!(room = %self.room_id, "Relay link lost");
        self.events.push_back(SessionEvent::Disconnected);
    }

    /// Queue a clock probe.
    pub fn send_probe(&mut self) {
        let ping = self.clock.probe();
        SyncStats::bump(&self.stats.probes_sent);
        self.outbox.push_back(Message::PingCheck(ping));
    }

    /// Queue a full authoritative state pull.
    pub fn request_full_sync(&mut self) {
        self.outbox.push_back(Message::GetState(GetState {
            room_id: self.room_id.clone(),
        }));
    }

    /// Queue a chat line.
    pub fn send_chat(&mut self, message: impl Into<String>) {
        self.outbox.push_back(Message::Chat(Chat {
            room_id: self.room_id.clone(),
            username: self.username.clone(),
            message: message.into(),
        }));
    }

    // Inbound relay messages

    /// Apply one message from the relay.
    pub fn handle_message(&mut self, message: Message) {
        if let Some((kind, command)) = message.as_transport() {
            if command.room_id != self.room_id {
                debug!(room = %command.room_id, "Ignoring {} for another room", kind);
                return;
            }
            self.apply_remote(kind, command.time);
            return;
        }

        match message {
            Message::PongCheck(pong) => self.handle_pong(&pong),
            Message::SyncState(state) => self.apply_full_sync(&state),
            Message::Init(init) => self.apply_init(init),
            Message::StatsUpdate(stats) => {
                if stats.username != self.username {
                    let now = self.clock.local_now();
                    let info = self.peers.update(&stats, now).clone();
                    self.events.push_back(SessionEvent::PeerStats(info));
                }
            }
            Message::Chat(chat) => {
                if chat.room_id == self.room_id {
                    self.events.push_back(SessionEvent::Chat {
                        username: chat.username,
                        message: chat.message,
                    });
                }
            }
            other => debug!("Ignoring relay-bound message {}", other.event_name()),
        }
    }

    fn handle_pong(&mut self, pong: &PongCheck) {
        // Rejected probes are logged by ClockSync and leave the estimate alone.
        if let Ok(estimate) = self.clock.on_pong(pong) {
            SyncStats::bump(&self.stats.probes_answered);
            if self.stamped_locally {
                if let Some(room) = self.room.as_mut() {
                    let local = room.last_update_at;
                    room.last_update_at = estimate.local_to_relay(local);
                    debug!(local, relay = room.last_update_at, "Rebased room stamp onto relay clock");
                }
                self.stamped_locally = false;
            }
            self.outbox.push_back(Message::StatsUpdate(StatsUpdate {
                username: self.username.clone(),
                latency: estimate.latency_ms,
                time: self.adapter.position(),
                platform: self.config.platform.clone(),
            }));
        }
    }

    /// Relay time for a room stamp, falling back to local time before the
    /// first clock estimate.
    fn stamp_now(&mut self) -> i64 {
        match self.clock.now() {
            Some(relay_now) => {
                self.stamped_locally = false;
                relay_now
            }
            None => {
                self.stamped_locally = true;
                self.clock.local_now()
            }
        }
    }

    fn apply_remote(&mut self, kind: TransportKind, position: f64) {
        let relay_now = self.stamp_now();
        // A seek leaves the player's paused state alone.
        let seed_paused = match kind {
            TransportKind::Play => false,
            TransportKind::Pause => true,
            TransportKind::Seek => self.adapter.is_paused(),
        };
        let room = self
            .room
            .get_or_insert_with(|| RoomState::new(position, seed_paused, relay_now));
        match kind {
            TransportKind::Play => room.apply_remote_play(position, relay_now),
            TransportKind::Pause => room.apply_remote_pause(position, relay_now),
            TransportKind::Seek => room.apply_remote_seek(position, relay_now),
        }
        debug!(position, "Applying remote {}", kind);

        match kind {
            TransportKind::Seek => {
                self.seek_adapter(position);
            }
            TransportKind::Play | TransportKind::Pause => {
                if (self.adapter.position() - position).abs() > self.config.seek_tolerance_secs {
                    self.seek_adapter(position);
                }
                self.set_adapter_paused(kind == TransportKind::Pause);
            }
        }
        self.events.push_back(SessionEvent::RemoteAction { kind, position });
    }

    fn apply_full_sync(&mut self, state: &SyncState) {
        self.stamped_locally = false;
        match self.room.as_mut() {
            Some(room) => room.apply_remote_full_sync(state.current_time, state.paused, state.last_update),
            None => self.room = Some(RoomState::from_sync(state)),
        }
        debug!(
            position = state.current_time,
            paused = state.paused,
            last_update = state.last_update,
            "Full state sync"
        );
        if let Some(room) = &self.room {
            self.events.push_back(SessionEvent::StateSynced(room.clone()));
        }
    }

    fn apply_init(&mut self, init: Init) {
        self.stamped_locally = false;
        let mut room = self
            .room
            .take()
            .unwrap_or_else(|| RoomState::new(init.current_time, init.paused, init.last_update));
        room.apply_remote_full_sync(init.current_time, init.paused, init.last_update);
        let changed = room.set_media(init.video_url.clone(), init.title.clone());
        self.room = Some(room);

        if changed {
            info!(media = %init.video_url, title = %init.title, "Room media changed");
            self.events.push_back(SessionEvent::MediaChanged {
                media: init.video_url,
                title: init.title,
            });
        }
        self.ensure_media_loaded();
    }

    /// Load the room's media into the player if it is not already there.
    fn ensure_media_loaded(&mut self) {
        let Some(media) = self.room.as_ref().and_then(|r| r.media.clone()) else {
            return;
        };
        if self.loaded_media.as_ref() == Some(&media) {
            return;
        }
        match self.adapter.load(&media) {
            Ok(()) => {
                info!(media = %media, "Loaded media");
                self.loaded_media = Some(media);
            }
            Err(e) => {
                SyncStats::bump(&self.stats.adapter_failures);
                warn!(media = %media, "Media load failed, retrying next tick: {}", e);
            }
        }
    }

    // Player events

    /// Handle a transport event reported by the player.
    ///
    /// Events the engine caused are swallowed; anything else is a user
    /// action and is broadcast to the room.
    pub fn handle_adapter_event(&mut self, kind: TransportKind) {
        let now = self.clock.local_now();
        if self.guard.should_suppress(kind, now) {
            SyncStats::bump(&self.stats.echoes_suppressed);
            debug!("Suppressed echo of {}", kind);
            return;
        }

        let position = self.adapter.position();
        let relay_now = self.stamp_now();
        match self.room.as_mut() {
            Some(room) => room.record_local_user_action(kind, position, relay_now),
            None => {
                let paused = self.adapter.is_paused();
                self.room = Some(RoomState::new(position, paused, relay_now));
            }
        }

        info!(position, "Broadcasting local {}", kind);
        SyncStats::bump(&self.stats.local_actions);
        self.outbox.push_back(Message::transport(kind, self.room_id.clone(), position));
        self.events.push_back(SessionEvent::LocalAction { kind, position });
    }

    // Drift correction

    /// Run one drift-correction tick.
    pub fn tick(&mut self) -> TickOutcome {
        let now = self.clock.local_now();
        let expired = self.guard.expire(now);
        if expired > 0 {
            debug!(expired, "Echo guard arms expired unconsumed");
        }

        self.ticks += 1;
        SyncStats::bump(&self.stats.ticks);
        if self.config.full_sync_every_ticks > 0 && self.ticks % self.config.full_sync_every_ticks == 0 {
            self.request_full_sync();
            let pruned = self.peers.prune(now - self.config.peer_timeout_ms());
            if pruned > 0 {
                debug!(pruned, "Dropped silent peers");
            }
        }
        self.ensure_media_loaded();

        let Some(relay_now) = self.clock.now() else {
            SyncStats::bump(&self.stats.ticks_skipped);
            debug!("No clock estimate yet, skipping drift correction");
            return TickOutcome::Skipped(SkipReason::NoClockEstimate);
        };
        let (expected, room_paused) = match &self.room {
            Some(room) => (
                room.projected_position(relay_now, self.clock.latency_ms()),
                room.paused,
            ),
            None => {
                SyncStats::bump(&self.stats.ticks_skipped);
                return TickOutcome::Skipped(SkipReason::NoRoomState);
            }
        };

        let actual = self.adapter.position();
        let diff = expected - actual;

        let outcome = if diff.abs() > self.config.hard_threshold_secs {
            if self.seek_adapter(expected) {
                SyncStats::bump(&self.stats.hard_resyncs);
                info!(diff, expected, "Hard resync");
                TickOutcome::HardResync { expected, diff }
            } else {
                TickOutcome::AdapterFailed
            }
        } else {
            let rate = self.config.nudge_rate(diff);
            match self.adapter.set_rate(rate) {
                Ok(()) => {
                    SyncStats::bump(&self.stats.nudges);
                    debug!(diff, rate, "Nudged playback rate");
                    TickOutcome::Nudged { rate, diff }
                }
                Err(e) => {
                    SyncStats::bump(&self.stats.adapter_failures);
                    warn!("Setting playback rate failed: {}", e);
                    TickOutcome::AdapterFailed
                }
            }
        };

        // Retries a play/pause the player refused earlier.
        self.set_adapter_paused(room_paused);
        outcome
    }

    fn seek_adapter(&mut self, target: f64) -> bool {
        self.guard.arm(TransportKind::Seek, self.clock.local_now());
        match self.adapter.set_position(target) {
            Ok(()) => true,
            Err(e) => {
                self.guard.disarm(TransportKind::Seek);
                SyncStats::bump(&self.stats.adapter_failures);
                warn!("Seek to {:.2}s failed, retrying next tick: {}", target, e);
                false
            }
        }
    }

    fn set_adapter_paused(&mut self, paused: bool) -> bool {
        if self.adapter.is_paused() == paused {
            return true;
        }
        let kind = if paused { TransportKind::Pause } else { TransportKind::Play };
        self.guard.arm(kind, self.clock.local_now());
        let result = if paused { self.adapter.pause() } else { self.adapter.play() };
        match result {
            Ok(()) => true,
            Err(e) => {
                self.guard.disarm(kind);
                SyncStats::bump(&self.stats.adapter_failures);
                warn!("{} failed, retrying next tick: {}", kind, e);
                false
            }
        }
    }

    // Output queues

    /// Take queued outbound relay messages.
    pub fn drain_outbound(&mut self) -> Vec<Message> {
        self.outbox.drain(..).collect()
    }

    /// Take queued session events.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        self.events.drain(..).collect()
    }

    // Accessors

    pub fn room(&self) -> Option<&RoomState> {
        self.room.as_ref()
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn clock_sync(&self) -> &ClockSync {
        &self.clock
    }

    pub fn guard(&self) -> &EchoGuard {
        &self.guard
    }

    pub fn peers(&self) -> &PeerTable {
        &self.peers
    }

    pub fn stats(&self) -> &Arc<SyncStats> {
        &self.stats
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MockPlaybackAdapter;
    use watchparty_core::{AdapterError, TransportCommand};
    use watchparty_timing::ManualClock;

    const LOCAL: i64 = 1_000_000;
    const T: i64 = 1_700_000_000_000;
    const ROOM: &str = "room-1";

    fn controller(adapter: MockPlaybackAdapter) -> (SyncController<MockPlaybackAdapter>, ManualClock) {
        let clock = ManualClock::new(LOCAL);
        let controller = SyncController::new(
            SyncConfig::default(),
            ROOM,
            "ana",
            adapter,
            Arc::new(clock.clone()),
        )
        .unwrap();
        (controller, clock)
    }

    /// Feed a pong that makes relay time read `relay_now` with `latency_ms`.
    fn synchronize(controller: &mut SyncController<MockPlaybackAdapter>, relay_now: i64, latency_ms: i64) {
        let local = controller.clock_sync().local_now();
        controller.handle_message(Message::PongCheck(PongCheck {
            client_sent: local - 2 * latency_ms,
            server_time: relay_now - latency_ms,
        }));
        controller.drain_outbound();
    }

    fn sync_state(position: f64, paused: bool, last_update: i64) -> Message {
        Message::SyncState(SyncState {
            current_time: position,
            paused,
            last_update,
        })
    }

    fn transport(kind: TransportKind, time: f64) -> Message {
        Message::transport(kind, ROOM, time)
    }

    fn outbound_of(messages: &[Message], kind: TransportKind) -> Vec<f64> {
        messages
            .iter()
            .filter_map(|m| m.as_transport())
            .filter(|(k, _)| *k == kind)
            .map(|(_, c)| c.time)
            .collect()
    }

    mod drift {
        use super::*;

        #[test]
        fn skipped_without_clock_estimate() {
            let (mut controller, _) = controller(MockPlaybackAdapter::new());
            controller.handle_message(sync_state(10.0, false, T));
            assert_eq!(controller.tick(), TickOutcome::Skipped(SkipReason::NoClockEstimate));
            assert_eq!(controller.stats().snapshot().ticks_skipped, 1);
        }

        #[test]
        fn skipped_without_room_state() {
            let mut adapter = MockPlaybackAdapter::new();
            adapter.expect_position().return_const(0.0);
            let (mut controller, _) = controller(adapter);
            synchronize(&mut controller, T, 0);
            assert_eq!(controller.tick(), TickOutcome::Skipped(SkipReason::NoRoomState));
        }

        #[test]
        fn large_drift_seeks_once_without_rate_change() {
            let mut adapter = MockPlaybackAdapter::new();
            adapter.expect_position().return_const(118.5);
            adapter.expect_is_paused().return_const(true);
            adapter
                .expect_set_position()
                .withf(|secs| (*secs - 120.0).abs() < 1e-9)
                .times(1)
                .returning(|_| Ok(()));
            adapter.expect_set_rate().times(0);

            let (mut controller, _) = controller(adapter);
            synchronize(&mut controller, T + 3_000, 50);
            controller.handle_message(sync_state(120.0, true, T));

            match controller.tick() {
                TickOutcome::HardResync { expected, diff } => {
                    assert_eq!(expected, 120.0);
                    assert!((diff - 1.5).abs() < 1e-9);
                }
                other => panic!("unexpected {:?}", other),
            }
            assert!(controller.guard().is_armed(TransportKind::Seek, LOCAL));
            assert_eq!(controller.stats().snapshot().hard_resyncs, 1);
        }

        #[test]
        fn small_drift_nudges_rate_without_seek() {
            let mut adapter = MockPlaybackAdapter::new();
            adapter.expect_position().return_const(13.6);
            adapter.expect_is_paused().return_const(false);
            adapter.expect_set_position().times(0);
            adapter
                .expect_set_rate()
                .withf(|rate| (*rate - 1.03).abs() < 1e-9)
                .times(1)
                .returning(|_| Ok(()));

            let (mut controller, _) = controller(adapter);
            // Playing from 10.0 at T; 4000 ms later with 100 ms latency => 13.9.
            synchronize(&mut controller, T + 4_000, 100);
            controller.handle_message(sync_state(10.0, false, T));

            match controller.tick() {
                TickOutcome::Nudged { rate, diff } => {
                    assert!((rate - 1.03).abs() < 1e-9);
                    assert!((diff - 0.3).abs() < 1e-9);
                }
                other => panic!("unexpected {:?}", other),
            }
        }

        #[test]
        fn joiner_sees_paused_position_without_elapsed_time() {
            let mut adapter = MockPlaybackAdapter::new();
            adapter.expect_position().return_const(120.0);
            adapter.expect_is_paused().return_const(true);
            adapter
                .expect_set_rate()
                .withf(|rate| (*rate - 1.0).abs() < 1e-9)
                .times(1)
                .returning(|_| Ok(()));

            let (mut controller, _) = controller(adapter);
            synchronize(&mut controller, T + 3_000, 50);
            controller.handle_message(sync_state(120.0, true, T));
            assert!(matches!(controller.tick(), TickOutcome::Nudged { .. }));
        }

        #[test]
        fn failed_seek_is_retried_next_tick() {
            let mut adapter = MockPlaybackAdapter::new();
            adapter.expect_position().return_const(0.0);
            adapter.expect_is_paused().return_const(true);
            let mut calls = 0;
            adapter.expect_set_position().times(2).returning(move |_| {
                calls += 1;
                if calls == 1 {
                    Err(AdapterError::NotReady.into())
                } else {
                    Ok(())
                }
            });

            let (mut controller, _) = controller(adapter);
            synchronize(&mut controller, T, 0);
            controller.handle_message(sync_state(30.0, true, T));

            assert_eq!(controller.tick(), TickOutcome::AdapterFailed);
            assert!(!controller.guard().is_armed(TransportKind::Seek, LOCAL));
            assert!(matches!(controller.tick(), TickOutcome::HardResync { .. }));
            assert_eq!(controller.stats().snapshot().adapter_failures, 1);
        }

        #[test]
        fn paused_mismatch_is_reconciled() {
            let mut adapter = MockPlaybackAdapter::new();
            adapter.expect_position().return_const(5.0);
            adapter.expect_is_paused().return_const(true);
            adapter.expect_set_rate().returning(|_| Ok(()));
            adapter.expect_play().times(1).returning(|| Ok(()));

            let (mut controller, _) = controller(adapter);
            synchronize(&mut controller, T, 0);
            controller.handle_message(sync_state(5.0, false, T));
            controller.tick();
            assert!(controller.guard().is_armed(TransportKind::Play, LOCAL));
        }

        #[test]
        fn periodic_full_sync_pull() {
            let (mut controller, _) = controller(MockPlaybackAdapter::new());
            for _ in 0..10 {
                controller.tick();
            }
            let pulls = controller
                .drain_outbound()
                .into_iter()
                .filter(|m| matches!(m, Message::GetState(_)))
                .count();
            assert_eq!(pulls, 2);
        }
    }

    mod echo {
        use super::*;

        #[test]
        fn remote_seek_echo_is_swallowed_once() {
            let mut adapter = MockPlaybackAdapter::new();
            adapter.expect_position().return_const(50.0);
            adapter.expect_is_paused().return_const(false);
            adapter.expect_set_position().times(1).returning(|_| Ok(()));

            let (mut controller, _) = controller(adapter);
            controller.handle_message(transport(TransportKind::Seek, 50.0));
            controller.handle_adapter_event(TransportKind::Seek);
            assert!(outbound_of(&controller.drain_outbound(), TransportKind::Seek).is_empty());

            controller.handle_adapter_event(TransportKind::Seek);
            assert_eq!(outbound_of(&controller.drain_outbound(), TransportKind::Seek), vec![50.0]);
            assert_eq!(controller.stats().snapshot().echoes_suppressed, 1);
        }

        #[test]
        fn stale_arm_lets_user_action_through() {
            let mut adapter = MockPlaybackAdapter::new();
            adapter.expect_position().return_const(50.0);
            adapter.expect_is_paused().return_const(false);
            adapter.expect_set_position().returning(|_| Ok(()));

            let (mut controller, clock) = controller(adapter);
            controller.handle_message(transport(TransportKind::Seek, 50.0));
            clock.advance(controller.config().echo_window_ms() + 1);
            controller.handle_adapter_event(TransportKind::Seek);
            assert_eq!(outbound_of(&controller.drain_outbound(), TransportKind::Seek).len(), 1);
        }

        #[test]
        fn user_pause_is_broadcast_and_recorded() {
            let mut adapter = MockPlaybackAdapter::new();
            adapter.expect_position().return_const(42.0);
            adapter.expect_is_paused().return_const(true);

            let (mut controller, _) = controller(adapter);
            synchronize(&mut controller, T, 0);
            controller.handle_message(sync_state(40.0, false, T - 2_000));
            controller.handle_adapter_event(TransportKind::Pause);

            let out = controller.drain_outbound();
            assert_eq!(
                out,
                vec![Message::Pause(TransportCommand {
                    room_id: ROOM.to_string(),
                    time: 42.0,
                })]
            );
            let room = controller.room().unwrap();
            assert!(room.paused);
            assert_eq!(room.position, 42.0);
            assert_eq!(room.last_update_at, T);
        }

        #[test]
        fn failed_play_disarms_guard() {
            let mut adapter = MockPlaybackAdapter::new();
            adapter.expect_position().return_const(10.0);
            adapter.expect_is_paused().return_const(true);
            adapter
                .expect_play()
                .times(1)
                .returning(|| Err(AdapterError::Rejected("autoplay blocked".into()).into()));

            let (mut controller, _) = controller(adapter);
            controller.handle_message(transport(TransportKind::Play, 10.0));
            assert!(!controller.guard().is_armed(TransportKind::Play, LOCAL));
            assert!(!controller.room().unwrap().paused);
        }
    }

    mod remote {
        use super::*;

        #[test]
        fn play_seeks_when_far_then_plays() {
            let mut adapter = MockPlaybackAdapter::new();
            let mut seq = mockall::Sequence::new();
            adapter.expect_position().return_const(3.0);
            adapter.expect_is_paused().return_const(true);
            adapter
                .expect_set_position()
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_| Ok(()));
            adapter.expect_play().times(1).in_sequence(&mut seq).returning(|| Ok(()));

            let (mut controller, _) = controller(adapter);
            controller.handle_message(transport(TransportKind::Play, 60.0));
            assert!(controller.guard().is_armed(TransportKind::Seek, LOCAL));
            assert!(controller.guard().is_armed(TransportKind::Play, LOCAL));
            assert!(controller.drain_outbound().is_empty());
        }

        #[test]
        fn pause_near_position_does_not_seek() {
            let mut adapter = MockPlaybackAdapter::new();
            adapter.expect_position().return_const(60.2);
            adapter.expect_is_paused().return_const(false);
            adapter.expect_set_position().times(0);
            adapter.expect_pause().times(1).returning(|| Ok(()));

            let (mut controller, _) = controller(adapter);
            controller.handle_message(transport(TransportKind::Pause, 60.0));
            assert!(controller.room().unwrap().paused);
        }

        #[test]
        fn seek_into_empty_room_keeps_player_paused() {
            let mut adapter = MockPlaybackAdapter::new();
            adapter.expect_position().return_const(50.0);
            adapter.expect_is_paused().return_const(true);
            adapter.expect_set_position().times(1).returning(|_| Ok(()));
            adapter.expect_set_rate().returning(|_| Ok(()));
            adapter.expect_play().times(0);

            let (mut controller, _) = controller(adapter);
            synchronize(&mut controller, T, 0);
            controller.handle_message(transport(TransportKind::Seek, 50.0));
            assert!(controller.room().unwrap().paused);
            assert!(matches!(controller.tick(), TickOutcome::Nudged { .. }));
        }

        #[test]
        fn stamps_before_first_pong_are_rebased() {
            let mut adapter = MockPlaybackAdapter::new();
            adapter.expect_position().return_const(10.0);
            adapter.expect_is_paused().return_const(false);
            adapter.expect_pause().times(1).returning(|| Ok(()));
            adapter.expect_set_position().times(0);
            adapter
                .expect_set_rate()
                .withf(|rate| (*rate - 1.0).abs() < 1e-9)
                .times(1)
                .returning(|_| Ok(()));

            let (mut controller, _) = controller(adapter);
            controller.handle_message(transport(TransportKind::Pause, 10.0));
            controller.handle_message(transport(TransportKind::Play, 10.0));
            assert_eq!(controller.room().unwrap().last_update_at, LOCAL);

            // Relay clock runs 20 s ahead of ours.
            synchronize(&mut controller, LOCAL + 20_000, 0);
            assert_eq!(controller.room().unwrap().last_update_at, LOCAL + 20_000);
            match controller.tick() {
                TickOutcome::Nudged { diff, .. } => assert!(diff.abs() < 1e-9),
                other => panic!("unexpected {:?}", other),
            }
        }

        #[test]
        fn relay_stamped_state_is_not_rebased() {
            let mut adapter = MockPlaybackAdapter::new();
            adapter.expect_position().return_const(0.0);
            adapter.expect_is_paused().return_const(true);
            adapter.expect_pause().returning(|| Ok(()));

            let (mut controller, _) = controller(adapter);
            controller.handle_message(transport(TransportKind::Pause, 0.0));
            controller.handle_message(sync_state(12.0, true, T));
            synchronize(&mut controller, T + 5_000, 0);
            assert_eq!(controller.room().unwrap().last_update_at, T);
        }

        #[test]
        fn other_room_is_ignored() {
            let (mut controller, _) = controller(MockPlaybackAdapter::new());
            controller.handle_message(Message::transport(TransportKind::Seek, "elsewhere", 5.0));
            assert!(controller.room().is_none());
        }

        #[test]
        fn full_sync_does_not_touch_adapter() {
            let (mut controller, _) = controller(MockPlaybackAdapter::new());
            controller.handle_message(sync_state(12.0, true, T));
            controller.handle_message(sync_state(12.0, true, T));
            assert_eq!(controller.room(), Some(&RoomState::new(12.0, true, T)));
        }

        #[test]
        fn init_loads_media_once() {
            let mut adapter = MockPlaybackAdapter::new();
            adapter
                .expect_load()
                .withf(|m| m.as_str() == "https://cdn/movie.m3u8")
                .times(1)
                .returning(|_| Ok(()));

            let (mut controller, _) = controller(adapter);
            let init = Init {
                video_url: MediaId::new("https://cdn/movie.m3u8"),
                title: "Movie".into(),
                current_time: 30.0,
                paused: true,
                last_update: T,
            };
            controller.handle_message(Message::Init(init.clone()));
            controller.handle_message(Message::Init(init));

            let room = controller.room().unwrap();
            assert_eq!(room.title, "Movie");
            assert_eq!(room.position, 30.0);
            let changes = controller
                .drain_events()
                .into_iter()
                .filter(|e| matches!(e, SessionEvent::MediaChanged { .. }))
                .count();
            assert_eq!(changes, 1);
        }

        #[test]
        fn pong_emits_stats_update() {
            let mut adapter = MockPlaybackAdapter::new();
            adapter.expect_position().return_const(7.0);
            let (mut controller, _) = controller(adapter);
            controller.handle_message(Message::PongCheck(PongCheck {
                client_sent: LOCAL - 80,
                server_time: T,
            }));
            match controller.drain_outbound().as_slice() {
                [Message::StatsUpdate(stats)] => {
                    assert_eq!(stats.username, "ana");
                    assert_eq!(stats.latency, 40.0);
                    assert_eq!(stats.time, 7.0);
                }
                other => panic!("unexpected {:?}", other),
            }
        }

        #[test]
        fn peer_stats_tracked_but_own_ignored() {
            let (mut controller, _) = controller(MockPlaybackAdapter::new());
            for user in ["ana", "bo"] {
                controller.handle_message(Message::StatsUpdate(StatsUpdate {
                    username: user.into(),
                    latency: 12.0,
                    time: 3.0,
                    platform: "macos".into(),
                }));
            }
            assert_eq!(controller.peers().len(), 1);
            assert!(controller.peers().get("bo").is_some());
        }

        #[test]
        fn silent_peers_pruned_on_full_sync_cadence() {
            let (mut controller, clock) = controller(MockPlaybackAdapter::new());
            let update = |user: &str| {
                Message::StatsUpdate(StatsUpdate {
                    username: user.into(),
                    latency: 12.0,
                    time: 3.0,
                    platform: "macos".into(),
                })
            };
            controller.handle_message(update("bo"));
            clock.advance(controller.config().peer_timeout_ms() + 1);
            controller.handle_message(update("cy"));

            for _ in 0..4 {
                controller.tick();
            }
            assert_eq!(controller.peers().len(), 2);
            controller.tick();
            assert!(controller.peers().get("bo").is_none());
            assert!(controller.peers().get("cy").is_some());
        }

        #[test]
        fn chat_surfaces_as_event() {
            let (mut controller, _) = controller(MockPlaybackAdapter::new());
            controller.handle_message(Message::Chat(Chat {
                room_id: ROOM.into(),
                username: "bo".into(),
                message: "hello".into(),
            }));
            assert!(matches!(
                controller.drain_events().as_slice(),
                [SessionEvent::Chat { username, .. }] if username == "bo"
            ));
        }
    }

    mod config {
        use super::*;
        use watchparty_core::Error;

        #[test]
        fn new_rejects_inverted_rate_bounds() {
            let config = SyncConfig {
                min_rate: 1.1,
                ..Default::default()
            };
            let result = SyncController::new(
                config,
                ROOM,
                "ana",
                MockPlaybackAdapter::new(),
                Arc::new(ManualClock::new(LOCAL)),
            );
            assert!(matches!(result, Err(Error::InvalidConfig(_))));
        }

        #[test]
        fn new_rejects_nan_rate_bound() {
            let config = SyncConfig {
                min_rate: f64::NAN,
                ..Default::default()
            };
            let result = SyncController::new(
                config,
                ROOM,
                "ana",
                MockPlaybackAdapter::new(),
                Arc::new(ManualClock::new(LOCAL)),
            );
            assert!(result.is_err());
        }
    }

    mod reconnect {
        use super::*;

        #[test]
        fn connect_joins_then_pulls_state() {
            let (mut controller, _) = controller(MockPlaybackAdapter::new());
            controller.on_connected();
            let out = controller.drain_outbound();
            assert!(matches!(
                out.as_slice(),
                [Message::JoinRoom(join), Message::GetState(_), Message::PingCheck(ping)]
                    if join.room_id == ROOM && join.username == "ana" && ping.client_time == LOCAL
            ));
            assert_eq!(controller.stats().snapshot().probes_sent, 1);
        }

        #[test]
        fn every_reconnect_pulls_again() {
            let (mut controller, _) = controller(MockPlaybackAdapter::new());
            controller.on_connected();
            controller.on_disconnected();
            controller.on_connected();
            let pulls = controller
                .drain_outbound()
                .into_iter()
                .filter(|m| matches!(m, Message::GetState(_)))
                .count();
            assert_eq!(pulls, 2);
        }
    }
}
