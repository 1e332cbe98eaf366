//! The per-player playback state machine.

use crate::events::{EventSink, PlayerId};
use crate::tap::CaptureTap;
use crate::{PlaybackError, PlaybackStatus, PlayerState, SessionConfig};
use crossbeam_channel::Receiver;
use spectap_core::CaptureFrame;
use spectap_io::{EngineEvent, LoadToken, MediaEngine, MediaInfo, SourceLocator};
use std::time::{Duration, Instant};

/// One player: a media engine, its capture tap and the lifecycle around them.
///
/// Every method runs on the control context. Engine notifications queue up
/// in `engine_events` and take effect on the next [`pump`](Self::pump).
pub struct PlaybackSession {
    id: PlayerId,
    status: PlaybackStatus,
    loaded: bool,
    position_ms: u64,
    duration_ms: u64,
    error: Option<PlaybackError>,
    looping: bool,
    sample_rate: f64,
    token: LoadToken,
    rearm_at: Option<Instant>,

    engine: Box<dyn MediaEngine>,
    engine_events: Receiver<EngineEvent>,
    tap: CaptureTap,
    sink: EventSink,

    capture_size: usize,
    rearm_delay: Duration,
    default_sample_rate: f64,
}

impl PlaybackSession {
    /// Creates a session in [`PlaybackStatus::Unknown`].
    pub fn new(
        id: impl Into<PlayerId>,
        engine: Box<dyn MediaEngine>,
        engine_events: Receiver<EngineEvent>,
        sink: EventSink,
        config: &SessionConfig,
    ) -> Self {
        let id = id.into();
        let tap = CaptureTap::new(PlayerId::clone(&id), config.capture_size, sink.clone());
        Self {
            id,
            status: PlaybackStatus::Unknown,
            loaded: false,
            position_ms: 0,
            duration_ms: 0,
            error: None,
            looping: false,
            sample_rate: config.default_sample_rate,
            token: LoadToken::first(),
            rearm_at: None,
            engine,
            engine_events,
            tap,
            sink,
            capture_size: config.capture_size,
            rearm_delay: config.loop_rearm_delay,
            default_sample_rate: config.default_sample_rate,
        }
    }

    /// Player id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current status.
    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    /// Whether the last `play` asked for looping.
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Whether the capture tap is installed on the engine.
    pub fn capture_enabled(&self) -> bool {
        self.tap.is_enabled()
    }

    /// When a pending loop re-arm is due, if one is scheduled.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.rearm_at
    }

    /// Resets the session and starts loading `locator`.
    ///
    /// Completion arrives later through [`pump`](Self::pump). A locator that
    /// cannot be parsed moves the session to `Error` right away.
    pub fn set_data_source(&mut self, locator: &str) {
        self.reset();
        match SourceLocator::parse(locator) {
            Ok(source) => {
                tracing::info!(player = %self.id, source = %source, token = self.token.get(), "loading source");
                self.engine.load(&source, self.token);
            }
            Err(e) => self.fail(PlaybackError::source_load(
                e.code(),
                "invalid source locator",
                Some(e.to_string()),
            )),
        }
    }

    /// Starts or resumes playback. A no-op unless `Ready`, `Paused` or `Stopped`.
    pub fn play(&mut self, looping: bool) {
        if !self.status.can_play() {
            tracing::debug!(player = %self.id, status = %self.status, "play ignored");
            return;
        }
        if self.status == PlaybackStatus::Stopped {
            self.engine.seek_to_zero();
            self.position_ms = 0;
        }
        if let Err(e) = self.engine.start() {
            self.fail(PlaybackError::engine_fault(
                e.code(),
                "failed to start playback",
                Some(e.to_string()),
            ));
            return;
        }
        self.looping = looping;
        self.rearm_at = None;
        self.transition(PlaybackStatus::Playing);
        self.tap.enable(self.engine.as_mut());
        self.notify();
    }

    /// Pauses playback, keeping the position. A no-op unless `Playing`.
    pub fn pause(&mut self) {
        if self.status != PlaybackStatus::Playing {
            tracing::debug!(player = %self.id, status = %self.status, "pause ignored");
            return;
        }
        self.engine.pause();
        if self.rearm_at.take().is_some() {
            // Paused in the gap between loop iterations: resume from the top.
            self.engine.seek_to_zero();
            self.position_ms = 0;
        } else {
            self.position_ms = self.clock_ms();
        }
        self.transition(PlaybackStatus::Paused);
        self.tap.disable(self.engine.as_mut());
        self.notify();
    }

    /// Stops playback and rewinds. A no-op unless `Playing` or `Paused`.
    pub fn stop(&mut self) {
        if !matches!(self.status, PlaybackStatus::Playing | PlaybackStatus::Paused) {
            tracing::debug!(player = %self.id, status = %self.status, "stop ignored");
            return;
        }
        self.engine.stop();
        self.rearm_at = None;
        self.position_ms = 0;
        self.transition(PlaybackStatus::Stopped);
        self.tap.disable(self.engine.as_mut());
        self.notify();
    }

    /// Returns to `Unknown`, clearing the source and the visualizer.
    ///
    /// Listeners receive one zero-filled waveform and spectrum frame followed
    /// by a state change.
    pub fn reset(&mut self) {
        self.tap.disable(self.engine.as_mut());
        self.engine.reset();
        self.token = self.token.next();
        self.rearm_at = None;
        self.loaded = false;
        self.position_ms = 0;
        self.duration_ms = 0;
        self.error = None;
        self.looping = false;
        self.sample_rate = self.default_sample_rate;
        // Anything queued belongs to the source just dropped.
        while self.engine_events.try_recv().is_ok() {}

        self.transition(PlaybackStatus::Unknown);
        self.sink
            .capture(&self.id, &CaptureFrame::silent(self.capture_size));
        self.notify();
    }

    /// Releases the engine. The session must not be used afterwards.
    pub fn release(&mut self) {
        self.tap.disable(self.engine.as_mut());
        self.tap.set_playing(false);
        self.rearm_at = None;
        self.engine.release();
        tracing::info!(player = %self.id, engine = self.engine.name(), "session released");
    }

    /// Snapshot of the session, with the position refreshed from the
    /// engine clock while playing.
    pub fn state(&mut self) -> PlayerState {
        if self.status == PlaybackStatus::Playing
            && self.rearm_at.is_none()
            && self.engine.is_playing()
        {
            self.position_ms = self.clock_ms();
        }
        PlayerState {
            id: self.id.to_string(),
            status: self.status,
            loaded: self.loaded,
            position_ms: self.position_ms,
            duration_ms: self.duration_ms,
            error: self.error.clone(),
        }
    }

    /// Applies queued engine events, then runs a loop re-arm if one is due.
    pub fn pump(&mut self, now: Instant) {
        while let Ok(event) = self.engine_events.try_recv() {
            self.handle_engine_event(event, now);
        }
        if let Some(at) = self.rearm_at
            && now >= at
        {
            self.rearm_at = None;
            self.rearm();
        }
    }

    fn handle_engine_event(&mut self, event: EngineEvent, now: Instant) {
        match event {
            EngineEvent::Prepared { token, info } => {
                if self.is_current_load(token) {
                    self.on_prepared(info);
                }
            }
            EngineEvent::LoadFailed {
                token,
                code,
                message,
                detail,
            } => {
                if self.is_current_load(token) {
                    self.fail(PlaybackError::source_load(code, message, detail));
                }
            }
            EngineEvent::Completed => self.on_completed(now),
            EngineEvent::Fault { code, detail } => {
                self.fail(PlaybackError::engine_fault(code, "media engine fault", Some(detail)));
            }
        }
    }

    fn is_current_load(&self, token: LoadToken) -> bool {
        let current = token == self.token && !self.loaded && self.status == PlaybackStatus::Unknown;
        if !current {
            tracing::debug!(
                player = %self.id,
                token = token.get(),
                current = self.token.get(),
                "stale load completion ignored"
            );
        }
        current
    }

    fn on_prepared(&mut self, info: MediaInfo) {
        self.loaded = true;
        self.duration_ms = info.duration_ms();
        self.sample_rate = if info.sample_rate > 0.0 {
            info.sample_rate
        } else {
            self.default_sample_rate
        };
        self.position_ms = 0;
        self.error = None;
        tracing::info!(
            player = %self.id,
            duration_ms = self.duration_ms,
            sample_rate = self.sample_rate,
            channels = info.channels,
            "source ready"
        );
        self.transition(PlaybackStatus::Ready);
        self.notify();
    }

    fn on_completed(&mut self, now: Instant) {
        if self.status != PlaybackStatus::Playing || self.rearm_at.is_some() {
            tracing::debug!(player = %self.id, status = %self.status, "completion ignored");
            return;
        }
        self.position_ms = self.duration_ms;
        if self.looping {
            self.rearm_at = Some(now + self.rearm_delay);
            tracing::debug!(player = %self.id, delay_ms = self.rearm_delay.as_millis() as u64, "loop re-arm scheduled");
        } else {
            self.engine.stop();
            self.transition(PlaybackStatus::Stopped);
            self.tap.disable(self.engine.as_mut());
        }
        self.notify();
    }

    fn rearm(&mut self) {
        if self.status != PlaybackStatus::Playing {
            return;
        }
        self.engine.seek_to_zero();
        self.position_ms = 0;
        if let Err(e) = self.engine.start() {
            self.fail(PlaybackError::engine_fault(
                e.code(),
                "failed to restart loop",
                Some(e.to_string()),
            ));
            return;
        }
        tracing::debug!(player = %self.id, "loop re-armed");
    }

    fn fail(&mut self, error: PlaybackError) {
        tracing::warn!(
            player = %self.id,
            code = %error.code,
            detail = error.detail.as_deref().unwrap_or(""),
            "{}",
            error.message
        );
        self.engine.stop();
        self.rearm_at = None;
        self.error = Some(error);
        self.transition(PlaybackStatus::Error);
        self.tap.disable(self.engine.as_mut());
        self.notify();
    }

    fn transition(&mut self, to: PlaybackStatus) {
        if self.status != to {
            tracing::debug!(player = %self.id, from = %self.status, to = %to, "status changed");
        }
        self.status = to;
        self.tap.set_playing(to == PlaybackStatus::Playing);
    }

    fn notify(&self) {
        self.sink.state_changed(&self.id);
    }

    fn clock_ms(&self) -> u64 {
        if self.sample_rate <= 0.0 {
            return 0;
        }
        let ms = (self.engine.render_clock() as f64 / self.sample_rate * 1000.0) as u64;
        if self.loaded {
            ms.min(self.duration_ms)
        } else {
            ms
        }
    }
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("loaded", &self.loaded)
            .field("position_ms", &self.position_ms)
            .field("duration_ms", &self.duration_ms)
            .field("looping", &self.looping)
            .field("engine", &self.engine.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PlaybackErrorKind, PlayerEvent};
    use crossbeam_channel::bounded;
    use spectap_io::{EngineCall, ScriptedEngine, ScriptedHandle, codes};

    const INFO: MediaInfo = MediaInfo {
        frames: 2000,
        sample_rate: 1000.0,
        channels: 2,
    };

    fn session(delay: Duration) -> (PlaybackSession, ScriptedHandle, Receiver<PlayerEvent>) {
        let (tx, rx) = bounded(16);
        let (engine, handle) = ScriptedEngine::new(tx);
        let (sink, events) = EventSink::new(64);
        let config = SessionConfig {
            capture_size: 8,
            loop_rearm_delay: delay,
            ..SessionConfig::default()
        };
        let session = PlaybackSession::new("p1", Box::new(engine), rx, sink, &config);
        (session, handle, events)
    }

    fn drain(events: &Receiver<PlayerEvent>) -> Vec<PlayerEvent> {
        events.try_iter().collect()
    }

    fn state_changes(events: &Receiver<PlayerEvent>) -> usize {
        drain(events)
            .iter()
            .filter(|e| matches!(e, PlayerEvent::StateChanged { .. }))
            .count()
    }

    fn ready(delay: Duration) -> (PlaybackSession, ScriptedHandle, Receiver<PlayerEvent>) {
        let (mut s, handle, events) = session(delay);
        s.set_data_source("asset://tone.wav");
        assert!(handle.complete_load(INFO));
        s.pump(Instant::now());
        assert_eq!(s.status(), PlaybackStatus::Ready);
        drain(&events);
        handle.clear_calls();
        (s, handle, events)
    }

    #[test]
    fn starts_unknown_and_ignores_pause_and_stop() {
        let (mut s, handle, events) = session(Duration::ZERO);
        s.pause();
        s.stop();
        s.play(false);
        let state = s.state();
        assert_eq!(state.status, PlaybackStatus::Unknown);
        assert!(!state.loaded);
        assert!(drain(&events).is_empty());
        assert!(handle.calls().is_empty());
    }

    #[test]
    fn load_completes_to_ready() {
        let (mut s, handle, events) = session(Duration::ZERO);
        s.set_data_source("asset://tone.wav");
        assert_eq!(s.status(), PlaybackStatus::Unknown);
        assert!(handle.complete_load(INFO));
        s.pump(Instant::now());

        let state = s.state();
        assert_eq!(state.status, PlaybackStatus::Ready);
        assert!(state.loaded);
        assert_eq!(state.duration_ms, 2000);
        assert_eq!(state.position_ms, 0);
        assert_eq!(state_changes(&events), 2);
    }

    #[test]
    fn invalid_locator_fails_synchronously() {
        let (mut s, _handle, _events) = session(Duration::ZERO);
        s.set_data_source("");
        let state = s.state();
        assert_eq!(state.status, PlaybackStatus::Error);
        let error = state.error.unwrap();
        assert_eq!(error.kind, PlaybackErrorKind::SourceLoad);
        assert_eq!(error.code, codes::INVALID_URL);
    }

    #[test]
    fn load_failure_moves_to_error() {
        let (mut s, handle, _events) = session(Duration::ZERO);
        s.set_data_source("asset://missing.wav");
        assert!(handle.fail_load(codes::ASSET_NOT_FOUND, "missing"));
        s.pump(Instant::now());
        let state = s.state();
        assert_eq!(state.status, PlaybackStatus::Error);
        assert_eq!(state.error.unwrap().code, codes::ASSET_NOT_FOUND);
        assert!(!state.loaded);
    }

    #[test]
    fn superseded_load_is_ignored() {
        let (mut s, handle, _events) = session(Duration::ZERO);
        s.set_data_source("asset://a.wav");
        let stale = handle.pending_token().unwrap();
        s.set_data_source("asset://b.wav");
        handle.emit(EngineEvent::Prepared { token: stale, info: INFO });
        s.pump(Instant::now());
        assert_eq!(s.status(), PlaybackStatus::Unknown);

        assert!(handle.complete_load(INFO));
        s.pump(Instant::now());
        assert_eq!(s.status(), PlaybackStatus::Ready);
    }

    #[test]
    fn play_enables_capture_once() {
        let (mut s, handle, events) = ready(Duration::ZERO);
        s.play(false);
        s.play(true);
        assert_eq!(s.status(), PlaybackStatus::Playing);
        assert!(!s.is_looping());
        assert!(s.capture_enabled());
        assert!(handle.tap_installed());
        assert_eq!(handle.calls(), vec![EngineCall::Start, EngineCall::InstallTap]);
        assert_eq!(state_changes(&events), 1);

        assert!(handle.push_buffer(&[0.25; 16], 2));
        let frames = drain(&events);
        assert!(matches!(frames[0], PlayerEvent::WaveformChanged { .. }));
        assert!(matches!(frames[1], PlayerEvent::SpectrumChanged { .. }));
    }

    #[test]
    fn pause_retains_clock_position() {
        let (mut s, handle, _events) = ready(Duration::ZERO);
        s.play(false);
        handle.advance(500);
        assert_eq!(s.state().position_ms, 500);
        s.pause();
        handle.advance(500);
        let state = s.state();
        assert_eq!(state.status, PlaybackStatus::Paused);
        assert_eq!(state.position_ms, 500);
        assert!(!s.capture_enabled());
        assert!(!handle.tap_installed());
        assert_eq!(
            handle.calls(),
            vec![
                EngineCall::Start,
                EngineCall::InstallTap,
                EngineCall::Pause,
                EngineCall::RemoveTap
            ]
        );
    }

    #[test]
    fn stop_rewinds_and_play_restarts_from_zero() {
        let (mut s, handle, _events) = ready(Duration::ZERO);
        s.play(false);
        handle.advance(700);
        s.stop();
        assert_eq!(s.state().position_ms, 0);
        assert!(!handle.tap_installed());
        s.stop();

        handle.clear_calls();
        s.play(false);
        assert_eq!(
            handle.calls(),
            vec![EngineCall::SeekToZero, EngineCall::Start, EngineCall::InstallTap]
        );
    }

    #[test]
    fn completion_without_loop_stops_at_duration() {
        let (mut s, handle, events) = ready(Duration::ZERO);
        s.play(false);
        drain(&events);
        handle.finish_playback();
        s.pump(Instant::now());

        let state = s.state();
        assert_eq!(state.status, PlaybackStatus::Stopped);
        assert_eq!(state.position_ms, state.duration_ms);
        assert!(!handle.tap_installed());
        assert_eq!(state_changes(&events), 1);
    }

    #[test]
    fn completion_with_loop_rearms_after_delay() {
        let (mut s, handle, events) = ready(Duration::from_millis(250));
        s.play(true);
        drain(&events);
        handle.clear_calls();

        let t0 = Instant::now();
        handle.finish_playback();
        s.pump(t0);
        assert_eq!(s.status(), PlaybackStatus::Playing);
        assert_eq!(s.state().position_ms, 2000);
        assert_eq!(s.next_deadline(), Some(t0 + Duration::from_millis(250)));
        assert_eq!(state_changes(&events), 1);

        s.pump(t0 + Duration::from_millis(100));
        assert!(handle.calls().is_empty());

        s.pump(t0 + Duration::from_millis(250));
        assert_eq!(handle.calls(), vec![EngineCall::SeekToZero, EngineCall::Start]);
        assert_eq!(s.status(), PlaybackStatus::Playing);
        assert_eq!(s.state().position_ms, 0);
        assert!(s.next_deadline().is_none());
        assert!(handle.tap_installed());
        assert_eq!(state_changes(&events), 0);
    }

    #[test]
    fn pause_during_loop_gap_resumes_from_start() {
        let (mut s, handle, _events) = ready(Duration::from_secs(1));
        s.play(true);
        handle.finish_playback();
        s.pump(Instant::now());
        handle.clear_calls();
        s.pause();
        assert_eq!(s.state().position_ms, 0);
        assert!(s.next_deadline().is_none());
        assert_eq!(
            handle.calls(),
            vec![EngineCall::Pause, EngineCall::SeekToZero, EngineCall::RemoveTap]
        );
    }

    #[test]
    fn engine_fault_moves_to_error() {
        let (mut s, handle, _events) = ready(Duration::ZERO);
        s.play(false);
        handle.fault(codes::STREAM_ERROR, "device lost");
        s.pump(Instant::now());

        let state = s.state();
        assert_eq!(state.status, PlaybackStatus::Error);
        let error = state.error.unwrap();
        assert_eq!(error.kind, PlaybackErrorKind::EngineFault);
        assert_eq!(error.code, codes::STREAM_ERROR);
        assert_eq!(error.detail.as_deref(), Some("device lost"));
        assert!(!handle.tap_installed());

        s.play(false);
        assert_eq!(s.status(), PlaybackStatus::Error);
    }

    #[test]
    fn start_failure_moves_to_error() {
        let (mut s, handle, _events) = ready(Duration::ZERO);
        handle.fail_next_start("no device");
        s.play(false);
        let state = s.state();
        assert_eq!(state.status, PlaybackStatus::Error);
        assert_eq!(state.error.unwrap().code, codes::ENGINE_START_ERROR);
        assert!(!handle.tap_installed());
    }

    #[test]
    fn reset_emits_one_zero_frame() {
        let (mut s, handle, events) = ready(Duration::ZERO);
        s.play(false);
        drain(&events);

        s.reset();
        let emitted = drain(&events);
        assert_eq!(emitted.len(), 3);
        match (&emitted[0], &emitted[1]) {
            (
                PlayerEvent::WaveformChanged { bytes: w, .. },
                PlayerEvent::SpectrumChanged { bytes: f, .. },
            ) => {
                assert_eq!(w.len(), 8);
                assert!(w.iter().all(|&b| b == 0));
                assert!(f.iter().all(|&b| b == 0));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(emitted[2], PlayerEvent::StateChanged { .. }));

        let state = s.state();
        assert_eq!(state.status, PlaybackStatus::Unknown);
        assert!(!state.loaded);
        assert_eq!(state.duration_ms, 0);
        assert!(!handle.tap_installed());
    }

    #[test]
    fn completion_queued_before_reset_is_dropped() {
        let (mut s, handle, _events) = ready(Duration::ZERO);
        s.play(false);
        handle.finish_playback();
        s.reset();
        s.pump(Instant::now());
        assert_eq!(s.status(), PlaybackStatus::Unknown);
        assert!(s.state().error.is_none());
    }

    #[test]
    fn release_removes_tap() {
        let (mut s, handle, _events) = ready(Duration::ZERO);
        s.play(false);
        s.release();
        assert!(handle.is_released());
        assert!(!handle.tap_installed());
    }
}
