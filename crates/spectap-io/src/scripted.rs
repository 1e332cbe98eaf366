//! Deterministic engine for tests and headless hosts.
//!
//! A [`ScriptedEngine`] never touches audio hardware. It records every call
//! it receives, and its [`ScriptedHandle`] lets the caller play the part of
//! the platform: finish or fail loads, end playback, raise faults, advance
//! the render clock and push buffers through the installed tap.

use crate::engine::{AudioBlock, BufferCallback, EngineEvent, EngineFactory, LoadToken, MediaEngine, MediaInfo};
use crate::{Error, Result, SourceLocator};
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// A call received by a [`ScriptedEngine`].
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    /// `load(source, token)`
    Load {
        /// Requested source.
        source: SourceLocator,
        /// Token of the request.
        token: LoadToken,
    },
    /// `start()`
    Start,
    /// `pause()`
    Pause,
    /// `stop()`
    Stop,
    /// `seek_to_zero()`
    SeekToZero,
    /// `reset()`
    Reset,
    /// `release()`
    Release,
    /// `install_tap(..)`
    InstallTap,
    /// `remove_tap()`
    RemoveTap,
}

#[derive(Default)]
struct ScriptState {
    calls: Vec<EngineCall>,
    playing: bool,
    clock: u64,
    tap: Option<BufferCallback>,
    token: Option<LoadToken>,
    released: bool,
    start_failure: Option<String>,
}

/// Engine whose behaviour is driven from a [`ScriptedHandle`].
pub struct ScriptedEngine {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedEngine {
    /// Creates an engine and the handle that controls it.
    pub fn new(events: Sender<EngineEvent>) -> (Self, ScriptedHandle) {
        let state = Arc::new(Mutex::new(ScriptState::default()));
        let handle = ScriptedHandle {
            state: Arc::clone(&state),
            events,
        };
        (Self { state }, handle)
    }

    fn record(&self, call: EngineCall) -> parking_lot::MutexGuard<'_, ScriptState> {
        let mut state = self.state.lock();
        state.calls.push(call);
        state
    }
}

impl MediaEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    fn load(&mut self, source: &SourceLocator, token: LoadToken) {
        let mut state = self.record(EngineCall::Load {
            source: source.clone(),
            token,
        });
        state.token = Some(token);
        state.playing = false;
        state.clock = 0;
    }

    fn start(&mut self) -> Result<()> {
        let mut state = self.record(EngineCall::Start);
        if let Some(message) = state.start_failure.take() {
            return Err(Error::Stream(message));
        }
        state.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.record(EngineCall::Pause).playing = false;
    }

    fn stop(&mut self) {
        let mut state = self.record(EngineCall::Stop);
        state.playing = false;
        state.clock = 0;
    }

    fn seek_to_zero(&mut self) {
        self.record(EngineCall::SeekToZero).clock = 0;
    }

    fn reset(&mut self) {
        let mut state = self.record(EngineCall::Reset);
        state.playing = false;
        state.clock = 0;
        state.token = None;
    }

    fn release(&mut self) {
        let mut state = self.record(EngineCall::Release);
        state.playing = false;
        state.tap = None;
        state.released = true;
    }

    fn is_playing(&self) -> bool {
        self.state.lock().playing
    }

    fn render_clock(&self) -> u64 {
        self.state.lock().clock
    }

    fn install_tap(&mut self, callback: BufferCallback) {
        self.record(EngineCall::InstallTap).tap = Some(callback);
    }

    fn remove_tap(&mut self) {
        self.record(EngineCall::RemoveTap).tap = None;
    }
}

/// Remote control for one [`ScriptedEngine`].
#[derive(Clone)]
pub struct ScriptedHandle {
    state: Arc<Mutex<ScriptState>>,
    events: Sender<EngineEvent>,
}

impl ScriptedHandle {
    /// Every call received so far, oldest first.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.state.lock().calls.clone()
    }

    /// Forgets the recorded calls.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Token of the load currently in flight, if any.
    pub fn pending_token(&self) -> Option<LoadToken> {
        self.state.lock().token
    }

    fn take_token(&self) -> Option<LoadToken> {
        self.state.lock().token.take()
    }

    /// Completes the current load with `info`. Returns `false` if no load is pending.
    pub fn complete_load(&self, info: MediaInfo) -> bool {
        let Some(token) = self.take_token() else {
            return false;
        };
        self.events
            .send(EngineEvent::Prepared { token, info })
            .is_ok()
    }

    /// Fails the current load. Returns `false` if no load is pending.
    pub fn fail_load(&self, code: &'static str, message: &str) -> bool {
        let Some(token) = self.take_token() else {
            return false;
        };
        self.events
            .send(EngineEvent::LoadFailed {
                token,
                code,
                message: message.to_string(),
                detail: None,
            })
            .is_ok()
    }

    /// Sends an arbitrary engine event.
    pub fn emit(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }

    /// Ends playback as if the last frame had been rendered.
    pub fn finish_playback(&self) {
        self.state.lock().playing = false;
        let _ = self.events.send(EngineEvent::Completed);
    }

    /// Reports a runtime fault.
    pub fn fault(&self, code: &'static str, detail: &str) {
        let _ = self.events.send(EngineEvent::Fault {
            code,
            detail: detail.to_string(),
        });
    }

    /// Advances the render clock by `frames`.
    pub fn advance(&self, frames: u64) {
        self.state.lock().clock += frames;
    }

    /// Makes the next `start` fail with a stream error.
    pub fn fail_next_start(&self, message: &str) {
        self.state.lock().start_failure = Some(message.to_string());
    }

    /// Runs `samples` through the installed tap. Returns `false` if none is installed.
    pub fn push_buffer(&self, samples: &[f32], channels: usize) -> bool {
        let mut state = self.state.lock();
        match state.tap.as_mut() {
            Some(tap) => {
                tap(&AudioBlock { samples, channels });
                true
            }
            None => false,
        }
    }

    /// Whether a tap is installed.
    pub fn tap_installed(&self) -> bool {
        self.state.lock().tap.is_some()
    }

    /// Whether the engine is rendering.
    pub fn is_playing(&self) -> bool {
        self.state.lock().playing
    }

    /// Whether `release` has been called.
    pub fn is_released(&self) -> bool {
        self.state.lock().released
    }
}

impl std::fmt::Debug for ScriptedHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ScriptedHandle")
            .field("playing", &state.playing)
            .field("clock", &state.clock)
            .field("calls", &state.calls.len())
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct FactoryState {
    handles: HashMap<String, ScriptedHandle>,
    fail_create: bool,
}

/// Builds [`ScriptedEngine`]s and keeps their handles by player id.
#[derive(Clone, Default)]
pub struct ScriptedFactory {
    state: Arc<Mutex<FactoryState>>,
}

impl ScriptedFactory {
    /// Creates an empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle of the most recent engine created for `player`.
    pub fn handle(&self, player: &str) -> Option<ScriptedHandle> {
        self.state.lock().handles.get(player).cloned()
    }

    /// Makes subsequent `create` calls fail.
    pub fn set_fail_create(&self, fail: bool) {
        self.state.lock().fail_create = fail;
    }
}

impl EngineFactory for ScriptedFactory {
    fn create(&self, player: &str, events: Sender<EngineEvent>) -> Result<Box<dyn MediaEngine>> {
        let mut state = self.state.lock();
        if state.fail_create {
            return Err(Error::NoDevice);
        }
        let (engine, handle) = ScriptedEngine::new(events);
        state.handles.insert(player.to_string(), handle);
        Ok(Box::new(engine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn records_calls_and_drives_events() {
        let (tx, rx) = bounded(8);
        let (mut engine, handle) = ScriptedEngine::new(tx);
        let source = SourceLocator::parse("asset://a.wav").unwrap();

        assert!(!handle.complete_load(MediaInfo {
            frames: 1,
            sample_rate: 1.0,
            channels: 1
        }));

        engine.load(&source, LoadToken::first());
        let info = MediaInfo {
            frames: 44100,
            sample_rate: 44100.0,
            channels: 2,
        };
        assert!(handle.complete_load(info));
        assert_eq!(
            rx.try_recv().unwrap(),
            EngineEvent::Prepared {
                token: LoadToken::first(),
                info
            }
        );

        engine.start().unwrap();
        handle.advance(100);
        assert!(engine.is_playing());
        assert_eq!(engine.render_clock(), 100);
        engine.stop();
        assert_eq!(engine.render_clock(), 0);

        assert_eq!(
            handle.calls(),
            vec![
                EngineCall::Load {
                    source,
                    token: LoadToken::first()
                },
                EngineCall::Start,
                EngineCall::Stop,
            ]
        );
    }

    #[test]
    fn start_failure_is_one_shot() {
        let (tx, _rx) = bounded(8);
        let (mut engine, handle) = ScriptedEngine::new(tx);
        handle.fail_next_start("device unplugged");
        assert!(matches!(engine.start(), Err(Error::Stream(_))));
        assert!(engine.start().is_ok());
    }

    #[test]
    fn factory_tracks_handles() {
        let factory = ScriptedFactory::new();
        let (tx, _rx) = bounded(8);
        let mut engine = factory.create("p1", tx.clone()).unwrap();
        assert!(factory.handle("p2").is_none());

        let handle = factory.handle("p1").unwrap();
        engine.install_tap(Box::new(|_: &AudioBlock<'_>| {}));
        assert!(handle.push_buffer(&[0.0; 4], 2));
        engine.release();
        assert!(handle.is_released());
        assert!(!handle.push_buffer(&[0.0; 4], 2));

        factory.set_fail_create(true);
        assert!(factory.create("p3", tx).is_err());
    }
}
