//! Id-keyed ownership of playback sessions.

use crate::events::{EventSink, PlayerEvent};
use crate::{PlaybackSession, PlayerError, PlayerState, Result};
use crossbeam_channel::{Receiver, bounded};
use spectap_io::EngineFactory;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Capacity of each session's engine event queue.
const ENGINE_EVENT_CAPACITY: usize = 64;

/// Tunables shared by every session of a registry.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Frames per capture window; a power of two between 2 and 1024.
    pub capture_size: usize,
    /// Silence between the end of one loop iteration and the next.
    pub loop_rearm_delay: Duration,
    /// Sample rate assumed until a source reports its own.
    pub default_sample_rate: f64,
    /// Undelivered outward events kept before new ones are dropped.
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capture_size: spectap_core::MAX_FFT_SIZE,
            loop_rearm_delay: Duration::from_millis(250),
            default_sample_rate: 44100.0,
            event_capacity: 64,
        }
    }
}

/// Owns every live session, keyed by player id.
///
/// All operations on unknown ids fail with [`PlayerError::NotInitialized`]
/// and leave the registry untouched. Dropping the registry releases every
/// remaining session.
pub struct SessionRegistry {
    sessions: HashMap<String, PlaybackSession>,
    factory: Box<dyn EngineFactory>,
    config: SessionConfig,
    sink: EventSink,
    events: Receiver<PlayerEvent>,
}

impl SessionRegistry {
    /// Creates an empty registry building engines with `factory`.
    ///
    /// # Panics
    ///
    /// Panics if `config.capture_size` is not a valid capture window.
    pub fn new(factory: impl EngineFactory + 'static, config: SessionConfig) -> Self {
        assert!(
            spectap_core::is_valid_capture_size(config.capture_size),
            "invalid capture size {}",
            config.capture_size
        );
        let (sink, events) = EventSink::new(config.event_capacity);
        Self {
            sessions: HashMap::new(),
            factory: Box::new(factory),
            config,
            sink,
            events,
        }
    }

    /// Receiver of every session's outward events.
    pub fn events(&self) -> &Receiver<PlayerEvent> {
        &self.events
    }

    /// Events dropped because the receiver fell behind.
    pub fn dropped_events(&self) -> u64 {
        self.sink.dropped()
    }

    /// Settings shared by the sessions.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Creates the session `id` in `Unknown`.
    pub fn initialize(&mut self, id: &str) -> Result<()> {
        if self.sessions.contains_key(id) {
            return Err(PlayerError::AlreadyInitialized(id.to_string()));
        }
        let (tx, rx) = bounded(ENGINE_EVENT_CAPACITY);
        let engine = self.factory.create(id, tx)?;
        tracing::info!(player = id, engine = engine.name(), "player initialized");
        let session = PlaybackSession::new(id, engine, rx, self.sink.clone(), &self.config);
        self.sessions.insert(id.to_string(), session);
        Ok(())
    }

    /// Starts loading `locator` into `id`; completion is announced by a state change.
    pub fn set_data_source(&mut self, id: &str, locator: &str) -> Result<()> {
        self.session(id)?.set_data_source(locator);
        Ok(())
    }

    /// Plays `id`, looping if asked.
    pub fn play(&mut self, id: &str, looping: bool) -> Result<()> {
        self.session(id)?.play(looping);
        Ok(())
    }

    /// Pauses `id`.
    pub fn pause(&mut self, id: &str) -> Result<()> {
        self.session(id)?.pause();
        Ok(())
    }

    /// Stops `id`.
    pub fn stop(&mut self, id: &str) -> Result<()> {
        self.session(id)?.stop();
        Ok(())
    }

    /// Resets `id` to `Unknown`.
    pub fn reset(&mut self, id: &str) -> Result<()> {
        self.session(id)?.reset();
        Ok(())
    }

    /// Releases `id` and forgets it.
    pub fn release(&mut self, id: &str) -> Result<()> {
        let mut session = self
            .sessions
            .remove(id)
            .ok_or_else(|| PlayerError::NotInitialized(id.to_string()))?;
        session.release();
        Ok(())
    }

    /// Snapshot of `id`.
    pub fn get_state(&mut self, id: &str) -> Result<PlayerState> {
        Ok(self.session(id)?.state())
    }

    /// Applies pending engine events and due loop re-arms for every session.
    pub fn pump(&mut self) {
        let now = Instant::now();
        for session in self.sessions.values_mut() {
            session.pump(now);
        }
    }

    /// Earliest scheduled re-arm across all sessions.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.sessions
            .values()
            .filter_map(PlaybackSession::next_deadline)
            .min()
    }

    /// Whether `id` is initialized.
    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is live.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Ids of live sessions, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Releases every session.
    pub fn release_all(&mut self) {
        for (_, mut session) in self.sessions.drain() {
            session.release();
        }
    }

    /// Looks `id` up and brings it up to date with its engine.
    fn session(&mut self, id: &str) -> Result<&mut PlaybackSession> {
        let session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| PlayerError::NotInitialized(id.to_string()))?;
        session.pump(Instant::now());
        Ok(session)
    }
}

impl Drop for SessionRegistry {
    fn drop(&mut self) {
        if !self.sessions.is_empty() {
            tracing::debug!(sessions = self.sessions.len(), "releasing remaining sessions");
            self.release_all();
        }
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.ids())
            .field("config", &self.config)
            .field("sink", &self.sink)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spectap_io::ScriptedFactory;

    #[test]
    fn default_config_matches_capture_limits() {
        let config = SessionConfig::default();
        assert_eq!(config.capture_size, 1024);
        assert!(spectap_core::is_valid_capture_size(config.capture_size));
        assert_eq!(config.loop_rearm_delay, Duration::from_millis(250));
    }

    #[test]
    fn bookkeeping() {
        let mut registry = SessionRegistry::new(ScriptedFactory::new(), SessionConfig::default());
        assert!(registry.is_empty());
        registry.initialize("b").unwrap();
        registry.initialize("a").unwrap();
        assert_eq!(registry.ids(), vec!["a".to_string(), "b".to_string()]);
        assert!(registry.contains("a"));
        assert_eq!(registry.len(), 2);
        assert!(registry.next_deadline().is_none());

        registry.release_all();
        assert!(registry.is_empty());
    }

    #[test]
    fn engine_creation_failure_registers_nothing() {
        let factory = ScriptedFactory::new();
        factory.set_fail_create(true);
        let mut registry = SessionRegistry::new(factory, SessionConfig::default());
        let err = registry.initialize("p").unwrap_err();
        assert!(matches!(err, PlayerError::Engine(_)));
        assert!(!registry.contains("p"));
    }
}
