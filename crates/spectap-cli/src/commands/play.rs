//! Playback through a session, with progress and a live level meter.

use super::common::{meter, peak_level, source_locator};
use anyhow::{Context, bail};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use spectap_config::load_or_default;
use spectap_io::PcmEngineFactory;
use spectap_session::{PlaybackStatus, PlayerEvent, SessionRegistry};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

const PLAYER: &str = "cli";

/// Longest wait between two refreshes of the display.
const POLL: Duration = Duration::from_millis(50);

#[derive(Args)]
pub struct PlayArgs {
    /// Source: a WAV path, or a file://, asset:// or remote locator
    #[arg(value_name = "SOURCE")]
    source: String,

    /// Loop until interrupted
    #[arg(short, long, alias = "repeat")]
    r#loop: bool,
}

pub fn run(args: PlayArgs, config: Option<&Path>) -> anyhow::Result<()> {
    let settings = load_or_default(config).context("loading settings")?;
    let factory = PcmEngineFactory::cpal(settings.pcm_options());
    let mut registry = SessionRegistry::new(factory, settings.session_config());

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let locator = source_locator(&args.source);
    println!("Loading {locator}...");
    registry.initialize(PLAYER)?;
    registry.set_data_source(PLAYER, &locator)?;

    let mut progress: Option<ProgressBar> = None;
    let mut level = 0.0f32;

    while running.load(Ordering::SeqCst) {
        let wait = registry
            .next_deadline()
            .map(|at| at.saturating_duration_since(Instant::now()).min(POLL))
            .unwrap_or(POLL);
        if let Ok(event) = registry.events().recv_timeout(wait) {
            level = level.max(event_level(&event));
        }
        for event in registry.events().try_iter() {
            level = level.max(event_level(&event));
        }
        registry.pump();

        let state = registry.get_state(PLAYER)?;
        match state.status {
            PlaybackStatus::Ready if progress.is_none() => {
                println!(
                    "Playing{} ({:.1}s). Press Ctrl+C to stop.",
                    if args.r#loop { " (looping)" } else { "" },
                    state.duration_ms as f64 / 1000.0
                );
                progress = Some(progress_bar(state.duration_ms));
                registry.play(PLAYER, args.r#loop)?;
            }
            PlaybackStatus::Playing | PlaybackStatus::Paused => {
                if let Some(pb) = &progress {
                    pb.set_position(state.position_ms);
                    pb.set_message(meter(level, 24));
                }
            }
            PlaybackStatus::Stopped => {
                if let Some(pb) = &progress {
                    pb.set_position(state.position_ms);
                    pb.finish_with_message("done");
                }
                break;
            }
            PlaybackStatus::Error => {
                if let Some(pb) = &progress {
                    pb.abandon();
                }
                let error = state.error.map(|e| e.to_string()).unwrap_or_default();
                bail!("playback failed: {error}");
            }
            _ => {}
        }
        // Let the meter fall back between frames.
        level *= 0.8;
    }

    if !running.load(Ordering::SeqCst) {
        registry.stop(PLAYER)?;
        if let Some(pb) = &progress {
            pb.abandon_with_message("stopped");
        }
    }
    registry.release(PLAYER)?;
    if registry.dropped_events() > 0 {
        tracing::debug!(dropped = registry.dropped_events(), "capture frames dropped");
    }
    Ok(())
}

fn event_level(event: &PlayerEvent) -> f32 {
    match event {
        PlayerEvent::WaveformChanged { bytes, .. } => peak_level(bytes),
        _ => 0.0,
    }
}

fn progress_bar(duration_ms: u64) -> ProgressBar {
    let pb = ProgressBar::new(duration_ms);
    match ProgressStyle::default_bar()
        .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ms {msg}")
    {
        Ok(style) => pb.set_style(style.progress_chars("##-")),
        Err(e) => tracing::debug!(error = %e, "falling back to the default progress style"),
    }
    pb
}
