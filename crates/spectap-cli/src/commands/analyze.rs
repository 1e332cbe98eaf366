//! Offline capture: WAV file in, one JSON line per capture window out.

use anyhow::{Context, bail};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use spectap_config::load_or_default;
use spectap_core::{CaptureBytes, CaptureProcessor, is_valid_capture_size};
use spectap_io::read_wav;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Input WAV file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Frames per window (defaults to the configured capture size)
    #[arg(long)]
    capture_size: Option<usize>,

    /// Output file for JSON lines (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct WindowRecord<'a> {
    index: usize,
    start_ms: f64,
    waveform: &'a CaptureBytes,
    spectrum: &'a CaptureBytes,
}

pub fn run(args: AnalyzeArgs, config: Option<&Path>) -> anyhow::Result<()> {
    let capture_size = match args.capture_size {
        Some(size) => size,
        None => load_or_default(config).context("loading settings")?.capture_size,
    };
    if !is_valid_capture_size(capture_size) {
        bail!(
            "capture size must be a power of two in 2..={}, got {capture_size}",
            spectap_core::MAX_FFT_SIZE
        );
    }

    let audio = read_wav(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let channels = usize::from(audio.channels.max(1));
    let window = capture_size * channels;
    let windows = audio.samples.len().div_ceil(window);
    tracing::info!(
        input = %args.input.display(),
        frames = audio.frames(),
        sample_rate = audio.sample_rate,
        channels,
        windows,
        "analyzing"
    );

    let (mut out, pb): (Box<dyn Write>, ProgressBar) = match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            let pb = ProgressBar::new(windows as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} windows")
            {
                pb.set_style(style.progress_chars("##-"));
            }
            (Box::new(BufWriter::new(file)), pb)
        }
        None => (Box::new(BufWriter::new(std::io::stdout().lock())), ProgressBar::hidden()),
    };

    let mut capture = CaptureProcessor::new(capture_size);
    let ms_per_frame = 1000.0 / f64::from(audio.sample_rate.max(1));
    for (index, chunk) in audio.samples.chunks(window).enumerate() {
        let frame = capture.process(chunk, channels);
        let record = WindowRecord {
            index,
            start_ms: (index * capture_size) as f64 * ms_per_frame,
            waveform: &frame.waveform,
            spectrum: &frame.spectrum,
        };
        serde_json::to_writer(&mut out, &record)?;
        out.write_all(b"\n")?;
        pb.inc(1);
    }
    out.flush()?;
    pb.finish_and_clear();

    if let Some(path) = &args.output {
        println!("Wrote {windows} windows to {}", path.display());
    }
    Ok(())
}
