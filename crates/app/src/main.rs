use std::{
    io::{self, BufWriter},
    path::{Path, PathBuf},
    time::Duration,
};

use clap::{Args, Parser, Subcommand, ValueEnum};
use led_eq_core::{
    choose_window_size, pipeline, Accumulation, AppConfig, EqError, EqualizerEngine,
    FrameRecorder, Pacing, PartitionSpec, PipelineSummary, SampleSource, SparklineRenderer,
    ToneSource, WavSource, WindowRounding, WindowSpec,
};
use tracing_subscriber::EnvFilter;

fn main() -> led_eq_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            input,
            realtime,
            eq,
        } => run_play(&input, realtime, &eq),
        Commands::Analyze { input, output, eq } => run_analyze(&input, &output, &eq),
        Commands::Tone {
            frequency,
            amplitude,
            sample_rate,
            seconds,
            eq,
        } => run_tone(frequency, amplitude, sample_rate, seconds, &eq),
        Commands::WindowSize {
            sample_rate,
            frame_ms,
            rounding,
        } => run_window_size(sample_rate, frame_ms, rounding),
    }
}

fn run_play(input: &Path, realtime: bool, eq: &EqArgs) -> led_eq_core::Result<()> {
    tracing::info!(?input, realtime, "playing wav file");

    let mut source = WavSource::open(input)?;
    let mut engine = build_engine(&source, eq)?;
    let stdout = io::stdout();
    let mut renderer = SparklineRenderer::new(BufWriter::new(stdout.lock()), engine.bins());
    let pacing = if realtime {
        Pacing::RealTime
    } else {
        Pacing::Unpaced
    };

    let summary = pipeline::run(&mut source, &mut engine, &mut renderer, pacing)?;
    report(&summary, engine.sample_rate());
    Ok(())
}

fn run_analyze(input: &Path, output: &Path, eq: &EqArgs) -> led_eq_core::Result<()> {
    tracing::info!(?input, ?output, "analysing wav file");

    let mut source = WavSource::open(input)?;
    let mut engine = build_engine(&source, eq)?;
    let mut recorder = FrameRecorder::for_engine(&engine);

    let summary = pipeline::run(&mut source, &mut engine, &mut recorder, Pacing::Unpaced)?;
    report(&summary, engine.sample_rate());
    recorder.into_recording().write_json(output)?;
    tracing::info!(?output, "wrote recording");
    Ok(())
}

fn run_tone(
    frequency: f64,
    amplitude: f64,
    sample_rate: u32,
    seconds: f64,
    eq: &EqArgs,
) -> led_eq_core::Result<()> {
    let duration = Duration::try_from_secs_f64(seconds).map_err(|err| {
        EqError::config(format!("tone duration of {seconds} s is unusable: {err}"))
    })?;
    tracing::info!(frequency, amplitude, sample_rate, seconds, "rendering test tone");

    let mut source = ToneSource::new(frequency, amplitude, sample_rate, duration);
    let mut engine = build_engine(&source, eq)?;
    let stdout = io::stdout();
    let mut renderer = SparklineRenderer::new(BufWriter::new(stdout.lock()), engine.bins());

    let summary = pipeline::run(&mut source, &mut engine, &mut renderer, Pacing::Unpaced)?;
    report(&summary, engine.sample_rate());
    Ok(())
}

fn run_window_size(
    sample_rate: u32,
    frame_ms: f64,
    rounding: Rounding,
) -> led_eq_core::Result<()> {
    let frame = Duration::try_from_secs_f64(frame_ms / 1000.0).map_err(|err| {
        EqError::config(format!("frame duration of {frame_ms} ms is unusable: {err}"))
    })?;
    println!("{}", choose_window_size(sample_rate, frame, rounding.into()));
    Ok(())
}

fn build_engine(source: &dyn SampleSource, eq: &EqArgs) -> led_eq_core::Result<EqualizerEngine> {
    let config = eq.resolve()?;
    let engine_config = config.engine_config(source.sample_rate())?;
    tracing::debug!(?engine_config, "resolved engine configuration");

    let engine = EqualizerEngine::new(engine_config)?;
    tracing::info!(
        sample_rate = engine.sample_rate(),
        window_size = engine.window_size(),
        bins = engine.bins(),
        "equalizer ready"
    );
    Ok(engine)
}

fn report(summary: &PipelineSummary, sample_rate: u32) {
    if summary.discarded > 0 {
        tracing::warn!(samples = summary.discarded, "discarded trailing partial window");
    }
    tracing::info!(
        frames = summary.frames,
        dropped = summary.dropped,
        peak_rms = summary.peak_rms,
        audio = ?pipeline::audio_duration(summary, sample_rate),
        "stream finished"
    );
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Audio spectrum equalizer for LED and terminal displays", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Draw a WAV file as a terminal sparkline, one line per frame.
    Play {
        /// Path to the WAV file.
        input: PathBuf,
        /// Pace frames to the audio clock instead of rendering as fast as possible.
        #[arg(long)]
        realtime: bool,
        #[command(flatten)]
        eq: EqArgs,
    },
    /// Analyse a WAV file and persist every frame as JSON.
    Analyze {
        /// Path to the WAV file.
        input: PathBuf,
        /// Output path for the recorded frames.
        output: PathBuf,
        #[command(flatten)]
        eq: EqArgs,
    },
    /// Run a synthetic sine wave through the equalizer.
    Tone {
        #[arg(long, default_value_t = 440.0)]
        frequency: f64,
        #[arg(long, default_value_t = 0.5)]
        amplitude: f64,
        #[arg(long, default_value_t = 44_100)]
        sample_rate: u32,
        #[arg(long, default_value_t = 1.0)]
        seconds: f64,
        #[command(flatten)]
        eq: EqArgs,
    },
    /// Print the power-of-two window size for a target frame duration.
    WindowSize {
        #[arg(long, default_value_t = 44_100)]
        sample_rate: u32,
        #[arg(long, default_value_t = 50.0)]
        frame_ms: f64,
        #[arg(long, value_enum, default_value_t = Rounding::AtMost)]
        rounding: Rounding,
    },
}

/// Equalizer options shared by every subcommand that analyses audio. Flags
/// override values from the configuration file.
#[derive(Args, Debug)]
struct EqArgs {
    /// JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Number of output bands (linear and exponential layouts only).
    #[arg(long)]
    bins: Option<usize>,
    /// Target frame duration in milliseconds; the window is rounded to a power of two.
    #[arg(long)]
    frame_ms: Option<f64>,
    /// Rounding used together with --frame-ms.
    #[arg(long, value_enum, default_value_t = Rounding::AtMost)]
    rounding: Rounding,
    /// Gain applied to every band.
    #[arg(long)]
    normalize: Option<f64>,
    /// Emit bands in decibels.
    #[arg(long)]
    db: bool,
    /// Average overlapping bins instead of summing them.
    #[arg(long)]
    average: bool,
}

impl EqArgs {
    fn resolve(&self) -> led_eq_core::Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::debug!(?path, "loading configuration");
                AppConfig::load(path)?
            }
            None => AppConfig::default(),
        };

        if let Some(bins) = self.bins {
            if matches!(config.partition, PartitionSpec::Arbitrary { .. }) {
                tracing::warn!(
                    bins,
                    "--bins ignored: the configured partition lists its own boundaries"
                );
            }
            config.partition = config.partition.with_bins(bins);
        }
        if let Some(millis) = self.frame_ms {
            config.window = WindowSpec::FrameDuration {
                millis,
                rounding: self.rounding.into(),
            };
        }
        if let Some(factor) = self.normalize {
            config.normalize_factor = factor;
        }
        if self.db {
            config.output_db = true;
        }
        if self.average {
            config.accumulation = Accumulation::WeightedAverage;
        }
        Ok(config)
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Rounding {
    AtLeast,
    AtMost,
}

impl From<Rounding> for WindowRounding {
    fn from(value: Rounding) -> Self {
        match value {
            Rounding::AtLeast => WindowRounding::AtLeast,
            Rounding::AtMost => WindowRounding::AtMost,
        }
    }
}
