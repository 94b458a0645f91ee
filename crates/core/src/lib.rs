//! Core library for the LED equalizer.
//!
//! Audio windows are turned into a magnitude spectrum and re-bucketed from the
//! FFT's linear bins into caller-defined output bands (linear, exponential or
//! explicit boundary lists). Each module owns one step of that path: bin
//! partitions, overlap weights, resampling, the FFT wrapper and the engine
//! that ties them together, plus the sources, renderers and pipeline used by
//! the command line application.

pub mod audio;
pub mod bins;
pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod resample;
pub mod spectrum;
pub mod weight;

pub use audio::{ReadOutcome, SampleSource, ToneSource, WavSource};
pub use bins::{BinPartition, PartitionKind, PartitionSpec, INVALID_BOUNDS};
pub use config::{AppConfig, WindowSpec};
pub use engine::{
    choose_window_size, EngineConfig, EqualizerEngine, WindowRounding, MAX_WINDOW_SIZE,
};
pub use error::{EqError, Result};
pub use pipeline::{Pacing, PipelineSummary};
pub use render::{FrameRecorder, Recording, Renderer, SparklineRenderer};
pub use resample::{Accumulation, Resampler};
pub use spectrum::MagnitudeSpectrum;
pub use weight::FrequencyScale;
