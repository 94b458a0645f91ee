use std::{
    f64::consts::PI,
    fs::File,
    io::{BufReader, Read},
    path::Path,
    time::Duration,
};

use hound::{SampleFormat, WavReader};

use crate::{EqError, Result};

/// Result of a successful read from a [`SampleSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The given number of samples were written to the front of the buffer.
    /// Fewer than requested means the stream is about to end.
    Samples(usize),
    /// The stream is exhausted and no samples were written.
    EndOfStream,
}

/// Pull-based supply of mono samples scaled to `[-1, 1]`.
///
/// Read failures are reported as errors; running out of audio is reported as
/// [`ReadOutcome::EndOfStream`].
pub trait SampleSource {
    fn sample_rate(&self) -> u32;

    fn read_mono(&mut self, out: &mut [f64]) -> Result<ReadOutcome>;
}

/// Averages interleaved frames of `channels` samples into `out`. Returns the
/// number of mono samples written; an incomplete trailing frame is ignored.
pub fn to_mono(interleaved: &[f64], channels: usize, out: &mut [f64]) -> usize {
    if channels == 0 {
        return 0;
    }
    let mut written = 0;
    for (slot, frame) in out.iter_mut().zip(interleaved.chunks_exact(channels)) {
        *slot = frame.iter().sum::<f64>() / channels as f64;
        written += 1;
    }
    written
}

/// WAV decoder that downmixes every frame to mono.
pub struct WavSource<R: Read> {
    reader: WavReader<R>,
    channels: usize,
    format: SampleFormat,
    int_scale: f64,
    interleaved: Vec<f64>,
}

impl WavSource<BufReader<File>> {
    /// Opens a WAV file on disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_wav(WavReader::open(path)?)
    }
}

impl<R: Read> WavSource<R> {
    /// Decodes WAV data from any reader.
    pub fn from_reader(reader: R) -> Result<Self> {
        Self::from_wav(WavReader::new(reader)?)
    }

    fn from_wav(reader: WavReader<R>) -> Result<Self> {
        let spec = reader.spec();
        if spec.channels == 0 {
            return Err(EqError::config("wav stream declares zero channels"));
        }
        if spec.sample_format == SampleFormat::Int && !(1..=32).contains(&spec.bits_per_sample) {
            return Err(EqError::config(format!(
                "unsupported integer sample width of {} bits",
                spec.bits_per_sample
            )));
        }

        let int_scale = 1.0 / (1i64 << (spec.bits_per_sample.max(1) - 1)) as f64;
        Ok(Self {
            reader,
            channels: usize::from(spec.channels),
            format: spec.sample_format,
            int_scale,
            interleaved: Vec::new(),
        })
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Total length of the stream in mono samples.
    pub fn len_samples(&self) -> usize {
        self.reader.duration() as usize
    }
}

impl<R: Read> SampleSource for WavSource<R> {
    fn sample_rate(&self) -> u32 {
        self.reader.spec().sample_rate
    }

    fn read_mono(&mut self, out: &mut [f64]) -> Result<ReadOutcome> {
        if out.is_empty() {
            return Ok(ReadOutcome::Samples(0));
        }

        let wanted = out.len() * self.channels;
        self.interleaved.clear();
        match self.format {
            SampleFormat::Float => {
                for sample in self.reader.samples::<f32>().take(wanted) {
                    self.interleaved.push(f64::from(sample?));
                }
            }
            SampleFormat::Int => {
                for sample in self.reader.samples::<i32>().take(wanted) {
                    self.interleaved.push(f64::from(sample?) * self.int_scale);
                }
            }
        }

        match to_mono(&self.interleaved, self.channels, out) {
            0 => Ok(ReadOutcome::EndOfStream),
            written => Ok(ReadOutcome::Samples(written)),
        }
    }
}

impl<R: Read> std::fmt::Debug for WavSource<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WavSource")
            .field("spec", &self.reader.spec())
            .finish()
    }
}

/// Synthetic sine wave of fixed length.
#[derive(Debug, Clone)]
pub struct ToneSource {
    frequency_hz: f64,
    amplitude: f64,
    sample_rate: u32,
    total: usize,
    position: usize,
}

impl ToneSource {
    pub fn new(frequency_hz: f64, amplitude: f64, sample_rate: u32, duration: Duration) -> Self {
        let total = (duration.as_secs_f64() * f64::from(sample_rate)).round() as usize;
        Self {
            frequency_hz,
            amplitude,
            sample_rate,
            total,
            position: 0,
        }
    }

    /// Number of samples left before the end of the stream.
    pub fn remaining(&self) -> usize {
        self.total - self.position
    }
}

impl SampleSource for ToneSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read_mono(&mut self, out: &mut [f64]) -> Result<ReadOutcome> {
        let count = out.len().min(self.remaining());
        if count == 0 && !out.is_empty() {
            return Ok(ReadOutcome::EndOfStream);
        }

        let step = 2.0 * PI * self.frequency_hz / f64::from(self.sample_rate);
        for (offset, slot) in out[..count].iter_mut().enumerate() {
            *slot = self.amplitude * (step * (self.position + offset) as f64).sin();
        }
        self.position += count;
        Ok(ReadOutcome::Samples(count))
    }
}
