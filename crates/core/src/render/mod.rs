use std::{fs, io::Write, path::Path};

use serde::{Deserialize, Serialize};

use crate::{EqError, EqualizerEngine, Result};

/// Consumer of computed frames.
pub trait Renderer {
    /// Presents one frame of band values.
    fn render(&mut self, values: &[f64]) -> Result<()>;

    /// Signals that the stream has ended and no more frames follow.
    fn done(&mut self) -> Result<()>;
}

/// Gain applied before values are mapped onto glyphs.
const SPARKLINE_SCALE: f64 = 8.0;
const SPARKLINE_GLYPHS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Terminal renderer that prints one sparkline per frame, followed by the
/// average band value.
#[derive(Debug)]
pub struct SparklineRenderer<W: Write> {
    out: W,
    bins: usize,
    frames: usize,
    line: String,
}

impl<W: Write> SparklineRenderer<W> {
    pub fn new(out: W, bins: usize) -> Self {
        Self {
            out,
            bins,
            frames: 0,
            line: String::with_capacity(bins * 4),
        }
    }

    /// Number of frames drawn so far.
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Maps a band value onto one of the sparkline glyphs. Values at or below
/// zero, including negative infinity and NaN, draw as blanks.
pub fn sparkline_glyph(value: f64) -> char {
    let level = (value * SPARKLINE_SCALE).ceil();
    let top = (SPARKLINE_GLYPHS.len() - 1) as f64;
    SPARKLINE_GLYPHS[level.clamp(0.0, top) as usize]
}

impl<W: Write> Renderer for SparklineRenderer<W> {
    fn render(&mut self, values: &[f64]) -> Result<()> {
        if values.len() != self.bins {
            return Err(EqError::render(format!(
                "sparkline expects {} bands but got {}",
                self.bins,
                values.len()
            )));
        }

        self.line.clear();
        self.line.extend(values.iter().map(|value| sparkline_glyph(*value)));
        let average = values.iter().sum::<f64>() / values.len().max(1) as f64;
        writeln!(self.out, "{} avg {average:.3}", self.line)?;
        self.frames += 1;
        Ok(())
    }

    fn done(&mut self) -> Result<()> {
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}

/// Frames captured by a [`FrameRecorder`].
///
/// Non-finite values (silent bands in decibel mode) are written to JSON as
/// `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub sample_rate_hz: u32,
    pub window_size: usize,
    pub bands: Vec<(f64, f64)>,
    pub frames: Vec<Vec<f64>>,
}

impl Recording {
    /// Writes the recording as pretty-printed JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Renderer that keeps every frame in memory.
#[derive(Debug, Default)]
pub struct FrameRecorder {
    recording: Recording,
    finished: bool,
}

impl FrameRecorder {
    /// Creates a recorder labelled with the engine's layout.
    pub fn for_engine(engine: &EqualizerEngine) -> Self {
        Self {
            recording: Recording {
                sample_rate_hz: engine.sample_rate(),
                window_size: engine.window_size(),
                bands: engine.output().iter().collect(),
                frames: Vec::new(),
            },
            finished: false,
        }
    }

    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    pub fn into_recording(self) -> Recording {
        self.recording
    }

    /// Whether [`Renderer::done`] has been called.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Renderer for FrameRecorder {
    fn render(&mut self, values: &[f64]) -> Result<()> {
        if self.finished {
            return Err(EqError::render("recorder received a frame after done"));
        }
        self.recording.frames.push(values.to_vec());
        Ok(())
    }

    fn done(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EngineConfig;

    #[test]
    fn glyphs_cover_the_unit_range() {
        assert_eq!(sparkline_glyph(0.0), ' ');
        assert_eq!(sparkline_glyph(0.01), '▁');
        assert_eq!(sparkline_glyph(0.5), '▄');
        assert_eq!(sparkline_glyph(1.0), '█');
        assert_eq!(sparkline_glyph(12.0), '█');
        assert_eq!(sparkline_glyph(f64::NEG_INFINITY), ' ');
        assert_eq!(sparkline_glyph(f64::NAN), ' ');
    }

    #[test]
    fn sparkline_writes_one_line_per_frame() {
        let mut renderer = SparklineRenderer::new(Vec::new(), 3);
        renderer.render(&[0.0, 0.5, 1.0]).unwrap();
        renderer.render(&[1.0, 1.0, 1.0]).unwrap();
        renderer.done().unwrap();

        assert_eq!(renderer.frames(), 2);
        let text = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(text, " ▄█ avg 0.500\n███ avg 1.000\n\n");
    }

    #[test]
    fn sparkline_rejects_wrong_width() {
        let mut renderer = SparklineRenderer::new(Vec::new(), 3);
        let err = renderer.render(&[0.0; 4]).unwrap_err();
        assert!(matches!(err, EqError::Render(_)));
        assert_eq!(renderer.frames(), 0);
    }

    #[test]
    fn recorder_captures_layout_and_frames() {
        let engine = EqualizerEngine::new(EngineConfig::new(48_000, 1024, 4)).unwrap();
        let mut recorder = FrameRecorder::for_engine(&engine);
        recorder.render(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        recorder.done().unwrap();

        assert!(recorder.is_finished());
        assert!(recorder.render(&[0.0; 4]).is_err());

        let recording = recorder.into_recording();
        assert_eq!(recording.sample_rate_hz, 48_000);
        assert_eq!(recording.window_size, 1024);
        assert_eq!(recording.bands.len(), 4);
        assert_eq!(recording.frames, vec![vec![1.0, 2.0, 3.0, 4.0]]);
    }

    #[test]
    fn recording_round_trips_through_json() {
        let recording = Recording {
            sample_rate_hz: 8000,
            window_size: 256,
            bands: vec![(0.0, 100.0), (100.0, 4000.0)],
            frames: vec![vec![0.5, 0.25]],
        };
        let path =
            std::env::temp_dir().join(format!("led_eq_recording_{}.json", std::process::id()));
        recording.write_json(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        fs::remove_file(&path).unwrap();
        let parsed: Recording = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, recording);
    }
}
