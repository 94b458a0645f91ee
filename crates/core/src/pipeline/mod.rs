//! Drives audio from a [`SampleSource`] through an [`EqualizerEngine`] into a
//! [`Renderer`], one window at a time.

use std::{
    thread,
    time::{Duration, Instant},
};

use serde::Serialize;

use crate::{
    spectrum::rms, EqError, EqualizerEngine, ReadOutcome, Renderer, Result, SampleSource,
};

/// Whether frames are released as soon as they are computed or spaced out to
/// match the audio clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pacing {
    #[default]
    Unpaced,
    /// Each frame is rendered once the audio it covers would have finished
    /// playing. Frames that fall more than one window behind are dropped.
    RealTime,
}

/// Counters reported once the source is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PipelineSummary {
    /// Frames handed to the renderer.
    pub frames: usize,
    /// Full windows skipped because rendering fell behind real time.
    pub dropped: usize,
    /// Mono samples read from the source.
    pub samples: usize,
    /// Samples in the trailing partial window that was never analysed.
    pub discarded: usize,
    /// Highest RMS level of any rendered window.
    pub peak_rms: f64,
}

/// Runs the source to its end, then calls [`Renderer::done`].
///
/// A source that reports zero samples for a non-empty buffer is treated as
/// exhausted.
pub fn run<S, R>(
    source: &mut S,
    engine: &mut EqualizerEngine,
    renderer: &mut R,
    pacing: Pacing,
) -> Result<PipelineSummary>
where
    S: SampleSource + ?Sized,
    R: Renderer + ?Sized,
{
    if source.sample_rate() != engine.sample_rate() {
        return Err(EqError::config(format!(
            "source delivers {} Hz but the engine expects {} Hz",
            source.sample_rate(),
            engine.sample_rate()
        )));
    }

    let window_size = engine.window_size();
    let frame_duration = engine.config().frame_duration();
    let mut window = vec![0.0; window_size];
    let mut bands = vec![0.0; engine.bins()];
    let mut summary = PipelineSummary::default();
    let mut filled = 0;
    let mut windows = 0u32;
    let start = Instant::now();

    loop {
        match source.read_mono(&mut window[filled..])? {
            ReadOutcome::Samples(count) if count > 0 => {
                filled += count;
                summary.samples += count;
                if filled < window_size {
                    continue;
                }
            }
            ReadOutcome::Samples(_) | ReadOutcome::EndOfStream => {
                summary.discarded = filled;
                break;
            }
        }

        filled = 0;
        windows += 1;
        if pacing == Pacing::RealTime {
            let deadline = start + frame_duration * windows;
            let now = Instant::now();
            if now < deadline {
                thread::sleep(deadline - now);
            } else if now - deadline > frame_duration {
                summary.dropped += 1;
                continue;
            }
        }

        engine.compute(&window, &mut bands)?;
        renderer.render(&bands)?;
        summary.frames += 1;
        summary.peak_rms = summary.peak_rms.max(rms(&window));
    }

    renderer.done()?;
    Ok(summary)
}

/// Wall-clock length of the audio a summary covers.
pub fn audio_duration(summary: &PipelineSummary, sample_rate_hz: u32) -> Duration {
    if sample_rate_hz == 0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(summary.samples as f64 / f64::from(sample_rate_hz))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EngineConfig, FrameRecorder, SparklineRenderer, ToneSource};

    #[test]
    fn renders_every_full_window() {
        let mut source = ToneSource::new(440.0, 0.5, 44_100, Duration::from_millis(500));
        let mut engine = EqualizerEngine::new(EngineConfig::default()).unwrap();
        let mut recorder = FrameRecorder::for_engine(&engine);

        let summary = run(&mut source, &mut engine, &mut recorder, Pacing::Unpaced).unwrap();

        assert_eq!(summary.samples, 22_050);
        assert_eq!(summary.frames, 22_050 / 2048);
        assert_eq!(summary.discarded, 22_050 % 2048);
        assert_eq!(summary.dropped, 0);
        assert!((summary.peak_rms - 0.5 / 2f64.sqrt()).abs() < 0.01);
        assert!(recorder.is_finished());

        let target = engine.output().find(440.0).unwrap();
        for frame in &recorder.recording().frames {
            let loudest = frame
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(index, _)| index);
            assert_eq!(loudest, Some(target));
        }
    }

    #[test]
    fn rejects_sample_rate_mismatch() {
        let mut source = ToneSource::new(440.0, 0.5, 48_000, Duration::from_millis(100));
        let mut engine = EqualizerEngine::new(EngineConfig::default()).unwrap();
        let mut renderer = SparklineRenderer::new(Vec::new(), engine.bins());

        let err = run(&mut source, &mut engine, &mut renderer, Pacing::Unpaced).unwrap_err();
        assert!(matches!(err, EqError::Configuration(_)));
    }

    #[test]
    fn short_stream_only_signals_done() {
        let mut source = ToneSource::new(440.0, 0.5, 44_100, Duration::from_millis(10));
        let mut engine = EqualizerEngine::new(EngineConfig::default()).unwrap();
        let mut recorder = FrameRecorder::for_engine(&engine);

        let summary = run(&mut source, &mut engine, &mut recorder, Pacing::Unpaced).unwrap();
        assert_eq!(summary.frames, 0);
        assert_eq!(summary.discarded, 441);
        assert_eq!(summary.peak_rms, 0.0);
        assert!(recorder.is_finished());
        assert!(recorder.recording().frames.is_empty());
    }

    #[test]
    fn real_time_pacing_follows_audio_clock() {
        let config = EngineConfig::new(8000, 64, 4);
        let frame = config.frame_duration();
        let mut engine = EqualizerEngine::new(config).unwrap();
        let mut source = ToneSource::new(1000.0, 0.5, 8000, Duration::from_millis(40));
        let mut recorder = FrameRecorder::for_engine(&engine);

        let started = Instant::now();
        let summary = run(&mut source, &mut engine, &mut recorder, Pacing::RealTime).unwrap();

        assert_eq!(summary.frames + summary.dropped, 5);
        assert!(started.elapsed() >= frame * 5);
        assert_eq!(
            audio_duration(&summary, 8000),
            Duration::from_secs_f64(320.0 / 8000.0)
        );
    }
}
