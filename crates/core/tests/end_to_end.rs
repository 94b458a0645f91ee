//! Whole-path tests: WAV decoding, spectrum, resampling and rendering.

use std::{f64::consts::PI, path::PathBuf};

use led_eq_core::{
    pipeline, AppConfig, EngineConfig, EqualizerEngine, FrameRecorder, MagnitudeSpectrum, Pacing,
    PartitionSpec, WavSource, WindowRounding, WindowSpec,
};

fn sine(frequency: f64, amplitude: f64, sample_rate: u32, len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| amplitude * (2.0 * PI * frequency * i as f64 / f64::from(sample_rate)).sin())
        .collect()
}

/// Writes 16-bit stereo samples with the same signal on both channels.
fn write_wav(name: &str, samples: &[f64], sample_rate: u32) -> PathBuf {
    let path = std::env::temp_dir().join(format!("{name}_{}.wav", std::process::id()));
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).expect("failed to create WAV");
    for &s in samples {
        let val = (s * 32767.0).clamp(-32768.0, 32767.0) as i16;
        writer.write_sample(val).expect("write failed");
        writer.write_sample(val).expect("write failed");
    }
    writer.finalize().expect("finalize failed");
    path
}

fn assert_single_dominant_band(frame: &[f64], target: usize) {
    let peak = frame[target];
    for (index, value) in frame.iter().enumerate() {
        if index != target {
            assert!(
                peak > 2.0 * value,
                "band {index} ({value}) rivals band {target} ({peak}): {frame:?}"
            );
        }
    }
}

#[test]
fn default_engine_isolates_440_hz() {
    let mut engine = EqualizerEngine::new(EngineConfig::default()).unwrap();
    let samples = sine(440.0, 0.4, 44_100, engine.window_size());
    let mut out = vec![0.0; engine.bins()];
    engine.compute(&samples, &mut out).unwrap();

    let target = engine.output().find(440.0).unwrap();
    assert_single_dominant_band(&out, target);
}

#[test]
fn wav_file_runs_through_pipeline() {
    let path = write_wav("led_eq_440", &sine(440.0, 0.4, 44_100, 44_100), 44_100);

    let config = AppConfig {
        window: WindowSpec::FrameDuration {
            millis: 50.0,
            rounding: WindowRounding::AtMost,
        },
        ..AppConfig::default()
    };
    let mut source = WavSource::open(&path).unwrap();
    let engine_config = config.engine_config(44_100).unwrap();
    assert_eq!(engine_config.window_size, 2048);

    let mut engine = EqualizerEngine::new(engine_config).unwrap();
    let mut recorder = FrameRecorder::for_engine(&engine);
    let summary = pipeline::run(&mut source, &mut engine, &mut recorder, Pacing::Unpaced).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(summary.samples, 44_100);
    assert_eq!(summary.frames, 44_100 / 2048);
    assert_eq!(summary.discarded, 44_100 % 2048);

    let target = engine.output().find(440.0).unwrap();
    let recording = recorder.into_recording();
    assert_eq!(recording.frames.len(), summary.frames);
    for frame in &recording.frames {
        assert_single_dominant_band(frame, target);
    }
}

#[test]
fn linear_tilings_conserve_spectral_energy() {
    let sample_rate = 44_100;
    let window_size = 1024;
    let samples: Vec<f64> = sine(440.0, 0.4, sample_rate, window_size)
        .iter()
        .zip(sine(3_000.0, 0.2, sample_rate, window_size))
        .map(|(a, b)| a + b)
        .collect();

    let mut spectrum = MagnitudeSpectrum::new(window_size).unwrap();
    let mut magnitudes = vec![0.0; spectrum.bins()];
    spectrum.transform(&samples, &mut magnitudes).unwrap();
    let total: f64 = magnitudes.iter().sum();

    for bins in [1, 3, 16, 100, 513, 1024] {
        let mut engine = EqualizerEngine::new(EngineConfig {
            sample_rate_hz: sample_rate,
            window_size,
            output: PartitionSpec::Linear {
                start_hz: 0.0,
                stop_hz: f64::from(sample_rate),
                bins,
            },
            ..EngineConfig::default()
        })
        .unwrap();
        let mut out = vec![0.0; bins];
        engine.compute(&samples, &mut out).unwrap();

        let resampled: f64 = out.iter().sum();
        assert!(
            (resampled - total).abs() < 1e-9 * total,
            "{bins} bins: {resampled} vs {total}"
        );
    }
}

#[test]
fn arbitrary_bands_follow_boundaries() {
    let mut engine = EqualizerEngine::new(EngineConfig {
        sample_rate_hz: 48_000,
        window_size: 4800,
        output: PartitionSpec::Arbitrary {
            boundaries_hz: vec![20.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 20_000.0],
        },
        ..EngineConfig::default()
    })
    .unwrap();
    assert_eq!(engine.bins(), 6);

    // 10 Hz bins; 1500 Hz sits squarely in the 1000..2500 band
    let samples = sine(1500.0, 0.5, 48_000, 4800);
    let mut out = vec![0.0; 6];
    engine.compute(&samples, &mut out).unwrap();

    let peak = out[4];
    assert!((peak - 0.25 * 4800f64.sqrt()).abs() < 1e-6);
    for (index, value) in out.iter().enumerate() {
        if index != 4 {
            assert!(value.abs() < peak * 1e-6);
        }
    }
}
