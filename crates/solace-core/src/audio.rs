//! WAV prosody feature extraction backing [`AudioFeatureExtractor`].
//!
//! Feature vector layout (7 values):
//! `[rms_mean, rms_std, rms_max, zcr_mean, zcr_std, peak, duration_secs]`, computed over
//! 2048-sample frames with a 512-sample hop on the mono downmix.

use crate::error::{CheckinError, CheckinResult};
use crate::traits::{AudioFeatureExtractor, AudioFeatures};
use std::io::Cursor;

pub const FRAME_LEN: usize = 2048;
pub const HOP_LEN: usize = 512;
pub const FEATURE_LEN: usize = 7;

#[derive(Debug, Clone, Copy, Default)]
pub struct WavFeatureExtractor;

impl WavFeatureExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl AudioFeatureExtractor for WavFeatureExtractor {
    fn extract(&self, audio: &[u8]) -> CheckinResult<AudioFeatures> {
        let (sample_rate, mono) = decode_mono(audio)?;
        if mono.is_empty() {
            return Err(CheckinError::AudioFeatures("recording contains no samples".to_string()));
        }
        let duration = mono.len() as f32 / sample_rate as f32;
        Ok(AudioFeatures {
            sample_rate,
            values: prosody_features(mono, duration),
        })
    }
}

fn decode_mono(audio: &[u8]) -> CheckinResult<(u32, Vec<f32>)> {
    let mut reader = hound::WavReader::new(Cursor::new(audio)).map_err(wav_err)?;
    let spec = reader.spec();
    if spec.sample_rate == 0 || spec.channels == 0 {
        return Err(CheckinError::AudioFeatures("invalid WAV header".to_string()));
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(wav_err)?,
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1) as u32)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(wav_err)?
        }
    };

    let channels = spec.channels as usize;
    let mono = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();
    Ok((spec.sample_rate, mono))
}

fn wav_err(e: hound::Error) -> CheckinError {
    CheckinError::AudioFeatures(e.to_string())
}

fn prosody_features(mut samples: Vec<f32>, duration: f32) -> Vec<f32> {
    if samples.len() < FRAME_LEN {
        samples.resize(FRAME_LEN, 0.0);
    }

    let mut rms = Vec::new();
    let mut zcr = Vec::new();
    let mut start = 0;
    while start + FRAME_LEN <= samples.len() {
        let frame = &samples[start..start + FRAME_LEN];
        let energy = frame.iter().map(|s| s * s).sum::<f32>() / FRAME_LEN as f32;
        rms.push(energy.sqrt());
        let crossings = frame
            .windows(2)
            .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
            .count();
        zcr.push(crossings as f32 / FRAME_LEN as f32);
        start += HOP_LEN;
    }

    let peak = samples.iter().fold(0.0_f32, |acc, s| acc.max(s.abs()));
    let rms_max = rms.iter().cloned().fold(0.0_f32, f32::max);
    let (rms_mean, rms_std) = mean_std(&rms);
    let (zcr_mean, zcr_std) = mean_std(&zcr);
    vec![rms_mean, rms_std, rms_max, zcr_mean, zcr_std, peak, duration]
}

fn mean_std(values: &[f32]) -> (f32, f32) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;
    (mean, var.sqrt())
}
