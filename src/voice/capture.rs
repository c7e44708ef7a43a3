//! Microphone capture
//!
//! Opens the default input device in whatever format it prefers and folds
//! the stream down to 16kHz mono in the callback, which is what the STT
//! APIs want.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use rubato::{FftFixedIn, Resampler};

use crate::{Error, Result};

/// Sample rate delivered to callers (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// Device frames fed to the resampler at a time
const RESAMPLE_CHUNK: usize = 1024;

/// Captures audio from the default input device into a shared buffer
///
/// The input stream only exists between [`start`](Self::start) and
/// [`stop`](Self::stop), so the microphone is closed while the assistant
/// is speaking.
pub struct AudioCapture {
    device: Device,
    config: StreamConfig,
    format: SampleFormat,
    buffer: Arc<Mutex<Vec<f32>>>,
    stream: Option<Stream>,
}

impl AudioCapture {
    /// Open the default input device
    ///
    /// # Errors
    ///
    /// Returns error if there is no input device or it reports no usable config
    pub fn new() -> Result<Self> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let supported = device
            .default_input_config()
            .map_err(|e| Error::Audio(format!("no usable input config: {e}")))?;
        let format = supported.sample_format();
        let config: StreamConfig = supported.into();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            device_rate = config.sample_rate.0,
            channels = config.channels,
            ?format,
            "microphone opened"
        );

        Ok(Self {
            device,
            config,
            format,
            buffer: Arc::new(Mutex::new(Vec::new())),
            stream: None,
        })
    }

    /// Start capturing; a no-op when already running
    ///
    /// # Errors
    ///
    /// Returns error if the input stream cannot be built or started
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        self.clear_buffer();

        let stream = match self.format {
            SampleFormat::F32 => self.build_stream::<f32>()?,
            SampleFormat::I16 => self.build_stream::<i16>()?,
            SampleFormat::U16 => self.build_stream::<u16>()?,
            SampleFormat::I32 => self.build_stream::<i32>()?,
            other => {
                return Err(Error::Audio(format!("unsupported sample format {other:?}")));
            }
        };

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        self.stream = Some(stream);

        tracing::trace!("audio capture started");
        Ok(())
    }

    fn build_stream<T>(&self) -> Result<Stream>
    where
        T: SizedSample,
        f32: FromSample<T>,
    {
        let buffer = Arc::clone(&self.buffer);
        let mut resampler = MonoResampler::new(self.config.channels, self.config.sample_rate.0)?;
        let mut scratch = Vec::new();

        self.device
            .build_input_stream(
                &self.config,
                move |data: &[T], _: &cpal::InputCallbackInfo| {
                    scratch.clear();
                    resampler.push(data, &mut scratch);
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend_from_slice(&scratch);
                    }
                },
                |err| tracing::error!(error = %err, "audio capture error"),
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))
    }

    /// Stop capturing and close the input stream
    pub fn stop(&mut self) {
        if self.stream.take().is_some() {
            tracing::trace!("audio capture stopped");
        }
    }

    /// 16kHz mono samples captured since the last call
    #[must_use]
    pub fn take_buffer(&self) -> Vec<f32> {
        self.buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default()
    }

    /// Discard captured samples
    pub fn clear_buffer(&self) {
        if let Ok(mut buf) = self.buffer.lock() {
            buf.clear();
        }
    }

    #[must_use]
    pub const fn is_capturing(&self) -> bool {
        self.stream.is_some()
    }

    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Averages interleaved frames to mono and resamples to [`SAMPLE_RATE`]
///
/// The resampler wants fixed-size input blocks, so device samples queue in
/// `pending` across callbacks until a full block is available.
struct MonoResampler {
    channels: usize,
    resampler: Option<FftFixedIn<f32>>,
    pending: Vec<f32>,
}

impl MonoResampler {
    #[allow(clippy::cast_possible_truncation)]
    fn new(channels: u16, device_rate: u32) -> Result<Self> {
        let resampler = if device_rate == SAMPLE_RATE {
            None
        } else {
            let resampler = FftFixedIn::new(
                device_rate as usize,
                SAMPLE_RATE as usize,
                RESAMPLE_CHUNK,
                2,
                1,
            )
            .map_err(|e| Error::Audio(format!("resampler init failed: {e}")))?;
            Some(resampler)
        };

        Ok(Self {
            channels: usize::from(channels.max(1)),
            resampler,
            pending: Vec::new(),
        })
    }

    fn push<T>(&mut self, data: &[T], out: &mut Vec<f32>)
    where
        T: Sample,
        f32: FromSample<T>,
    {
        #[allow(clippy::cast_precision_loss)]
        let mono = data
            .chunks(self.channels)
            .map(|frame| frame.iter().map(|s| s.to_sample::<f32>()).sum::<f32>() / frame.len() as f32);

        let Some(resampler) = &mut self.resampler else {
            out.extend(mono);
            return;
        };

        self.pending.extend(mono);
        while self.pending.len() >= resampler.input_frames_next() {
            let block: Vec<f32> = self.pending.drain(..resampler.input_frames_next()).collect();
            match resampler.process(&[block], None) {
                Ok(mut channels) => out.append(&mut channels[0]),
                Err(e) => tracing::trace!(error = %e, "dropped audio block"),
            }
        }
    }
}

/// Encode f32 samples as 16-bit mono WAV for STT APIs
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let encode_error = |e: hound::Error| Error::Audio(format!("WAV encoding failed: {e}"));

    let mut wav = std::io::Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    let mut writer = hound::WavWriter::new(&mut wav, spec).map_err(encode_error)?;
    for &sample in samples {
        #[allow(clippy::cast_possible_truncation)]
        let pcm = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
        writer.write_sample(pcm).map_err(encode_error)?;
    }
    writer.finalize().map_err(encode_error)?;

    Ok(wav.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_mono_16k_through() {
        let mut resampler = MonoResampler::new(1, SAMPLE_RATE).unwrap();
        let mut out = Vec::new();

        resampler.push(&[0.1_f32, 0.2, 0.3], &mut out);

        assert_eq!(out, [0.1, 0.2, 0.3]);
    }

    #[test]
    fn averages_channels() {
        let mut resampler = MonoResampler::new(2, SAMPLE_RATE).unwrap();
        let mut out = Vec::new();

        resampler.push(&[0.5_f32, -0.5, 0.2, 0.4], &mut out);

        assert_eq!(out.len(), 2);
        assert!(out[0].abs() < f32::EPSILON);
        assert!((out[1] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn converts_integer_samples() {
        let mut resampler = MonoResampler::new(1, SAMPLE_RATE).unwrap();
        let mut out = Vec::new();

        resampler.push(&[i16::MAX, 0], &mut out);

        assert!((out[0] - 1.0).abs() < 1e-3);
        assert!(out[1].abs() < f32::EPSILON);
    }

    #[test]
    fn downsamples_48k_in_blocks() {
        let mut resampler = MonoResampler::new(2, 48_000).unwrap();
        let mut out = Vec::new();

        // Less than one block: nothing comes out yet
        resampler.push(&[0.0_f32; 200], &mut out);
        assert!(out.is_empty());

        // 0.1s of stereo silence
        resampler.push(&vec![0.0_f32; 9600], &mut out);
        assert!(!out.is_empty());
        assert!(out.len() <= 1700);
        assert!(out.iter().all(|s| s.abs() < 1e-6));
    }
}
