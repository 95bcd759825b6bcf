//! Default output device backed by cpal.
//!
//! The cpal stream lives on a dedicated thread (streams are not `Send` on
//! every platform); the audio callback mixes scheduled buffers from a shared
//! voice list and advances a frame counter that doubles as the output clock.

use crate::error::{AudioError, Result};
use crate::output::AudioOutput;
use crate::pcm::DecodedBuffer;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::mpsc;
use std::thread::JoinHandle;

struct Voice {
    buffer: DecodedBuffer,
    start_frame: u64,
}

struct Mixer {
    sample_rate: u32,
    channels: usize,
    frames_rendered: AtomicU64,
    gain_bits: AtomicU32,
    voices: Mutex<Vec<Voice>>,
}

impl Mixer {
    fn new(sample_rate: u32, channels: usize) -> Self {
        Self {
            sample_rate,
            channels,
            frames_rendered: AtomicU64::new(0),
            gain_bits: AtomicU32::new(1.0f32.to_bits()),
            voices: Mutex::new(Vec::new()),
        }
    }

    fn render(&self, data: &mut [f32]) {
        data.fill(0.0);
        let frames = data.len() / self.channels;
        let base = self.frames_rendered.load(Ordering::Acquire);
        let window_end = base + frames as u64;
        let gain = f32::from_bits(self.gain_bits.load(Ordering::Relaxed));

        let mut voices = self.voices.lock();
        voices.retain(|voice| {
            let step = voice.buffer.sample_rate() as f64 / self.sample_rate as f64;
            let source_frames = voice.buffer.frame_count();
            let last_channel = voice.buffer.channel_count().saturating_sub(1);

            let first = voice.start_frame.max(base);
            for frame in first..window_end {
                let pos = ((frame - voice.start_frame) as f64 * step) as usize;
                if pos >= source_frames {
                    break;
                }
                let offset = (frame - base) as usize * self.channels;
                for channel in 0..self.channels {
                    let source = voice.buffer.channel(channel.min(last_channel));
                    data[offset + channel] += source[pos] * gain;
                }
            }

            let length = (source_frames as f64 / step).ceil() as u64;
            voice.start_frame + length > window_end
        });
        drop(voices);

        for sample in data.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }
        self.frames_rendered.store(window_end, Ordering::Release);
    }
}

/// The system default output device.
pub struct DeviceOutput {
    mixer: Arc<Mixer>,
    shutdown: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl DeviceOutput {
    /// Open the default output device and start its stream.
    pub fn open_default() -> Result<Self> {
        let (ready_tx, ready_rx) = mpsc::channel::<Result<Arc<Mixer>>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let thread = std::thread::Builder::new()
            .name("mirror-audio-out".to_string())
            .spawn(move || match build_stream() {
                Ok((stream, mixer)) => {
                    let _ = ready_tx.send(Ok(mixer));
                    // Blocks until the sender is dropped.
                    let _ = shutdown_rx.recv();
                    drop(stream);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| AudioError::device(format!("Failed to spawn audio thread: {}", e)))?;

        let mixer = ready_rx
            .recv()
            .map_err(|_| AudioError::device("Audio thread exited before the stream started"))??;

        tracing::info!(
            sample_rate = mixer.sample_rate,
            channels = mixer.channels,
            "Audio output opened"
        );

        Ok(Self { mixer, shutdown: Some(shutdown_tx), thread: Some(thread) })
    }

    /// Device sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.mixer.sample_rate
    }
}

fn build_stream() -> Result<(cpal::Stream, Arc<Mixer>)> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| AudioError::device("No default output device found"))?;

    let supported = device
        .default_output_config()
        .map_err(|e| AudioError::device(format!("Failed to get output config: {}", e)))?;

    if supported.sample_format() != cpal::SampleFormat::F32 {
        return Err(AudioError::format(format!(
            "Output device sample format {:?} is not f32",
            supported.sample_format()
        )));
    }

    let config: cpal::StreamConfig = supported.config();
    let mixer = Arc::new(Mixer::new(config.sample_rate.0, config.channels as usize));
    let render_mixer = mixer.clone();

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| render_mixer.render(data),
            |err| tracing::error!(error = %err, "Audio output stream error"),
            None,
        )
        .map_err(|e| AudioError::device(format!("Failed to build output stream: {}", e)))?;

    stream.play().map_err(|e| AudioError::device(format!("Failed to start stream: {}", e)))?;

    Ok((stream, mixer))
}

impl AudioOutput for DeviceOutput {
    fn current_time(&self) -> f64 {
        self.mixer.frames_rendered.load(Ordering::Acquire) as f64 / self.mixer.sample_rate as f64
    }

    fn schedule(&self, buffer: DecodedBuffer, start_at: f64) {
        let requested = (start_at.max(0.0) * self.mixer.sample_rate as f64).round() as u64;
        let now = self.mixer.frames_rendered.load(Ordering::Acquire);
        self.mixer.voices.lock().push(Voice { buffer, start_frame: requested.max(now) });
    }

    fn silence(&self) {
        self.mixer.voices.lock().clear();
    }

    fn set_gain(&self, gain: f32) {
        self.mixer.gain_bits.store(gain.to_bits(), Ordering::Relaxed);
    }
}

impl Drop for DeviceOutput {
    fn drop(&mut self) {
        self.shutdown.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl std::fmt::Debug for DeviceOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceOutput")
            .field("sample_rate", &self.mixer.sample_rate)
            .field("channels", &self.mixer.channels)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixer_starts_voice_at_frame() {
        let mixer = Mixer::new(4, 1);
        mixer.voices.lock().push(Voice {
            buffer: DecodedBuffer::from_planar(vec![vec![0.5, 0.5]], 4),
            start_frame: 2,
        });

        let mut data = [0.0f32; 4];
        mixer.render(&mut data);
        assert_eq!(data, [0.0, 0.0, 0.5, 0.5]);
        assert!(mixer.voices.lock().is_empty());
    }

    #[test]
    fn test_mixer_upmixes_mono() {
        let mixer = Mixer::new(2, 2);
        mixer.voices.lock().push(Voice {
            buffer: DecodedBuffer::from_planar(vec![vec![0.25]], 2),
            start_frame: 0,
        });

        let mut data = [0.0f32; 2];
        mixer.render(&mut data);
        assert_eq!(data, [0.25, 0.25]);
    }

    #[test]
    fn test_mixer_keeps_unfinished_voice() {
        let mixer = Mixer::new(2, 1);
        mixer.voices.lock().push(Voice {
            buffer: DecodedBuffer::from_planar(vec![vec![0.1, 0.2, 0.3]], 2),
            start_frame: 0,
        });

        let mut data = [0.0f32; 2];
        mixer.render(&mut data);
        assert_eq!(mixer.voices.lock().len(), 1);

        mixer.render(&mut data);
        assert_eq!(data[0], 0.3);
        assert!(mixer.voices.lock().is_empty());
        assert_eq!(mixer.frames_rendered.load(Ordering::Acquire), 4);
    }
}
