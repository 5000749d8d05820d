//! Host audio playback
//!
//! Stand-in for a DAC peripheral on a hosted target: an output stream on
//! the default device whose callback pulls formatted chunks from a
//! [`ChunkSource`], running in its own dedicated thread for low latency.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::StreamConfig;
use crossbeam_channel::{bounded, Receiver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::audio::output::ChunkSource;
use crate::config::{SAMPLE_RATE, WRITE_CHANNELS};
use crate::error::AudioError;

/// Plays chunks from a [`ChunkSource`] on the default output device
///
/// Expects an I2S-style source (signed words with `1 << 15` range) so
/// the peripheral words cast directly to the stream's i16 samples.
pub struct HostPlayback {
    source: Arc<ChunkSource>,

    /// Whether playback is running
    running: Arc<AtomicBool>,

    /// Stream thread handle
    thread_handle: Option<JoinHandle<()>>,

    /// Channel for stream errors
    error_rx: Option<Receiver<AudioError>>,
}

impl HostPlayback {
    pub fn new(source: ChunkSource) -> Self {
        Self {
            source: Arc::new(source),
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
            error_rx: None,
        }
    }

    /// Start the output stream
    pub fn start(&mut self) -> Result<(), AudioError> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        let (error_tx, error_rx) = bounded::<AudioError>(16);
        self.error_rx = Some(error_rx);

        let running = self.running.clone();
        let running_for_loop = self.running.clone();
        let source = self.source.clone();

        running.store(true, Ordering::SeqCst);

        let handle = thread::Builder::new()
            .name("playback".to_string())
            .spawn(move || {
                let host = cpal::default_host();
                let device = match host.default_output_device() {
                    Some(d) => d,
                    None => {
                        let _ = error_tx
                            .try_send(AudioError::DeviceNotFound("default output".into()));
                        running.store(false, Ordering::SeqCst);
                        return;
                    }
                };

                let config = StreamConfig {
                    channels: WRITE_CHANNELS as u16,
                    sample_rate: cpal::SampleRate(SAMPLE_RATE),
                    buffer_size: cpal::BufferSize::Default,
                };

                let mut words: Vec<u32> = Vec::new();
                let callback_error_tx = error_tx.clone();

                let stream = device.build_output_stream(
                    &config,
                    move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                        words.resize(data.len(), 0);
                        source.get_chunk(&mut words);
                        for (out, &word) in data.iter_mut().zip(&words) {
                            *out = word as i16;
                        }
                    },
                    move |err| {
                        let _ = callback_error_tx.try_send(AudioError::StreamError(err.to_string()));
                    },
                    None,
                );

                match stream {
                    Ok(stream) => {
                        if let Err(e) = stream.play() {
                            let _ = error_tx.try_send(AudioError::StreamError(e.to_string()));
                            running.store(false, Ordering::SeqCst);
                            return;
                        }

                        // Keep thread alive while running
                        while running_for_loop.load(Ordering::Relaxed) {
                            thread::sleep(Duration::from_millis(10));
                        }

                        // Stream is dropped here, stopping playback
                    }
                    Err(e) => {
                        let _ = error_tx.try_send(AudioError::StreamError(e.to_string()));
                        running.store(false, Ordering::SeqCst);
                    }
                }
            })
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        self.thread_handle = Some(handle);
        Ok(())
    }

    /// Stop playback
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    /// Check if playback is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Number of chunk requests served so far
    pub fn chunks_filled(&self) -> u64 {
        self.source.chunks_filled()
    }

    /// Check for errors
    pub fn check_errors(&self) -> Option<AudioError> {
        self.error_rx.as_ref().and_then(|rx| rx.try_recv().ok())
    }
}

impl Drop for HostPlayback {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::buffer::ChannelRingBuffer;
    use crate::audio::output::OutputFormat;

    #[test]
    fn test_playback_creation() {
        let fifo = Arc::new(ChannelRingBuffer::new(2, 64));
        let source = ChunkSource::new(fifo, OutputFormat::i2s(1 << 15), 0.5);
        let playback = HostPlayback::new(source);

        // Construction touches no device; nothing runs until start().
        assert!(!playback.is_running());
        assert_eq!(playback.chunks_filled(), 0);
    }
}
