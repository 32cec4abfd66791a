//! Audio capture into the relay's capture queue
//!
//! The device delivers fixed-size i16 frames on its own callback thread; each
//! frame is copied and pushed with drop-newest-on-full, so a stalled consumer
//! costs data, never device time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use crossbeam_channel::bounded;

use crate::audio::device;
use crate::config::AudioConfig;
use crate::constants::QUEUE_CAPACITY;
use crate::error::AudioError;
use crate::queue::{shared_queue, PushResult, SharedQueue};

/// Captures audio from the default input device
pub struct AudioCapture {
    queue: SharedQueue<Vec<i16>>,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
    stream_config: cpal::StreamConfig,
    device_name: String,
}

impl AudioCapture {
    /// Resolve the input device and prepare the capture queue.
    ///
    /// A missing device or unusable audio subsystem fails here; the process
    /// must not reach streaming state without a working source.
    pub fn new(config: &AudioConfig) -> Result<Self, AudioError> {
        let device = device::default_input_device()?;
        device.default_input_config()?;
        Ok(Self {
            queue: shared_queue(QUEUE_CAPACITY),
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
            stream_config: device::stream_config(config),
            device_name: device.name,
        })
    }

    /// Handle to the queue the capture callback feeds
    pub fn queue(&self) -> SharedQueue<Vec<i16>> {
        self.queue.clone()
    }

    /// Start capturing audio
    pub fn start(&mut self) -> Result<(), AudioError> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        let device = device::default_input_device()?;
        let (ready_tx, ready_rx) = bounded::<Result<(), AudioError>>(1);

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        let running_for_loop = self.running.clone();
        let queue = self.queue.clone();
        let config = self.stream_config.clone();

        let handle = thread::Builder::new()
            .name("audio-capture".to_string())
            .spawn(move || {
                let cpal_device = device.into_inner();

                let stream = cpal_device.build_input_stream(
                    &config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        if !running.load(Ordering::Relaxed) {
                            return;
                        }
                        // The device reuses its buffer; copy before queueing.
                        match queue.push(data.to_vec()) {
                            PushResult::Pushed => {}
                            PushResult::Dropped => {
                                tracing::warn!("capture queue full, dropping frame");
                            }
                            PushResult::Closed => {}
                        }
                    },
                    move |err| {
                        tracing::error!("capture stream error: {err}");
                    },
                    None,
                );

                match stream {
                    Ok(stream) => {
                        if let Err(e) = stream.play() {
                            let _ = ready_tx.send(Err(AudioError::StreamError(e.to_string())));
                            return;
                        }
                        let _ = ready_tx.send(Ok(()));

                        // Keep thread alive while running
                        while running_for_loop.load(Ordering::Relaxed) {
                            thread::sleep(Duration::from_millis(10));
                        }

                        // Stream is dropped here, stopping capture
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(AudioError::StreamError(e.to_string())));
                    }
                }
            })
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        self.thread_handle = Some(handle);

        match ready_rx.recv() {
            Ok(Ok(())) => {
                tracing::info!(
                    device = %self.device_name,
                    rate = self.stream_config.sample_rate.0,
                    channels = self.stream_config.channels,
                    "audio capture started"
                );
                Ok(())
            }
            Ok(Err(e)) => {
                self.running.store(false, Ordering::SeqCst);
                Err(e)
            }
            Err(_) => {
                self.running.store(false, Ordering::SeqCst);
                Err(AudioError::StreamError(
                    "capture thread exited before starting".to_string(),
                ))
            }
        }
    }

    /// Stop capturing, close the capture queue and release the device.
    ///
    /// Safe to call whether or not `start` ever ran; also invoked on drop.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.queue.close();

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
            tracing::info!("audio capture stopped");
        }
    }

    /// Check if capture is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Frames discarded because the capture queue was full
    pub fn dropped_frames(&self) -> u64 {
        self.queue.dropped()
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_without_start_is_safe() {
        // Creation needs a real input device; on machines without one the
        // constructor itself must fail instead.
        if let Ok(mut capture) = AudioCapture::new(&AudioConfig::default()) {
            assert!(!capture.is_running());
            capture.stop();
            assert!(capture.queue().is_closed());
        }
    }
}
