//! Audio playback fed from the relay's playback queue
//!
//! `write` never blocks: frames land in a bounded queue under the same
//! drop-newest policy as capture. A feed thread pops, encodes and hands the
//! bytes to a [`PcmSink`], pausing on an empty queue until the next write or
//! until the queue closes. The pipeline does not synthesize silence to cover
//! underruns; a starved sink simply waits for the stream to resume.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use cpal::traits::{DeviceTrait, StreamTrait};
use crossbeam_channel::{bounded, Sender, TryRecvError};

use crate::audio::device;
use crate::codec;
use crate::config::AudioConfig;
use crate::constants::QUEUE_CAPACITY;
use crate::error::AudioError;
use crate::queue::{shared_queue, PushResult, SharedQueue};

/// Continuous byte-stream consumer at a fixed PCM format.
///
/// `write` must not return until the sink has accepted the bytes; that
/// backpressure is what turns the queue's discrete frames into a continuous
/// pull-paced stream. An error means the sink is gone for good.
pub trait PcmSink: Send + 'static {
    fn write(&mut self, bytes: &[u8]) -> Result<(), AudioError>;
}

/// Plays audio pushed through [`write`](AudioPlayback::write)
pub struct AudioPlayback {
    queue: SharedQueue<Vec<i16>>,
    feed_handle: Option<JoinHandle<()>>,
}

impl AudioPlayback {
    /// Create a playback pipeline bound to the default output device.
    ///
    /// Device resolution failure is fatal here, before any frame is accepted.
    pub fn new(config: &AudioConfig) -> Result<Self, AudioError> {
        let sink = CpalSink::new(config)?;
        Self::with_sink(sink)
    }

    /// Create a playback pipeline over an arbitrary sink
    pub fn with_sink<S: PcmSink>(mut sink: S) -> Result<Self, AudioError> {
        let queue = shared_queue(QUEUE_CAPACITY);
        let feed_queue: SharedQueue<Vec<i16>> = queue.clone();

        let feed_handle = thread::Builder::new()
            .name("playback-feed".to_string())
            .spawn(move || {
                while let Some(samples) = feed_queue.pop_blocking() {
                    let bytes = codec::encode(&samples);
                    if sink.write(&bytes).is_err() {
                        tracing::warn!("audio sink closed, stopping playback feed");
                        break;
                    }
                }
                // Queue closed and drained: the byte stream ends here.
            })
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        Ok(Self {
            queue,
            feed_handle: Some(feed_handle),
        })
    }

    /// Queue samples for playback without blocking.
    ///
    /// A full queue drops this frame; a closed queue (after [`stop`]) makes
    /// the call a no-op. Neither case is an error to the caller.
    ///
    /// [`stop`]: AudioPlayback::stop
    pub fn write(&self, samples: &[i16]) {
        match self.queue.push(samples.to_vec()) {
            PushResult::Pushed => {}
            PushResult::Dropped => {
                tracing::warn!("playback queue full, dropping frame");
            }
            PushResult::Closed => {}
        }
    }

    /// Close the playback queue, let the feed drain and release the sink.
    ///
    /// Safe to call more than once; also invoked on drop.
    pub fn stop(&mut self) {
        self.queue.close();
        if let Some(handle) = self.feed_handle.take() {
            let _ = handle.join();
            tracing::info!("audio playback stopped");
        }
    }

    /// Frames discarded because the playback queue was full
    pub fn dropped_frames(&self) -> u64 {
        self.queue.dropped()
    }
}

impl Drop for AudioPlayback {
    fn drop(&mut self) {
        self.stop();
    }
}

/// cpal-backed sink feeding the default output device.
///
/// Bytes travel through a small bounded channel; `write` blocks while the
/// device side is full, pacing the feed thread to playback speed. The output
/// callback drains the channel into device frames and pads with silence only
/// when starved, since a cpal output buffer must always be filled.
pub struct CpalSink {
    tx: Option<Sender<Bytes>>,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

/// Frames buffered between the feed thread and the output callback
const SINK_CHANNEL_DEPTH: usize = 4;

impl CpalSink {
    pub fn new(config: &AudioConfig) -> Result<Self, AudioError> {
        let device = device::default_output_device()?;
        device.default_output_config()?;
        let stream_config = device::stream_config(config);
        let device_name = device.name.clone();

        let (tx, rx) = bounded::<Bytes>(SINK_CHANNEL_DEPTH);
        let (ready_tx, ready_rx) = bounded::<Result<(), AudioError>>(1);

        let running = Arc::new(AtomicBool::new(true));
        let running_for_loop = running.clone();

        let thread_handle = thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || {
                let cpal_device = device.into_inner();
                let mut pending: VecDeque<u8> = VecDeque::new();

                let stream = cpal_device.build_output_stream(
                    &stream_config,
                    move |out: &mut [i16], _: &cpal::OutputCallbackInfo| {
                        for slot in out.iter_mut() {
                            *slot = next_sample(&mut pending, || match rx.try_recv() {
                                Ok(bytes) => Some(bytes),
                                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
                            })
                            .unwrap_or(0);
                        }
                    },
                    move |err| {
                        tracing::error!("output stream error: {err}");
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

                        while running_for_loop.load(Ordering::Relaxed) {
                            thread::sleep(Duration::from_millis(10));
                        }
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(AudioError::StreamError(e.to_string())));
                    }
                }
            })
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        let mut sink = Self {
            tx: Some(tx),
            running,
            thread_handle: Some(thread_handle),
        };

        match ready_rx.recv() {
            Ok(Ok(())) => {
                tracing::info!(device = %device_name, "audio output started");
                Ok(sink)
            }
            Ok(Err(e)) => {
                sink.shutdown();
                Err(e)
            }
            Err(_) => {
                sink.shutdown();
                Err(AudioError::StreamError(
                    "output thread exited before starting".to_string(),
                ))
            }
        }
    }

    fn shutdown(&mut self) {
        self.tx.take();
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl PcmSink for CpalSink {
    fn write(&mut self, bytes: &[u8]) -> Result<(), AudioError> {
        let tx = self.tx.as_ref().ok_or(AudioError::SinkClosed)?;
        tx.send(Bytes::copy_from_slice(bytes))
            .map_err(|_| AudioError::SinkClosed)
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Assemble the next device sample from buffered bytes, refilling on demand
fn next_sample(
    pending: &mut VecDeque<u8>,
    mut refill: impl FnMut() -> Option<Bytes>,
) -> Option<i16> {
    while pending.len() < 2 {
        pending.extend(refill()?);
    }
    let lo = pending.pop_front()?;
    let hi = pending.pop_front()?;
    Some(i16::from_le_bytes([lo, hi]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::Receiver;

    struct ChannelSink {
        tx: Sender<Vec<u8>>,
    }

    impl PcmSink for ChannelSink {
        fn write(&mut self, bytes: &[u8]) -> Result<(), AudioError> {
            self.tx
                .send(bytes.to_vec())
                .map_err(|_| AudioError::SinkClosed)
        }
    }

    fn channel_playback() -> (AudioPlayback, Receiver<Vec<u8>>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let playback = AudioPlayback::with_sink(ChannelSink { tx }).unwrap();
        (playback, rx)
    }

    #[test]
    fn frames_reach_sink_encoded_in_order() {
        let (playback, rx) = channel_playback();
        playback.write(&[513, 1027]);
        playback.write(&[-1]);
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(1)).unwrap(),
            vec![0x01, 0x02, 0x03, 0x04]
        );
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(1)).unwrap(),
            vec![0xff, 0xff]
        );
    }

    #[test]
    fn stop_ends_byte_stream() {
        let (mut playback, rx) = channel_playback();
        playback.write(&[1, 2]);
        playback.stop();
        // Already-queued frame drains before the stream ends.
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(1)).unwrap(),
            vec![0x01, 0x00, 0x02, 0x00]
        );
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn write_after_stop_does_not_block_or_fault() {
        let (mut playback, _rx) = channel_playback();
        playback.stop();
        playback.write(&[1, 2, 3]);
        playback.stop();
    }

    #[test]
    fn sink_error_ends_feed() {
        let (tx, rx) = crossbeam_channel::unbounded::<Vec<u8>>();
        let mut playback = AudioPlayback::with_sink(ChannelSink { tx }).unwrap();
        drop(rx);
        playback.write(&[1]);
        // Feed thread exits on the sink error; stop still joins cleanly.
        playback.stop();
    }

    #[test]
    fn next_sample_pads_nothing_itself() {
        let mut pending = VecDeque::new();
        assert_eq!(next_sample(&mut pending, || None), None);
        pending.extend([0x01, 0x02]);
        assert_eq!(next_sample(&mut pending, || None), Some(513));
    }
}
