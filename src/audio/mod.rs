//! Audio subsystem module

pub mod capture;
pub mod device;
pub mod playback;
pub mod stats;

pub use capture::AudioCapture;
pub use playback::{AudioPlayback, CpalSink, PcmSink};
pub use stats::Metric;
