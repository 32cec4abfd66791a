//! Raw PCM frame codec
//!
//! The wire format is headerless interleaved s16le. Sample rate and channel
//! count are agreed out of band via shared configuration; frames carry only
//! sample bytes.

pub mod pcm;

pub use pcm::{decode, encode};
