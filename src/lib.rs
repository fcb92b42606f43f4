//! Audio sample player widget
//!
//! Loads an audio resource, draws its waveform and keeps a playhead cursor
//! in step with the audio clock while it plays.
//!
//! - [`waveform_cache`]: sample buffer to per-column peak envelope
//! - [`player`]: playback state machine, frame scheduler, player instance
//! - [`ui`]: retained scene, waveform canvas, transport controls
//! - [`audio`]: engine boundary with cpal output and symphonia decoding
//! - [`app`]: iced desktop host

pub mod app;
pub mod audio;
pub mod config;
pub mod player;
pub mod ui;
pub mod waveform_cache;

pub use audio::{AudioEngine, CpalEngine, SampleBuffer};
pub use player::{AudioPlayer, PlaybackController, PlaybackState};
