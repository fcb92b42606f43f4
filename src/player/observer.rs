use crate::audio::DecodeError;

/// Lifecycle notifications from a [`PlaybackController`](super::PlaybackController).
///
/// All methods default to no-ops so observers only implement what they need.
pub trait PlaybackObserver {
    fn on_loaded(&mut self, _duration: f64) {}

    /// Called once per failed load. There is no automatic retry.
    fn on_load_failed(&mut self, _error: &DecodeError) {}

    /// Playback started from `fraction` of the buffer.
    fn on_played(&mut self, _fraction: f64) {}

    /// Fired once per transition from playing to idle.
    fn on_stopped(&mut self) {}
}

/// Writes lifecycle events to the log.
pub struct LoggingObserver {
    label: String,
}

impl LoggingObserver {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl PlaybackObserver for LoggingObserver {
    fn on_loaded(&mut self, duration: f64) {
        log::info!("[{}] ready, {:.2}s", self.label, duration);
    }

    fn on_load_failed(&mut self, error: &DecodeError) {
        log::warn!("[{}] load failed: {}", self.label, error);
    }

    fn on_played(&mut self, fraction: f64) {
        log::info!("[{}] playing from {:.1}%", self.label, fraction * 100.0);
    }

    fn on_stopped(&mut self) {
        log::info!("[{}] stopped", self.label);
    }
}

#[cfg(test)]
pub(crate) use recording::{PlaybackEvent, RecordingObserver};
