//! Per-frame callback driver.
//!
//! The host calls [`FrameScheduler::tick`] once per display refresh. The
//! scheduler owns at most one callback, always the most recently subscribed
//! one, and only invokes it while enabled.

use std::time::{Duration, Instant};

use thiserror::Error;

/// Timing passed to each frame callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    /// Frames delivered since the scheduler last became active, starting at 0.
    pub frame: u64,
    /// Time since the scheduler last became active.
    pub time: Duration,
    /// Time since the previous frame (zero on the first one).
    pub time_diff: Duration,
}

impl FrameInfo {
    /// Instantaneous frame rate derived from `time_diff`, 0 on the first frame.
    pub fn frame_rate(&self) -> f64 {
        let secs = self.time_diff.as_secs_f64();
        if secs > 0.0 {
            1.0 / secs
        } else {
            0.0
        }
    }
}

/// Recoverable failures inside a frame callback. Logged, never fatal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    #[error("Drawable primitive missing: {0}")]
    MissingPrimitive(&'static str),
}

/// Handle returned by [`FrameScheduler::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

pub type FrameCallback<C> = Box<dyn FnMut(&mut C, FrameInfo) -> Result<(), FrameError>>;

pub struct FrameScheduler<C> {
    callback: Option<(SubscriptionId, FrameCallback<C>)>,
    enabled: bool,
    next_id: u64,
    frame: u64,
    started_at: Option<Instant>,
    last_tick: Option<Instant>,
}

impl<C> Default for FrameScheduler<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> FrameScheduler<C> {
    pub fn new() -> Self {
        Self {
            callback: None,
            enabled: false,
            next_id: 0,
            frame: 0,
            started_at: None,
            last_tick: None,
        }
    }

    /// Install `callback`, replacing any previous one.
    pub fn subscribe<F>(&mut self, callback: F, enabled: bool) -> SubscriptionId
    where
        F: FnMut(&mut C, FrameInfo) -> Result<(), FrameError> + 'static,
    {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.callback = Some((id, Box::new(callback)));
        self.set_enabled(enabled);
        id
    }

    /// Remove the callback if `id` is still current. Safe to call repeatedly.
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        if matches!(&self.callback, Some((current, _)) if *current == id) {
            self.callback = None;
            self.reset_timing();
            log::debug!("Frame callback {:?} unsubscribed", id);
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            log::debug!(
                "Frame scheduler {}",
                if enabled { "enabled" } else { "disabled" }
            );
            self.reset_timing();
        }
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// True when ticks will reach a callback.
    pub fn is_active(&self) -> bool {
        self.enabled && self.callback.is_some()
    }

    /// Deliver one frame. Returns whether a callback ran.
    pub fn tick(&mut self, context: &mut C, now: Instant) -> bool {
        if !self.enabled {
            return false;
        }
        let Some((id, callback)) = self.callback.as_mut() else {
            return false;
        };

        let started_at = *self.started_at.get_or_insert(now);
        let info = FrameInfo {
            frame: self.frame,
            time: now.saturating_duration_since(started_at),
            time_diff: self
                .last_tick
                .map(|last| now.saturating_duration_since(last))
                .unwrap_or(Duration::ZERO),
        };
        self.frame += 1;
        self.last_tick = Some(now);

        if let Err(e) = callback(context, info) {
            log::debug!("Frame callback {:?} failed on frame {}: {}", id, info.frame, e);
        }
        true
    }

    fn reset_timing(&mut self) {
        self.frame = 0;
        self.started_at = None;
        self.last_tick = None;
    }
}
