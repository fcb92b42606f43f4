//! One audio player instance.
//!
//! [`AudioPlayer`] owns the playback controller, the waveform view and the
//! frame scheduler that moves the playhead. Several players can live side by
//! side; none of their state is global.

pub mod controller;
pub mod observer;
pub mod scheduler;

use std::time::Instant;

use iced::Point;

pub use controller::{
    AudioResource, LoadCompletion, PendingLoad, PlaybackController, PlaybackState, ResourceStatus,
};
pub use observer::{LoggingObserver, PlaybackObserver};
pub use scheduler::{FrameError, FrameInfo, FrameScheduler, SubscriptionId};

use crate::audio::AudioEngine;
use crate::config::{LayoutConfig, PlayerConfig, WaveformConfig};
use crate::ui::waveform::{HitTarget, WaveformView};
use crate::waveform_cache::EnvelopeCache;

/// State the frame callback works on.
pub struct PlayerCore<E: AudioEngine> {
    controller: PlaybackController<E>,
    view: WaveformView,
}

pub struct AudioPlayer<E: AudioEngine + 'static> {
    core: PlayerCore<E>,
    scheduler: FrameScheduler<PlayerCore<E>>,
    subscription: Option<SubscriptionId>,
    envelopes: EnvelopeCache,
    torn_down: bool,
}

impl<E: AudioEngine + 'static> AudioPlayer<E> {
    pub fn create(engine: E, config: &PlayerConfig) -> Self {
        let mut scheduler = FrameScheduler::new();
        let subscription = scheduler.subscribe(
            |core: &mut PlayerCore<E>, frame| core.view.advance(&mut core.controller, frame),
            false,
        );

        Self {
            core: PlayerCore {
                controller: PlaybackController::new(engine),
                view: WaveformView::new(config.layout, config.waveform),
            },
            scheduler,
            subscription: Some(subscription),
            envelopes: EnvelopeCache::new(),
            torn_down: false,
        }
    }

    pub fn controller(&self) -> &PlaybackController<E> {
        &self.core.controller
    }

    pub fn view(&self) -> &WaveformView {
        &self.core.view
    }

    pub fn add_observer(&mut self, observer: Box<dyn PlaybackObserver>) {
        self.core.controller.add_observer(observer);
    }

    /// Start loading `uri`. Resolve the returned future and pass it to `finish_load`.
    pub fn load(&mut self, uri: &str) -> PendingLoad {
        let pending = self.core.controller.load(uri);
        self.core.view.clear_envelope();
        self.sync();
        pending
    }

    pub fn finish_load(&mut self, completion: LoadCompletion) -> bool {
        if self.torn_down {
            log::debug!("Ignoring load of {} after teardown", completion.uri);
            return false;
        }
        let applied = self.core.controller.finish_load(completion);
        if applied {
            self.install_envelope();
        }
        self.sync();
        applied
    }

    pub fn play(&mut self) {
        self.core.controller.play();
        self.after_start();
    }

    pub fn play_at(&mut self, fraction: f64) {
        self.core.controller.play_at(fraction);
        self.after_start();
    }

    pub fn stop(&mut self) {
        self.core.controller.stop();
        self.sync();
    }

    /// Play/stop button behaviour.
    pub fn toggle(&mut self) {
        self.core.controller.toggle();
        self.after_start();
    }

    /// Route a click in player coordinates.
    pub fn click(&mut self, point: Point) {
        match self.core.view.hit(point) {
            Some(HitTarget::PlayButton) => self.toggle(),
            Some(HitTarget::Waveform { fraction }) => self.play_at(fraction),
            None => {}
        }
    }

    pub fn hover(&mut self, over_button: bool) {
        self.core.view.set_hovered(over_button);
        self.sync();
    }

    /// Advance one display frame.
    pub fn frame(&mut self, now: Instant) {
        self.scheduler.tick(&mut self.core, now);
        self.sync();
    }

    /// Whether the host should keep delivering frames.
    pub fn wants_frames(&self) -> bool {
        self.scheduler.is_active()
    }

    /// Change the player geometry, recomputing the envelope for the new size.
    pub fn set_layout(&mut self, layout: LayoutConfig, style: WaveformConfig) {
        self.core.view = WaveformView::new(layout, style);
        self.install_envelope();
        self.sync();
    }

    /// Stop playback, drop the resource and ignore any pending decode. Idempotent.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.core.controller.teardown();
        if let Some(id) = self.subscription.take() {
            self.scheduler.unsubscribe(id);
        }
        self.core.view.clear_envelope();
        self.core.view.hide_cursor();
        self.envelopes.clear();
        self.torn_down = true;
        self.sync();
        log::debug!("Player torn down");
    }

    fn install_envelope(&mut self) {
        let Some(buffer) = self.core.controller.buffer().cloned() else {
            return;
        };
        let (width, height) = self.core.view.envelope_size();
        if width == 0 || height == 0 {
            return;
        }
        let envelope = self.envelopes.get_or_compute(&buffer, width, height);
        self.core.view.set_envelope(envelope);
    }

    fn after_start(&mut self) {
        if let PlaybackState::Playing { start_fraction, .. } = self.core.controller.state() {
            if let Err(e) = self.core.view.show_cursor_at(start_fraction) {
                log::debug!("Cursor not placed: {}", e);
            }
        }
        self.sync();
    }

    fn sync(&mut self) {
        let playing = self.core.controller.is_playing();
        self.scheduler.set_enabled(playing && !self.torn_down);
        self.core.view.sync_transport(playing);
        self.core.view.refresh_cache();
    }
}

impl<E: AudioEngine + 'static> Drop for AudioPlayer<E> {
    fn drop(&mut self) {
        self.teardown();
    }
}
