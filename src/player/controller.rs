//! Playback state machine.
//!
//! Position is never pushed from the audio thread. It is derived on demand
//! from the start fraction, the start time and the engine's transport clock,
//! so the cursor and the audio share one source of truth.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::audio::{AudioEngine, DecodeError, SampleBuffer};

use super::observer::PlaybackObserver;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackState {
    Idle,
    Playing {
        /// Transport time at which playback began, in seconds.
        start_wall_time: f64,
        /// Buffer fraction playback began from, in [0, 1].
        start_fraction: f64,
    },
}

#[derive(Debug, Clone)]
pub enum ResourceStatus {
    Loading,
    Ready(Arc<SampleBuffer>),
    Failed(DecodeError),
}

#[derive(Debug, Clone)]
pub struct AudioResource {
    pub uri: String,
    pub status: ResourceStatus,
}

/// Result of a decode started by [`PlaybackController::load`].
#[derive(Debug, Clone)]
pub struct LoadCompletion {
    pub seq: u64,
    pub uri: String,
    pub result: Result<Arc<SampleBuffer>, DecodeError>,
}

/// Decode in flight, resolved by the host and passed back to `finish_load`.
pub type PendingLoad = Pin<Box<dyn Future<Output = LoadCompletion> + Send>>;

pub struct PlaybackController<E: AudioEngine> {
    engine: E,
    state: PlaybackState,
    resource: Option<AudioResource>,
    load_seq: u64,
    observers: Vec<Box<dyn PlaybackObserver>>,
}

impl<E: AudioEngine> PlaybackController<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            state: PlaybackState::Idle,
            resource: None,
            load_seq: 0,
            observers: Vec::new(),
        }
    }

    pub fn add_observer(&mut self, observer: Box<dyn PlaybackObserver>) {
        self.observers.push(observer);
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, PlaybackState::Playing { .. })
    }

    pub fn resource(&self) -> Option<&AudioResource> {
        self.resource.as_ref()
    }

    pub fn buffer(&self) -> Option<&Arc<SampleBuffer>> {
        match &self.resource {
            Some(AudioResource {
                status: ResourceStatus::Ready(buffer),
                ..
            }) => Some(buffer),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.buffer().is_some()
    }

    /// Duration of the ready buffer in seconds, 0 otherwise.
    pub fn duration(&self) -> f64 {
        self.buffer().map(|b| b.duration).unwrap_or(0.0)
    }

    /// Replace the current resource and start decoding `uri`.
    ///
    /// The returned future must be resolved by the host and handed back to
    /// [`finish_load`](Self::finish_load). Only the most recent load is applied.
    pub fn load(&mut self, uri: &str) -> PendingLoad {
        self.stop();
        self.load_seq += 1;
        let seq = self.load_seq;
        self.resource = Some(AudioResource {
            uri: uri.to_string(),
            status: ResourceStatus::Loading,
        });
        log::info!("Loading {} (request {})", uri, seq);

        let decode = self.engine.decode(uri);
        let uri = uri.to_string();
        Box::pin(async move {
            let result = decode.await.map(Arc::new);
            LoadCompletion { seq, uri, result }
        })
    }

    /// Apply a finished decode. Returns false when the completion was superseded.
    pub fn finish_load(&mut self, completion: LoadCompletion) -> bool {
        if completion.seq != self.load_seq || self.resource.is_none() {
            log::debug!(
                "Discarding superseded load of {} (request {}, latest {})",
                completion.uri,
                completion.seq,
                self.load_seq
            );
            return false;
        }

        match completion.result {
            Ok(buffer) => {
                let duration = buffer.duration;
                log::info!("Loaded {} ({:.2}s)", completion.uri, duration);
                self.resource = Some(AudioResource {
                    uri: completion.uri,
                    status: ResourceStatus::Ready(buffer),
                });
                for observer in &mut self.observers {
                    observer.on_loaded(duration);
                }
            }
            Err(e) => {
                log::warn!("Failed to load {}: {}", completion.uri, e);
                for observer in &mut self.observers {
                    observer.on_load_failed(&e);
                }
                self.resource = Some(AudioResource {
                    uri: completion.uri,
                    status: ResourceStatus::Failed(e),
                });
            }
        }
        true
    }

    /// Play from the start of the buffer.
    pub fn play(&mut self) {
        self.start(0.0);
    }

    /// Play from `fraction` of the buffer's duration.
    pub fn play_at(&mut self, fraction: f64) {
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        self.start(fraction);
    }

    /// Stop when playing, otherwise play from the start.
    pub fn toggle(&mut self) {
        if self.is_playing() {
            self.stop();
        } else {
            self.play();
        }
    }

    pub fn stop(&mut self) {
        if !self.is_playing() {
            return;
        }
        self.engine.stop();
        self.state = PlaybackState::Idle;
        log::debug!("Playback stopped");
        for observer in &mut self.observers {
            observer.on_stopped();
        }
    }

    /// Current buffer fraction in [0, 1], or `None` when idle.
    ///
    /// Reaching the end of the buffer stops playback as a side effect and
    /// reports `None`.
    pub fn current_position(&mut self) -> Option<f64> {
        let PlaybackState::Playing {
            start_wall_time,
            start_fraction,
        } = self.state
        else {
            return None;
        };

        let duration = self.duration();
        let raw = if duration > 0.0 {
            start_fraction + (self.engine.now() - start_wall_time) / duration
        } else {
            f64::INFINITY
        };

        if raw > 1.0 || raw.is_nan() {
            log::debug!("End of buffer reached");
            self.stop();
            return None;
        }
        Some(raw.clamp(0.0, 1.0))
    }

    /// Position for display only: clamped, with no end-of-buffer side effect.
    pub fn peek_position(&self) -> Option<f64> {
        match self.state {
            PlaybackState::Playing {
                start_wall_time,
                start_fraction,
            } if self.duration() > 0.0 => Some(
                (start_fraction + (self.engine.now() - start_wall_time) / self.duration())
                    .clamp(0.0, 1.0),
            ),
            _ => None,
        }
    }

    /// Current position in seconds, 0 when idle.
    pub fn position_seconds(&mut self) -> f64 {
        self.current_position()
            .map(|p| p * self.duration())
            .unwrap_or(0.0)
    }

    /// Stop playback, forget the resource and ignore any pending decode.
    pub fn teardown(&mut self) {
        self.stop();
        self.load_seq += 1;
        self.resource = None;
    }

    fn start(&mut self, fraction: f64) {
        let Some(buffer) = self.buffer().cloned() else {
            log::debug!("Ignoring play request: no audio ready");
            return;
        };

        self.stop();
        self.engine.play(&buffer, fraction);
        self.state = PlaybackState::Playing {
            start_wall_time: self.engine.now(),
            start_fraction: fraction,
        };
        log::debug!("Playback started at {:.3}", fraction);
        for observer in &mut self.observers {
            observer.on_played(fraction);
        }
    }
}

impl<E: AudioEngine> Drop for PlaybackController<E> {
    fn drop(&mut self) {
        if self.is_playing() {
            self.engine.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::{constant_buffer, EngineCall, FakeEngine, FakeHandle};
    use crate::player::observer::{PlaybackEvent, RecordingObserver};

    async fn ready_controller(seconds: f64) -> (PlaybackController<FakeEngine>, FakeHandle, RecordingObserver) {
        let (engine, handle) = FakeEngine::new();
        handle.add_source("mem://clip", constant_buffer(seconds, 0.0));
        let mut controller = PlaybackController::new(engine);
        let recorder = RecordingObserver::default();
        controller.add_observer(Box::new(recorder.clone()));
        let completion = controller.load("mem://clip").await;
        assert!(controller.finish_load(completion));
        (controller, handle, recorder)
    }

    #[tokio::test]
    async fn test_load_reports_duration() {
        let (controller, _handle, recorder) = ready_controller(10.0).await;
        assert!(controller.is_ready());
        assert!((controller.duration() - 10.0).abs() < 1e-9);
        assert_eq!(recorder.events(), vec![PlaybackEvent::Loaded(10.0)]);
    }

    #[tokio::test]
    async fn test_play_at_then_query() {
        let (mut controller, handle, _) = ready_controller(10.0).await;
        handle.set_now(100.0);
        controller.play_at(0.5);
        assert_eq!(controller.current_position(), Some(0.5));

        handle.advance(2.0);
        let pos = controller.current_position().unwrap();
        assert!((pos - 0.7).abs() < 1e-9);
        assert!((controller.position_seconds() - 7.0).abs() < 1e-9);

        handle.advance(10.0);
        assert_eq!(controller.peek_position(), Some(1.0));
        assert!(controller.is_playing());
    }

    #[tokio::test]
    async fn test_play_starts_engine_from_zero() {
        let (mut controller, handle, recorder) = ready_controller(4.0).await;
        controller.play();
        assert_eq!(handle.calls(), vec![EngineCall::Play { fraction: 0.0 }]);
        assert_eq!(
            controller.state(),
            PlaybackState::Playing {
                start_wall_time: 0.0,
                start_fraction: 0.0
            }
        );
        assert_eq!(recorder.events().last(), Some(&PlaybackEvent::Played(0.0)));
    }

    #[tokio::test]
    async fn test_stop_fires_once() {
        let (mut controller, _handle, recorder) = ready_controller(4.0).await;
        controller.stop();
        assert_eq!(recorder.count(&PlaybackEvent::Stopped), 0);

        controller.play();
        controller.stop();
        controller.stop();
        assert_eq!(recorder.count(&PlaybackEvent::Stopped), 1);
        assert_eq!(controller.current_position(), None);
    }

    #[tokio::test]
    async fn test_replay_passes_through_stop() {
        let (mut controller, handle, recorder) = ready_controller(4.0).await;
        controller.play();
        controller.play_at(0.25);
        assert_eq!(
            handle.calls(),
            vec![
                EngineCall::Play { fraction: 0.0 },
                EngineCall::Stop,
                EngineCall::Play { fraction: 0.25 },
            ]
        );
        assert_eq!(recorder.count(&PlaybackEvent::Stopped), 1);
    }

    #[tokio::test]
    async fn test_end_of_buffer_stops() {
        let (mut controller, handle, recorder) = ready_controller(2.0).await;
        controller.play_at(0.9);
        handle.advance(0.5);
        assert_eq!(controller.current_position(), None);
        assert_eq!(controller.state(), PlaybackState::Idle);
        assert_eq!(controller.current_position(), None);
        assert_eq!(recorder.count(&PlaybackEvent::Stopped), 1);
        assert_eq!(handle.calls().last(), Some(&EngineCall::Stop));
    }

    #[tokio::test]
    async fn test_play_at_clamps_fraction() {
        let (mut controller, _handle, recorder) = ready_controller(2.0).await;
        controller.play_at(-3.0);
        assert_eq!(controller.current_position(), Some(0.0));
        controller.play_at(f64::NAN);
        assert_eq!(recorder.events().last(), Some(&PlaybackEvent::Played(0.0)));
    }

    #[tokio::test]
    async fn test_empty_buffer_stops_on_first_query() {
        let (mut controller, _handle, _) = ready_controller(0.0).await;
        controller.play();
        assert!(controller.is_playing());
        assert_eq!(controller.current_position(), None);
        assert!(!controller.is_playing());
    }

    #[test]
    fn test_play_before_ready_is_ignored() {
        let (engine, handle) = FakeEngine::new();
        let mut controller = PlaybackController::new(engine);
        controller.play();
        controller.play_at(0.5);
        controller.toggle();
        controller.stop();
        assert!(handle.calls().is_empty());
        assert_eq!(controller.state(), PlaybackState::Idle);
    }

    #[tokio::test]
    async fn test_play_while_loading_is_ignored() {
        let (engine, handle) = FakeEngine::new();
        handle.add_source("mem://a", constant_buffer(1.0, 0.0));
        let mut controller = PlaybackController::new(engine);
        let pending = controller.load("mem://a");
        controller.play();
        assert!(!controller.is_playing());
        assert!(matches!(
            controller.resource().map(|r| &r.status),
            Some(ResourceStatus::Loading)
        ));
        assert!(controller.finish_load(pending.await));
        controller.play();
        assert!(controller.is_playing());
    }

    #[tokio::test]
    async fn test_superseded_load_is_discarded() {
        let (engine, handle) = FakeEngine::new();
        handle.add_source("mem://a", constant_buffer(1.0, 0.0));
        handle.add_source("mem://b", constant_buffer(3.0, 0.0));
        let mut controller = PlaybackController::new(engine);
        let recorder = RecordingObserver::default();
        controller.add_observer(Box::new(recorder.clone()));

        let first = controller.load("mem://a");
        let second = controller.load("mem://b");
        let (first, second) = (first.await, second.await);

        assert!(controller.finish_load(second));
        assert!(!controller.finish_load(first));
        assert_eq!(controller.resource().unwrap().uri, "mem://b");
        assert!((controller.duration() - 3.0).abs() < 1e-9);
        assert_eq!(recorder.events(), vec![PlaybackEvent::Loaded(3.0)]);
    }

    #[tokio::test]
    async fn test_decode_failure_reported_once() {
        let (engine, handle) = FakeEngine::new();
        handle.add_broken_source("mem://bad", DecodeError::NoTrack);
        let mut controller = PlaybackController::new(engine);
        let recorder = RecordingObserver::default();
        controller.add_observer(Box::new(recorder.clone()));

        let completion = controller.load("mem://bad").await;
        assert!(controller.finish_load(completion));
        controller.play();

        assert!(!controller.is_ready());
        assert!(!controller.is_playing());
        assert_eq!(
            recorder.events(),
            vec![PlaybackEvent::LoadFailed(DecodeError::NoTrack)]
        );
        assert!(matches!(
            controller.resource().map(|r| &r.status),
            Some(ResourceStatus::Failed(DecodeError::NoTrack))
        ));
    }

    #[tokio::test]
    async fn test_loading_new_resource_stops_playback() {
        let (mut controller, handle, recorder) = ready_controller(5.0).await;
        handle.add_source("mem://next", constant_buffer(1.0, 0.0));
        controller.play();
        let pending = controller.load("mem://next");
        assert!(!controller.is_playing());
        assert!(!controller.is_ready());
        assert_eq!(recorder.count(&PlaybackEvent::Stopped), 1);
        assert!(controller.finish_load(pending.await));
    }

    #[tokio::test]
    async fn test_teardown_ignores_pending_load() {
        let (mut controller, handle, _) = ready_controller(5.0).await;
        handle.add_source("mem://late", constant_buffer(1.0, 0.0));
        controller.play();
        let pending = controller.load("mem://late");
        controller.teardown();
        assert!(!controller.finish_load(pending.await));
        assert!(controller.resource().is_none());
        assert_eq!(controller.state(), PlaybackState::Idle);
    }

    #[tokio::test]
    async fn test_drop_stops_engine() {
        let (mut controller, handle, _) = ready_controller(5.0).await;
        controller.play();
        drop(controller);
        assert_eq!(handle.calls().last(), Some(&EngineCall::Stop));
    }
}
