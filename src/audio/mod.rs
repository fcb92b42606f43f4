//! Audio boundary: decoding, device playback and the transport clock.
//!
//! The player never talks to cpal or symphonia directly. It goes through
//! [`AudioEngine`], which the desktop host implements with [`CpalEngine`]
//! and tests implement with a manual clock.

pub mod decoder;
pub mod engine;
pub mod error;
pub mod types;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub use engine::CpalEngine;
pub use error::{DecodeError, EngineError};
pub use types::SampleBuffer;

/// Single-shot decode result handed back to the UI thread.
pub type DecodeFuture = Pin<Box<dyn Future<Output = Result<SampleBuffer, DecodeError>> + Send>>;

/// What the player needs from an audio backend.
pub trait AudioEngine {
    /// Start decoding `uri`. The future is driven by the host.
    fn decode(&self, uri: &str) -> DecodeFuture;

    /// Play `buffer` from `from_fraction` of its duration, replacing any current playback.
    fn play(&mut self, buffer: &Arc<SampleBuffer>, from_fraction: f64);

    /// Stop output. Harmless when nothing is playing.
    fn stop(&mut self);

    /// Transport clock in seconds, same units as `SampleBuffer::duration`.
    fn now(&self) -> f64;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Manual-clock engine for exercising the player without a device.

    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::rc::Rc;
    use std::sync::Arc;

    use super::{AudioEngine, DecodeError, DecodeFuture, SampleBuffer};

    #[derive(Debug, Clone, PartialEq)]
    pub enum EngineCall {
        Play { fraction: f64 },
        Stop,
    }

    #[derive(Default)]
    struct Shared {
        clock: Cell<f64>,
        calls: RefCell<Vec<EngineCall>>,
        sources: RefCell<HashMap<String, Result<SampleBuffer, DecodeError>>>,
    }

    /// Test-side handle sharing state with a [`FakeEngine`].
    #[derive(Clone)]
    pub struct FakeHandle(Rc<Shared>);

    impl FakeHandle {
        pub fn set_now(&self, seconds: f64) {
            self.0.clock.set(seconds);
        }

        pub fn advance(&self, seconds: f64) {
            self.0.clock.set(self.0.clock.get() + seconds);
        }

        pub fn calls(&self) -> Vec<EngineCall> {
            self.0.calls.borrow().clone()
        }

        pub fn add_source(&self, uri: &str, buffer: SampleBuffer) {
            self.0.sources.borrow_mut().insert(uri.to_string(), Ok(buffer));
        }

        pub fn add_broken_source(&self, uri: &str, error: DecodeError) {
            self.0.sources.borrow_mut().insert(uri.to_string(), Err(error));
        }
    }

    pub struct FakeEngine(Rc<Shared>);

    impl FakeEngine {
        pub fn new() -> (Self, FakeHandle) {
            let shared = Rc::new(Shared::default());
            (FakeEngine(shared.clone()), FakeHandle(shared))
        }
    }

    impl AudioEngine for FakeEngine {
        fn decode(&self, uri: &str) -> DecodeFuture {
            let result = self
                .0
                .sources
                .borrow()
                .get(uri)
                .cloned()
                .unwrap_or_else(|| Err(DecodeError::Open(format!("no such source: {uri}"))));
            Box::pin(std::future::ready(result))
        }

        fn play(&mut self, _buffer: &Arc<SampleBuffer>, from_fraction: f64) {
            self.0.calls.borrow_mut().push(EngineCall::Play {
                fraction: from_fraction,
            });
        }

        fn stop(&mut self) {
            self.0.calls.borrow_mut().push(EngineCall::Stop);
        }

        fn now(&self) -> f64 {
            self.0.clock.get()
        }
    }

    /// Mono buffer of `seconds` length at 1 kHz filled with `value`.
    pub fn constant_buffer(seconds: f64, value: f32) -> SampleBuffer {
        let frames = (seconds * 1000.0).round() as usize;
        SampleBuffer::new(vec![value; frames], 1000, 1)
    }
}
