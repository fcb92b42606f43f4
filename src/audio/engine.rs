use std::sync::Arc;
use std::time::Instant;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};

use super::decoder;
use super::error::{DecodeError, EngineError};
use super::types::{EngineCommand, EngineEvent, SampleBuffer};
use super::{AudioEngine, DecodeFuture};

/// Audio-thread playback state. Only touched from the cpal callback.
struct EngineState {
    audio: Option<Arc<SampleBuffer>>,
    /// Current read position in source frames. Fractional when rates differ.
    position: f64,
    playing: bool,
    output_sample_rate: u32,
}

impl EngineState {
    fn new(output_sample_rate: u32) -> Self {
        Self {
            audio: None,
            position: 0.0,
            playing: false,
            output_sample_rate,
        }
    }

    fn handle_command(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::Play { buffer, from_frame } => {
                self.position = from_frame.min(buffer.num_frames()) as f64;
                self.audio = Some(buffer);
                self.playing = true;
            }
            EngineCommand::Stop => {
                self.playing = false;
                self.position = 0.0;
            }
        }
    }

    /// Fill the output buffer with the current source, converting channels and rate.
    fn fill_buffer(&mut self, output: &mut [f32], channels: u16, event_tx: &Sender<EngineEvent>) {
        if !self.playing {
            output.fill(0.0);
            return;
        }

        let audio = match &self.audio {
            Some(a) => a.clone(),
            None => {
                output.fill(0.0);
                return;
            }
        };

        let audio_channels = audio.channels.max(1) as usize;
        let out_channels = channels.max(1) as usize;
        let total_frames = audio.num_frames();
        let step = audio.sample_rate as f64 / self.output_sample_rate.max(1) as f64;

        let out_frames = output.len() / out_channels;

        for f in 0..out_frames {
            let src_frame = self.position as usize;
            if src_frame >= total_frames {
                // Playback finished
                self.playing = false;
                let _ = event_tx.try_send(EngineEvent::PlaybackFinished);
                output[f * out_channels..].fill(0.0);
                return;
            }
            for c in 0..out_channels {
                let src_c = c % audio_channels;
                output[f * out_channels + c] = audio.samples[src_frame * audio_channels + src_c];
            }
            self.position += step;
        }
    }
}

/// cpal-backed engine. Cloning shares the same output stream.
#[derive(Clone, Debug)]
pub struct CpalEngine {
    cmd_tx: Sender<EngineCommand>,
    event_rx: Receiver<EngineEvent>,
    origin: Instant,
}

impl CpalEngine {
    /// Open the default output device and start a silent stream.
    pub fn spawn() -> Result<Self, EngineError> {
        let (cmd_tx, cmd_rx) = crossbeam_channel::bounded::<EngineCommand>(64);
        let (event_tx, event_rx) = crossbeam_channel::bounded::<EngineEvent>(256);

        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(EngineError::NoDevice)?;

        let config = device
            .default_output_config()
            .map_err(|e| EngineError::Config(e.to_string()))?;

        let sample_rate = config.sample_rate();
        let channels = config.channels();
        let sample_format = config.sample_format();

        let mut state = EngineState::new(sample_rate);
        let event_tx_clone = event_tx.clone();

        let stream = match sample_format {
            cpal::SampleFormat::F32 => device
                .build_output_stream(
                    &config.into(),
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        while let Ok(cmd) = cmd_rx.try_recv() {
                            state.handle_command(cmd);
                        }
                        state.fill_buffer(data, channels, &event_tx_clone);
                    },
                    move |err| {
                        let _ = event_tx.try_send(EngineEvent::StreamError(err.to_string()));
                    },
                    None,
                )
                .map_err(|e| EngineError::Stream(e.to_string()))?,
            _ => return Err(EngineError::UnsupportedFormat(format!("{sample_format:?}"))),
        };

        stream
            .play()
            .map_err(|e| EngineError::Stream(e.to_string()))?;

        // cpal streams are !Send on some hosts; park one on its own thread to keep it alive.
        std::thread::Builder::new()
            .name("audio-keepalive".into())
            .spawn(move || {
                let _stream = stream;
                loop {
                    std::thread::park();
                }
            })
            .map_err(|e| EngineError::Thread(e.to_string()))?;

        log::info!(
            "Audio engine started: {} Hz, {} channels",
            sample_rate,
            channels
        );

        Ok(Self {
            cmd_tx,
            event_rx,
            origin: Instant::now(),
        })
    }

    /// Drain events reported by the audio thread since the last call.
    pub fn drain_events(&self) -> Vec<EngineEvent> {
        self.event_rx.try_iter().collect()
    }

    fn send(&self, cmd: EngineCommand) {
        if let Err(e) = self.cmd_tx.try_send(cmd) {
            log::warn!("Audio engine command dropped: {}", e);
        }
    }
}

impl AudioEngine for CpalEngine {
    fn decode(&self, uri: &str) -> DecodeFuture {
        let uri = uri.to_string();
        Box::pin(async move {
            match tokio::task::spawn_blocking(move || decoder::decode_uri(&uri)).await {
                Ok(result) => result,
                Err(e) => Err(DecodeError::Cancelled(e.to_string())),
            }
        })
    }

    fn play(&mut self, buffer: &Arc<SampleBuffer>, from_fraction: f64) {
        let from_frame = (from_fraction.clamp(0.0, 1.0) * buffer.num_frames() as f64) as usize;
        self.send(EngineCommand::Play {
            buffer: buffer.clone(),
            from_frame,
        });
    }

    fn stop(&mut self) {
        self.send(EngineCommand::Stop);
    }

    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}
