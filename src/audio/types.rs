use std::sync::Arc;

/// Decoded audio held entirely in memory. Never mutated after decode.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleBuffer {
    /// Interleaved samples normalized to [-1.0, 1.0].
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
    /// Duration in seconds.
    pub duration: f64,
}

impl SampleBuffer {
    /// Build a buffer from interleaved samples, deriving the duration.
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        let channels = channels.max(1);
        let num_frames = samples.len() / channels as usize;
        let duration = if sample_rate == 0 {
            0.0
        } else {
            num_frames as f64 / sample_rate as f64
        };
        Self {
            samples,
            sample_rate,
            channels,
            duration,
        }
    }

    /// Total number of frames (samples per channel).
    pub fn num_frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    /// De-interleave a single channel. Out-of-range indices yield an empty vec.
    pub fn channel(&self, index: u16) -> Vec<f32> {
        if index >= self.channels {
            return Vec::new();
        }
        self.samples
            .chunks_exact(self.channels as usize)
            .map(|frame| frame[index as usize])
            .collect()
    }

    /// Mix down to mono, returning one sample per frame.
    pub fn to_mono(&self) -> Vec<f32> {
        let ch = self.channels as usize;
        if ch <= 1 {
            return self.samples.clone();
        }
        self.samples
            .chunks_exact(ch)
            .map(|frame| frame.iter().sum::<f32>() / ch as f32)
            .collect()
    }
}

/// Commands sent from the UI thread to the audio thread.
#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// Start playing `buffer` from the given frame, replacing any current playback.
    Play {
        buffer: Arc<SampleBuffer>,
        from_frame: usize,
    },
    Stop,
}

/// Events sent from the audio thread to the UI thread.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    PlaybackFinished,
    StreamError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_from_frames() {
        let buffer = SampleBuffer::new(vec![0.0; 88_200], 44_100, 2);
        assert_eq!(buffer.num_frames(), 44_100);
        assert!((buffer.duration - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_channel_deinterleave() {
        let buffer = SampleBuffer::new(vec![0.1, -0.1, 0.2, -0.2, 0.3, -0.3], 3, 2);
        assert_eq!(buffer.channel(0), vec![0.1, 0.2, 0.3]);
        assert_eq!(buffer.channel(1), vec![-0.1, -0.2, -0.3]);
        assert!(buffer.channel(2).is_empty());
    }

    #[test]
    fn test_to_mono_averages_frames() {
        let buffer = SampleBuffer::new(vec![1.0, 0.0, 0.5, 0.5], 2, 2);
        assert_eq!(buffer.to_mono(), vec![0.5, 0.5]);
    }

    #[test]
    fn test_zero_sample_rate_has_no_duration() {
        let buffer = SampleBuffer::new(vec![0.5; 10], 0, 1);
        assert_eq!(buffer.duration, 0.0);
    }
}
