use std::sync::Arc;

use crate::audio::types::SampleBuffer;

/// Visual headroom: peaks are clamped to this magnitude before scaling to pixels.
pub const HEADROOM: f32 = 0.45;

/// Horizontal offset applied to every column.
const COLUMN_OFFSET: f32 = 2.0;

/// One vertical stroke of the waveform: from `(x, y_top)` to `(x, y_bottom)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub x: f32,
    pub y_top: f32,
    pub y_bottom: f32,
}

impl Segment {
    /// Endpoints as `[x, y_top, x, y_bottom]`.
    pub fn points(&self) -> [f32; 4] {
        [self.x, self.y_top, self.x, self.y_bottom]
    }
}

/// Per-pixel-column peak summary of a buffer, one segment per column.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PeakEnvelope {
    pub segments: Vec<Segment>,
    pub width: u32,
    pub height: u32,
}

impl PeakEnvelope {
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Summarize the first channel of `buffer` into a `width`-column envelope.
pub fn summarize(buffer: &SampleBuffer, width: u32, height: u32) -> PeakEnvelope {
    summarize_samples(&buffer.channel(0), width, height)
}

/// Summarize raw samples into a `width`-column envelope `height` pixels tall.
///
/// Each column scans its (possibly fractional) window and keeps the largest
/// positive sample, which is mirrored around the vertical midline. The
/// window minimum is tracked alongside but does not shape the output.
pub fn summarize_samples(samples: &[f32], width: u32, height: u32) -> PeakEnvelope {
    if width == 0 || height == 0 {
        return PeakEnvelope {
            segments: Vec::new(),
            width,
            height,
        };
    }

    let samples_per_column = samples.len() as f64 / width as f64;
    let h = height as f32;
    let mid = h / 2.0;
    let clamp = |v: f32| v.clamp(-HEADROOM, HEADROOM);

    let segments = (0..width)
        .map(|x| {
            let mut low = 0.0f32;
            let mut high = 0.0f32;

            let start = x as f64 * samples_per_column;
            let mut n = 0.0;
            while n < samples_per_column {
                if let Some(&sample) = samples.get((start + n).floor() as usize) {
                    if sample < low {
                        low = sample;
                    }
                    if sample > high {
                        high = sample;
                    }
                }
                n += 1.0;
            }
            let _ = low;

            Segment {
                x: x as f32 + COLUMN_OFFSET,
                y_top: clamp(high) * h + mid,
                y_bottom: clamp(-high) * h + mid,
            }
        })
        .collect();

    PeakEnvelope {
        segments,
        width,
        height,
    }
}

/// Single-entry envelope cache keyed by buffer identity and target size.
#[derive(Default)]
pub struct EnvelopeCache {
    entry: Option<CacheEntry>,
}

struct CacheEntry {
    buffer: Arc<SampleBuffer>,
    width: u32,
    height: u32,
    envelope: Arc<PeakEnvelope>,
}

impl EnvelopeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached envelope, recomputing when buffer, width or height changed.
    pub fn get_or_compute(
        &mut self,
        buffer: &Arc<SampleBuffer>,
        width: u32,
        height: u32,
    ) -> Arc<PeakEnvelope> {
        if let Some(entry) = &self.entry {
            if Arc::ptr_eq(&entry.buffer, buffer) && entry.width == width && entry.height == height
            {
                return entry.envelope.clone();
            }
        }

        let envelope = Arc::new(summarize(buffer, width, height));
        log::debug!(
            "Computed peak envelope: {} columns x {} px from {} frames",
            width,
            height,
            buffer.num_frames()
        );
        self.entry = Some(CacheEntry {
            buffer: buffer.clone(),
            width,
            height,
            envelope: envelope.clone(),
        });
        envelope
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }
}
