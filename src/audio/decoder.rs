use std::fs::File;
use std::path::{Path, PathBuf};

use symphonia::core::audio::SampleBuffer as SymphoniaBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::error::DecodeError;
use super::types::SampleBuffer;

/// Resolve a resource URI to a local path.
///
/// Accepts bare paths and `file://` URIs. Anything with another scheme is rejected.
pub fn resolve_uri(uri: &str) -> Result<PathBuf, DecodeError> {
    if let Some(rest) = uri.strip_prefix("file://") {
        return Ok(PathBuf::from(rest));
    }
    match uri.split_once("://") {
        Some((scheme, _)) => Err(DecodeError::UnsupportedScheme(scheme.to_string())),
        None => Ok(PathBuf::from(uri)),
    }
}

/// Decode the resource behind `uri` into a `SampleBuffer` with all samples in memory.
pub fn decode_uri(uri: &str) -> Result<SampleBuffer, DecodeError> {
    let path = resolve_uri(uri)?;
    decode_file(&path)
}

/// Decode an audio file into a `SampleBuffer`.
pub fn decode_file(path: &Path) -> Result<SampleBuffer, DecodeError> {
    let file = File::open(path).map_err(|e| DecodeError::Open(e.to_string()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| DecodeError::Probe(e.to_string()))?;

    let mut format = probed.format;

    let track = format.default_track().ok_or(DecodeError::NoTrack)?.clone();

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or(DecodeError::NoSampleRate)?;
    let channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(2);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| DecodeError::Codec(e.to_string()))?;

    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(DecodeError::Packet(e.to_string())),
        };

        if packet.track_id() != track.id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(e)) => {
                log::warn!("Skipping undecodable packet in {:?}: {}", path, e);
                continue;
            }
            Err(e) => return Err(DecodeError::Packet(e.to_string())),
        };

        let spec = *decoded.spec();
        let num_frames = decoded.capacity();

        let mut sample_buf = SymphoniaBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(sample_buf.samples());
    }

    let buffer = SampleBuffer::new(samples, sample_rate, channels);
    log::debug!(
        "Decoded {:?}: {} frames, {} Hz, {} ch, {:.2}s",
        path,
        buffer.num_frames(),
        sample_rate,
        channels,
        buffer.duration
    );
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_plain_path() {
        assert_eq!(
            resolve_uri("/tmp/kick.wav").unwrap(),
            PathBuf::from("/tmp/kick.wav")
        );
    }

    #[test]
    fn test_resolve_file_uri() {
        assert_eq!(
            resolve_uri("file:///tmp/kick.wav").unwrap(),
            PathBuf::from("/tmp/kick.wav")
        );
    }

    #[test]
    fn test_resolve_rejects_remote_schemes() {
        assert_eq!(
            resolve_uri("https://example.com/kick.wav"),
            Err(DecodeError::UnsupportedScheme("https".to_string()))
        );
    }

    #[test]
    fn test_decode_missing_file_reports_open_error() {
        let result = decode_uri("/nonexistent/path/sample.wav");
        assert!(matches!(result, Err(DecodeError::Open(_))));
    }
}
