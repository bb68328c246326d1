//! Audio ingestion with an ordered fallback chain
//!
//! Codec support in the wild is inconsistent: an MP3 that one decoder
//! rejects may decode fine elsewhere. Ingestion therefore tries several
//! independent strategies in priority order and only fails once every one
//! of them has failed, reporting what each strategy said:
//!
//! 1. symphonia — general multimedia container decoder
//! 2. hound — dedicated WAV reader
//! 3. rodio — generic audio loader
//! 4. ffmpeg transcode to an intermediate WAV, then strategy 2 on it
//!
//! The intermediate file in strategy 4 is a scoped resource, removed on
//! every exit path.

use crate::audio::AudioBuffer;
use crate::error::{DecodeAttempt, Result, UnmixError};
use crate::ffmpeg::{FfmpegTool, ScopedTempFile};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, trace};

/// Maximum file size we'll attempt to decode (2GB).
/// Prevents OOM on extremely large files.
const MAX_FILE_SIZE: u64 = 2 * 1024 * 1024 * 1024;

type StrategyResult = std::result::Result<AudioBuffer, String>;

/// Decode an audio file into a `[channels, samples]` buffer.
///
/// Mono input is promoted to a single-channel row, not squeezed away.
pub fn decode(path: &Path) -> Result<AudioBuffer> {
    if !path.exists() {
        return Err(UnmixError::InputNotFound(path.to_path_buf()));
    }

    let metadata = std::fs::metadata(path)?;
    if metadata.len() > MAX_FILE_SIZE {
        return Err(UnmixError::Decode {
            path: path.to_path_buf(),
            attempts: vec![DecodeAttempt {
                strategy: "size check",
                reason: format!(
                    "file too large ({:.1} GB), maximum supported size is 2 GB",
                    metadata.len() as f64 / (1024.0 * 1024.0 * 1024.0)
                ),
            }],
        });
    }

    // Ordered strategy chain; adding or removing a strategy is localized
    // to this list.
    let strategies: [(&'static str, fn(&Path) -> StrategyResult); 4] = [
        ("symphonia", decode_symphonia),
        ("wav", decode_wav),
        ("rodio", decode_rodio),
        ("ffmpeg+wav", decode_via_ffmpeg),
    ];

    let mut attempts = Vec::new();
    for (name, strategy) in strategies {
        match strategy(path) {
            Ok(buffer) => {
                debug!(
                    "Decoded {} via {}: {} channels, {} samples @ {}Hz",
                    path.display(),
                    name,
                    buffer.num_channels(),
                    buffer.num_samples(),
                    buffer.sample_rate()
                );
                if buffer.is_empty() {
                    attempts.push(DecodeAttempt {
                        strategy: name,
                        reason: "produced an empty buffer".to_string(),
                    });
                    continue;
                }
                return Ok(buffer);
            }
            Err(reason) => {
                trace!("Strategy {} failed for {}: {}", name, path.display(), reason);
                attempts.push(DecodeAttempt {
                    strategy: name,
                    reason,
                });
            }
        }
    }

    Err(UnmixError::Decode {
        path: path.to_path_buf(),
        attempts,
    })
}

/// Strategy 1: symphonia probe + decode, preserving all channels.
fn decode_symphonia(path: &Path) -> StrategyResult {
    let file = std::fs::File::open(path).map_err(|e| format!("failed to open file: {}", e))?;
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
        .map_err(|e| format!("failed to probe format: {}", e))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or_else(|| "no audio tracks found".to_string())?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let sample_rate = codec_params.sample_rate.unwrap_or(44100);
    let channels = codec_params.channels.map(|c| c.count()).unwrap_or(2);

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| format!("failed to create decoder: {}", e))?;

    let mut interleaved: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break; // End of stream
            }
            Err(e) => return Err(format!("failed to read packet: {}", e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(symphonia::core::errors::Error::DecodeError(e)) => {
                // Skip corrupted frames
                trace!("Skipping corrupted frame: {}", e);
                continue;
            }
            Err(e) => return Err(format!("decode error: {}", e)),
        };

        let spec = *decoded.spec();
        let num_frames = decoded.frames();

        let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        interleaved.extend(sample_buf.samples());
    }

    if interleaved.is_empty() {
        return Err("no audio frames decoded".to_string());
    }

    Ok(AudioBuffer::from_interleaved(
        &interleaved,
        channels,
        sample_rate,
    ))
}

/// Strategy 2: hound WAV reader.
fn decode_wav(path: &Path) -> StrategyResult {
    let mut reader =
        hound::WavReader::open(path).map_err(|e| format!("not a readable WAV file: {}", e))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| format!("failed to read float samples: {}", e))?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| format!("failed to read integer samples: {}", e))?
        }
    };

    if interleaved.is_empty() {
        return Err("WAV file contains no samples".to_string());
    }

    Ok(AudioBuffer::from_interleaved(
        &interleaved,
        channels,
        spec.sample_rate,
    ))
}

/// Strategy 3: rodio's generic decoder.
fn decode_rodio(path: &Path) -> StrategyResult {
    use rodio::Source;

    let file = std::fs::File::open(path).map_err(|e| format!("failed to open file: {}", e))?;
    let decoder = rodio::Decoder::new(std::io::BufReader::new(file))
        .map_err(|e| format!("rodio could not decode: {}", e))?;

    let channels = decoder.channels() as usize;
    let sample_rate = decoder.sample_rate();
    let interleaved: Vec<f32> = decoder.convert_samples().collect();

    if interleaved.is_empty() {
        return Err("rodio produced no samples".to_string());
    }

    Ok(AudioBuffer::from_interleaved(
        &interleaved,
        channels,
        sample_rate,
    ))
}

/// Strategy 4: last resort for compressed formats. Transcode to an
/// intermediate lossless WAV via ffmpeg, then read it with strategy 2.
/// The intermediate file is deleted regardless of success or failure.
fn decode_via_ffmpeg(path: &Path) -> StrategyResult {
    let ffmpeg = FfmpegTool::locate().map_err(|e| e.to_string())?;

    let temp = ScopedTempFile::for_input(path);
    ffmpeg.transcode_to_wav(path, temp.path())?;

    decode_wav(temp.path())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_test_wav(path: &Path, channels: u16, num_samples: usize, amplitude: f32) {
        use std::f32::consts::PI;
        let spec = hound::WavSpec {
            channels,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..num_samples {
            let t = i as f32 / 44100.0;
            let s = (2.0 * PI * 440.0 * t).sin() * amplitude;
            for _ in 0..channels {
                writer.write_sample((s * 32767.0) as i16).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_decode_stereo_wav_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_test_wav(&path, 2, 88200, 0.5);

        let buffer = decode(&path).unwrap();
        assert_eq!(buffer.num_channels(), 2);
        assert_eq!(buffer.num_samples(), 88200);
        assert_eq!(buffer.sample_rate(), 44100);
    }

    #[test]
    fn test_decode_mono_stays_single_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        write_test_wav(&path, 1, 4410, 0.3);

        let buffer = decode(&path).unwrap();
        assert_eq!(buffer.num_channels(), 1);
        assert_eq!(buffer.num_samples(), 4410);
    }

    #[test]
    fn test_decode_missing_file_is_input_not_found() {
        let err = decode(Path::new("/no/such/file.wav")).unwrap_err();
        assert!(matches!(err, UnmixError::InputNotFound(_)));
    }

    #[test]
    fn test_decode_garbage_exhausts_all_strategies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.xyz");
        std::fs::write(&path, b"definitely not audio data").unwrap();

        let err = decode(&path).unwrap_err();
        match err {
            UnmixError::Decode { attempts, .. } => {
                assert_eq!(attempts.len(), 4, "every strategy should be recorded");
                assert_eq!(attempts[0].strategy, "symphonia");
                assert_eq!(attempts[3].strategy, "ffmpeg+wav");
            }
            other => panic!("expected Decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_wav_strategy_reads_24_bit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 48000,
            bits_per_sample: 24,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        writer.write_sample(4_194_304i32).unwrap(); // 0.5 at 24-bit
        writer.write_sample(0i32).unwrap();
        writer.finalize().unwrap();

        let buffer = decode_wav(&path).unwrap();
        assert!((buffer.channel(0)[0] - 0.5).abs() < 1e-4);
    }
}
