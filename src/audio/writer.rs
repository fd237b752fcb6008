//! WAV writer for generated waveforms.
//!
//! Applies the configured normalization strategy and writes the result to a
//! stereo float WAV container using the hound crate.

use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::error::{PipelineError, Result};
use crate::types::{AudioArtifact, Waveform};

use super::normalize::Normalization;

/// Number of channels in the output container (stereo).
pub const OUTPUT_CHANNELS: u16 = 2;

/// Writes a waveform to a WAV file, applying the given normalization.
///
/// Mono input is duplicated across both output channels. The file at `path`
/// is created or overwritten. Fails with ENCODING_FAILED if the waveform is
/// empty, has zero channels, or the path is unwritable.
pub fn write_waveform(
    waveform: &Waveform,
    path: &Path,
    strategy: Normalization,
) -> Result<AudioArtifact> {
    if waveform.is_empty() {
        return Err(PipelineError::encoding_failed("waveform is empty"));
    }
    if waveform.channels == 0 {
        return Err(PipelineError::encoding_failed("waveform has zero channels"));
    }

    let mut samples = waveform.samples.clone();
    strategy.apply(&mut samples);

    let spec = WavSpec {
        channels: OUTPUT_CHANNELS,
        sample_rate: waveform.sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec).map_err(|e| {
        PipelineError::encoding_failed(format!(
            "failed to create WAV file {}: {}",
            path.display(),
            e
        ))
    })?;

    write_frames(&mut writer, &samples, waveform.channels)?;

    writer
        .finalize()
        .map_err(|e| PipelineError::encoding_failed(format!("failed to finalize WAV file: {}", e)))?;

    Ok(AudioArtifact::music(
        path.to_path_buf(),
        waveform.sample_rate,
        waveform.duration_sec(),
    ))
}

/// Encodes a waveform to an in-memory WAV buffer.
///
/// Same normalization and channel handling as [`write_waveform`]; returns
/// the complete container bytes instead of touching the filesystem.
pub fn write_to_buffer(waveform: &Waveform, strategy: Normalization) -> Result<Vec<u8>> {
    if waveform.is_empty() {
        return Err(PipelineError::encoding_failed("waveform is empty"));
    }
    if waveform.channels == 0 {
        return Err(PipelineError::encoding_failed("waveform has zero channels"));
    }

    let mut samples = waveform.samples.clone();
    strategy.apply(&mut samples);

    let spec = WavSpec {
        channels: OUTPUT_CHANNELS,
        sample_rate: waveform.sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut buffer = Vec::new();
    {
        let cursor = std::io::Cursor::new(&mut buffer);
        let buf_writer = std::io::BufWriter::new(cursor);

        let mut writer = WavWriter::new(buf_writer, spec).map_err(|e| {
            PipelineError::encoding_failed(format!("failed to create WAV writer: {}", e))
        })?;

        write_frames(&mut writer, &samples, waveform.channels)?;

        writer.finalize().map_err(|e| {
            PipelineError::encoding_failed(format!("failed to finalize WAV buffer: {}", e))
        })?;
    }

    Ok(buffer)
}

/// Writes frames into the container, upmixing mono to stereo.
fn write_frames<W: std::io::Write + std::io::Seek>(
    writer: &mut WavWriter<W>,
    samples: &[f32],
    channels: u16,
) -> Result<()> {
    let write = |writer: &mut WavWriter<W>, s: f32| {
        writer
            .write_sample(s)
            .map_err(|e| PipelineError::encoding_failed(format!("failed to write sample: {}", e)))
    };

    match channels {
        1 => {
            for s in samples {
                write(writer, *s)?;
                write(writer, *s)?;
            }
        }
        2 => {
            for s in samples {
                write(writer, *s)?;
            }
        }
        n => {
            // Downmix anything wider by taking the first channel of each frame.
            for frame in samples.chunks(n as usize) {
                let s = frame[0];
                write(writer, s)?;
                write(writer, s)?;
            }
        }
    }

    Ok(())
}

/// Calculates the duration of audio in seconds from a frame count.
pub fn samples_to_duration(frame_count: usize, sample_rate: u32) -> f32 {
    frame_count as f32 / sample_rate as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use tempfile::tempdir;

    fn test_waveform() -> Waveform {
        Waveform::mono(vec![0.0f32, 0.5, -0.5, 0.0], 32000)
    }

    #[test]
    fn write_creates_valid_wav() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.wav");

        let artifact = write_waveform(&test_waveform(), &path, Normalization::None).unwrap();
        assert!(path.exists());
        assert_eq!(artifact.sample_rate, Some(32000));

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, OUTPUT_CHANNELS);
        assert_eq!(spec.sample_rate, 32000);
        assert_eq!(spec.sample_format, SampleFormat::Float);
    }

    #[test]
    fn readback_preserves_sample_rate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rate.wav");

        let wav = Waveform::mono(vec![0.25f32; 1600], 16000);
        write_waveform(&wav, &path, Normalization::None).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 16000);
    }

    #[test]
    fn empty_waveform_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.wav");

        let wav = Waveform::mono(vec![], 32000);
        let err = write_waveform(&wav, &path, Normalization::None).unwrap_err();
        assert_eq!(err.code, ErrorCode::EncodingFailed);
        assert!(!path.exists());
    }

    #[test]
    fn zero_channels_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nochan.wav");

        let wav = Waveform {
            samples: vec![0.1, 0.2],
            sample_rate: 32000,
            channels: 0,
        };
        let err = write_waveform(&wav, &path, Normalization::None).unwrap_err();
        assert_eq!(err.code, ErrorCode::EncodingFailed);
    }

    #[test]
    fn unwritable_path_rejected() {
        let wav = test_waveform();
        let err = write_waveform(
            &wav,
            Path::new("/nonexistent-dir/out.wav"),
            Normalization::None,
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::EncodingFailed);
    }

    #[test]
    fn buffer_output_is_riff() {
        let buffer = write_to_buffer(&test_waveform(), Normalization::Peak).unwrap();
        assert!(!buffer.is_empty());
        assert_eq!(&buffer[0..4], b"RIFF");
    }

    #[test]
    fn samples_to_duration_calculation() {
        assert_eq!(samples_to_duration(32000, 32000), 1.0);
        assert_eq!(samples_to_duration(64000, 32000), 2.0);
        assert_eq!(samples_to_duration(16000, 32000), 0.5);
    }
}
