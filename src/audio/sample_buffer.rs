use std::io::Cursor;
use std::path::Path;

use anyhow::Context;

use super::frame::StereoFrame;

// Decoded audio at its own native rate. Voices resample on the fly, so the
// same buffer can feed the live device and the 22.05kHz offline render.
#[derive(Clone, Debug)]
pub struct SampleBuffer {
    pub data: Vec<StereoFrame>, // the audio data array
    pub sample_rate: u32,
}

impl SampleBuffer {
    // Decode WAV bytes (fetched by the loader) into a buffer
    pub fn decode_wav(bytes: &[u8]) -> anyhow::Result<Self> {
        let mut reader = hound::WavReader::new(Cursor::new(bytes)).context("not a wav file")?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader // float, just pass it through
                .samples::<f32>()
                .collect::<Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => { // int, convert to float
                let max = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|x| x as f32 / max))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        let data: Vec<StereoFrame> = if channels == 1 {
            samples.into_iter().map(StereoFrame::mono).collect() // mono, duplicate
        } else {
            samples
                .chunks_exact(channels)
                .map(|c| StereoFrame {
                    left: c[0],
                    right: c[1],
                })
                .collect()
        };

        if spec.sample_rate == 0 {
            anyhow::bail!("wav file reports a zero sample rate");
        }

        Ok(Self {
            data,
            sample_rate: spec.sample_rate,
        })
    }

    // Zero-filled buffer; used as the gap filler between clips
    pub fn silent(seconds: f64, sample_rate: u32) -> Self {
        let len = (seconds.max(0.0) * sample_rate as f64).round() as usize;
        Self {
            data: vec![StereoFrame::zero(); len],
            sample_rate,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.data.len() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // 16-bit stereo PCM, the export format
    pub fn write_wav(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec)
            .with_context(|| format!("failed to create wav file: {}", path.display()))?;
        for f in &self.data {
            writer.write_sample(quantize(f.left))?;
            writer.write_sample(quantize(f.right))?;
        }
        writer.finalize().context("failed to finalize wav file")?;
        Ok(())
    }
}

fn quantize(x: f32) -> i16 {
    (x.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_fixture::wav_bytes;

    #[test]
    fn decodes_mono_wav_and_reports_duration() {
        let bytes = wav_bytes(8000, 1, 16000);
        let buf = SampleBuffer::decode_wav(&bytes).unwrap();
        assert_eq!(buf.sample_rate, 8000);
        assert_eq!(buf.data.len(), 16000);
        assert!((buf.duration_secs() - 2.0).abs() < 1e-9);
        assert_eq!(buf.data[10].left, buf.data[10].right);
    }

    #[test]
    fn rejects_garbage() {
        assert!(SampleBuffer::decode_wav(b"definitely not audio").is_err());
    }

    #[test]
    fn silent_buffer_has_requested_length() {
        let buf = SampleBuffer::silent(1.5, 22050);
        assert_eq!(buf.data.len(), 33075);
        assert!(buf.data.iter().all(|f| *f == StereoFrame::zero()));
    }
}
