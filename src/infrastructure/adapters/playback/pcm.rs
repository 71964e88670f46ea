//! PCM 解码 - 基于 symphonia
//!
//! 引擎返回 WAV 容器时按容器解码，否则把字节按 16-bit 小端 PCM（单声道）处理

use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::application::ports::PlaybackError;

/// 交错排列的 16-bit PCM
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmBuffer {
    pub samples: Vec<i16>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl PcmBuffer {
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0;
        }
        (self.samples.len() as u64 * 1000) / (self.sample_rate as u64 * self.channels as u64)
    }
}

/// 是否为 RIFF/WAVE 容器
pub fn is_wav(data: &[u8]) -> bool {
    data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WAVE"
}

/// 把音频字节解码为交错 PCM，播放采样率使用 `sample_rate`
pub fn decode_pcm(data: &[u8], sample_rate: u32) -> Result<PcmBuffer, PlaybackError> {
    if is_wav(data) {
        let (samples, channels) = decode_wav(data)?;
        return Ok(PcmBuffer {
            samples,
            channels,
            sample_rate,
        });
    }

    // 末尾不足 2 字节的部分丢弃
    let samples = data
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    Ok(PcmBuffer {
        samples,
        channels: 1,
        sample_rate,
    })
}

/// 使用 symphonia 解码 WAV，返回样本与声道数
fn decode_wav(data: &[u8]) -> Result<(Vec<i16>, u16), PlaybackError> {
    let cursor = Cursor::new(data.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let mut hint = Hint::new();
    hint.with_extension("wav");

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| PlaybackError::Decode(format!("Probe failed: {}", e)))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| PlaybackError::Decode("No audio track".to_string()))?;

    let channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .ok_or_else(|| PlaybackError::Decode("Unknown channel count".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| PlaybackError::Decode(format!("Decoder creation failed: {}", e)))?;

    let track_id = track.id;
    let mut samples: Vec<i16> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                return Err(PlaybackError::Decode(format!("Packet read error: {}", e)));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!("Decode error (skipping packet): {}", e);
                continue;
            }
        };

        let spec = *decoded.spec();
        let num_frames = decoded.frames();
        let mut sample_buf = SampleBuffer::<i16>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        let actual_samples = num_frames * spec.channels.count();
        samples.extend(&sample_buf.samples()[..actual_samples]);
    }

    Ok((samples, channels))
}

/// 将 16-bit PCM 编码为 WAV
pub fn encode_wav_pcm16(samples: &[i16], channels: u16, sample_rate: u32) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * channels as u32 * (bits_per_sample / 8) as u32;
    let block_align = channels * (bits_per_sample / 8);
    let data_size = samples.len() * 2;

    let mut wav = Vec::with_capacity(44 + data_size);

    // RIFF header
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&((36 + data_size) as u32).to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    // fmt chunk
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&channels.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data chunk
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&(data_size as u32).to_le_bytes());
    for sample in samples {
        wav.extend_from_slice(&sample.to_le_bytes());
    }

    wav
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_raw_pcm() {
        let data = [0x01, 0x00, 0xff, 0xff, 0x00, 0x80, 0x7f];
        let pcm = decode_pcm(&data, 24000).unwrap();
        assert_eq!(pcm.samples, vec![1, -1, i16::MIN]);
        assert_eq!(pcm.channels, 1);
        assert_eq!(pcm.sample_rate, 24000);
    }

    #[test]
    fn test_decode_wav_container() {
        let samples: Vec<i16> = vec![0, 1000, -1000, i16::MAX, i16::MIN, 42];
        let wav = encode_wav_pcm16(&samples, 2, 24000);
        assert!(is_wav(&wav));

        let pcm = decode_pcm(&wav, 48000).unwrap();
        assert_eq!(pcm.samples, samples);
        assert_eq!(pcm.channels, 2);
        assert_eq!(pcm.sample_rate, 48000);
    }

    #[test]
    fn test_duration() {
        let pcm = PcmBuffer {
            samples: vec![0; 24000],
            channels: 1,
            sample_rate: 24000,
        };
        assert_eq!(pcm.duration_ms(), 1000);
    }
}
