//! Rodio Audio Output - 默认输出设备播放

use super::pcm::decode_pcm;
use crate::application::ports::{AudioOutputPort, PlaybackError};
use crate::domain::SynthesizedAudio;

/// 通过 rodio 在默认输出设备上播放
///
/// 每次播放打开一次输出流，`play` 在播放结束后返回
#[derive(Debug, Default)]
pub struct RodioAudioOutput;

impl RodioAudioOutput {
    pub fn new() -> Self {
        Self
    }
}

impl AudioOutputPort for RodioAudioOutput {
    fn play(&self, audio: &SynthesizedAudio) -> Result<(), PlaybackError> {
        let pcm = decode_pcm(audio.data(), audio.sample_rate())?;

        let stream = rodio::OutputStreamBuilder::open_default_stream()
            .map_err(|e| PlaybackError::Device(format!("Failed to open output stream: {}", e)))?;
        let sink = rodio::Sink::connect_new(stream.mixer());

        let samples: Vec<f32> = pcm
            .samples
            .iter()
            .map(|&s| s as f32 / 32768.0)
            .collect();
        let source = rodio::buffer::SamplesBuffer::new(pcm.channels, pcm.sample_rate, samples);

        sink.append(source);
        sink.sleep_until_end();

        tracing::debug!(duration_ms = pcm.duration_ms(), "Playback finished");
        Ok(())
    }
}
