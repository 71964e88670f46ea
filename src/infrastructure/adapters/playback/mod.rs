//! Playback Adapter - PCM 解码与本地播放

mod pcm;
#[cfg(feature = "playback")]
mod rodio_output;

pub use pcm::{decode_pcm, encode_wav_pcm16, is_wav, PcmBuffer};
#[cfg(feature = "playback")]
pub use rodio_output::RodioAudioOutput;
