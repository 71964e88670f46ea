//! Audio Output Port - 本地音频播放
//!
//! 同步阻塞接口：调用在播放结束后才返回

use thiserror::Error;

use crate::domain::SynthesizedAudio;

#[derive(Debug, Clone, Error)]
pub enum PlaybackError {
    #[error("Audio device error: {0}")]
    Device(String),

    #[error("Audio decode error: {0}")]
    Decode(String),
}

/// Audio Output Port
pub trait AudioOutputPort: Send + Sync {
    /// 解码并播放音频，阻塞直到播放完成
    fn play(&self, audio: &SynthesizedAudio) -> Result<(), PlaybackError>;
}
