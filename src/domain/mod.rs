//! Domain Layer - 领域层
//!
//! Voice Context: 语音合成请求

pub mod voice;

pub use voice::{OverrideField, Overrides, RequestError, RequestKey, SpeakerId, SynthesizedAudio, VoiceRequest};
