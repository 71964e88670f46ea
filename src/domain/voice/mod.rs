//! Voice Context - 语音合成请求限界上下文
//!
//! 职责:
//! - VoiceRequest 的创建与校验
//! - 请求相等性与缓存键
//! - 合成参数覆盖

mod aggregate;
mod errors;
mod value_objects;

pub use aggregate::VoiceRequest;
pub use errors::RequestError;
pub use value_objects::{OverrideField, Overrides, RequestKey, SpeakerId, SynthesizedAudio};
