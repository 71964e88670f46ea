//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio_output;
mod audio_storage;
mod request_cache;
mod synthesis_engine;

pub use audio_output::{AudioOutputPort, PlaybackError};
pub use audio_storage::{AudioStorageError, AudioStoragePort};
pub use request_cache::{BuildFuture, CacheOutcome, CacheStats, RequestCachePort};
pub use synthesis_engine::{
    AudioQuery, EngineError, Speaker, SpeakerStyle, SpeakerSupportedFeatures, SupportedDevices,
    SynthesisEnginePort,
};
