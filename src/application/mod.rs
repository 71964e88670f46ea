//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（SynthesisEngine、RequestCache、AudioStorage、AudioOutput）
//! - pipeline: 请求构建编排（缓存 + 远程合成）
//! - output: 播放与保存
//! - diagnostics: 引擎元数据导出
//! - client: 调用方门面
//! - error: 应用层错误定义

pub mod client;
pub mod diagnostics;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod ports;

pub use client::{VoiceClient, VoiceClientConfig};
pub use diagnostics::{Diagnostics, DiagnosticsReport};
pub use error::{ApplicationError, RequestFailure};
pub use output::OutputSink;
pub use pipeline::{apply_overrides, BuildPipeline, BuildPipelineConfig, BuildSummary};

pub use ports::{
    // Audio output
    AudioOutputPort,
    PlaybackError,
    // Audio storage
    AudioStorageError,
    AudioStoragePort,
    // Request cache
    BuildFuture,
    CacheOutcome,
    CacheStats,
    RequestCachePort,
    // Synthesis engine
    AudioQuery,
    EngineError,
    Speaker,
    SpeakerStyle,
    SupportedDevices,
    SynthesisEnginePort,
};
