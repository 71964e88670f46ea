//! Voxcast - VOICEVOX 引擎客户端编排
//!
//! 架构设计: DDD + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Voice Context: 合成请求、参数覆盖、请求键
//!
//! 应用层 (application/):
//! - Ports: 端口定义（SynthesisEngine, RequestCache, AudioStorage, AudioOutput）
//! - Pipeline: 去重 + 并发构建
//! - Output: 播放与保存
//! - Diagnostics: 引擎元数据导出
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: HTTP 引擎客户端、文件存储、rodio 播放
//! - Memory: 请求缓存内存实现

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use application::{VoiceClient, VoiceClientConfig};
pub use config::{load_config, AppConfig};
