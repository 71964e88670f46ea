//! Synthesis Engine Port - 远程语音合成引擎抽象
//!
//! 定义合成引擎的抽象接口，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{OverrideField, SpeakerId};

/// 引擎错误
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Engine reported no core version")]
    NoCoreVersion,
}

/// 合成查询（AudioQuery）
///
/// 由引擎根据 text + speaker + core_version 生成，可编辑的韵律字段在合成前被覆盖。
/// 未列出的字段原样保留，往返时不丢失。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioQuery {
    /// 重音短语（不透明，原样回传）
    #[serde(rename = "accent_phrases", default)]
    pub accent_phrases: serde_json::Value,
    pub speed_scale: f64,
    pub pitch_scale: f64,
    pub intonation_scale: f64,
    pub volume_scale: f64,
    pub pre_phoneme_length: f64,
    pub post_phoneme_length: f64,
    pub output_sampling_rate: u32,
    #[serde(default)]
    pub output_stereo: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kana: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for AudioQuery {
    /// 引擎默认值
    fn default() -> Self {
        Self {
            accent_phrases: serde_json::Value::Array(Vec::new()),
            speed_scale: 1.0,
            pitch_scale: 0.0,
            intonation_scale: 1.0,
            volume_scale: 1.0,
            pre_phoneme_length: 0.1,
            post_phoneme_length: 0.1,
            output_sampling_rate: 24000,
            output_stereo: false,
            kana: None,
            extra: serde_json::Map::new(),
        }
    }
}

impl AudioQuery {
    /// 覆盖单个字段
    pub fn set(&mut self, field: OverrideField, value: f64) {
        match field {
            OverrideField::Speed => self.speed_scale = value,
            OverrideField::Pitch => self.pitch_scale = value,
            OverrideField::Intonation => self.intonation_scale = value,
            OverrideField::Volume => self.volume_scale = value,
            OverrideField::LeadingSilence => self.pre_phoneme_length = value,
            OverrideField::TrailingSilence => self.post_phoneme_length = value,
        }
    }

    pub fn get(&self, field: OverrideField) -> f64 {
        match field {
            OverrideField::Speed => self.speed_scale,
            OverrideField::Pitch => self.pitch_scale,
            OverrideField::Intonation => self.intonation_scale,
            OverrideField::Volume => self.volume_scale,
            OverrideField::LeadingSilence => self.pre_phoneme_length,
            OverrideField::TrailingSilence => self.post_phoneme_length,
        }
    }
}

/// 引擎支持的运行设备
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedDevices {
    pub cpu: bool,
    pub cuda: bool,
    pub dml: bool,
}

/// 说话人风格
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerStyle {
    pub name: String,
    pub id: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerSupportedFeatures {
    #[serde(default)]
    pub permitted_synthesis_morphing: String,
}

/// 说话人（含全部风格）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Speaker {
    pub name: String,
    pub speaker_uuid: String,
    pub styles: Vec<SpeakerStyle>,
    pub version: String,
    #[serde(default)]
    pub supported_features: SpeakerSupportedFeatures,
}

/// Synthesis Engine Port
///
/// 远程合成引擎的抽象接口
#[async_trait]
pub trait SynthesisEnginePort: Send + Sync {
    /// 获取引擎加载的 core 版本列表
    async fn core_versions(&self) -> Result<Vec<String>, EngineError>;

    /// 根据文本与说话人生成合成查询
    async fn audio_query(
        &self,
        text: &str,
        speaker_id: SpeakerId,
        core_version: &str,
    ) -> Result<AudioQuery, EngineError>;

    /// 使用合成查询生成音频（WAV 字节）
    async fn synthesis(
        &self,
        query: &AudioQuery,
        speaker_id: SpeakerId,
        core_version: &str,
    ) -> Result<Vec<u8>, EngineError>;

    /// 引擎版本
    async fn engine_version(&self) -> Result<String, EngineError>;

    /// 支持的运行设备
    async fn supported_devices(&self, core_version: &str) -> Result<SupportedDevices, EngineError>;

    /// 说话人目录
    async fn speakers(&self, core_version: &str) -> Result<Vec<Speaker>, EngineError>;

    /// 检查引擎是否可用
    async fn health_check(&self) -> bool {
        self.engine_version().await.is_ok()
    }
}
