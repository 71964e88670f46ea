//! Voice Context - VoiceRequest 聚合根

use super::errors::RequestError;
use super::value_objects::{Overrides, RequestKey, SpeakerId, SynthesizedAudio};

/// 单次语音合成请求
///
/// 不变量:
/// - text 非空且不超过长度上限（按字符计）
/// - 相等性只由 text + speaker_id + overrides 决定，与音频是否已合成无关
/// - audio 只会被写入一次
#[derive(Debug, Clone)]
pub struct VoiceRequest {
    text: String,
    speaker_id: SpeakerId,
    overrides: Overrides,
    audio: Option<SynthesizedAudio>,
}

impl VoiceRequest {
    /// 创建请求（校验文本长度与覆盖参数）
    pub fn new(
        text: impl Into<String>,
        speaker_id: SpeakerId,
        overrides: Overrides,
        max_text_length: usize,
    ) -> Result<Self, RequestError> {
        let text = text.into();
        if text.is_empty() {
            return Err(RequestError::EmptyText);
        }
        if text.chars().count() > max_text_length {
            return Err(RequestError::TooLong {
                text,
                max_length: max_text_length,
            });
        }
        if let Some((key, value)) = overrides.iter().find(|(_, v)| !v.is_finite()) {
            return Err(RequestError::InvalidOverride {
                key: key.to_string(),
                value,
            });
        }

        Ok(Self {
            text,
            speaker_id,
            overrides,
            audio: None,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn speaker_id(&self) -> SpeakerId {
        self.speaker_id
    }

    pub fn overrides(&self) -> &Overrides {
        &self.overrides
    }

    pub fn audio(&self) -> Option<&SynthesizedAudio> {
        self.audio.as_ref()
    }

    pub fn sample_rate(&self) -> Option<u32> {
        self.audio.as_ref().map(SynthesizedAudio::sample_rate)
    }

    pub fn is_built(&self) -> bool {
        self.audio.is_some()
    }

    /// 缓存键
    pub fn key(&self) -> RequestKey {
        RequestKey::new(&self.text, self.speaker_id, &self.overrides)
    }

    /// 保存文件名（不含扩展名）: `<text>_<speakerId>`
    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.text, self.speaker_id)
    }

    /// 写入合成结果；已有音频时保持不变并返回 false
    pub fn attach_audio(&mut self, audio: SynthesizedAudio) -> bool {
        if self.audio.is_some() {
            return false;
        }
        self.audio = Some(audio);
        true
    }
}

impl PartialEq for VoiceRequest {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
            && self.speaker_id == other.speaker_id
            && self.overrides == other.overrides
    }
}
