//! Voice Context - Value Objects

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// 说话人（风格）标识，对应引擎端的 style id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpeakerId(u32);

impl SpeakerId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl From<u32> for SpeakerId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for SpeakerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 可覆盖的合成参数字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverrideField {
    /// 语速
    Speed,
    /// 音高
    Pitch,
    /// 抑扬
    Intonation,
    /// 音量
    Volume,
    /// 开头静音时长
    LeadingSilence,
    /// 结尾静音时长
    TrailingSilence,
}

impl OverrideField {
    pub const ALL: [OverrideField; 6] = [
        Self::Speed,
        Self::Pitch,
        Self::Intonation,
        Self::Volume,
        Self::LeadingSilence,
        Self::TrailingSilence,
    ];

    /// 解析覆盖键
    ///
    /// 接受短名（`speed`）、引擎字段名（`speed_scale`）和线上名（`speedScale`）
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "speed" | "speed_scale" | "speedScale" => Some(Self::Speed),
            "pitch" | "pitch_scale" | "pitchScale" => Some(Self::Pitch),
            "intonation" | "intonation_scale" | "intonationScale" => Some(Self::Intonation),
            "volume" | "volume_scale" | "volumeScale" => Some(Self::Volume),
            "leading_silence" | "pre_phoneme_length" | "prePhonemeLength" => {
                Some(Self::LeadingSilence)
            }
            "trailing_silence" | "post_phoneme_length" | "postPhonemeLength" => {
                Some(Self::TrailingSilence)
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Speed => "speed",
            Self::Pitch => "pitch",
            Self::Intonation => "intonation",
            Self::Volume => "volume",
            Self::LeadingSilence => "leading_silence",
            Self::TrailingSilence => "trailing_silence",
        }
    }
}

/// 合成参数覆盖表
///
/// 保留调用方传入的全部键（包括无法识别的键），键按字典序排列，
/// 因此两个内容相同的覆盖表无论插入顺序如何都相等。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides(BTreeMap<String, f64>);

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// 链式添加一个覆盖值
    pub fn with(mut self, key: impl Into<String>, value: f64) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) -> Option<f64> {
        self.0.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// 仅返回可识别的覆盖字段
    pub fn recognized(&self) -> impl Iterator<Item = (OverrideField, f64)> + '_ {
        self.iter()
            .filter_map(|(key, value)| OverrideField::parse(key).map(|field| (field, value)))
    }

    /// 无法识别的键
    pub fn unrecognized(&self) -> impl Iterator<Item = &str> {
        self.0
            .keys()
            .map(String::as_str)
            .filter(|key| OverrideField::parse(key).is_none())
    }

    /// 规范化编码，供 [`RequestKey`] 使用
    fn canonical(&self) -> Vec<(String, u64)> {
        self.0
            .iter()
            .map(|(key, value)| {
                // -0.0 与 0.0 相等，编码也必须一致
                let normalized = if *value == 0.0 { 0.0_f64 } else { *value };
                (key.clone(), normalized.to_bits())
            })
            .collect()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for Overrides {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// 请求缓存键
///
/// 由 text、speaker_id 与规范化后的覆盖表组成，与 [`VoiceRequest`] 的相等性一致
///
/// [`VoiceRequest`]: super::VoiceRequest
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    text: String,
    speaker_id: SpeakerId,
    overrides: Vec<(String, u64)>,
}

impl RequestKey {
    pub fn new(text: &str, speaker_id: SpeakerId, overrides: &Overrides) -> Self {
        Self {
            text: text.to_string(),
            speaker_id,
            overrides: overrides.canonical(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn speaker_id(&self) -> SpeakerId {
        self.speaker_id
    }
}

/// 已合成的音频
///
/// 音频数据在缓存与各请求之间共享，克隆开销很小
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    data: Arc<[u8]>,
    sample_rate: u32,
}

impl SynthesizedAudio {
    pub fn new(data: impl Into<Arc<[u8]>>, sample_rate: u32) -> Self {
        Self {
            data: data.into(),
            sample_rate,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 两者是否共享同一块缓冲区
    pub fn shares_buffer_with(&self, other: &SynthesizedAudio) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_field_aliases() {
        assert_eq!(OverrideField::parse("speed"), Some(OverrideField::Speed));
        assert_eq!(OverrideField::parse("speed_scale"), Some(OverrideField::Speed));
        assert_eq!(OverrideField::parse("speedScale"), Some(OverrideField::Speed));
        assert_eq!(
            OverrideField::parse("pre_phoneme_length"),
            Some(OverrideField::LeadingSilence)
        );
        assert_eq!(
            OverrideField::parse("postPhonemeLength"),
            Some(OverrideField::TrailingSilence)
        );
        assert_eq!(OverrideField::parse("tempo"), None);
    }

    #[test]
    fn test_overrides_order_independent() {
        let a = Overrides::new().with("speed", 1.5).with("pitch", 0.1);
        let b = Overrides::new().with("pitch", 0.1).with("speed", 1.5);
        assert_eq!(a, b);
        assert_eq!(
            RequestKey::new("こんにちは", SpeakerId::new(2), &a),
            RequestKey::new("こんにちは", SpeakerId::new(2), &b)
        );
    }

    #[test]
    fn test_request_key_normalizes_negative_zero() {
        let a = Overrides::new().with("pitch", 0.0);
        let b = Overrides::new().with("pitch", -0.0);
        assert_eq!(
            RequestKey::new("a", SpeakerId::new(1), &a),
            RequestKey::new("a", SpeakerId::new(1), &b)
        );
    }

    #[test]
    fn test_recognized_and_unrecognized() {
        let overrides = Overrides::new().with("speed_scale", 2.0).with("tempo", 3.0);
        let recognized: Vec<_> = overrides.recognized().collect();
        assert_eq!(recognized, vec![(OverrideField::Speed, 2.0)]);
        assert_eq!(overrides.unrecognized().collect::<Vec<_>>(), vec!["tempo"]);
    }
}
