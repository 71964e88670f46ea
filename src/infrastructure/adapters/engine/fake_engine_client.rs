//! Fake Engine Client - 不依赖远程服务的合成引擎
//!
//! 根据文本生成确定性的 WAV 音频，并记录每次调用，用于测试和离线运行

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::application::ports::{
    AudioQuery, EngineError, Speaker, SpeakerStyle, SpeakerSupportedFeatures, SupportedDevices,
    SynthesisEnginePort,
};
use crate::domain::SpeakerId;
use crate::infrastructure::adapters::playback::encode_wav_pcm16;

/// Fake Engine Client 配置
#[derive(Debug, Clone)]
pub struct FakeEngineClientConfig {
    /// 每次远程调用的模拟延迟
    pub delay: Duration,
    /// 返回的 core 版本列表
    pub core_versions: Vec<String>,
    /// AudioQuery 默认输出采样率
    pub sample_rate: u32,
}

impl Default for FakeEngineClientConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(0),
            core_versions: vec!["0.14.0".to_string()],
            sample_rate: 24000,
        }
    }
}

/// 一次 synthesis 调用的记录
#[derive(Debug, Clone)]
pub struct SynthesisCall {
    pub text: String,
    pub speaker_id: SpeakerId,
    pub core_version: String,
    pub query: AudioQuery,
}

/// Fake Engine Client
pub struct FakeEngineClient {
    config: FakeEngineClientConfig,
    /// 这些文本的 audio_query 返回服务错误
    failing_texts: HashSet<String>,
    core_version_calls: AtomicUsize,
    audio_query_calls: AtomicUsize,
    synthesis_calls: Mutex<Vec<SynthesisCall>>,
}

impl FakeEngineClient {
    pub fn new(config: FakeEngineClientConfig) -> Self {
        Self {
            config,
            failing_texts: HashSet::new(),
            core_version_calls: AtomicUsize::new(0),
            audio_query_calls: AtomicUsize::new(0),
            synthesis_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(FakeEngineClientConfig::default())
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.config.delay = delay;
        self
    }

    /// 对指定文本返回引擎错误
    pub fn fail_on(mut self, text: impl Into<String>) -> Self {
        self.failing_texts.insert(text.into());
        self
    }

    pub fn core_version_count(&self) -> usize {
        self.core_version_calls.load(Ordering::SeqCst)
    }

    pub fn audio_query_count(&self) -> usize {
        self.audio_query_calls.load(Ordering::SeqCst)
    }

    pub fn synthesis_count(&self) -> usize {
        self.synthesis_calls().len()
    }

    pub fn synthesis_calls(&self) -> Vec<SynthesisCall> {
        self.synthesis_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn simulate_latency(&self) {
        if !self.config.delay.is_zero() {
            tokio::time::sleep(self.config.delay).await;
        }
    }
}

#[async_trait]
impl SynthesisEnginePort for FakeEngineClient {
    async fn core_versions(&self) -> Result<Vec<String>, EngineError> {
        self.core_version_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        Ok(self.config.core_versions.clone())
    }

    async fn audio_query(
        &self,
        text: &str,
        _speaker_id: SpeakerId,
        _core_version: &str,
    ) -> Result<AudioQuery, EngineError> {
        self.audio_query_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if self.failing_texts.contains(text) {
            return Err(EngineError::ServiceError(format!(
                "HTTP 422 Unprocessable Entity: cannot analyze {}",
                text
            )));
        }

        Ok(AudioQuery {
            output_sampling_rate: self.config.sample_rate,
            kana: Some(text.to_string()),
            ..Default::default()
        })
    }

    async fn synthesis(
        &self,
        query: &AudioQuery,
        speaker_id: SpeakerId,
        core_version: &str,
    ) -> Result<Vec<u8>, EngineError> {
        self.simulate_latency().await;

        let text = query.kana.clone().unwrap_or_default();
        tracing::debug!(text = %text, speaker_id = %speaker_id, "FakeEngineClient: synthesizing");

        // 每个字符一个样本，值由字符与 speaker 决定
        let samples: Vec<i16> = text
            .chars()
            .map(|c| ((c as u32).wrapping_add(speaker_id.as_u32()) % 30000) as i16)
            .collect();
        let channels = if query.output_stereo { 2 } else { 1 };
        let audio = encode_wav_pcm16(&samples, channels, query.output_sampling_rate);

        self.synthesis_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SynthesisCall {
                text,
                speaker_id,
                core_version: core_version.to_string(),
                query: query.clone(),
            });

        Ok(audio)
    }

    async fn engine_version(&self) -> Result<String, EngineError> {
        Ok("0.14.5-fake".to_string())
    }

    async fn supported_devices(&self, _core_version: &str) -> Result<SupportedDevices, EngineError> {
        Ok(SupportedDevices {
            cpu: true,
            cuda: false,
            dml: false,
        })
    }

    async fn speakers(&self, _core_version: &str) -> Result<Vec<Speaker>, EngineError> {
        Ok(vec![Speaker {
            name: "四国めたん".to_string(),
            speaker_uuid: "7ffcb7ce-00ec-4bdc-82cd-45a8889e43ff".to_string(),
            styles: vec![
                SpeakerStyle {
                    name: "ノーマル".to_string(),
                    id: 2,
                },
                SpeakerStyle {
                    name: "あまあま".to_string(),
                    id: 0,
                },
            ],
            version: "0.14.5".to_string(),
            supported_features: SpeakerSupportedFeatures {
                permitted_synthesis_morphing: "SELF_ONLY".to_string(),
            },
        }])
    }
}
