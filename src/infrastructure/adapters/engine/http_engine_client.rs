//! HTTP Engine Client - 调用 VOICEVOX 兼容的合成引擎 HTTP 服务
//!
//! 实现 SynthesisEnginePort trait
//!
//! 引擎 API:
//! - GET  /core_versions
//! - POST /audio_query?text=..&speaker=..&core_version=..   -> AudioQuery (JSON)
//! - POST /synthesis?speaker=..&core_version=..  body: AudioQuery -> audio/wav
//! - GET  /version
//! - GET  /supported_devices?core_version=..
//! - GET  /speakers?core_version=..

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::application::ports::{
    AudioQuery, EngineError, Speaker, SupportedDevices, SynthesisEnginePort,
};
use crate::domain::SpeakerId;

/// HTTP 引擎客户端配置
#[derive(Debug, Clone)]
pub struct HttpEngineClientConfig {
    /// 引擎基础 URL
    pub base_url: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for HttpEngineClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:50021".to_string(),
            timeout_secs: 120,
        }
    }
}

impl HttpEngineClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// HTTP 引擎客户端
pub struct HttpEngineClient {
    client: Client,
    config: HttpEngineClientConfig,
}

impl HttpEngineClient {
    /// 创建新的 HTTP 引擎客户端
    pub fn new(config: HttpEngineClientConfig) -> Result<Self, EngineError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EngineError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, EngineError> {
        let response = self
            .client
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(map_send_error)?;

        check_status(response)
            .await?
            .json::<T>()
            .await
            .map_err(|e| EngineError::InvalidResponse(format!("{}: {}", path, e)))
    }
}

fn map_send_error(e: reqwest::Error) -> EngineError {
    if e.is_timeout() {
        EngineError::Timeout
    } else if e.is_connect() {
        EngineError::NetworkError(format!("Cannot connect to synthesis engine: {}", e))
    } else {
        EngineError::NetworkError(e.to_string())
    }
}

async fn check_status(response: Response) -> Result<Response, EngineError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response.text().await.unwrap_or_default();
    Err(EngineError::ServiceError(format!(
        "HTTP {}: {}",
        status, error_text
    )))
}

#[async_trait]
impl SynthesisEnginePort for HttpEngineClient {
    async fn core_versions(&self) -> Result<Vec<String>, EngineError> {
        self.get_json("core_versions", &[]).await
    }

    async fn audio_query(
        &self,
        text: &str,
        speaker_id: SpeakerId,
        core_version: &str,
    ) -> Result<AudioQuery, EngineError> {
        let speaker = speaker_id.to_string();

        tracing::debug!(
            url = %self.url("audio_query"),
            text_len = text.chars().count(),
            speaker_id = %speaker_id,
            core_version = %core_version,
            "Requesting audio query"
        );

        let response = self
            .client
            .post(self.url("audio_query"))
            .query(&[
                ("text", text),
                ("speaker", speaker.as_str()),
                ("core_version", core_version),
            ])
            .send()
            .await
            .map_err(map_send_error)?;

        check_status(response)
            .await?
            .json::<AudioQuery>()
            .await
            .map_err(|e| EngineError::InvalidResponse(format!("audio_query: {}", e)))
    }

    async fn synthesis(
        &self,
        query: &AudioQuery,
        speaker_id: SpeakerId,
        core_version: &str,
    ) -> Result<Vec<u8>, EngineError> {
        let speaker = speaker_id.to_string();

        let response = self
            .client
            .post(self.url("synthesis"))
            .query(&[("speaker", speaker.as_str()), ("core_version", core_version)])
            .json(query)
            .send()
            .await
            .map_err(map_send_error)?;

        let audio_data = check_status(response)
            .await?
            .bytes()
            .await
            .map_err(|e| EngineError::InvalidResponse(format!("Failed to read audio: {}", e)))?
            .to_vec();

        tracing::info!(
            speaker_id = %speaker_id,
            sample_rate = query.output_sampling_rate,
            audio_size = audio_data.len(),
            "Synthesis completed"
        );

        Ok(audio_data)
    }

    async fn engine_version(&self) -> Result<String, EngineError> {
        self.get_json("version", &[]).await
    }

    async fn supported_devices(&self, core_version: &str) -> Result<SupportedDevices, EngineError> {
        self.get_json("supported_devices", &[("core_version", core_version)])
            .await
    }

    async fn speakers(&self, core_version: &str) -> Result<Vec<Speaker>, EngineError> {
        self.get_json("speakers", &[("core_version", core_version)])
            .await
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .get(self.url("version"))
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}
