//! Voice Client - 面向调用方的门面
//!
//! 持有唯一的引擎引用与请求缓存，组合构建、播放、保存与诊断导出

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::application::diagnostics::{Diagnostics, DiagnosticsReport};
use crate::application::error::ApplicationError;
use crate::application::output::OutputSink;
use crate::application::pipeline::{BuildPipeline, BuildPipelineConfig, BuildSummary};
use crate::application::ports::{
    AudioOutputPort, AudioStoragePort, CacheStats, RequestCachePort, SynthesisEnginePort,
};
use crate::domain::{Overrides, RequestError, RequestKey, SpeakerId, VoiceRequest};

/// 门面配置
#[derive(Debug, Clone)]
pub struct VoiceClientConfig {
    /// 文本长度上限（字符）
    pub max_text_length: usize,
    /// 音频保存目录
    pub sounds_dir: PathBuf,
    /// 诊断文件目录
    pub log_dir: PathBuf,
    /// 单个请求远程构建超时（秒），0 表示不限制
    pub request_timeout_secs: u64,
}

impl Default for VoiceClientConfig {
    fn default() -> Self {
        Self {
            max_text_length: 20,
            sounds_dir: PathBuf::from("sounds/voicevox"),
            log_dir: PathBuf::from("data/voicevox/log"),
            request_timeout_secs: 0,
        }
    }
}

/// 语音合成客户端
pub struct VoiceClient {
    engine: Arc<dyn SynthesisEnginePort>,
    cache: Arc<dyn RequestCachePort>,
    pipeline: BuildPipeline,
    sink: OutputSink,
    diagnostics: Diagnostics,
    config: VoiceClientConfig,
}

impl VoiceClient {
    pub fn new(
        engine: Arc<dyn SynthesisEnginePort>,
        cache: Arc<dyn RequestCachePort>,
        storage: Arc<dyn AudioStoragePort>,
        output: Option<Arc<dyn AudioOutputPort>>,
        config: VoiceClientConfig,
    ) -> Self {
        let pipeline = BuildPipeline::new(
            engine.clone(),
            cache.clone(),
            BuildPipelineConfig::from_timeout_secs(config.request_timeout_secs),
        );
        let sink = OutputSink::new(storage.clone(), output);
        let diagnostics = Diagnostics::new(engine.clone(), storage);

        Self {
            engine,
            cache,
            pipeline,
            sink,
            diagnostics,
            config,
        }
    }

    /// 创建请求（只做校验，不访问引擎）
    pub fn create_request(
        &self,
        text: impl Into<String>,
        speaker_id: impl Into<SpeakerId>,
        overrides: Overrides,
    ) -> Result<VoiceRequest, RequestError> {
        VoiceRequest::new(
            text,
            speaker_id.into(),
            overrides,
            self.config.max_text_length,
        )
    }

    /// 为所有请求附加音频，未命中缓存的请求并发构建
    pub async fn build(
        &self,
        requests: &mut [VoiceRequest],
    ) -> Result<BuildSummary, ApplicationError> {
        self.pipeline.build(requests).await
    }

    /// 依次播放（阻塞）
    pub fn play(&self, requests: &[VoiceRequest]) -> Result<(), ApplicationError> {
        self.sink.play(requests)
    }

    /// 保存到配置的音频目录
    pub async fn save(&self, requests: &[VoiceRequest]) -> Result<Vec<PathBuf>, ApplicationError> {
        self.sink.save(requests, &self.config.sounds_dir).await
    }

    /// 保存到指定目录
    pub async fn save_to(
        &self,
        requests: &[VoiceRequest],
        directory: &Path,
    ) -> Result<Vec<PathBuf>, ApplicationError> {
        self.sink.save(requests, directory).await
    }

    /// 导出引擎元数据到日志目录
    pub async fn log_diagnostics(&self) -> Result<DiagnosticsReport, ApplicationError> {
        self.diagnostics.dump(&self.config.log_dir).await
    }

    /// 引擎是否可达
    pub async fn health_check(&self) -> bool {
        self.engine.health_check().await
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// 已合成请求的键，按首次合成顺序
    pub fn cached_keys(&self) -> Vec<RequestKey> {
        self.cache.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::{FakeEngineClient, FileAudioStorage};
    use crate::infrastructure::memory::InMemoryRequestCache;
    use tempfile::tempdir;

    fn client(engine: Arc<FakeEngineClient>, root: &Path) -> VoiceClient {
        VoiceClient::new(
            engine,
            InMemoryRequestCache::new().arc(),
            Arc::new(FileAudioStorage::new()),
            None,
            VoiceClientConfig {
                sounds_dir: root.join("sounds"),
                log_dir: root.join("log"),
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_create_build_save() {
        let temp_dir = tempdir().unwrap();
        let engine = Arc::new(FakeEngineClient::with_defaults());
        let client = client(engine.clone(), temp_dir.path());

        let mut requests = vec![
            client
                .create_request("ありがとうございます。", 2u32, Overrides::new().with("speed_scale", 2.0))
                .unwrap(),
            client
                .create_request("ぶーはぁおいっす", 2u32, Overrides::new())
                .unwrap(),
        ];
        client.build(&mut requests).await.unwrap();

        let paths = client.save(&requests).await.unwrap();
        assert_eq!(paths[0], temp_dir.path().join("sounds").join("ありがとうございます。_2.wav"));
        assert_eq!(paths[1], temp_dir.path().join("sounds").join("ぶーはぁおいっす_2.wav"));

        let keys = client.cached_keys();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&requests[0].key()));
        assert!(keys.contains(&requests[1].key()));

        let stats = client.cache_stats();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.build_count, 2);
        assert_eq!(engine.synthesis_count(), 2);
    }

    #[tokio::test]
    async fn test_create_request_uses_configured_limit() {
        let temp_dir = tempdir().unwrap();
        let client = client(Arc::new(FakeEngineClient::with_defaults()), temp_dir.path());

        assert!(client.create_request("a".repeat(20), 1u32, Overrides::new()).is_ok());
        assert!(matches!(
            client.create_request("a".repeat(21), 1u32, Overrides::new()),
            Err(RequestError::TooLong { max_length: 20, .. })
        ));
    }

    #[tokio::test]
    async fn test_log_diagnostics_into_configured_dir() {
        let temp_dir = tempdir().unwrap();
        let client = client(Arc::new(FakeEngineClient::with_defaults()), temp_dir.path());

        let report = client.log_diagnostics().await.unwrap();
        assert_eq!(report.config_path, temp_dir.path().join("log").join("config.json"));
        assert!(report.speakers_path.exists());
    }

    #[tokio::test]
    async fn test_health_check_against_fake_engine() {
        let temp_dir = tempdir().unwrap();
        let client = client(Arc::new(FakeEngineClient::with_defaults()), temp_dir.path());
        assert!(client.health_check().await);
    }
}
