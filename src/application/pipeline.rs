//! Build Pipeline - 合成请求的构建编排
//!
//! 一次 build 调用内的所有请求在调用方任务上并发执行（fan-out），
//! 全部完成后返回（fan-in）。缓存未命中时的远程流程：
//!
//! core_versions → audio_query → 覆盖参数 → synthesis → 写入缓存

use futures_util::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::application::error::{collect_batch, ApplicationError};
use crate::application::ports::{
    AudioQuery, CacheOutcome, EngineError, RequestCachePort, SynthesisEnginePort,
};
use crate::domain::{Overrides, SpeakerId, SynthesizedAudio, VoiceRequest};

/// Pipeline 配置
#[derive(Debug, Clone, Default)]
pub struct BuildPipelineConfig {
    /// 单个请求的远程构建超时，None 表示不限制
    pub request_timeout: Option<Duration>,
}

impl BuildPipelineConfig {
    /// 从秒数创建，0 表示不限制
    pub fn from_timeout_secs(secs: u64) -> Self {
        Self {
            request_timeout: (secs > 0).then(|| Duration::from_secs(secs)),
        }
    }
}

/// 一次 build 的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildSummary {
    /// 本次调用实际远程构建的数量
    pub built: usize,
    /// 从缓存（或并发中的同一构建）取得的数量
    pub cache_hits: usize,
    /// 调用前已经带有音频的数量
    pub reused: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Built,
    CacheHit,
    AlreadyBuilt,
}

/// 构建编排器
pub struct BuildPipeline {
    engine: Arc<dyn SynthesisEnginePort>,
    cache: Arc<dyn RequestCachePort>,
    config: BuildPipelineConfig,
}

impl BuildPipeline {
    pub fn new(
        engine: Arc<dyn SynthesisEnginePort>,
        cache: Arc<dyn RequestCachePort>,
        config: BuildPipelineConfig,
    ) -> Self {
        Self {
            engine,
            cache,
            config,
        }
    }

    /// 为每个请求附加音频
    ///
    /// 单个请求失败不影响其余请求：其余请求照常完成并保留音频，
    /// 所有失败汇总为 `BatchFailed` 返回。
    pub async fn build(
        &self,
        requests: &mut [VoiceRequest],
    ) -> Result<BuildSummary, ApplicationError> {
        let started = Instant::now();
        let total = requests.len();

        let results = join_all(requests.iter_mut().map(|request| self.resolve(request))).await;

        let mut summary = BuildSummary::default();
        for resolution in results.iter().flatten() {
            match resolution {
                Resolution::Built => summary.built += 1,
                Resolution::CacheHit => summary.cache_hits += 1,
                Resolution::AlreadyBuilt => summary.reused += 1,
            }
        }

        for (index, err) in results
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.as_ref().err().map(|e| (i, e)))
        {
            tracing::error!(index = index, error = %err, "Request build failed");
        }

        tracing::info!(
            total = total,
            built = summary.built,
            cache_hits = summary.cache_hits,
            reused = summary.reused,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Build finished"
        );

        collect_batch(results)?;
        Ok(summary)
    }

    /// 解析单个请求：已构建 → 缓存 → 远程构建
    ///
    /// 超时从请求开始计时，等待同 key 的进行中构建也计入
    async fn resolve(&self, request: &mut VoiceRequest) -> Result<Resolution, ApplicationError> {
        if request.is_built() {
            return Ok(Resolution::AlreadyBuilt);
        }

        let key = request.key();
        if let Some(audio) = self.cache.get(&key) {
            request.attach_audio(audio);
            return Ok(Resolution::CacheHit);
        }

        let build = build_remote(
            self.engine.clone(),
            request.text().to_string(),
            request.speaker_id(),
            request.overrides().clone(),
            self.config.request_timeout,
        );
        let lookup = self.cache.get_or_build(key, Box::pin(build));

        let (audio, outcome) = match self.config.request_timeout {
            Some(limit) => tokio::time::timeout(limit, lookup).await.map_err(|_| {
                timed_out(request.text(), request.speaker_id(), limit)
            })??,
            None => lookup.await?,
        };

        request.attach_audio(audio);

        Ok(match outcome {
            CacheOutcome::Built => Resolution::Built,
            CacheOutcome::Hit => Resolution::CacheHit,
        })
    }
}

fn timed_out(text: &str, speaker_id: SpeakerId, limit: Duration) -> ApplicationError {
    tracing::warn!(text = %text, speaker_id = %speaker_id, "Synthesis timed out");
    ApplicationError::SynthesisTimeout {
        text: text.to_string(),
        speaker_id,
        timeout_secs: limit.as_secs(),
    }
}

/// 远程构建，只持有自身数据，由缓存在独立任务中驱动
///
/// 超时作用于构建本身，使同 key 的所有等待方一起失败
async fn build_remote(
    engine: Arc<dyn SynthesisEnginePort>,
    text: String,
    speaker_id: SpeakerId,
    overrides: Overrides,
    timeout: Option<Duration>,
) -> Result<SynthesizedAudio, ApplicationError> {
    let remote = synthesize(engine.as_ref(), &text, speaker_id, &overrides);

    match timeout {
        Some(limit) => tokio::time::timeout(limit, remote)
            .await
            .map_err(|_| timed_out(&text, speaker_id, limit))?,
        None => remote.await,
    }
}

async fn synthesize(
    engine: &dyn SynthesisEnginePort,
    text: &str,
    speaker_id: SpeakerId,
    overrides: &Overrides,
) -> Result<SynthesizedAudio, ApplicationError> {
    let remote_err = |e: EngineError| ApplicationError::remote(text, speaker_id, e);

    // 只使用引擎报告的第一个 core 版本
    let core_version = engine
        .core_versions()
        .await
        .map_err(remote_err)?
        .into_iter()
        .next()
        .ok_or_else(|| remote_err(EngineError::NoCoreVersion))?;

    let mut query = engine
        .audio_query(text, speaker_id, &core_version)
        .await
        .map_err(remote_err)?;

    apply_overrides(&mut query, overrides);

    let data = engine
        .synthesis(&query, speaker_id, &core_version)
        .await
        .map_err(remote_err)?;

    tracing::info!(
        text = %text,
        speaker_id = %speaker_id,
        core_version = %core_version,
        sample_rate = query.output_sampling_rate,
        audio_size = data.len(),
        "Request built"
    );

    Ok(SynthesizedAudio::new(data, query.output_sampling_rate))
}

/// 将覆盖参数写入合成查询，无法识别的键跳过
pub fn apply_overrides(query: &mut AudioQuery, overrides: &Overrides) {
    for (field, value) in overrides.recognized() {
        query.set(field, value);
    }
    for key in overrides.unrecognized() {
        tracing::debug!(key = %key, "Ignoring unrecognized override");
    }
}
