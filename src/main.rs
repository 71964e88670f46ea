//! Voxcast - VOICEVOX 合成命令行
//!
//! 用法: `voxcast <文本>...`
//!
//! 以默认说话人合成所有文本，保存到音频目录；启用 `playback` 特性时依次播放

use std::sync::Arc;

use anyhow::Context;
use voxcast::application::{AudioOutputPort, VoiceClient, VoiceClientConfig};
use voxcast::config::{load_config, print_config, AppConfig};
use voxcast::domain::{Overrides, VoiceRequest};
use voxcast::infrastructure::adapters::{
    FileAudioStorage, HttpEngineClient, HttpEngineClientConfig,
};
use voxcast::infrastructure::memory::InMemoryRequestCache;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);

    tracing::info!("Voxcast - VOICEVOX 合成客户端");
    print_config(&config);

    let engine_config = HttpEngineClientConfig::new(config.engine.base_url())
        .with_timeout(config.engine.timeout_secs);
    let engine = Arc::new(HttpEngineClient::new(engine_config)?);

    let client = VoiceClient::new(
        engine,
        InMemoryRequestCache::new().arc(),
        Arc::new(FileAudioStorage::new()),
        audio_output(),
        VoiceClientConfig {
            max_text_length: config.request.max_text_length,
            sounds_dir: config.storage.sounds_dir.clone(),
            log_dir: config.storage.log_dir.clone(),
            request_timeout_secs: config.build.request_timeout_secs,
        },
    );

    if !client.health_check().await {
        tracing::warn!(
            "Engine at {} is not responding, requests may fail",
            config.engine.base_url()
        );
    }

    if config.diagnostics.enabled {
        let report = client
            .log_diagnostics()
            .await
            .context("Failed to dump engine diagnostics")?;
        tracing::info!(
            "Diagnostics written: {:?}, {:?} ({} speakers)",
            report.config_path,
            report.speakers_path,
            report.speaker_count
        );
    }

    let texts: Vec<String> = std::env::args().skip(1).collect();
    if texts.is_empty() {
        tracing::info!("No text given, nothing to synthesize");
        return Ok(());
    }

    let mut requests = texts
        .into_iter()
        .map(|text| {
            client.create_request(text, config.request.default_speaker, Overrides::new())
        })
        .collect::<Result<Vec<VoiceRequest>, _>>()?;

    let summary = client.build(&mut requests).await?;
    tracing::info!(
        "Build finished: {} built, {} cache hits, {} reused",
        summary.built,
        summary.cache_hits,
        summary.reused
    );

    for path in client.save(&requests).await? {
        tracing::info!("Saved {:?}", path);
    }

    for key in client.cached_keys() {
        tracing::debug!(text = %key.text(), speaker_id = %key.speaker_id(), "Cached request");
    }

    if cfg!(feature = "playback") {
        let requests_to_play = requests.clone();
        let client = Arc::new(client);
        let player = client.clone();
        tokio::task::spawn_blocking(move || player.play(&requests_to_play)).await??;
    }

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let log_filter = format!("{},voxcast={}", config.log.level, config.log.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[cfg(feature = "playback")]
fn audio_output() -> Option<Arc<dyn AudioOutputPort>> {
    Some(Arc::new(voxcast::infrastructure::adapters::RodioAudioOutput::new()))
}

#[cfg(not(feature = "playback"))]
fn audio_output() -> Option<Arc<dyn AudioOutputPort>> {
    None
}
