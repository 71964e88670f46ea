//! Diagnostics - 导出引擎元数据
//!
//! 在日志目录写入两个文件:
//! - config.json: 支持的设备、core 版本、引擎版本
//! - speakers.json: 说话人与风格目录

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{
    AudioStoragePort, EngineError, Speaker, SupportedDevices, SynthesisEnginePort,
};

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const SPEAKERS_FILE_NAME: &str = "speakers.json";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EngineConfigDump {
    support_modes: SupportedDevices,
    core_versions: Vec<String>,
    engine_version: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeakerDump {
    name: String,
    uuid: String,
    version: String,
    can_morphing: String,
    styles: Vec<StyleDump>,
}

#[derive(Debug, Serialize)]
struct StyleDump {
    style: String,
    id: u32,
}

impl From<Speaker> for SpeakerDump {
    fn from(speaker: Speaker) -> Self {
        Self {
            name: speaker.name,
            uuid: speaker.speaker_uuid,
            version: speaker.version,
            can_morphing: speaker.supported_features.permitted_synthesis_morphing,
            styles: speaker
                .styles
                .into_iter()
                .map(|style| StyleDump {
                    style: style.name,
                    id: style.id,
                })
                .collect(),
        }
    }
}

/// 导出结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticsReport {
    pub config_path: PathBuf,
    pub speakers_path: PathBuf,
    pub speaker_count: usize,
}

/// 引擎元数据导出
pub struct Diagnostics {
    engine: Arc<dyn SynthesisEnginePort>,
    storage: Arc<dyn AudioStoragePort>,
}

impl Diagnostics {
    pub fn new(engine: Arc<dyn SynthesisEnginePort>, storage: Arc<dyn AudioStoragePort>) -> Self {
        Self { engine, storage }
    }

    pub async fn dump(&self, log_dir: &Path) -> Result<DiagnosticsReport, ApplicationError> {
        self.storage.ensure_dir(log_dir).await?;

        let config_path = log_dir.join(CONFIG_FILE_NAME);
        let speakers_path = log_dir.join(SPEAKERS_FILE_NAME);

        let (_, speaker_count) = tokio::try_join!(
            self.dump_config(&config_path),
            self.dump_speakers(&speakers_path),
        )?;

        tracing::info!(
            dir = %log_dir.display(),
            speaker_count = speaker_count,
            "Engine diagnostics written"
        );

        Ok(DiagnosticsReport {
            config_path,
            speakers_path,
            speaker_count,
        })
    }

    async fn dump_config(&self, path: &Path) -> Result<(), ApplicationError> {
        let core_versions = self.engine.core_versions().await.map_err(ApplicationError::Engine)?;
        let core_version = first_version(&core_versions)?;

        let (support_modes, engine_version) = tokio::try_join!(
            self.engine.supported_devices(core_version),
            self.engine.engine_version(),
        )
        .map_err(ApplicationError::Engine)?;

        let dump = EngineConfigDump {
            support_modes,
            core_versions,
            engine_version,
        };
        let json = serde_json::to_vec_pretty(&dump)?;
        self.storage.write_file(path, &json).await?;
        Ok(())
    }

    async fn dump_speakers(&self, path: &Path) -> Result<usize, ApplicationError> {
        let core_versions = self.engine.core_versions().await.map_err(ApplicationError::Engine)?;
        let core_version = first_version(&core_versions)?;

        let speakers: Vec<SpeakerDump> = self
            .engine
            .speakers(core_version)
            .await
            .map_err(ApplicationError::Engine)?
            .into_iter()
            .map(SpeakerDump::from)
            .collect();

        let json = serde_json::to_vec_pretty(&speakers)?;
        self.storage.write_file(path, &json).await?;
        Ok(speakers.len())
    }
}

fn first_version(versions: &[String]) -> Result<&str, ApplicationError> {
    versions
        .first()
        .map(String::as_str)
        .ok_or_else(|| ApplicationError::Engine(EngineError::NoCoreVersion))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::{FakeEngineClient, FileAudioStorage};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_dump_writes_both_files() {
        let temp_dir = tempdir().unwrap();
        let log_dir = temp_dir.path().join("data").join("voicevox").join("log");
        let diagnostics = Diagnostics::new(
            Arc::new(FakeEngineClient::with_defaults()),
            Arc::new(FileAudioStorage::new()),
        );

        let report = diagnostics.dump(&log_dir).await.unwrap();
        assert_eq!(report.speaker_count, 1);

        let config: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&report.config_path).unwrap()).unwrap();
        assert_eq!(
            config,
            serde_json::json!({
                "supportModes": {"cpu": true, "cuda": false, "dml": false},
                "coreVersions": ["0.14.0"],
                "engineVersion": "0.14.5-fake"
            })
        );

        let raw = std::fs::read_to_string(&report.speakers_path).unwrap();
        // 非 ASCII 原样写入
        assert!(raw.contains("四国めたん"));
        let speakers: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            speakers[0],
            serde_json::json!({
                "name": "四国めたん",
                "uuid": "7ffcb7ce-00ec-4bdc-82cd-45a8889e43ff",
                "version": "0.14.5",
                "canMorphing": "SELF_ONLY",
                "styles": [{"style": "ノーマル", "id": 2}, {"style": "あまあま", "id": 0}]
            })
        );
    }
}
