//! File Storage - 文件系统音频存储实现
//!
//! 实现 AudioStoragePort trait，写入通过 tokio::fs 在阻塞线程池中执行

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::application::ports::{AudioStorageError, AudioStoragePort};

/// 音频文件扩展名
pub const AUDIO_EXTENSION: &str = "wav";

/// 文件系统音频存储
#[derive(Debug, Clone, Default)]
pub struct FileAudioStorage;

impl FileAudioStorage {
    pub fn new() -> Self {
        Self
    }
}

/// 把文件名中的路径分隔符与非法字符替换为 `_`
pub fn sanitize_file_stem(stem: &str) -> String {
    stem.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

#[async_trait]
impl AudioStoragePort for FileAudioStorage {
    fn get_audio_path(&self, dir: &Path, file_stem: &str) -> PathBuf {
        dir.join(format!("{}.{}", sanitize_file_stem(file_stem), AUDIO_EXTENSION))
    }

    async fn ensure_dir(&self, dir: &Path) -> Result<(), AudioStorageError> {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| AudioStorageError::io(dir, e))
    }

    async fn save_audio(
        &self,
        dir: &Path,
        file_stem: &str,
        data: &[u8],
    ) -> Result<PathBuf, AudioStorageError> {
        let audio_path = self.get_audio_path(dir, file_stem);

        fs::write(&audio_path, data)
            .await
            .map_err(|e| AudioStorageError::io(&audio_path, e))?;

        tracing::debug!(
            path = %audio_path.display(),
            size = data.len(),
            "Saved audio"
        );

        Ok(audio_path)
    }

    async fn write_file(&self, path: &Path, data: &[u8]) -> Result<(), AudioStorageError> {
        fs::write(path, data)
            .await
            .map_err(|e| AudioStorageError::io(path, e))
    }
}
