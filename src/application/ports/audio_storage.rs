//! Audio Storage Port - 出站端口
//!
//! 定义音频文件持久化的抽象接口

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 音频存储错误
#[derive(Debug, Error)]
pub enum AudioStorageError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AudioStorageError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. } => path,
        }
    }
}

/// Audio Storage Port - 出站端口
#[async_trait]
pub trait AudioStoragePort: Send + Sync {
    /// 获取音频文件路径
    fn get_audio_path(&self, dir: &Path, file_stem: &str) -> PathBuf;

    /// 确保目录存在（已存在不视为错误）
    async fn ensure_dir(&self, dir: &Path) -> Result<(), AudioStorageError>;

    /// 保存音频数据，同名文件直接覆盖
    async fn save_audio(
        &self,
        dir: &Path,
        file_stem: &str,
        data: &[u8],
    ) -> Result<PathBuf, AudioStorageError>;

    /// 写入 JSON 等文本文件
    async fn write_file(&self, path: &Path, data: &[u8]) -> Result<(), AudioStorageError>;
}
