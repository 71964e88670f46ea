//! 应用层错误定义
//!
//! 构建、播放、保存用例的统一错误类型

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::application::ports::{AudioStorageError, EngineError, PlaybackError};
use crate::domain::{RequestError, SpeakerId};

/// 应用层错误
///
/// 可克隆：同一次构建的失败会分发给所有等待该构建的请求
#[derive(Debug, Clone, Error)]
pub enum ApplicationError {
    /// 请求校验失败
    #[error(transparent)]
    Request(#[from] RequestError),

    /// 远程引擎不可用或返回协议错误
    #[error("Remote engine unavailable for \"{text}\" (speaker {speaker_id}): {source}")]
    RemoteUnavailable {
        text: String,
        speaker_id: SpeakerId,
        #[source]
        source: EngineError,
    },

    /// 引擎元数据请求失败（与具体合成请求无关）
    #[error("Engine request failed: {0}")]
    Engine(#[source] EngineError),

    /// 单个请求构建超时
    #[error("Synthesis of \"{text}\" (speaker {speaker_id}) timed out after {timeout_secs}s")]
    SynthesisTimeout {
        text: String,
        speaker_id: SpeakerId,
        timeout_secs: u64,
    },

    /// 构建任务异常终止
    #[error("Synthesis of \"{text}\" (speaker {speaker_id}) aborted: {reason}")]
    BuildAborted {
        text: String,
        speaker_id: SpeakerId,
        reason: String,
    },

    /// 请求尚未合成
    #[error("Request \"{text}\" (speaker {speaker_id}) has no audio, build it first")]
    NotBuilt { text: String, speaker_id: SpeakerId },

    /// 文件系统错误
    #[error("IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    /// 播放设备错误
    #[error(transparent)]
    Playback(#[from] PlaybackError),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(#[source] Arc<serde_json::Error>),

    /// 批量操作中部分请求失败（其余请求已完成）
    #[error("{} request(s) of the batch failed: {}", .failures.len(), summarize(.failures))]
    BatchFailed { failures: Vec<RequestFailure> },
}

impl ApplicationError {
    /// 远程引擎错误
    pub fn remote(text: &str, speaker_id: SpeakerId, source: EngineError) -> Self {
        Self::RemoteUnavailable {
            text: text.to_string(),
            speaker_id,
            source,
        }
    }

    pub fn not_built(text: &str, speaker_id: SpeakerId) -> Self {
        Self::NotBuilt {
            text: text.to_string(),
            speaker_id,
        }
    }

    /// 批量失败中的各项（非批量错误返回空）
    pub fn failures(&self) -> &[RequestFailure] {
        match self {
            Self::BatchFailed { failures } => failures,
            _ => &[],
        }
    }
}

impl From<AudioStorageError> for ApplicationError {
    fn from(err: AudioStorageError) -> Self {
        match err {
            AudioStorageError::Io { path, source } => Self::Io {
                path,
                source: Arc::new(source),
            },
        }
    }
}

impl From<serde_json::Error> for ApplicationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(Arc::new(err))
    }
}

/// 批量操作中单个请求的失败
#[derive(Debug, Clone)]
pub struct RequestFailure {
    /// 请求在批次中的位置
    pub index: usize,
    pub error: ApplicationError,
}

fn summarize(failures: &[RequestFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("#{}: {}", f.index, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

/// 汇总批量结果：全部成功返回 Ok，否则返回 BatchFailed
pub(crate) fn collect_batch<T>(
    results: Vec<Result<T, ApplicationError>>,
) -> Result<Vec<T>, ApplicationError> {
    let mut values = Vec::with_capacity(results.len());
    let mut failures = Vec::new();

    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(value) => values.push(value),
            Err(error) => failures.push(RequestFailure { index, error }),
        }
    }

    if failures.is_empty() {
        Ok(values)
    } else {
        Err(ApplicationError::BatchFailed { failures })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_batch_all_ok() {
        let results: Vec<Result<u32, ApplicationError>> = vec![Ok(1), Ok(2)];
        assert_eq!(collect_batch(results).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_collect_batch_reports_indices() {
        let results: Vec<Result<u32, ApplicationError>> = vec![
            Ok(1),
            Err(ApplicationError::not_built("a", SpeakerId::new(1))),
            Ok(3),
        ];
        let err = collect_batch(results).unwrap_err();
        assert_eq!(err.failures().len(), 1);
        assert_eq!(err.failures()[0].index, 1);
        assert!(err.to_string().contains("#1"));
    }
}
