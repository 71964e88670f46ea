//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 合成引擎配置
    #[serde(default)]
    pub engine: EngineConfig,

    /// 请求配置
    #[serde(default)]
    pub request: RequestConfig,

    /// 构建配置
    #[serde(default)]
    pub build: BuildConfig,

    /// 存储配置
    #[serde(default)]
    pub storage: StorageConfig,

    /// 诊断导出配置
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 合成引擎配置
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// 引擎地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 引擎端口
    #[serde(default = "default_port")]
    pub port: u16,

    /// HTTP 请求超时时间（秒）
    #[serde(default = "default_engine_timeout")]
    pub timeout_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    50021
}

fn default_engine_timeout() -> u64 {
    120
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_secs: default_engine_timeout(),
        }
    }
}

impl EngineConfig {
    /// 引擎基础 URL
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// 请求配置
#[derive(Debug, Clone, Deserialize)]
pub struct RequestConfig {
    /// 文本长度上限（字符）
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,

    /// 命令行合成时使用的说话人
    #[serde(default = "default_speaker")]
    pub default_speaker: u32,
}

fn default_max_text_length() -> usize {
    20
}

fn default_speaker() -> u32 {
    2
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            max_text_length: default_max_text_length(),
            default_speaker: default_speaker(),
        }
    }
}

/// 构建配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildConfig {
    /// 单个请求的构建超时（秒），0 表示不限制
    #[serde(default)]
    pub request_timeout_secs: u64,
}

/// 存储配置
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// 音频保存目录
    #[serde(default = "default_sounds_dir")]
    pub sounds_dir: PathBuf,

    /// 诊断文件目录
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

fn default_sounds_dir() -> PathBuf {
    PathBuf::from("sounds/voicevox")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("data/voicevox/log")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sounds_dir: default_sounds_dir(),
            log_dir: default_log_dir(),
        }
    }
}

/// 诊断导出配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiagnosticsConfig {
    /// 启动时导出引擎元数据
    #[serde(default)]
    pub enabled: bool,
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
