//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（voxcast.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["voxcast", "voxcast.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `VOXCAST_`，层级分隔符 `__`）
/// 2. 配置文件（voxcast.toml 或 voxcast.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `VOXCAST_ENGINE__HOST=192.168.1.10`
/// - `VOXCAST_ENGINE__PORT=50021`
/// - `VOXCAST_BUILD__REQUEST_TIMEOUT_SECS=30`
/// - `VOXCAST_DIAGNOSTICS__ENABLED=true`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("engine.host", "127.0.0.1")?
        .set_default("engine.port", 50021)?
        .set_default("engine.timeout_secs", 120)?
        .set_default("request.max_text_length", 20)?
        .set_default("request.default_speaker", 2)?
        .set_default("build.request_timeout_secs", 0)?
        .set_default("storage.sounds_dir", "sounds/voicevox")?
        .set_default("storage.log_dir", "data/voicevox/log")?
        .set_default("diagnostics.enabled", false)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    builder = builder.add_source(
        Environment::with_prefix("VOXCAST")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.engine.host.is_empty() {
        return Err(ConfigError::ValidationError(
            "Engine host cannot be empty".to_string(),
        ));
    }

    if config.engine.port == 0 {
        return Err(ConfigError::ValidationError(
            "Engine port cannot be 0".to_string(),
        ));
    }

    if config.request.max_text_length == 0 {
        return Err(ConfigError::ValidationError(
            "Max text length must be at least 1".to_string(),
        ));
    }

    if config.storage.sounds_dir.as_os_str().is_empty()
        || config.storage.log_dir.as_os_str().is_empty()
    {
        return Err(ConfigError::ValidationError(
            "Storage directories cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Engine URL: {}", config.engine.base_url());
    tracing::info!("Engine Timeout: {}s", config.engine.timeout_secs);
    tracing::info!("Max Text Length: {}", config.request.max_text_length);
    tracing::info!("Default Speaker: {}", config.request.default_speaker);
    if config.build.request_timeout_secs > 0 {
        tracing::info!("Request Timeout: {}s", config.build.request_timeout_secs);
    }
    tracing::info!("Sounds Directory: {:?}", config.storage.sounds_dir);
    tracing::info!("Log Directory: {:?}", config.storage.log_dir);
    tracing::info!("Diagnostics Enabled: {}", config.diagnostics.enabled);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}
