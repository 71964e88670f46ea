//! Voice Context - Errors

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RequestError {
    #[error("文本过长（最多 {max_length} 字符）: {text}")]
    TooLong { text: String, max_length: usize },

    #[error("文本不能为空")]
    EmptyText,

    #[error("无效的覆盖参数 {key}: {value}")]
    InvalidOverride { key: String, value: f64 },
}
