//! Request Cache Port - 已合成请求缓存
//!
//! 以 RequestKey 为键的进程内缓存，保证同一请求最多合成一次

use async_trait::async_trait;
use futures_util::future::BoxFuture;

use crate::application::error::ApplicationError;
use crate::domain::{RequestKey, SynthesizedAudio};

/// 构建 future，缓存未命中时由缓存独立驱动，不依附于任何一个等待方
pub type BuildFuture = BoxFuture<'static, Result<SynthesizedAudio, ApplicationError>>;

/// 一次查询的结果来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// 已有条目
    Hit,
    /// 本次调用执行了构建
    Built,
}

/// 缓存统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub hit_count: u64,
    pub miss_count: u64,
    pub build_count: u64,
}

/// Request Cache Port
///
/// - 同一 key 至多一个条目
/// - 并发请求同一 key 时只有一个构建在执行，其余等待其结果（single-flight）
/// - 构建失败时所有等待方得到同一个错误，且不留下条目
#[async_trait]
pub trait RequestCachePort: Send + Sync {
    /// 查找已完成的条目（命中计入统计）
    fn get(&self, key: &RequestKey) -> Option<SynthesizedAudio>;

    /// 查找条目，未命中时执行 `build` 并写入缓存
    async fn get_or_build(
        &self,
        key: RequestKey,
        build: BuildFuture,
    ) -> Result<(SynthesizedAudio, CacheOutcome), ApplicationError>;

    /// 按首次插入顺序返回已完成的 key
    fn keys(&self) -> Vec<RequestKey>;

    /// 获取缓存统计信息
    fn stats(&self) -> CacheStats;
}
