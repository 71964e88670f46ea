//! In-Memory Request Cache Implementation

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::application::ports::{BuildFuture, CacheOutcome, CacheStats, RequestCachePort};
use crate::application::ApplicationError;
use crate::domain::{RequestKey, SynthesizedAudio};

/// 进行中的构建，所有等待方共享同一个结果
type Flight = Shared<BoxFuture<'static, Result<SynthesizedAudio, ApplicationError>>>;

enum Slot {
    /// 构建中
    InFlight(Flight),
    /// 已合成
    Ready(SynthesizedAudio),
}

struct CacheState {
    entries: DashMap<RequestKey, Slot>,
    /// 首次插入顺序
    order: Mutex<Vec<RequestKey>>,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
    build_count: AtomicU64,
}

impl CacheState {
    /// 构建结束后由构建任务自己写回，不依赖任何等待方存活
    fn settle(&self, key: RequestKey, result: &Result<SynthesizedAudio, ApplicationError>) {
        match result {
            Ok(audio) => {
                tracing::debug!(
                    text = %key.text(),
                    speaker_id = %key.speaker_id(),
                    audio_size = audio.len(),
                    "Request cached"
                );
                self.build_count.fetch_add(1, Ordering::Relaxed);
                self.order
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(key.clone());
                self.entries.insert(key, Slot::Ready(audio.clone()));
            }
            Err(err) => {
                tracing::debug!(
                    text = %key.text(),
                    speaker_id = %key.speaker_id(),
                    error = %err,
                    "Request build failed, entry dropped"
                );
                self.entries.remove(&key);
            }
        }
    }
}

/// 内存请求缓存
///
/// 未命中时构建在独立任务中执行，结果通过 `Shared` 分发给同一 key 的全部等待方。
/// 构建成功后条目转为 Ready；失败时所有等待方收到同一个错误，条目被移除，下一次调用重新构建。
/// 等待方被取消（例如超时）不会中断构建本身。
pub struct InMemoryRequestCache {
    state: Arc<CacheState>,
}

impl InMemoryRequestCache {
    pub fn new() -> Self {
        Self {
            state: Arc::new(CacheState {
                entries: DashMap::new(),
                order: Mutex::new(Vec::new()),
                hit_count: AtomicU64::new(0),
                miss_count: AtomicU64::new(0),
                build_count: AtomicU64::new(0),
            }),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 启动构建任务
    ///
    /// 调用方持有该 key 的 entry 锁，构建任务的写回必须等锁释放，
    /// 因此 InFlight 一定先于结果写入
    fn launch(&self, key: RequestKey, build: BuildFuture) -> Flight {
        let state = self.state.clone();
        let text = key.text().to_string();
        let speaker_id = key.speaker_id();

        let handle = tokio::spawn(async move {
            let result = build.await;
            state.settle(key, &result);
            result
        });

        async move {
            handle.await.unwrap_or_else(|e| {
                Err(ApplicationError::BuildAborted {
                    text,
                    speaker_id,
                    reason: e.to_string(),
                })
            })
        }
        .boxed()
        .shared()
    }
}

impl Default for InMemoryRequestCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RequestCachePort for InMemoryRequestCache {
    fn get(&self, key: &RequestKey) -> Option<SynthesizedAudio> {
        let audio = match self.state.entries.get(key).as_deref() {
            Some(Slot::Ready(audio)) => audio.clone(),
            _ => return None,
        };
        self.state.hit_count.fetch_add(1, Ordering::Relaxed);
        Some(audio)
    }

    async fn get_or_build(
        &self,
        key: RequestKey,
        build: BuildFuture,
    ) -> Result<(SynthesizedAudio, CacheOutcome), ApplicationError> {
        // entry 锁只在这一段内持有，不跨越 await
        let (flight, outcome) = match self.state.entries.entry(key.clone()) {
            Entry::Occupied(entry) => match entry.get() {
                Slot::Ready(audio) => {
                    self.state.hit_count.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(text = %key.text(), speaker_id = %key.speaker_id(), "Request cache hit");
                    return Ok((audio.clone(), CacheOutcome::Hit));
                }
                Slot::InFlight(flight) => {
                    tracing::debug!(text = %key.text(), speaker_id = %key.speaker_id(), "Joined in-flight build");
                    (flight.clone(), CacheOutcome::Hit)
                }
            },
            Entry::Vacant(entry) => {
                self.state.miss_count.fetch_add(1, Ordering::Relaxed);
                let flight = self.launch(key.clone(), build);
                entry.insert(Slot::InFlight(flight.clone()));
                (flight, CacheOutcome::Built)
            }
        };

        let result = flight.clone().await;

        if result.is_err() {
            // 构建任务异常终止时不会写回，这里补上清理
            self.state.entries.remove_if(&key, |_, slot| {
                matches!(slot, Slot::InFlight(current) if current.ptr_eq(&flight))
            });
        }

        result.map(|audio| (audio, outcome))
    }

    fn keys(&self) -> Vec<RequestKey> {
        self.state
            .order
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            total_entries: self
                .state
                .entries
                .iter()
                .filter(|entry| matches!(entry.value(), Slot::Ready(_)))
                .count(),
            hit_count: self.state.hit_count.load(Ordering::Relaxed),
            miss_count: self.state.miss_count.load(Ordering::Relaxed),
            build_count: self.state.build_count.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::EngineError;
    use crate::domain::{Overrides, SpeakerId};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn key(text: &str, speaker: u32) -> RequestKey {
        RequestKey::new(text, SpeakerId::new(speaker), &Overrides::new())
    }

    fn audio(byte: u8) -> SynthesizedAudio {
        SynthesizedAudio::new(vec![byte; 4], 24000)
    }

    fn failing(text: &'static str) -> BuildFuture {
        Box::pin(async move {
            Err(ApplicationError::remote(
                text,
                SpeakerId::new(1),
                EngineError::Timeout,
            ))
        })
    }

    #[tokio::test]
    async fn test_build_once_then_hit() {
        let cache = InMemoryRequestCache::new();

        let (first, outcome) = cache
            .get_or_build(key("a", 1), Box::pin(async { Ok(audio(1)) }))
            .await
            .unwrap();
        assert_eq!(outcome, CacheOutcome::Built);

        let (second, outcome) = cache
            .get_or_build(key("a", 1), Box::pin(async { Ok(audio(2)) }))
            .await
            .unwrap();
        assert_eq!(outcome, CacheOutcome::Hit);
        assert!(second.shares_buffer_with(&first));
        assert!(cache.get(&key("a", 1)).unwrap().shares_buffer_with(&first));

        let stats = cache.stats();
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.build_count, 1);
        assert_eq!(stats.hit_count, 2);
    }

    #[tokio::test]
    async fn test_concurrent_same_key_single_flight() {
        let cache = InMemoryRequestCache::new();
        let builds = Arc::new(AtomicUsize::new(0));

        let make = || {
            let builds = builds.clone();
            cache.get_or_build(
                key("same", 1),
                Box::pin(async move {
                    builds.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(audio(7))
                }),
            )
        };

        let (a, b, c) = tokio::join!(make(), make(), make());
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        let results = [a.unwrap(), b.unwrap(), c.unwrap()];
        let built = results
            .iter()
            .filter(|(_, outcome)| *outcome == CacheOutcome::Built)
            .count();
        assert_eq!(built, 1);
        assert!(results
            .iter()
            .all(|(audio, _)| audio.shares_buffer_with(&results[0].0)));
        assert_eq!(cache.stats().build_count, 1);
    }

    #[tokio::test]
    async fn test_failed_flight_fails_all_waiters_once() {
        let cache = InMemoryRequestCache::new();
        let builds = Arc::new(AtomicUsize::new(0));

        let make = || {
            let builds = builds.clone();
            cache.get_or_build(
                key("bad", 1),
                Box::pin(async move {
                    builds.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Err(ApplicationError::remote(
                        "bad",
                        SpeakerId::new(1),
                        EngineError::ServiceError("HTTP 500".to_string()),
                    ))
                }),
            )
        };

        let (a, b, c) = tokio::join!(make(), make(), make());
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        for result in [a, b, c] {
            assert!(matches!(
                result,
                Err(ApplicationError::RemoteUnavailable {
                    source: EngineError::ServiceError(_),
                    ..
                })
            ));
        }
        assert!(cache.get(&key("bad", 1)).is_none());
    }

    #[tokio::test]
    async fn test_failed_build_leaves_no_entry() {
        let cache = InMemoryRequestCache::new();

        let result = cache.get_or_build(key("a", 1), failing("a")).await;
        assert!(result.is_err());
        assert!(cache.get(&key("a", 1)).is_none());
        assert_eq!(cache.stats().total_entries, 0);

        let (_, outcome) = cache
            .get_or_build(key("a", 1), Box::pin(async { Ok(audio(1)) }))
            .await
            .unwrap();
        assert_eq!(outcome, CacheOutcome::Built);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_waiter_does_not_abort_build() {
        let cache = InMemoryRequestCache::new();

        let slow = cache.get_or_build(
            key("a", 1),
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Ok(audio(9))
            }),
        );
        assert!(tokio::time::timeout(Duration::from_secs(1), slow)
            .await
            .is_err());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(cache.get(&key("a", 1)), Some(audio(9)));
        assert_eq!(cache.keys(), vec![key("a", 1)]);
    }

    #[tokio::test]
    async fn test_keys_in_insertion_order() {
        let cache = InMemoryRequestCache::new();
        for (text, speaker) in [("b", 1), ("a", 1), ("a", 2)] {
            cache
                .get_or_build(key(text, speaker), Box::pin(async { Ok(audio(0)) }))
                .await
                .unwrap();
        }
        assert_eq!(cache.keys(), vec![key("b", 1), key("a", 1), key("a", 2)]);
    }
}
