//! Memory Layer - In-Memory State Management
//!
//! 实现进程内请求缓存

mod request_cache;

pub use request_cache::InMemoryRequestCache;
