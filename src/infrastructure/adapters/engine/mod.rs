//! Engine Adapter - 合成引擎客户端实现

mod fake_engine_client;
mod http_engine_client;

pub use fake_engine_client::{FakeEngineClient, FakeEngineClientConfig, SynthesisCall};
pub use http_engine_client::*;
