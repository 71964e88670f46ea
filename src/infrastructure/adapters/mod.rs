//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

pub mod engine;
pub mod playback;
pub mod storage;

pub use engine::*;
pub use playback::*;
pub use storage::*;
