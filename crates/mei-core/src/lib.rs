//! # mei-core
//!
//! Mei 框架核心库, 提供基础类型定义、错误处理和工具函数.
//!
//! 本 crate 对标 FFmpeg 的 libavutil, 为解码会话管理与 RTP 重组
//! 提供底层基础设施.

pub mod bitwriter;
pub mod byterun;
pub mod clock;
pub mod error;
pub mod pixel_format;
pub mod rational;
pub mod timestamp;

// 重导出常用类型
pub use bitwriter::BitWriter;
pub use byterun::ByteRun;
pub use clock::{Clock, SystemClock};
pub use error::{MeiError, MeiResult};
pub use pixel_format::PixelFormat;
pub use rational::Rational;
