//! # mei-format
//!
//! Mei 框架传输格式库, 对标 FFmpeg 的 libavformat.
//!
//! 核心内容是 `rtp` 模块: 从分片的传输数据包重组头部压缩的
//! 视频基本流, 由紧凑的逐包头部重建完全自包含的压缩帧.

pub mod rtp;

// 重导出常用类型
pub use rtp::Depacketizer;
pub use rtp::jpeg::JpegDepacketizer;
