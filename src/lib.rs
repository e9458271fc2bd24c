//! # Mei (媒)
//!
//! 纯 Rust 实现的流媒体解码框架, 对标 FFmpeg 的硬件解码与 RTP 重组路径.
//!
//! Mei 提供两条互补的处理链:
//! - **硬件加速解码会话**: 异步解码流水线的封装 (码流队列、表面池、
//!   时间戳重排、设备忙重试、参数变化与重初始化)
//! - **RTP 载荷重组**: 从分片的传输数据包重建自包含的压缩帧
//!   (RTP/JPEG 帧头合成)
//!
//! # 快速开始
//!
//! ```rust
//! use mei::format::JpegDepacketizer;
//! use mei::format::rtp::Depacketizer;
//!
//! // 每个视频流一个重组器, 逐包驱动
//! let mut dp = JpegDepacketizer::new(0);
//! assert_eq!(dp.name(), "jpeg");
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `mei-core` | 核心类型与工具 |
//! | `mei-codec` | 编解码会话框架 |
//! | `mei-format` | 传输格式重组 |

/// 核心类型与工具 (对标 libavutil)
pub use mei_core as core;

/// 编解码会话框架 (对标 libavcodec)
pub use mei_codec as codec;

/// 传输格式重组 (对标 libavformat)
pub use mei_format as format;

/// 获取 Mei 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
