//! # mei-codec
//!
//! Mei 框架编解码器库, 对标 FFmpeg 的 libavcodec.
//!
//! 核心内容是 `hwdec` 模块: 把异步的硬件解码引擎桥接为
//! "送入压缩数据块 / 取回解码帧" 的逐帧 API, 处理输出表面池化、
//! 时间戳重排、码流排队以及设备忙退避.

pub mod codec_id;
pub mod frame;
pub mod hwdec;
pub mod mjpeg;
pub mod packet;

// 重导出常用类型
pub use codec_id::CodecId;
pub use frame::VideoFrame;
pub use hwdec::HwDecodeSession;
pub use packet::Packet;
