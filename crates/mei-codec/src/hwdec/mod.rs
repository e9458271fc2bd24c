//! 硬件加速视频解码会话管理.
//!
//! 把异步执行的硬件解码引擎桥接为逐帧解码 API:
//!
//! - [`engine`]: 硬件引擎 trait 边界与状态码翻译;
//! - [`bitstream`]: 输入码流队列 (追加压实缓冲 + 时间戳);
//! - [`surface`]: 输出表面池 (索引寻址的空闲表 arena);
//! - [`ts_ring`]: 显示/解码时间戳环 (吸收管线延迟与重排深度);
//! - [`session`]: 会话状态机 (提交/轮询/取回循环, 忙退避, 重初始化).
//!
//! 硬件完成顺序与提交顺序可能不同 (B 帧重排), 会话用时间戳环把
//! 输出表面的显示时间戳解析回对应的解码时间戳.

pub mod bitstream;
pub mod engine;
pub mod session;
pub mod surface;
pub mod ts_ring;

pub use bitstream::Bitstream;
pub use engine::{
    DecodeStep, FrameAllocator, FrameInfo, HwCodec, HwDecodeEngine, HwError, HwFrameOutput,
    HwImpl, HwStatus, HwVideoParam, PicStruct, SyncPoint,
};
pub use session::{DecodeOutput, HwDecodeSession};
pub use surface::{Surface, SurfaceId, SurfacePool};
pub use ts_ring::TimestampRing;
