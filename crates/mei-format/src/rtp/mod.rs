//! RTP 动态载荷重组.
//!
//! 传输层 (RTP 序号/抖动处理) 在上游完成; 本模块只负责把单个
//! 载荷的分片序列重组为完整压缩帧. 每种载荷格式实现
//! [`Depacketizer`] trait.

pub mod jpeg;

use mei_codec::{CodecId, Packet};
use mei_core::MeiResult;

/// 载荷重组器 trait
///
/// 逐包驱动: 每收到一个传输包调用一次 `parse()`.
///
/// # 返回
/// - `Ok(Some(packet))`: 重组出一个完整压缩帧
/// - `Ok(None)`: 还需要更多分片 (不是错误, 调用方不应推进输出)
/// - `Err(..)`: 载荷畸形或分片缺失; 进行中的帧已被丢弃,
///   状态机在下一个首分片 (偏移 0) 上自愈
pub trait Depacketizer: Send {
    /// 目标编解码器标识
    fn codec_id(&self) -> CodecId;

    /// 载荷格式名称
    fn name(&self) -> &str;

    /// 处理一个传输包的载荷
    ///
    /// # 参数
    /// - `payload`: 载荷字节 (不含 RTP 固定头)
    /// - `timestamp`: 传输层时间戳 (同一帧的所有分片相同)
    /// - `marker`: 末分片标志
    fn parse(&mut self, payload: &[u8], timestamp: u32, marker: bool)
    -> MeiResult<Option<Packet>>;
}
