//! 压缩数据包 (Packet).
//!
//! 对标 FFmpeg 的 `AVPacket`, 表示一帧压缩数据及其时间戳.

use bytes::Bytes;
use mei_core::timestamp::NOPTS_VALUE;

/// 压缩数据包
///
/// 送入解码会话的压缩数据块, 或由帧重组器产出的完整压缩帧.
/// 空包 (data 为空) 送入解码会话表示流结束, 触发缓存帧冲刷.
#[derive(Debug, Clone)]
pub struct Packet {
    /// 压缩数据
    pub data: Bytes,
    /// 显示时间戳 (PTS)
    pub pts: i64,
    /// 解码时间戳 (DTS)
    pub dts: i64,
    /// 所属流的索引
    pub stream_index: usize,
    /// 是否为关键帧
    pub is_keyframe: bool,
}

impl Packet {
    /// 创建空数据包 (flush 包)
    pub fn empty() -> Self {
        Self {
            data: Bytes::new(),
            pts: NOPTS_VALUE,
            dts: NOPTS_VALUE,
            stream_index: 0,
            is_keyframe: false,
        }
    }

    /// 从数据创建数据包
    pub fn from_data(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            ..Self::empty()
        }
    }

    /// 数据大小 (字节)
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 是否为空包 (flush 包)
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
