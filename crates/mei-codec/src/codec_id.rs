//! 编解码器标识.
//!
//! 对标 FFmpeg 的 `AVCodecID`. 仅包含硬件解码与 RTP 重组涉及的视频编解码器.

use std::fmt;

/// 编解码器标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CodecId {
    /// 未知/未指定
    None,
    /// H.264 / AVC
    H264,
    /// MPEG-1 视频
    Mpeg1Video,
    /// MPEG-2 视频
    Mpeg2Video,
    /// VC-1 / WMV9
    Vc1,
    /// Motion JPEG
    Mjpeg,
}

impl CodecId {
    /// 获取编解码器名称
    pub const fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::H264 => "h264",
            Self::Mpeg1Video => "mpeg1video",
            Self::Mpeg2Video => "mpeg2video",
            Self::Vc1 => "vc1",
            Self::Mjpeg => "mjpeg",
        }
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
