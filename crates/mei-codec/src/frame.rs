//! 解码后的视频帧 (VideoFrame).
//!
//! 对标 FFmpeg 的 `AVFrame`, 包含解码输出的原始像素数据、
//! 时间戳以及隔行/重复场元数据.

use mei_core::{PixelFormat, Rational, timestamp::NOPTS_VALUE};

/// 视频帧
///
/// 多平面存储, 例如 NV12 有 2 个平面: Y 与交错的 UV.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// 各平面的像素数据
    pub data: Vec<Vec<u8>>,
    /// 各平面每行的字节数 (linesize / stride)
    pub linesize: Vec<usize>,
    /// 宽度 (像素)
    pub width: u32,
    /// 高度 (像素)
    pub height: u32,
    /// 像素格式
    pub pixel_format: PixelFormat,
    /// 显示时间戳 (PTS)
    pub pts: i64,
    /// 解码时间戳 (DTS)
    pub dts: i64,
    /// 帧率 (来自码流头协商)
    pub frame_rate: Rational,
    /// 是否为关键帧
    pub is_keyframe: bool,
    /// 是否为隔行帧
    pub interlaced: bool,
    /// 顶场在前
    pub top_field_first: bool,
    /// 重复显示计数: 场重复 = 1, 帧加倍 = 2, 帧三倍 = 4
    pub repeat_pict: u32,
}

impl VideoFrame {
    /// 创建空的视频帧 (平面数据待填充)
    pub fn new(width: u32, height: u32, pixel_format: PixelFormat) -> Self {
        let plane_count = pixel_format.plane_count();
        Self {
            data: vec![Vec::new(); plane_count],
            linesize: vec![0; plane_count],
            width,
            height,
            pixel_format,
            pts: NOPTS_VALUE,
            dts: NOPTS_VALUE,
            frame_rate: Rational::UNDEFINED,
            is_keyframe: false,
            interlaced: false,
            top_field_first: false,
            repeat_pict: 0,
        }
    }

    /// 创建已按几何尺寸分配好平面存储的视频帧
    pub fn alloc(width: u32, height: u32, pixel_format: PixelFormat) -> Self {
        let mut frame = Self::new(width, height, pixel_format);
        for p in 0..pixel_format.plane_count() {
            let ls = pixel_format.plane_linesize(p, width);
            let ph = pixel_format.plane_height(p, height);
            frame.data[p] = vec![0; ls * ph];
            frame.linesize[p] = ls;
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_平面尺寸() {
        let frame = VideoFrame::alloc(64, 48, PixelFormat::Nv12);
        assert_eq!(frame.data.len(), 2);
        assert_eq!(frame.data[0].len(), 64 * 48);
        assert_eq!(frame.data[1].len(), 64 * 24);
        assert_eq!(frame.linesize, vec![64, 64]);
        assert_eq!(frame.pts, NOPTS_VALUE);
    }
}
