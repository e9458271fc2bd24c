//! 像素格式定义.
//!
//! 对标 FFmpeg 的 `AVPixelFormat`. 仅保留硬件解码输出涉及的格式.

use std::fmt;

/// 像素格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum PixelFormat {
    /// 未指定
    #[default]
    None,
    /// YUV 4:2:0 平面格式, 8 位
    Yuv420p,
    /// YUV 4:2:2 平面格式, 8 位
    Yuv422p,
    /// NV12: Y 平面 + UV 交错, 4:2:0, 8 位 (硬件解码常用)
    Nv12,
}

impl PixelFormat {
    /// 平面数量
    pub const fn plane_count(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Yuv420p | Self::Yuv422p => 3,
            Self::Nv12 => 2,
        }
    }

    /// 计算指定平面每行的字节数
    pub const fn plane_linesize(&self, plane: usize, width: u32) -> usize {
        let w = width as usize;
        match (self, plane) {
            (Self::Yuv420p | Self::Yuv422p, 0) => w,
            (Self::Yuv420p | Self::Yuv422p, 1 | 2) => w.div_ceil(2),
            (Self::Nv12, 0) => w,
            // UV 交错, 每行与 Y 等宽
            (Self::Nv12, 1) => w.div_ceil(2) * 2,
            _ => 0,
        }
    }

    /// 计算指定平面的行数
    pub const fn plane_height(&self, plane: usize, height: u32) -> usize {
        let h = height as usize;
        match (self, plane) {
            (Self::Yuv420p | Self::Nv12, 1 | 2) => h.div_ceil(2),
            (Self::Yuv422p, 1 | 2) => h,
            (_, 0) => h,
            _ => 0,
        }
    }

    /// 计算整帧字节数
    pub fn frame_size(&self, width: u32, height: u32) -> usize {
        (0..self.plane_count())
            .map(|p| self.plane_linesize(p, width) * self.plane_height(p, height))
            .sum()
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Yuv420p => "yuv420p",
            Self::Yuv422p => "yuv422p",
            Self::Nv12 => "nv12",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nv12_几何() {
        let pf = PixelFormat::Nv12;
        assert_eq!(pf.plane_count(), 2);
        assert_eq!(pf.plane_linesize(0, 1920), 1920);
        assert_eq!(pf.plane_linesize(1, 1920), 1920);
        assert_eq!(pf.plane_height(1, 1080), 540);
        assert_eq!(pf.frame_size(1920, 1080), 1920 * 1080 * 3 / 2);
    }

    #[test]
    fn test_yuv420p_奇数尺寸() {
        let pf = PixelFormat::Yuv420p;
        assert_eq!(pf.plane_linesize(1, 129), 65);
        assert_eq!(pf.plane_height(2, 97), 49);
    }
}
