//! 硬件解码引擎边界.
//!
//! 定义会话与硬件解码引擎之间的窄接口: 状态码、视频参数协商结果、
//! 图像结构标志以及引擎 trait 本身. 引擎内部的线程模型不透明,
//! 会话侧只通过同步点 (SyncPoint) 等待单步解码完成.

use bitflags::bitflags;
use mei_core::{MeiError, MeiResult, PixelFormat, Rational};

use crate::codec_id::CodecId;
use crate::frame::VideoFrame;
use crate::hwdec::bitstream::Bitstream;
use crate::hwdec::surface::{SurfaceId, SurfacePool};

/// 硬件引擎支持的码流编码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwCodec {
    /// H.264 / AVC
    Avc,
    /// MPEG-1/2 视频
    Mpeg2,
    /// VC-1
    Vc1,
}

/// 把编解码器标识映射到硬件编码
///
/// 无映射时返回 `Unsupported`.
pub fn codec_id_to_hw(codec_id: CodecId) -> MeiResult<HwCodec> {
    match codec_id {
        CodecId::H264 => Ok(HwCodec::Avc),
        CodecId::Mpeg1Video | CodecId::Mpeg2Video => Ok(HwCodec::Mpeg2),
        CodecId::Vc1 => Ok(HwCodec::Vc1),
        other => Err(MeiError::Unsupported(format!(
            "硬件解码不支持编解码器 {other}"
        ))),
    }
}

/// 硬件引擎实现类型 (仅用于日志)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwImpl {
    /// 软件回退实现
    Software,
    /// 硬件加速实现
    Hardware,
    /// 未知
    Unknown,
}

/// 单步解码的状态码
///
/// 对应硬件运行时的状态字: 除 `Ok` 与 `Err` 外均为瞬态信号,
/// 由会话的解码循环吸收, 不透传给调用方.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwStatus {
    /// 成功
    Ok,
    /// 需要更多输入数据
    MoreData,
    /// 需要更多输出表面
    MoreSurface,
    /// 设备忙, 稍后重试
    DeviceBusy,
    /// 检测到兼容的视频参数变化 (继续解码)
    VideoParamChanged,
    /// 检测到不兼容的视频参数变化 (需要重初始化)
    IncompatibleVideoParam,
    /// 硬件错误
    Err(HwError),
}

/// 硬件错误码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwError {
    /// 内存分配失败
    MemoryAlloc,
    /// 缓冲区不足
    NotEnoughBuffer,
    /// 无效句柄
    InvalidHandle,
    /// 设备失败
    DeviceFailed,
    /// 设备丢失
    DeviceLost,
    /// 内存锁定失败
    LockMemory,
    /// 空指针
    NullPtr,
    /// 未定义行为
    UndefinedBehavior,
    /// 未初始化
    NotInitialized,
    /// 不支持
    Unsupported,
    /// 未找到
    NotFound,
    /// 无效的视频参数
    InvalidVideoParam,
    /// 操作被中止
    Aborted,
    /// 未知错误
    Unknown,
}

/// 把硬件错误码翻译为统一错误类型
pub fn hw_error_to_mei(err: HwError) -> MeiError {
    match err {
        HwError::MemoryAlloc | HwError::NotEnoughBuffer => {
            MeiError::OutOfMemory("硬件引擎内存分配失败".into())
        }
        HwError::InvalidHandle | HwError::InvalidVideoParam => {
            MeiError::InvalidArgument(format!("硬件引擎报告无效参数: {err:?}"))
        }
        HwError::DeviceFailed | HwError::DeviceLost | HwError::LockMemory => {
            MeiError::Hardware(format!("设备故障: {err:?}"))
        }
        HwError::NullPtr | HwError::UndefinedBehavior | HwError::NotInitialized => {
            MeiError::Internal(format!("硬件引擎报告内部错误: {err:?}"))
        }
        HwError::Unsupported | HwError::NotFound => {
            MeiError::Unsupported(format!("硬件引擎不支持: {err:?}"))
        }
        HwError::Aborted | HwError::Unknown => MeiError::Hardware(format!("未知硬件错误: {err:?}")),
    }
}

bitflags! {
    /// 输出表面的图像结构标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PicStruct: u16 {
        /// 逐行帧
        const PROGRESSIVE    = 0x0001;
        /// 顶场在前
        const FIELD_TFF      = 0x0002;
        /// 底场在前
        const FIELD_BFF      = 0x0004;
        /// 场重复 (2:3 pulldown 等)
        const FIELD_REPEATED = 0x0010;
        /// 帧加倍显示
        const FRAME_DOUBLING = 0x0020;
        /// 帧三倍显示
        const FRAME_TRIPLING = 0x0040;
    }
}

/// 帧几何描述
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    /// 编码宽度 (含对齐填充)
    pub width: u32,
    /// 编码高度 (含对齐填充)
    pub height: u32,
    /// 裁剪后的显示宽度
    pub crop_width: u32,
    /// 裁剪后的显示高度
    pub crop_height: u32,
    /// 帧率
    pub frame_rate: Rational,
    /// 像素格式
    pub pixel_format: PixelFormat,
}

impl Default for FrameInfo {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            crop_width: 0,
            crop_height: 0,
            frame_rate: Rational::UNDEFINED,
            pixel_format: PixelFormat::None,
        }
    }
}

/// 协商后的视频参数
#[derive(Debug, Clone)]
pub struct HwVideoParam {
    /// 码流编码
    pub codec: HwCodec,
    /// 异步深度: 引擎允许同时在途的解码步数
    pub async_depth: u32,
    /// 帧几何
    pub frame_info: FrameInfo,
}

/// 不透明的异步完成句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPoint(pub u64);

/// 单步提交的结果
#[derive(Debug, Clone, Copy)]
pub struct DecodeStep {
    /// 状态码
    pub status: HwStatus,
    /// 产生输出时的完成句柄
    pub sync: Option<SyncPoint>,
}

/// 一次异步解码完成后的输出描述
#[derive(Debug, Clone, Copy)]
pub struct HwFrameOutput {
    /// 输出表面 (可能不同于本次提交的工作表面)
    pub surface: SurfaceId,
    /// 输出帧的显示时间戳
    pub timestamp: i64,
    /// 图像结构标志
    pub pic_struct: PicStruct,
}

/// 硬件解码引擎
///
/// 会话通过此 trait 驱动硬件: 协商参数、提交单步解码、等待完成.
/// 引擎在提交与完成之间持有工作表面的锁定标志 (通过表面池操作),
/// 并自行推进码流的消费位置.
pub trait HwDecodeEngine: Send {
    /// 实现类型 (软件/硬件), 仅用于初始化日志
    fn implementation(&self) -> HwImpl;

    /// 从码流头协商视频参数 (对应 DecodeHeader)
    fn decode_header(&mut self, data: &[u8], codec: HwCodec) -> MeiResult<HwVideoParam>;

    /// 查询建议的输出表面数量 (对应 QueryIOSurf)
    fn query_surface_count(&mut self, param: &HwVideoParam) -> MeiResult<u32>;

    /// 一次性初始化解码管线
    fn init(&mut self, param: &HwVideoParam) -> MeiResult<()>;

    /// 提交一步异步解码
    ///
    /// `bs` 为 `None` 表示模拟流结束, 排空引擎内缓存的帧.
    /// 引擎从 `bs` 消费字节, 并通过 `pool` 锁定工作表面/解锁已完成表面.
    fn decode_frame_async(
        &mut self,
        bs: Option<&mut Bitstream>,
        pool: &mut SurfacePool,
        work: SurfaceId,
    ) -> DecodeStep;

    /// 阻塞等待一次异步解码完成 (有界等待, 超时毫秒)
    fn sync_operation(&mut self, sync: SyncPoint, timeout_ms: u64) -> MeiResult<HwFrameOutput>;

    /// 重置解码状态 (flush 用, 保留会话)
    fn reset(&mut self, param: &HwVideoParam) -> HwStatus;

    /// 关闭硬件会话
    fn close(&mut self) -> HwStatus;
}

/// 外部图像缓冲区分配回调
///
/// 表面创建与输出后的缓冲区替换都通过此回调向宿主申请可写帧缓冲.
pub trait FrameAllocator: Send {
    /// 按几何描述分配一个可写的图像缓冲区
    fn alloc_frame(&mut self, info: &FrameInfo) -> MeiResult<VideoFrame>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_编解码器映射() {
        assert_eq!(codec_id_to_hw(CodecId::H264).unwrap(), HwCodec::Avc);
        assert_eq!(codec_id_to_hw(CodecId::Mpeg1Video).unwrap(), HwCodec::Mpeg2);
        assert_eq!(codec_id_to_hw(CodecId::Mpeg2Video).unwrap(), HwCodec::Mpeg2);
        assert_eq!(codec_id_to_hw(CodecId::Vc1).unwrap(), HwCodec::Vc1);
        assert!(matches!(
            codec_id_to_hw(CodecId::Mjpeg),
            Err(MeiError::Unsupported(_))
        ));
    }

    #[test]
    fn test_错误码翻译() {
        assert!(matches!(
            hw_error_to_mei(HwError::MemoryAlloc),
            MeiError::OutOfMemory(_)
        ));
        assert!(matches!(
            hw_error_to_mei(HwError::DeviceLost),
            MeiError::Hardware(_)
        ));
        assert!(matches!(
            hw_error_to_mei(HwError::NotInitialized),
            MeiError::Internal(_)
        ));
        assert!(matches!(
            hw_error_to_mei(HwError::Unsupported),
            MeiError::Unsupported(_)
        ));
    }
}
