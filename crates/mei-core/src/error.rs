//! 统一错误类型定义.
//!
//! 所有 Mei crate 共用的错误类型, 支持跨模块传播.
//!
//! 错误分为三类:
//! - 瞬态信号 (`NeedMoreData`): 由调用循环吸收, 不应透传给用户;
//! - 可恢复错误 (`InvalidData`, `MissingFragment` 等): 丢弃当前帧后继续;
//! - 致命错误 (`Internal`, `Hardware` 等): 中止当前会话.

use thiserror::Error;

/// Mei 框架统一错误类型
#[derive(Debug, Error)]
pub enum MeiError {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 不支持的操作 (如无对应的硬件编解码器映射)
    #[error("不支持的操作: {0}")]
    Unsupported(String),

    /// 硬件/设备错误 (设备失败、丢失、内存锁定失败等)
    #[error("硬件错误: {0}")]
    Hardware(String),

    /// 设备忙等待超时
    #[error("设备忙, 等待超时")]
    DeviceTimeout,

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 数据不足, 需要更多输入
    #[error("数据不足, 需要更多输入")]
    NeedMoreData,

    /// 内存分配失败
    #[error("内存分配失败: {0}")]
    OutOfMemory(String),

    /// 无效数据 (损坏或过短的数据包等)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// 帧重组: 中间分片丢失 (偏移量出现空洞)
    #[error("分片丢失, 丢弃当前帧")]
    MissingFragment,

    /// 帧重组: 分片时间戳与已提交帧不一致
    #[error("分片时间戳不匹配, 丢弃当前帧")]
    TimestampMismatch,

    /// 帧重组: 首分片缺失 (偏移量非 0 却无打开的帧)
    #[error("分片乱序: 首分片缺失")]
    OutOfOrderFragment,

    /// 功能未实现
    #[error("功能未实现: {0}")]
    NotImplemented(String),

    /// 内部错误 (不应发生)
    #[error("内部错误: {0}")]
    Internal(String),
}

/// Mei 框架统一 Result 类型
pub type MeiResult<T> = Result<T, MeiError>;
