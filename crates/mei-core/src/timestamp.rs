//! 时间戳常量与工具.
//!
//! 对标 FFmpeg 中基于 `time_base` 的时间戳系统.
//! 解码管线中 PTS (显示顺序) 与 DTS (解码顺序) 可能互不相同,
//! 两者均以 `NOPTS_VALUE` 作为 "无值" 哨兵.

/// 表示 "未定义" 的时间戳值
pub const NOPTS_VALUE: i64 = i64::MIN;

/// 判断时间戳是否有效 (非 NOPTS_VALUE)
pub const fn is_valid(ts: i64) -> bool {
    ts != NOPTS_VALUE
}
