//! 可注入的时间源.
//!
//! 解码会话的 "设备忙" 退避需要休眠与计时; 通过 trait 注入时间源,
//! 测试中可以用假时钟精确断言超时耗尽行为, 而不真正休眠.

use std::time::Duration;

/// 时间源
pub trait Clock: Send {
    /// 休眠指定毫秒数
    fn sleep_ms(&mut self, ms: u64);
}

/// 系统时钟 (真实休眠)
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep_ms(&mut self, ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_休眠() {
        let start = std::time::Instant::now();
        SystemClock.sleep_ms(1);
        assert!(start.elapsed() >= Duration::from_millis(1));
    }
}
