//! 有理数类型, 用于帧率与时间基 (time_base).
//!
//! 对标 FFmpeg 的 `AVRational`.

use std::fmt;

/// 有理数, 由分子和分母组成
///
/// 用于表示帧率 (如 30000/1001 = 29.97fps) 和时间基 (如 1/90000 = 90kHz 时钟).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    /// 分子
    pub num: i32,
    /// 分母
    pub den: i32,
}

impl Rational {
    /// 创建新的有理数
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /// 零值
    pub const ZERO: Self = Self { num: 0, den: 1 };

    /// 未定义 (分母为 0)
    pub const UNDEFINED: Self = Self { num: 0, den: 0 };

    /// 判断是否有效 (分母不为 0)
    pub const fn is_valid(&self) -> bool {
        self.den != 0
    }

    /// 转换为 f64 浮点数
    ///
    /// 如果分母为 0, 返回 `f64::NAN`.
    pub fn to_f64(self) -> f64 {
        if self.den == 0 {
            return f64::NAN;
        }
        f64::from(self.num) / f64::from(self.den)
    }

    /// 求倒数
    pub const fn invert(self) -> Self {
        Self {
            num: self.den,
            den: self.num,
        }
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}
