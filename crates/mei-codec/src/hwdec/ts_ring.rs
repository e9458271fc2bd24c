//! 显示/解码时间戳环.
//!
//! 硬件管线的输出顺序 (显示顺序) 与提交顺序 (解码顺序) 不同,
//! 且输出滞后提交若干步. 本环在提交时记录 (pts, dts) 对,
//! 在输出时按 pts 反查 dts, 并把该表项重置为哨兵以便复用.
//!
//! 环只增不减: 表项按写游标取模落位, 容量增长时既有表项的下标不变,
//! 新表项以哨兵初始化.

use log::error;
use mei_core::{MeiError, MeiResult, timestamp::NOPTS_VALUE};

/// 时间戳表项
#[derive(Debug, Clone, Copy)]
struct TsEntry {
    /// 显示时间戳 (NOPTS 表示空闲)
    pts: i64,
    /// 解码时间戳
    dts: i64,
}

impl TsEntry {
    const EMPTY: Self = Self {
        pts: NOPTS_VALUE,
        dts: NOPTS_VALUE,
    };
}

/// 显示/解码时间戳环
#[derive(Debug)]
pub struct TimestampRing {
    entries: Vec<TsEntry>,
    /// 写游标 (单调递增, 落位时取模)
    put_cnt: u64,
}

impl TimestampRing {
    /// 创建指定容量的时间戳环 (容量至少为 1)
    ///
    /// 初始容量取 `建议表面数 + 异步深度`, 增长策略见 [`record`].
    ///
    /// [`record`]: TimestampRing::record
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: vec![TsEntry::EMPTY; capacity.max(1)],
            put_cnt: 0,
        }
    }

    /// 当前容量
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// 已记录的总次数 (写游标)
    pub fn put_count(&self) -> u64 {
        self.put_cnt
    }

    /// 记录一对 (pts, dts)
    ///
    /// `frames_decoded` 是会话至今输出的帧数, 驱动两段增长策略:
    /// - 尚无输出且环已写满: 容量翻倍 (吸收未知的管线启动延迟);
    /// - 首帧输出后的窗口内: 扩到 `写游标 + 32`
    ///   (吸收典型 GOP 的最坏重排深度, 如 I[31]P[30]B[29]...B[0]).
    ///
    /// 增长保留既有表项的下标, 新表项为哨兵.
    pub fn record(&mut self, pts: i64, dts: i64, frames_decoded: u64) -> MeiResult<()> {
        if frames_decoded == 0 && self.put_cnt as usize == self.entries.len() {
            self.grow(self.entries.len() * 2);
        } else if frames_decoded == 1 && (self.entries.len() as u64) < self.put_cnt + 32 {
            self.grow((self.put_cnt + 32) as usize);
        }

        if pts != NOPTS_VALUE && self.entries.iter().any(|e| e.pts == pts) {
            return Err(MeiError::InvalidArgument(format!(
                "pts {pts} 已在时间戳环中待解析"
            )));
        }

        let i = (self.put_cnt % self.entries.len() as u64) as usize;
        self.entries[i] = TsEntry { pts, dts };
        self.put_cnt += 1;
        Ok(())
    }

    /// 按 pts 解析 dts, 并使该表项失效
    ///
    /// `NOPTS` 解析为 `NOPTS`. 找不到表项说明重排深度估算有误,
    /// 返回内部错误.
    pub fn resolve(&mut self, pts: i64) -> MeiResult<i64> {
        if pts == NOPTS_VALUE {
            return Ok(NOPTS_VALUE);
        }

        match self.entries.iter_mut().find(|e| e.pts == pts) {
            Some(entry) => {
                let dts = entry.dts;
                entry.pts = NOPTS_VALUE;
                Ok(dts)
            }
            None => {
                error!("请求的 pts {pts} 不对应任何已记录的 dts");
                Err(MeiError::Internal(format!(
                    "时间戳环中找不到 pts {pts}, 重排深度估算有误"
                )))
            }
        }
    }

    /// 把所有表项重置为哨兵 (flush 用, 保留容量)
    pub fn reset_all(&mut self) {
        self.entries.fill(TsEntry::EMPTY);
        self.put_cnt = 0;
    }

    fn grow(&mut self, new_capacity: usize) {
        debug_assert!(new_capacity > self.entries.len());
        self.entries.resize(new_capacity, TsEntry::EMPTY);
    }
}
