//! 输入码流队列.
//!
//! 解码会话的输入缓冲: 待解码的压缩字节按提交顺序排队,
//! 引擎从头部消费. 在累积缓冲区之上附加当前数据块的显示时间戳,
//! 引擎把该时间戳打在由这些字节产出的帧上.

use mei_core::{ByteRun, timestamp::NOPTS_VALUE};

/// 输入码流队列
#[derive(Debug)]
pub struct Bitstream {
    /// 未消费的压缩字节
    run: ByteRun,
    /// 最近入队数据块的显示时间戳
    pub timestamp: i64,
}

impl Bitstream {
    /// 创建空码流队列
    pub fn new() -> Self {
        Self {
            run: ByteRun::new(),
            timestamp: NOPTS_VALUE,
        }
    }

    /// 入队一个压缩数据块 (追加, 空间不足时先压实)
    pub fn enqueue(&mut self, data: &[u8]) {
        self.run.append(data);
    }

    /// 查看未消费数据
    pub fn unread(&self) -> &[u8] {
        self.run.unread()
    }

    /// 消费前 `n` 个字节 (由引擎在解码推进后调用)
    pub fn consume(&mut self, n: usize) {
        self.run.consume(n);
    }

    /// 未消费字节数
    pub fn len(&self) -> usize {
        self.run.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.run.is_empty()
    }

    /// 丢弃所有未消费数据
    pub fn clear(&mut self) {
        self.run.clear();
        self.timestamp = NOPTS_VALUE;
    }
}

impl Default for Bitstream {
    fn default() -> Self {
        Self::new()
    }
}
