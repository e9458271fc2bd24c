//! 字节串累积缓冲区.
//!
//! 可增长的字节缓冲区, 支持 "追加 + 压实" 语义:
//! 既作为解码会话的输入码流队列 (追加尾部, 消费头部),
//! 也作为帧重组器的累积缓冲区 (纯追加, 最终取出完整字节串).
//!
//! 当尾部剩余空间不足时, 追加操作会先把未消费数据搬移到偏移 0,
//! 使总分配量以高水位为界, 而不随累计追加量无限增长.

/// 字节串累积缓冲区
#[derive(Debug, Default)]
pub struct ByteRun {
    /// 存储 (有效内容为 `[0, head + len)`)
    buf: Vec<u8>,
    /// 已消费前缀长度
    head: usize,
    /// 未消费字节数
    len: usize,
}

impl ByteRun {
    /// 创建空缓冲区
    pub fn new() -> Self {
        Self::default()
    }

    /// 以指定初始容量创建
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            head: 0,
            len: 0,
        }
    }

    /// 未消费字节数
    pub fn len(&self) -> usize {
        self.len
    }

    /// 是否无未消费数据
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 当前分配容量
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// 追加字节到逻辑末尾
    ///
    /// 尾部空间不足时先压实 (未消费数据搬移到偏移 0), 仍不足时
    /// 由 `Vec` 按几何策略扩容.
    pub fn append(&mut self, bytes: &[u8]) {
        if self.head > 0 && self.head + self.len + bytes.len() > self.buf.capacity() {
            self.buf.drain(..self.head);
            self.head = 0;
        }
        self.buf.extend_from_slice(bytes);
        self.len += bytes.len();
    }

    /// 查看未消费数据
    pub fn unread(&self) -> &[u8] {
        &self.buf[self.head..self.head + self.len]
    }

    /// 消费前 `n` 个字节 (超出部分按剩余量截断)
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.len);
        self.head += n;
        self.len -= n;
    }

    /// 丢弃所有数据, 保留已分配的存储
    pub fn clear(&mut self) {
        self.buf.clear();
        self.head = 0;
        self.len = 0;
    }

    /// 完成累积, 取出未消费的完整字节串
    pub fn into_vec(mut self) -> Vec<u8> {
        if self.head > 0 {
            self.buf.drain(..self.head);
        }
        self.buf.truncate(self.len);
        self.buf
    }
}
