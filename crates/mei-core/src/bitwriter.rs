//! 比特流写入器.
//!
//! 向字节缓冲区按位写入数据, 按大端位序 (MSB first).
//! 用于合成码流头部等需要按标准文法逐字段输出的场景.

/// 比特流写入器
///
/// # 示例
/// ```
/// use mei_core::bitwriter::BitWriter;
///
/// let mut bw = BitWriter::new();
/// bw.write_bits(0xFFD8, 16); // JPEG SOI
/// assert_eq!(bw.finish(), vec![0xFF, 0xD8]);
/// ```
pub struct BitWriter {
    /// 输出缓冲区
    data: Vec<u8>,
    /// 当前字节 (正在填充)
    current_byte: u8,
    /// 当前字节中已填充的位数 (0-7)
    bit_count: u8,
}

impl BitWriter {
    /// 创建新的比特流写入器
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// 以指定容量创建比特流写入器
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            current_byte: 0,
            bit_count: 0,
        }
    }

    /// 获取已写入的总位数
    pub fn bits_written(&self) -> usize {
        self.data.len() * 8 + self.bit_count as usize
    }

    /// 写入 1 个位
    pub fn write_bit(&mut self, bit: u32) {
        self.current_byte = (self.current_byte << 1) | (bit & 1) as u8;
        self.bit_count += 1;
        if self.bit_count == 8 {
            self.data.push(self.current_byte);
            self.current_byte = 0;
            self.bit_count = 0;
        }
    }

    /// 写入 N 个位 (最多 32 位)
    ///
    /// 值的低 N 位被写入, 高位在前 (大端).
    pub fn write_bits(&mut self, value: u32, n: u32) {
        debug_assert!(n <= 32, "write_bits: n={n} 超过 32 位");

        let mut remaining = n;
        while remaining > 0 {
            let available = 8 - u32::from(self.bit_count);
            let to_write = remaining.min(available);

            let shift = remaining - to_write;
            let mask = if to_write >= 32 {
                u32::MAX
            } else {
                (1u32 << to_write) - 1
            };
            let bits = ((value >> shift) & mask) as u8;

            if to_write == 8 && self.bit_count == 0 {
                // 整字节快速路径
                self.data.push(bits);
            } else {
                self.current_byte = (self.current_byte << to_write) | bits;
                self.bit_count += to_write as u8;
                if self.bit_count >= 8 {
                    self.data.push(self.current_byte);
                    self.current_byte = 0;
                    self.bit_count = 0;
                }
            }

            remaining -= to_write;
        }
    }

    /// 写入完整字节
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        if self.bit_count == 0 {
            // 快速路径: 已对齐
            self.data.extend_from_slice(bytes);
        } else {
            for &b in bytes {
                self.write_bits(u32::from(b), 8);
            }
        }
    }

    /// 对齐到字节边界 (用 0 填充)
    pub fn align_to_byte(&mut self) {
        if self.bit_count > 0 {
            let pad = 8 - self.bit_count;
            self.current_byte <<= pad;
            self.data.push(self.current_byte);
            self.current_byte = 0;
            self.bit_count = 0;
        }
    }

    /// 完成写入, 返回字节数据
    ///
    /// 如果当前不在字节边界, 自动用 0 填充.
    pub fn finish(mut self) -> Vec<u8> {
        self.align_to_byte();
        self.data
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}
