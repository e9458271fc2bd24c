//! RTP/JPEG 载荷重组器 (RFC 2435).
//!
//! RTP/JPEG 为了省带宽, 去掉了 JPEG 交换格式的全部头部, 只在每个
//! 分片前附一个 8 字节紧凑头 (偏移量、类型、量化指示、块尺寸),
//! 量化表仅随首分片携带 (或约定使用默认表). 重组时需要从这些
//! 紧凑元数据合成一个字节级符合标准文法的帧头 (量化表 + 标准
//! Huffman 表 + 帧/扫描描述), 再拼接各分片载荷与 EOI 标记,
//! 得到自包含的 JPEG 压缩帧.
//!
//! # 紧凑头布局 (8 字节, 大端)
//! ```text
//! ┌────────────────────────────────────────────┐
//! │ type-specific                        1 byte│
//! │ 分片字节偏移                        3 bytes│
//! │ 类型码 (解码参数 id)                 1 byte│
//! │ 量化指示 q (≥128: 首分片携带表)      1 byte│
//! │ 宽 (8 像素块数)                      1 byte│
//! │ 高 (8 像素块数)                      1 byte│
//! └────────────────────────────────────────────┘
//! ```

use byteorder::{BigEndian, ByteOrder};
use log::{debug, error, warn};
use mei_codec::{CodecId, Packet, mjpeg};
use mei_core::{BitWriter, ByteRun, MeiError, MeiResult};

use crate::rtp::Depacketizer;

/// 紧凑头长度 (字节)
const MAIN_HEADER_SIZE: usize = 8;
/// 量化表扩展头长度 (字节)
const QTABLE_HEADER_SIZE: usize = 4;

/// 写入一个 JPEG 标记 (0xFF + 标记码)
fn put_marker(bw: &mut BitWriter, marker: u8) {
    bw.write_bits(0xFF, 8);
    bw.write_bits(u32::from(marker), 8);
}

/// 写入一个 DHT 段 (含计算出的段长)
fn put_huffman_table(
    bw: &mut BitWriter,
    table_class: u32,
    table_id: u32,
    bits_table: &[u8; 17],
    value_table: &[u8],
) {
    put_marker(bw, mjpeg::DHT);

    let n: usize = bits_table[1..].iter().map(|&b| usize::from(b)).sum();
    debug_assert_eq!(n, value_table.len());

    // 段长 = 长度字段 2 + 类别/编号 1 + 码长计数 16 + 码值 n
    bw.write_bits((19 + n) as u32, 16);
    bw.write_bits(table_class, 4);
    bw.write_bits(table_id, 4);
    bw.write_bytes(&bits_table[1..]);
    bw.write_bytes(value_table);
}

/// 从紧凑逐包元数据合成标准 JPEG 帧头
///
/// 纯函数, 输出逐字节确定: SOI、JFIF APP0、量化表段 (1 或 2 张表,
/// 表 id 0/1)、四个固定 Huffman 表段、SOF0 与 SOS.
/// `qtables` 超过 64 字节时视为两张表 (亮度 + 色度).
pub fn synthesize_frame_header(
    type_code: u8,
    width_blocks: u8,
    height_blocks: u8,
    qtables: &[u8],
) -> Vec<u8> {
    let nb_qtables = if qtables.len() > 64 { 2 } else { 1 };
    // 块数换算为像素
    let width = u32::from(width_blocks) << 3;
    let height = u32::from(height_blocks) << 3;

    let mut bw = BitWriter::with_capacity(1024);

    // SOI
    put_marker(&mut bw, mjpeg::SOI);

    // JFIF APP0
    put_marker(&mut bw, mjpeg::APP0);
    bw.write_bits(16, 16);
    bw.write_bytes(b"JFIF\0");
    bw.write_bits(0x0201, 16);
    bw.write_bits(0, 8);
    bw.write_bits(1, 16);
    bw.write_bits(1, 16);
    bw.write_bits(0, 8);
    bw.write_bits(0, 8);

    // DQT: 两张表共用一个段, 表 id 0 与 1
    put_marker(&mut bw, mjpeg::DQT);
    bw.write_bits(2 + nb_qtables * (1 + 64), 16);
    bw.write_bits(0, 8);
    bw.write_bytes(&qtables[..64]);
    if nb_qtables == 2 {
        bw.write_bits(1, 8);
        bw.write_bytes(&qtables[64..128]);
    }

    // 四个固定 Huffman 表段
    put_huffman_table(&mut bw, 0, 0, &mjpeg::BITS_DC_LUMINANCE, &mjpeg::VAL_DC);
    put_huffman_table(&mut bw, 0, 1, &mjpeg::BITS_DC_CHROMINANCE, &mjpeg::VAL_DC);
    put_huffman_table(
        &mut bw,
        1,
        0,
        &mjpeg::BITS_AC_LUMINANCE,
        &mjpeg::VAL_AC_LUMINANCE,
    );
    put_huffman_table(
        &mut bw,
        1,
        1,
        &mjpeg::BITS_AC_CHROMINANCE,
        &mjpeg::VAL_AC_CHROMINANCE,
    );

    // SOF0
    put_marker(&mut bw, mjpeg::SOF0);
    bw.write_bits(17, 16);
    bw.write_bits(8, 8);
    bw.write_bits(height, 16);
    bw.write_bits(width, 16);
    bw.write_bits(3, 8);
    bw.write_bits(1, 8);
    // 类型码非 0 表示 4:2:0 (2x2 子采样), 否则 4:2:2 (2x1)
    bw.write_bits(if type_code != 0 { 34 } else { 33 }, 8);
    bw.write_bits(0, 8);
    bw.write_bits(2, 8);
    bw.write_bits(17, 8);
    bw.write_bits(if nb_qtables == 2 { 1 } else { 0 }, 8);
    bw.write_bits(3, 8);
    bw.write_bits(17, 8);
    bw.write_bits(if nb_qtables == 2 { 1 } else { 0 }, 8);

    // SOS
    put_marker(&mut bw, mjpeg::SOS);
    bw.write_bits(12, 16);
    bw.write_bits(3, 8);
    bw.write_bits(1, 8);
    bw.write_bits(0, 8);
    bw.write_bits(2, 8);
    bw.write_bits(17, 8);
    bw.write_bits(3, 8);
    bw.write_bits(17, 8);
    bw.write_bits(0, 8);
    bw.write_bits(63, 8);
    bw.write_bits(0, 8);

    bw.finish()
}

/// 帧重组状态
enum FrameState {
    /// 空闲, 等待首分片
    Idle,
    /// 正在累积分片
    Assembling {
        /// 帧缓冲 (已含合成头)
        frame: ByteRun,
        /// 已提交的帧时间戳
        timestamp: u32,
        /// 合成头的字节长度 (计算期望的下一分片偏移用)
        hdr_len: usize,
    },
}

/// RTP/JPEG 载荷重组器
///
/// 每帧生命周期: 偏移 0 的分片打开帧, 末分片标志闭合并产出帧,
/// 任何连续性或时间戳不匹配丢弃当前帧 —— 状态机在下一个
/// 偏移 0 的分片上自愈, 错误不会跨帧传播.
pub struct JpegDepacketizer {
    /// 帧重组状态
    state: FrameState,
    /// 产出 Packet 的目标流索引
    stream_index: usize,
}

impl JpegDepacketizer {
    /// 创建重组器, 产出的帧归属 `stream_index`
    pub fn new(stream_index: usize) -> Self {
        Self {
            state: FrameState::Idle,
            stream_index,
        }
    }

    /// 丢弃进行中的帧
    fn abandon(&mut self) {
        if matches!(self.state, FrameState::Assembling { .. }) {
            self.state = FrameState::Idle;
        }
    }
}

impl Depacketizer for JpegDepacketizer {
    fn codec_id(&self) -> CodecId {
        CodecId::Mjpeg
    }

    fn name(&self) -> &str {
        "jpeg"
    }

    fn parse(
        &mut self,
        payload: &[u8],
        timestamp: u32,
        marker: bool,
    ) -> MeiResult<Option<Packet>> {
        if payload.len() < MAIN_HEADER_SIZE {
            error!("RTP/JPEG 包过短: {} 字节", payload.len());
            return Err(MeiError::InvalidData("RTP/JPEG 包过短".into()));
        }

        // 解析紧凑主头
        let off = BigEndian::read_u24(&payload[1..4]);
        let type_code = payload[4];
        let q = payload[5];
        let width_blocks = payload[6];
        let height_blocks = payload[7];
        let mut buf = &payload[MAIN_HEADER_SIZE..];

        if type_code > 63 {
            error!("RTP/JPEG 重启标记头未实现 (类型码 {type_code})");
            return Err(MeiError::NotImplemented("RTP/JPEG 重启标记头".into()));
        }

        // 解析量化表扩展头 (仅首分片, q ≥ 128 时)
        let mut qtables: Option<&[u8]> = None;
        if q >= 128 && off == 0 {
            if buf.len() < QTABLE_HEADER_SIZE {
                error!("RTP/JPEG 包过短: 量化表头不完整");
                return Err(MeiError::InvalidData("量化表头不完整".into()));
            }

            // 首字节保留; 其后是精度与表长
            let precision = buf[1];
            let qtable_len = usize::from(BigEndian::read_u16(&buf[2..4]));
            buf = &buf[QTABLE_HEADER_SIZE..];

            if precision != 0 {
                warn!("仅支持 8 位量化表精度");
            }

            if q == 255 && qtable_len == 0 {
                error!("量化指示 255 却未携带量化表");
                return Err(MeiError::InvalidData("未携带量化表".into()));
            }

            if qtable_len > 0 {
                if buf.len() < qtable_len {
                    error!("RTP/JPEG 包过短: 量化表数据不完整");
                    return Err(MeiError::InvalidData("量化表数据不完整".into()));
                }
                let needed = if qtable_len > 64 { 128 } else { 64 };
                if qtable_len < needed {
                    error!("量化表长度 {qtable_len} 不足 {needed} 字节");
                    return Err(MeiError::InvalidData("量化表长度不足".into()));
                }
                qtables = Some(&buf[..qtable_len]);
                buf = &buf[qtable_len..];
            }
        }

        if off == 0 {
            // 首分片: 若有进行中的帧, 其末分片必然已丢失, 丢弃之
            if matches!(self.state, FrameState::Assembling { .. }) {
                debug!("收到新的首分片, 丢弃未完成的帧");
                self.abandon();
            }

            let Some(qt) = qtables else {
                error!("默认量化表未实现");
                return Err(MeiError::NotImplemented("RTP/JPEG 默认量化表".into()));
            };

            // 合成可前置于载荷的帧头, 得到交换格式的 JPEG 压缩帧
            let hdr = synthesize_frame_header(type_code, width_blocks, height_blocks, qt);
            let mut frame = ByteRun::with_capacity(hdr.len() + buf.len());
            frame.append(&hdr);
            self.state = FrameState::Assembling {
                hdr_len: hdr.len(),
                frame,
                timestamp,
            };
        }

        let FrameState::Assembling {
            frame,
            timestamp: committed,
            hdr_len,
        } = &mut self.state
        else {
            error!("收到无首分片的数据包, 丢弃");
            return Err(MeiError::OutOfOrderFragment);
        };

        if *committed != timestamp {
            // 时间戳不一致说明某个首分片已丢失
            error!("分片时间戳不匹配: 帧 {committed}, 包 {timestamp}");
            self.abandon();
            return Err(MeiError::TimestampMismatch);
        }

        if off as usize != frame.len() - *hdr_len {
            error!(
                "分片偏移不连续: 期望 {}, 实际 {off}",
                frame.len() - *hdr_len
            );
            self.abandon();
            return Err(MeiError::MissingFragment);
        }

        frame.append(buf);

        if marker {
            // 末分片: 补上 EOI, 产出完整帧
            frame.append(&[0xFF, mjpeg::EOI]);

            let FrameState::Assembling { frame, .. } =
                std::mem::replace(&mut self.state, FrameState::Idle)
            else {
                unreachable!()
            };
            let data = frame.into_vec();
            debug!("重组完成: {} 字节, 时间戳 {timestamp}", data.len());

            let mut pkt = Packet::from_data(data);
            pkt.pts = i64::from(timestamp);
            pkt.stream_index = self.stream_index;
            pkt.is_keyframe = true;
            return Ok(Some(pkt));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 构造一个 RTP/JPEG 载荷
    fn build_payload(
        off: u32,
        type_code: u8,
        q: u8,
        qtables: Option<&[u8]>,
        data: &[u8],
    ) -> Vec<u8> {
        let mut p = vec![0u8];
        p.extend_from_slice(&off.to_be_bytes()[1..]);
        p.push(type_code);
        p.push(q);
        p.push(16); // 宽 128 像素
        p.push(12); // 高 96 像素
        if let Some(qt) = qtables {
            p.push(0); // 保留
            p.push(0); // 精度
            p.extend_from_slice(&(qt.len() as u16).to_be_bytes());
            p.extend_from_slice(qt);
        }
        p.extend_from_slice(data);
        p
    }

    #[test]
    fn test_帧头_确定性与标记() {
        let qt = [16u8; 64];
        let hdr = synthesize_frame_header(0, 16, 12, &qt);
        assert_eq!(hdr, synthesize_frame_header(0, 16, 12, &qt));

        // SOI 开头
        assert_eq!(&hdr[..2], &[0xFF, mjpeg::SOI]);
        // SOS 段结尾 (段长 12: 3 分量 + 谱选择)
        let sos = [
            0xFF, mjpeg::SOS, 0x00, 0x0C, 3, 1, 0x00, 2, 0x11, 3, 0x11, 0, 63, 0,
        ];
        assert_eq!(&hdr[hdr.len() - sos.len()..], &sos);
        // 单张量化表的总长固定
        assert_eq!(hdr.len(), 554);
    }

    #[test]
    fn test_帧头_双表与子采样() {
        let qt = [16u8; 128];
        let hdr = synthesize_frame_header(1, 16, 12, &qt);
        assert_eq!(hdr.len(), 554 + 65);

        // DQT 段长覆盖两张表
        let dqt_pos = hdr.windows(2).position(|w| w == [0xFF, mjpeg::DQT]).unwrap();
        assert_eq!(&hdr[dqt_pos + 2..dqt_pos + 4], &[0x00, 0x84]); // 2 + 2*65

        // 类型码 1 → 4:2:0 (2x2 子采样); 分量 1 的采样因子在段内偏移 11
        let sof_pos = hdr.windows(2).position(|w| w == [0xFF, mjpeg::SOF0]).unwrap();
        assert_eq!(hdr[sof_pos + 11], 34);
    }

    #[test]
    fn test_重组_两分片成帧() {
        let mut dp = JpegDepacketizer::new(2);
        let qt = [16u8; 64];
        let a = [0xAAu8; 100];
        let b = [0xBBu8; 50];

        let p1 = build_payload(0, 0, 255, Some(&qt), &a);
        assert!(dp.parse(&p1, 1000, false).unwrap().is_none());

        let p2 = build_payload(a.len() as u32, 0, 255, None, &b);
        let pkt = dp.parse(&p2, 1000, true).unwrap().unwrap();

        let hdr = synthesize_frame_header(0, 16, 12, &qt);
        let mut expected = hdr;
        expected.extend_from_slice(&a);
        expected.extend_from_slice(&b);
        expected.extend_from_slice(&[0xFF, mjpeg::EOI]);
        assert_eq!(&pkt.data[..], &expected[..]);
        assert_eq!(pkt.pts, 1000);
        assert_eq!(pkt.stream_index, 2);
        assert!(pkt.is_keyframe);
    }

    #[test]
    fn test_重组_分片缺口_丢帧后自愈() {
        let mut dp = JpegDepacketizer::new(0);
        let qt = [16u8; 64];
        let a = [0xAAu8; 100];

        let p1 = build_payload(0, 0, 255, Some(&qt), &a);
        assert!(dp.parse(&p1, 1000, false).unwrap().is_none());

        // 偏移出现 5 字节空洞
        let p2 = build_payload(a.len() as u32 + 5, 0, 255, None, &a);
        assert!(matches!(
            dp.parse(&p2, 1000, true),
            Err(MeiError::MissingFragment)
        ));

        // 下一个首分片重新开帧
        let p3 = build_payload(0, 0, 255, Some(&qt), &a);
        assert!(dp.parse(&p3, 2000, false).unwrap().is_none());
        let p4 = build_payload(a.len() as u32, 0, 255, None, &a);
        assert!(dp.parse(&p4, 2000, true).unwrap().is_some());
    }

    #[test]
    fn test_重组_时间戳不匹配() {
        let mut dp = JpegDepacketizer::new(0);
        let qt = [16u8; 64];
        let a = [0xAAu8; 100];

        let p1 = build_payload(0, 0, 255, Some(&qt), &a);
        assert!(dp.parse(&p1, 1000, false).unwrap().is_none());

        let p2 = build_payload(a.len() as u32, 0, 255, None, &a);
        assert!(matches!(
            dp.parse(&p2, 1001, true),
            Err(MeiError::TimestampMismatch)
        ));

        // 帧已丢弃, 非首分片被拒
        let p3 = build_payload(a.len() as u32, 0, 255, None, &a);
        assert!(matches!(
            dp.parse(&p3, 1000, true),
            Err(MeiError::OutOfOrderFragment)
        ));
    }

    #[test]
    fn test_首分片缺失() {
        let mut dp = JpegDepacketizer::new(0);
        let p = build_payload(100, 0, 255, None, &[0u8; 10]);
        assert!(matches!(
            dp.parse(&p, 1000, true),
            Err(MeiError::OutOfOrderFragment)
        ));
    }

    #[test]
    fn test_畸形包() {
        let mut dp = JpegDepacketizer::new(0);

        // 过短
        assert!(matches!(
            dp.parse(&[0u8; 7], 0, false),
            Err(MeiError::InvalidData(_))
        ));

        // 重启标记扩展未实现
        let p = build_payload(0, 64, 255, Some(&[16u8; 64]), &[]);
        assert!(matches!(
            dp.parse(&p, 0, false),
            Err(MeiError::NotImplemented(_))
        ));

        // q == 255 且表长为 0
        let mut p = build_payload(0, 0, 255, None, &[]);
        p.extend_from_slice(&[0, 0, 0, 0]);
        assert!(matches!(
            dp.parse(&p, 0, false),
            Err(MeiError::InvalidData(_))
        ));

        // q < 128 的首分片未携带表 (默认表未实现)
        let p = build_payload(0, 0, 50, None, &[0u8; 10]);
        assert!(matches!(
            dp.parse(&p, 0, false),
            Err(MeiError::NotImplemented(_))
        ));
    }
}
