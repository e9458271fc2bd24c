//! 硬件解码会话状态机.
//!
//! 每次 `decode()` 调用执行一轮 "提交/轮询/取回" 循环:
//!
//! 1. 非空数据块入待提交队列;
//! 2. 引擎报告 "需要更多输入" 时, 从队列取出一块, 把 (pts, dts)
//!    记入时间戳环并喂入码流队列; 空包代表流结束, 转为排空模式;
//! 3. 从表面池取一个空闲表面, 提交一步异步解码;
//! 4. 设备忙则休眠后重试, 累计超出预算时报 `DeviceTimeout`;
//! 5. 产生完成句柄时有界等待硬件完成, 按输出 pts 反查 dts,
//!    把表面缓冲区换成新分配的缓冲区后交还解码帧.
//!
//! 不兼容的参数变化先排空缓存帧, 然后由宿主调用 `reinit()`
//! 重建硬件状态 (已排队的数据块被丢弃).

use std::collections::VecDeque;

use log::{debug, info, warn};
use mei_core::{Clock, MeiError, MeiResult};

use crate::codec_id::CodecId;
use crate::frame::VideoFrame;
use crate::hwdec::bitstream::Bitstream;
use crate::hwdec::engine::{
    DecodeStep, FrameAllocator, FrameInfo, HwDecodeEngine, HwImpl, HwStatus, HwVideoParam,
    PicStruct, SyncPoint, codec_id_to_hw, hw_error_to_mei,
};
use crate::hwdec::surface::SurfacePool;
use crate::hwdec::ts_ring::TimestampRing;
use crate::packet::Packet;

/// 等待单步解码完成的上限 (毫秒)
const SYNC_TIMEOUT_MS: u64 = 60_000;
/// 设备忙退避的单次休眠量 (毫秒)
const BUSY_SLEEP_MS: u64 = 1;

/// 一次 `decode()` 调用的产出
#[derive(Debug)]
pub struct DecodeOutput {
    /// 取回的解码帧 (管线有延迟, 可能为空)
    pub frame: Option<VideoFrame>,
    /// 本次调用接受的输入字节数 (整块计, 部分消费由内部队列处理)
    pub consumed: usize,
}

/// 硬件解码会话
pub struct HwDecodeSession {
    /// 硬件解码引擎 (独占)
    engine: Box<dyn HwDecodeEngine>,
    /// 宿主图像缓冲区分配回调
    allocator: Box<dyn FrameAllocator>,
    /// 注入的时间源 (忙退避休眠)
    clock: Box<dyn Clock>,
    /// 编解码器标识
    codec_id: CodecId,
    /// 协商后的视频参数
    param: HwVideoParam,
    /// 输入码流队列
    bs: Bitstream,
    /// 输出表面池
    pool: SurfacePool,
    /// 时间戳环
    ring: TimestampRing,
    /// 待提交的压缩数据块 (FIFO)
    pending: VecDeque<Packet>,
    /// 上一轮循环的最终状态, 下次调用从这里继续
    last_status: HwStatus,
    /// 设备忙累计等待预算 (毫秒)
    busy_timeout_ms: u64,
    /// 检测到不兼容参数变化, 排空后需要重初始化
    need_reinit: bool,
    /// 已输出的帧数
    decoded_cnt: u64,
}

impl HwDecodeSession {
    /// 打开解码会话
    ///
    /// 用 `header_data` (首个含序列头的压缩数据块) 协商编解码器与
    /// 几何参数, 按 `建议表面数 + 异步深度` 确定时间戳环容量,
    /// 并完成一次性硬件管线初始化.
    ///
    /// # 错误
    /// - `Unsupported`: 编解码器无硬件映射
    /// - `Hardware`: 协商或初始化失败
    pub fn open(
        engine: Box<dyn HwDecodeEngine>,
        allocator: Box<dyn FrameAllocator>,
        clock: Box<dyn Clock>,
        codec_id: CodecId,
        header_data: &[u8],
        busy_timeout_ms: u64,
    ) -> MeiResult<Self> {
        let hw_codec = codec_id_to_hw(codec_id)?;

        let mut bs = Bitstream::new();
        bs.enqueue(header_data);

        let mut session = Self {
            engine,
            allocator,
            clock,
            codec_id,
            param: HwVideoParam {
                codec: hw_codec,
                async_depth: 0,
                frame_info: FrameInfo::default(),
            },
            bs,
            pool: SurfacePool::new(),
            ring: TimestampRing::new(1),
            pending: VecDeque::new(),
            last_status: HwStatus::MoreData,
            busy_timeout_ms,
            need_reinit: false,
            decoded_cnt: 0,
        };
        session.init_pipeline()?;
        Ok(session)
    }

    /// 协商参数并初始化硬件管线 (open 与 reinit 共用)
    fn init_pipeline(&mut self) -> MeiResult<()> {
        let hw_codec = codec_id_to_hw(self.codec_id)?;

        match self.engine.implementation() {
            HwImpl::Software => info!("使用软件回退解码实现"),
            HwImpl::Hardware => info!("使用硬件加速解码实现"),
            HwImpl::Unknown => info!("未知的解码实现类型"),
        }

        let param = self.engine.decode_header(self.bs.unread(), hw_codec)?;

        // 重初始化沿用已缓冲的码流数据, 首次初始化则丢弃序列头
        if !self.need_reinit {
            self.bs.clear();
        }

        let suggested = self.engine.query_surface_count(&param)?;
        self.ring = TimestampRing::new((suggested + param.async_depth) as usize);
        self.decoded_cnt = 0;
        self.last_status = HwStatus::MoreData;

        self.engine.init(&param)?;

        debug!(
            "解码管线就绪: {} {}x{} (编码尺寸 {}x{}), 帧率 {}, 建议表面数 {}, 异步深度 {}",
            self.codec_id,
            param.frame_info.crop_width,
            param.frame_info.crop_height,
            param.frame_info.width,
            param.frame_info.height,
            param.frame_info.frame_rate,
            suggested,
            param.async_depth,
        );

        self.param = param;
        Ok(())
    }

    /// 协商后的帧几何描述
    pub fn frame_info(&self) -> &FrameInfo {
        &self.param.frame_info
    }

    /// 是否需要宿主触发重初始化
    pub fn needs_reinit(&self) -> bool {
        self.need_reinit
    }

    /// 送入一个压缩数据块并尝试取回一帧
    ///
    /// 空包表示流结束, 触发引擎内缓存帧的冲刷; 重复以空包调用
    /// 直到不再产出帧即完成排空.
    pub fn decode(&mut self, pkt: &Packet) -> MeiResult<DecodeOutput> {
        let size = pkt.size();
        if size > 0 {
            self.pending.push_back(pkt.clone());
        }

        // 重初始化前不再喂入, 模拟流结束以排空引擎内缓存的帧
        let mut feeding = !self.need_reinit;
        let mut status = self.last_status;
        let mut busy_ms: u64 = 0;
        let mut sync: Option<SyncPoint> = None;

        loop {
            match status {
                HwStatus::MoreData => {
                    if !feeding {
                        break;
                    } else if let Some(p) = self.pending.pop_front() {
                        self.ring.record(p.pts, p.dts, self.decoded_cnt)?;
                        self.bs.timestamp = p.pts;
                        self.bs.enqueue(&p.data);
                    } else if size == 0 {
                        // 流结束: 停止喂入, 冲刷缓存帧
                        feeding = false;
                    } else {
                        // 需要调用方提供更多输入
                        break;
                    }
                }
                HwStatus::VideoParamChanged => {
                    // 兼容的参数变化: 引擎自行跨过新序列头, 继续喂入
                }
                HwStatus::IncompatibleVideoParam => {
                    if feeding {
                        // 停止喂入排空缓存帧, 排空完成后由宿主重初始化
                        feeding = false;
                        self.need_reinit = true;
                    } else {
                        return Err(MeiError::Internal(
                            "排空期间再次报告不兼容的视频参数变化".into(),
                        ));
                    }
                }
                _ => {}
            }

            let work = self
                .pool
                .acquire(&self.param.frame_info, self.allocator.as_mut())?;
            let bs = feeding.then_some(&mut self.bs);
            let DecodeStep { status: s, sync: sp } =
                self.engine.decode_frame_async(bs, &mut self.pool, work);
            status = s;
            if sp.is_some() {
                sync = sp;
            }

            if status == HwStatus::DeviceBusy {
                if busy_ms >= self.busy_timeout_ms {
                    warn!("设备忙, 累计等待超过 {} ms", self.busy_timeout_ms);
                    return Err(MeiError::DeviceTimeout);
                }
                self.clock.sleep_ms(BUSY_SLEEP_MS);
                busy_ms += BUSY_SLEEP_MS;
            } else {
                busy_ms = 0;
            }

            if !matches!(
                status,
                HwStatus::MoreSurface
                    | HwStatus::MoreData
                    | HwStatus::DeviceBusy
                    | HwStatus::VideoParamChanged
                    | HwStatus::IncompatibleVideoParam
            ) {
                break;
            }
        }

        self.last_status = status;

        let mut frame_out = None;
        if let Some(sp) = sync {
            let out = self.engine.sync_operation(sp, SYNC_TIMEOUT_MS)?;
            let dts = self.ring.resolve(out.timestamp)?;

            // 表面缓冲区必须换新而非原地复用, 避免硬件对已交还帧的
            // 写后读竞争
            let fresh = self.allocator.alloc_frame(&self.param.frame_info)?;
            let mut frame = self.pool.replace_buffer(out.surface, fresh);

            frame.pts = out.timestamp;
            frame.dts = dts;
            frame.frame_rate = self.param.frame_info.frame_rate;
            frame.repeat_pict = if out.pic_struct.contains(PicStruct::FRAME_TRIPLING) {
                4
            } else if out.pic_struct.contains(PicStruct::FRAME_DOUBLING) {
                2
            } else if out.pic_struct.contains(PicStruct::FIELD_REPEATED) {
                1
            } else {
                0
            };
            frame.top_field_first = out.pic_struct.contains(PicStruct::FIELD_TFF);
            frame.interlaced = !out.pic_struct.contains(PicStruct::PROGRESSIVE);

            self.decoded_cnt += 1;
            frame_out = Some(frame);
        }

        if let HwStatus::Err(e) = status {
            return Err(hw_error_to_mei(e));
        }

        Ok(DecodeOutput {
            frame: frame_out,
            consumed: size,
        })
    }

    /// 重置解码状态
    ///
    /// 重置硬件解码状态 (保留会话), 丢弃输入码流、全部表面、
    /// 时间戳环表项与待提交队列. 硬件重置失败会如实上报.
    pub fn flush(&mut self) -> MeiResult<()> {
        let status = self.engine.reset(&self.param);

        self.bs.clear();
        self.pool.destroy_all();
        self.ring.reset_all();
        self.pending.clear();
        self.last_status = HwStatus::MoreData;

        match status {
            HwStatus::Err(e) => Err(hw_error_to_mei(e)),
            _ => Ok(()),
        }
    }

    /// 关闭会话, 释放全部资源
    pub fn close(mut self) -> MeiResult<()> {
        let status = self.engine.close();

        self.pool.destroy_all();
        self.pending.clear();

        match status {
            HwStatus::Err(e) => Err(hw_error_to_mei(e)),
            _ => Ok(()),
        }
    }

    /// 重初始化: 销毁并重建硬件状态
    ///
    /// 沿用码流队列中已缓冲的序列头重新协商; 已排队未提交的
    /// 数据块被丢弃. 成功后清除重初始化标志.
    pub fn reinit(&mut self) -> MeiResult<()> {
        self.engine.close();
        self.pool.destroy_all();
        self.pending.clear();

        self.init_pipeline()?;
        self.need_reinit = false;
        Ok(())
    }
}
