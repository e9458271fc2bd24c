//! 硬件解码会话集成测试
//!
//! 用脚本化引擎模拟异步解码管线的完整行为:
//! - 管线启动延迟 (先喂若干块才出第一帧)
//! - 解码顺序与显示顺序不同时的 dts 反查
//! - 流结束排空
//! - 设备忙退避重试
//! - 不兼容参数变化 → 排空 → 重初始化

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    use mei_codec::codec_id::CodecId;
    use mei_codec::hwdec::bitstream::Bitstream;
    use mei_codec::hwdec::engine::{
        DecodeStep, FrameAllocator, FrameInfo, HwCodec, HwDecodeEngine, HwFrameOutput, HwImpl,
        HwStatus, HwVideoParam, PicStruct, SyncPoint,
    };
    use mei_codec::hwdec::session::HwDecodeSession;
    use mei_codec::hwdec::surface::{SurfaceId, SurfacePool};
    use mei_codec::packet::Packet;
    use mei_codec::frame::VideoFrame;
    use mei_core::clock::Clock;
    use mei_core::timestamp::NOPTS_VALUE;
    use mei_core::{MeiError, MeiResult, PixelFormat, Rational};

    /// 脚本化解码引擎
    ///
    /// 内部缓冲输入块的 pts, 缓冲量超过 `delay` 后按 pts 升序
    /// (模拟显示顺序) 逐帧产出.
    struct ScriptedEngine {
        /// 出第一帧前需要缓冲的输入块数
        delay: usize,
        /// 已缓冲的 pts (解码顺序)
        buffered: Vec<i64>,
        /// 已提交待同步的输出
        in_flight: HashMap<u64, (SurfaceId, i64)>,
        /// 已同步完成、待解锁的表面
        done: Vec<SurfaceId>,
        next_sync: u64,
        /// 已消费的输入块数
        consumed: usize,
        /// 消费到第 N 块时报告一次不兼容参数变化
        param_change_at: Option<usize>,
        /// 每次 decode_header 后递增, 驱动几何变化
        generation: u32,
        /// 开头连续报告设备忙的次数
        busy_count: usize,
    }

    impl ScriptedEngine {
        fn new(delay: usize) -> Self {
            Self {
                delay,
                buffered: Vec::new(),
                in_flight: HashMap::new(),
                done: Vec::new(),
                next_sync: 0,
                consumed: 0,
                param_change_at: None,
                generation: 0,
                busy_count: 0,
            }
        }

        /// 按显示顺序 (pts 升序) 取出一帧并锁定工作表面
        fn emit(&mut self, pool: &mut SurfacePool, work: SurfaceId) -> DecodeStep {
            let min_idx = self
                .buffered
                .iter()
                .enumerate()
                .min_by_key(|&(_, &pts)| pts)
                .map(|(i, _)| i)
                .unwrap();
            let pts = self.buffered.remove(min_idx);

            // 模拟硬件写入: 亮度平面填充与 pts 相关的灰度
            let info = pool.get(work).info;
            assert_eq!(info.pixel_format, PixelFormat::Nv12);
            let luma = luma_for(pts);
            let buffer = &mut pool.get_mut(work).buffer;
            assert_eq!(buffer.data[0].len(), (info.width * info.height) as usize);
            buffer.data[0].fill(luma);

            pool.lock(work);
            let id = self.next_sync;
            self.next_sync += 1;
            self.in_flight.insert(id, (work, pts));
            DecodeStep {
                status: HwStatus::Ok,
                sync: Some(SyncPoint(id)),
            }
        }
    }

    impl HwDecodeEngine for ScriptedEngine {
        fn implementation(&self) -> HwImpl {
            HwImpl::Software
        }

        fn decode_header(&mut self, data: &[u8], codec: HwCodec) -> MeiResult<HwVideoParam> {
            assert!(!data.is_empty(), "协商需要码流头数据");
            self.generation += 1;
            // 第二代序列头分辨率翻倍
            let w = 64 * self.generation;
            let h = 48 * self.generation;
            Ok(HwVideoParam {
                codec,
                async_depth: 2,
                frame_info: FrameInfo {
                    width: w,
                    height: h,
                    crop_width: w - 2,
                    crop_height: h - 2,
                    frame_rate: Rational::new(25, 1),
                    pixel_format: PixelFormat::Nv12,
                },
            })
        }

        fn query_surface_count(&mut self, _param: &HwVideoParam) -> MeiResult<u32> {
            Ok(3)
        }

        fn init(&mut self, _param: &HwVideoParam) -> MeiResult<()> {
            Ok(())
        }

        fn decode_frame_async(
            &mut self,
            bs: Option<&mut Bitstream>,
            pool: &mut SurfacePool,
            work: SurfaceId,
        ) -> DecodeStep {
            // 上一步已完成的表面在此解锁 (锁定标志由引擎持有)
            for id in self.done.drain(..) {
                pool.unlock(id);
            }

            if self.busy_count > 0 {
                self.busy_count -= 1;
                return DecodeStep {
                    status: HwStatus::DeviceBusy,
                    sync: None,
                };
            }

            let more_data = DecodeStep {
                status: HwStatus::MoreData,
                sync: None,
            };

            match bs {
                Some(bs) if !bs.is_empty() => {
                    if self.param_change_at == Some(self.consumed) {
                        // 新序列头不兼容: 不消费, 等待重初始化
                        self.param_change_at = None;
                        return DecodeStep {
                            status: HwStatus::IncompatibleVideoParam,
                            sync: None,
                        };
                    }

                    self.buffered.push(bs.timestamp);
                    bs.consume(bs.len());
                    self.consumed += 1;

                    if self.buffered.len() <= self.delay {
                        more_data
                    } else {
                        self.emit(pool, work)
                    }
                }
                // 无新输入: 排空缓冲的帧
                _ => {
                    if self.buffered.is_empty() {
                        more_data
                    } else {
                        self.emit(pool, work)
                    }
                }
            }
        }

        fn sync_operation(&mut self, sync: SyncPoint, _timeout_ms: u64) -> MeiResult<HwFrameOutput> {
            let (surface, timestamp) = self
                .in_flight
                .remove(&sync.0)
                .ok_or_else(|| MeiError::Internal("未知的完成句柄".into()))?;
            self.done.push(surface);
            Ok(HwFrameOutput {
                surface,
                timestamp,
                pic_struct: PicStruct::PROGRESSIVE,
            })
        }

        fn reset(&mut self, _param: &HwVideoParam) -> HwStatus {
            self.buffered.clear();
            self.in_flight.clear();
            self.done.clear();
            HwStatus::Ok
        }

        fn close(&mut self) -> HwStatus {
            self.buffered.clear();
            self.in_flight.clear();
            self.done.clear();
            HwStatus::Ok
        }
    }

    struct TestAllocator;

    impl FrameAllocator for TestAllocator {
        fn alloc_frame(&mut self, info: &FrameInfo) -> MeiResult<VideoFrame> {
            Ok(VideoFrame::alloc(
                info.width,
                info.height,
                info.pixel_format,
            ))
        }
    }

    /// 记录累计休眠量的假时钟
    #[derive(Default)]
    struct FakeClock {
        slept: Arc<AtomicU64>,
    }

    impl Clock for FakeClock {
        fn sleep_ms(&mut self, ms: u64) {
            self.slept.fetch_add(ms, Ordering::Relaxed);
        }
    }

    fn open_session(engine: ScriptedEngine) -> HwDecodeSession {
        let _ = env_logger::builder().is_test(true).try_init();
        HwDecodeSession::open(
            Box::new(engine),
            Box::new(TestAllocator),
            Box::new(FakeClock::default()),
            CodecId::H264,
            &[0x00, 0x00, 0x01, 0x67],
            100,
        )
        .expect("打开会话失败")
    }

    /// 脚本引擎写入亮度平面的灰度值 (由 pts 推导)
    fn luma_for(pts: i64) -> u8 {
        (pts as u8).wrapping_add(0x10)
    }

    /// 构造一个带时间戳的压缩数据块
    fn pkt(pts: i64, dts: i64) -> Packet {
        let mut p = Packet::from_data(vec![0xABu8; 16]);
        p.pts = pts;
        p.dts = dts;
        p
    }

    #[test]
    fn test_管线延迟与时间戳反查() {
        let mut session = open_session(ScriptedEngine::new(2));
        assert_eq!(session.frame_info().width, 64);
        assert_eq!(session.frame_info().crop_width, 62);

        // 解码顺序喂入: I(pts=200) P(pts=0) B(pts=100), dts 单调
        let inputs = [pkt(200, 0), pkt(0, 100), pkt(100, 200)];

        // 管线深度 2: 前两块不出帧
        assert!(session.decode(&inputs[0]).unwrap().frame.is_none());
        assert!(session.decode(&inputs[1]).unwrap().frame.is_none());

        // 第三块出显示顺序的第一帧, dts 按输出 pts 反查
        let out = session.decode(&inputs[2]).unwrap();
        let frame = out.frame.expect("管线填满后应产出帧");
        assert_eq!(out.consumed, 16);
        assert_eq!(frame.pts, 0);
        assert_eq!(frame.dts, 100);
        assert_eq!(frame.frame_rate, Rational::new(25, 1));
        assert!(!frame.interlaced);
        // 交还的帧缓冲携带引擎写入的像素数据
        assert!(frame.data[0].iter().all(|&b| b == luma_for(0)));

        // 流结束: 空包排空剩余两帧
        let eos = Packet::empty();
        let f1 = session.decode(&eos).unwrap().frame.expect("排空第 1 帧");
        assert_eq!((f1.pts, f1.dts), (100, 200));
        assert!(f1.data[0].iter().all(|&b| b == luma_for(100)));
        let f2 = session.decode(&eos).unwrap().frame.expect("排空第 2 帧");
        assert_eq!((f2.pts, f2.dts), (200, 0));
        assert!(f2.data[0].iter().all(|&b| b == luma_for(200)));

        // 排空完成
        assert!(session.decode(&eos).unwrap().frame.is_none());
        session.close().unwrap();
    }

    #[test]
    fn test_无时间戳的数据块() {
        let mut session = open_session(ScriptedEngine::new(0));

        let out = session.decode(&pkt(NOPTS_VALUE, NOPTS_VALUE)).unwrap();
        let frame = out.frame.expect("零延迟引擎立即出帧");
        assert_eq!(frame.pts, NOPTS_VALUE);
        assert_eq!(frame.dts, NOPTS_VALUE);
    }

    #[test]
    fn test_设备忙_退避后恢复() {
        let mut engine = ScriptedEngine::new(0);
        engine.busy_count = 3;

        let clock = FakeClock::default();
        let slept = clock.slept.clone();
        let mut session = HwDecodeSession::open(
            Box::new(engine),
            Box::new(TestAllocator),
            Box::new(clock),
            CodecId::Mpeg2Video,
            &[0x00, 0x00, 0x01, 0xB3],
            100,
        )
        .unwrap();

        // 忙 3 次后成功, 预算 100 ms 未耗尽
        let out = session.decode(&pkt(0, 0)).unwrap();
        assert!(out.frame.is_some());
        assert_eq!(slept.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_不兼容参数变化_排空并重初始化() {
        let mut engine = ScriptedEngine::new(1);
        engine.param_change_at = Some(2);
        let mut session = open_session(engine);
        assert_eq!(session.frame_info().width, 64);

        assert!(session.decode(&pkt(0, 0)).unwrap().frame.is_none());
        let out = session.decode(&pkt(100, 100)).unwrap();
        assert_eq!(out.frame.expect("管线填满").pts, 0);

        // 第三块 (新序列头) 入队; 本轮先取回引擎已缓冲的帧
        let out = session.decode(&pkt(200, 200)).unwrap();
        assert_eq!(out.frame.expect("先取回缓存帧").pts, 100);
        assert!(!session.needs_reinit());

        // 下一轮把新序列头喂给引擎, 引擎拒收, 会话转入排空
        assert!(session.decode(&Packet::empty()).unwrap().frame.is_none());
        assert!(session.needs_reinit());

        // 重初始化沿用码流队列中未消费的新序列头
        session.reinit().unwrap();
        assert!(!session.needs_reinit());
        assert_eq!(session.frame_info().width, 128);
        assert_eq!(session.frame_info().height, 96);

        // 新几何下继续解码 (重排状态已清零, pts 可复用)
        assert!(session.decode(&pkt(0, 0)).unwrap().frame.is_none());
        let out = session.decode(&pkt(100, 100)).unwrap();
        assert_eq!(out.frame.expect("新管线出帧").pts, 0);
    }

    #[test]
    fn test_flush_丢弃解码状态() {
        let mut session = open_session(ScriptedEngine::new(2));

        assert!(session.decode(&pkt(0, 0)).unwrap().frame.is_none());
        assert!(session.decode(&pkt(100, 100)).unwrap().frame.is_none());

        // flush 丢弃缓冲的输入与时间戳表项
        session.flush().unwrap();

        // 同一批 pts 重新喂入不触发重复 pts 拒绝, 从零填管线
        assert!(session.decode(&pkt(0, 0)).unwrap().frame.is_none());
        assert!(session.decode(&pkt(100, 100)).unwrap().frame.is_none());
        let out = session.decode(&pkt(200, 200)).unwrap();
        assert_eq!(out.frame.expect("填满后出帧").pts, 0);
    }

    #[test]
    fn test_乱序同pts_入队被拒() {
        let mut session = open_session(ScriptedEngine::new(3));

        assert!(session.decode(&pkt(500, 0)).unwrap().frame.is_none());
        let result = session.decode(&pkt(500, 100));
        assert!(matches!(result, Err(MeiError::InvalidArgument(_))));
    }
}
