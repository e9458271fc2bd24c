//! 输出表面池.
//!
//! 可复用的硬件可见输出缓冲区 ("表面") 的空闲表, 按索引寻址的 arena.
//! 每个表面背靠一个由宿主分配回调提供的图像缓冲区.
//! 按需增长: 只有在没有空闲表面时才追加新表面;
//! 回收是隐式的 —— 引擎在完成时清除锁定标志, 下次扫描即复用.

use log::debug;
use mei_core::MeiResult;

use crate::frame::VideoFrame;
use crate::hwdec::engine::{FrameAllocator, FrameInfo};

/// 表面句柄 (arena 索引)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceId(usize);

/// 一个解码输出表面
#[derive(Debug)]
pub struct Surface {
    /// 几何描述
    pub info: FrameInfo,
    /// 锁定标志: 引擎在提交与完成之间持有
    locked: bool,
    /// 背靠的图像缓冲区 (宿主分配)
    pub buffer: VideoFrame,
}

/// 表面池
#[derive(Debug, Default)]
pub struct SurfacePool {
    surfaces: Vec<Surface>,
}

impl SurfacePool {
    /// 创建空表面池
    pub fn new() -> Self {
        Self::default()
    }

    /// 表面总数
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// 获取一个空闲表面
    ///
    /// 顺序扫描第一个未锁定的表面; 都被锁定时, 通过宿主分配回调
    /// 新建一个表面追加到池尾. 永远不会返回锁定中的表面.
    pub fn acquire(
        &mut self,
        info: &FrameInfo,
        allocator: &mut dyn FrameAllocator,
    ) -> MeiResult<SurfaceId> {
        for (i, surf) in self.surfaces.iter().enumerate() {
            if !surf.locked {
                return Ok(SurfaceId(i));
            }
        }

        let buffer = allocator.alloc_frame(info)?;
        self.surfaces.push(Surface {
            info: *info,
            locked: false,
            buffer,
        });
        debug!("表面池增长到 {} 个表面", self.surfaces.len());
        Ok(SurfaceId(self.surfaces.len() - 1))
    }

    /// 锁定表面 (引擎在提交时调用)
    pub fn lock(&mut self, id: SurfaceId) {
        self.surfaces[id.0].locked = true;
    }

    /// 解锁表面 (引擎在完成时调用)
    pub fn unlock(&mut self, id: SurfaceId) {
        self.surfaces[id.0].locked = false;
    }

    /// 查询锁定状态
    pub fn is_locked(&self, id: SurfaceId) -> bool {
        self.surfaces[id.0].locked
    }

    /// 访问表面
    pub fn get(&self, id: SurfaceId) -> &Surface {
        &self.surfaces[id.0]
    }

    /// 可变访问表面
    pub fn get_mut(&mut self, id: SurfaceId) -> &mut Surface {
        &mut self.surfaces[id.0]
    }

    /// 取出表面的图像缓冲区, 换入新分配的缓冲区
    ///
    /// 输出帧交还宿主后表面不能原地复用旧缓冲区, 否则显示队列
    /// 会受硬件 "读后写" 竞争影响.
    pub fn replace_buffer(&mut self, id: SurfaceId, fresh: VideoFrame) -> VideoFrame {
        std::mem::replace(&mut self.surfaces[id.0].buffer, fresh)
    }

    /// 释放所有表面及其背靠缓冲区
    pub fn destroy_all(&mut self) {
        self.surfaces.clear();
    }
}
