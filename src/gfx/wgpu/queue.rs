//! wgpu 队列的 fence 模拟
//!
//! wgpu 没有显式 fence。`signal` 分配一个新值，并通过
//! `Queue::on_submitted_work_done` 在此前提交的工作全部完成时更新已完成值；
//! 等待时轮询设备直到回调触发。

use std::sync::Arc;

use tracing::trace;

use crate::core::error::{GraphicsError, Result};
use crate::renderer::sync::{FenceManager, FenceValue, GpuQueue};

/// 阻塞轮询的最大次数
const MAX_WAIT_POLLS: usize = 8;

pub struct WgpuQueue {
    device: Arc<wgpu::Device>,
    queue: wgpu::Queue,
    fences: FenceManager,
}

impl WgpuQueue {
    pub fn new(device: Arc<wgpu::Device>, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            fences: FenceManager::new(),
        }
    }

    /// 底层 `wgpu::Queue`
    pub fn raw(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn submit(&self, command_buffer: wgpu::CommandBuffer) {
        self.queue.submit(std::iter::once(command_buffer));
    }
}

impl GpuQueue for WgpuQueue {
    fn signal(&self) -> Result<FenceValue> {
        let value = self.fences.next_value();
        self.queue
            .on_submitted_work_done(self.fences.completion_callback(value));
        Ok(value)
    }

    fn completed_value(&self) -> FenceValue {
        // 触发已完成工作的回调
        self.device.poll(wgpu::Maintain::Poll);
        self.fences.completed_value()
    }

    fn wait_for_fence_value(&self, value: FenceValue) -> Result<()> {
        for _ in 0..MAX_WAIT_POLLS {
            if self.fences.is_completed(value) {
                return Ok(());
            }
            trace!(fence = value.value(), "Polling device for fence");
            self.device.poll(wgpu::Maintain::Wait);
        }

        if self.fences.is_completed(value) {
            Ok(())
        } else {
            Err(GraphicsError::FenceWait(format!(
                "fence {} not reached (completed {})",
                value.value(),
                self.fences.completed_value().value()
            ))
            .into())
        }
    }
}
