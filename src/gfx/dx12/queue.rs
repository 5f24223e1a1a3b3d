//! DirectX 12 命令队列
//!
//! 每个队列拥有一个 `ID3D12Fence` 和一个等待事件。
//! fence 值由 `FenceManager` 分配，保证同一队列上严格递增。

use tracing::trace;
use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::System::Threading::{CreateEventA, WaitForSingleObject, INFINITE};

use crate::core::error::{GraphicsError, Result};
use crate::renderer::sync::{FenceManager, FenceValue, GpuQueue};

/// 命令队列 + fence
pub struct Dx12CommandQueue {
    queue: ID3D12CommandQueue,
    fence: ID3D12Fence,
    fence_event: HANDLE,
    fences: FenceManager,
    kind: D3D12_COMMAND_LIST_TYPE,
}

impl Dx12CommandQueue {
    /// 创建指定类型的队列（DIRECT 用于绘制，COPY 用于上传）
    pub fn new(device: &ID3D12Device, kind: D3D12_COMMAND_LIST_TYPE) -> Result<Self> {
        unsafe {
            let queue_desc = D3D12_COMMAND_QUEUE_DESC {
                Type: kind,
                Flags: D3D12_COMMAND_QUEUE_FLAG_NONE,
                ..Default::default()
            };
            let queue: ID3D12CommandQueue = device
                .CreateCommandQueue(&queue_desc)
                .map_err(|e| GraphicsError::DeviceCreation(format!("Failed to create command queue: {}", e)))?;

            let fence: ID3D12Fence = device
                .CreateFence(0, D3D12_FENCE_FLAG_NONE)
                .map_err(|e| GraphicsError::DeviceCreation(format!("Failed to create fence: {}", e)))?;

            let fence_event = CreateEventA(None, false, false, None)
                .map_err(|e| GraphicsError::DeviceCreation(format!("Failed to create fence event: {}", e)))?;

            Ok(Self {
                queue,
                fence,
                fence_event,
                fences: FenceManager::new(),
                kind,
            })
        }
    }

    pub fn queue(&self) -> &ID3D12CommandQueue {
        &self.queue
    }

    pub fn kind(&self) -> D3D12_COMMAND_LIST_TYPE {
        self.kind
    }

    /// 提交一个已关闭的命令列表
    pub fn execute(&self, command_list: &ID3D12GraphicsCommandList) {
        unsafe {
            let command_lists = [Some(command_list.clone().into())];
            self.queue.ExecuteCommandLists(&command_lists);
        }
    }
}

impl GpuQueue for Dx12CommandQueue {
    fn signal(&self) -> Result<FenceValue> {
        let value = self.fences.next_value();
        unsafe {
            self.queue
                .Signal(&self.fence, value.value())
                .map_err(|e| GraphicsError::CommandExecution(format!("Failed to signal fence: {}", e)))?;
        }
        Ok(value)
    }

    fn completed_value(&self) -> FenceValue {
        let completed = FenceValue::new(unsafe { self.fence.GetCompletedValue() });
        self.fences.update_completed_value(completed);
        self.fences.completed_value()
    }

    fn wait_for_fence_value(&self, value: FenceValue) -> Result<()> {
        if self.is_fence_complete(value) {
            return Ok(());
        }

        trace!(fence = value.value(), "Waiting for fence");
        unsafe {
            self.fence
                .SetEventOnCompletion(value.value(), self.fence_event)
                .map_err(|e| GraphicsError::FenceWait(format!("Failed to set fence event: {}", e)))?;
            WaitForSingleObject(self.fence_event, INFINITE);
        }
        self.fences.update_completed_value(value);
        Ok(())
    }
}

impl Drop for Dx12CommandQueue {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.fence_event);
        }
    }
}
