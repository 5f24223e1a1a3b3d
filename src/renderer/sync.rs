//! GPU 同步机制模块
//!
//! CPU 与 GPU 之间唯一的协调手段是每个队列上单调递增的 fence 值：
//! 每次提交后 signal 一个新值，CPU 通过比较"已完成值"判断工作是否结束。
//!
//! - `GpuQueue`：两个后端共同实现的队列同步接口
//! - `FenceManager`：CPU 侧的 fence 计数器，可在完成回调中更新
//! - `BackbufferFences`：交换链图像 → 最后一次提交的 fence 值
//!
//! 不变式：交换链图像 *i* 记录的 fence 值一定在 *i* 被再次录制之前完成。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::core::error::Result;

/// Fence 值
///
/// 单调递增，0 表示"从未提交"，总是已完成。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FenceValue(u64);

impl FenceValue {
    /// 永远已完成的初始值
    pub const ZERO: FenceValue = FenceValue(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// 下一个Fence值
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

/// GPU 队列的同步接口
///
/// 录制和提交都在同一个 CPU 线程上进行，GPU 异步执行。
pub trait GpuQueue {
    /// 在队列末尾插入一个新的 fence 值并返回它
    fn signal(&self) -> Result<FenceValue>;

    /// GPU 已经完成的最大 fence 值
    fn completed_value(&self) -> FenceValue;

    /// 阻塞直到 GPU 完成 `value`，已完成时立即返回
    fn wait_for_fence_value(&self, value: FenceValue) -> Result<()>;

    fn is_fence_complete(&self, value: FenceValue) -> bool {
        self.completed_value() >= value
    }

    /// 等待队列上所有已提交的工作完成
    fn flush(&self) -> Result<()> {
        let value = self.signal()?;
        self.wait_for_fence_value(value)
    }
}

/// Fence 管理器
///
/// CPU 侧的 fence 计数：`next_value` 分配新值，
/// GPU 完成时（D3D12 读取 `ID3D12Fence`，wgpu 通过提交完成回调）更新已完成值。
#[derive(Debug, Default)]
pub struct FenceManager {
    /// 最后分配的Fence值（CPU侧）
    current_value: AtomicU64,
    /// 已完成的Fence值（GPU侧），可被回调线程更新
    completed_value: Arc<AtomicU64>,
}

impl FenceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取最后分配的Fence值
    pub fn current_value(&self) -> FenceValue {
        FenceValue::new(self.current_value.load(Ordering::Acquire))
    }

    /// 获取已完成的Fence值
    pub fn completed_value(&self) -> FenceValue {
        FenceValue::new(self.completed_value.load(Ordering::Acquire))
    }

    /// 获取下一个Fence值并递增计数器
    pub fn next_value(&self) -> FenceValue {
        let value = self.current_value.fetch_add(1, Ordering::AcqRel);
        FenceValue::new(value + 1)
    }

    /// 更新已完成的Fence值
    ///
    /// 只会前进，乱序到达的旧值被忽略。
    pub fn update_completed_value(&self, value: FenceValue) {
        self.completed_value.fetch_max(value.value(), Ordering::AcqRel);
    }

    /// 生成一个在 GPU 完成 `value` 时调用的回调
    pub fn completion_callback(&self, value: FenceValue) -> impl FnOnce() + Send + 'static {
        let completed = Arc::clone(&self.completed_value);
        move || {
            completed.fetch_max(value.value(), Ordering::AcqRel);
        }
    }

    /// 检查特定Fence值是否已完成
    pub fn is_completed(&self, value: FenceValue) -> bool {
        self.completed_value() >= value
    }
}

/// 交换链图像的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackbufferState {
    /// 没有未完成的 GPU 工作
    Free,
    /// 最后一次提交的 fence 值尚未完成
    InFlight(FenceValue),
}

/// 每个交换链图像最后一次提交的 fence 值
#[derive(Debug, Clone)]
pub struct BackbufferFences {
    values: Vec<FenceValue>,
}

impl BackbufferFences {
    /// `count` 个交换链图像，初始都为空闲
    pub fn new(count: usize) -> Self {
        Self {
            values: vec![FenceValue::ZERO; count],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 记录的 fence 值
    pub fn value(&self, index: usize) -> FenceValue {
        self.values[index]
    }

    /// 当前状态
    pub fn state<Q: GpuQueue + ?Sized>(&self, index: usize, queue: &Q) -> BackbufferState {
        let value = self.values[index];
        if queue.is_fence_complete(value) {
            BackbufferState::Free
        } else {
            BackbufferState::InFlight(value)
        }
    }

    /// 提交后记录 fence 值
    pub fn record_submission(&mut self, index: usize, value: FenceValue) {
        debug_assert!(value >= self.values[index], "fence values must not go backwards");
        self.values[index] = value;
    }

    /// 在重新录制交换链图像 `index` 之前调用
    ///
    /// 已完成时不等待。
    pub fn wait_for_backbuffer<Q: GpuQueue + ?Sized>(&self, index: usize, queue: &Q) -> Result<()> {
        match self.state(index, queue) {
            BackbufferState::Free => Ok(()),
            BackbufferState::InFlight(value) => {
                tracing::trace!(backbuffer = index, fence = value.value(), "Waiting for backbuffer fence");
                queue.wait_for_fence_value(value)
            }
        }
    }

    /// 清空记录（队列已经 flush），可同时改变图像数量
    pub fn reset(&mut self, count: usize) {
        self.values.clear();
        self.values.resize(count, FenceValue::ZERO);
    }
}
