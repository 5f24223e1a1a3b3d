//! DirectX 12 图形后端（仅 Windows）
//!
//! - `context`：设备、DIRECT 队列、交换链和 RTV
//! - `queue`：命令队列 + fence，实现 `GpuQueue`
//! - `backend`：`RenderBackend` 实现（上传、根签名、PSO、深度缓冲区、帧录制）

pub mod backend;
pub mod context;
pub mod queue;

pub use backend::Dx12Backend;
pub use context::Dx12Context;
pub use queue::Dx12CommandQueue;
