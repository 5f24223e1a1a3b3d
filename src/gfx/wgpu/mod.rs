//! wgpu 图形后端实现
//!
//! wgpu 是一个跨平台的图形 API，可以在 Vulkan、Metal、DirectX 12、OpenGL
//! 等多种后端上运行。
//!
//! # 模块结构
//!
//! - `context` - 实例、表面、适配器、设备的创建和表面配置
//! - `queue` - 队列 + 模拟 fence，实现 `GpuQueue`
//! - `backend` - `RenderBackend` 实现（上传、管线、深度纹理、帧录制）

pub mod backend;
pub mod context;
pub mod queue;

pub use backend::WgpuBackend;
pub use context::WgpuContext;
pub use queue::WgpuQueue;
