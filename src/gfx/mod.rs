//! 图形后端模块
//!
//! 本模块封装了不同图形 API 的底层实现：
//! - DirectX 12：Windows 平台，直接使用 `windows` crate
//! - wgpu：跨平台的高层图形抽象（支持 Vulkan、Metal、DX12、OpenGL）
//!
//! 两个后端都实现 `renderer::backend_trait::RenderBackend`，
//! 由 `renderer::frame::MeshRenderer` 驱动。

#[cfg(target_os = "windows")]
pub mod dx12;
pub mod wgpu;

#[cfg(target_os = "windows")]
pub use dx12::Dx12Backend;
pub use self::wgpu::WgpuBackend;
