//! 渲染器模块
//!
//! 本模块提供了统一的渲染接口，封装了不同图形 API 的具体实现。
//! 应用程序通过这个模块与底层图形 API（DirectX 12、wgpu）交互，
//! 而不需要关心具体使用的是哪个图形 API。
//!
//! # 架构设计
//!
//! - `Renderer`：统一的渲染器接口，对外提供一致的 API
//! - `Backend`：内部枚举，封装不同的图形后端实现
//! - `MeshRenderer`：与后端无关的帧驱动（`frame` 模块）
//! - 底层实现在 `gfx` 模块中，按 API 分类组织

use std::path::Path;
use std::sync::Arc;

use tracing::info;
use winit::event_loop::EventLoop;
use winit::window::{Window, WindowBuilder};

use crate::core::config::GraphicsBackend;
use crate::core::error::{GraphicsError, Result};
use crate::core::{Config, SceneConfig};
use crate::geometry::MeshData;
#[cfg(target_os = "windows")]
use crate::gfx::dx12::Dx12Backend;
use crate::gfx::wgpu::WgpuBackend;
use crate::renderer::frame::MeshRenderer;
use crate::renderer::resource::Extent2D;

// 通用渲染器组件（与具体 API 无关）
pub mod backend_trait;
pub mod frame;
pub mod pipeline;
pub mod resource;
pub mod shaders;
pub mod sync;

/// 图形后端枚举
///
/// 封装不同的图形 API 实现，支持运行时选择使用哪个后端。
/// 通过枚举模式实现零成本抽象，避免动态分发的性能开销。
enum Backend {
    #[cfg(target_os = "windows")]
    Dx12(MeshRenderer<Dx12Backend>),
    Wgpu(MeshRenderer<WgpuBackend>),
}

/// 对 `Backend` 的每个变体执行同一个表达式
macro_rules! dispatch {
    ($backend:expr, $r:ident => $body:expr) => {
        match $backend {
            #[cfg(target_os = "windows")]
            Backend::Dx12($r) => $body,
            Backend::Wgpu($r) => $body,
        }
    };
}

pub struct Renderer {
    backend: Backend,
}

impl Renderer {
    /// 创建窗口和配置中选择的后端
    pub fn new(event_loop: &EventLoop<()>, config: &Config, scene: &SceneConfig) -> Result<Self> {
        let backend = match config.graphics.backend {
            GraphicsBackend::Wgpu => {
                info!("Initializing wgpu Backend");
                let window = create_window(event_loop, config, "wgpu")?;
                let backend = WgpuBackend::new(window, config)?;
                Backend::Wgpu(MeshRenderer::new(backend, scene.clone()))
            }
            #[cfg(target_os = "windows")]
            GraphicsBackend::Dx12 => {
                info!("Initializing DX12 Backend");
                let window = create_window(event_loop, config, "DX12")?;
                let backend = Dx12Backend::new(window, config)?;
                Backend::Dx12(MeshRenderer::new(backend, scene.clone()))
            }
            #[cfg(not(target_os = "windows"))]
            GraphicsBackend::Dx12 => {
                return Err(GraphicsError::UnsupportedBackend(
                    "DX12 backend is only available on Windows, use --wgpu".to_string(),
                )
                .into());
            }
        };

        Ok(Self { backend })
    }

    /// 上传网格并创建管线
    pub fn load_content(&mut self, mesh: &MeshData, shader_dir: &Path) -> Result<()> {
        dispatch!(&mut self.backend, r => r.load_content(mesh, shader_dir))
    }

    pub fn update(&mut self, total_seconds: f64) {
        dispatch!(&mut self.backend, r => r.update(total_seconds))
    }

    pub fn render(&mut self) -> Result<()> {
        dispatch!(&mut self.backend, r => r.render())
    }

    /// 客户区尺寸变化，返回是否真正重建了资源
    pub fn resize(&mut self, width: u32, height: u32) -> Result<bool> {
        let extent = Extent2D::new(width, height);
        dispatch!(&mut self.backend, r => r.resize(extent))
    }

    pub fn set_vsync(&mut self, vsync: bool) {
        dispatch!(&mut self.backend, r => r.set_vsync(vsync))
    }

    /// 等待所有已提交的 GPU 工作完成
    pub fn flush(&self) -> Result<()> {
        dispatch!(&self.backend, r => r.flush())
    }

    pub fn backend_name(&self) -> &'static str {
        use crate::renderer::backend_trait::RenderBackend;
        dispatch!(&self.backend, r => r.backend().name())
    }

    pub fn window(&self) -> &Window {
        dispatch!(&self.backend, r => r.backend().window())
    }
}

/// 创建主窗口
///
/// 标题为 `"<title> [<backend>]"`。
fn create_window(event_loop: &EventLoop<()>, config: &Config, backend_name: &str) -> Result<Arc<Window>> {
    let title = format!("{} [{}]", config.window.title, backend_name);

    let window = WindowBuilder::new()
        .with_title(title)
        .with_inner_size(winit::dpi::PhysicalSize::new(
            config.window.width,
            config.window.height,
        ))
        .with_resizable(config.window.resizable)
        .build(event_loop)
        .map_err(|e| GraphicsError::DeviceCreation(format!("Failed to create window: {}", e)))?;

    Ok(Arc::new(window))
}
