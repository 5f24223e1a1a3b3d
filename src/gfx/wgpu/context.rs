//! wgpu 设备管理
//!
//! 负责 wgpu 实例、窗口表面、适配器、逻辑设备和队列的创建，以及表面配置。

use std::sync::Arc;

use tracing::{debug, info};
use winit::window::Window;

use crate::core::error::{GraphicsError, Result};
use crate::core::Config;
use crate::gfx::wgpu::queue::WgpuQueue;
use crate::renderer::resource::Extent2D;

/// wgpu 设备、队列和窗口表面
pub struct WgpuContext {
    /// wgpu 实例（入口点）
    pub instance: wgpu::Instance,
    /// 窗口表面
    pub surface: wgpu::Surface<'static>,
    /// 图形适配器（GPU）
    pub adapter: wgpu::Adapter,
    /// 逻辑设备
    pub device: Arc<wgpu::Device>,
    /// 命令队列 + fence
    pub queue: WgpuQueue,
    /// 表面配置
    pub surface_config: wgpu::SurfaceConfiguration,
    window: Arc<Window>,
}

impl WgpuContext {
    pub fn new(window: Arc<Window>, config: &Config) -> Result<Self> {
        info!("Initializing wgpu backend");

        // 1. 实例
        debug!("Creating wgpu instance");
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            dx12_shader_compiler: Default::default(),
            flags: wgpu::InstanceFlags::default(),
            gles_minor_version: wgpu::Gles3MinorVersion::Automatic,
        });

        // 2. 表面
        debug!("Creating surface");
        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| GraphicsError::DeviceCreation(format!("Failed to create surface: {}", e)))?;

        // 3. 适配器
        debug!("Requesting adapter");
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| GraphicsError::DeviceCreation("Failed to find suitable adapter".to_string()))?;

        info!("Selected adapter: {:?}", adapter.get_info());

        // 4. 设备和队列
        debug!("Requesting device and queue");
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Main Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
            },
            None,
        ))
        .map_err(|e| GraphicsError::DeviceCreation(format!("Failed to create device: {}", e)))?;
        let device = Arc::new(device);
        let queue = WgpuQueue::new(Arc::clone(&device), queue);

        // 5. 表面配置：渲染目标使用 8 位 UNORM
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| *f == wgpu::TextureFormat::Rgba8Unorm)
            .or_else(|| {
                surface_caps
                    .formats
                    .iter()
                    .copied()
                    .find(|f| *f == wgpu::TextureFormat::Bgra8Unorm)
            })
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| GraphicsError::SwapchainError("Surface reports no formats".to_string()))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        debug!("Surface format: {:?}", surface_format);

        let size = window.inner_size();
        let extent = Extent2D::new(size.width, size.height).clamped();
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: extent.width,
            height: extent.height,
            present_mode: present_mode(config.graphics.vsync),
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: config.graphics.backbuffer_count.saturating_sub(1).max(1),
        };

        surface.configure(&device, &surface_config);

        info!(
            width = extent.width,
            height = extent.height,
            vsync = config.graphics.vsync,
            "wgpu backend initialized"
        );

        Ok(Self {
            instance,
            surface,
            adapter,
            device,
            queue,
            surface_config,
            window,
        })
    }

    /// 获取窗口引用
    pub fn window(&self) -> &Window {
        &self.window
    }

    /// 重新配置表面（用于窗口调整）
    pub fn reconfigure_surface(&mut self, extent: Extent2D) {
        self.surface_config.width = extent.width;
        self.surface_config.height = extent.height;
        self.surface.configure(&self.device, &self.surface_config);
    }

    pub fn set_vsync(&mut self, vsync: bool) {
        self.surface_config.present_mode = present_mode(vsync);
        self.surface.configure(&self.device, &self.surface_config);
    }
}

fn present_mode(vsync: bool) -> wgpu::PresentMode {
    if vsync {
        wgpu::PresentMode::Fifo
    } else {
        wgpu::PresentMode::AutoNoVsync
    }
}
