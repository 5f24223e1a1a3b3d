//! DirectX 12 设备与交换链
//!
//! # 初始化流程
//!
//! 1. 启用调试层（Debug 模式）
//! 2. 创建 DXGI 工厂
//! 3. 创建 D3D12 设备
//! 4. 创建 DIRECT 命令队列
//! 5. 创建交换链（FLIP_DISCARD，图像数量来自配置）
//! 6. 创建 RTV 描述符堆和渲染目标视图

use std::ffi::c_void;
use std::sync::Arc;

use raw_window_handle::{HasWindowHandle, RawWindowHandle};
use tracing::{debug, info, warn};
use windows::core::Interface;
use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;
use windows::Win32::Graphics::Dxgi::*;
use winit::window::Window;

use crate::core::error::{GraphicsError, Result};
use crate::core::Config;
use crate::gfx::dx12::queue::Dx12CommandQueue;
use crate::renderer::resource::Extent2D;

/// 交换链格式
pub const BACKBUFFER_FORMAT: DXGI_FORMAT = DXGI_FORMAT_R8G8B8A8_UNORM;

/// DirectX 12 设备、队列和交换链
pub struct Dx12Context {
    /// D3D12 设备
    pub device: ID3D12Device,
    /// 绘制队列
    pub direct_queue: Dx12CommandQueue,
    /// 交换链
    pub swap_chain: IDXGISwapChain3,
    /// 渲染目标视图描述符堆
    pub rtv_heap: ID3D12DescriptorHeap,
    /// RTV 描述符大小
    pub rtv_descriptor_size: usize,
    /// 交换链图像
    pub render_targets: Vec<ID3D12Resource>,
    /// 交换链图像数量
    pub backbuffer_count: u32,
    /// 是否支持关闭垂直同步时撕裂
    pub tearing_supported: bool,
    window: Arc<Window>,
}

impl Dx12Context {
    pub fn new(window: Arc<Window>, config: &Config) -> Result<Self> {
        let backbuffer_count = config.graphics.backbuffer_count;
        let size = window.inner_size();
        let extent = Extent2D::new(size.width, size.height).clamped();

        unsafe {
            // 1. 调试层
            #[cfg(debug_assertions)]
            {
                let mut debug: Option<ID3D12Debug> = None;
                match D3D12GetDebugInterface(&mut debug) {
                    Ok(()) => {
                        if let Some(debug) = debug {
                            debug.EnableDebugLayer();
                            debug!("DX12 Debug Layer enabled");
                        }
                    }
                    Err(_) => warn!("Failed to enable DX12 Debug Layer"),
                }
            }

            // 2. DXGI 工厂
            #[cfg(debug_assertions)]
            let factory_flags = DXGI_CREATE_FACTORY_DEBUG;
            #[cfg(not(debug_assertions))]
            let factory_flags = DXGI_CREATE_FACTORY_FLAGS(0);
            let factory: IDXGIFactory4 = CreateDXGIFactory2(factory_flags)
                .map_err(|e| GraphicsError::DeviceCreation(format!("Failed to create DXGI factory: {}", e)))?;

            // 3. 设备
            let mut device: Option<ID3D12Device> = None;
            D3D12CreateDevice(None, D3D_FEATURE_LEVEL_11_0, &mut device)
                .map_err(|e| GraphicsError::DeviceCreation(format!("Failed to create D3D12 device: {}", e)))?;
            let device = device
                .ok_or_else(|| GraphicsError::DeviceCreation("D3D12CreateDevice returned no device".to_string()))?;

            // 4. 队列
            let direct_queue = Dx12CommandQueue::new(&device, D3D12_COMMAND_LIST_TYPE_DIRECT)?;

            // 5. 交换链
            let tearing_supported = check_tearing_support(&factory);
            let hwnd = window_hwnd(&window)?;
            let swap_chain_desc = DXGI_SWAP_CHAIN_DESC1 {
                Width: extent.width,
                Height: extent.height,
                Format: BACKBUFFER_FORMAT,
                SampleDesc: DXGI_SAMPLE_DESC {
                    Count: 1,
                    ..Default::default()
                },
                BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
                BufferCount: backbuffer_count,
                SwapEffect: DXGI_SWAP_EFFECT_FLIP_DISCARD,
                Flags: swap_chain_flags(tearing_supported).0 as u32,
                ..Default::default()
            };

            let swap_chain: IDXGISwapChain1 = factory
                .CreateSwapChainForHwnd(direct_queue.queue(), hwnd, &swap_chain_desc, None, None)
                .map_err(|e| GraphicsError::SwapchainError(format!("Failed to create swap chain: {}", e)))?;
            let swap_chain: IDXGISwapChain3 = swap_chain
                .cast()
                .map_err(|e| GraphicsError::SwapchainError(format!("IDXGISwapChain3 unavailable: {}", e)))?;

            info!(
                width = extent.width,
                height = extent.height,
                buffers = backbuffer_count,
                tearing = tearing_supported,
                "Swap chain created"
            );

            // 6. RTV 堆
            let rtv_heap_desc = D3D12_DESCRIPTOR_HEAP_DESC {
                NumDescriptors: backbuffer_count,
                Type: D3D12_DESCRIPTOR_HEAP_TYPE_RTV,
                Flags: D3D12_DESCRIPTOR_HEAP_FLAG_NONE,
                NodeMask: 0,
            };
            let rtv_heap: ID3D12DescriptorHeap = device
                .CreateDescriptorHeap(&rtv_heap_desc)
                .map_err(|e| GraphicsError::ResourceCreation(format!("Failed to create RTV heap: {}", e)))?;
            let rtv_descriptor_size =
                device.GetDescriptorHandleIncrementSize(D3D12_DESCRIPTOR_HEAP_TYPE_RTV) as usize;

            let mut context = Self {
                device,
                direct_queue,
                swap_chain,
                rtv_heap,
                rtv_descriptor_size,
                render_targets: Vec::new(),
                backbuffer_count,
                tearing_supported,
                window,
            };
            context.create_render_target_views()?;

            info!("DX12 context initialized");
            Ok(context)
        }
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// 为每个交换链图像创建 RTV
    fn create_render_target_views(&mut self) -> Result<()> {
        self.render_targets.clear();
        unsafe {
            for i in 0..self.backbuffer_count {
                let surface: ID3D12Resource = self.swap_chain.GetBuffer(i).map_err(|e| {
                    GraphicsError::SwapchainError(format!("Failed to get swap chain buffer {}: {}", i, e))
                })?;
                self.device
                    .CreateRenderTargetView(&surface, None, self.rtv_handle(i as usize));
                self.render_targets.push(surface);
            }
        }
        Ok(())
    }

    /// 交换链图像 `index` 的 RTV
    pub fn rtv_handle(&self, index: usize) -> D3D12_CPU_DESCRIPTOR_HANDLE {
        unsafe {
            D3D12_CPU_DESCRIPTOR_HANDLE {
                ptr: self.rtv_heap.GetCPUDescriptorHandleForHeapStart().ptr
                    + index * self.rtv_descriptor_size,
            }
        }
    }

    pub fn current_backbuffer_index(&self) -> usize {
        unsafe { self.swap_chain.GetCurrentBackBufferIndex() as usize }
    }

    /// 改变交换链尺寸，调用前 GPU 必须空闲
    pub fn resize_buffers(&mut self, extent: Extent2D) -> Result<()> {
        // 交换链图像的所有引用必须先释放
        self.render_targets.clear();

        unsafe {
            self.swap_chain
                .ResizeBuffers(
                    self.backbuffer_count,
                    extent.width,
                    extent.height,
                    BACKBUFFER_FORMAT,
                    swap_chain_flags(self.tearing_supported),
                )
                .map_err(|e| GraphicsError::SwapchainError(format!("Failed to resize swap chain: {}", e)))?;
        }

        self.create_render_target_views()
    }

    /// 呈现
    pub fn present(&self, vsync: bool) -> Result<()> {
        let sync_interval = if vsync { 1 } else { 0 };
        let flags = if !vsync && self.tearing_supported {
            DXGI_PRESENT_ALLOW_TEARING
        } else {
            DXGI_PRESENT(0)
        };

        unsafe {
            self.swap_chain
                .Present(sync_interval, flags)
                .ok()
                .map_err(|e| GraphicsError::SwapchainError(format!("Present failed: {}", e)))?;
        }
        Ok(())
    }
}

fn swap_chain_flags(tearing_supported: bool) -> DXGI_SWAP_CHAIN_FLAG {
    if tearing_supported {
        DXGI_SWAP_CHAIN_FLAG_ALLOW_TEARING
    } else {
        DXGI_SWAP_CHAIN_FLAG(0)
    }
}

/// 查询 DXGI 1.5 的撕裂支持（可变刷新率显示器需要）
fn check_tearing_support(factory: &IDXGIFactory4) -> bool {
    let Ok(factory5) = factory.cast::<IDXGIFactory5>() else {
        return false;
    };

    let mut allow_tearing: i32 = 0;
    let result = unsafe {
        factory5.CheckFeatureSupport(
            DXGI_FEATURE_PRESENT_ALLOW_TEARING,
            &mut allow_tearing as *mut i32 as *mut c_void,
            std::mem::size_of::<i32>() as u32,
        )
    };
    result.is_ok() && allow_tearing != 0
}

/// 从 winit 窗口获取 HWND
fn window_hwnd(window: &Window) -> Result<HWND> {
    let handle = window
        .window_handle()
        .map_err(|e| GraphicsError::DeviceCreation(format!("Failed to get window handle: {}", e)))?;

    match handle.as_raw() {
        RawWindowHandle::Win32(win32_handle) => Ok(HWND(win32_handle.hwnd.get() as *mut c_void)),
        _ => Err(GraphicsError::UnsupportedBackend(
            "Expected Win32 window handle on Windows platform".to_string(),
        )
        .into()),
    }
}
