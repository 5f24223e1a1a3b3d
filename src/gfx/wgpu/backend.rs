//! wgpu 渲染后端
//!
//! 与 DX12 后端相同的约定：
//! - 缓冲区通过 `mapped_at_creation` 的中转缓冲区 + `copy_buffer_to_buffer` 上传
//! - MVP 放在 64 字节的 uniform 缓冲区中（group 0, binding 0），对应 DX12 的根常量
//! - 深度缓冲区 `Depth32Float`，深度测试 `Less`
//!
//! wgpu 不暴露交换链图像索引，后端按呈现顺序轮换索引。

use std::sync::Arc;

use tracing::{debug, info, warn};
use winit::window::Window;

use crate::core::error::{GraphicsError, Result};
use crate::core::Config;
use crate::geometry::vertex::VertexFormat;
use crate::gfx::wgpu::context::WgpuContext;
use crate::gfx::wgpu::queue::WgpuQueue;
use crate::renderer::backend_trait::RenderBackend;
use crate::renderer::frame::FrameCommands;
use crate::renderer::pipeline::{CompareFunction, CullMode, FrontFace, PipelineDesc, PrimitiveTopology};
use crate::renderer::resource::{BufferUpload, BufferUsage, DepthBufferDesc, Extent2D, TextureFormat};
use crate::renderer::shaders::{ShaderBlobKind, ShaderBlobs};
use crate::renderer::sync::{FenceValue, GpuQueue};

/// GPU 本地缓冲区
pub struct WgpuBuffer {
    pub buffer: wgpu::Buffer,
    /// 有效数据大小（不含对齐填充）
    pub byte_size: u64,
}

/// 渲染管线 + MVP uniform
pub struct WgpuPipeline {
    pub render_pipeline: wgpu::RenderPipeline,
    pub uniform_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

pub struct WgpuDepthBuffer {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub extent: Extent2D,
}

pub struct WgpuBackend {
    context: WgpuContext,
    /// 正在录制的上传命令
    upload_encoder: Option<wgpu::CommandEncoder>,
    /// 等待复制完成的中转缓冲区
    staging: Vec<wgpu::Buffer>,
    /// 已提交、等待呈现的表面图像
    pending_frame: Option<wgpu::SurfaceTexture>,
    backbuffer_count: usize,
    backbuffer_index: usize,
}

impl WgpuBackend {
    pub fn new(window: Arc<Window>, config: &Config) -> Result<Self> {
        let context = WgpuContext::new(window, config)?;

        Ok(Self {
            context,
            upload_encoder: None,
            staging: Vec::new(),
            pending_frame: None,
            backbuffer_count: config.graphics.backbuffer_count as usize,
            backbuffer_index: 0,
        })
    }

    pub fn window(&self) -> &Window {
        self.context.window()
    }

    /// 获取下一张表面图像，表面过期时重新配置一次
    fn acquire_surface_texture(&mut self) -> Result<wgpu::SurfaceTexture> {
        match self.context.surface.get_current_texture() {
            Ok(texture) => Ok(texture),
            Err(wgpu::SurfaceError::Outdated) | Err(wgpu::SurfaceError::Lost) => {
                warn!("Surface outdated, reconfiguring");
                let extent = Extent2D::new(
                    self.context.surface_config.width,
                    self.context.surface_config.height,
                );
                self.context.reconfigure_surface(extent);
                self.context.surface.get_current_texture().map_err(|e| {
                    GraphicsError::SwapchainError(format!("Failed to acquire next image: {}", e)).into()
                })
            }
            Err(e) => {
                Err(GraphicsError::SwapchainError(format!("Failed to acquire next image: {}", e)).into())
            }
        }
    }
}

impl RenderBackend for WgpuBackend {
    type Buffer = WgpuBuffer;
    type Pipeline = WgpuPipeline;
    type DepthBuffer = WgpuDepthBuffer;
    type Queue = WgpuQueue;

    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn direct_queue(&self) -> &WgpuQueue {
        &self.context.queue
    }

    fn backbuffer_count(&self) -> usize {
        self.backbuffer_count
    }

    fn current_backbuffer_index(&self) -> usize {
        self.backbuffer_index
    }

    fn client_size(&self) -> Extent2D {
        let size = self.context.window().inner_size();
        Extent2D::new(size.width, size.height)
    }

    fn shader_blob_kind(&self) -> ShaderBlobKind {
        ShaderBlobKind::SpirV
    }

    fn has_builtin_shaders(&self) -> bool {
        true
    }

    fn upload_buffer(&mut self, upload: &BufferUpload<'_>) -> Result<WgpuBuffer> {
        let device = &self.context.device;

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: upload.staging.name.as_deref(),
            size: upload.copy_size(),
            usage: wgpu::BufferUsages::MAP_WRITE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: true,
        });
        staging
            .slice(..)
            .get_mapped_range_mut()
            .copy_from_slice(&upload.padded_bytes());
        staging.unmap();

        let usage = match upload.destination.usage {
            BufferUsage::Index => wgpu::BufferUsages::INDEX,
            BufferUsage::Vertex => wgpu::BufferUsages::VERTEX,
            BufferUsage::Staging => wgpu::BufferUsages::COPY_SRC,
        };
        let destination = device.create_buffer(&wgpu::BufferDescriptor {
            label: upload.destination.name.as_deref(),
            size: upload.destination.size,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let encoder = self.upload_encoder.get_or_insert_with(|| {
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Upload Encoder"),
            })
        });
        encoder.copy_buffer_to_buffer(&staging, 0, &destination, 0, upload.copy_size());
        self.staging.push(staging);

        debug!(
            name = upload.destination.name.as_deref().unwrap_or(""),
            bytes = upload.byte_size,
            "Buffer copy recorded"
        );

        Ok(WgpuBuffer {
            buffer: destination,
            byte_size: upload.byte_size,
        })
    }

    fn finish_uploads(&mut self) -> Result<()> {
        let Some(encoder) = self.upload_encoder.take() else {
            return Ok(());
        };

        self.context.queue.submit(encoder.finish());
        self.context.queue.flush()?;

        debug!(staging = self.staging.len(), "Uploads complete, releasing staging buffers");
        for buffer in self.staging.drain(..) {
            buffer.destroy();
        }
        Ok(())
    }

    fn create_pipeline(
        &mut self,
        desc: &PipelineDesc,
        shaders: Option<&ShaderBlobs>,
    ) -> Result<WgpuPipeline> {
        let device = &self.context.device;

        // 内置 WGSL 的两个入口在同一个模块里
        let (vertex_module, pixel_module, vs_entry, fs_entry) = match shaders {
            Some(blobs) => {
                if blobs.kind != ShaderBlobKind::SpirV {
                    return Err(GraphicsError::PipelineCreation(format!(
                        "wgpu backend cannot load {:?} shader blobs",
                        blobs.kind
                    ))
                    .into());
                }
                let vertex = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some("VertexShader"),
                    source: wgpu::util::make_spirv(&blobs.vertex),
                });
                let pixel = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some("PixelShader"),
                    source: wgpu::util::make_spirv(&blobs.pixel),
                });
                (vertex, Some(pixel), "main", "main")
            }
            None => {
                let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some("Built-in Mesh Shader"),
                    source: wgpu::ShaderSource::Wgsl(include_str!("../../renderer/shaders/mesh.wgsl").into()),
                });
                (module, None, "vs_main", "fs_main")
            }
        };

        let pixel_module = pixel_module.as_ref().unwrap_or(&vertex_module);

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("MVP Uniform Buffer"),
            size: desc.root_signature.constants_size(),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("MVP Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("MVP Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let attributes: Vec<wgpu::VertexAttribute> = desc
            .vertex_layout
            .iter()
            .map(|attr| wgpu::VertexAttribute {
                offset: attr.offset as wgpu::BufferAddress,
                shader_location: attr.location,
                format: match attr.format {
                    VertexFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
                    VertexFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
                },
            })
            .collect();

        let color_format = color_target_format(
            texture_format(desc.color_format),
            self.context.surface_config.format,
        );
        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(desc.label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: vs_entry,
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: desc.vertex_stride as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &attributes,
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: pixel_module,
                entry_point: fs_entry,
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: primitive_topology(desc.topology),
                strip_index_format: None,
                front_face: match desc.front_face {
                    FrontFace::Clockwise => wgpu::FrontFace::Cw,
                    FrontFace::CounterClockwise => wgpu::FrontFace::Ccw,
                },
                cull_mode: match desc.cull_mode {
                    CullMode::None => None,
                    CullMode::Front => Some(wgpu::Face::Front),
                    CullMode::Back => Some(wgpu::Face::Back),
                },
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: texture_format(desc.depth_format),
                depth_write_enabled: desc.depth_write,
                depth_compare: match desc.depth_compare {
                    CompareFunction::Less => wgpu::CompareFunction::Less,
                    CompareFunction::LessEqual => wgpu::CompareFunction::LessEqual,
                    CompareFunction::Always => wgpu::CompareFunction::Always,
                },
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        });

        info!(
            label = desc.label,
            builtin_shaders = shaders.is_none(),
            format = ?color_format,
            "wgpu pipeline created"
        );

        Ok(WgpuPipeline {
            render_pipeline,
            uniform_buffer,
            bind_group,
        })
    }

    fn create_depth_buffer(&mut self, desc: &DepthBufferDesc) -> Result<WgpuDepthBuffer> {
        let texture = self.context.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: desc.extent.width,
                height: desc.extent.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format(desc.format),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        debug!(width = desc.extent.width, height = desc.extent.height, "Depth texture created");
        Ok(WgpuDepthBuffer {
            texture,
            view,
            extent: desc.extent,
        })
    }

    fn resize_swap_chain(&mut self, extent: Extent2D) -> Result<()> {
        // 未呈现的图像必须在重新配置前释放
        self.pending_frame = None;
        self.context.reconfigure_surface(extent);
        self.backbuffer_index = 0;
        Ok(())
    }

    fn execute_frame(&mut self, frame: &FrameCommands<'_, Self>) -> Result<FenceValue> {
        let output = self.acquire_surface_texture()?;
        let target = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let pipeline = frame.pipeline;
        self.context.queue.raw().write_buffer(
            &pipeline.uniform_buffer,
            0,
            bytemuck::cast_slice(&frame.constants),
        );

        let width = self.context.surface_config.width;
        let height = self.context.surface_config.height;
        let scissor_x = frame.scissor.left.max(0) as u32;
        let scissor_y = frame.scissor.top.max(0) as u32;
        let scissor_right = (frame.scissor.right.max(0) as u32).min(width);
        let scissor_bottom = (frame.scissor.bottom.max(0) as u32).min(height);

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let [r, g, b, a] = frame.clear_color;
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Mesh Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &frame.depth_buffer.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(frame.clear_depth),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&pipeline.render_pipeline);
            render_pass.set_bind_group(0, &pipeline.bind_group, &[]);
            render_pass.set_viewport(
                frame.viewport.x,
                frame.viewport.y,
                frame.viewport.width,
                frame.viewport.height,
                frame.viewport.min_depth,
                frame.viewport.max_depth,
            );
            render_pass.set_scissor_rect(
                scissor_x,
                scissor_y,
                scissor_right.saturating_sub(scissor_x),
                scissor_bottom.saturating_sub(scissor_y),
            );
            render_pass.set_vertex_buffer(0, frame.vertex_buffer.buffer.slice(..frame.vertex_buffer.byte_size));
            render_pass.set_index_buffer(
                frame.index_buffer.buffer.slice(..frame.index_buffer.byte_size),
                wgpu::IndexFormat::Uint16,
            );
            render_pass.draw_indexed(0..frame.index_count, 0, 0..1);
        }

        self.context.queue.submit(encoder.finish());
        self.pending_frame = Some(output);
        self.context.queue.signal()
    }

    fn present(&mut self) -> Result<usize> {
        let output = self.pending_frame.take().ok_or_else(|| {
            GraphicsError::SwapchainError("present called without a submitted frame".to_string())
        })?;
        output.present();

        self.backbuffer_index = (self.backbuffer_index + 1) % self.backbuffer_count;
        Ok(self.backbuffer_index)
    }

    fn set_vsync(&mut self, vsync: bool) {
        self.context.set_vsync(vsync);
    }
}

fn texture_format(format: TextureFormat) -> wgpu::TextureFormat {
    match format {
        TextureFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        TextureFormat::Depth32Float => wgpu::TextureFormat::Depth32Float,
    }
}

fn primitive_topology(topology: PrimitiveTopology) -> wgpu::PrimitiveTopology {
    match topology {
        PrimitiveTopology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
    }
}

/// 渲染目标是交换链表面，表面不支持请求的格式时（例如只有 Bgra8Unorm）使用表面格式
fn color_target_format(requested: wgpu::TextureFormat, surface: wgpu::TextureFormat) -> wgpu::TextureFormat {
    if requested != surface {
        debug!(?requested, ?surface, "Color target follows the surface format");
    }
    surface
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_formats() {
        let desc = PipelineDesc::forward();
        assert_eq!(texture_format(desc.color_format), wgpu::TextureFormat::Rgba8Unorm);
        assert_eq!(texture_format(desc.depth_format), wgpu::TextureFormat::Depth32Float);
        assert_eq!(
            primitive_topology(desc.topology),
            wgpu::PrimitiveTopology::TriangleList
        );
    }

    #[test]
    fn test_color_target_follows_surface() {
        let rgba = wgpu::TextureFormat::Rgba8Unorm;
        let bgra = wgpu::TextureFormat::Bgra8Unorm;
        assert_eq!(color_target_format(rgba, rgba), rgba);
        assert_eq!(color_target_format(rgba, bgra), bgra);
    }

    #[test]
    fn test_depth_texture_format_from_desc() {
        let desc = DepthBufferDesc::for_client_area(Extent2D::new(0, 0));
        assert_eq!(texture_format(desc.format), wgpu::TextureFormat::Depth32Float);
        assert_eq!(desc.extent, Extent2D::new(1, 1));
    }
}
