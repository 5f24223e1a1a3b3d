//! DirectX 12 渲染后端
//!
//! - 缓冲区：default heap 目标 + upload heap 中转，复制在 COPY 队列上执行
//! - 根签名：优先 1.1，设备不支持时回退到 1.0
//! - 每个交换链图像一个命令分配器，重置前由帧驱动保证其 fence 已完成

use std::ffi::{c_void, CString};
use std::mem::ManuallyDrop;
use std::sync::Arc;

use tracing::{debug, info};
use windows::core::{HSTRING, PCSTR};
use windows::Win32::Foundation::RECT;
use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;
use winit::window::Window;

use crate::core::error::{GraphicsError, Result};
use crate::core::Config;
use crate::geometry::vertex::VertexFormat;
use crate::gfx::dx12::context::{Dx12Context, BACKBUFFER_FORMAT};
use crate::gfx::dx12::queue::Dx12CommandQueue;
use crate::renderer::backend_trait::RenderBackend;
use crate::renderer::frame::FrameCommands;
use crate::renderer::pipeline::{
    CompareFunction, CullMode, FrontFace, PipelineDesc, PrimitiveTopology, RootSignatureDesc,
    RootSignatureVersion, ShaderVisibility,
};
use crate::renderer::resource::{
    BufferUpload, BufferUsage, DepthBufferDesc, Extent2D, MemoryType, TextureFormat,
};
use crate::renderer::shaders::{ShaderBlobKind, ShaderBlobs};
use crate::renderer::sync::{FenceValue, GpuQueue};

/// GPU 本地缓冲区及其视图
pub struct Dx12Buffer {
    pub resource: ID3D12Resource,
    pub view: Dx12BufferView,
}

pub enum Dx12BufferView {
    Vertex(D3D12_VERTEX_BUFFER_VIEW),
    Index(D3D12_INDEX_BUFFER_VIEW),
}

/// 根签名 + PSO
pub struct Dx12Pipeline {
    pub root_signature: ID3D12RootSignature,
    pub pipeline_state: ID3D12PipelineState,
    pub root_signature_version: RootSignatureVersion,
    pub topology: D3D_PRIMITIVE_TOPOLOGY,
}

/// 深度缓冲区，DSV 在后端的 DSV 堆中
pub struct Dx12DepthBuffer {
    pub resource: ID3D12Resource,
    pub extent: Extent2D,
}

/// COPY 队列上的上传状态
struct UploadContext {
    queue: Dx12CommandQueue,
    allocator: ID3D12CommandAllocator,
    command_list: ID3D12GraphicsCommandList,
    /// 命令列表处于录制状态
    recording: bool,
    /// 等待复制完成的中转缓冲区
    staging: Vec<ID3D12Resource>,
}

pub struct Dx12Backend {
    context: Dx12Context,
    upload: UploadContext,
    command_allocators: Vec<ID3D12CommandAllocator>,
    command_list: ID3D12GraphicsCommandList,
    dsv_heap: ID3D12DescriptorHeap,
    vsync: bool,
}

impl Dx12Backend {
    pub fn new(window: Arc<Window>, config: &Config) -> Result<Self> {
        let context = Dx12Context::new(window, config)?;

        unsafe {
            let device = &context.device;

            let command_allocators = (0..context.backbuffer_count)
                .map(|_| create_command_allocator(device, D3D12_COMMAND_LIST_TYPE_DIRECT))
                .collect::<Result<Vec<_>>>()?;
            let command_list =
                create_command_list(device, D3D12_COMMAND_LIST_TYPE_DIRECT, &command_allocators[0])?;

            let upload_queue = Dx12CommandQueue::new(device, D3D12_COMMAND_LIST_TYPE_COPY)?;
            let upload_allocator = create_command_allocator(device, D3D12_COMMAND_LIST_TYPE_COPY)?;
            let upload_list =
                create_command_list(device, D3D12_COMMAND_LIST_TYPE_COPY, &upload_allocator)?;

            let dsv_heap_desc = D3D12_DESCRIPTOR_HEAP_DESC {
                NumDescriptors: 1,
                Type: D3D12_DESCRIPTOR_HEAP_TYPE_DSV,
                Flags: D3D12_DESCRIPTOR_HEAP_FLAG_NONE,
                NodeMask: 0,
            };
            let dsv_heap: ID3D12DescriptorHeap = device
                .CreateDescriptorHeap(&dsv_heap_desc)
                .map_err(|e| GraphicsError::ResourceCreation(format!("Failed to create DSV heap: {}", e)))?;

            debug!(
                allocators = command_allocators.len(),
                "DX12 command allocators created"
            );

            Ok(Self {
                context,
                upload: UploadContext {
                    queue: upload_queue,
                    allocator: upload_allocator,
                    command_list: upload_list,
                    recording: false,
                    staging: Vec::new(),
                },
                command_allocators,
                command_list,
                dsv_heap,
                vsync: config.graphics.vsync,
            })
        }
    }

    pub fn window(&self) -> &Window {
        self.context.window()
    }

    /// 设备支持的最高根签名版本
    fn root_signature_version(&self) -> RootSignatureVersion {
        let mut feature_data = D3D12_FEATURE_DATA_ROOT_SIGNATURE {
            HighestVersion: D3D_ROOT_SIGNATURE_VERSION_1_1,
        };
        let supported = unsafe {
            self.context
                .device
                .CheckFeatureSupport(
                    D3D12_FEATURE_ROOT_SIGNATURE,
                    &mut feature_data as *mut _ as *mut c_void,
                    std::mem::size_of::<D3D12_FEATURE_DATA_ROOT_SIGNATURE>() as u32,
                )
                .is_ok()
        };
        RootSignatureVersion::negotiate(
            supported && feature_data.HighestVersion == D3D_ROOT_SIGNATURE_VERSION_1_1,
        )
    }

    fn create_root_signature(
        &self,
        desc: &RootSignatureDesc,
    ) -> Result<(ID3D12RootSignature, RootSignatureVersion)> {
        let version = self.root_signature_version();
        let flags = root_signature_flags(desc);

        let params_1_1: Vec<D3D12_ROOT_PARAMETER1> = desc
            .constants
            .iter()
            .map(|c| D3D12_ROOT_PARAMETER1 {
                ParameterType: D3D12_ROOT_PARAMETER_TYPE_32BIT_CONSTANTS,
                Anonymous: D3D12_ROOT_PARAMETER1_0 {
                    Constants: D3D12_ROOT_CONSTANTS {
                        ShaderRegister: c.shader_register,
                        RegisterSpace: c.register_space,
                        Num32BitValues: c.num_32bit_values,
                    },
                },
                ShaderVisibility: shader_visibility(c.visibility),
            })
            .collect();
        let params_1_0: Vec<D3D12_ROOT_PARAMETER> = desc
            .constants
            .iter()
            .map(|c| D3D12_ROOT_PARAMETER {
                ParameterType: D3D12_ROOT_PARAMETER_TYPE_32BIT_CONSTANTS,
                Anonymous: D3D12_ROOT_PARAMETER_0 {
                    Constants: D3D12_ROOT_CONSTANTS {
                        ShaderRegister: c.shader_register,
                        RegisterSpace: c.register_space,
                        Num32BitValues: c.num_32bit_values,
                    },
                },
                ShaderVisibility: shader_visibility(c.visibility),
            })
            .collect();

        let versioned_desc = match version {
            RootSignatureVersion::V1_1 => D3D12_VERSIONED_ROOT_SIGNATURE_DESC {
                Version: D3D_ROOT_SIGNATURE_VERSION_1_1,
                Anonymous: D3D12_VERSIONED_ROOT_SIGNATURE_DESC_0 {
                    Desc_1_1: D3D12_ROOT_SIGNATURE_DESC1 {
                        NumParameters: params_1_1.len() as u32,
                        pParameters: params_1_1.as_ptr(),
                        NumStaticSamplers: 0,
                        pStaticSamplers: std::ptr::null(),
                        Flags: flags,
                    },
                },
            },
            RootSignatureVersion::V1_0 => D3D12_VERSIONED_ROOT_SIGNATURE_DESC {
                Version: D3D_ROOT_SIGNATURE_VERSION_1_0,
                Anonymous: D3D12_VERSIONED_ROOT_SIGNATURE_DESC_0 {
                    Desc_1_0: D3D12_ROOT_SIGNATURE_DESC {
                        NumParameters: params_1_0.len() as u32,
                        pParameters: params_1_0.as_ptr(),
                        NumStaticSamplers: 0,
                        pStaticSamplers: std::ptr::null(),
                        Flags: flags,
                    },
                },
            },
        };

        unsafe {
            let mut signature: Option<ID3DBlob> = None;
            let mut error: Option<ID3DBlob> = None;
            if let Err(e) =
                D3D12SerializeVersionedRootSignature(&versioned_desc, &mut signature, Some(&mut error))
            {
                let message = error
                    .map(|blob| blob_to_string(&blob))
                    .unwrap_or_else(|| e.to_string());
                return Err(GraphicsError::PipelineCreation(format!(
                    "Failed to serialize root signature: {}",
                    message
                ))
                .into());
            }
            let signature = signature.ok_or_else(|| {
                GraphicsError::PipelineCreation("Root signature serialization returned no blob".to_string())
            })?;

            let root_signature: ID3D12RootSignature = self
                .context
                .device
                .CreateRootSignature(
                    0,
                    std::slice::from_raw_parts(
                        signature.GetBufferPointer() as *const u8,
                        signature.GetBufferSize(),
                    ),
                )
                .map_err(|e| {
                    GraphicsError::PipelineCreation(format!("Failed to create root signature: {}", e))
                })?;

            debug!(version = ?version, "Root signature created");
            Ok((root_signature, version))
        }
    }

    fn create_buffer(
        &self,
        size: u64,
        memory_type: MemoryType,
        name: Option<&str>,
    ) -> Result<ID3D12Resource> {
        let (heap_type, initial_state) = match memory_type {
            MemoryType::DeviceLocal => (D3D12_HEAP_TYPE_DEFAULT, D3D12_RESOURCE_STATE_COMMON),
            MemoryType::HostVisible => (D3D12_HEAP_TYPE_UPLOAD, D3D12_RESOURCE_STATE_GENERIC_READ),
        };

        let heap_props = D3D12_HEAP_PROPERTIES {
            Type: heap_type,
            ..Default::default()
        };
        let resource_desc = D3D12_RESOURCE_DESC {
            Dimension: D3D12_RESOURCE_DIMENSION_BUFFER,
            Width: size,
            Height: 1,
            DepthOrArraySize: 1,
            MipLevels: 1,
            SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
            Layout: D3D12_TEXTURE_LAYOUT_ROW_MAJOR,
            ..Default::default()
        };

        unsafe {
            let mut resource: Option<ID3D12Resource> = None;
            self.context
                .device
                .CreateCommittedResource(
                    &heap_props,
                    D3D12_HEAP_FLAG_NONE,
                    &resource_desc,
                    initial_state,
                    None,
                    &mut resource,
                )
                .map_err(|e| GraphicsError::ResourceCreation(format!("Failed to create buffer: {}", e)))?;
            let resource = resource
                .ok_or_else(|| GraphicsError::ResourceCreation("CreateCommittedResource returned no buffer".to_string()))?;

            if let Some(name) = name {
                let _ = resource.SetName(&HSTRING::from(name));
            }
            Ok(resource)
        }
    }

    /// 复制命令列表进入录制状态
    fn begin_upload(&mut self) -> Result<()> {
        if self.upload.recording {
            return Ok(());
        }
        unsafe {
            self.upload
                .allocator
                .Reset()
                .map_err(|e| GraphicsError::CommandExecution(format!("Failed to reset copy allocator: {}", e)))?;
            self.upload
                .command_list
                .Reset(&self.upload.allocator, None::<&ID3D12PipelineState>)
                .map_err(|e| GraphicsError::CommandExecution(format!("Failed to reset copy list: {}", e)))?;
        }
        self.upload.recording = true;
        Ok(())
    }
}

impl RenderBackend for Dx12Backend {
    type Buffer = Dx12Buffer;
    type Pipeline = Dx12Pipeline;
    type DepthBuffer = Dx12DepthBuffer;
    type Queue = Dx12CommandQueue;

    fn name(&self) -> &'static str {
        "DirectX 12"
    }

    fn direct_queue(&self) -> &Dx12CommandQueue {
        &self.context.direct_queue
    }

    fn backbuffer_count(&self) -> usize {
        self.context.backbuffer_count as usize
    }

    fn current_backbuffer_index(&self) -> usize {
        self.context.current_backbuffer_index()
    }

    fn client_size(&self) -> Extent2D {
        let size = self.context.window().inner_size();
        Extent2D::new(size.width, size.height)
    }

    fn shader_blob_kind(&self) -> ShaderBlobKind {
        ShaderBlobKind::Dxbc
    }

    fn upload_buffer(&mut self, upload: &BufferUpload<'_>) -> Result<Dx12Buffer> {
        let destination = self.create_buffer(
            upload.destination.size,
            upload.destination.memory_type,
            upload.destination.name.as_deref(),
        )?;
        let staging = self.create_buffer(
            upload.staging.size,
            upload.staging.memory_type,
            upload.staging.name.as_deref(),
        )?;

        unsafe {
            let mut mapped: *mut c_void = std::ptr::null_mut();
            staging
                .Map(0, None, Some(&mut mapped))
                .map_err(|e| GraphicsError::ResourceCreation(format!("Failed to map staging buffer: {}", e)))?;
            std::ptr::copy_nonoverlapping(upload.bytes.as_ptr(), mapped as *mut u8, upload.bytes.len());
            staging.Unmap(0, None);
        }

        self.begin_upload()?;
        unsafe {
            self.upload
                .command_list
                .CopyBufferRegion(&destination, 0, &staging, 0, upload.copy_size());
        }
        self.upload.staging.push(staging);

        let location = unsafe { destination.GetGPUVirtualAddress() };
        let view = match upload.destination.usage {
            BufferUsage::Index => Dx12BufferView::Index(D3D12_INDEX_BUFFER_VIEW {
                BufferLocation: location,
                SizeInBytes: upload.byte_size as u32,
                Format: DXGI_FORMAT_R16_UINT,
            }),
            _ => Dx12BufferView::Vertex(D3D12_VERTEX_BUFFER_VIEW {
                BufferLocation: location,
                SizeInBytes: upload.byte_size as u32,
                StrideInBytes: upload.element_size,
            }),
        };

        debug!(
            name = upload.destination.name.as_deref().unwrap_or(""),
            bytes = upload.byte_size,
            "Buffer copy recorded"
        );

        Ok(Dx12Buffer {
            resource: destination,
            view,
        })
    }

    fn finish_uploads(&mut self) -> Result<()> {
        if !self.upload.recording {
            return Ok(());
        }

        unsafe {
            self.upload
                .command_list
                .Close()
                .map_err(|e| GraphicsError::CommandExecution(format!("Failed to close copy list: {}", e)))?;
        }
        self.upload.recording = false;
        self.upload.queue.execute(&self.upload.command_list);
        self.upload.queue.flush()?;

        debug!(staging = self.upload.staging.len(), "Uploads complete, releasing staging buffers");
        self.upload.staging.clear();
        Ok(())
    }

    fn create_pipeline(
        &mut self,
        desc: &PipelineDesc,
        shaders: Option<&ShaderBlobs>,
    ) -> Result<Dx12Pipeline> {
        let shaders = shaders.ok_or_else(|| {
            GraphicsError::PipelineCreation("DX12 backend requires precompiled shader blobs".to_string())
        })?;
        // RTV 按交换链格式创建
        let color_format = dxgi_format(desc.color_format);
        if color_format != BACKBUFFER_FORMAT {
            return Err(GraphicsError::PipelineCreation(format!(
                "Color format {:?} does not match the swap chain",
                desc.color_format
            ))
            .into());
        }
        let (root_signature, root_signature_version) = self.create_root_signature(&desc.root_signature)?;

        // 指针在 CreateGraphicsPipelineState 返回前必须有效
        let names = semantic_names(desc)?;
        let input_element_descs: Vec<D3D12_INPUT_ELEMENT_DESC> = desc
            .vertex_layout
            .iter()
            .zip(&names)
            .map(|(attr, name)| D3D12_INPUT_ELEMENT_DESC {
                SemanticName: PCSTR(name.as_ptr().cast()),
                SemanticIndex: 0,
                Format: vertex_format(attr.format),
                InputSlot: 0,
                AlignedByteOffset: attr.offset as u32,
                InputSlotClass: D3D12_INPUT_CLASSIFICATION_PER_VERTEX_DATA,
                InstanceDataStepRate: 0,
            })
            .collect();

        let mut pso_desc = D3D12_GRAPHICS_PIPELINE_STATE_DESC::default();
        pso_desc.pRootSignature = ManuallyDrop::new(Some(root_signature.clone()));
        pso_desc.VS = D3D12_SHADER_BYTECODE {
            pShaderBytecode: shaders.vertex.as_ptr() as *const c_void,
            BytecodeLength: shaders.vertex.len(),
        };
        pso_desc.PS = D3D12_SHADER_BYTECODE {
            pShaderBytecode: shaders.pixel.as_ptr() as *const c_void,
            BytecodeLength: shaders.pixel.len(),
        };
        pso_desc.BlendState = D3D12_BLEND_DESC {
            AlphaToCoverageEnable: false.into(),
            IndependentBlendEnable: false.into(),
            RenderTarget: [D3D12_RENDER_TARGET_BLEND_DESC {
                BlendEnable: false.into(),
                LogicOpEnable: false.into(),
                SrcBlend: D3D12_BLEND_ONE,
                DestBlend: D3D12_BLEND_ZERO,
                BlendOp: D3D12_BLEND_OP_ADD,
                SrcBlendAlpha: D3D12_BLEND_ONE,
                DestBlendAlpha: D3D12_BLEND_ZERO,
                BlendOpAlpha: D3D12_BLEND_OP_ADD,
                LogicOp: D3D12_LOGIC_OP_NOOP,
                RenderTargetWriteMask: D3D12_COLOR_WRITE_ENABLE_ALL.0 as u8,
            }; 8],
        };
        pso_desc.RasterizerState = D3D12_RASTERIZER_DESC {
            FillMode: D3D12_FILL_MODE_SOLID,
            CullMode: match desc.cull_mode {
                CullMode::None => D3D12_CULL_MODE_NONE,
                CullMode::Front => D3D12_CULL_MODE_FRONT,
                CullMode::Back => D3D12_CULL_MODE_BACK,
            },
            FrontCounterClockwise: (desc.front_face == FrontFace::CounterClockwise).into(),
            DepthClipEnable: true.into(),
            ..Default::default()
        };
        pso_desc.DepthStencilState = D3D12_DEPTH_STENCIL_DESC {
            DepthEnable: true.into(),
            DepthWriteMask: if desc.depth_write {
                D3D12_DEPTH_WRITE_MASK_ALL
            } else {
                D3D12_DEPTH_WRITE_MASK_ZERO
            },
            DepthFunc: match desc.depth_compare {
                CompareFunction::Less => D3D12_COMPARISON_FUNC_LESS,
                CompareFunction::LessEqual => D3D12_COMPARISON_FUNC_LESS_EQUAL,
                CompareFunction::Always => D3D12_COMPARISON_FUNC_ALWAYS,
            },
            StencilEnable: false.into(),
            StencilReadMask: 0xFF,
            StencilWriteMask: 0xFF,
            FrontFace: D3D12_DEPTH_STENCILOP_DESC::default(),
            BackFace: D3D12_DEPTH_STENCILOP_DESC::default(),
        };
        pso_desc.SampleMask = u32::MAX;
        pso_desc.DSVFormat = dxgi_format(desc.depth_format);
        pso_desc.InputLayout = D3D12_INPUT_LAYOUT_DESC {
            pInputElementDescs: input_element_descs.as_ptr(),
            NumElements: input_element_descs.len() as u32,
        };
        pso_desc.PrimitiveTopologyType = topology_type(desc.topology);
        pso_desc.NumRenderTargets = 1;
        pso_desc.RTVFormats[0] = color_format;
        pso_desc.SampleDesc.Count = 1;

        let pipeline_state: windows::core::Result<ID3D12PipelineState> =
            unsafe { self.context.device.CreateGraphicsPipelineState(&pso_desc) };
        // 释放描述中持有的根签名引用
        unsafe { ManuallyDrop::drop(&mut pso_desc.pRootSignature) };
        let pipeline_state = pipeline_state
            .map_err(|e| GraphicsError::PipelineCreation(format!("Failed to create PSO: {}", e)))?;

        info!(label = desc.label, root_signature = ?root_signature_version, "DX12 pipeline created");

        Ok(Dx12Pipeline {
            root_signature,
            pipeline_state,
            root_signature_version,
            topology: primitive_topology(desc.topology),
        })
    }

    fn create_depth_buffer(&mut self, desc: &DepthBufferDesc) -> Result<Dx12DepthBuffer> {
        let format = dxgi_format(desc.format);
        let heap_props = D3D12_HEAP_PROPERTIES {
            Type: D3D12_HEAP_TYPE_DEFAULT,
            ..Default::default()
        };
        let resource_desc = D3D12_RESOURCE_DESC {
            Dimension: D3D12_RESOURCE_DIMENSION_TEXTURE2D,
            Width: desc.extent.width as u64,
            Height: desc.extent.height,
            DepthOrArraySize: 1,
            MipLevels: 1,
            Format: format,
            SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
            Layout: D3D12_TEXTURE_LAYOUT_UNKNOWN,
            Flags: D3D12_RESOURCE_FLAG_ALLOW_DEPTH_STENCIL,
            ..Default::default()
        };
        let clear_value = D3D12_CLEAR_VALUE {
            Format: format,
            Anonymous: D3D12_CLEAR_VALUE_0 {
                DepthStencil: D3D12_DEPTH_STENCIL_VALUE {
                    Depth: desc.clear_depth,
                    Stencil: 0,
                },
            },
        };

        unsafe {
            let mut resource: Option<ID3D12Resource> = None;
            self.context
                .device
                .CreateCommittedResource(
                    &heap_props,
                    D3D12_HEAP_FLAG_NONE,
                    &resource_desc,
                    D3D12_RESOURCE_STATE_DEPTH_WRITE,
                    Some(&clear_value),
                    &mut resource,
                )
                .map_err(|e| GraphicsError::ResourceCreation(format!("Failed to create depth buffer: {}", e)))?;
            let resource = resource
                .ok_or_else(|| GraphicsError::ResourceCreation("CreateCommittedResource returned no depth buffer".to_string()))?;

            let dsv_desc = D3D12_DEPTH_STENCIL_VIEW_DESC {
                Format: format,
                ViewDimension: D3D12_DSV_DIMENSION_TEXTURE2D,
                Flags: D3D12_DSV_FLAG_NONE,
                Anonymous: D3D12_DEPTH_STENCIL_VIEW_DESC_0 {
                    Texture2D: D3D12_TEX2D_DSV { MipSlice: 0 },
                },
            };
            self.context.device.CreateDepthStencilView(
                &resource,
                Some(&dsv_desc),
                self.dsv_heap.GetCPUDescriptorHandleForHeapStart(),
            );

            debug!(width = desc.extent.width, height = desc.extent.height, "Depth buffer created");
            Ok(Dx12DepthBuffer {
                resource,
                extent: desc.extent,
            })
        }
    }

    fn resize_swap_chain(&mut self, extent: Extent2D) -> Result<()> {
        self.context.resize_buffers(extent)
    }

    fn execute_frame(&mut self, frame: &FrameCommands<'_, Self>) -> Result<FenceValue> {
        let index = frame.backbuffer_index;
        let allocator = &self.command_allocators[index];
        let render_target = &self.context.render_targets[index];
        let pipeline = frame.pipeline;

        unsafe {
            allocator
                .Reset()
                .map_err(|e| GraphicsError::CommandExecution(format!("Failed to reset command allocator: {}", e)))?;
            self.command_list
                .Reset(allocator, Some(&pipeline.pipeline_state))
                .map_err(|e| GraphicsError::CommandExecution(format!("Failed to reset command list: {}", e)))?;

            let barrier = transition_barrier(
                render_target,
                D3D12_RESOURCE_STATE_PRESENT,
                D3D12_RESOURCE_STATE_RENDER_TARGET,
            );
            self.command_list.ResourceBarrier(std::slice::from_ref(&barrier));
            release_barrier(barrier);

            let rtv_handle = self.context.rtv_handle(index);
            let dsv_handle = self.dsv_heap.GetCPUDescriptorHandleForHeapStart();

            self.command_list
                .ClearRenderTargetView(rtv_handle, &frame.clear_color, None);
            self.command_list.ClearDepthStencilView(
                dsv_handle,
                D3D12_CLEAR_FLAG_DEPTH,
                frame.clear_depth,
                0,
                None,
            );

            self.command_list.SetPipelineState(&pipeline.pipeline_state);
            self.command_list
                .SetGraphicsRootSignature(&pipeline.root_signature);

            self.command_list
                .IASetPrimitiveTopology(pipeline.topology);
            if let Dx12BufferView::Vertex(view) = &frame.vertex_buffer.view {
                self.command_list.IASetVertexBuffers(0, Some(&[*view]));
            }
            if let Dx12BufferView::Index(view) = &frame.index_buffer.view {
                self.command_list.IASetIndexBuffer(Some(view));
            }

            let viewport = D3D12_VIEWPORT {
                TopLeftX: frame.viewport.x,
                TopLeftY: frame.viewport.y,
                Width: frame.viewport.width,
                Height: frame.viewport.height,
                MinDepth: frame.viewport.min_depth,
                MaxDepth: frame.viewport.max_depth,
            };
            let scissor_rect = RECT {
                left: frame.scissor.left,
                top: frame.scissor.top,
                right: frame.scissor.right,
                bottom: frame.scissor.bottom,
            };
            self.command_list.RSSetViewports(&[viewport]);
            self.command_list.RSSetScissorRects(&[scissor_rect]);

            self.command_list
                .OMSetRenderTargets(1, Some(&rtv_handle), false, Some(&dsv_handle));

            self.command_list.SetGraphicsRoot32BitConstants(
                0,
                frame.constants.len() as u32,
                frame.constants.as_ptr() as *const c_void,
                0,
            );

            self.command_list
                .DrawIndexedInstanced(frame.index_count, 1, 0, 0, 0);

            let barrier = transition_barrier(
                render_target,
                D3D12_RESOURCE_STATE_RENDER_TARGET,
                D3D12_RESOURCE_STATE_PRESENT,
            );
            self.command_list.ResourceBarrier(std::slice::from_ref(&barrier));
            release_barrier(barrier);

            self.command_list
                .Close()
                .map_err(|e| GraphicsError::CommandExecution(format!("Failed to close command list: {}", e)))?;
        }

        self.context.direct_queue.execute(&self.command_list);
        self.context.direct_queue.signal()
    }

    fn present(&mut self) -> Result<usize> {
        self.context.present(self.vsync)?;
        Ok(self.context.current_backbuffer_index())
    }

    fn set_vsync(&mut self, vsync: bool) {
        self.vsync = vsync;
    }
}

unsafe fn create_command_allocator(
    device: &ID3D12Device,
    kind: D3D12_COMMAND_LIST_TYPE,
) -> Result<ID3D12CommandAllocator> {
    device
        .CreateCommandAllocator(kind)
        .map_err(|e| GraphicsError::DeviceCreation(format!("Failed to create command allocator: {}", e)).into())
}

/// 创建命令列表并关闭，使用前需要 Reset
unsafe fn create_command_list(
    device: &ID3D12Device,
    kind: D3D12_COMMAND_LIST_TYPE,
    allocator: &ID3D12CommandAllocator,
) -> Result<ID3D12GraphicsCommandList> {
    let command_list: ID3D12GraphicsCommandList = device
        .CreateCommandList(0, kind, allocator, None::<&ID3D12PipelineState>)
        .map_err(|e| GraphicsError::DeviceCreation(format!("Failed to create command list: {}", e)))?;
    command_list
        .Close()
        .map_err(|e| GraphicsError::DeviceCreation(format!("Failed to close new command list: {}", e)))?;
    Ok(command_list)
}

fn transition_barrier(
    resource: &ID3D12Resource,
    before: D3D12_RESOURCE_STATES,
    after: D3D12_RESOURCE_STATES,
) -> D3D12_RESOURCE_BARRIER {
    D3D12_RESOURCE_BARRIER {
        Type: D3D12_RESOURCE_BARRIER_TYPE_TRANSITION,
        Flags: D3D12_RESOURCE_BARRIER_FLAG_NONE,
        Anonymous: D3D12_RESOURCE_BARRIER_0 {
            Transition: ManuallyDrop::new(D3D12_RESOURCE_TRANSITION_BARRIER {
                pResource: ManuallyDrop::new(Some(resource.clone())),
                Subresource: D3D12_RESOURCE_BARRIER_ALL_SUBRESOURCES,
                StateBefore: before,
                StateAfter: after,
            }),
        },
    }
}

/// 释放屏障中持有的资源引用
fn release_barrier(barrier: D3D12_RESOURCE_BARRIER) {
    unsafe {
        let transition = ManuallyDrop::into_inner(barrier.Anonymous.Transition);
        drop(ManuallyDrop::into_inner(transition.pResource));
    }
}

fn root_signature_flags(desc: &RootSignatureDesc) -> D3D12_ROOT_SIGNATURE_FLAGS {
    let mut flags = D3D12_ROOT_SIGNATURE_FLAG_NONE;
    if desc.flags.allow_input_assembler_input_layout {
        flags = flags | D3D12_ROOT_SIGNATURE_FLAG_ALLOW_INPUT_ASSEMBLER_INPUT_LAYOUT;
    }
    if desc.flags.deny_hull_shader_root_access {
        flags = flags | D3D12_ROOT_SIGNATURE_FLAG_DENY_HULL_SHADER_ROOT_ACCESS;
    }
    if desc.flags.deny_domain_shader_root_access {
        flags = flags | D3D12_ROOT_SIGNATURE_FLAG_DENY_DOMAIN_SHADER_ROOT_ACCESS;
    }
    if desc.flags.deny_geometry_shader_root_access {
        flags = flags | D3D12_ROOT_SIGNATURE_FLAG_DENY_GEOMETRY_SHADER_ROOT_ACCESS;
    }
    if desc.flags.deny_pixel_shader_root_access {
        flags = flags | D3D12_ROOT_SIGNATURE_FLAG_DENY_PIXEL_SHADER_ROOT_ACCESS;
    }
    flags
}

fn shader_visibility(visibility: ShaderVisibility) -> D3D12_SHADER_VISIBILITY {
    match visibility {
        ShaderVisibility::All => D3D12_SHADER_VISIBILITY_ALL,
        ShaderVisibility::Vertex => D3D12_SHADER_VISIBILITY_VERTEX,
        ShaderVisibility::Pixel => D3D12_SHADER_VISIBILITY_PIXEL,
    }
}

/// 输入布局的 HLSL 语义名，与 `vertex_layout` 一一对应
fn semantic_names(desc: &PipelineDesc) -> Result<Vec<CString>> {
    let mut names = Vec::with_capacity(desc.vertex_layout.len());
    for attr in desc.vertex_layout.iter() {
        let name = CString::new(attr.semantic.name())
            .map_err(|e| GraphicsError::PipelineCreation(format!("Invalid semantic name: {}", e)))?;
        names.push(name);
    }
    Ok(names)
}

fn dxgi_format(format: TextureFormat) -> DXGI_FORMAT {
    match format {
        TextureFormat::Rgba8Unorm => DXGI_FORMAT_R8G8B8A8_UNORM,
        TextureFormat::Depth32Float => DXGI_FORMAT_D32_FLOAT,
    }
}

fn topology_type(topology: PrimitiveTopology) -> D3D12_PRIMITIVE_TOPOLOGY_TYPE {
    match topology {
        PrimitiveTopology::TriangleList => D3D12_PRIMITIVE_TOPOLOGY_TYPE_TRIANGLE,
    }
}

fn primitive_topology(topology: PrimitiveTopology) -> D3D_PRIMITIVE_TOPOLOGY {
    match topology {
        PrimitiveTopology::TriangleList => D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST,
    }
}

fn vertex_format(format: VertexFormat) -> DXGI_FORMAT {
    match format {
        VertexFormat::Float32x2 => DXGI_FORMAT_R32G32_FLOAT,
        VertexFormat::Float32x3 => DXGI_FORMAT_R32G32B32_FLOAT,
    }
}

fn blob_to_string(blob: &ID3DBlob) -> String {
    unsafe {
        let bytes = std::slice::from_raw_parts(blob.GetBufferPointer() as *const u8, blob.GetBufferSize());
        String::from_utf8_lossy(bytes).trim_end_matches('\0').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semantic_names_follow_layout() {
        let desc = PipelineDesc::forward();
        let names = semantic_names(&desc).unwrap();

        assert_eq!(names.len(), desc.vertex_layout.len());
        for (attr, name) in desc.vertex_layout.iter().zip(&names) {
            assert_eq!(name.to_str().unwrap(), attr.semantic.name());
        }
    }

    #[test]
    fn test_forward_formats_match_swap_chain() {
        let desc = PipelineDesc::forward();
        assert_eq!(dxgi_format(desc.color_format), BACKBUFFER_FORMAT);
        assert_eq!(dxgi_format(desc.depth_format), DXGI_FORMAT_D32_FLOAT);
        assert_eq!(topology_type(desc.topology), D3D12_PRIMITIVE_TOPOLOGY_TYPE_TRIANGLE);
        assert_eq!(primitive_topology(desc.topology), D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST);
    }
}
