//! 资源管理模块
//!
//! 后端无关的 GPU 资源描述：缓冲区上传计划和深度缓冲区描述。
//!
//! 顶点/索引缓冲区都通过中转缓冲区上传：
//! 目标缓冲区在 GPU 本地内存（D3D12 default heap），
//! 中转缓冲区 CPU 可见（upload heap），由 GPU 复制到目标。
//! 中转缓冲区必须存活到上传的 fence 完成。

use bytemuck::Pod;
use std::mem::size_of;

use crate::core::error::{GraphicsError, Result};

/// 缓冲区复制的对齐要求（wgpu `COPY_BUFFER_ALIGNMENT`）
pub const COPY_ALIGNMENT: u64 = 4;

/// 缓冲区用途
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// 顶点缓冲区
    Vertex,
    /// 索引缓冲区
    Index,
    /// 中转缓冲区（CPU -> GPU）
    Staging,
}

/// 缓冲区内存类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryType {
    /// GPU本地内存（D3D12 default heap）
    DeviceLocal,
    /// CPU可见内存（D3D12 upload heap）
    HostVisible,
}

/// 缓冲区描述信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDescriptor {
    /// 分配大小（字节，已对齐）
    pub size: u64,
    /// 使用类型
    pub usage: BufferUsage,
    /// 内存类型
    pub memory_type: MemoryType,
    /// 调试名称
    pub name: Option<String>,
}

impl BufferDescriptor {
    pub fn new(size: u64, usage: BufferUsage, memory_type: MemoryType) -> Self {
        Self {
            size,
            usage,
            memory_type,
            name: None,
        }
    }

    /// 设置调试名称
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// 向上对齐到 `COPY_ALIGNMENT`
pub fn align_copy_size(size: u64) -> u64 {
    (size + COPY_ALIGNMENT - 1) & !(COPY_ALIGNMENT - 1)
}

/// 一次缓冲区上传的计划
///
/// 保存 CPU 数据的字节视图以及目标/中转两个缓冲区的描述。
/// 后端据此分配资源、写入中转缓冲区并录制复制命令。
#[derive(Debug, Clone)]
pub struct BufferUpload<'a> {
    /// 要上传的字节
    pub bytes: &'a [u8],
    /// 单个元素的大小（顶点步长或索引大小）
    pub element_size: u32,
    /// 元素数量
    pub element_count: u32,
    /// 实际数据大小，缓冲区视图使用此值
    pub byte_size: u64,
    /// 目标缓冲区（GPU本地）
    pub destination: BufferDescriptor,
    /// 中转缓冲区（CPU可见）
    pub staging: BufferDescriptor,
}

impl<'a> BufferUpload<'a> {
    /// 为 `data` 创建上传计划
    ///
    /// 空数据返回 `GraphicsError::ResourceCreation`。
    pub fn new<T: Pod>(data: &'a [T], usage: BufferUsage, name: &str) -> Result<Self> {
        if data.is_empty() {
            return Err(GraphicsError::ResourceCreation(format!(
                "Cannot upload empty {:?} buffer '{}'",
                usage, name
            ))
            .into());
        }

        let bytes: &[u8] = bytemuck::cast_slice(data);
        let byte_size = bytes.len() as u64;
        let copy_size = align_copy_size(byte_size);

        Ok(Self {
            bytes,
            element_size: size_of::<T>() as u32,
            element_count: data.len() as u32,
            byte_size,
            destination: BufferDescriptor::new(copy_size, usage, MemoryType::DeviceLocal)
                .with_name(name),
            staging: BufferDescriptor::new(copy_size, BufferUsage::Staging, MemoryType::HostVisible)
                .with_name(format!("{} (staging)", name)),
        })
    }

    /// GPU 复制的大小（已对齐）
    pub fn copy_size(&self) -> u64 {
        self.staging.size
    }

    /// 写入中转缓冲区的内容：数据加零填充
    pub fn padded_bytes(&self) -> Vec<u8> {
        let mut padded = Vec::with_capacity(self.copy_size() as usize);
        padded.extend_from_slice(self.bytes);
        padded.resize(self.copy_size() as usize, 0);
        padded
    }
}

/// 二维尺寸
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

impl Extent2D {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// 至少 1×1
    pub fn clamped(&self) -> Self {
        Self {
            width: self.width.max(1),
            height: self.height.max(1),
        }
    }

    /// 窗口最小化时为 0
    pub fn is_zero_area(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// 宽高比，零尺寸按 1×1 计算
    pub fn aspect_ratio(&self) -> f32 {
        let clamped = self.clamped();
        clamped.width as f32 / clamped.height as f32
    }
}

/// 纹理格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    /// 渲染目标：RGBA 8位无符号归一化
    Rgba8Unorm,
    /// 深度 32位浮点
    Depth32Float,
}

/// 深度缓冲区描述
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthBufferDesc {
    /// 尺寸，至少 1×1
    pub extent: Extent2D,
    pub format: TextureFormat,
    /// 清除值
    pub clear_depth: f32,
}

impl DepthBufferDesc {
    /// 按客户区尺寸创建，宽高被钳制为至少 1
    pub fn for_client_area(extent: Extent2D) -> Self {
        Self {
            extent: extent.clamped(),
            format: TextureFormat::Depth32Float,
            clear_depth: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MeshRenderError;
    use crate::geometry::Vertex;

    #[test]
    fn test_vertex_upload_plan() {
        let vertices = vec![Vertex::default(); 3];
        let upload = BufferUpload::new(&vertices, BufferUsage::Vertex, "Cube VB").unwrap();

        let expected = (3 * size_of::<Vertex>()) as u64;
        assert_eq!(upload.byte_size, expected);
        assert_eq!(upload.element_size as usize, Vertex::STRIDE);
        assert_eq!(upload.element_count, 3);

        assert_eq!(upload.destination.memory_type, MemoryType::DeviceLocal);
        assert_eq!(upload.destination.usage, BufferUsage::Vertex);
        assert_eq!(upload.staging.memory_type, MemoryType::HostVisible);
        assert_eq!(upload.staging.usage, BufferUsage::Staging);
        assert_eq!(upload.destination.name.as_deref(), Some("Cube VB"));
    }

    #[test]
    fn test_index_upload_is_padded() {
        let indices: [u16; 3] = [0, 1, 2];
        let upload = BufferUpload::new(&indices, BufferUsage::Index, "IB").unwrap();

        assert_eq!(upload.byte_size, 6);
        assert_eq!(upload.copy_size(), 8);
        assert_eq!(upload.destination.size, 8);

        let padded = upload.padded_bytes();
        assert_eq!(padded.len(), 8);
        assert_eq!(&padded[..6], upload.bytes);
        assert_eq!(&padded[6..], &[0, 0]);
    }

    #[test]
    fn test_empty_upload_rejected() {
        let empty: [u16; 0] = [];
        let err = BufferUpload::new(&empty, BufferUsage::Index, "IB").unwrap_err();
        assert!(matches!(
            err,
            MeshRenderError::Graphics(GraphicsError::ResourceCreation(_))
        ));
    }

    #[test]
    fn test_align_copy_size() {
        assert_eq!(align_copy_size(0), 0);
        assert_eq!(align_copy_size(1), 4);
        assert_eq!(align_copy_size(4), 4);
        assert_eq!(align_copy_size(66), 68);
    }

    #[test]
    fn test_depth_buffer_clamped() {
        let desc = DepthBufferDesc::for_client_area(Extent2D::new(0, 0));
        assert_eq!(desc.extent, Extent2D::new(1, 1));
        assert_eq!(desc.format, TextureFormat::Depth32Float);
        assert_eq!(desc.clear_depth, 1.0);

        let desc = DepthBufferDesc::for_client_area(Extent2D::new(2400, 0));
        assert_eq!(desc.extent, Extent2D::new(2400, 1));
    }

    #[test]
    fn test_extent_helpers() {
        assert!(Extent2D::new(0, 600).is_zero_area());
        assert_eq!(Extent2D::new(2400, 1200).aspect_ratio(), 2.0);
        assert_eq!(Extent2D::new(0, 0).aspect_ratio(), 1.0);
    }
}
