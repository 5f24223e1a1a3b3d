//! 渲染管线描述
//!
//! 后端无关的管线状态描述。整个程序只有一条固定的前向渲染管线：
//! 三角形列表、一个 `Rgba8Unorm` 渲染目标、`Depth32Float` 深度、深度测试 `Less`，
//! 光栅化状态使用 D3D12 默认值（背面剔除，顺时针为正面）。
//!
//! 根签名只有一个参数：16 个 32 位根常量（MVP 矩阵），寄存器 b0，仅顶点着色器可见。

use crate::geometry::vertex::{Vertex, VertexAttribute};
use crate::renderer::resource::TextureFormat;

/// MVP 矩阵占用的 32 位常量数量
pub const MVP_CONSTANT_COUNT: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveTopology {
    TriangleList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareFunction {
    Less,
    LessEqual,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontFace {
    Clockwise,
    CounterClockwise,
}

/// 着色器可见性
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderVisibility {
    All,
    Vertex,
    Pixel,
}

/// 根常量参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootConstants {
    /// 寄存器编号（bN）
    pub shader_register: u32,
    pub register_space: u32,
    /// 32 位值的数量
    pub num_32bit_values: u32,
    pub visibility: ShaderVisibility,
}

/// 根签名标志
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RootSignatureFlags {
    pub allow_input_assembler_input_layout: bool,
    pub deny_hull_shader_root_access: bool,
    pub deny_domain_shader_root_access: bool,
    pub deny_geometry_shader_root_access: bool,
    pub deny_pixel_shader_root_access: bool,
}

/// 根签名版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RootSignatureVersion {
    V1_0,
    V1_1,
}

impl RootSignatureVersion {
    /// 优先使用 1.1，设备不支持时回退到 1.0
    pub fn negotiate(supports_1_1: bool) -> Self {
        if supports_1_1 {
            RootSignatureVersion::V1_1
        } else {
            RootSignatureVersion::V1_0
        }
    }
}

/// 根签名描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootSignatureDesc {
    pub constants: Vec<RootConstants>,
    pub flags: RootSignatureFlags,
}

impl RootSignatureDesc {
    /// MVP 根常量：b0，16 个值，仅顶点着色器可见
    pub fn mvp_constants() -> Self {
        Self {
            constants: vec![RootConstants {
                shader_register: 0,
                register_space: 0,
                num_32bit_values: MVP_CONSTANT_COUNT,
                visibility: ShaderVisibility::Vertex,
            }],
            flags: RootSignatureFlags {
                allow_input_assembler_input_layout: true,
                deny_hull_shader_root_access: true,
                deny_domain_shader_root_access: true,
                deny_geometry_shader_root_access: true,
                deny_pixel_shader_root_access: true,
            },
        }
    }

    /// 所有根常量占用的字节数
    pub fn constants_size(&self) -> u64 {
        self.constants
            .iter()
            .map(|c| c.num_32bit_values as u64 * 4)
            .sum()
    }
}

/// 图形管线描述
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineDesc {
    pub label: &'static str,
    pub vertex_layout: &'static [VertexAttribute],
    pub vertex_stride: usize,
    pub topology: PrimitiveTopology,
    pub color_format: TextureFormat,
    pub depth_format: TextureFormat,
    pub depth_write: bool,
    pub depth_compare: CompareFunction,
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub root_signature: RootSignatureDesc,
}

impl PipelineDesc {
    /// 固定的前向渲染管线
    pub fn forward() -> Self {
        Self {
            label: "Forward Pipeline",
            vertex_layout: Vertex::LAYOUT,
            vertex_stride: Vertex::STRIDE,
            topology: PrimitiveTopology::TriangleList,
            color_format: TextureFormat::Rgba8Unorm,
            depth_format: TextureFormat::Depth32Float,
            depth_write: true,
            depth_compare: CompareFunction::Less,
            cull_mode: CullMode::Back,
            front_face: FrontFace::Clockwise,
            root_signature: RootSignatureDesc::mvp_constants(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mvp_root_signature() {
        let desc = RootSignatureDesc::mvp_constants();

        assert_eq!(desc.constants.len(), 1);
        let mvp = desc.constants[0];
        assert_eq!(mvp.num_32bit_values, 16);
        assert_eq!(mvp.shader_register, 0);
        assert_eq!(mvp.visibility, ShaderVisibility::Vertex);
        assert_eq!(desc.constants_size(), 64);

        assert!(desc.flags.allow_input_assembler_input_layout);
        assert!(desc.flags.deny_hull_shader_root_access);
        assert!(desc.flags.deny_domain_shader_root_access);
        assert!(desc.flags.deny_geometry_shader_root_access);
        assert!(desc.flags.deny_pixel_shader_root_access);
    }

    #[test]
    fn test_root_signature_version_fallback() {
        assert_eq!(RootSignatureVersion::negotiate(true), RootSignatureVersion::V1_1);
        assert_eq!(RootSignatureVersion::negotiate(false), RootSignatureVersion::V1_0);
    }

    #[test]
    fn test_forward_pipeline() {
        let desc = PipelineDesc::forward();

        assert_eq!(desc.topology, PrimitiveTopology::TriangleList);
        assert_eq!(desc.color_format, TextureFormat::Rgba8Unorm);
        assert_eq!(desc.depth_format, TextureFormat::Depth32Float);
        assert_eq!(desc.depth_compare, CompareFunction::Less);
        assert_eq!(desc.cull_mode, CullMode::Back);
        assert_eq!(desc.front_face, FrontFace::Clockwise);
        assert_eq!(desc.vertex_stride, std::mem::size_of::<Vertex>());
        assert_eq!(desc.vertex_layout.len(), Vertex::LAYOUT.len());
    }
}
