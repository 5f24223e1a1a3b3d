//! 顶点数据定义
//!
//! 渲染管线使用的顶点结构体与输入布局描述。
//!
//! 法线和纹理坐标是编译期可选的属性（cargo feature `vertex-normal` / `vertex-uv`），
//! 都使用 32 位浮点。输入布局 `Vertex::LAYOUT` 与结构体字段一一对应，
//! 两个后端都从这里生成各自的输入布局。

use bytemuck::{Pod, Zeroable};
use std::mem::{offset_of, size_of};

/// 顶点结构体
///
/// 使用 `#[repr(C)]`，字段全部是 `f32` 数组，没有填充字节，可以直接 `cast_slice` 上传。
#[repr(C)]
#[derive(Default, Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// 顶点位置 (x, y, z)
    pub position: [f32; 3],
    /// 顶点颜色（RGB，范围 0.0-1.0）
    pub color: [f32; 3],
    /// 法线 (nx, ny, nz)
    #[cfg(feature = "vertex-normal")]
    pub normal: [f32; 3],
    /// 纹理坐标 (u, v)
    #[cfg(feature = "vertex-uv")]
    pub texcoord: [f32; 2],
}

/// 顶点属性语义
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Semantic {
    Position,
    Color,
    Normal,
    TexCoord,
}

impl Semantic {
    /// HLSL 语义名称
    pub fn name(&self) -> &'static str {
        match self {
            Semantic::Position => "POSITION",
            Semantic::Color => "COLOR",
            Semantic::Normal => "NORMAL",
            Semantic::TexCoord => "TEXCOORD",
        }
    }
}

/// 顶点属性格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexFormat {
    Float32x2,
    Float32x3,
}

impl VertexFormat {
    pub fn size(&self) -> usize {
        match self {
            VertexFormat::Float32x2 => 8,
            VertexFormat::Float32x3 => 12,
        }
    }
}

/// 一个顶点属性的布局
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub semantic: Semantic,
    pub format: VertexFormat,
    /// 相对顶点起始的字节偏移
    pub offset: usize,
    /// shader 输入位置（wgpu 的 `@location`）
    pub location: u32,
}

impl Vertex {
    /// 顶点步长（字节）
    pub const STRIDE: usize = size_of::<Vertex>();

    /// 输入布局
    pub const LAYOUT: &'static [VertexAttribute] = &[
        VertexAttribute {
            semantic: Semantic::Position,
            format: VertexFormat::Float32x3,
            offset: offset_of!(Vertex, position),
            location: 0,
        },
        VertexAttribute {
            semantic: Semantic::Color,
            format: VertexFormat::Float32x3,
            offset: offset_of!(Vertex, color),
            location: 1,
        },
        #[cfg(feature = "vertex-normal")]
        VertexAttribute {
            semantic: Semantic::Normal,
            format: VertexFormat::Float32x3,
            offset: offset_of!(Vertex, normal),
            location: 2,
        },
        #[cfg(feature = "vertex-uv")]
        VertexAttribute {
            semantic: Semantic::TexCoord,
            format: VertexFormat::Float32x2,
            offset: offset_of!(Vertex, texcoord),
            location: 3,
        },
    ];

    /// 创建只有位置和颜色的顶点，可选属性为零
    #[inline]
    pub fn new(position: [f32; 3], color: [f32; 3]) -> Self {
        Self {
            position,
            color,
            ..Zeroable::zeroed()
        }
    }

    /// 设置法线（未启用 `vertex-normal` 时忽略）
    #[inline]
    #[allow(unused_mut, unused_variables)]
    pub fn with_normal(mut self, normal: [f32; 3]) -> Self {
        #[cfg(feature = "vertex-normal")]
        {
            self.normal = normal;
        }
        self
    }

    /// 设置纹理坐标（未启用 `vertex-uv` 时忽略）
    #[inline]
    #[allow(unused_mut, unused_variables)]
    pub fn with_texcoord(mut self, texcoord: [f32; 2]) -> Self {
        #[cfg(feature = "vertex-uv")]
        {
            self.texcoord = texcoord;
        }
        self
    }
}

/// 计算顶点颜色
///
/// 优先使用文件中的颜色；否则由法线映射到 [0, 1]（`n * 0.5 + 0.5`）；都没有时为白色。
pub fn derive_color(file_color: Option<[f32; 3]>, normal: Option<[f32; 3]>) -> [f32; 3] {
    match (file_color, normal) {
        (Some(color), _) => color,
        (None, Some(n)) => [n[0] * 0.5 + 0.5, n[1] * 0.5 + 0.5, n[2] * 0.5 + 0.5],
        (None, None) => [1.0, 1.0, 1.0],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_matches_struct() {
        let mut expected_offset = 0;
        for attribute in Vertex::LAYOUT {
            assert_eq!(attribute.offset, expected_offset, "{:?}", attribute.semantic);
            expected_offset += attribute.format.size();
        }
        assert_eq!(expected_offset, Vertex::STRIDE);
        assert_eq!(std::mem::align_of::<Vertex>(), 4);
    }

    #[test]
    fn test_layout_order() {
        assert_eq!(Vertex::LAYOUT[0].semantic.name(), "POSITION");
        assert_eq!(Vertex::LAYOUT[1].semantic.name(), "COLOR");
    }

    #[test]
    fn test_semantic_names_convert_to_c_strings() {
        // D3D12 输入布局直接使用这些名称
        for semantic in [Semantic::Position, Semantic::Color, Semantic::Normal, Semantic::TexCoord] {
            let name = std::ffi::CString::new(semantic.name()).unwrap();
            assert_eq!(name.as_bytes(), semantic.name().as_bytes());
            assert!(name.as_bytes().iter().all(|b| b.is_ascii_uppercase()));
        }
    }

    #[cfg(all(feature = "vertex-normal", feature = "vertex-uv"))]
    #[test]
    fn test_full_vertex_size() {
        // 3 + 3 + 3 + 2 个 f32
        assert_eq!(Vertex::STRIDE, 44);
        assert_eq!(Vertex::LAYOUT.len(), 4);
    }

    #[test]
    fn test_vertex_builders() {
        let vertex = Vertex::new([1.0, 2.0, 3.0], [1.0, 0.0, 0.0])
            .with_normal([0.0, 1.0, 0.0])
            .with_texcoord([0.5, 0.25]);

        assert_eq!(vertex.position, [1.0, 2.0, 3.0]);
        assert_eq!(vertex.color, [1.0, 0.0, 0.0]);
        #[cfg(feature = "vertex-normal")]
        assert_eq!(vertex.normal, [0.0, 1.0, 0.0]);
        #[cfg(feature = "vertex-uv")]
        assert_eq!(vertex.texcoord, [0.5, 0.25]);
    }

    #[test]
    fn test_derive_color() {
        assert_eq!(derive_color(Some([0.2, 0.3, 0.4]), Some([1.0, 0.0, 0.0])), [0.2, 0.3, 0.4]);
        assert_eq!(derive_color(None, Some([1.0, -1.0, 0.0])), [1.0, 0.0, 0.5]);
        assert_eq!(derive_color(None, None), [1.0, 1.0, 1.0]);
    }
}
