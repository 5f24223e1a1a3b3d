/// 网格数据结构模块
///
/// 定义CPU侧的网格数据容器，用于存储从文件加载的原始几何数据。
/// 上传前通过 `index_buffer_u16` 转换成 16 位索引。

use super::vertex::Vertex;
use crate::core::error::{MeshLoadError, MeshRenderError, Result};

/// 16 位索引能寻址的最大顶点数
pub const MAX_U16_VERTICES: usize = u16::MAX as usize + 1;

/// 子网格描述符
///
/// 描述网格的一个子集，通常对应文件中的一个网格对象。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subset {
    /// 子网格ID
    pub id: u32,

    /// 起始顶点索引
    pub vertex_start: u32,

    /// 顶点数量
    pub vertex_count: u32,

    /// 起始面索引（以三角形为单位）
    pub face_start: u32,

    /// 面数量（三角形数量）
    pub face_count: u32,
}

impl Subset {
    /// 创建一个新的子网格描述符
    #[inline]
    pub fn new(
        id: u32,
        vertex_start: u32,
        vertex_count: u32,
        face_start: u32,
        face_count: u32,
    ) -> Self {
        Self {
            id,
            vertex_start,
            vertex_count,
            face_start,
            face_count,
        }
    }

    /// 获取索引起始位置（以索引数量计，非三角形数）
    #[inline]
    pub fn index_start(&self) -> u32 {
        self.face_start * 3
    }

    /// 获取索引数量（非三角形数）
    #[inline]
    pub fn index_count(&self) -> u32 {
        self.face_count * 3
    }
}

/// CPU侧网格数据
///
/// 存储从文件加载的顶点、索引和子网格信息，不包含GPU资源。
/// 加载器内部使用 32 位索引拼接多个子网格，上传时再压缩成 16 位。
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    /// 顶点数组
    pub vertices: Vec<Vertex>,

    /// 索引数组，每3个索引定义一个三角形
    pub indices: Vec<u32>,

    /// 子网格列表
    pub subsets: Vec<Subset>,

    /// 网格名称（可选）
    pub name: Option<String>,
}

impl MeshData {
    /// 创建一个空的网格数据
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建一个指定名称的空网格数据
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// 追加一个子网格
    ///
    /// 索引加上当前顶点偏移，并记录对应的 `Subset`。
    pub fn append(&mut self, vertices: &[Vertex], indices: &[u32]) {
        let vertex_start = self.vertices.len() as u32;
        let face_start = self.triangle_count() as u32;
        let id = self.subsets.len() as u32;

        self.vertices.extend_from_slice(vertices);
        self.indices.extend(indices.iter().map(|&i| vertex_start + i));

        self.subsets.push(Subset::new(
            id,
            vertex_start,
            vertices.len() as u32,
            face_start,
            (indices.len() / 3) as u32,
        ));
    }

    /// 验证网格数据的有效性
    ///
    /// 检查：
    /// - 网格非空
    /// - 索引数量是3的倍数（三角形列表）
    /// - 所有索引都在有效范围内
    /// - 子网格描述符的范围有效
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.vertices.is_empty() || self.indices.is_empty() {
            return Err("网格不包含任何三角形".to_string());
        }

        if self.indices.len() % 3 != 0 {
            return Err(format!(
                "索引数量必须是3的倍数，当前为: {}",
                self.indices.len()
            ));
        }

        let vertex_count = self.vertices.len() as u32;
        if let Some((i, &index)) = self
            .indices
            .iter()
            .enumerate()
            .find(|(_, &index)| index >= vertex_count)
        {
            return Err(format!(
                "索引 {} 处的值 {} 超出顶点范围 (0-{})",
                i,
                index,
                vertex_count - 1
            ));
        }

        let triangle_count = self.triangle_count() as u32;
        for (i, subset) in self.subsets.iter().enumerate() {
            if subset.vertex_start + subset.vertex_count > vertex_count {
                return Err(format!(
                    "子网格 {} 的顶点范围超出边界: start={}, count={}, total={}",
                    i, subset.vertex_start, subset.vertex_count, vertex_count
                ));
            }

            if subset.face_start + subset.face_count > triangle_count {
                return Err(format!(
                    "子网格 {} 的面范围超出边界: start={}, count={}, total={}",
                    i, subset.face_start, subset.face_count, triangle_count
                ));
            }
        }

        Ok(())
    }

    /// 转换为 16 位索引
    ///
    /// 顶点数超过 65536 时返回 `MeshLoadError::IndexOverflow`。
    pub fn index_buffer_u16(&self) -> Result<Vec<u16>> {
        if self.vertices.len() > MAX_U16_VERTICES {
            return Err(MeshLoadError::IndexOverflow {
                vertex_count: self.vertices.len(),
            }
            .into());
        }

        // 顶点数已检查，validate 保证索引 < 顶点数
        self.indices
            .iter()
            .map(|&index| {
                u16::try_from(index).map_err(|_| {
                    MeshRenderError::from(MeshLoadError::InvalidGeometry(format!(
                        "索引 {} 超出 16 位范围",
                        index
                    )))
                })
            })
            .collect()
    }
}
