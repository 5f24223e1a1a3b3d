/// 模型加载器模块
///
/// 提供统一的模型加载接口和各种格式的具体实现。
///
/// # 支持的格式
///
/// - **FBX**: Autodesk FBX 格式（使用 russimp/Assimp，需要 `fbx` feature）
/// - **OBJ**: Wavefront OBJ 格式（使用 tobj crate）
///
/// 所有加载器输出左手坐标系、顺时针为正面的三角形列表，与渲染管线的光栅化状态一致。
///
/// # 使用示例
///
/// ```rust,no_run
/// use mesh_render::geometry::loaders::load_mesh;
/// use std::path::Path;
///
/// let mesh = load_mesh(Path::new("assets/models/cube.obj"))?;
/// let indices = mesh.index_buffer_u16()?;
/// # Ok::<(), mesh_render::core::MeshRenderError>(())
/// ```
use crate::core::error::{MeshLoadError, Result};
use crate::geometry::mesh::MeshData;
use std::path::Path;

pub mod fbx_loader;
pub mod obj_loader;

// 重新导出加载器
pub use fbx_loader::FbxLoader;
pub use obj_loader::ObjLoader;

/// 网格加载器 trait
///
/// 加载器是无状态的（使用关联函数），只返回 CPU 侧的 `MeshData`，不涉及 GPU 资源。
pub trait MeshLoader {
    /// 从文件路径加载网格
    ///
    /// # 错误
    ///
    /// - 文件不存在或无法读取
    /// - 文件格式错误或损坏
    /// - 数据验证失败
    fn load_from_file(path: &Path) -> Result<MeshData>;

    /// 从内存数据加载网格
    fn load_from_memory(data: &[u8]) -> Result<MeshData>;

    /// 支持的扩展名（小写，不含点号）
    fn supported_extensions() -> &'static [&'static str];
}

/// 根据文件扩展名选择合适的加载器
pub fn load_mesh(path: &Path) -> Result<MeshData> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .ok_or_else(|| {
            MeshLoadError::UnsupportedFormat(format!("无法确定文件扩展名: {}", path.display()))
        })?;

    tracing::debug!(path = %path.display(), format = %extension, "Loading mesh");

    match extension.as_str() {
        ext if FbxLoader::supported_extensions().contains(&ext) => FbxLoader::load_from_file(path),
        ext if ObjLoader::supported_extensions().contains(&ext) => ObjLoader::load_from_file(path),
        _ => Err(MeshLoadError::UnsupportedFormat(format!("不支持的文件格式: .{}", extension)).into()),
    }
}

/// 加载完成后的统一校验
pub(crate) fn finish(mesh: MeshData, format: &str) -> Result<MeshData> {
    mesh.validate().map_err(MeshLoadError::ValidationError)?;

    tracing::info!(
        format,
        name = mesh.name.as_deref().unwrap_or("Unnamed"),
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        subsets = mesh.subsets.len(),
        "Mesh loaded"
    );

    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MeshRenderError;

    #[test]
    fn test_supported_extensions() {
        assert!(ObjLoader::supported_extensions().contains(&"obj"));
        assert!(FbxLoader::supported_extensions().contains(&"fbx"));
    }

    #[test]
    fn test_unknown_extension() {
        let err = load_mesh(Path::new("model.gltf")).unwrap_err();
        assert!(matches!(
            err,
            MeshRenderError::MeshLoading(MeshLoadError::UnsupportedFormat(_))
        ));

        assert!(load_mesh(Path::new("no_extension")).is_err());
    }

    #[test]
    fn test_dispatch_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("TRI.OBJ");
        std::fs::write(&path, "v 0 0 0\nv 0 1 0\nv 1 0 0\nf 1 2 3\n").unwrap();

        let mesh = load_mesh(&path).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
    }
}
