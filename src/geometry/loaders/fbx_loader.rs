/// FBX 文件加载器
///
/// 使用 russimp (Assimp) 加载 Autodesk FBX 格式的3D模型，需要启用 `fbx` feature
/// （依赖系统中的 Assimp）。未启用时 FBX 文件被报告为不支持的格式。
///
/// Assimp 后处理：三角化、合并相同顶点、生成平滑法线、转换为左手坐标系并翻转绕序。
/// 节点变换不会应用到顶点上，每个网格按其局部坐标加载。

use super::MeshLoader;
use crate::core::error::{MeshLoadError, Result};
use crate::geometry::mesh::MeshData;
use std::path::Path;

/// FBX 格式加载器
///
/// # 使用示例
///
/// ```rust,no_run
/// use mesh_render::geometry::loaders::{MeshLoader, FbxLoader};
/// use std::path::Path;
///
/// let mesh = FbxLoader::load_from_file(Path::new("model.fbx"))?;
/// println!("加载了 {} 个顶点", mesh.vertex_count());
/// # Ok::<(), mesh_render::core::MeshRenderError>(())
/// ```
pub struct FbxLoader;

impl MeshLoader for FbxLoader {
    fn load_from_file(path: &Path) -> Result<MeshData> {
        if !path.exists() {
            return Err(MeshLoadError::FileNotFound(path.to_path_buf()).into());
        }

        imp::load_from_file(path)
    }

    fn load_from_memory(data: &[u8]) -> Result<MeshData> {
        imp::load_from_memory(data)
    }

    fn supported_extensions() -> &'static [&'static str] {
        &["fbx"]
    }
}

#[cfg(feature = "fbx")]
mod imp {
    use crate::core::error::{MeshLoadError, Result};
    use crate::geometry::mesh::MeshData;
    use crate::geometry::vertex::{derive_color, Vertex};
    use russimp::scene::{PostProcess, Scene};
    use std::path::Path;

    fn post_process() -> Vec<PostProcess> {
        vec![
            PostProcess::Triangulate,
            PostProcess::JoinIdenticalVertices,
            PostProcess::GenerateSmoothNormals,
            PostProcess::MakeLeftHanded,
            PostProcess::FlipWindingOrder,
            PostProcess::FlipUVs,
        ]
    }

    pub(super) fn load_from_file(path: &Path) -> Result<MeshData> {
        let path_str = path
            .to_str()
            .ok_or_else(|| MeshLoadError::ParseError(format!("路径不是有效的 UTF-8: {}", path.display())))?;

        let scene = Scene::from_file(path_str, post_process())
            .map_err(|e| MeshLoadError::ParseError(format!("Assimp 解析失败: {}", e)))?;

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Unnamed");

        super::super::finish(convert(&scene, name)?, "fbx")
    }

    pub(super) fn load_from_memory(data: &[u8]) -> Result<MeshData> {
        let scene = Scene::from_buffer(data, post_process(), "fbx")
            .map_err(|e| MeshLoadError::ParseError(format!("Assimp 解析失败: {}", e)))?;

        super::super::finish(convert(&scene, "Memory")?, "fbx")
    }

    fn convert(scene: &Scene, name: &str) -> Result<MeshData> {
        if scene.meshes.is_empty() {
            return Err(MeshLoadError::ValidationError("FBX 文件不包含任何网格".to_string()).into());
        }

        let mut mesh_data = MeshData::with_name(name);

        for mesh in &scene.meshes {
            let colors = mesh.colors.first().and_then(|c| c.as_ref());
            let texcoords = mesh.texture_coords.first().and_then(|t| t.as_ref());

            let vertices: Vec<Vertex> = mesh
                .vertices
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    let normal = mesh.normals.get(i).map(|n| [n.x, n.y, n.z]);
                    let color = colors.and_then(|c| c.get(i)).map(|c| [c.r, c.g, c.b]);
                    let texcoord = texcoords
                        .and_then(|t| t.get(i))
                        .map(|t| [t.x, t.y])
                        .unwrap_or_default();

                    Vertex::new([p.x, p.y, p.z], derive_color(color, normal))
                        .with_normal(normal.unwrap_or_default())
                        .with_texcoord(texcoord)
                })
                .collect();

            // 三角化后忽略点和线图元
            let indices: Vec<u32> = mesh
                .faces
                .iter()
                .filter(|face| face.0.len() == 3)
                .flat_map(|face| face.0.iter().copied())
                .collect();

            tracing::debug!(
                mesh = %mesh.name,
                vertices = vertices.len(),
                triangles = indices.len() / 3,
                "FBX mesh"
            );

            mesh_data.append(&vertices, &indices);
        }

        Ok(mesh_data)
    }
}

#[cfg(not(feature = "fbx"))]
mod imp {
    use crate::core::error::{MeshLoadError, Result};
    use crate::geometry::mesh::MeshData;
    use std::path::Path;

    fn unsupported() -> Result<MeshData> {
        Err(MeshLoadError::UnsupportedFormat(
            "FBX 支持未启用，请使用 `--features fbx` 重新编译".to_string(),
        )
        .into())
    }

    pub(super) fn load_from_file(_path: &Path) -> Result<MeshData> {
        unsupported()
    }

    pub(super) fn load_from_memory(_data: &[u8]) -> Result<MeshData> {
        unsupported()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_extensions() {
        let exts = FbxLoader::supported_extensions();
        assert_eq!(exts, &["fbx"]);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let err = FbxLoader::load_from_file(Path::new("nonexistent.fbx")).unwrap_err();
        assert!(matches!(
            err,
            crate::core::MeshRenderError::MeshLoading(MeshLoadError::FileNotFound(_))
        ));
    }

    #[cfg(not(feature = "fbx"))]
    #[test]
    fn test_fbx_without_feature_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.fbx");
        std::fs::write(&path, b"Kaydara FBX Binary  \0").unwrap();

        let err = FbxLoader::load_from_file(&path).unwrap_err();
        assert!(matches!(
            err,
            crate::core::MeshRenderError::MeshLoading(MeshLoadError::UnsupportedFormat(_))
        ));
    }

    #[cfg(feature = "fbx")]
    #[test]
    fn test_garbage_fbx_is_parse_error() {
        assert!(FbxLoader::load_from_memory(b"not an fbx file").is_err());
    }
}
