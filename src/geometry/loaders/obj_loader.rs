/// OBJ 文件加载器
///
/// 使用 tobj crate 加载 Wavefront OBJ 格式的3D模型。
/// OBJ 按右手坐标系、逆时针为正面存储，加载时翻转 Z 轴并反转三角形绕序，
/// 转换成左手坐标系、顺时针为正面。
use super::MeshLoader;
use crate::core::error::{MeshLoadError, Result};
use crate::geometry::mesh::MeshData;
use crate::geometry::vertex::{derive_color, Vertex};
use std::io::{BufReader, Cursor};
use std::path::Path;

/// OBJ 格式加载器
///
/// # 特性
///
/// - 自动三角化，单一索引
/// - 读取 `v x y z r g b` 形式的顶点颜色
/// - UV 坐标翻转（V轴：1.0 - v）
/// - 每个 OBJ 对象对应一个子网格
pub struct ObjLoader;

impl ObjLoader {
    fn load_options() -> tobj::LoadOptions {
        tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        }
    }

    /// 把 tobj 的模型列表转换成 MeshData
    fn convert(models: Vec<tobj::Model>, name: &str) -> Result<MeshData> {
        if models.is_empty() {
            return Err(MeshLoadError::ValidationError("OBJ 文件不包含任何模型".to_string()).into());
        }

        let mut mesh_data = MeshData::with_name(name);

        for model in &models {
            let mesh = &model.mesh;
            let positions = &mesh.positions;

            if positions.len() % 3 != 0 {
                return Err(MeshLoadError::InvalidGeometry(format!(
                    "顶点位置数据不完整: {} 个浮点数",
                    positions.len()
                ))
                .into());
            }

            let vertex_count = positions.len() / 3;
            let has_normals = mesh.normals.len() >= vertex_count * 3;
            let has_texcoords = mesh.texcoords.len() >= vertex_count * 2;
            let has_colors = mesh.vertex_color.len() >= vertex_count * 3;

            let vertices: Vec<Vertex> = (0..vertex_count)
                .map(|i| {
                    let position = [positions[i * 3], positions[i * 3 + 1], -positions[i * 3 + 2]];

                    let normal = has_normals.then(|| {
                        [mesh.normals[i * 3], mesh.normals[i * 3 + 1], -mesh.normals[i * 3 + 2]]
                    });

                    let color = has_colors.then(|| {
                        [
                            mesh.vertex_color[i * 3],
                            mesh.vertex_color[i * 3 + 1],
                            mesh.vertex_color[i * 3 + 2],
                        ]
                    });

                    let texcoord = if has_texcoords {
                        [mesh.texcoords[i * 2], 1.0 - mesh.texcoords[i * 2 + 1]]
                    } else {
                        [0.0, 0.0]
                    };

                    Vertex::new(position, derive_color(color, normal))
                        .with_normal(normal.unwrap_or_default())
                        .with_texcoord(texcoord)
                })
                .collect();

            // 反转绕序
            let indices: Vec<u32> = mesh
                .indices
                .chunks_exact(3)
                .flat_map(|tri| [tri[0], tri[2], tri[1]])
                .collect();

            mesh_data.append(&vertices, &indices);
        }

        Ok(mesh_data)
    }
}

impl MeshLoader for ObjLoader {
    fn load_from_file(path: &Path) -> Result<MeshData> {
        if !path.exists() {
            return Err(MeshLoadError::FileNotFound(path.to_path_buf()).into());
        }

        let (models, _materials) = tobj::load_obj(path, &Self::load_options())
            .map_err(|e| MeshLoadError::ParseError(format!("tobj 解析失败: {}", e)))?;

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Unnamed");

        super::finish(Self::convert(models, name)?, "obj")
    }

    /// 从内存加载，忽略 `mtllib` 引用的材质文件
    fn load_from_memory(data: &[u8]) -> Result<MeshData> {
        let mut reader = BufReader::new(Cursor::new(data));

        let (models, _materials) =
            tobj::load_obj_buf(&mut reader, &Self::load_options(), |_| {
                Err(tobj::LoadError::OpenFileFailed)
            })
            .map_err(|e| MeshLoadError::ParseError(format!("tobj 解析失败: {}", e)))?;

        super::finish(Self::convert(models, "Memory")?, "obj")
    }

    fn supported_extensions() -> &'static [&'static str] {
        &["obj"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
o Quad
v -1.0 -1.0 0.5 1.0 0.0 0.0
v  1.0 -1.0 0.5 0.0 1.0 0.0
v  1.0  1.0 0.5 0.0 0.0 1.0
v -1.0  1.0 0.5 1.0 1.0 1.0
vn 0 0 1
f 1//1 2//1 3//1 4//1
";

    #[test]
    fn test_supported_extensions() {
        assert_eq!(ObjLoader::supported_extensions(), &["obj"]);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ObjLoader::load_from_file(Path::new("nonexistent.obj"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_quad_from_memory() {
        let mesh = ObjLoader::load_from_memory(QUAD.as_bytes()).unwrap();

        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.subsets.len(), 1);

        // Z 轴翻转
        assert!(mesh.vertices.iter().all(|v| v.position[2] == -0.5));
        #[cfg(feature = "vertex-normal")]
        assert!(mesh.vertices.iter().all(|v| v.normal == [0.0, 0.0, -1.0]));
    }

    #[test]
    fn test_vertex_colors_and_winding() {
        let mesh = ObjLoader::load_from_memory(QUAD.as_bytes()).unwrap();

        let first = mesh.vertices[mesh.indices[0] as usize];
        assert_eq!(first.color, [1.0, 0.0, 0.0]);

        // 第一个三角形 (1, 2, 3) 变为 (1, 3, 2)
        let tri: Vec<[f32; 3]> = mesh.indices[..3]
            .iter()
            .map(|&i| mesh.vertices[i as usize].position)
            .collect();
        assert_eq!(tri[0], [-1.0, -1.0, -0.5]);
        assert_eq!(tri[1], [1.0, 1.0, -0.5]);
        assert_eq!(tri[2], [1.0, -1.0, -0.5]);
    }

    #[test]
    fn test_color_from_normal_when_missing() {
        let obj = "v 0 0 0\nv 0 1 0\nv 1 0 0\nvn 0 1 0\nf 1//1 2//1 3//1\n";
        let mesh = ObjLoader::load_from_memory(obj.as_bytes()).unwrap();
        assert_eq!(mesh.vertices[0].color, [0.5, 1.0, 0.5]);

        let obj = "v 0 0 0\nv 0 1 0\nv 1 0 0\nf 1 2 3\n";
        let mesh = ObjLoader::load_from_memory(obj.as_bytes()).unwrap();
        assert_eq!(mesh.vertices[0].color, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_empty_obj_rejected() {
        assert!(ObjLoader::load_from_memory(b"# nothing here\n").is_err());
    }

    #[test]
    fn test_load_bundled_cube() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/models/cube.obj");
        let mesh = ObjLoader::load_from_file(&path).unwrap();

        assert_eq!(mesh.triangle_count(), 12);
        assert!(mesh.index_buffer_u16().is_ok());
    }
}
