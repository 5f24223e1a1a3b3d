//! 着色器二进制加载
//!
//! 渲染器不编译着色器，只从磁盘读取预编译的二进制：
//!
//! | 后端  | 顶点着色器           | 像素着色器          | 格式        |
//! |-------|----------------------|---------------------|-------------|
//! | DX12  | `VertexShader.cso`   | `PixelShader.cso`   | DXBC / DXIL |
//! | wgpu  | `VertexShader.spv`   | `PixelShader.spv`   | SPIR-V      |
//!
//! HLSL 源码位于仓库的 `shaders/` 目录。

use std::path::{Path, PathBuf};

use crate::core::error::{GraphicsError, Result};

/// SPIR-V 魔数（小端）
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// 着色器二进制格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderBlobKind {
    /// D3D 编译器输出（.cso）
    Dxbc,
    /// SPIR-V（.spv）
    SpirV,
}

impl ShaderBlobKind {
    /// 文件扩展名
    pub fn extension(&self) -> &'static str {
        match self {
            ShaderBlobKind::Dxbc => "cso",
            ShaderBlobKind::SpirV => "spv",
        }
    }
}

/// 顶点/像素着色器的文件路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderPaths {
    pub vertex: PathBuf,
    pub pixel: PathBuf,
}

/// 一对预编译的着色器二进制
#[derive(Debug, Clone)]
pub struct ShaderBlobs {
    pub vertex: Vec<u8>,
    pub pixel: Vec<u8>,
    pub kind: ShaderBlobKind,
}

impl ShaderBlobs {
    /// 按文件名约定得到路径
    pub fn paths(dir: &Path, kind: ShaderBlobKind) -> ShaderPaths {
        ShaderPaths {
            vertex: dir.join(format!("VertexShader.{}", kind.extension())),
            pixel: dir.join(format!("PixelShader.{}", kind.extension())),
        }
    }

    /// 两个文件是否都存在
    pub fn exists(dir: &Path, kind: ShaderBlobKind) -> bool {
        let paths = Self::paths(dir, kind);
        paths.vertex.is_file() && paths.pixel.is_file()
    }

    /// 读取目录中的两个着色器二进制
    ///
    /// 文件缺失、为空或格式不符时返回 `GraphicsError::ShaderLoad`。
    pub fn load(dir: &Path, kind: ShaderBlobKind) -> Result<Self> {
        let paths = Self::paths(dir, kind);
        let vertex = read_blob(&paths.vertex, kind)?;
        let pixel = read_blob(&paths.pixel, kind)?;

        tracing::debug!(
            vertex = %paths.vertex.display(),
            vertex_bytes = vertex.len(),
            pixel = %paths.pixel.display(),
            pixel_bytes = pixel.len(),
            "Loaded shader blobs"
        );

        Ok(Self { vertex, pixel, kind })
    }
}

fn read_blob(path: &Path, kind: ShaderBlobKind) -> Result<Vec<u8>> {
    let shader_error = |reason: String| GraphicsError::ShaderLoad {
        path: path.to_path_buf(),
        reason,
    };

    let bytes = std::fs::read(path).map_err(|e| shader_error(e.to_string()))?;
    if bytes.is_empty() {
        return Err(shader_error("file is empty".to_string()).into());
    }

    if kind == ShaderBlobKind::SpirV {
        if bytes.len() % 4 != 0 {
            return Err(shader_error(format!(
                "SPIR-V size {} is not a multiple of 4",
                bytes.len()
            ))
            .into());
        }
        let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if magic != SPIRV_MAGIC {
            return Err(shader_error(format!("bad SPIR-V magic 0x{:08x}", magic)).into());
        }
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MeshRenderError;

    fn spirv_stub() -> Vec<u8> {
        let mut bytes = SPIRV_MAGIC.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 16]);
        bytes
    }

    #[test]
    fn test_paths_follow_naming_convention() {
        let paths = ShaderBlobs::paths(Path::new("bin"), ShaderBlobKind::Dxbc);
        assert_eq!(paths.vertex, Path::new("bin").join("VertexShader.cso"));
        assert_eq!(paths.pixel, Path::new("bin").join("PixelShader.cso"));

        let paths = ShaderBlobs::paths(Path::new("bin"), ShaderBlobKind::SpirV);
        assert_eq!(paths.vertex, Path::new("bin").join("VertexShader.spv"));
    }

    #[test]
    fn test_load_dxbc_blobs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("VertexShader.cso"), b"DXBCvs").unwrap();
        std::fs::write(dir.path().join("PixelShader.cso"), b"DXBCps").unwrap();

        assert!(ShaderBlobs::exists(dir.path(), ShaderBlobKind::Dxbc));
        let blobs = ShaderBlobs::load(dir.path(), ShaderBlobKind::Dxbc).unwrap();
        assert_eq!(blobs.vertex, b"DXBCvs");
        assert_eq!(blobs.pixel, b"DXBCps");
        assert_eq!(blobs.kind, ShaderBlobKind::Dxbc);
    }

    #[test]
    fn test_missing_blob() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("VertexShader.cso"), b"DXBC").unwrap();

        assert!(!ShaderBlobs::exists(dir.path(), ShaderBlobKind::Dxbc));
        let err = ShaderBlobs::load(dir.path(), ShaderBlobKind::Dxbc).unwrap_err();
        match err {
            MeshRenderError::Graphics(GraphicsError::ShaderLoad { path, .. }) => {
                assert!(path.ends_with("PixelShader.cso"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_blob() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("VertexShader.cso"), b"").unwrap();
        std::fs::write(dir.path().join("PixelShader.cso"), b"DXBC").unwrap();

        let err = ShaderBlobs::load(dir.path(), ShaderBlobKind::Dxbc).unwrap_err();
        assert!(matches!(
            err,
            MeshRenderError::Graphics(GraphicsError::ShaderLoad { .. })
        ));
    }

    #[test]
    fn test_spirv_magic_checked() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("VertexShader.spv"), spirv_stub()).unwrap();
        std::fs::write(dir.path().join("PixelShader.spv"), b"DXBCDXBC").unwrap();

        assert!(ShaderBlobs::load(dir.path(), ShaderBlobKind::SpirV).is_err());

        std::fs::write(dir.path().join("PixelShader.spv"), spirv_stub()).unwrap();
        let blobs = ShaderBlobs::load(dir.path(), ShaderBlobKind::SpirV).unwrap();
        assert_eq!(blobs.vertex.len(), 20);
    }
}
