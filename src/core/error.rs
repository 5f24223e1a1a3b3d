//! 错误处理模块
//!
//! 定义了渲染器中使用的统一错误类型，使用 `thiserror` 生成错误消息。
//!
//! 任何图形 API 调用失败都会转换为 `GraphicsError` 并一路向上传播，
//! 最终在 `main` 中记录日志并以非零状态退出，不做重试。

use std::path::PathBuf;
use thiserror::Error;

/// 渲染器统一的 Result 类型
pub type Result<T> = std::result::Result<T, MeshRenderError>;

/// MeshRender 的错误类型
#[derive(Debug, Error)]
pub enum MeshRenderError {
    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// 图形 API 错误
    #[error("Graphics error: {0}")]
    Graphics(#[from] GraphicsError),

    /// 网格加载错误
    #[error("Mesh loading error: {0}")]
    MeshLoading(#[from] MeshLoadError),

    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 初始化错误
    #[error("Initialization error: {0}")]
    Initialization(String),
}

/// 配置相关的错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件未找到
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    /// 配置文件解析失败
    #[error("Failed to parse config: {0}")]
    ParseError(String),

    /// 配置值无效
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 图形 API 相关的错误
#[derive(Debug, Error)]
pub enum GraphicsError {
    /// 设备创建失败
    #[error("Device creation failed: {0}")]
    DeviceCreation(String),

    /// 交换链错误
    #[error("Swapchain error: {0}")]
    SwapchainError(String),

    /// 着色器二进制读取失败
    #[error("Failed to load shader blob {}: {reason}", path.display())]
    ShaderLoad { path: PathBuf, reason: String },

    /// 管线（根签名 / PSO）创建失败
    #[error("Pipeline creation failed: {0}")]
    PipelineCreation(String),

    /// 资源创建失败
    #[error("Resource creation failed: {0}")]
    ResourceCreation(String),

    /// 命令录制或提交失败
    #[error("Command execution failed: {0}")]
    CommandExecution(String),

    /// 等待 fence 失败
    #[error("Fence wait failed: {0}")]
    FenceWait(String),

    /// 当前平台不支持所选后端
    #[error("Unsupported backend: {0}")]
    UnsupportedBackend(String),
}

/// 网格加载相关的错误
#[derive(Debug, Error)]
pub enum MeshLoadError {
    /// 文件不存在
    #[error("Mesh file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// 不支持的文件格式
    #[error("Unsupported mesh format: {0}")]
    UnsupportedFormat(String),

    /// 解析失败
    #[error("Failed to parse mesh: {0}")]
    ParseError(String),

    /// 数据验证失败
    #[error("Mesh validation failed: {0}")]
    ValidationError(String),

    /// 几何数据无效
    #[error("Invalid geometry data: {0}")]
    InvalidGeometry(String),

    /// 顶点数超出 16 位索引可寻址范围
    #[error("Mesh has {vertex_count} vertices, more than 16-bit indices can address")]
    IndexOverflow { vertex_count: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err: MeshRenderError = ConfigError::InvalidValue {
            field: "window.width".to_string(),
            reason: "must be greater than 0".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Configuration error: Invalid value for 'window.width': must be greater than 0"
        );

        let err: MeshRenderError = MeshLoadError::IndexOverflow { vertex_count: 70000 }.into();
        assert!(err.to_string().contains("70000"));
    }

    #[test]
    fn test_io_error_source() {
        use std::error::Error as _;

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = MeshRenderError::from(io);
        assert!(err.source().is_some());
    }
}
