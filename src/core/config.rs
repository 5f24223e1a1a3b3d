//! 配置管理模块
//!
//! 提供渲染器配置的加载、解析和管理功能。
//! 支持从 TOML 配置文件加载，也支持命令行参数覆盖。
//!
//! # 配置文件格式 (config.toml)
//!
//! ```toml
//! [window]
//! width = 2400
//! height = 1200
//! title = "MeshRender"
//! resizable = true
//!
//! [graphics]
//! backend = "dx12"      # 或 "wgpu"
//! vsync = false
//! backbuffer_count = 3  # 2 或 3
//!
//! [logging]
//! level = "info"        # trace, debug, info, warn, error
//! file_output = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::{ConfigError, Result};

/// 渲染器配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// 窗口配置
    #[serde(default)]
    pub window: WindowConfig,

    /// 图形配置
    #[serde(default)]
    pub graphics: GraphicsConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 窗口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// 窗口宽度
    #[serde(default = "default_width")]
    pub width: u32,

    /// 窗口高度
    #[serde(default = "default_height")]
    pub height: u32,

    /// 窗口标题
    #[serde(default = "default_title")]
    pub title: String,

    /// 是否可调整大小
    #[serde(default = "default_resizable")]
    pub resizable: bool,
}

/// 图形配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphicsConfig {
    /// 图形后端选择
    #[serde(default = "default_backend")]
    pub backend: GraphicsBackend,

    /// 垂直同步
    #[serde(default = "default_vsync")]
    pub vsync: bool,

    /// 交换链缓冲数量（双缓冲或三缓冲）
    #[serde(default = "default_backbuffer_count")]
    pub backbuffer_count: u32,
}

/// 图形后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphicsBackend {
    /// DirectX 12 后端（仅 Windows）
    Dx12,
    /// wgpu 后端（Vulkan、Metal、DX12、OpenGL）
    Wgpu,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// 是否输出到文件
    #[serde(default = "default_file_output")]
    pub file_output: bool,

    /// 日志文件路径
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

// 默认值函数
fn default_width() -> u32 { 2400 }
fn default_height() -> u32 { 1200 }
fn default_title() -> String { "MeshRender".to_string() }
fn default_resizable() -> bool { true }
fn default_vsync() -> bool { false }
fn default_backbuffer_count() -> u32 { 3 }
fn default_log_level() -> LogLevel { LogLevel::Info }
fn default_file_output() -> bool { false }
fn default_log_file() -> String { "mesh_render.log".to_string() }

#[cfg(target_os = "windows")]
fn default_backend() -> GraphicsBackend { GraphicsBackend::Dx12 }
#[cfg(not(target_os = "windows"))]
fn default_backend() -> GraphicsBackend { GraphicsBackend::Wgpu }

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            title: default_title(),
            resizable: default_resizable(),
        }
    }
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            vsync: default_vsync(),
            backbuffer_count: default_backbuffer_count(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: default_file_output(),
            log_file: default_log_file(),
        }
    }
}

impl Config {
    /// 从配置文件加载
    ///
    /// # 示例
    ///
    /// ```no_run
    /// use mesh_render::core::Config;
    ///
    /// let config = Config::from_file("config.toml")?;
    /// # Ok::<(), mesh_render::core::MeshRenderError>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let contents = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path_str))?;

        Self::from_toml_str(&contents)
    }

    /// 从 TOML 字符串解析
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()).into())
    }

    /// 从配置文件加载，如果文件不存在或无法解析则使用默认配置
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::from_file(path).unwrap_or_default()
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// 从命令行参数覆盖配置
    ///
    /// 支持的参数：
    /// - `--dx12` / `--wgpu`: 选择图形后端
    /// - `--width <value>` / `--height <value>`: 窗口尺寸
    /// - `--vsync`: 开启垂直同步
    /// - `--backbuffers <value>`: 交换链缓冲数量
    pub fn apply_args<I>(&mut self, args: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();

        if args.iter().any(|a| a == "--dx12") {
            self.graphics.backend = GraphicsBackend::Dx12;
        }

        if args.iter().any(|a| a == "--wgpu") {
            self.graphics.backend = GraphicsBackend::Wgpu;
        }

        if args.iter().any(|a| a == "--vsync") {
            self.graphics.vsync = true;
        }

        if let Some(width) = parse_flag_value(&args, "--width") {
            self.window.width = width;
        }

        if let Some(height) = parse_flag_value(&args, "--height") {
            self.window.height = height;
        }

        if let Some(count) = parse_flag_value(&args, "--backbuffers") {
            self.graphics.backbuffer_count = count;
        }
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::InvalidValue {
                field: "window.width/height".to_string(),
                reason: "Window dimensions must be greater than 0".to_string(),
            }
            .into());
        }

        if !matches!(self.graphics.backbuffer_count, 2 | 3) {
            return Err(ConfigError::InvalidValue {
                field: "graphics.backbuffer_count".to_string(),
                reason: "Swap chain must be double (2) or triple (3) buffered".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// 读取 `--flag <value>` 形式的参数，解析失败时忽略
fn parse_flag_value<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    let idx = args.iter().position(|a| a == flag)?;
    args.get(idx + 1)?.parse().ok()
}

impl GraphicsBackend {
    /// 获取后端名称
    pub fn name(&self) -> &'static str {
        match self {
            GraphicsBackend::Dx12 => "DirectX 12",
            GraphicsBackend::Wgpu => "wgpu",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.window.width, 2400);
        assert_eq!(config.window.height, 1200);
        assert_eq!(config.graphics.backbuffer_count, 3);
        assert!(!config.graphics.vsync);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.window.width = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.graphics.backbuffer_count = 4;
        assert!(config.validate().is_err());

        config.graphics.backbuffer_count = 2;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::from_toml_str(
            r#"
            [graphics]
            backend = "wgpu"
            backbuffer_count = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.graphics.backend, GraphicsBackend::Wgpu);
        assert_eq!(config.graphics.backbuffer_count, 2);
        assert_eq!(config.window.title, "MeshRender");
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(Config::from_toml_str("[graphics]\nbackend = \"metal\"").is_err());
    }

    #[test]
    fn test_apply_args() {
        let mut config = Config::default();
        config.apply_args([
            "mesh_render", "--wgpu", "--width", "640", "--height", "bogus", "--backbuffers", "2",
            "--vsync",
        ]);

        assert_eq!(config.graphics.backend, GraphicsBackend::Wgpu);
        assert_eq!(config.window.width, 640);
        assert_eq!(config.window.height, 1200);
        assert_eq!(config.graphics.backbuffer_count, 2);
        assert!(config.graphics.vsync);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.window.title = "Saved".to_string();
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.window.title, "Saved");
        assert!(Config::from_file(dir.path().join("missing.toml")).is_err());
    }
}
