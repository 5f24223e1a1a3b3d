//! 核心功能模块
//!
//! 与具体图形 API 无关的基础设施：配置、场景配置、日志、错误处理、数学工具和帧计时。
//!
//! # 模块组织
//!
//! - `config`：渲染器配置（config.toml），支持命令行覆盖
//! - `scene`：场景配置（scene.toml）：模型、着色器目录、相机、动画
//! - `log`：日志系统，基于 `tracing`
//! - `error`：统一的错误类型
//! - `math`：左手坐标系的矩阵辅助函数
//! - `timer`：帧计时与帧率统计

pub mod config;
pub mod error;
pub mod log;
pub mod math;
pub mod scene;
pub mod timer;

// 重新导出常用类型，方便使用
pub use config::{Config, GraphicsBackend};
pub use error::{ConfigError, GraphicsError, MeshLoadError, MeshRenderError, Result};
pub use math::{Matrix4, Vector3};
pub use scene::SceneConfig;
pub use timer::FrameClock;
