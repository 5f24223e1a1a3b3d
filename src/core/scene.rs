//! 场景配置模块
//!
//! 定义场景配置：要加载的模型、着色器目录、相机、模型动画和清屏颜色。
//! 对应 `scene.toml`，所有字段都有默认值。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::{ConfigError, Result};
use crate::core::math::{self, Matrix4, Vector3};

/// 相机配置
///
/// 左手坐标系，相机看向 `focus`。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// 相机位置
    #[serde(default = "default_eye")]
    pub eye: [f32; 3],

    /// 观察点
    #[serde(default = "default_focus")]
    pub focus: [f32; 3],

    /// 上方向
    #[serde(default = "default_up")]
    pub up: [f32; 3],

    /// 垂直视野角度（度数）
    #[serde(default = "default_fov")]
    pub fov: f32,

    /// 近裁剪面距离
    #[serde(default = "default_near_clip")]
    pub near_clip: f32,

    /// 远裁剪面距离
    #[serde(default = "default_far_clip")]
    pub far_clip: f32,
}

fn default_eye() -> [f32; 3] { [0.0, 0.0, -5.0] }
fn default_focus() -> [f32; 3] { [0.0, 0.0, 0.0] }
fn default_up() -> [f32; 3] { [0.0, 1.0, 0.0] }
fn default_fov() -> f32 { 45.0 }
fn default_near_clip() -> f32 { 0.1 }
fn default_far_clip() -> f32 { 100.0 }

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            eye: default_eye(),
            focus: default_focus(),
            up: default_up(),
            fov: default_fov(),
            near_clip: default_near_clip(),
            far_clip: default_far_clip(),
        }
    }
}

impl CameraConfig {
    /// 左手视图矩阵
    pub fn view_matrix(&self) -> Matrix4 {
        math::look_at_lh(
            &Vector3::from(self.eye),
            &Vector3::from(self.focus),
            &Vector3::from(self.up),
        )
    }

    /// 左手透视投影矩阵，深度范围 [0, 1]
    pub fn projection_matrix(&self, aspect_ratio: f32) -> Matrix4 {
        math::perspective_fov_lh(
            math::deg_to_rad(self.fov),
            aspect_ratio,
            self.near_clip,
            self.far_clip,
        )
    }
}

/// 模型配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// 模型文件路径（.fbx 或 .obj）
    #[serde(default = "default_model_path")]
    pub path: String,
}

fn default_model_path() -> String { "assets/models/cube.obj".to_string() }

impl Default for ModelConfig {
    fn default() -> Self {
        Self { path: default_model_path() }
    }
}

/// 着色器配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShaderConfig {
    /// 预编译着色器所在目录，未设置时使用可执行文件所在目录
    #[serde(default)]
    pub directory: Option<String>,
}

/// 模型动画配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationConfig {
    /// 旋转轴
    #[serde(default = "default_rotation_axis")]
    pub rotation_axis: [f32; 3],

    /// 旋转速度（度/秒），0 表示静止
    #[serde(default)]
    pub rotation_speed: f32,
}

fn default_rotation_axis() -> [f32; 3] { [0.0, 1.0, 1.0] }

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            rotation_axis: default_rotation_axis(),
            rotation_speed: 0.0,
        }
    }
}

impl AnimationConfig {
    /// 经过 `total_seconds` 秒后的模型矩阵
    pub fn model_matrix(&self, total_seconds: f64) -> Matrix4 {
        let angle = (self.rotation_speed as f64 * total_seconds) as f32;
        math::rotation_axis_angle(&Vector3::from(self.rotation_axis), math::deg_to_rad(angle))
    }
}

/// 场景配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneConfig {
    /// 模型配置
    #[serde(default)]
    pub model: ModelConfig,

    /// 着色器配置
    #[serde(default)]
    pub shaders: ShaderConfig,

    /// 相机配置
    #[serde(default)]
    pub camera: CameraConfig,

    /// 动画配置
    #[serde(default)]
    pub animation: AnimationConfig,

    /// 清屏颜色 (RGBA)
    #[serde(default = "default_clear_color")]
    pub clear_color: [f32; 4],
}

fn default_clear_color() -> [f32; 4] { [0.4, 0.6, 0.9, 1.0] }

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            shaders: ShaderConfig::default(),
            camera: CameraConfig::default(),
            animation: AnimationConfig::default(),
            clear_color: default_clear_color(),
        }
    }
}

impl SceneConfig {
    /// 从文件加载场景配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            ConfigError::FileNotFound(format!(
                "Failed to read scene config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        toml::from_str(&contents).map_err(|e| {
            ConfigError::ParseError(format!("Failed to parse scene config: {}", e)).into()
        })
    }

    /// 从文件加载，如果文件不存在则返回默认配置
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if path.exists() {
            match Self::from_file(path) {
                Ok(config) => {
                    tracing::info!("Loaded scene config from: {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to load scene config: {}, using defaults", e);
                    Self::default()
                }
            }
        } else {
            tracing::info!("Scene config not found, using defaults");
            Self::default()
        }
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self).map_err(|e| {
            ConfigError::ParseError(format!("Failed to serialize scene config: {}", e))
        })?;

        fs::write(path, contents)?;

        tracing::info!("Saved scene config to: {}", path.display());
        Ok(())
    }

    /// 从命令行参数覆盖配置
    ///
    /// - `--mesh <path>`: 模型文件
    /// - `--shaders <dir>`: 预编译着色器目录
    pub fn apply_args<I>(&mut self, args: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();

        for (i, arg) in args.iter().enumerate() {
            match (arg.as_str(), args.get(i + 1)) {
                ("--mesh", Some(value)) => self.model.path = value.clone(),
                ("--shaders", Some(value)) => self.shaders.directory = Some(value.clone()),
                _ => {}
            }
        }
    }

    /// 验证场景配置
    pub fn validate(&self) -> Result<()> {
        let camera = &self.camera;

        if !(camera.fov > 0.0 && camera.fov < 180.0) {
            return Err(ConfigError::InvalidValue {
                field: "camera.fov".to_string(),
                reason: format!("FOV must be in (0, 180) degrees, got {}", camera.fov),
            }
            .into());
        }

        if !(camera.near_clip > 0.0 && camera.near_clip < camera.far_clip) {
            return Err(ConfigError::InvalidValue {
                field: "camera.near_clip/far_clip".to_string(),
                reason: format!(
                    "Expected 0 < near < far, got near={} far={}",
                    camera.near_clip, camera.far_clip
                ),
            }
            .into());
        }

        if self.model.path.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "model.path".to_string(),
                reason: "Model path must not be empty".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// 着色器目录
    ///
    /// 优先使用配置值，否则为可执行文件所在目录，再退回到当前目录。
    pub fn shader_directory(&self) -> PathBuf {
        if let Some(dir) = &self.shaders.directory {
            return PathBuf::from(dir);
        }

        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scene() {
        let scene = SceneConfig::default();
        assert_eq!(scene.camera.eye, [0.0, 0.0, -5.0]);
        assert_eq!(scene.camera.fov, 45.0);
        assert_eq!(scene.animation.rotation_axis, [0.0, 1.0, 1.0]);
        assert_eq!(scene.animation.rotation_speed, 0.0);
        assert_eq!(scene.clear_color, [0.4, 0.6, 0.9, 1.0]);
        assert!(scene.validate().is_ok());
    }

    #[test]
    fn test_partial_scene_toml() {
        let scene: SceneConfig = toml::from_str(
            r#"
            [model]
            path = "assets/models/teapot.fbx"

            [animation]
            rotation_speed = 90.0
            "#,
        )
        .unwrap();

        assert_eq!(scene.model.path, "assets/models/teapot.fbx");
        assert_eq!(scene.animation.rotation_speed, 90.0);
        assert_eq!(scene.animation.rotation_axis, [0.0, 1.0, 1.0]);
        assert!(scene.shaders.directory.is_none());
        assert_eq!(scene.camera.far_clip, 100.0);
    }

    #[test]
    fn test_apply_args() {
        let mut scene = SceneConfig::default();
        scene.apply_args(["mesh_render", "--mesh", "a.fbx", "--shaders", "out/shaders"]);
        assert_eq!(scene.model.path, "a.fbx");
        assert_eq!(scene.shader_directory(), PathBuf::from("out/shaders"));

        // 缺少值时保持原样
        scene.apply_args(["mesh_render", "--mesh"]);
        assert_eq!(scene.model.path, "a.fbx");
    }

    #[test]
    fn test_validation() {
        let mut scene = SceneConfig::default();
        scene.camera.near_clip = 200.0;
        assert!(scene.validate().is_err());

        let mut scene = SceneConfig::default();
        scene.camera.fov = 0.0;
        assert!(scene.validate().is_err());
    }

    #[test]
    fn test_static_model_matrix() {
        let animation = AnimationConfig::default();
        assert_eq!(animation.model_matrix(12.5), Matrix4::identity());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.toml");

        let mut scene = SceneConfig::default();
        scene.shaders.directory = Some("bin".to_string());
        scene.save_to_file(&path).unwrap();

        let loaded = SceneConfig::from_file(&path).unwrap();
        assert_eq!(loaded.shaders.directory.as_deref(), Some("bin"));
    }
}
