//! MeshRender - 最小的前向网格渲染器
//!
//! 在 DirectX 12（Windows）或 wgpu 上加载一个网格并逐帧绘制。
//! 本库提供了渲染器的全部功能，`main.rs` 只负责窗口事件循环。
//!
//! # 模块结构
//!
//! - `core`: 核心功能模块（配置、场景、日志、错误处理、数学、帧计时）
//! - `geometry`: 几何体加载模块（顶点、网格、OBJ/FBX加载器）
//! - `renderer`: 与后端无关的渲染逻辑（上传计划、管线描述、fence 同步、帧驱动）
//! - `gfx`: 具体图形后端（DX12、wgpu）
//!
//! # 使用示例
//!
//! ```no_run
//! use mesh_render::geometry::load_mesh;
//! use std::path::Path;
//!
//! let mesh = load_mesh(Path::new("assets/models/cube.obj"))?;
//! println!("{} triangles", mesh.triangle_count());
//! # Ok::<(), mesh_render::core::MeshRenderError>(())
//! ```

pub mod core;
pub mod geometry;
pub mod gfx;
pub mod renderer;
