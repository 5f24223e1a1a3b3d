//! MeshRender - 最小的前向网格渲染器
//!
//! 加载一个网格（FBX/OBJ），在 DirectX 12 或 wgpu 上逐帧绘制。
//!
//! # 使用方法
//!
//! ```bash
//! # 使用配置文件
//! cargo run
//!
//! # 选择后端、模型和预编译着色器目录（命令行覆盖）
//! cargo run -- --wgpu --mesh assets/models/cube.obj --shaders shaders
//! ```
//!
//! # 按键
//!
//! - `Esc`：退出
//! - `V`：切换垂直同步
//! - `F11`：切换全屏

use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;

use anyhow::Context;
use tracing::{debug, error, info, trace};
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::Fullscreen;

use mesh_render::core::{log, Config, FrameClock, SceneConfig};
use mesh_render::geometry::load_mesh;
use mesh_render::renderer::Renderer;

/// 应用程序入口点
///
/// 任何初始化或渲染错误都会记录日志、打印到 stderr，并以状态码 1 退出。
fn main() {
    match run() {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// # 初始化流程
///
/// 1. 加载引擎配置（config.toml）并应用命令行参数
/// 2. 初始化日志系统
/// 3. 加载场景配置（scene.toml）和网格
/// 4. 创建窗口和渲染器，上传网格
/// 5. 启动主循环
fn run() -> anyhow::Result<i32> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    // 1. 加载配置（在初始化日志之前）
    let mut config = Config::from_file_or_default("config.toml");
    config.apply_args(&args);
    config.validate().context("Invalid configuration")?;

    // 2. 初始化日志系统
    let log_file = config
        .logging
        .file_output
        .then_some(config.logging.log_file.as_str());
    log::init_logger(config.logging.level, config.logging.file_output, log_file)
        .context("Failed to initialize logger")?;
    info!(version = env!("CARGO_PKG_VERSION"), "MeshRender starting...");

    // 3. 场景和网格
    let mut scene = SceneConfig::from_file_or_default("scene.toml");
    scene.apply_args(&args);
    scene.validate().context("Invalid scene configuration")?;

    info!(
        backend = ?config.graphics.backend,
        width = config.window.width,
        height = config.window.height,
        vsync = config.graphics.vsync,
        backbuffers = config.graphics.backbuffer_count,
        "Graphics configuration"
    );

    let mesh = load_mesh(Path::new(&scene.model.path))
        .with_context(|| format!("Failed to load mesh '{}'", scene.model.path))?;

    // 4. 窗口和渲染器
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut renderer =
        Renderer::new(&event_loop, &config, &scene).context("Failed to initialize renderer")?;

    let shader_dir = scene.shader_directory();
    renderer
        .load_content(&mesh, &shader_dir)
        .context("Failed to load content")?;
    drop(mesh);

    info!(backend = renderer.backend_name(), "Entering main loop...");

    // 5. 主循环
    let exit_code = Rc::new(Cell::new(0));
    let loop_exit_code = Rc::clone(&exit_code);
    let mut clock = FrameClock::new();
    let mut vsync = config.graphics.vsync;

    event_loop
        .run(move |event, elwt| match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    info!("Close requested, shutting down...");
                    elwt.exit();
                }
                WindowEvent::Resized(new_size) => {
                    debug!(width = new_size.width, height = new_size.height, "Window resized");
                    if let Err(e) = renderer.resize(new_size.width, new_size.height) {
                        error!("Resize failed: {}", e);
                        eprintln!("Resize failed: {}", e);
                        loop_exit_code.set(1);
                        elwt.exit();
                    }
                }
                WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            logical_key,
                            state: ElementState::Pressed,
                            repeat: false,
                            ..
                        },
                    ..
                } => match logical_key {
                    Key::Named(NamedKey::Escape) => elwt.exit(),
                    Key::Named(NamedKey::F11) => {
                        let window = renderer.window();
                        let fullscreen = match window.fullscreen() {
                            Some(_) => None,
                            None => Some(Fullscreen::Borderless(None)),
                        };
                        info!(fullscreen = fullscreen.is_some(), "Toggling fullscreen");
                        window.set_fullscreen(fullscreen);
                    }
                    Key::Character(c) if c.eq_ignore_ascii_case("v") => {
                        vsync = !vsync;
                        info!(vsync, "Toggling vsync");
                        renderer.set_vsync(vsync);
                    }
                    _ => {}
                },
                WindowEvent::RedrawRequested => {
                    if let Some(fps) = clock.tick() {
                        debug!("FPS: {:.1}", fps);
                    }
                    trace!(total = clock.total_seconds(), "Frame");
                    renderer.update(clock.total_seconds());

                    if let Err(e) = renderer.render() {
                        error!("Render failed: {}", e);
                        eprintln!("Render failed: {}", e);
                        loop_exit_code.set(1);
                        elwt.exit();
                    }
                }
                _ => {}
            },
            Event::AboutToWait => renderer.window().request_redraw(),
            _ => {}
        })
        .context("Event loop error")?;

    Ok(exit_code.get())
}
