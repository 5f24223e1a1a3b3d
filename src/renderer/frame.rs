//! 帧驱动
//!
//! `MeshRenderer` 是与后端无关的渲染循环：加载内容、每帧更新常量、
//! 等待交换链图像的 fence、提交并呈现，以及处理窗口尺寸变化。
//!
//! # 每帧流程
//!
//! ```text
//! 等待 backbuffer[i] 的 fence → 录制并提交 (fence N) → 记录 N 到 i → Present → i = 新索引
//! ```
//!
//! # 尺寸变化
//!
//! ```text
//! 尺寸未变 → 不做任何事
//! 否则 → flush 队列 → 改变交换链尺寸 → 重置 fence 记录 → 新视口 → 重建深度缓冲区
//! ```

use std::path::Path;

use tracing::{debug, info, trace, warn};

use crate::core::error::Result;
use crate::core::math::Matrix4;
use crate::core::SceneConfig;
use crate::geometry::MeshData;
use crate::renderer::backend_trait::RenderBackend;
use crate::renderer::pipeline::{PipelineDesc, MVP_CONSTANT_COUNT};
use crate::renderer::resource::{BufferUpload, BufferUsage, DepthBufferDesc, Extent2D};
use crate::renderer::shaders::ShaderBlobs;
use crate::renderer::sync::{BackbufferFences, GpuQueue};

/// 视口
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// 覆盖整个客户区
    pub fn new(extent: Extent2D) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// 裁剪矩形
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScissorRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl ScissorRect {
    /// 不裁剪，后端会将其限制在渲染目标内
    pub fn unbounded() -> Self {
        Self {
            left: 0,
            top: 0,
            right: i32::MAX,
            bottom: i32::MAX,
        }
    }
}

/// 每帧的变换矩阵
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneConstants {
    pub model: Matrix4,
    pub view: Matrix4,
    pub projection: Matrix4,
    /// projection * view * model
    pub mvp: Matrix4,
}

impl Default for SceneConstants {
    fn default() -> Self {
        Self {
            model: Matrix4::identity(),
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
            mvp: Matrix4::identity(),
        }
    }
}

impl SceneConstants {
    pub fn compute(scene: &SceneConfig, total_seconds: f64, aspect_ratio: f32) -> Self {
        let model = scene.animation.model_matrix(total_seconds);
        let view = scene.camera.view_matrix();
        let projection = scene.camera.projection_matrix(aspect_ratio);

        Self {
            model,
            view,
            projection,
            mvp: projection * view * model,
        }
    }

    /// MVP 的 16 个根常量（列主序）
    pub fn to_root_constants(&self) -> [f32; MVP_CONSTANT_COUNT as usize] {
        let mut constants = [0.0; MVP_CONSTANT_COUNT as usize];
        constants.copy_from_slice(self.mvp.as_slice());
        constants
    }
}

/// 一帧需要录制的全部内容
pub struct FrameCommands<'a, B: RenderBackend> {
    pub backbuffer_index: usize,
    pub clear_color: [f32; 4],
    pub clear_depth: f32,
    pub pipeline: &'a B::Pipeline,
    pub vertex_buffer: &'a B::Buffer,
    pub index_buffer: &'a B::Buffer,
    pub index_count: u32,
    pub depth_buffer: &'a B::DepthBuffer,
    pub viewport: Viewport,
    pub scissor: ScissorRect,
    pub constants: [f32; MVP_CONSTANT_COUNT as usize],
}

/// 已上传到 GPU 的网格和管线
struct MeshContent<B: RenderBackend> {
    vertex_buffer: B::Buffer,
    index_buffer: B::Buffer,
    index_count: u32,
    pipeline: B::Pipeline,
}

/// 网格渲染器
pub struct MeshRenderer<B: RenderBackend> {
    backend: B,
    scene: SceneConfig,
    content: Option<MeshContent<B>>,
    depth_buffer: Option<B::DepthBuffer>,
    fences: BackbufferFences,
    backbuffer_index: usize,
    client_size: Extent2D,
    viewport: Viewport,
    scissor: ScissorRect,
    constants: SceneConstants,
}

impl<B: RenderBackend> MeshRenderer<B> {
    pub fn new(backend: B, scene: SceneConfig) -> Self {
        let client_size = backend.client_size();
        let fences = BackbufferFences::new(backend.backbuffer_count());
        let backbuffer_index = backend.current_backbuffer_index();
        let constants = SceneConstants::compute(&scene, 0.0, client_size.aspect_ratio());

        Self {
            backend,
            scene,
            content: None,
            depth_buffer: None,
            fences,
            backbuffer_index,
            client_size,
            viewport: Viewport::new(client_size.clamped()),
            scissor: ScissorRect::unbounded(),
            constants,
        }
    }

    /// 上传网格，创建管线和深度缓冲区
    ///
    /// 返回前会等待上传完成。
    pub fn load_content(&mut self, mesh: &MeshData, shader_dir: &Path) -> Result<()> {
        let indices = mesh.index_buffer_u16()?;

        // 旧的缓冲区和深度缓冲区在下面被替换时可能还被已提交的帧引用，
        // 而上传走的是复制队列，不会等待这些帧
        if self.content.is_some() {
            self.flush()?;
        }

        let vertex_upload = BufferUpload::new(&mesh.vertices, BufferUsage::Vertex, "Vertex Buffer")?;
        let index_upload = BufferUpload::new(&indices, BufferUsage::Index, "Index Buffer")?;

        let vertex_buffer = self.backend.upload_buffer(&vertex_upload)?;
        let index_buffer = self.backend.upload_buffer(&index_upload)?;
        self.backend.finish_uploads()?;

        debug!(
            vertex_bytes = vertex_upload.byte_size,
            index_bytes = index_upload.byte_size,
            "Mesh buffers uploaded"
        );

        let kind = self.backend.shader_blob_kind();
        let shaders = if !ShaderBlobs::exists(shader_dir, kind) && self.backend.has_builtin_shaders() {
            warn!(
                directory = %shader_dir.display(),
                extension = kind.extension(),
                "Shader blobs not found, using built-in shaders"
            );
            None
        } else {
            Some(ShaderBlobs::load(shader_dir, kind)?)
        };

        let pipeline = self
            .backend
            .create_pipeline(&PipelineDesc::forward(), shaders.as_ref())?;

        self.content = Some(MeshContent {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            pipeline,
        });
        self.depth_buffer = Some(
            self.backend
                .create_depth_buffer(&DepthBufferDesc::for_client_area(self.client_size))?,
        );

        info!(
            mesh = mesh.name.as_deref().unwrap_or("Unnamed"),
            vertices = mesh.vertex_count(),
            triangles = mesh.triangle_count(),
            backend = self.backend.name(),
            "Content loaded"
        );
        Ok(())
    }

    /// 释放网格资源
    pub fn unload_content(&mut self) -> Result<()> {
        self.flush()?;
        self.content = None;
        self.depth_buffer = None;
        Ok(())
    }

    pub fn is_content_loaded(&self) -> bool {
        self.content.is_some()
    }

    /// 根据累计时间更新变换矩阵
    pub fn update(&mut self, total_seconds: f64) {
        self.constants =
            SceneConstants::compute(&self.scene, total_seconds, self.client_size.aspect_ratio());
    }

    /// 渲染并呈现一帧
    ///
    /// 窗口最小化或内容未加载时直接返回。
    pub fn render(&mut self) -> Result<()> {
        if self.client_size.is_zero_area() {
            return Ok(());
        }
        let (content, depth_buffer) = match (&self.content, &self.depth_buffer) {
            (Some(content), Some(depth)) => (content, depth),
            _ => return Ok(()),
        };

        let index = self.backbuffer_index;
        self.fences
            .wait_for_backbuffer(index, self.backend.direct_queue())?;

        let frame = FrameCommands {
            backbuffer_index: index,
            clear_color: self.scene.clear_color,
            clear_depth: 1.0,
            pipeline: &content.pipeline,
            vertex_buffer: &content.vertex_buffer,
            index_buffer: &content.index_buffer,
            index_count: content.index_count,
            depth_buffer,
            viewport: self.viewport,
            scissor: self.scissor,
            constants: self.constants.to_root_constants(),
        };

        let fence = self.backend.execute_frame(&frame)?;
        self.fences.record_submission(index, fence);

        self.backbuffer_index = self.backend.present()?;
        trace!(
            backbuffer = index,
            fence = fence.value(),
            next = self.backbuffer_index,
            "Frame presented"
        );
        Ok(())
    }

    /// 处理客户区尺寸变化
    ///
    /// 返回是否真的发生了变化。
    pub fn resize(&mut self, extent: Extent2D) -> Result<bool> {
        if extent == self.client_size {
            return Ok(false);
        }

        // 交换链和深度缓冲区可能还被 GPU 使用
        self.flush()?;

        let clamped = extent.clamped();
        self.backend.resize_swap_chain(clamped)?;
        self.client_size = extent;
        self.backbuffer_index = self.backend.current_backbuffer_index();
        self.fences.reset(self.backend.backbuffer_count());
        self.viewport = Viewport::new(clamped);

        if self.content.is_some() {
            // 先释放旧的深度缓冲区
            self.depth_buffer = None;
            self.depth_buffer = Some(
                self.backend
                    .create_depth_buffer(&DepthBufferDesc::for_client_area(extent))?,
            );
        }

        debug!(
            width = extent.width,
            height = extent.height,
            backbuffer = self.backbuffer_index,
            "Resized"
        );
        Ok(true)
    }

    /// 等待 GPU 完成所有已提交的工作
    pub fn flush(&self) -> Result<()> {
        self.backend.direct_queue().flush()
    }

    pub fn set_vsync(&mut self, vsync: bool) {
        info!(vsync, "VSync changed");
        self.backend.set_vsync(vsync);
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn scene(&self) -> &SceneConfig {
        &self.scene
    }

    pub fn client_size(&self) -> Extent2D {
        self.client_size
    }

    pub fn backbuffer_index(&self) -> usize {
        self.backbuffer_index
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn constants(&self) -> &SceneConstants {
        &self.constants
    }
}

impl<B: RenderBackend> Drop for MeshRenderer<B> {
    fn drop(&mut self) {
        // 资源释放前 GPU 必须空闲
        if let Err(e) = self.flush() {
            tracing::error!("Failed to flush GPU on shutdown: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{GraphicsError, MeshLoadError};
    use crate::core::MeshRenderError;
    use crate::geometry::Vertex;
    use crate::renderer::shaders::ShaderBlobKind;
    use crate::renderer::sync::{FenceManager, FenceValue};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Signal(u64),
        Wait(u64),
        Upload(u64),
        FinishUploads,
        CreatePipeline { builtin: bool },
        CreateDepth(Extent2D),
        ResizeSwapChain(Extent2D),
        Execute { backbuffer: usize, fence: u64 },
        Present(usize),
        DropBuffer { in_flight: bool },
    }

    type EventLog = Rc<RefCell<Vec<Event>>>;

    /// GPU 只有在被等待时才完成工作
    struct SimQueue {
        fences: Rc<FenceManager>,
        log: EventLog,
    }

    impl SimQueue {
        fn new(log: &EventLog) -> Self {
            Self {
                fences: Rc::new(FenceManager::new()),
                log: Rc::clone(log),
            }
        }
    }

    /// 释放时记录直接队列上是否还有未完成的帧
    struct SimBuffer {
        direct_fences: Rc<FenceManager>,
        log: EventLog,
    }

    impl Drop for SimBuffer {
        fn drop(&mut self) {
            let in_flight = !self
                .direct_fences
                .is_completed(self.direct_fences.current_value());
            self.log.borrow_mut().push(Event::DropBuffer { in_flight });
        }
    }

    impl GpuQueue for SimQueue {
        fn signal(&self) -> Result<FenceValue> {
            let value = self.fences.next_value();
            self.log.borrow_mut().push(Event::Signal(value.value()));
            Ok(value)
        }

        fn completed_value(&self) -> FenceValue {
            self.fences.completed_value()
        }

        fn wait_for_fence_value(&self, value: FenceValue) -> Result<()> {
            self.log.borrow_mut().push(Event::Wait(value.value()));
            self.fences.update_completed_value(value);
            Ok(())
        }
    }

    struct SimBackend {
        queue: SimQueue,
        /// 为 `Some` 时上传不经过直接队列（与 D3D12 的复制队列一样）
        upload_queue: Option<SimQueue>,
        log: EventLog,
        backbuffer_count: usize,
        index: usize,
        size: Extent2D,
        builtin_shaders: bool,
        /// 每个交换链图像最后一次提交的 fence 值
        submitted: Vec<FenceValue>,
        frames: usize,
        fail_resize: bool,
    }

    impl SimBackend {
        fn new(backbuffer_count: usize) -> (Self, EventLog) {
            let log: EventLog = Rc::default();
            let backend = Self {
                queue: SimQueue::new(&log),
                upload_queue: None,
                log: Rc::clone(&log),
                backbuffer_count,
                index: 0,
                size: Extent2D::new(800, 600),
                builtin_shaders: true,
                submitted: vec![FenceValue::ZERO; backbuffer_count],
                frames: 0,
                fail_resize: false,
            };
            (backend, log)
        }
    }

    impl RenderBackend for SimBackend {
        type Buffer = SimBuffer;
        type Pipeline = ();
        type DepthBuffer = Extent2D;
        type Queue = SimQueue;

        fn name(&self) -> &'static str {
            "sim"
        }

        fn direct_queue(&self) -> &SimQueue {
            &self.queue
        }

        fn backbuffer_count(&self) -> usize {
            self.backbuffer_count
        }

        fn current_backbuffer_index(&self) -> usize {
            self.index
        }

        fn client_size(&self) -> Extent2D {
            self.size
        }

        fn shader_blob_kind(&self) -> ShaderBlobKind {
            ShaderBlobKind::SpirV
        }

        fn has_builtin_shaders(&self) -> bool {
            self.builtin_shaders
        }

        fn upload_buffer(&mut self, upload: &BufferUpload<'_>) -> Result<SimBuffer> {
            self.log.borrow_mut().push(Event::Upload(upload.byte_size));
            Ok(SimBuffer {
                direct_fences: Rc::clone(&self.queue.fences),
                log: Rc::clone(&self.log),
            })
        }

        fn finish_uploads(&mut self) -> Result<()> {
            self.log.borrow_mut().push(Event::FinishUploads);
            self.upload_queue.as_ref().unwrap_or(&self.queue).flush()
        }

        fn create_pipeline(&mut self, _desc: &PipelineDesc, shaders: Option<&ShaderBlobs>) -> Result<()> {
            self.log.borrow_mut().push(Event::CreatePipeline {
                builtin: shaders.is_none(),
            });
            Ok(())
        }

        fn create_depth_buffer(&mut self, desc: &DepthBufferDesc) -> Result<Extent2D> {
            self.log.borrow_mut().push(Event::CreateDepth(desc.extent));
            Ok(desc.extent)
        }

        fn resize_swap_chain(&mut self, extent: Extent2D) -> Result<()> {
            if self.fail_resize {
                return Err(GraphicsError::SwapchainError("ResizeBuffers failed".to_string()).into());
            }
            self.log.borrow_mut().push(Event::ResizeSwapChain(extent));
            self.size = extent;
            self.index = 0;
            self.submitted = vec![FenceValue::ZERO; self.backbuffer_count];
            Ok(())
        }

        fn execute_frame(&mut self, frame: &FrameCommands<'_, Self>) -> Result<FenceValue> {
            let index = frame.backbuffer_index;
            assert_eq!(index, self.index);
            assert!(
                self.queue.is_fence_complete(self.submitted[index]),
                "backbuffer {} recorded before fence {} completed",
                index,
                self.submitted[index].value()
            );

            let fence = self.queue.signal()?;
            self.submitted[index] = fence;
            self.frames += 1;
            self.log.borrow_mut().push(Event::Execute {
                backbuffer: frame.backbuffer_index,
                fence: fence.value(),
            });
            Ok(fence)
        }

        fn present(&mut self) -> Result<usize> {
            self.log.borrow_mut().push(Event::Present(self.index));
            self.index = (self.index + 1) % self.backbuffer_count;
            Ok(self.index)
        }

        fn set_vsync(&mut self, _vsync: bool) {}
    }

    fn triangle() -> MeshData {
        let mut mesh = MeshData::with_name("Triangle");
        mesh.append(
            &[
                Vertex::new([0.0, 1.0, 0.0], [1.0, 0.0, 0.0]),
                Vertex::new([1.0, -1.0, 0.0], [0.0, 1.0, 0.0]),
                Vertex::new([-1.0, -1.0, 0.0], [0.0, 0.0, 1.0]),
            ],
            &[0, 1, 2],
        );
        mesh
    }

    fn loaded_renderer(backbuffer_count: usize) -> (MeshRenderer<SimBackend>, EventLog) {
        let (backend, log) = SimBackend::new(backbuffer_count);
        let mut renderer = MeshRenderer::new(backend, SceneConfig::default());
        let dir = tempfile::tempdir().unwrap();
        renderer.load_content(&triangle(), dir.path()).unwrap();
        log.borrow_mut().clear();
        (renderer, log)
    }

    #[test]
    fn test_load_content_order() {
        let (backend, log) = SimBackend::new(3);
        let mut renderer = MeshRenderer::new(backend, SceneConfig::default());
        let dir = tempfile::tempdir().unwrap();
        renderer.load_content(&triangle(), dir.path()).unwrap();

        let vb_size = (3 * Vertex::STRIDE) as u64;
        assert_eq!(
            *log.borrow(),
            vec![
                Event::Upload(vb_size),
                Event::Upload(6),
                Event::FinishUploads,
                Event::Signal(1),
                Event::Wait(1),
                Event::CreatePipeline { builtin: true },
                Event::CreateDepth(Extent2D::new(800, 600)),
            ]
        );
        assert!(renderer.is_content_loaded());
    }

    #[test]
    fn test_missing_shaders_without_builtin_fallback() {
        let (mut backend, _log) = SimBackend::new(2);
        backend.builtin_shaders = false;
        let mut renderer = MeshRenderer::new(backend, SceneConfig::default());
        let dir = tempfile::tempdir().unwrap();

        let err = renderer.load_content(&triangle(), dir.path()).unwrap_err();
        assert!(matches!(
            err,
            MeshRenderError::Graphics(GraphicsError::ShaderLoad { .. })
        ));
        assert!(!renderer.is_content_loaded());
    }

    #[test]
    fn test_index_overflow_rejected_before_upload() {
        let (backend, log) = SimBackend::new(2);
        let mut renderer = MeshRenderer::new(backend, SceneConfig::default());

        let mut mesh = MeshData::with_name("Huge");
        let vertices = vec![Vertex::default(); 65_537];
        mesh.append(&vertices, &[0, 1, 65_536]);

        let dir = tempfile::tempdir().unwrap();
        let err = renderer.load_content(&mesh, dir.path()).unwrap_err();
        assert!(matches!(
            err,
            MeshRenderError::MeshLoading(MeshLoadError::IndexOverflow { .. })
        ));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_backbuffer_fence_reached_before_reuse() {
        // SimBackend::execute_frame 断言图像的上一个 fence 已完成
        let (mut renderer, log) = loaded_renderer(3);
        for _ in 0..10 {
            renderer.render().unwrap();
        }

        assert_eq!(renderer.backend().frames, 10);
        let waits = log
            .borrow()
            .iter()
            .filter(|e| matches!(e, Event::Wait(_)))
            .count();
        // 前三帧使用空闲图像，其余每帧都要等待
        assert_eq!(waits, 7);
    }

    #[test]
    fn test_render_waits_only_for_in_flight_backbuffer() {
        let (mut renderer, log) = loaded_renderer(2);

        // 第一轮两个图像都空闲，不需要等待
        renderer.render().unwrap();
        renderer.render().unwrap();
        assert!(!log.borrow().iter().any(|e| matches!(e, Event::Wait(_))));

        // 回到图像 0，必须等待它的 fence（值 2，上传用掉了 1）
        renderer.render().unwrap();
        let events = log.borrow();
        let wait_pos = events.iter().position(|e| *e == Event::Wait(2)).unwrap();
        let exec_pos = events
            .iter()
            .position(|e| matches!(e, Event::Execute { backbuffer: 0, fence: 4 }))
            .unwrap();
        assert!(wait_pos < exec_pos);
    }

    #[test]
    fn test_resize_flushes_before_depth_recreation() {
        let (mut renderer, log) = loaded_renderer(3);
        renderer.render().unwrap();
        log.borrow_mut().clear();

        assert!(renderer.resize(Extent2D::new(1024, 768)).unwrap());

        assert_eq!(
            *log.borrow(),
            vec![
                Event::Signal(3),
                Event::Wait(3),
                Event::ResizeSwapChain(Extent2D::new(1024, 768)),
                Event::CreateDepth(Extent2D::new(1024, 768)),
            ]
        );
        assert_eq!(renderer.viewport().width, 1024.0);
        assert_eq!(renderer.backbuffer_index(), 0);
    }

    #[test]
    fn test_failed_resize_keeps_client_size() {
        let (mut renderer, log) = loaded_renderer(2);
        renderer.backend_mut().fail_resize = true;

        assert!(renderer.resize(Extent2D::new(1024, 768)).is_err());
        assert_eq!(renderer.client_size(), Extent2D::new(800, 600));
        assert_eq!(renderer.viewport().width, 800.0);

        // 同样的尺寸再次到来时必须重试，而不是被当作没有变化
        renderer.backend_mut().fail_resize = false;
        log.borrow_mut().clear();
        assert!(renderer.resize(Extent2D::new(1024, 768)).unwrap());
        assert!(log
            .borrow()
            .contains(&Event::ResizeSwapChain(Extent2D::new(1024, 768))));
        assert_eq!(renderer.client_size(), Extent2D::new(1024, 768));
    }

    #[test]
    fn test_resize_unchanged_is_noop() {
        let (mut renderer, log) = loaded_renderer(3);

        assert!(!renderer.resize(Extent2D::new(800, 600)).unwrap());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_resize_to_zero_clamps_and_skips_rendering() {
        let (mut renderer, log) = loaded_renderer(3);

        assert!(renderer.resize(Extent2D::new(0, 0)).unwrap());
        assert!(log
            .borrow()
            .contains(&Event::ResizeSwapChain(Extent2D::new(1, 1))));
        assert!(log.borrow().contains(&Event::CreateDepth(Extent2D::new(1, 1))));

        log.borrow_mut().clear();
        renderer.render().unwrap();
        assert!(log.borrow().is_empty());

        renderer.resize(Extent2D::new(640, 480)).unwrap();
        renderer.render().unwrap();
        assert!(log
            .borrow()
            .iter()
            .any(|e| matches!(e, Event::Execute { .. })));
    }

    #[test]
    fn test_resize_before_content_skips_depth() {
        let (backend, log) = SimBackend::new(2);
        let mut renderer = MeshRenderer::new(backend, SceneConfig::default());

        renderer.resize(Extent2D::new(320, 200)).unwrap();
        assert!(!log
            .borrow()
            .iter()
            .any(|e| matches!(e, Event::CreateDepth(_))));
    }

    #[test]
    fn test_render_without_content_does_nothing() {
        let (backend, log) = SimBackend::new(2);
        let mut renderer = MeshRenderer::new(backend, SceneConfig::default());

        renderer.render().unwrap();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_scene_constants_mvp() {
        let scene = SceneConfig::default();
        let constants = SceneConstants::compute(&scene, 0.0, 2.0);

        assert_eq!(constants.model, Matrix4::identity());
        assert_eq!(constants.mvp, constants.projection * constants.view);

        let root = constants.to_root_constants();
        assert_eq!(&root[..], constants.mvp.as_slice());
    }

    #[test]
    fn test_update_uses_client_aspect() {
        let (mut renderer, _log) = loaded_renderer(2);
        renderer.update(1.0);

        let expected = SceneConstants::compute(renderer.scene(), 1.0, 800.0 / 600.0);
        assert_eq!(*renderer.constants(), expected);
    }

    #[test]
    fn test_reload_waits_for_frames_in_flight() {
        let (mut backend, log) = SimBackend::new(2);
        backend.upload_queue = Some(SimQueue::new(&log));
        let mut renderer = MeshRenderer::new(backend, SceneConfig::default());
        let dir = tempfile::tempdir().unwrap();
        renderer.load_content(&triangle(), dir.path()).unwrap();

        renderer.render().unwrap();
        renderer.render().unwrap();
        log.borrow_mut().clear();

        renderer.load_content(&triangle(), dir.path()).unwrap();

        let events = log.borrow();
        let drops: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                Event::DropBuffer { in_flight } => Some(*in_flight),
                _ => None,
            })
            .collect();
        assert_eq!(drops, vec![false, false]);

        // 直接队列的 flush 发生在新的上传之前
        let wait_pos = events.iter().position(|e| *e == Event::Wait(3)).unwrap();
        let upload_pos = events
            .iter()
            .position(|e| matches!(e, Event::Upload(_)))
            .unwrap();
        assert!(wait_pos < upload_pos);
        assert!(renderer.is_content_loaded());
    }

    #[test]
    fn test_unload_flushes() {
        let (mut renderer, log) = loaded_renderer(2);
        renderer.unload_content().unwrap();

        assert!(!renderer.is_content_loaded());
        assert!(log.borrow().iter().any(|e| matches!(e, Event::Wait(_))));
    }
}
