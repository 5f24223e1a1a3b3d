//! 统一的渲染后端接口
//!
//! DX12 和 wgpu 后端都实现 `RenderBackend`。帧驱动 `MeshRenderer` 只通过这个接口
//! 操作 GPU，fence 等待、尺寸变化和内容加载的顺序都在帧驱动里决定，
//! 后端只负责把一个请求翻译成具体的 API 调用。
//!
//! 资源句柄使用关联类型，帧驱动持有它们但不关心具体内容。

use crate::core::error::Result;
use crate::renderer::frame::FrameCommands;
use crate::renderer::pipeline::PipelineDesc;
use crate::renderer::resource::{BufferUpload, DepthBufferDesc, Extent2D};
use crate::renderer::shaders::{ShaderBlobKind, ShaderBlobs};
use crate::renderer::sync::{FenceValue, GpuQueue};

/// 统一的渲染后端接口
///
/// # 调用顺序
///
/// ```text
/// upload_buffer × N → finish_uploads → create_pipeline → create_depth_buffer
/// 每帧: execute_frame → present
/// 尺寸变化: (flush) → resize_swap_chain → create_depth_buffer
/// ```
pub trait RenderBackend: Sized {
    /// GPU 本地缓冲区（顶点或索引）
    type Buffer;
    /// 根签名 + 管线状态
    type Pipeline;
    /// 深度缓冲区
    type DepthBuffer;
    /// 绘制使用的队列
    type Queue: GpuQueue;

    /// 后端名称，用于日志
    fn name(&self) -> &'static str;

    /// 帧命令提交所在的队列
    fn direct_queue(&self) -> &Self::Queue;

    /// 交换链图像数量
    fn backbuffer_count(&self) -> usize;

    /// 交换链当前的图像索引
    fn current_backbuffer_index(&self) -> usize;

    /// 当前客户区尺寸（可能为 0）
    fn client_size(&self) -> Extent2D;

    /// 后端读取的着色器二进制格式
    fn shader_blob_kind(&self) -> ShaderBlobKind;

    /// 没有着色器二进制时能否使用内置着色器
    fn has_builtin_shaders(&self) -> bool {
        false
    }

    /// 分配目标缓冲区和中转缓冲区，并录制一次复制
    ///
    /// 中转缓冲区由后端保留到 `finish_uploads` 完成。
    fn upload_buffer(&mut self, upload: &BufferUpload<'_>) -> Result<Self::Buffer>;

    /// 提交所有录制的复制，等待其 fence 完成并释放中转缓冲区
    fn finish_uploads(&mut self) -> Result<()>;

    /// 创建根签名和管线状态对象
    ///
    /// `shaders` 为 `None` 时使用内置着色器（仅当 `has_builtin_shaders` 为真）。
    fn create_pipeline(
        &mut self,
        desc: &PipelineDesc,
        shaders: Option<&ShaderBlobs>,
    ) -> Result<Self::Pipeline>;

    /// 创建深度缓冲区
    fn create_depth_buffer(&mut self, desc: &DepthBufferDesc) -> Result<Self::DepthBuffer>;

    /// 改变交换链尺寸，调用前队列必须已经 flush
    fn resize_swap_chain(&mut self, extent: Extent2D) -> Result<()>;

    /// 录制并提交一帧，返回提交后 signal 的 fence 值
    fn execute_frame(&mut self, frame: &FrameCommands<'_, Self>) -> Result<FenceValue>;

    /// 呈现，返回下一个交换链图像索引
    fn present(&mut self) -> Result<usize>;

    /// 切换垂直同步
    fn set_vsync(&mut self, vsync: bool);
}
