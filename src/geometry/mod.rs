/// 几何体加载和处理模块
///
/// # 模块结构
///
/// - `vertex`: 顶点结构与输入布局
/// - `mesh`: CPU 侧网格数据和子网格
/// - `loaders`: FBX / OBJ 加载器
///
/// # 数据流
///
/// ```text
/// 文件 (FBX/OBJ)
///     ↓
/// Loader (FbxLoader/ObjLoader)
///     ↓
/// MeshData (CPU侧数据，32 位索引)
///     ↓
/// Vec<Vertex> + Vec<u16>  →  渲染器上传到GPU
/// ```

pub mod loaders;
pub mod mesh;
pub mod vertex;

// 重新导出常用类型
pub use loaders::{load_mesh, MeshLoader};
pub use mesh::{MeshData, Subset};
pub use vertex::Vertex;
