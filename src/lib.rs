// ==========================================
// 商品批量导入引擎 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 批量写入商品目录（部分失败不中断批次）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 商品记录与目录行
pub mod domain;

// 数据仓储层 - 目录存储
/// 内存替身 `MemoryCatalogStore` 仅在 `test-util` 特性下暴露，且不在根路径导出
///
/// ```compile_fail
/// use catalog_import::MemoryCatalogStore;
/// ```
pub mod repository;

// 导入层 - insert/flush 批处理
pub mod importer;

// 配置层 - 导入选项与回调
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/建表）
pub mod db;

// 性能统计
pub mod perf;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

pub use config::{ConfigError, ImportConfig, ImportOptions};
pub use domain::{
    AttributeValue, BackendType, EntityId, Product, ProductStatus, Reference, ReferenceKind,
    References, Visibility,
};
pub use importer::{FlushSummary, ImportError, ImportResult, Importer, ImporterFactory};
pub use repository::{CatalogStore, RepositoryError, SqliteCatalogStore};

// ==========================================
// 常量定义
// ==========================================

// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
