// ==========================================
// 商品批量导入引擎 - 配置层
// ==========================================
// 职责: 导入选项与结果回调
// ==========================================

pub mod error;
pub mod import_config;

// 重导出核心配置
pub use error::ConfigError;
pub use import_config::{ImportConfig, ImportOptions, ResultCallback, DEFAULT_ATTRIBUTE_SET_NAME};
