// ==========================================
// 商品批量导入引擎 - 导入层
// ==========================================
// 职责: insert/flush 批处理、引用解析、记录校验、结果回调
// 流程: 校验 → 解析 → 分类 → 批量写入 → 回调
// ==========================================

// 模块声明
pub mod batch;
pub mod error;
pub mod factory;
#[allow(clippy::module_inception)]
pub mod importer;
pub mod resolver;
pub mod sinks;
pub mod validator;

// 重导出核心类型
pub use crate::config::ConfigError;
pub use batch::BatchBuffer;
pub use error::{ImportError, ImportResult, ResolveError};
pub use factory::ImporterFactory;
pub use importer::{FlushSummary, Importer};
pub use resolver::ReferenceResolver;
pub use sinks::ProductOutcome;
pub use validator::RecordValidator;
