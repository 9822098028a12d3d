// ==========================================
// 商品批量导入引擎 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 约定: 行级错误只写入 Product，不走 Result
// ==========================================

use crate::config::ConfigError;
use crate::domain::{EntityId, ReferenceKind};
use crate::repository::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型（仅构建期与存储层致命错误）
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 配置错误（工厂构建时）=====
    #[error("导入配置错误: {0}")]
    Config(#[from] ConfigError),

    // ===== 存储错误（flush 致命）=====
    #[error("存储层失败: {0}")]
    Store(#[from] RepositoryError),

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

/// 引用解析错误
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("{} not found: {}", .kind.label(), .name)]
    NotFound { kind: ReferenceKind, name: String },

    #[error("{} not found: {}", .kind.id_label(), .id)]
    IdNotFound { kind: ReferenceKind, id: EntityId },

    #[error("引用查询失败: {0}")]
    Store(#[from] RepositoryError),
}
