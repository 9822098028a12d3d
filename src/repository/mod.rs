// ==========================================
// 商品批量导入引擎 - 数据仓储层
// ==========================================
// 红线: Repository 不含导入流程逻辑
// ==========================================
// 职责: 提供目录存储接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod catalog_store;
pub mod catalog_store_impl;
pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod memory_store;

// 重导出核心仓储
pub use catalog_store::CatalogStore;
pub use catalog_store_impl::SqliteCatalogStore;
pub use error::{RepositoryError, RepositoryResult};
#[cfg(any(test, feature = "test-util"))]
pub use memory_store::MemoryCatalogStore;
