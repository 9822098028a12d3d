// ==========================================
// 商品批量导入引擎 - 领域模型层
// ==========================================
// 职责: 定义商品记录、引用、目录行结构
// 红线: 不含数据访问逻辑,不含导入流程逻辑
// ==========================================

pub mod catalog;
pub mod product;
pub mod types;

// 重导出核心类型
pub use catalog::{
    AttributeMeta, AttributeValueRow, CatalogMetadata, CategoryLink, EntityUpdate,
    ExistingEntity, NewEntity, StoredProduct,
};
pub use product::{AttributeValue, Product, Reference, References};
pub use types::{
    BackendType, EntityId, ProductStatus, ReferenceKind, StoreId, Visibility, GLOBAL_STORE_CODE,
    GLOBAL_STORE_ID,
};
