// ==========================================
// 商品批量导入引擎 - 目录存储 Trait
// ==========================================
// 职责: 定义导入引擎所需的批量数据访问接口（不包含实现）
// 红线: Repository 不含业务规则，只做数据 CRUD
// 约束: 每个方法 = 一次往返，调用次数与批量大小无关
// ==========================================

use crate::domain::{
    AttributeValueRow, CatalogMetadata, CategoryLink, EntityId, EntityUpdate, ExistingEntity,
    NewEntity, ReferenceKind,
};
use crate::repository::error::RepositoryResult;
use std::collections::{HashMap, HashSet};

// ==========================================
// CatalogStore Trait
// ==========================================
// 实现者: SqliteCatalogStore（使用 rusqlite）
pub trait CatalogStore {
    // ===== 元数据（工厂预热）=====

    /// 读取属性元数据（属性代码 → 存储类型）
    fn load_metadata(&self) -> RepositoryResult<CatalogMetadata>;

    /// 读取某类引用的全部 名称 → ID（用于预热小表，如 store view / 属性集）
    fn load_all_references(&self, kind: ReferenceKind) -> RepositoryResult<HashMap<String, EntityId>>;

    // ===== 引用解析 =====

    /// 批量按名称查询 ID
    ///
    /// # 返回
    /// - 仅包含找到的名称；同名多条时取最小 ID
    fn lookup_references(
        &self,
        kind: ReferenceKind,
        names: &[String],
    ) -> RepositoryResult<HashMap<String, EntityId>>;

    /// 批量校验调用方直接给出的 ID
    ///
    /// # 返回
    /// - 存在的 ID 集合；不存在的 ID 不出现
    fn find_reference_ids(
        &self,
        kind: ReferenceKind,
        ids: &[EntityId],
    ) -> RepositoryResult<HashSet<EntityId>>;

    // ===== 分类（新建/更新）=====

    /// 批量检查 sku 是否已存在
    ///
    /// # 返回
    /// - sku → 已存在实体；不存在的 sku 不出现
    fn find_existing(&self, skus: &[String]) -> RepositoryResult<HashMap<String, ExistingEntity>>;

    // ===== 批量写入（事务化）=====

    /// 批量创建实体
    ///
    /// # 返回
    /// - 生成的实体 ID，顺序与输入一致
    fn create_entities(&self, entities: &[NewEntity]) -> RepositoryResult<Vec<EntityId>>;

    /// 批量更新实体（属性集）
    fn update_entities(&self, updates: &[EntityUpdate]) -> RepositoryResult<usize>;

    /// 批量写入属性值（每行自带作用域；value = None 时删除该作用域的值）
    fn write_attribute_values(&self, rows: &[AttributeValueRow]) -> RepositoryResult<usize>;

    /// 批量写入分类关联（已存在的关联保持不变）
    fn link_categories(&self, links: &[CategoryLink]) -> RepositoryResult<usize>;
}
