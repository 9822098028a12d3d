// ==========================================
// 商品批量导入引擎 - 目录存储数据结构
// ==========================================
// 职责: 引擎与 CatalogStore 之间交换的行结构
// ==========================================

use crate::domain::types::{BackendType, EntityId, StoreId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// ==========================================
// CatalogMetadata - 目录元数据（工厂预热）
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct CatalogMetadata {
    pub attributes: HashMap<String, AttributeMeta>, // attribute_code → 元数据
}

impl CatalogMetadata {
    pub fn attribute(&self, code: &str) -> Option<&AttributeMeta> {
        self.attributes.get(code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeMeta {
    pub attribute_code: String,
    pub backend_type: BackendType,
}

/// 已存在实体（分类阶段查询结果）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExistingEntity {
    pub entity_id: EntityId,
    pub attribute_set_id: EntityId,
}

/// 待创建实体
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntity {
    pub sku: String,
    pub attribute_set_id: EntityId,
}

/// 待更新实体（属性集变更）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityUpdate {
    pub entity_id: EntityId,
    pub attribute_set_id: EntityId,
}

// ==========================================
// AttributeValueRow - 属性值行
// ==========================================
// 主键: (entity_id, attribute_code, store_id)
// value = None: 删除该作用域的值
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeValueRow {
    pub entity_id: EntityId,
    pub attribute_code: String,
    pub store_id: StoreId,
    pub value: Option<String>,
}

/// 分类关联
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CategoryLink {
    pub entity_id: EntityId,
    pub category_id: EntityId,
}

// ==========================================
// StoredProduct - 核对用读取结果
// ==========================================
// 作用域值优先，缺失时回落到全局值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredProduct {
    pub entity_id: EntityId,
    pub sku: String,
    pub attribute_set_id: EntityId,
    pub attributes: BTreeMap<String, String>,
    pub category_ids: Vec<EntityId>,
}

impl StoredProduct {
    pub fn attribute(&self, code: &str) -> Option<&str> {
        self.attributes.get(code).map(String::as_str)
    }
}
