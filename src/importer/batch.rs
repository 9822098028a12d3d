// ==========================================
// 商品批量导入引擎 - 批次缓冲与分类
// ==========================================
// 职责: 缓冲 insert 的记录；flush 时把存活记录分为新建/更新
//       并合并属性写入（同一键后写覆盖）
// 红线: 不访问存储
// ==========================================

use crate::domain::{
    AttributeValueRow, CategoryLink, EntityId, EntityUpdate, ExistingEntity, NewEntity, Product,
    StoreId,
};
use std::collections::{BTreeSet, HashMap};

pub const MISSING_ATTRIBUTE_SET: &str = "missing attribute set";

// ==========================================
// BatchBuffer - 两次 flush 之间的记录缓冲
// ==========================================
#[derive(Debug, Default)]
pub struct BatchBuffer {
    records: Vec<Product>,
}

impl BatchBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, product: Product) {
        self.records.push(product);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 取出全部记录并清空缓冲
    pub fn take(&mut self) -> Vec<Product> {
        std::mem::take(&mut self.records)
    }
}

// ==========================================
// PendingRow - 校验并解析通过的记录
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRow {
    pub index: usize, // 在本批 records 中的位置
    pub sku: String,
    pub store_id: StoreId,
    pub attribute_set_id: Option<EntityId>,
    pub category_ids: Vec<EntityId>,
    pub values: Vec<(String, Option<String>)>, // (attribute_code, 标准化值)
}

/// 分类结果
#[derive(Debug, Default, PartialEq)]
pub struct Classification {
    /// 每个新 sku 一条（按首次出现顺序）
    pub creates: Vec<NewEntity>,
    /// 已存在且属性集变化的实体
    pub updates: Vec<EntityUpdate>,
    /// 已存在实体（sku → 实体）
    pub existing: HashMap<String, ExistingEntity>,
    /// 无法确定属性集的新 sku
    pub missing_attribute_set: BTreeSet<String>,
}

/// 按 sku 分类存活记录
///
/// # 参数
/// - rows: 存活记录（提交顺序）
/// - existing: find_existing 的结果
/// - default_attribute_set_id: 新商品未指定属性集时使用
///
/// # 规则
/// - 同一 sku 取最后一次指定的属性集
/// - 新 sku 无属性集且无默认值 → 记入 missing_attribute_set
/// - 已存在 sku 仅在属性集变化时更新
pub fn classify(
    rows: &[PendingRow],
    existing: &HashMap<String, ExistingEntity>,
    default_attribute_set_id: Option<EntityId>,
) -> Classification {
    let mut order: Vec<&str> = Vec::new();
    let mut last_set: HashMap<&str, Option<EntityId>> = HashMap::new();

    for row in rows {
        let slot = last_set.entry(row.sku.as_str()).or_insert_with(|| {
            order.push(row.sku.as_str());
            None
        });
        if row.attribute_set_id.is_some() {
            *slot = row.attribute_set_id;
        }
    }

    let mut result = Classification::default();

    for sku in order {
        let specified = last_set.get(sku).copied().flatten();

        match existing.get(sku) {
            Some(entity) => {
                if let Some(set_id) = specified {
                    if set_id != entity.attribute_set_id {
                        result.updates.push(EntityUpdate {
                            entity_id: entity.entity_id,
                            attribute_set_id: set_id,
                        });
                    }
                }
                result.existing.insert(sku.to_string(), *entity);
            }
            None => match specified.or(default_attribute_set_id) {
                Some(attribute_set_id) => result.creates.push(NewEntity {
                    sku: sku.to_string(),
                    attribute_set_id,
                }),
                None => {
                    result.missing_attribute_set.insert(sku.to_string());
                }
            },
        }
    }

    result
}

// ==========================================
// AttributeWrites - 属性写入合并
// ==========================================
// 键: (entity_id, attribute_code, store_id)；同键后写覆盖，保留首次出现位置
#[derive(Debug, Default)]
pub struct AttributeWrites {
    rows: Vec<AttributeValueRow>,
    positions: HashMap<(EntityId, String, StoreId), usize>,
}

impl AttributeWrites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, entity_id: EntityId, code: &str, store_id: StoreId, value: Option<String>) {
        let key = (entity_id, code.to_string(), store_id);
        match self.positions.get(&key) {
            Some(&pos) => self.rows[pos].value = value,
            None => {
                self.positions.insert(key, self.rows.len());
                self.rows.push(AttributeValueRow {
                    entity_id,
                    attribute_code: code.to_string(),
                    store_id,
                    value,
                });
            }
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<AttributeValueRow> {
        self.rows
    }
}

/// 去重后的分类关联（追加，不删除已有关联）
pub fn category_links(rows: &[(EntityId, &PendingRow)]) -> Vec<CategoryLink> {
    let links: BTreeSet<CategoryLink> = rows
        .iter()
        .flat_map(|(entity_id, row)| {
            row.category_ids.iter().map(move |category_id| CategoryLink {
                entity_id: *entity_id,
                category_id: *category_id,
            })
        })
        .collect();
    links.into_iter().collect()
}
