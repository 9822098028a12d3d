// ==========================================
// 商品批量导入引擎 - 内存目录存储
// ==========================================
// 用途: 测试替身（往返计数 + 故障注入），不做持久化
// 可见性: 仅 cfg(test) 或 feature = "test-util"
// ==========================================

use crate::domain::{
    AttributeMeta, AttributeValueRow, BackendType, CatalogMetadata, CategoryLink, EntityId,
    EntityUpdate, ExistingEntity, NewEntity, ReferenceKind, StoreId, GLOBAL_STORE_CODE,
    GLOBAL_STORE_ID,
};
use crate::repository::catalog_store::CatalogStore;
use crate::repository::error::{RepositoryError, RepositoryResult};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct MemoryState {
    references: HashMap<ReferenceKind, Vec<(String, EntityId)>>,
    attributes: HashMap<String, BackendType>,
    entities: BTreeMap<String, ExistingEntity>,
    next_entity_id: EntityId,
    values: BTreeMap<(EntityId, String, StoreId), String>,
    categories: BTreeSet<(EntityId, EntityId)>,
    calls: BTreeMap<&'static str, usize>,
    fail_on: Option<&'static str>,
}

// ==========================================
// MemoryCatalogStore
// ==========================================
// 每个 CatalogStore 方法调用计为一次往返（按方法名统计）
pub struct MemoryCatalogStore {
    state: Mutex<MemoryState>,
}

impl Default for MemoryCatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCatalogStore {
    /// 创建空存储（仅含 admin 作用域）
    pub fn new() -> Self {
        let mut state = MemoryState {
            next_entity_id: 1,
            ..Default::default()
        };
        state.references.insert(
            ReferenceKind::StoreView,
            vec![(GLOBAL_STORE_CODE.to_string(), GLOBAL_STORE_ID)],
        );
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 记录一次调用；命中故障注入时返回错误
    fn enter(&self, op: &'static str) -> RepositoryResult<MutexGuard<'_, MemoryState>> {
        let mut state = self.lock()?;
        *state.calls.entry(op).or_insert(0) += 1;
        if state.fail_on == Some(op) {
            return Err(RepositoryError::DatabaseConnectionError(format!(
                "injected failure in {op}"
            )));
        }
        Ok(state)
    }

    // ===== 构建方法 =====

    pub fn with_reference(self, kind: ReferenceKind, name: &str, id: EntityId) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state
                .references
                .entry(kind)
                .or_default()
                .push((name.to_string(), id));
        }
        self
    }

    pub fn with_attribute(self, code: &str, backend_type: BackendType) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.attributes.insert(code.to_string(), backend_type);
        }
        self
    }

    /// 常用目录数据：admin/default 作用域、Default 属性集、常用属性
    pub fn with_catalog_defaults(self) -> Self {
        self.with_reference(ReferenceKind::StoreView, "default", 1)
            .with_reference(ReferenceKind::AttributeSet, "Default", 4)
            .with_reference(ReferenceKind::TaxClass, "Taxable Goods", 2)
            .with_attribute("name", BackendType::Varchar)
            .with_attribute("price", BackendType::Decimal)
            .with_attribute("special_price", BackendType::Decimal)
            .with_attribute("special_from_date", BackendType::Datetime)
            .with_attribute("status", BackendType::Int)
            .with_attribute("visibility", BackendType::Int)
            .with_attribute("tax_class_id", BackendType::Int)
            .with_attribute("color", BackendType::Int)
    }

    /// 让指定方法返回存储错误（如 "write_attribute_values"）
    pub fn fail_on(&self, op: &'static str) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_on = Some(op);
        }
    }

    // ===== 观察方法 =====

    /// 指定方法的调用次数
    pub fn calls(&self, op: &str) -> usize {
        self.state
            .lock()
            .map(|s| s.calls.get(op).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// 全部方法调用次数之和
    pub fn total_calls(&self) -> usize {
        self.state
            .lock()
            .map(|s| s.calls.values().sum())
            .unwrap_or(0)
    }

    pub fn reset_calls(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.calls.clear();
        }
    }

    pub fn entity(&self, sku: &str) -> Option<ExistingEntity> {
        self.state.lock().ok()?.entities.get(sku).copied()
    }

    pub fn entity_count(&self) -> usize {
        self.state.lock().map(|s| s.entities.len()).unwrap_or(0)
    }

    /// 读取某作用域的原始值（不回落）
    pub fn value(&self, sku: &str, code: &str, store_id: StoreId) -> Option<String> {
        let state = self.state.lock().ok()?;
        let entity = state.entities.get(sku)?;
        state
            .values
            .get(&(entity.entity_id, code.to_string(), store_id))
            .cloned()
    }

    pub fn category_ids(&self, sku: &str) -> Vec<EntityId> {
        let Ok(state) = self.state.lock() else {
            return Vec::new();
        };
        let Some(entity) = state.entities.get(sku) else {
            return Vec::new();
        };
        state
            .categories
            .iter()
            .filter(|(entity_id, _)| *entity_id == entity.entity_id)
            .map(|(_, category_id)| *category_id)
            .collect()
    }
}

impl CatalogStore for MemoryCatalogStore {
    fn load_metadata(&self) -> RepositoryResult<CatalogMetadata> {
        let state = self.enter("load_metadata")?;
        let attributes = state
            .attributes
            .iter()
            .map(|(code, backend_type)| {
                (
                    code.clone(),
                    AttributeMeta {
                        attribute_code: code.clone(),
                        backend_type: *backend_type,
                    },
                )
            })
            .collect();
        Ok(CatalogMetadata { attributes })
    }

    fn load_all_references(&self, kind: ReferenceKind) -> RepositoryResult<HashMap<String, EntityId>> {
        let state = self.enter("load_all_references")?;
        let mut map: HashMap<String, EntityId> = HashMap::new();
        for (name, id) in state.references.get(&kind).into_iter().flatten() {
            let entry = map.entry(name.clone()).or_insert(*id);
            *entry = (*entry).min(*id);
        }
        Ok(map)
    }

    fn lookup_references(
        &self,
        kind: ReferenceKind,
        names: &[String],
    ) -> RepositoryResult<HashMap<String, EntityId>> {
        let state = self.enter("lookup_references")?;
        let wanted: BTreeSet<&String> = names.iter().collect();
        let mut map: HashMap<String, EntityId> = HashMap::new();
        for (name, id) in state.references.get(&kind).into_iter().flatten() {
            if wanted.contains(name) {
                let entry = map.entry(name.clone()).or_insert(*id);
                *entry = (*entry).min(*id);
            }
        }
        Ok(map)
    }

    fn find_reference_ids(
        &self,
        kind: ReferenceKind,
        ids: &[EntityId],
    ) -> RepositoryResult<HashSet<EntityId>> {
        let state = self.enter("find_reference_ids")?;
        let wanted: HashSet<EntityId> = ids.iter().copied().collect();
        Ok(state
            .references
            .get(&kind)
            .into_iter()
            .flatten()
            .map(|(_, id)| *id)
            .filter(|id| wanted.contains(id))
            .collect())
    }

    fn find_existing(&self, skus: &[String]) -> RepositoryResult<HashMap<String, ExistingEntity>> {
        let state = self.enter("find_existing")?;
        Ok(skus
            .iter()
            .filter_map(|sku| state.entities.get(sku).map(|e| (sku.clone(), *e)))
            .collect())
    }

    fn create_entities(&self, entities: &[NewEntity]) -> RepositoryResult<Vec<EntityId>> {
        let mut state = self.enter("create_entities")?;
        if let Some(dup) = entities.iter().find(|e| state.entities.contains_key(&e.sku)) {
            return Err(RepositoryError::UniqueConstraintViolation(format!(
                "product_entity.sku = {}",
                dup.sku
            )));
        }

        let mut ids = Vec::with_capacity(entities.len());
        for entity in entities {
            let entity_id = state.next_entity_id;
            state.next_entity_id += 1;
            state.entities.insert(
                entity.sku.clone(),
                ExistingEntity {
                    entity_id,
                    attribute_set_id: entity.attribute_set_id,
                },
            );
            ids.push(entity_id);
        }
        Ok(ids)
    }

    fn update_entities(&self, updates: &[EntityUpdate]) -> RepositoryResult<usize> {
        let mut state = self.enter("update_entities")?;
        let mut count = 0;
        for update in updates {
            for entity in state.entities.values_mut() {
                if entity.entity_id == update.entity_id {
                    entity.attribute_set_id = update.attribute_set_id;
                    count += 1;
                }
            }
        }
        Ok(count)
    }

    fn write_attribute_values(&self, rows: &[AttributeValueRow]) -> RepositoryResult<usize> {
        let mut state = self.enter("write_attribute_values")?;
        for row in rows {
            let key = (row.entity_id, row.attribute_code.clone(), row.store_id);
            match &row.value {
                Some(value) => {
                    state.values.insert(key, value.clone());
                }
                None => {
                    state.values.remove(&key);
                }
            }
        }
        Ok(rows.len())
    }

    fn link_categories(&self, links: &[CategoryLink]) -> RepositoryResult<usize> {
        let mut state = self.enter("link_categories")?;
        let mut count = 0;
        for link in links {
            if state.categories.insert((link.entity_id, link.category_id)) {
                count += 1;
            }
        }
        Ok(count)
    }
}
