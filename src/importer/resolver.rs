// ==========================================
// 商品批量导入引擎 - 引用解析器
// ==========================================
// 职责: 名称 → ID 缓存（属性集/税类/分类/店铺视图）
// 协议: 两阶段: request() 登记名称/ID，resolve_pending() 每类一次批量查询
// 红线: 缓存只追加，不在任务中途失效；未找到的名称/ID 同样缓存
// ==========================================

use crate::domain::{EntityId, Reference, ReferenceKind};
use crate::importer::error::ResolveError;
use crate::repository::{CatalogStore, RepositoryResult};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Default)]
pub struct ReferenceResolver {
    // kind → (name → Some(id) | None=不存在)
    caches: HashMap<ReferenceKind, HashMap<String, Option<EntityId>>>,
    // 已整表加载的类型：缓存未命中即视为不存在
    complete: HashSet<ReferenceKind>,
    // kind → (id → 是否存在)
    known_ids: HashMap<ReferenceKind, HashMap<EntityId, bool>>,
    // 待解析名称（按类型，去重）
    pending: BTreeMap<ReferenceKind, BTreeSet<String>>,
    // 待校验 ID（按类型，去重）
    pending_ids: BTreeMap<ReferenceKind, BTreeSet<EntityId>>,
    // 已发出的批量查询次数
    lookups: usize,
}

impl ReferenceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// 整表预热（用于小表：店铺视图、属性集）
    ///
    /// # 返回
    /// - 加载的条目数
    pub fn prewarm<S: CatalogStore + ?Sized>(
        &mut self,
        store: &S,
        kind: ReferenceKind,
    ) -> RepositoryResult<usize> {
        let all = store.load_all_references(kind)?;
        let count = all.len();

        let cache = self.caches.entry(kind).or_default();
        let known = self.known_ids.entry(kind).or_default();
        for (name, id) in all {
            known.insert(id, true);
            cache.entry(name).or_insert(Some(id));
        }
        self.complete.insert(kind);

        debug!(kind = %kind, count, "引用缓存预热完成");
        Ok(count)
    }

    /// 登记一个待解析名称（已缓存或已整表加载的类型不会登记）
    pub fn request(&mut self, kind: ReferenceKind, name: &str) {
        let name = name.trim();
        if self.complete.contains(&kind) || self.is_cached(kind, name) {
            return;
        }
        self.pending.entry(kind).or_default().insert(name.to_string());
    }

    /// 登记一个待校验 ID（已知或已整表加载的类型不会登记）
    pub fn request_id(&mut self, kind: ReferenceKind, id: EntityId) {
        let known = self
            .known_ids
            .get(&kind)
            .map(|k| k.contains_key(&id))
            .unwrap_or(false);
        if self.complete.contains(&kind) || known {
            return;
        }
        self.pending_ids.entry(kind).or_default().insert(id);
    }

    /// 登记引用（名称待解析，ID 待校验存在性）
    pub fn request_reference(&mut self, kind: ReferenceKind, reference: &Reference) {
        match reference {
            Reference::Id(id) => self.request_id(kind, *id),
            Reference::Name(name) => self.request(kind, name),
        }
    }

    /// 对所有待解析名称/待校验 ID 执行批量查询（每类名称、ID 各至多一次）
    pub fn resolve_pending<S: CatalogStore + ?Sized>(&mut self, store: &S) -> RepositoryResult<()> {
        let pending = std::mem::take(&mut self.pending);
        let pending_ids = std::mem::take(&mut self.pending_ids);

        for (kind, names) in pending {
            let names: Vec<String> = names.into_iter().collect();
            let found = store.lookup_references(kind, &names)?;
            self.lookups += 1;

            debug!(
                kind = %kind,
                requested = names.len(),
                found = found.len(),
                "引用批量解析完成"
            );

            let cache = self.caches.entry(kind).or_default();
            let known = self.known_ids.entry(kind).or_default();
            for name in names {
                let id = found.get(&name).copied();
                if let Some(id) = id {
                    known.insert(id, true);
                }
                // 先解析者胜出
                cache.entry(name).or_insert(id);
            }
        }

        for (kind, ids) in pending_ids {
            let ids: Vec<EntityId> = ids.into_iter().collect();
            let found = store.find_reference_ids(kind, &ids)?;
            self.lookups += 1;

            debug!(
                kind = %kind,
                requested = ids.len(),
                found = found.len(),
                "引用 ID 批量校验完成"
            );

            let known = self.known_ids.entry(kind).or_default();
            for id in ids {
                known.entry(id).or_insert(found.contains(&id));
            }
        }

        Ok(())
    }

    /// 查询缓存（不访问存储）
    pub fn lookup(&self, kind: ReferenceKind, name: &str) -> Result<EntityId, ResolveError> {
        let name = name.trim();
        match self.caches.get(&kind).and_then(|c| c.get(name)) {
            Some(Some(id)) => Ok(*id),
            _ => Err(ResolveError::NotFound {
                kind,
                name: name.to_string(),
            }),
        }
    }

    /// 查询 ID 校验结果（不访问存储）
    pub fn lookup_id(&self, kind: ReferenceKind, id: EntityId) -> Result<EntityId, ResolveError> {
        match self.known_ids.get(&kind).and_then(|k| k.get(&id)) {
            Some(&true) => Ok(id),
            _ => Err(ResolveError::IdNotFound { kind, id }),
        }
    }

    /// 解析引用（Id 需已通过存在性校验）
    pub fn lookup_reference(
        &self,
        kind: ReferenceKind,
        reference: &Reference,
    ) -> Result<EntityId, ResolveError> {
        match reference {
            Reference::Id(id) => self.lookup_id(kind, *id),
            Reference::Name(name) => self.lookup(kind, name),
        }
    }

    /// 单个名称解析：缓存命中不访问存储
    pub fn resolve<S: CatalogStore + ?Sized>(
        &mut self,
        store: &S,
        kind: ReferenceKind,
        name: &str,
    ) -> Result<EntityId, ResolveError> {
        self.request(kind, name);
        self.resolve_pending(store)?;
        self.lookup(kind, name)
    }

    fn is_cached(&self, kind: ReferenceKind, name: &str) -> bool {
        self.caches
            .get(&kind)
            .map(|c| c.contains_key(name))
            .unwrap_or(false)
    }

    /// 已发出的批量查询次数
    pub fn lookup_count(&self) -> usize {
        self.lookups
    }

    /// 某类引用的缓存条目数（含“不存在”条目）
    pub fn cached_len(&self, kind: ReferenceKind) -> usize {
        self.caches.get(&kind).map(HashMap::len).unwrap_or(0)
    }
}
