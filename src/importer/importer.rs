// ==========================================
// 商品批量导入引擎 - 导入器
// ==========================================
// 职责: insert 缓冲 + flush 批处理
// 流程: 校验 → 引用解析 → 分类 → 批量写入 → 回调
// 红线: 行级错误不影响 flush 结果；存储错误使 flush 失败，
//       但所有记录仍按提交顺序交给回调
// ==========================================

use crate::config::ImportConfig;
use crate::domain::{AttributeValue, CatalogMetadata, EntityId, Product, ReferenceKind};
use crate::importer::batch::{
    category_links, classify, AttributeWrites, BatchBuffer, PendingRow, MISSING_ATTRIBUTE_SET,
};
use crate::importer::error::{ImportResult, ResolveError};
use crate::importer::resolver::ReferenceResolver;
use crate::importer::validator::RecordValidator;
use crate::perf::PerfGuard;
use crate::repository::{CatalogStore, RepositoryError, RepositoryResult};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// 税类写入的属性代码
const TAX_CLASS_ATTRIBUTE: &str = "tax_class_id";

/// 单次 flush 的统计结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlushSummary {
    pub batch_id: String,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub created: usize, // 新建实体数
}

// ==========================================
// Importer
// ==========================================
pub struct Importer<S: CatalogStore> {
    store: Arc<S>,
    config: ImportConfig,
    metadata: CatalogMetadata,
    resolver: ReferenceResolver,
    default_attribute_set_id: Option<EntityId>,
    buffer: BatchBuffer,
}

impl<S: CatalogStore> Importer<S> {
    /// 由 ImporterFactory 调用
    pub(crate) fn new(
        store: Arc<S>,
        config: ImportConfig,
        metadata: CatalogMetadata,
        resolver: ReferenceResolver,
        default_attribute_set_id: Option<EntityId>,
    ) -> Self {
        Self {
            store,
            config,
            metadata,
            resolver,
            default_attribute_set_id,
            buffer: BatchBuffer::new(),
        }
    }

    /// 缓冲一条记录（不访问存储）
    pub fn insert(&mut self, product: Product) {
        self.buffer.push(product);
    }

    /// 当前缓冲的记录数
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    pub fn resolver(&self) -> &ReferenceResolver {
        &self.resolver
    }

    /// 处理全部缓冲记录
    ///
    /// # 返回
    /// - Ok(FlushSummary): 全部记录已回调（可能含行级失败）
    /// - Err(ImportError::Store): 存储失败；未完成记录以
    ///   "persistence failure: ..." 回调后返回
    #[instrument(skip_all, fields(batch_id = tracing::field::Empty))]
    pub fn flush(&mut self) -> ImportResult<FlushSummary> {
        let batch_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("batch_id", batch_id.as_str());

        let mut records = self.buffer.take();
        if records.is_empty() {
            debug!("缓冲为空，跳过 flush");
            return Ok(FlushSummary {
                batch_id,
                ..Default::default()
            });
        }

        let _perf = PerfGuard::new("flush", records.len());
        info!(total = records.len(), "开始 flush");

        let outcome = self.process(&mut records);
        if let Err(e) = &outcome {
            error!(error = %e, "存储层失败，未完成记录标记为失败");
            let message = format!("persistence failure: {}", e);
            for product in records.iter_mut().filter(|p| !p.has_errors()) {
                product.add_error(message.clone());
            }
        }

        let created = outcome.as_ref().copied().unwrap_or(0);
        let summary = self.finalize(records, batch_id, created);
        outcome?;

        Ok(summary)
    }

    /// 校验/解析/分类/写入；返回新建实体数
    fn process(&mut self, records: &mut [Product]) -> RepositoryResult<usize> {
        let store = Arc::clone(&self.store);
        let validator = RecordValidator::new(&self.metadata);

        // === 步骤 1: 记录校验 + 登记引用 ===
        debug!("步骤 1: 记录校验");
        let mut validated: Vec<(usize, String, Vec<(String, Option<String>)>)> = Vec::new();
        for (index, product) in records.iter_mut().enumerate() {
            let sku = match validator.validate_sku(&product.sku) {
                Ok(sku) => Some(sku),
                Err(message) => {
                    product.add_error(message);
                    None
                }
            };

            let mut values = Vec::new();
            for (code, value) in product.attribute_values() {
                if !self.config.syncs_attribute(&code) {
                    continue;
                }
                match validator.normalize(&code, &value) {
                    Ok(normalized) => values.push((code, normalized)),
                    Err(message) => product.add_error(message),
                }
            }

            let Some(sku) = sku.filter(|_| !product.has_errors()) else {
                warn!(line_number = ?product.line_number, sku = %product.sku, errors = ?product.errors(), "记录校验失败");
                continue;
            };

            self.resolver
                .request(ReferenceKind::StoreView, product.store_view_code());
            if let Some(reference) = &product.attribute_set {
                self.resolver
                    .request_reference(ReferenceKind::AttributeSet, reference);
            }
            if let Some(reference) = &product.tax_class {
                self.resolver.request_reference(ReferenceKind::TaxClass, reference);
            }
            for reference in product.categories.iter().flat_map(|c| c.iter()) {
                self.resolver.request_reference(ReferenceKind::Category, reference);
            }

            validated.push((index, sku, values));
        }
        info!(valid = validated.len(), failed = records.len() - validated.len(), "记录校验完成");

        // === 步骤 2: 引用批量解析（每类至多一次查询）===
        debug!("步骤 2: 引用解析");
        self.resolver.resolve_pending(store.as_ref())?;

        let mut rows: Vec<PendingRow> = Vec::with_capacity(validated.len());
        for (index, sku, mut values) in validated {
            let product = &mut records[index];
            let mut errors = Vec::new();

            let store_id = collect_error(
                self.resolver
                    .lookup(ReferenceKind::StoreView, product.store_view_code()),
                &mut errors,
            );
            let attribute_set_id = product.attribute_set.as_ref().and_then(|r| {
                collect_error(
                    self.resolver.lookup_reference(ReferenceKind::AttributeSet, r),
                    &mut errors,
                )
            });
            let tax_class_id = product.tax_class.as_ref().and_then(|r| {
                collect_error(
                    self.resolver.lookup_reference(ReferenceKind::TaxClass, r),
                    &mut errors,
                )
            });
            let mut category_ids = Vec::new();
            for reference in product.categories.iter().flat_map(|c| c.iter()) {
                if let Some(id) = collect_error(
                    self.resolver.lookup_reference(ReferenceKind::Category, reference),
                    &mut errors,
                ) {
                    category_ids.push(id);
                }
            }

            if let Some(tax_class_id) = tax_class_id {
                if self.config.syncs_attribute(TAX_CLASS_ATTRIBUTE) {
                    match validator.normalize(TAX_CLASS_ATTRIBUTE, &AttributeValue::Int(tax_class_id)) {
                        Ok(value) => values.push((TAX_CLASS_ATTRIBUTE.to_string(), value)),
                        Err(message) => errors.push(message),
                    }
                }
            }

            let Some(store_id) = store_id.filter(|_| errors.is_empty()) else {
                for message in errors {
                    product.add_error(message);
                }
                warn!(line_number = ?product.line_number, sku = %sku, errors = ?product.errors(), "引用解析失败");
                continue;
            };

            rows.push(PendingRow {
                index,
                sku,
                store_id,
                attribute_set_id,
                category_ids,
                values,
            });
        }
        info!(resolved = rows.len(), lookups = self.resolver.lookup_count(), "引用解析完成");

        if rows.is_empty() {
            return Ok(0);
        }

        // === 步骤 3: 分类（一次存在性查询）===
        debug!("步骤 3: 新建/更新分类");
        let skus: Vec<String> = rows
            .iter()
            .map(|r| r.sku.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let existing = store.find_existing(&skus)?;
        let classification = classify(&rows, &existing, self.default_attribute_set_id);

        if !classification.missing_attribute_set.is_empty() {
            for row in &rows {
                if classification.missing_attribute_set.contains(&row.sku) {
                    let product = &mut records[row.index];
                    product.add_error(MISSING_ATTRIBUTE_SET);
                    warn!(line_number = ?product.line_number, sku = %row.sku, "缺少属性集");
                }
            }
            rows.retain(|r| !classification.missing_attribute_set.contains(&r.sku));
        }
        info!(
            create = classification.creates.len(),
            update = classification.existing.len(),
            "分类完成"
        );

        // === 步骤 4: 批量写入 ===
        debug!("步骤 4: 批量写入");
        let mut entity_ids: HashMap<String, EntityId> = classification
            .existing
            .iter()
            .map(|(sku, entity)| (sku.clone(), entity.entity_id))
            .collect();

        if !classification.creates.is_empty() {
            let ids = store.create_entities(&classification.creates)?;
            if ids.len() != classification.creates.len() {
                return Err(RepositoryError::Other(anyhow::anyhow!(
                    "create_entities returned {} ids for {} entities",
                    ids.len(),
                    classification.creates.len()
                )));
            }
            for (entity, id) in classification.creates.iter().zip(ids) {
                entity_ids.insert(entity.sku.clone(), id);
            }
        }

        for row in &rows {
            if let Some(id) = entity_ids.get(&row.sku) {
                records[row.index].assign_id(*id);
            }
        }

        if !classification.updates.is_empty() {
            store.update_entities(&classification.updates)?;
        }

        let mut writes = AttributeWrites::new();
        let mut linked: Vec<(EntityId, &PendingRow)> = Vec::with_capacity(rows.len());
        for row in &rows {
            let Some(&entity_id) = entity_ids.get(&row.sku) else {
                continue;
            };
            for (code, value) in &row.values {
                writes.set(entity_id, code, row.store_id, value.clone());
            }
            linked.push((entity_id, row));
        }

        let value_count = writes.len();
        if !writes.is_empty() {
            store.write_attribute_values(&writes.into_rows())?;
        }

        let links = category_links(&linked);
        if !links.is_empty() {
            store.link_categories(&links)?;
        }

        info!(
            created = classification.creates.len(),
            updated = classification.updates.len(),
            values = value_count,
            links = links.len(),
            "批量写入完成"
        );

        Ok(classification.creates.len())
    }

    /// 按提交顺序写入结果并调用回调；回调后记录即被丢弃
    fn finalize(&mut self, records: Vec<Product>, batch_id: String, created: usize) -> FlushSummary {
        let mut summary = FlushSummary {
            batch_id,
            total: records.len(),
            created,
            ..Default::default()
        };

        for mut product in records {
            product.finalize();
            if product.ok() {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
            for callback in self.config.callbacks.iter_mut() {
                callback(&product);
            }
        }

        info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "flush 完成"
        );
        summary
    }
}

fn collect_error<T>(result: Result<T, ResolveError>, errors: &mut Vec<String>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            errors.push(e.to_string());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ImportConfig;
    use crate::domain::{
        AttributeValue, Product, ProductStatus, Reference, ReferenceKind, References,
    };
    use crate::importer::ImporterFactory;
    use crate::repository::MemoryCatalogStore;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    fn store() -> Arc<MemoryCatalogStore> {
        Arc::new(
            MemoryCatalogStore::new()
                .with_catalog_defaults()
                .with_reference(ReferenceKind::TaxClass, "Retail Customer", 3)
                .with_reference(ReferenceKind::Category, "Boxes", 20)
                .with_reference(ReferenceKind::Category, "Bags", 21)
                .with_reference(ReferenceKind::AttributeSet, "Bags", 9),
        )
    }

    fn recorder() -> (Rc<RefCell<Vec<String>>>, ImportConfig) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let config = ImportConfig::new().add_callback(move |p: &Product| {
            let line = match p.error() {
                None => format!("{}: ok {}", p.sku, p.id().unwrap_or_default()),
                Some(e) => format!("{}: {}", p.sku, e),
            };
            sink.borrow_mut().push(line);
        });
        (log, config)
    }

    #[test]
    fn test_partial_failure_keeps_order() {
        let store = store();
        let (log, config) = recorder();
        let mut importer = ImporterFactory::new(Arc::clone(&store)).create(config).unwrap();

        importer.insert(Product::new("a").with_name("A"));
        importer.insert(Product::new("").with_name("no sku"));
        importer.insert(Product::new("b").with_price("abc"));
        importer.insert(Product::new("c").with_tax_class("Nope"));
        importer.insert(Product::new("d").with_name("D"));

        let summary = importer.flush().unwrap();

        assert_eq!(summary.total, 5);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 3);
        assert_eq!(
            *log.borrow(),
            vec![
                "a: ok 1".to_string(),
                ": missing sku".to_string(),
                "b: price is not a decimal number: 'abc'".to_string(),
                "c: tax class name not found: Nope".to_string(),
                "d: ok 2".to_string(),
            ]
        );
        assert_eq!(importer.buffered(), 0);
    }

    #[test]
    fn test_upsert_keeps_id() {
        let store = store();
        let reported = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&reported);
        let config = ImportConfig::new().add_callback(move |p: &Product| {
            sink.borrow_mut().push(p.id());
        });
        let mut importer = ImporterFactory::new(Arc::clone(&store)).create(config).unwrap();

        importer.insert(Product::new("sku-1").with_name("Big Blue Box"));
        importer.flush().unwrap();
        let first = store.entity("sku-1").unwrap();

        importer.insert(Product::new("sku-1").with_name("Big Blueish Box"));
        let summary = importer.flush().unwrap();

        let reported = reported.borrow();
        assert_eq!(reported.len(), 2);
        assert_eq!(reported[0], Some(first.entity_id));
        assert_eq!(reported[0], reported[1]);
        assert_eq!(summary.created, 0);
        assert_eq!(store.entity_count(), 1);
        assert_eq!(store.entity("sku-1").unwrap().entity_id, first.entity_id);
        assert_eq!(store.value("sku-1", "name", 0).as_deref(), Some("Big Blueish Box"));
    }

    #[test]
    fn test_store_scope_does_not_touch_global() {
        let store = store();
        let mut importer = ImporterFactory::new(Arc::clone(&store))
            .create(ImportConfig::new().with_attributes(["name", "price"]))
            .unwrap();

        importer.insert(Product::new("sku-2").with_name("Big Yellow Box").with_price("4.00"));
        importer.insert(
            Product::new("sku-2")
                .with_name("Grote Gele Doos")
                .with_price("4.25")
                .with_store_view("default"),
        );
        importer.flush().unwrap();

        assert_eq!(store.value("sku-2", "name", 0).as_deref(), Some("Big Yellow Box"));
        assert_eq!(store.value("sku-2", "name", 1).as_deref(), Some("Grote Gele Doos"));
        assert_eq!(store.value("sku-2", "price", 1).as_deref(), Some("4.25"));
        assert_eq!(store.entity_count(), 1);
    }

    #[test]
    fn test_same_sku_last_write_wins() {
        let store = store();
        let mut importer = ImporterFactory::new(Arc::clone(&store))
            .create(ImportConfig::new())
            .unwrap();

        importer.insert(Product::new("x").with_name("first").with_attribute_set("Default"));
        importer.insert(Product::new("x").with_name("second").with_attribute_set("Bags"));
        importer.flush().unwrap();

        assert_eq!(store.value("x", "name", 0).as_deref(), Some("second"));
        assert_eq!(store.entity("x").unwrap().attribute_set_id, 9);
    }

    #[test]
    fn test_null_clears_and_absent_keeps() {
        let store = store();
        let mut importer = ImporterFactory::new(Arc::clone(&store))
            .create(ImportConfig::new())
            .unwrap();

        let mut product = Product::new("n").with_name("Purple Box").with_price("3.95");
        product.set_attribute("color", 7);
        importer.insert(product);
        importer.flush().unwrap();

        let mut update = Product::new("n");
        update.set_attribute("price", AttributeValue::Null);
        update.name = Some(String::new());
        importer.insert(update);
        importer.flush().unwrap();

        assert_eq!(store.value("n", "price", 0), None);
        assert_eq!(store.value("n", "name", 0), None);
        assert_eq!(store.value("n", "color", 0).as_deref(), Some("7"));
    }

    #[test]
    fn test_attribute_filter_skips_unlisted() {
        let store = store();
        let mut importer = ImporterFactory::new(Arc::clone(&store))
            .create(ImportConfig::new().with_attributes(["name"]))
            .unwrap();

        importer.insert(Product::new("f").with_name("Box").with_price("oops"));
        let summary = importer.flush().unwrap();

        assert_eq!(summary.succeeded, 1);
        assert_eq!(store.value("f", "price", 0), None);
    }

    #[test]
    fn test_references_are_resolved_and_linked() {
        let store = store();
        let mut importer = ImporterFactory::new(Arc::clone(&store))
            .create(ImportConfig::new())
            .unwrap();

        let mut product = Product::new("r")
            .with_tax_class("Retail Customer")
            .with_categories(References::new(["Boxes", "Bags"]));
        product.status = Some(ProductStatus::Enabled);
        importer.insert(product);
        importer.insert(Product::new("r").with_categories(References::new(["Boxes"])));
        importer.flush().unwrap();

        assert_eq!(store.value("r", "tax_class_id", 0).as_deref(), Some("3"));
        assert_eq!(store.value("r", "status", 0).as_deref(), Some("1"));
        assert_eq!(store.category_ids("r"), vec![20, 21]);
    }

    #[test]
    fn test_unknown_category_fails_only_that_record() {
        let store = store();
        let (log, config) = recorder();
        let mut importer = ImporterFactory::new(Arc::clone(&store)).create(config).unwrap();

        importer.insert(Product::new("u1").with_categories(References::new(["Ghost"])));
        importer.insert(Product::new("u2").with_categories(References::new(["Ghost", "Boxes"])));
        importer.insert(Product::new("u3").with_categories(References::new(["Boxes"])));
        importer.flush().unwrap();

        let log = log.borrow();
        assert_eq!(log[0], "u1: category name not found: Ghost");
        assert_eq!(log[1], "u2: category name not found: Ghost");
        assert!(log[2].starts_with("u3: ok"));
        assert!(store.entity("u1").is_none());
    }

    #[test]
    fn test_dangling_id_fails_only_that_record() {
        let store = store();
        let (log, config) = recorder();
        let mut importer = ImporterFactory::new(Arc::clone(&store)).create(config).unwrap();

        importer.insert(Product::new("good").with_name("Good"));
        importer.insert(
            Product::new("bad").with_categories(References(vec![Reference::Id(999)])),
        );
        importer.insert(Product::new("bad-set").with_attribute_set(Reference::Id(77)));
        importer.insert(Product::new("linked").with_categories(References(vec![Reference::Id(20)])));
        let summary = importer.flush().unwrap();

        assert_eq!(summary.succeeded, 2);
        let log = log.borrow();
        assert!(log[0].starts_with("good: ok"));
        assert_eq!(log[1], "bad: category id not found: 999");
        assert_eq!(log[2], "bad-set: attribute set id not found: 77");
        assert!(log[3].starts_with("linked: ok"));
        assert_eq!(store.category_ids("linked"), vec![20]);
        assert!(store.entity("bad").is_none());
        assert_eq!(store.calls("find_reference_ids"), 1);
    }

    #[test]
    fn test_unknown_store_view() {
        let store = store();
        let (log, config) = recorder();
        let mut importer = ImporterFactory::new(Arc::clone(&store)).create(config).unwrap();

        importer.insert(Product::new("s").with_store_view("nl"));
        importer.flush().unwrap();

        assert_eq!(log.borrow()[0], "s: store view code not found: nl");
    }

    #[test]
    fn test_missing_default_attribute_set() {
        let store = store();
        let (log, config) = recorder();
        let mut importer = ImporterFactory::new(Arc::clone(&store))
            .create(config.with_default_attribute_set("Nonexistent"))
            .unwrap();

        importer.insert(Product::new("m").with_name("No set"));
        importer.insert(Product::new("m2").with_attribute_set("Default"));
        importer.flush().unwrap();

        assert_eq!(log.borrow()[0], "m: missing attribute set");
        assert!(log.borrow()[1].starts_with("m2: ok"));
    }

    #[test]
    fn test_round_trips_independent_of_batch_size() {
        let mut counts = Vec::new();
        for n in [10usize, 200] {
            let store = store();
            let mut importer = ImporterFactory::new(Arc::clone(&store))
                .create(ImportConfig::new())
                .unwrap();
            store.reset_calls();

            for i in 0..n {
                importer.insert(
                    Product::new(format!("bulk-{i}"))
                        .with_name(format!("name {i}"))
                        .with_price("1.50")
                        .with_tax_class("Taxable Goods")
                        .with_categories(References::new(["Boxes", "Bags"])),
                );
            }
            importer.flush().unwrap();
            counts.push(store.total_calls());
        }

        assert_eq!(counts[0], counts[1]);
        assert!(counts[0] <= 7);
    }

    #[test]
    fn test_reference_cache_survives_flushes() {
        let store = store();
        let mut importer = ImporterFactory::new(Arc::clone(&store))
            .create(ImportConfig::new())
            .unwrap();

        importer.insert(Product::new("c1").with_tax_class("Taxable Goods"));
        importer.flush().unwrap();
        importer.insert(Product::new("c2").with_tax_class("Taxable Goods"));
        importer.flush().unwrap();

        assert_eq!(store.calls("lookup_references"), 1);
        assert_eq!(importer.resolver().lookup_count(), 1);
    }

    #[test]
    fn test_store_failure_reports_every_pending_record() {
        let store = store();
        let (log, config) = recorder();
        let mut importer = ImporterFactory::new(Arc::clone(&store)).create(config).unwrap();
        store.fail_on("write_attribute_values");

        importer.insert(Product::new("ok-1").with_name("A"));
        importer.insert(Product::new(""));
        importer.insert(Product::new("ok-2").with_name("B"));

        let result = importer.flush();

        assert!(result.is_err());
        let log = log.borrow();
        assert_eq!(log.len(), 3);
        assert!(log[0].starts_with("ok-1: persistence failure: "));
        assert_eq!(log[1], ": missing sku");
        assert!(log[2].starts_with("ok-2: persistence failure: "));
        assert_eq!(importer.buffered(), 0);
    }

    #[test]
    fn test_empty_flush_makes_no_store_calls() {
        let store = store();
        let mut importer = ImporterFactory::new(Arc::clone(&store))
            .create(ImportConfig::new())
            .unwrap();
        store.reset_calls();

        let summary = importer.flush().unwrap();

        assert_eq!(summary.total, 0);
        assert_eq!(store.total_calls(), 0);
    }
}
