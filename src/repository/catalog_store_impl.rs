// ==========================================
// 商品批量导入引擎 - 目录存储 SQLite 实现
// ==========================================
// 职责: 实现批量数据访问（使用 rusqlite）
// 红线: Repository 不含业务规则，只做数据 CRUD
// 约束: 每个写方法一个事务；IN (...) 查询按 500 个参数分块
// ==========================================

use crate::db::{ensure_schema, open_sqlite_connection};
use crate::domain::{
    AttributeMeta, AttributeValueRow, BackendType, CatalogMetadata, CategoryLink, EntityId,
    EntityUpdate, ExistingEntity, NewEntity, ReferenceKind, StoredProduct, GLOBAL_STORE_ID,
};
use crate::perf::install_sqlite_tracing;
use crate::repository::catalog_store::CatalogStore;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// 单条 IN (...) 语句的最大参数数（低于 SQLite 默认上限 999）
const IN_CHUNK_SIZE: usize = 500;

/// 每类引用对应的 (表名, 名称列, ID 列)
fn reference_table(kind: ReferenceKind) -> (&'static str, &'static str, &'static str) {
    match kind {
        ReferenceKind::AttributeSet => ("attribute_set", "attribute_set_name", "attribute_set_id"),
        ReferenceKind::TaxClass => ("tax_class", "class_name", "class_id"),
        ReferenceKind::Category => ("category", "name", "category_id"),
        ReferenceKind::StoreView => ("store", "code", "store_id"),
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

// ==========================================
// SqliteCatalogStore
// ==========================================
pub struct SqliteCatalogStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCatalogStore {
    /// 打开数据库文件并确保目录表存在
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let mut conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        install_sqlite_tracing(&mut conn);
        ensure_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建（调用方负责 PRAGMA 与建表）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ===== 核对用读取（不属于导入接口）=====

    /// 按 sku 读取商品；指定作用域的值优先，缺失时回落到全局值
    ///
    /// # 参数
    /// - sku: 商品 sku
    /// - store_code: 作用域代码（"admin" = 仅全局）
    ///
    /// # 返回
    /// - Ok(None): sku 或作用域不存在
    pub fn load_product(&self, sku: &str, store_code: &str) -> RepositoryResult<Option<StoredProduct>> {
        let conn = self.lock()?;

        let store_id: Option<i64> = conn
            .query_row(
                "SELECT store_id FROM store WHERE code = ?1",
                params![store_code],
                |row| row.get(0),
            )
            .optional()?;
        let Some(store_id) = store_id else {
            return Ok(None);
        };

        let entity: Option<(i64, i64)> = conn
            .query_row(
                "SELECT entity_id, attribute_set_id FROM product_entity WHERE sku = ?1",
                params![sku],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((entity_id, attribute_set_id)) = entity else {
            return Ok(None);
        };

        // 全局值先写入，作用域值覆盖
        let mut stmt = conn.prepare(
            r#"
            SELECT attribute_code, value
            FROM product_attribute_value
            WHERE entity_id = ?1 AND store_id IN (?2, ?3) AND value IS NOT NULL
            ORDER BY CASE WHEN store_id = ?2 THEN 0 ELSE 1 END
            "#,
        )?;
        let mut attributes = BTreeMap::new();
        let rows = stmt.query_map(params![entity_id, GLOBAL_STORE_ID, store_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (code, value) = row?;
            attributes.insert(code, value);
        }

        let mut stmt = conn.prepare(
            "SELECT category_id FROM product_category WHERE entity_id = ?1 ORDER BY category_id",
        )?;
        let category_ids = stmt
            .query_map(params![entity_id], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(StoredProduct {
            entity_id,
            sku: sku.to_string(),
            attribute_set_id,
            attributes,
            category_ids,
        }))
    }

    /// 统计 product_entity 表记录数
    pub fn count_entities(&self) -> RepositoryResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM product_entity", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl CatalogStore for SqliteCatalogStore {
    fn load_metadata(&self) -> RepositoryResult<CatalogMetadata> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare("SELECT attribute_code, backend_type FROM eav_attribute")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut attributes = HashMap::new();
        for row in rows {
            let (code, raw_type) = row?;
            match BackendType::parse(&raw_type) {
                Some(backend_type) => {
                    attributes.insert(
                        code.clone(),
                        AttributeMeta {
                            attribute_code: code,
                            backend_type,
                        },
                    );
                }
                None => {
                    // 未知存储类型的属性不可导入
                    warn!(attribute_code = %code, backend_type = %raw_type, "跳过未知存储类型的属性");
                }
            }
        }

        debug!(attributes = attributes.len(), "属性元数据加载完成");
        Ok(CatalogMetadata { attributes })
    }

    fn load_all_references(&self, kind: ReferenceKind) -> RepositoryResult<HashMap<String, EntityId>> {
        let (table, name_col, id_col) = reference_table(kind);
        let conn = self.lock()?;

        // ID 降序读取，最终同名保留最小 ID
        let sql = format!("SELECT {name_col}, {id_col} FROM {table} ORDER BY {id_col} DESC");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut map = HashMap::new();
        for row in rows {
            let (name, id) = row?;
            map.insert(name, id);
        }
        Ok(map)
    }

    fn lookup_references(
        &self,
        kind: ReferenceKind,
        names: &[String],
    ) -> RepositoryResult<HashMap<String, EntityId>> {
        let mut map = HashMap::new();
        if names.is_empty() {
            return Ok(map);
        }

        let (table, name_col, id_col) = reference_table(kind);
        let conn = self.lock()?;

        for chunk in names.chunks(IN_CHUNK_SIZE) {
            let sql = format!(
                "SELECT {name_col}, MIN({id_col}) FROM {table} WHERE {name_col} IN ({}) GROUP BY {name_col}",
                placeholders(chunk.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (name, id) = row?;
                map.insert(name, id);
            }
        }

        Ok(map)
    }

    fn find_reference_ids(
        &self,
        kind: ReferenceKind,
        ids: &[EntityId],
    ) -> RepositoryResult<HashSet<EntityId>> {
        let mut found = HashSet::new();
        if ids.is_empty() {
            return Ok(found);
        }

        let (table, _, id_col) = reference_table(kind);
        let conn = self.lock()?;

        for chunk in ids.chunks(IN_CHUNK_SIZE) {
            let sql = format!(
                "SELECT {id_col} FROM {table} WHERE {id_col} IN ({})",
                placeholders(chunk.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| row.get::<_, i64>(0))?;
            for row in rows {
                found.insert(row?);
            }
        }

        Ok(found)
    }

    fn find_existing(&self, skus: &[String]) -> RepositoryResult<HashMap<String, ExistingEntity>> {
        let mut map = HashMap::new();
        if skus.is_empty() {
            return Ok(map);
        }

        let conn = self.lock()?;
        for chunk in skus.chunks(IN_CHUNK_SIZE) {
            let sql = format!(
                "SELECT sku, entity_id, attribute_set_id FROM product_entity WHERE sku IN ({})",
                placeholders(chunk.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    ExistingEntity {
                        entity_id: row.get(1)?,
                        attribute_set_id: row.get(2)?,
                    },
                ))
            })?;
            for row in rows {
                let (sku, entity) = row?;
                map.insert(sku, entity);
            }
        }

        Ok(map)
    }

    fn create_entities(&self, entities: &[NewEntity]) -> RepositoryResult<Vec<EntityId>> {
        if entities.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        let now = Utc::now().to_rfc3339();

        let mut ids = Vec::with_capacity(entities.len());
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO product_entity (sku, attribute_set_id, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?3)
                "#,
            )?;
            for entity in entities {
                stmt.execute(params![entity.sku, entity.attribute_set_id, now])?;
                ids.push(tx.last_insert_rowid());
            }
        }

        tx.commit()?;
        Ok(ids)
    }

    fn update_entities(&self, updates: &[EntityUpdate]) -> RepositoryResult<usize> {
        if updates.is_empty() {
            return Ok(0);
        }

        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        let now = Utc::now().to_rfc3339();

        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                UPDATE product_entity
                SET attribute_set_id = ?2, updated_at = ?3
                WHERE entity_id = ?1
                "#,
            )?;
            for update in updates {
                count += stmt.execute(params![update.entity_id, update.attribute_set_id, now])?;
            }
        }

        tx.commit()?;
        Ok(count)
    }

    fn write_attribute_values(&self, rows: &[AttributeValueRow]) -> RepositoryResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        let mut count = 0;
        {
            let mut upsert = tx.prepare(
                r#"
                INSERT INTO product_attribute_value (entity_id, attribute_code, store_id, value)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(entity_id, attribute_code, store_id) DO UPDATE SET
                    value = excluded.value
                "#,
            )?;
            let mut delete = tx.prepare(
                r#"
                DELETE FROM product_attribute_value
                WHERE entity_id = ?1 AND attribute_code = ?2 AND store_id = ?3
                "#,
            )?;

            for row in rows {
                count += match &row.value {
                    Some(value) => upsert.execute(params![
                        row.entity_id,
                        row.attribute_code,
                        row.store_id,
                        value
                    ])?,
                    None => delete.execute(params![row.entity_id, row.attribute_code, row.store_id])?,
                };
            }
        }

        tx.commit()?;
        Ok(count)
    }

    fn link_categories(&self, links: &[CategoryLink]) -> RepositoryResult<usize> {
        if links.is_empty() {
            return Ok(0);
        }

        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO product_category (entity_id, category_id) VALUES (?1, ?2)",
            )?;
            for link in links {
                count += stmt.execute(params![link.entity_id, link.category_id])?;
            }
        }

        tx.commit()?;
        Ok(count)
    }
}
