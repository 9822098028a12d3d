// ==========================================
// 商品批量导入引擎 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键 + busy_timeout）
// - 提供目录表的幂等建表（不做迁移）
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 即 store 层超时，flush 不会无限阻塞
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 创建目录表（IF NOT EXISTS，可重复调用）
///
/// store_id = 0 的 admin 作用域随表一起写入
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS store (
            store_id INTEGER PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT
        );

        INSERT OR IGNORE INTO store (store_id, code, name) VALUES (0, 'admin', 'Admin');

        CREATE TABLE IF NOT EXISTS attribute_set (
            attribute_set_id INTEGER PRIMARY KEY AUTOINCREMENT,
            attribute_set_name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tax_class (
            class_id INTEGER PRIMARY KEY AUTOINCREMENT,
            class_name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS category (
            category_id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS eav_attribute (
            attribute_code TEXT PRIMARY KEY,
            backend_type TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS product_entity (
            entity_id INTEGER PRIMARY KEY AUTOINCREMENT,
            sku TEXT NOT NULL UNIQUE,
            attribute_set_id INTEGER NOT NULL REFERENCES attribute_set(attribute_set_id),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS product_attribute_value (
            entity_id INTEGER NOT NULL REFERENCES product_entity(entity_id) ON DELETE CASCADE,
            attribute_code TEXT NOT NULL REFERENCES eav_attribute(attribute_code),
            store_id INTEGER NOT NULL REFERENCES store(store_id),
            value TEXT,
            PRIMARY KEY (entity_id, attribute_code, store_id)
        );

        CREATE TABLE IF NOT EXISTS product_category (
            entity_id INTEGER NOT NULL REFERENCES product_entity(entity_id) ON DELETE CASCADE,
            category_id INTEGER NOT NULL REFERENCES category(category_id),
            PRIMARY KEY (entity_id, category_id)
        );
        "#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();

        ensure_schema(&conn).unwrap();
        ensure_schema(&conn).unwrap();

        let admin: String = conn
            .query_row("SELECT code FROM store WHERE store_id = 0", [], |row| row.get(0))
            .unwrap();
        assert_eq!(admin, "admin");
    }
}
