// ==========================================
// 飞行日志导入导出 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout,减少并发写入时的偶发 busy 错误
// - 按实体字段定义建表（CREATE TABLE IF NOT EXISTS,不做版本迁移）
// ==========================================

use crate::domain::schema::{self, ColumnType};
use crate::domain::types::EntityKind;
use rusqlite::Connection;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
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

/// 生成实体表 DDL
pub fn entity_table_ddl(kind: EntityKind) -> String {
    let table = kind.table_name();
    let mut columns = vec![
        "id INTEGER PRIMARY KEY AUTOINCREMENT".to_string(),
        "natural_key TEXT NOT NULL UNIQUE".to_string(),
    ];

    for column in schema::columns(kind) {
        let mut def = format!("\"{}\" {}", column.name, column.ty.sql_type());
        if let ColumnType::Ref(target) = column.ty {
            def.push_str(&format!(" REFERENCES {}(id)", target.table_name()));
        }
        columns.push(def);
    }

    columns.push("created_at TEXT NOT NULL DEFAULT (datetime('now'))".to_string());
    columns.push("updated_at TEXT NOT NULL DEFAULT (datetime('now'))".to_string());

    format!(
        "CREATE TABLE IF NOT EXISTS {table} (\n    {}\n);\n\
         CREATE INDEX IF NOT EXISTS idx_{table}_guid ON {table}(guid);\n\
         CREATE INDEX IF NOT EXISTS idx_{table}_source_code ON {table}(source_code);",
        columns.join(",\n    "),
        table = table
    )
}

/// 建表（实体表按依赖层级创建 + config_kv）
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    for tier in EntityKind::tiers() {
        for kind in tier {
            conn.execute_batch(&entity_table_ddl(kind))?;
        }
    }

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );
        "#,
    )?;

    Ok(())
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

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN \
                 ('aircraft','pilot','airfield','setting','flight','limit_rule','saved_query','image','qualification','config_kv')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 10);
    }

    #[test]
    fn test_flight_ddl_references_parents() {
        let ddl = entity_table_ddl(EntityKind::Flight);
        assert!(ddl.contains("\"aircraft\" INTEGER REFERENCES aircraft(id)"));
        assert!(ddl.contains("\"origin\" INTEGER REFERENCES airfield(id)"));
        assert!(ddl.contains("natural_key TEXT NOT NULL UNIQUE"));
    }
}
