// ==========================================
// 飞行日志导入导出 - 实体仓储 SQLite 实现
// ==========================================
// 职责: 按实体字段定义读写各实体表（使用 rusqlite）
// 红线: Repository 不含业务规则,只做数据读写
// ==========================================

use crate::db::{configure_sqlite_connection, ensure_schema, open_sqlite_connection};
use crate::domain::schema::{self, ColumnType};
use crate::domain::types::{EntityKind, UpsertStatus};
use crate::domain::value::{FieldMap, FieldValue};
use crate::repository::entity_repo::{EntityRepository, EntityRow, StoredEntity, UpsertOutcome};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

// ==========================================
// SqliteEntityRepository
// ==========================================
pub struct SqliteEntityRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteEntityRepository {
    /// 创建新的 Repository 实例（必要时建表）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        ensure_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA 与建表（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            configure_sqlite_connection(&guard)?;
            ensure_schema(&guard)?;
        }

        Ok(Self { conn })
    }

    /// 共享连接（供 ConfigManager 复用）
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(format!("锁获取失败: {}", e)))
    }

    fn select_sql(kind: EntityKind) -> String {
        let columns: Vec<String> = schema::columns(kind)
            .iter()
            .map(|c| format!("\"{}\"", c.name))
            .collect();
        format!(
            "SELECT id, natural_key, {} FROM {}",
            columns.join(", "),
            kind.table_name()
        )
    }

    /// 按列类型读取一行
    fn read_row(kind: EntityKind, row: &Row) -> rusqlite::Result<StoredEntity> {
        let mut fields = FieldMap::new();
        for (i, column) in schema::columns(kind).iter().enumerate() {
            let idx = i + 2;
            let value = match column.ty {
                ColumnType::Text | ColumnType::AnyRef => {
                    FieldValue::from(row.get::<_, Option<String>>(idx)?)
                }
                ColumnType::Integer | ColumnType::Ref(_) => {
                    FieldValue::from(row.get::<_, Option<i64>>(idx)?)
                }
                ColumnType::Decimal => FieldValue::from(row.get::<_, Option<f64>>(idx)?),
                ColumnType::Date => FieldValue::from(row.get::<_, Option<NaiveDate>>(idx)?),
                ColumnType::Bool => {
                    FieldValue::from(row.get::<_, Option<i64>>(idx)?.map(|v| v != 0))
                }
            };
            fields.insert(column.name, value);
        }

        Ok(StoredEntity {
            id: row.get(0)?,
            natural_key: row.get(1)?,
            fields,
        })
    }

    /// 补齐固定列集合（未提供的列视为缺失）
    fn complete_fields(kind: EntityKind, fields: &FieldMap) -> FieldMap {
        schema::columns(kind)
            .iter()
            .map(|c| {
                (
                    c.name,
                    fields.get(c.name).cloned().unwrap_or(FieldValue::Absent),
                )
            })
            .collect()
    }

    /// 在给定连接（事务 / savepoint）上执行单条 upsert
    fn upsert_on(
        conn: &Connection,
        kind: EntityKind,
        natural_key: &str,
        fields: &FieldMap,
    ) -> RepositoryResult<UpsertOutcome> {
        let table = kind.table_name();
        let columns = schema::columns(kind);
        let incoming = Self::complete_fields(kind, fields);

        let existing = conn
            .query_row(
                &format!("{} WHERE natural_key = ?1", Self::select_sql(kind)),
                params![natural_key],
                |row| Self::read_row(kind, row),
            )
            .optional()?;

        match existing {
            None => {
                let key = natural_key.to_string();
                let mut values: Vec<&dyn ToSql> = Vec::with_capacity(columns.len() + 1);
                values.push(&key);
                for column in columns {
                    values.push(&incoming[column.name]);
                }
                let names: Vec<String> = columns.iter().map(|c| format!("\"{}\"", c.name)).collect();
                let placeholders: Vec<String> =
                    (2..=columns.len() + 1).map(|i| format!("?{}", i)).collect();
                let sql = format!(
                    "INSERT INTO {} (natural_key, {}) VALUES (?1, {})",
                    table,
                    names.join(", "),
                    placeholders.join(", ")
                );
                conn.execute(&sql, values.as_slice())?;

                Ok(UpsertOutcome {
                    id: conn.last_insert_rowid(),
                    status: UpsertStatus::Created,
                })
            }
            Some(stored) if stored.fields == incoming => Ok(UpsertOutcome {
                id: stored.id,
                status: UpsertStatus::Unchanged,
            }),
            Some(stored) => {
                let id = stored.id;
                let mut values: Vec<&dyn ToSql> = Vec::with_capacity(columns.len() + 1);
                values.push(&id);
                for column in columns {
                    values.push(&incoming[column.name]);
                }
                let assignments: Vec<String> = columns
                    .iter()
                    .enumerate()
                    .map(|(i, c)| format!("\"{}\" = ?{}", c.name, i + 2))
                    .collect();
                let sql = format!(
                    "UPDATE {} SET {}, updated_at = datetime('now') WHERE id = ?1",
                    table,
                    assignments.join(", ")
                );
                conn.execute(&sql, values.as_slice())?;

                Ok(UpsertOutcome {
                    id,
                    status: UpsertStatus::Updated,
                })
            }
        }
    }
}

#[async_trait]
impl EntityRepository for SqliteEntityRepository {
    async fn upsert(
        &self,
        kind: EntityKind,
        natural_key: &str,
        fields: &FieldMap,
    ) -> RepositoryResult<UpsertOutcome> {
        let conn = self.lock()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let outcome = Self::upsert_on(&tx, kind, natural_key, fields)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(outcome)
    }

    async fn upsert_batch(
        &self,
        kind: EntityKind,
        rows: &[EntityRow],
    ) -> RepositoryResult<Vec<RepositoryResult<UpsertOutcome>>> {
        let conn = self.lock()?;
        let mut tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let sp = tx
                .savepoint()
                .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
            match Self::upsert_on(&sp, kind, &row.natural_key, &row.fields) {
                Ok(outcome) => {
                    sp.commit()
                        .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
                    results.push(Ok(outcome));
                }
                Err(e) => {
                    // savepoint drop 时回滚,仅撤销本条
                    drop(sp);
                    results.push(Err(e));
                }
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        debug!(
            kind = %kind,
            rows = rows.len(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            "批量写入事务已提交"
        );
        Ok(results)
    }

    async fn find(&self, kind: EntityKind, key: &str) -> RepositoryResult<Option<StoredEntity>> {
        let conn = self.lock()?;
        let sql = format!(
            "{} WHERE natural_key = ?1 OR guid = ?1 OR source_code = ?1 \
             ORDER BY CASE WHEN natural_key = ?1 THEN 0 WHEN guid = ?1 THEN 1 ELSE 2 END, id \
             LIMIT 1",
            Self::select_sql(kind)
        );
        let found = conn
            .query_row(&sql, params![key], |row| Self::read_row(kind, row))
            .optional()?;
        Ok(found)
    }

    async fn list_all(&self, kind: EntityKind) -> RepositoryResult<Vec<StoredEntity>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("{} ORDER BY id", Self::select_sql(kind)))?;
        let rows = stmt.query_map([], |row| Self::read_row(kind, row))?;

        let mut entities = Vec::new();
        for row in rows {
            entities.push(row?);
        }
        Ok(entities)
    }

    async fn count(&self, kind: EntityKind) -> RepositoryResult<i64> {
        let conn = self.lock()?;
        let count = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", kind.table_name()),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn create_repo() -> (NamedTempFile, SqliteEntityRepository) {
        let temp_file = NamedTempFile::new().unwrap();
        let repo = SqliteEntityRepository::new(temp_file.path().to_str().unwrap()).unwrap();
        (temp_file, repo)
    }

    fn aircraft_fields(model: &str) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert("guid", FieldValue::Text("G-1".to_string()));
        fields.insert("model", FieldValue::Text(model.to_string()));
        fields.insert("seats", FieldValue::Integer(4));
        fields.insert("complex", FieldValue::Bool(false));
        fields
    }

    #[tokio::test]
    async fn test_upsert_created_unchanged_updated() {
        let (_tmp, repo) = create_repo();

        let first = repo
            .upsert(EntityKind::Aircraft, "N123AB", &aircraft_fields("C172"))
            .await
            .unwrap();
        assert_eq!(first.status, UpsertStatus::Created);

        let second = repo
            .upsert(EntityKind::Aircraft, "N123AB", &aircraft_fields("C172"))
            .await
            .unwrap();
        assert_eq!(second.status, UpsertStatus::Unchanged);
        assert_eq!(second.id, first.id);

        let third = repo
            .upsert(EntityKind::Aircraft, "N123AB", &aircraft_fields("C182"))
            .await
            .unwrap();
        assert_eq!(third.status, UpsertStatus::Updated);
        assert_eq!(repo.count(EntityKind::Aircraft).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_find_by_natural_key_or_guid() {
        let (_tmp, repo) = create_repo();
        repo.upsert(EntityKind::Aircraft, "N123AB", &aircraft_fields("C172"))
            .await
            .unwrap();

        let by_key = repo.find(EntityKind::Aircraft, "N123AB").await.unwrap();
        assert!(by_key.is_some());

        let by_guid = repo.find(EntityKind::Aircraft, "G-1").await.unwrap().unwrap();
        assert_eq!(by_guid.natural_key, "N123AB");
        assert_eq!(by_guid.fields["seats"], FieldValue::Integer(4));
        assert_eq!(by_guid.fields["complex"], FieldValue::Bool(false));
        assert_eq!(by_guid.fields["make"], FieldValue::Absent);

        assert!(repo.find(EntityKind::Aircraft, "N999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_batch_isolates_failing_row() {
        let (_tmp, repo) = create_repo();

        let mut bad = FieldMap::new();
        // 外键指向不存在的 aircraft id
        bad.insert("date", FieldValue::Text("2024-01-05".to_string()));
        bad.insert("aircraft", FieldValue::Integer(999));

        let mut good = FieldMap::new();
        good.insert("date", FieldValue::Text("2024-01-06".to_string()));

        let rows = vec![
            EntityRow {
                natural_key: "F-BAD".to_string(),
                fields: bad,
            },
            EntityRow {
                natural_key: "F-GOOD".to_string(),
                fields: good,
            },
        ];

        let results = repo.upsert_batch(EntityKind::Flight, &rows).await.unwrap();
        assert!(results[0].is_err());
        assert_eq!(results[1].as_ref().unwrap().status, UpsertStatus::Created);
        assert_eq!(repo.count(EntityKind::Flight).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_all_in_insertion_order() {
        let (_tmp, repo) = create_repo();
        for key in ["B", "A", "C"] {
            repo.upsert(EntityKind::Pilot, key, &FieldMap::new())
                .await
                .unwrap();
        }
        let keys: Vec<String> = repo
            .list_all(EntityKind::Pilot)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.natural_key)
            .collect();
        assert_eq!(keys, vec!["B", "A", "C"]);
    }
}
