// ==========================================
// 飞行日志导入导出 - 配置管理器
// ==========================================
// 职责: 从 config_kv 表读取/写入全局配置,覆写 PipelineConfig
// 存储: config_kv 表 (scope_id + key + value)
// ==========================================

use crate::config::pipeline_config::{ConfigError, PipelineConfig, RELATIONSHIPS};
use crate::db::{configure_sqlite_connection, ensure_schema, open_sqlite_connection};
use crate::domain::types::RefPolicy;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "PILOTLOG_DB_PATH";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, ConfigError> {
        let conn = open_sqlite_connection(db_path).map_err(|e| store_error("*", e))?;
        ensure_schema(&conn).map_err(|e| store_error("*", e))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, ConfigError> {
        {
            let guard = conn.lock().map_err(|e| store_error("*", e))?;
            configure_sqlite_connection(&guard).map_err(|e| store_error("*", e))?;
            ensure_schema(&guard).map_err(|e| store_error("*", e))?;
        }

        Ok(Self { conn })
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let conn = self.conn.lock().map_err(|e| store_error(key, e))?;

        conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|e| store_error(key, e))
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        let conn = self.conn.lock().map_err(|e| store_error(key, e))?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )
        .map_err(|e| store_error(key, e))?;
        Ok(())
    }

    /// 读取全部 pipeline.* 配置
    pub fn list_pipeline_values(&self) -> Result<BTreeMap<String, String>, ConfigError> {
        let conn = self.conn.lock().map_err(|e| store_error("pipeline.*", e))?;

        let mut stmt = conn
            .prepare(
                "SELECT key, value FROM config_kv WHERE scope_id = 'global' AND key LIKE 'pipeline.%' ORDER BY key",
            )
            .map_err(|e| store_error("pipeline.*", e))?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .map_err(|e| store_error("pipeline.*", e))?;

        let mut values = BTreeMap::new();
        for row in rows {
            let (key, value) = row.map_err(|e| store_error("pipeline.*", e))?;
            values.insert(key, value);
        }
        Ok(values)
    }

    /// 用 config_kv 中的 pipeline.* 配置覆写 PipelineConfig
    ///
    /// 未知键记录 warn 后忽略,已知键值格式错误返回 InvalidValue。
    pub fn apply_overrides(&self, config: &mut PipelineConfig) -> Result<usize, ConfigError> {
        let values = self.list_pipeline_values()?;
        let mut applied = 0;

        for (key, value) in &values {
            let raw = value.trim();
            match key.as_str() {
                config_keys::STRICT_MODE => config.strict_mode = parse_flag(key, raw)?,
                config_keys::AUTO_CREATE_MISSING_REFS => {
                    config.auto_create_missing_refs = parse_flag(key, raw)?
                }
                config_keys::BATCH_SIZE => {
                    config.batch_size = raw.parse::<usize>().map_err(|e| invalid(key, raw, e))?
                }
                config_keys::LIMIT_THRESHOLD_MIN => {
                    config.limit_threshold_min =
                        raw.parse::<f64>().map_err(|e| invalid(key, raw, e))?
                }
                config_keys::LIMIT_THRESHOLD_MAX => {
                    config.limit_threshold_max =
                        raw.parse::<f64>().map_err(|e| invalid(key, raw, e))?
                }
                other => match other.strip_prefix(config_keys::POLICY_PREFIX) {
                    Some(relation) if RELATIONSHIPS.contains(&relation) => {
                        let policy = raw.parse::<RefPolicy>().map_err(|e| invalid(key, raw, e))?;
                        config
                            .relationship_policies
                            .insert(relation.to_string(), policy);
                    }
                    _ => {
                        warn!(config_key = %key, raw_value = %raw, "未知的管道配置项,已忽略");
                        continue;
                    }
                },
            }
            applied += 1;
        }

        debug!(applied, "config_kv 覆写完成");
        config.validate()?;
        Ok(applied)
    }
}

fn store_error(key: &str, err: impl std::fmt::Display) -> ConfigError {
    ConfigError::StoreError {
        key: key.to_string(),
        message: err.to_string(),
    }
}

fn invalid(key: &str, value: &str, err: impl std::fmt::Display) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        message: err.to_string(),
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "no" | "n" | "off" => Ok(false),
        _ => Err(invalid(key, raw, "期望布尔值")),
    }
}

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 PILOTLOG_DB_PATH（非空时）
/// - 用户数据目录/pilotlog/pilotlog.db
/// - 回退: ./pilotlog.db
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./pilotlog.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("pilotlog");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("pilotlog.db");
        }
    }

    path.to_string_lossy().to_string()
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    pub const STRICT_MODE: &str = "pipeline.strict_mode";
    pub const AUTO_CREATE_MISSING_REFS: &str = "pipeline.auto_create_missing_refs";
    pub const BATCH_SIZE: &str = "pipeline.batch_size";
    pub const LIMIT_THRESHOLD_MIN: &str = "pipeline.limit_threshold_min";
    pub const LIMIT_THRESHOLD_MAX: &str = "pipeline.limit_threshold_max";

    // 按关系的缺失引用策略,如 pipeline.policy.flight.aircraft = create_stub
    pub const POLICY_PREFIX: &str = "pipeline.policy.";
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn create_manager() -> (NamedTempFile, ConfigManager) {
        let temp_file = NamedTempFile::new().unwrap();
        let manager = ConfigManager::new(temp_file.path().to_str().unwrap()).unwrap();
        (temp_file, manager)
    }

    #[test]
    fn test_get_set_value() {
        let (_tmp, manager) = create_manager();
        assert_eq!(manager.get_global_config_value("pipeline.batch_size").unwrap(), None);

        manager.set_global_config_value("pipeline.batch_size", "10").unwrap();
        manager.set_global_config_value("pipeline.batch_size", "20").unwrap();
        assert_eq!(
            manager.get_global_config_value("pipeline.batch_size").unwrap(),
            Some("20".to_string())
        );
    }

    #[test]
    fn test_apply_overrides() {
        let (_tmp, manager) = create_manager();
        manager.set_global_config_value(config_keys::STRICT_MODE, "true").unwrap();
        manager.set_global_config_value(config_keys::BATCH_SIZE, "25").unwrap();
        manager
            .set_global_config_value("pipeline.policy.flight.aircraft", "create_stub")
            .unwrap();
        manager.set_global_config_value("pipeline.unknown", "x").unwrap();

        let mut config = PipelineConfig::default();
        let applied = manager.apply_overrides(&mut config).unwrap();

        assert_eq!(applied, 3);
        assert!(config.strict_mode);
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.policy_for("flight.aircraft"), RefPolicy::CreateStub);
        assert_eq!(config.policy_for("flight.pilot"), RefPolicy::Reject);
    }

    #[test]
    fn test_apply_overrides_rejects_bad_value() {
        let (_tmp, manager) = create_manager();
        manager.set_global_config_value(config_keys::BATCH_SIZE, "lots").unwrap();

        let mut config = PipelineConfig::default();
        assert!(manager.apply_overrides(&mut config).is_err());
    }

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }
}
