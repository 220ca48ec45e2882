// ==========================================
// 飞行日志导入导出 - 导入管道配置
// ==========================================
// 分层: 内置默认值 → JSON 配置文件 → config_kv 覆写 → 命令行参数
// ==========================================

use crate::domain::types::RefPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// 已知的引用关系（策略配置键）
pub const RELATIONSHIPS: [&str; 9] = [
    "flight.aircraft",
    "flight.pilot",
    "flight.origin",
    "flight.destination",
    "image.parent",
    "limit.target",
    "query.owner",
    "qualification.pilot",
    "qualification.airfield",
];

pub const DEFAULT_BATCH_SIZE: usize = 500;
pub const DEFAULT_LIMIT_THRESHOLD_MIN: f64 = 0.0;
pub const DEFAULT_LIMIT_THRESHOLD_MAX: f64 = 1_000_000.0;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读取失败 ({path}): {message}")]
    ReadError { path: String, message: String },

    #[error("配置文件格式错误 ({path}): {message}")]
    ParseError { path: String, message: String },

    #[error("配置读取失败 (key: {key}): {message}")]
    StoreError { key: String, message: String },

    #[error("配置值无效 (key: {key}, value: {value}): {message}")]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },
}

// ==========================================
// PipelineConfig - 导入管道配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// 严格模式: 写入前出现任何拒绝记录则整体不写入
    pub strict_mode: bool,

    /// 未单独配置的引用关系的默认策略（true = CreateStub）
    pub auto_create_missing_refs: bool,

    /// 按关系覆写的缺失引用策略（键见 RELATIONSHIPS）
    pub relationship_policies: BTreeMap<String, RefPolicy>,

    /// 每个写入事务的最大记录数
    pub batch_size: usize,

    /// 限制规则阈值范围 [min, max]
    pub limit_threshold_min: f64,
    pub limit_threshold_max: f64,

    pub input_path: Option<String>,
    pub db_path: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strict_mode: false,
            auto_create_missing_refs: false,
            relationship_policies: BTreeMap::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            limit_threshold_min: DEFAULT_LIMIT_THRESHOLD_MIN,
            limit_threshold_max: DEFAULT_LIMIT_THRESHOLD_MAX,
            input_path: None,
            db_path: None,
        }
    }
}

impl PipelineConfig {
    /// 从 JSON 配置文件加载（未出现的字段取默认值）
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let config: PipelineConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "batch_size".to_string(),
                value: "0".to_string(),
                message: "必须大于 0".to_string(),
            });
        }

        if !(self.limit_threshold_min <= self.limit_threshold_max) {
            return Err(ConfigError::InvalidValue {
                key: "limit_threshold_min".to_string(),
                value: format!("{}..{}", self.limit_threshold_min, self.limit_threshold_max),
                message: "下限不能大于上限".to_string(),
            });
        }

        for relation in self.relationship_policies.keys() {
            if !RELATIONSHIPS.contains(&relation.as_str()) {
                return Err(ConfigError::InvalidValue {
                    key: "relationship_policies".to_string(),
                    value: relation.clone(),
                    message: format!("未知引用关系,可选: {}", RELATIONSHIPS.join(", ")),
                });
            }
        }

        Ok(())
    }

    /// 查询某个引用关系的缺失策略
    pub fn policy_for(&self, relation: &str) -> RefPolicy {
        self.relationship_policies
            .get(relation)
            .copied()
            .unwrap_or(if self.auto_create_missing_refs {
                RefPolicy::CreateStub
            } else {
                RefPolicy::Reject
            })
    }
}
