// ==========================================
// 飞行日志导入导出 - 导入模块错误类型
// ==========================================
// RecordError: 单条记录错误,收集进报告,不中断导入
// ImportError: 致命错误,中断导入
// 工具: thiserror 派生宏
// ==========================================

use crate::domain::types::ImportPhase;
use crate::repository::error::RepositoryError;
use serde::Serialize;
use thiserror::Error;

// ==========================================
// RecordError - 单条记录错误
// ==========================================
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordError {
    #[error("无法识别记录类型: {hint}")]
    UnclassifiableRecord { hint: String },

    #[error("字段错误 (field={field}): {reason}")]
    MalformedField { field: String, reason: String },

    #[error("引用无法解析 (field={field}): {value}")]
    UnresolvedReference { field: String, value: String },

    #[error("写入冲突 (key={key}): {message}")]
    WriteConflict { key: String, message: String },

    #[error("存储拒绝写入 (key={key}): {message}")]
    StoreRejected { key: String, message: String },
}

impl RecordError {
    pub fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        RecordError::MalformedField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn unresolved(field: impl Into<String>, value: impl Into<String>) -> Self {
        RecordError::UnresolvedReference {
            field: field.into(),
            value: value.into(),
        }
    }

    /// 错误分类名（报告统计用）
    pub fn code(&self) -> &'static str {
        match self {
            RecordError::UnclassifiableRecord { .. } => "UNCLASSIFIABLE_RECORD",
            RecordError::MalformedField { .. } => "MALFORMED_FIELD",
            RecordError::UnresolvedReference { .. } => "UNRESOLVED_REFERENCE",
            RecordError::WriteConflict { .. } => "WRITE_CONFLICT",
            RecordError::StoreRejected { .. } => "STORE_REJECTED",
        }
    }
}

// ==========================================
// ImportError - 导入致命错误
// ==========================================
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件读取失败 ({path}): {message}")]
    IoFailure { path: String, message: String },

    #[error("文件格式不支持: {0}（仅支持 .json/.csv）")]
    UnsupportedFormat(String),

    #[error("文件结构无效: {0}")]
    InvalidStructure(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 存储错误 =====
    #[error("存储不可用: {0}")]
    Repository(#[from] RepositoryError),

    // ===== 配置错误 =====
    #[error("配置错误: {0}")]
    Config(String),

    // ===== 流程控制 =====
    #[error("导入已取消 (阶段: {0})")]
    Cancelled(ImportPhase),

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::IoFailure {
            path: "unknown".to_string(),
            message: err.to_string(),
        }
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<serde_json::Error>
impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::InvalidStructure(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_error_serializes_with_kind_tag() {
        let err = RecordError::unresolved("aircraft", "N404");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "unresolved_reference");
        assert_eq!(json["field"], "aircraft");
        assert_eq!(err.code(), "UNRESOLVED_REFERENCE");
    }

    #[test]
    fn test_repository_error_converts_to_import_error() {
        let err: ImportError = RepositoryError::LockError("poisoned".to_string()).into();
        assert!(matches!(err, ImportError::Repository(_)));
    }
}
