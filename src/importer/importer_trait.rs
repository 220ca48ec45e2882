// ==========================================
// 飞行日志导入导出 - 导入组件 Trait 定义
// ==========================================
// 流程: 解析 → 分类 → 规范化 → 冲突检测 → 引用解析 → 写入
// ==========================================

use crate::domain::record::{CanonicalRecord, RawRecord, StagedRecord};
use crate::domain::types::EntityKind;
use crate::importer::cancel::CancelToken;
use crate::importer::error::{ImportResult, RecordError};
use crate::importer::report::ImportReport;
use async_trait::async_trait;
use std::path::Path;

// ==========================================
// FileParser - 文件解析器
// ==========================================
pub trait FileParser: Send + Sync {
    /// 解析文件为原始记录列表（行号从 1 开始）
    ///
    /// # 返回
    /// - Err: 文件不可读或顶层结构无效（致命）
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<Vec<RawRecord>>;
}

// ==========================================
// RecordClassifier - 记录分类器
// ==========================================
pub trait RecordClassifier: Send + Sync {
    fn classify(&self, raw: &RawRecord) -> Result<EntityKind, RecordError>;
}

// ==========================================
// FieldNormalizer - 字段规范化
// ==========================================
pub trait FieldNormalizer: Send + Sync {
    /// 将原始记录映射为指定类型的规范记录
    ///
    /// # 返回
    /// - Err(MalformedField): 必填字段缺失/无法解析,或违反实体约束
    fn normalize(&self, raw: &RawRecord, kind: EntityKind) -> Result<CanonicalRecord, RecordError>;
}

// ==========================================
// ConflictHandler - 冲突处理器
// ==========================================

/// 同一文件内的重复自然键
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateRecord {
    pub index: usize, // 在输入切片中的位置
    pub row_number: usize,
    pub first_row: usize,
    pub kind: EntityKind,
    pub natural_key: String,
    pub identical: bool, // 与首条记录内容完全一致
}

pub trait ConflictHandler: Send + Sync {
    /// 检测同批次内重复自然键
    ///
    /// # 返回
    /// - 重复记录列表（不包括第一次出现）
    fn detect_duplicates(&self, records: &[StagedRecord]) -> Vec<DuplicateRecord>;
}

// ==========================================
// LogbookImporter - 导入器
// ==========================================
#[async_trait]
pub trait LogbookImporter: Send + Sync {
    /// 导入文件
    async fn import_file(&self, file_path: &Path) -> ImportResult<ImportReport>;

    /// 导入文件（可在阶段之间取消）
    async fn import_file_with_cancel(
        &self,
        file_path: &Path,
        cancel: &CancelToken,
    ) -> ImportResult<ImportReport>;
}
