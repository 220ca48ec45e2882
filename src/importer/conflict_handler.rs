// ==========================================
// 飞行日志导入导出 - 冲突处理器实现
// ==========================================
// 职责: 检测同一文件内重复的 (实体类型, 自然键)
// 策略: 与首条记录完全一致 → 合并（丢弃后续记录）;内容不同 → WriteConflict
// ==========================================

use crate::domain::record::StagedRecord;
use crate::domain::types::EntityKind;
use crate::importer::importer_trait::{ConflictHandler, DuplicateRecord};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct NaturalKeyConflictHandler;

impl ConflictHandler for NaturalKeyConflictHandler {
    fn detect_duplicates(&self, records: &[StagedRecord]) -> Vec<DuplicateRecord> {
        let mut first_occurrence: HashMap<(EntityKind, String), usize> = HashMap::new();
        let mut duplicates = Vec::new();

        for (index, staged) in records.iter().enumerate() {
            let kind = staged.record.kind();
            let natural_key = staged.record.natural_key();

            match first_occurrence.get(&(kind, natural_key.clone())) {
                Some(&first_index) => {
                    let first = &records[first_index];
                    duplicates.push(DuplicateRecord {
                        index,
                        row_number: staged.row_number,
                        first_row: first.row_number,
                        kind,
                        natural_key,
                        identical: first.record == staged.record,
                    });
                }
                None => {
                    first_occurrence.insert((kind, natural_key), index);
                }
            }
        }

        duplicates
    }
}
