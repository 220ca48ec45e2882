// ==========================================
// 飞行日志导入导出 - 导入报告
// ==========================================
// 职责: 汇总计数 + 拒绝记录明细（行号 / 类型 / 键 / 原始记录 / 原因）
// 说明: 逐条错误不向外抛出,报告是唯一出口
// ==========================================

use crate::domain::types::{EntityKind, ImportPhase, UpsertStatus};
use crate::importer::error::RecordError;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// 被拒绝的记录
#[derive(Debug, Clone, Serialize)]
pub struct Rejection {
    pub row_number: usize,
    pub kind: Option<EntityKind>,
    pub natural_key: Option<String>,
    pub record: Value,
    pub reason: RecordError,
}

/// 单一实体类型的统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KindStats {
    pub accepted: usize,
    pub rejected: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub stubs_created: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub run_id: String,
    pub source: String,
    pub phase: ImportPhase,
    pub total_records: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub rejections: Vec<Rejection>,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub stubs_created: usize,
    pub duplicates_merged: usize,
    pub per_kind: BTreeMap<EntityKind, KindStats>,
    pub aborted: bool,
    pub elapsed_ms: u64,
}

impl ImportReport {
    pub fn new(run_id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            source: source.into(),
            phase: ImportPhase::Idle,
            total_records: 0,
            accepted: 0,
            rejected: 0,
            rejections: Vec::new(),
            created: 0,
            updated: 0,
            unchanged: 0,
            stubs_created: 0,
            duplicates_merged: 0,
            per_kind: BTreeMap::new(),
            aborted: false,
            elapsed_ms: 0,
        }
    }

    /// 记录一条拒绝
    pub fn reject(&mut self, rejection: Rejection) {
        self.rejected += 1;
        if let Some(kind) = rejection.kind {
            self.per_kind.entry(kind).or_default().rejected += 1;
        }
        self.rejections.push(rejection);
    }

    /// 记录一次成功写入（桩实体单独计数,不计入 accepted）
    pub fn record_write(&mut self, kind: EntityKind, status: UpsertStatus, stub: bool) {
        let stats = self.per_kind.entry(kind).or_default();
        match status {
            UpsertStatus::Created => {
                self.created += 1;
                stats.created += 1;
            }
            UpsertStatus::Updated => {
                self.updated += 1;
                stats.updated += 1;
            }
            UpsertStatus::Unchanged => {
                self.unchanged += 1;
                stats.unchanged += 1;
            }
        }

        if stub {
            self.stubs_created += 1;
            stats.stubs_created += 1;
        } else {
            self.accepted += 1;
            stats.accepted += 1;
        }
    }

    /// 合并的同键完全重复记录视为已接受
    pub fn record_merged_duplicate(&mut self, kind: EntityKind) {
        self.duplicates_merged += 1;
        self.accepted += 1;
        self.per_kind.entry(kind).or_default().accepted += 1;
    }

    pub fn has_rejections(&self) -> bool {
        self.rejected > 0
    }

    /// 可观察的存储变化（新增 + 更新）
    pub fn changed(&self) -> usize {
        self.created + self.updated
    }
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "导入报告 [{}] {}", self.run_id, self.source)?;
        writeln!(
            f,
            "  阶段: {}{}",
            self.phase,
            if self.aborted { "（严格模式中止,未写入）" } else { "" }
        )?;
        writeln!(
            f,
            "  记录: 总计 {} / 接受 {} / 拒绝 {} / 合并重复 {}",
            self.total_records, self.accepted, self.rejected, self.duplicates_merged
        )?;
        writeln!(
            f,
            "  写入: 新增 {} / 更新 {} / 未变 {} / 桩实体 {}",
            self.created, self.updated, self.unchanged, self.stubs_created
        )?;

        for (kind, stats) in &self.per_kind {
            writeln!(
                f,
                "  - {:<14} 接受 {:>5}  拒绝 {:>5}  新增 {:>5}  更新 {:>5}  未变 {:>5}",
                kind.as_str(),
                stats.accepted,
                stats.rejected,
                stats.created,
                stats.updated,
                stats.unchanged
            )?;
        }

        if !self.rejections.is_empty() {
            writeln!(f, "  拒绝明细:")?;
            for r in &self.rejections {
                writeln!(
                    f,
                    "    行 {:>5} [{}] {} : {}",
                    r.row_number,
                    r.kind.map(|k| k.as_str()).unwrap_or("?"),
                    r.natural_key.as_deref().unwrap_or("-"),
                    r.reason
                )?;
            }
        }

        write!(f, "  耗时: {} ms", self.elapsed_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_counters() {
        let mut report = ImportReport::new("run-1", "logbook.json");
        report.record_write(EntityKind::Aircraft, UpsertStatus::Created, false);
        report.record_write(EntityKind::Aircraft, UpsertStatus::Created, true);
        report.record_write(EntityKind::Flight, UpsertStatus::Unchanged, false);
        report.reject(Rejection {
            row_number: 4,
            kind: Some(EntityKind::Flight),
            natural_key: None,
            record: json!({"date": "x"}),
            reason: RecordError::malformed("date", "无法解析日期: x"),
        });

        assert_eq!(report.accepted, 2);
        assert_eq!(report.stubs_created, 1);
        assert_eq!(report.created, 2);
        assert_eq!(report.unchanged, 1);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.changed(), 2);
        assert_eq!(report.per_kind[&EntityKind::Aircraft].created, 2);
        assert_eq!(report.per_kind[&EntityKind::Flight].rejected, 1);
    }

    #[test]
    fn test_serialize_rejection_reason() {
        let mut report = ImportReport::new("run-1", "logbook.json");
        report.reject(Rejection {
            row_number: 2,
            kind: None,
            natural_key: None,
            record: json!({"foo": 1}),
            reason: RecordError::UnclassifiableRecord {
                hint: "字段 [foo] 不符合任何实体形状".to_string(),
            },
        });

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["rejections"][0]["reason"]["kind"], "unclassifiable_record");
        assert_eq!(value["rejections"][0]["row_number"], 2);
    }

    #[test]
    fn test_display_lists_rejections() {
        let mut report = ImportReport::new("run-1", "logbook.json");
        report.reject(Rejection {
            row_number: 7,
            kind: Some(EntityKind::Aircraft),
            natural_key: None,
            record: json!({}),
            reason: RecordError::malformed("registration", "必填字段缺失"),
        });
        let text = report.to_string();
        assert!(text.contains("行     7 [aircraft]"));
    }
}
