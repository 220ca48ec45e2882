// ==========================================
// 飞行日志导入导出 - 导入器实现
// ==========================================
// 职责: 整合导入流程,从文件到存储
// 流程: 解析 → 分类 → 规范化 → 冲突检测 → 引用解析（两遍）→ 分层批量写入 → 报告
// 致命错误: 输入不可读 / 顶层结构无效 / 存储不可用 / 调用方取消
// 逐条错误: 收集进报告,不向外抛出
// ==========================================

use crate::config::PipelineConfig;
use crate::domain::record::StagedRecord;
use crate::domain::types::ImportPhase;
use crate::importer::bulk_writer::BulkWriter;
use crate::importer::cancel::CancelToken;
use crate::importer::conflict_handler::NaturalKeyConflictHandler;
use crate::importer::error::{ImportError, ImportResult, RecordError};
use crate::importer::field_mapper::FieldMapper;
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::importer_trait::{
    ConflictHandler, FieldNormalizer, FileParser, LogbookImporter, RecordClassifier,
};
use crate::importer::record_classifier::ShapeClassifier;
use crate::importer::reference_resolver::{RecordArena, ReferenceResolver};
use crate::importer::report::{ImportReport, Rejection};
use crate::repository::entity_repo::EntityRepository;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// PilotLogImporter - 飞行日志导入器
// ==========================================
pub struct PilotLogImporter<R>
where
    R: EntityRepository,
{
    // 数据访问层
    repo: R,

    // 管道配置
    config: PipelineConfig,

    // 导入组件
    file_parser: Box<dyn FileParser>,
    classifier: Box<dyn RecordClassifier>,
    normalizer: Box<dyn FieldNormalizer>,
    conflict_handler: Box<dyn ConflictHandler>,
}

impl<R> PilotLogImporter<R>
where
    R: EntityRepository,
{
    /// 创建导入器
    ///
    /// # 参数
    /// - repo: 实体仓储
    /// - config: 管道配置
    /// - file_parser: 文件解析器
    /// - classifier: 记录分类器
    /// - normalizer: 字段规范化器
    /// - conflict_handler: 冲突处理器
    pub fn new(
        repo: R,
        config: PipelineConfig,
        file_parser: Box<dyn FileParser>,
        classifier: Box<dyn RecordClassifier>,
        normalizer: Box<dyn FieldNormalizer>,
        conflict_handler: Box<dyn ConflictHandler>,
    ) -> Self {
        Self {
            repo,
            config,
            file_parser,
            classifier,
            normalizer,
            conflict_handler,
        }
    }

    /// 使用默认组件创建导入器
    pub fn with_defaults(repo: R, config: PipelineConfig) -> Self {
        let normalizer = FieldMapper::from_config(&config);
        Self::new(
            repo,
            config,
            Box::new(UniversalFileParser),
            Box::new(ShapeClassifier),
            Box::new(normalizer),
            Box::new(NaturalKeyConflictHandler),
        )
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// 阶段切换（切换前检查取消令牌）
    fn enter_phase(
        &self,
        report: &mut ImportReport,
        phase: ImportPhase,
        cancel: &CancelToken,
    ) -> ImportResult<()> {
        if cancel.is_cancelled() {
            warn!(run_id = %report.run_id, phase = %report.phase, "导入已被调用方取消");
            return Err(ImportError::Cancelled(report.phase));
        }
        debug!(from = %report.phase, to = %phase, "阶段切换");
        report.phase = phase;
        Ok(())
    }

    /// 分类 + 规范化（逐条,失败记录进入报告）
    fn classify_and_normalize(
        &self,
        raw_records: Vec<crate::domain::record::RawRecord>,
        report: &mut ImportReport,
    ) -> Vec<StagedRecord> {
        let mut staged = Vec::with_capacity(raw_records.len());

        for raw in raw_records {
            let kind = match self.classifier.classify(&raw) {
                Ok(kind) => kind,
                Err(e) => {
                    warn!(row_number = raw.row_number, reason = %e, "记录无法分类");
                    report.reject(Rejection {
                        row_number: raw.row_number,
                        kind: None,
                        natural_key: None,
                        record: raw.to_value(),
                        reason: e,
                    });
                    continue;
                }
            };

            match self.normalizer.normalize(&raw, kind) {
                Ok(record) => staged.push(StagedRecord {
                    row_number: raw.row_number,
                    raw: raw.to_value(),
                    record,
                }),
                Err(e) => {
                    warn!(row_number = raw.row_number, kind = %kind, reason = %e, "字段规范化失败");
                    report.reject(Rejection {
                        row_number: raw.row_number,
                        kind: Some(kind),
                        natural_key: None,
                        record: raw.to_value(),
                        reason: e,
                    });
                }
            }
        }

        staged
    }

    /// 同文件重复键处理: 完全一致的后续记录合并,内容不同的拒绝
    fn handle_duplicates(
        &self,
        staged: Vec<StagedRecord>,
        report: &mut ImportReport,
    ) -> Vec<StagedRecord> {
        let duplicates = self.conflict_handler.detect_duplicates(&staged);
        if duplicates.is_empty() {
            return staged;
        }

        let mut dropped = HashSet::with_capacity(duplicates.len());
        for dup in &duplicates {
            dropped.insert(dup.index);
            if dup.identical {
                debug!(
                    row_number = dup.row_number,
                    first_row = dup.first_row,
                    kind = %dup.kind,
                    natural_key = %dup.natural_key,
                    "合并完全重复的记录"
                );
                report.record_merged_duplicate(dup.kind);
            } else {
                warn!(
                    row_number = dup.row_number,
                    first_row = dup.first_row,
                    kind = %dup.kind,
                    natural_key = %dup.natural_key,
                    "同一文件内自然键冲突"
                );
                report.reject(Rejection {
                    row_number: dup.row_number,
                    kind: Some(dup.kind),
                    natural_key: Some(dup.natural_key.clone()),
                    record: staged[dup.index].raw.clone(),
                    reason: RecordError::WriteConflict {
                        key: dup.natural_key.clone(),
                        message: format!("与第 {} 行的记录自然键相同但内容不同", dup.first_row),
                    },
                });
            }
        }

        staged
            .into_iter()
            .enumerate()
            .filter(|(idx, _)| !dropped.contains(idx))
            .map(|(_, s)| s)
            .collect()
    }

    fn finish(&self, report: &mut ImportReport, start: Instant) {
        report.phase = ImportPhase::Reported;
        report.elapsed_ms = start.elapsed().as_millis() as u64;
    }
}

#[async_trait]
impl<R> LogbookImporter for PilotLogImporter<R>
where
    R: EntityRepository,
{
    async fn import_file(&self, file_path: &Path) -> ImportResult<ImportReport> {
        self.import_file_with_cancel(file_path, &CancelToken::new())
            .await
    }

    /// 导入文件
    ///
    /// # 返回
    /// - Ok(ImportReport): 导入报告（含逐条拒绝明细）
    /// - Err: 致命错误（部分已提交的分块保持提交）
    #[instrument(skip(self, file_path, cancel), fields(run_id))]
    async fn import_file_with_cancel(
        &self,
        file_path: &Path,
        cancel: &CancelToken,
    ) -> ImportResult<ImportReport> {
        let start = Instant::now();
        let run_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("run_id", run_id.as_str());

        let mut report = ImportReport::new(run_id.clone(), file_path.display().to_string());
        info!(
            run_id = %run_id,
            file_path = %file_path.display(),
            strict_mode = self.config.strict_mode,
            batch_size = self.config.batch_size,
            "开始导入飞行日志"
        );

        // === 步骤 1: 解析文件 ===
        self.enter_phase(&mut report, ImportPhase::Reading, cancel)?;
        debug!("步骤 1: 解析文件");
        let raw_records = self
            .file_parser
            .parse_to_raw_records(file_path)
            .map_err(|e| {
                error!(error = %e, "文件解析失败");
                e
            })?;
        report.total_records = raw_records.len();
        info!(total_records = raw_records.len(), "文件解析完成");

        // === 步骤 2: 分类与规范化 ===
        self.enter_phase(&mut report, ImportPhase::ClassifyingNormalizing, cancel)?;
        debug!("步骤 2: 分类与规范化");
        let staged = self.classify_and_normalize(raw_records, &mut report);
        info!(
            staged = staged.len(),
            rejected = report.rejected,
            "分类与规范化完成"
        );

        // === 步骤 3: 冲突检测 ===
        debug!("步骤 3: 冲突检测");
        let staged = self.handle_duplicates(staged, &mut report);

        // === 步骤 4: 引用解析 ===
        self.enter_phase(&mut report, ImportPhase::Resolving, cancel)?;
        debug!("步骤 4: 引用解析");
        let mut arena = RecordArena::from_staged(staged);
        let stats = ReferenceResolver::new(&self.repo, &self.config)
            .resolve(&mut arena)
            .await?;
        info!(
            resolved = stats.resolved,
            stubs = stats.stubs_created,
            rejected = stats.rejected,
            "引用解析完成"
        );

        let mut live = Vec::with_capacity(arena.len());
        for mut entry in arena.into_entries() {
            match entry.rejected.take() {
                Some(reason) => report.reject(Rejection {
                    row_number: entry.row_number.unwrap_or_default(),
                    kind: Some(entry.record.kind()),
                    natural_key: Some(entry.record.natural_key()),
                    record: entry.raw,
                    reason,
                }),
                None => live.push(entry),
            }
        }

        // 严格模式: 写入前出现任何拒绝 → 不写入
        if self.config.strict_mode && report.has_rejections() {
            report.aborted = true;
            self.finish(&mut report, start);
            warn!(
                run_id = %run_id,
                rejected = report.rejected,
                "严格模式: 存在被拒绝的记录,未执行任何写入"
            );
            return Ok(report);
        }

        // === 步骤 5: 分层批量写入 ===
        self.enter_phase(&mut report, ImportPhase::Writing, cancel)?;
        debug!("步骤 5: 分层批量写入");
        let written = BulkWriter::new(&self.repo, self.config.batch_size)
            .write_all(live)
            .await?;

        for w in written {
            let kind = w.entry.record.kind();
            match w.outcome {
                Ok(outcome) => report.record_write(kind, outcome.status, w.entry.stub),
                Err(reason) => report.reject(Rejection {
                    row_number: w.entry.row_number.unwrap_or_default(),
                    kind: Some(kind),
                    natural_key: Some(w.entry.record.natural_key()),
                    record: w.entry.raw,
                    reason,
                }),
            }
        }

        self.finish(&mut report, start);
        info!(
            run_id = %run_id,
            total = report.total_records,
            accepted = report.accepted,
            rejected = report.rejected,
            created = report.created,
            updated = report.updated,
            unchanged = report.unchanged,
            stubs_created = report.stubs_created,
            elapsed_ms = report.elapsed_ms,
            "飞行日志导入完成"
        );

        Ok(report)
    }
}
