// ==========================================
// 飞行日志导入导出 - 批量写入器
// ==========================================
// 写入顺序: 按依赖层级 tier 0 → tier 3
// - 层级内各实体类型并发写入（futures::join_all）,上一层级全部结束后才开始下一层级
// - 同类型内的引用（图片 → 图片）按轮次写入,父记录所在轮次先提交
// - 每种类型按 batch_size 分块,每块一个事务,每条记录一个 savepoint
// - 引用列在写入前由自然键绑定为 id（来自先前写入结果或存储）
// - 逐条存储错误: 唯一约束 → WriteConflict; 外键 → UnresolvedReference;
//   存储不可用 → 致命; 其余 → StoreRejected
// ==========================================

use crate::domain::record::CanonicalRecord;
use crate::domain::schema::{self, ColumnType};
use crate::domain::types::{EntityKind, RefTarget, UpsertStatus};
use crate::domain::value::{FieldMap, FieldValue};
use crate::importer::error::{ImportError, ImportResult, RecordError};
use crate::importer::reference_resolver::ArenaEntry;
use crate::repository::entity_repo::{EntityRepository, EntityRow, UpsertOutcome};
use crate::repository::error::{RepositoryError, RepositoryResult};
use futures::future::join_all;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

/// 单条记录的写入结果
#[derive(Debug, Clone)]
pub struct WrittenRecord {
    pub entry: ArenaEntry,
    pub outcome: Result<UpsertOutcome, RecordError>,
}

// ==========================================
// IdRegistry - 自然键 → id 映射
// ==========================================
#[derive(Debug, Default)]
struct IdRegistry {
    ids: HashMap<(EntityKind, String), i64>,
    failed: HashSet<(EntityKind, String)>,
}

impl IdRegistry {
    fn record(&mut self, kind: EntityKind, key: String, outcome: &Result<UpsertOutcome, RecordError>) {
        match outcome {
            Ok(o) => {
                self.ids.insert((kind, key), o.id);
            }
            Err(_) => {
                self.failed.insert((kind, key));
            }
        }
    }
}

/// 一轮待写入的数据: (类型, 已绑定记录, 对应行)
type PreparedKind = (EntityKind, Vec<ArenaEntry>, Vec<EntityRow>);

// ==========================================
// BulkWriter
// ==========================================
pub struct BulkWriter<'a, R: EntityRepository + ?Sized> {
    repo: &'a R,
    batch_size: usize,
    registry: IdRegistry,
}

impl<'a, R: EntityRepository + ?Sized> BulkWriter<'a, R> {
    pub fn new(repo: &'a R, batch_size: usize) -> Self {
        Self {
            repo,
            batch_size: batch_size.max(1),
            registry: IdRegistry::default(),
        }
    }

    /// 写入全部已解析记录
    ///
    /// # 返回
    /// - Ok(Vec): 逐条写入结果（单条失败只影响该记录）
    /// - Err: 存储不可用（已提交的分块保持提交）
    pub async fn write_all(&mut self, entries: Vec<ArenaEntry>) -> ImportResult<Vec<WrittenRecord>> {
        let mut by_kind: BTreeMap<EntityKind, Vec<ArenaEntry>> = BTreeMap::new();
        for entry in entries {
            by_kind.entry(entry.record.kind()).or_default().push(entry);
        }

        let mut written = Vec::new();
        for (tier_idx, tier) in EntityKind::tiers().into_iter().enumerate() {
            let mut pending: Vec<(EntityKind, Vec<ArenaEntry>)> = tier
                .into_iter()
                .filter_map(|kind| by_kind.remove(&kind).map(|entries| (kind, entries)))
                .collect();

            debug!(
                tier = tier_idx,
                kinds = pending.len(),
                "步骤 {}: 写入依赖层级",
                tier_idx + 1
            );

            let mut round = 0;
            while pending.iter().any(|(_, remaining)| !remaining.is_empty()) {
                // 1. 绑定引用 id（顺序执行,只读取已提交的结果）
                let mut prepared: Vec<PreparedKind> = Vec::new();
                for (kind, remaining) in pending.iter_mut() {
                    let wave = take_ready(*kind, remaining);
                    if wave.is_empty() {
                        continue;
                    }
                    let (bound, rows) = self.bind_wave(*kind, wave, &mut written).await?;
                    prepared.push((*kind, bound, rows));
                }

                if round > 0 {
                    debug!(tier = tier_idx, round, "同类型引用: 写入后续轮次");
                }

                // 2. 各类型并发写入
                let results = join_all(
                    prepared
                        .iter()
                        .map(|(kind, _, rows)| self.write_kind(*kind, rows)),
                )
                .await;

                for ((kind, entries, _), result) in prepared.into_iter().zip(results) {
                    let outcomes = result?;
                    for (entry, outcome) in entries.into_iter().zip(outcomes) {
                        let outcome = match outcome {
                            Ok(o) => {
                                log_outcome(kind, &entry, &o);
                                Ok(o)
                            }
                            Err(e) => Err(row_failure(&entry, e)?),
                        };
                        self.registry
                            .record(kind, entry.record.natural_key(), &outcome);
                        written.push(WrittenRecord { entry, outcome });
                    }
                }
                round += 1;
            }
        }

        info!(
            written = written.iter().filter(|w| w.outcome.is_ok()).count(),
            failed = written.iter().filter(|w| w.outcome.is_err()).count(),
            "批量写入完成"
        );
        Ok(written)
    }

    /// 绑定一轮记录的引用;父实体缺失的记录直接计入写入结果
    async fn bind_wave(
        &mut self,
        kind: EntityKind,
        wave: Vec<ArenaEntry>,
        written: &mut Vec<WrittenRecord>,
    ) -> ImportResult<(Vec<ArenaEntry>, Vec<EntityRow>)> {
        let mut rows = Vec::with_capacity(wave.len());
        let mut bound = Vec::with_capacity(wave.len());
        for entry in wave {
            match self.bind_references(&entry.record).await? {
                Ok(fields) => {
                    rows.push(EntityRow {
                        natural_key: entry.record.natural_key(),
                        fields,
                    });
                    bound.push(entry);
                }
                Err(err) => {
                    warn!(
                        row_number = ?entry.row_number,
                        kind = %kind,
                        natural_key = %entry.record.natural_key(),
                        reason = %err,
                        "父实体未写入,记录被拒绝"
                    );
                    self.registry
                        .failed
                        .insert((kind, entry.record.natural_key()));
                    written.push(WrittenRecord {
                        entry,
                        outcome: Err(err),
                    });
                }
            }
        }
        Ok((bound, rows))
    }

    /// 写入一种实体类型（按 batch_size 分块,每块一个事务）
    async fn write_kind(
        &self,
        kind: EntityKind,
        rows: &[EntityRow],
    ) -> RepositoryResult<Vec<RepositoryResult<UpsertOutcome>>> {
        let mut outcomes = Vec::with_capacity(rows.len());
        for (chunk_idx, chunk) in rows.chunks(self.batch_size).enumerate() {
            let chunk_outcomes = self.repo.upsert_batch(kind, chunk).await?;
            debug!(
                kind = %kind,
                chunk = chunk_idx,
                rows = chunk.len(),
                failed = chunk_outcomes.iter().filter(|r| r.is_err()).count(),
                "分块写入已提交"
            );
            outcomes.extend(chunk_outcomes);
        }
        Ok(outcomes)
    }

    /// 将引用列的自然键替换为 id
    ///
    /// 列类型决定存储形式: Ref 存 id,AnyRef 存 "kind:id"。
    /// 作用范围限定的限额目标在记录中是裸自然键,目标类型来自作用范围。
    ///
    /// # 返回
    /// - Ok(Err): 父实体写入失败或不存在（UnresolvedReference）
    /// - Err: 存储不可用
    async fn bind_references(
        &mut self,
        record: &CanonicalRecord,
    ) -> RepositoryResult<Result<FieldMap, RecordError>> {
        let mut fields = record.to_fields();
        let columns = schema::columns(record.kind());

        for view in record.refs() {
            let Some(value) = view.value else {
                continue;
            };

            let target = match view.target {
                RefTarget::Kind(kind) => Some((kind, value)),
                RefTarget::Any => split_tagged(value),
            };
            let Some((target, key)) = target else {
                return Ok(Err(RecordError::unresolved(view.column, value)));
            };

            let tagged = columns
                .iter()
                .any(|c| c.name == view.column && c.ty == ColumnType::AnyRef);

            match self.lookup_id(target, key).await? {
                Some(id) if tagged => {
                    fields.insert(
                        view.column,
                        FieldValue::Text(format!("{}:{}", target.as_str(), id)),
                    );
                }
                Some(id) => {
                    fields.insert(view.column, FieldValue::Integer(id));
                }
                None => return Ok(Err(RecordError::unresolved(view.column, value))),
            }
        }

        Ok(Ok(fields))
    }

    /// 查找父实体 id: 本次写入结果 → 存储;本次写入失败的父实体不回退到存储
    async fn lookup_id(&mut self, kind: EntityKind, key: &str) -> RepositoryResult<Option<i64>> {
        let registry_key = (kind, key.to_string());
        if let Some(id) = self.registry.ids.get(&registry_key) {
            return Ok(Some(*id));
        }
        if self.registry.failed.contains(&registry_key) {
            return Ok(None);
        }

        let found = self.repo.find(kind, key).await?;
        match found {
            Some(stored) => {
                self.registry.ids.insert(registry_key, stored.id);
                Ok(Some(stored.id))
            }
            None => Ok(None),
        }
    }
}

/// "kind:key" 拆分为 (类型, 自然键)
fn split_tagged(value: &str) -> Option<(EntityKind, &str)> {
    let (prefix, key) = value.split_once(':')?;
    prefix.parse::<EntityKind>().ok().map(|kind| (kind, key))
}

/// 记录引用的同类型父记录自然键
fn same_kind_parents(kind: EntityKind, record: &CanonicalRecord) -> Vec<String> {
    record
        .refs()
        .into_iter()
        .filter_map(|view| {
            let value = view.value?;
            match view.target {
                RefTarget::Kind(target) if target == kind => Some(value.to_string()),
                RefTarget::Any => split_tagged(value)
                    .filter(|(target, _)| *target == kind)
                    .map(|(_, key)| key.to_string()),
                RefTarget::Kind(_) => None,
            }
        })
        .collect()
}

/// 取出本轮可写入的记录: 同类型父记录不在待写集合中
///
/// 剩余记录互相引用成环时整体取出,由绑定阶段按未解析拒绝。
fn take_ready(kind: EntityKind, remaining: &mut Vec<ArenaEntry>) -> Vec<ArenaEntry> {
    let pending: HashSet<String> = remaining.iter().map(|e| e.record.natural_key()).collect();
    let (ready, waiting): (Vec<ArenaEntry>, Vec<ArenaEntry>) =
        std::mem::take(remaining).into_iter().partition(|entry| {
            let own_key = entry.record.natural_key();
            same_kind_parents(kind, &entry.record)
                .iter()
                .all(|parent| *parent == own_key || !pending.contains(parent))
        });

    if ready.is_empty() {
        return waiting;
    }
    *remaining = waiting;
    ready
}

/// 逐条存储错误分类
///
/// # 返回
/// - Ok(RecordError): 单条记录拒绝原因
/// - Err: 存储不可用（致命）
fn row_failure(entry: &ArenaEntry, err: RepositoryError) -> ImportResult<RecordError> {
    if err.is_unavailable() {
        return Err(ImportError::Repository(err));
    }

    let key = entry.record.natural_key();
    let message = err.to_string();
    let reason = match err {
        RepositoryError::UniqueConstraintViolation(_) => RecordError::WriteConflict { key, message },
        RepositoryError::ForeignKeyViolation(_) => {
            // 外键失败时存储不报告具体列,列出全部已填写的引用
            let refs = entry.record.refs();
            let present: Vec<(&str, &str)> = refs
                .iter()
                .filter_map(|view| view.value.map(|v| (view.column, v)))
                .collect();
            RecordError::unresolved(
                present.iter().map(|(c, _)| *c).collect::<Vec<_>>().join(","),
                present.iter().map(|(_, v)| *v).collect::<Vec<_>>().join(","),
            )
        }
        _ => RecordError::StoreRejected { key, message },
    };
    Ok(reason)
}

fn log_outcome(kind: EntityKind, entry: &ArenaEntry, outcome: &UpsertOutcome) {
    match outcome.status {
        UpsertStatus::Created | UpsertStatus::Updated => debug!(
            kind = %kind,
            natural_key = %entry.record.natural_key(),
            id = outcome.id,
            status = ?outcome.status,
            stub = entry.stub,
            "记录已写入"
        ),
        UpsertStatus::Unchanged => {}
    }
}
