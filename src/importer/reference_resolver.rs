// ==========================================
// 飞行日志导入导出 - 引用解析器（两遍解析）
// ==========================================
// 第 1 遍: 全部规范记录进入 arena,按 (类型, 自然键) 与 (类型, guid / 源编码) 建立索引
// 第 2 遍: 按依赖层级逐条解析引用
//   当前批次 → 存储 (find) → 缺失引用策略 (CreateStub / Reject)
// 解析成功的引用改写为目标的规范自然键（任意实体引用改写为 "kind:key"）
// ==========================================

use crate::config::PipelineConfig;
use crate::domain::record::{CanonicalRecord, StagedRecord};
use crate::domain::schema::{normalize_key, stub_allowed};
use crate::domain::types::{EntityKind, RefPolicy, RefTarget};
use crate::importer::error::RecordError;
use crate::repository::entity_repo::EntityRepository;
use crate::repository::error::RepositoryResult;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

/// arena 句柄（插入顺序,稳定）
type RecordHandle = usize;

// ==========================================
// ArenaEntry / RecordArena
// ==========================================
#[derive(Debug, Clone)]
pub struct ArenaEntry {
    pub(crate) row_number: Option<usize>, // 桩实体为 None
    pub(crate) raw: Value,
    pub(crate) record: CanonicalRecord,
    pub(crate) rejected: Option<RecordError>,
    pub(crate) stub: bool,
}

impl ArenaEntry {
    pub(crate) fn is_live(&self) -> bool {
        self.rejected.is_none()
    }
}

#[derive(Debug, Default)]
pub struct RecordArena {
    entries: Vec<ArenaEntry>,
    by_key: HashMap<(EntityKind, String), RecordHandle>,
    by_alt: HashMap<(EntityKind, String), RecordHandle>, // guid / 源系统编码
}

impl RecordArena {
    /// 第 1 遍: 收集并建立索引
    pub fn from_staged(records: Vec<StagedRecord>) -> Self {
        let mut arena = Self::default();
        for staged in records {
            arena.push(ArenaEntry {
                row_number: Some(staged.row_number),
                raw: staged.raw,
                record: staged.record,
                rejected: None,
                stub: false,
            });
        }
        arena
    }

    fn push(&mut self, entry: ArenaEntry) -> RecordHandle {
        let handle = self.entries.len();
        let kind = entry.record.kind();

        self.by_key
            .entry((kind, entry.record.natural_key()))
            .or_insert(handle);
        for alt in [entry.record.guid(), entry.record.source_code()]
            .into_iter()
            .flatten()
        {
            self.by_alt.entry((kind, alt.to_string())).or_insert(handle);
        }

        self.entries.push(entry);
        handle
    }

    /// 按自然键（标准化后）→ guid / 源编码 查找
    fn lookup(&self, kind: EntityKind, value: &str) -> Option<RecordHandle> {
        self.by_key
            .get(&(kind, normalize_key(kind, value)))
            .or_else(|| self.by_key.get(&(kind, value.to_string())))
            .or_else(|| self.by_alt.get(&(kind, value.trim().to_string())))
            .copied()
    }

    pub fn into_entries(self) -> Vec<ArenaEntry> {
        self.entries
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// 按依赖层级排列的句柄
    fn handles_in_tier_order(&self) -> Vec<RecordHandle> {
        let mut handles: Vec<RecordHandle> = (0..self.entries.len()).collect();
        handles.sort_by_key(|&h| self.entries[h].record.kind().tier());
        handles
    }
}

/// 解析统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveStats {
    pub resolved: usize,
    pub stubs_created: usize,
    pub rejected: usize,
}

/// 单个引用的解析结果
enum Resolution {
    Resolved(String),
    Rejected(RecordError),
}

// ==========================================
// ReferenceResolver
// ==========================================
pub struct ReferenceResolver<'a, R: EntityRepository + ?Sized> {
    repo: &'a R,
    config: &'a PipelineConfig,
    store_cache: HashMap<(EntityKind, String), Option<String>>,
}

impl<'a, R: EntityRepository + ?Sized> ReferenceResolver<'a, R> {
    pub fn new(repo: &'a R, config: &'a PipelineConfig) -> Self {
        Self {
            repo,
            config,
            store_cache: HashMap::new(),
        }
    }

    /// 第 2 遍: 解析 arena 中全部引用
    ///
    /// # 返回
    /// - Err: 存储不可用（致命）
    pub async fn resolve(&mut self, arena: &mut RecordArena) -> RepositoryResult<ResolveStats> {
        let mut stats = ResolveStats::default();

        // 桩实体在循环中追加,属于 tier 0 且无引用,无需再次解析
        for handle in arena.handles_in_tier_order() {
            if !arena.entries[handle].is_live() {
                continue;
            }

            let refs: Vec<(&'static str, &'static str, RefTarget, String)> = arena.entries[handle]
                .record
                .refs()
                .into_iter()
                .filter_map(|r| r.value.map(|v| (r.relation, r.column, r.target, v.to_string())))
                .collect();

            let mut rewrites: Vec<(&'static str, String)> = Vec::with_capacity(refs.len());
            let mut failure: Option<RecordError> = None;

            for (relation, column, target, value) in refs {
                let resolution = match target {
                    RefTarget::Kind(kind) => {
                        self.resolve_kind(arena, relation, column, kind, &value, &mut stats)
                            .await?
                    }
                    RefTarget::Any => self.resolve_any(arena, column, &value).await?,
                };

                match resolution {
                    Resolution::Resolved(canonical) => rewrites.push((column, canonical)),
                    Resolution::Rejected(err) => {
                        failure = Some(err);
                        break;
                    }
                }
            }

            let entry = &mut arena.entries[handle];
            match failure {
                Some(err) => {
                    warn!(
                        row_number = ?entry.row_number,
                        kind = %entry.record.kind(),
                        natural_key = %entry.record.natural_key(),
                        reason = %err,
                        "引用解析失败,记录被拒绝"
                    );
                    entry.rejected = Some(err);
                    stats.rejected += 1;
                }
                None => {
                    stats.resolved += rewrites.len();
                    apply_rewrites(&mut entry.record, rewrites);
                }
            }
        }

        debug!(
            resolved = stats.resolved,
            stubs_created = stats.stubs_created,
            rejected = stats.rejected,
            "引用解析完成"
        );
        Ok(stats)
    }

    /// 指定类型的引用
    async fn resolve_kind(
        &mut self,
        arena: &mut RecordArena,
        relation: &str,
        column: &str,
        kind: EntityKind,
        value: &str,
        stats: &mut ResolveStats,
    ) -> RepositoryResult<Resolution> {
        // 1. 当前批次
        let mut seen_rejected = false;
        if let Some(h) = arena.lookup(kind, value) {
            let entry = &arena.entries[h];
            if entry.is_live() {
                return Ok(Resolution::Resolved(entry.record.natural_key()));
            }
            seen_rejected = true;
        }

        // 2. 存储
        if let Some(key) = self.find_in_store(kind, value).await? {
            return Ok(Resolution::Resolved(key));
        }

        // 3. 缺失引用策略（批次内存在但已被拒绝的目标不创建桩实体）
        let policy = self.config.policy_for(relation);
        if policy == RefPolicy::CreateStub && stub_allowed(kind) && !seen_rejected {
            if let Some(stub) = CanonicalRecord::stub(kind, value) {
                let key = stub.natural_key();
                debug!(kind = %kind, natural_key = %key, relation, "创建占位实体");
                arena.push(ArenaEntry {
                    row_number: None,
                    raw: Value::Null,
                    record: stub,
                    rejected: None,
                    stub: true,
                });
                stats.stubs_created += 1;
                return Ok(Resolution::Resolved(key));
            }
        }

        Ok(Resolution::Rejected(RecordError::unresolved(column, value)))
    }

    /// 任意实体引用: "kind:key" 或跨类型查找（Flight 优先）;不创建桩实体
    async fn resolve_any(
        &mut self,
        arena: &RecordArena,
        column: &str,
        value: &str,
    ) -> RepositoryResult<Resolution> {
        let tagged = value
            .split_once(':')
            .and_then(|(prefix, rest)| prefix.parse::<EntityKind>().ok().map(|k| (k, rest)));
        let candidates: Vec<(EntityKind, &str)> = match tagged {
            Some(target) => vec![target],
            None => std::iter::once(EntityKind::Flight)
                .chain(EntityKind::ALL.into_iter().filter(|k| *k != EntityKind::Flight))
                .map(|k| (k, value))
                .collect(),
        };

        for &(kind, key) in &candidates {
            if let Some(h) = arena.lookup(kind, key) {
                let entry = &arena.entries[h];
                if entry.is_live() {
                    return Ok(Resolution::Resolved(format!(
                        "{}:{}",
                        kind.as_str(),
                        entry.record.natural_key()
                    )));
                }
            }
        }

        for &(kind, key) in &candidates {
            if let Some(natural_key) = self.find_in_store(kind, key).await? {
                return Ok(Resolution::Resolved(format!("{}:{}", kind.as_str(), natural_key)));
            }
        }

        Ok(Resolution::Rejected(RecordError::unresolved(column, value)))
    }

    /// 存储查找（带缓存）: 先按标准化值,再按原值
    async fn find_in_store(
        &mut self,
        kind: EntityKind,
        value: &str,
    ) -> RepositoryResult<Option<String>> {
        let normalized = normalize_key(kind, value);
        let cache_key = (kind, normalized.clone());
        if let Some(cached) = self.store_cache.get(&cache_key) {
            return Ok(cached.clone());
        }

        let mut found = self.repo.find(kind, &normalized).await?;
        if found.is_none() && normalized != value {
            found = self.repo.find(kind, value).await?;
        }

        let key = found.map(|e| e.natural_key);
        self.store_cache.insert(cache_key, key.clone());
        Ok(key)
    }
}

/// 将解析结果写回记录
fn apply_rewrites(record: &mut CanonicalRecord, rewrites: Vec<(&'static str, String)>) {
    for (column, canonical) in rewrites {
        if column == "parent" {
            if let Some(parent) = record.image_parent_mut() {
                *parent = canonical;
                continue;
            }
        }
        if let Some(slot) = record
            .ref_slots()
            .into_iter()
            .find(|slot| slot.column == column)
        {
            *slot.value = Some(canonical);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::{Flight, Image};
    use crate::domain::value::FieldValue;
    use crate::repository::sqlite_repo::SqliteEntityRepository;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::collections::BTreeMap;
    use tempfile::NamedTempFile;

    fn create_repo() -> (NamedTempFile, SqliteEntityRepository) {
        let file = NamedTempFile::new().unwrap();
        let repo = SqliteEntityRepository::new(file.path().to_str().unwrap()).unwrap();
        (file, repo)
    }

    fn flight(row: usize, key: &str, aircraft: &str, pilot: Option<&str>) -> StagedRecord {
        StagedRecord {
            row_number: row,
            raw: json!({"flight": key}),
            record: CanonicalRecord::Flight(Flight {
                flight_key: key.to_string(),
                guid: None,
                source_code: None,
                date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
                aircraft: Some(aircraft.to_string()),
                pilot: pilot.map(str::to_string),
                origin: None,
                destination: None,
                route: None,
                departure_time: None,
                arrival_time: None,
                total_minutes: None,
                pic_minutes: None,
                sic_minutes: None,
                night_minutes: None,
                ifr_minutes: None,
                cross_country_minutes: None,
                dual_minutes: None,
                day_takeoffs: None,
                night_takeoffs: None,
                day_landings: None,
                night_landings: None,
                holds: None,
                approaches: None,
                distance: None,
                remarks: None,
            }),
        }
    }

    fn stub_staged(row: usize, kind: EntityKind, key: &str) -> StagedRecord {
        StagedRecord {
            row_number: row,
            raw: json!({}),
            record: CanonicalRecord::stub(kind, key).unwrap(),
        }
    }

    fn flight_aircraft(entry: &ArenaEntry) -> Option<String> {
        match &entry.record {
            CanonicalRecord::Flight(f) => f.aircraft.clone(),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_forward_reference_resolves_in_batch() {
        let (_file, repo) = create_repo();
        let config = PipelineConfig::default();

        let mut arena = RecordArena::from_staged(vec![
            flight(1, "F1", "n123ab", Some("J.DOE")),
            stub_staged(2, EntityKind::Aircraft, "N123AB"),
            stub_staged(3, EntityKind::Pilot, "J.DOE"),
        ]);

        let stats = ReferenceResolver::new(&repo, &config)
            .resolve(&mut arena)
            .await
            .unwrap();

        assert_eq!(stats.rejected, 0);
        assert_eq!(stats.stubs_created, 0);
        assert_eq!(flight_aircraft(&arena.entries[0]).as_deref(), Some("N123AB"));
    }

    #[tokio::test]
    async fn test_reject_policy_reports_unresolved() {
        let (_file, repo) = create_repo();
        let config = PipelineConfig::default();

        let mut arena = RecordArena::from_staged(vec![flight(1, "F1", "N999", None)]);
        let stats = ReferenceResolver::new(&repo, &config)
            .resolve(&mut arena)
            .await
            .unwrap();

        assert_eq!(stats.rejected, 1);
        assert_eq!(
            arena.entries[0].rejected,
            Some(RecordError::unresolved("aircraft", "N999"))
        );
    }

    #[tokio::test]
    async fn test_stub_created_once_per_key() {
        let (_file, repo) = create_repo();
        let config = PipelineConfig {
            auto_create_missing_refs: true,
            ..PipelineConfig::default()
        };

        let mut arena = RecordArena::from_staged(vec![
            flight(1, "F1", "N999", None),
            flight(2, "F2", "n999", None),
        ]);
        let stats = ReferenceResolver::new(&repo, &config)
            .resolve(&mut arena)
            .await
            .unwrap();

        assert_eq!(stats.stubs_created, 1);
        assert_eq!(arena.len(), 3);
        assert!(arena.entries[2].stub);
        assert_eq!(flight_aircraft(&arena.entries[1]).as_deref(), Some("N999"));
    }

    #[tokio::test]
    async fn test_per_relationship_policy_overrides_default() {
        let (_file, repo) = create_repo();
        let mut policies = BTreeMap::new();
        policies.insert("flight.pilot".to_string(), RefPolicy::CreateStub);
        let config = PipelineConfig {
            relationship_policies: policies,
            ..PipelineConfig::default()
        };

        let mut arena = RecordArena::from_staged(vec![
            stub_staged(1, EntityKind::Aircraft, "N1"),
            flight(2, "F1", "N1", Some("NEW.PILOT")),
        ]);
        let stats = ReferenceResolver::new(&repo, &config)
            .resolve(&mut arena)
            .await
            .unwrap();

        assert_eq!(stats.rejected, 0);
        assert_eq!(stats.stubs_created, 1);
    }

    #[tokio::test]
    async fn test_store_reference_resolves_by_guid() {
        let (_file, repo) = create_repo();
        let mut fields = CanonicalRecord::stub(EntityKind::Aircraft, "N777").unwrap().to_fields();
        fields.insert("guid", FieldValue::Text("AC-GUID".to_string()));
        repo.upsert(EntityKind::Aircraft, "N777", &fields).await.unwrap();

        let config = PipelineConfig::default();
        let mut arena = RecordArena::from_staged(vec![flight(1, "F1", "AC-GUID", None)]);
        ReferenceResolver::new(&repo, &config)
            .resolve(&mut arena)
            .await
            .unwrap();

        assert!(arena.entries[0].is_live());
        assert_eq!(flight_aircraft(&arena.entries[0]).as_deref(), Some("N777"));
    }

    #[tokio::test]
    async fn test_any_reference_never_stubbed() {
        let (_file, repo) = create_repo();
        let config = PipelineConfig {
            auto_create_missing_refs: true,
            ..PipelineConfig::default()
        };

        let image = |parent: &str| StagedRecord {
            row_number: 3,
            raw: json!({}),
            record: CanonicalRecord::Image(Image {
                image_key: format!("IMG-{}", parent),
                guid: None,
                source_code: None,
                parent: parent.to_string(),
                file_name: None,
                file_ext: None,
                file_path: None,
            }),
        };

        let mut arena = RecordArena::from_staged(vec![
            stub_staged(1, EntityKind::Aircraft, "N1"),
            flight(2, "F1", "N1", None),
            image("F1"),
            image("GHOST"),
        ]);
        let stats = ReferenceResolver::new(&repo, &config)
            .resolve(&mut arena)
            .await
            .unwrap();

        assert_eq!(stats.stubs_created, 0);
        match &arena.entries[2].record {
            CanonicalRecord::Image(i) => assert_eq!(i.parent, "flight:F1"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            arena.entries[3].rejected,
            Some(RecordError::unresolved("parent", "GHOST"))
        );
    }

    #[tokio::test]
    async fn test_dependent_of_rejected_parent_is_rejected() {
        let (_file, repo) = create_repo();
        let config = PipelineConfig::default();

        let image = StagedRecord {
            row_number: 2,
            raw: json!({}),
            record: CanonicalRecord::Image(Image {
                image_key: "IMG1".to_string(),
                guid: None,
                source_code: None,
                parent: "flight:F1".to_string(),
                file_name: None,
                file_ext: None,
                file_path: None,
            }),
        };

        // 航班引用的飞机不存在 → 航班被拒绝 → 依赖它的图片也被拒绝
        let mut arena = RecordArena::from_staged(vec![image, flight(1, "F1", "N404", None)]);
        let stats = ReferenceResolver::new(&repo, &config)
            .resolve(&mut arena)
            .await
            .unwrap();

        assert_eq!(stats.rejected, 2);
        assert!(!arena.entries[0].is_live());
    }
}
