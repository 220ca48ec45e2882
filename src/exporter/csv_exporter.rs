// ==========================================
// 飞行日志导入导出 - CSV 导出器
// ==========================================
// 职责: 读取全部存储行,将 id 引用还原为自然键,写出 CSV
// 格式: 每个实体一行,固定列;首列 table,次列为自然键列
// - 引用列渲染为目标自然键;任意实体引用渲染为 "kind:key"
// - 日期 ISO,布尔值 true/false
// ==========================================

use crate::domain::schema::{self, ColumnType};
use crate::domain::types::EntityKind;
use crate::domain::value::FieldValue;
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::entity_repo::{EntityRepository, StoredEntity};
use csv::Writer;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

const TABLE_COLUMN: &str = "table";

/// 导出布局
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportLayout {
    #[default]
    Unified, // 单一文件,列为各类型列的并集
    PerEntity, // 每种类型一个文件: <stem>_<type>.csv
}

/// 导出汇总
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportSummary {
    pub rows_per_kind: BTreeMap<EntityKind, usize>,
    pub files: Vec<PathBuf>,
    pub total_rows: usize,
}

/// 已加载的存储快照
struct Snapshot {
    rows: Vec<(EntityKind, Vec<StoredEntity>)>,
    keys_by_id: HashMap<(EntityKind, i64), String>,
}

// ==========================================
// CsvExporter
// ==========================================
pub struct CsvExporter<R>
where
    R: EntityRepository,
{
    repo: R,
}

impl<R> CsvExporter<R>
where
    R: EntityRepository,
{
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// 导出全部实体
    ///
    /// # 参数
    /// - path: 目标文件（PerEntity 布局下作为文件名前缀）
    /// - layout: 导出布局
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn export(&self, path: &Path, layout: ExportLayout) -> ImportResult<ExportSummary> {
        debug!("步骤 1: 读取存储");
        let snapshot = self.load().await?;

        let mut summary = ExportSummary::default();
        for (kind, rows) in &snapshot.rows {
            summary.rows_per_kind.insert(*kind, rows.len());
            summary.total_rows += rows.len();
        }

        debug!("步骤 2: 写出 CSV");
        match layout {
            ExportLayout::Unified => {
                let headers = unified_headers();
                let mut writer = open_writer(path)?;
                write_row(&mut writer, path, headers.iter().map(|h| h.to_string()))?;

                for (kind, rows) in &snapshot.rows {
                    for entity in rows {
                        let cells = render_row(*kind, entity, &snapshot.keys_by_id);
                        write_row(
                            &mut writer,
                            path,
                            headers
                                .iter()
                                .map(|h| cells.get(h).cloned().unwrap_or_default()),
                        )?;
                    }
                }
                flush(&mut writer, path)?;
                summary.files.push(path.to_path_buf());
            }
            ExportLayout::PerEntity => {
                for (kind, rows) in &snapshot.rows {
                    let file_path = per_entity_path(path, *kind);
                    let headers = kind_headers(*kind);
                    let mut writer = open_writer(&file_path)?;
                    write_row(&mut writer, &file_path, headers.iter().map(|h| h.to_string()))?;

                    for entity in rows {
                        let cells = render_row(*kind, entity, &snapshot.keys_by_id);
                        write_row(
                            &mut writer,
                            &file_path,
                            headers
                                .iter()
                                .map(|h| cells.get(h).cloned().unwrap_or_default()),
                        )?;
                    }
                    flush(&mut writer, &file_path)?;
                    debug!(kind = %kind, rows = rows.len(), file = %file_path.display(), "类型文件写出完成");
                    summary.files.push(file_path);
                }
            }
        }

        info!(
            total_rows = summary.total_rows,
            files = summary.files.len(),
            "CSV 导出完成"
        );
        Ok(summary)
    }

    /// 按类型顺序读取全部行,并建立 (类型, id) → 自然键 映射
    async fn load(&self) -> ImportResult<Snapshot> {
        let mut rows = Vec::with_capacity(EntityKind::ALL.len());
        let mut keys_by_id = HashMap::new();

        for kind in EntityKind::ALL {
            let entities = self.repo.list_all(kind).await?;
            for entity in &entities {
                keys_by_id.insert((kind, entity.id), entity.natural_key.clone());
            }
            rows.push((kind, entities));
        }

        Ok(Snapshot { rows, keys_by_id })
    }
}

/// 单一类型的表头: table, 自然键列, 固定列
fn kind_headers(kind: EntityKind) -> Vec<&'static str> {
    let mut headers = vec![TABLE_COLUMN, schema::key_column(kind)];
    headers.extend(schema::columns(kind).iter().map(|c| c.name));
    headers
}

/// 统一文件表头: 按类型顺序取列的并集（保留首次出现位置）
fn unified_headers() -> Vec<&'static str> {
    let mut headers: Vec<&'static str> = Vec::new();
    for kind in EntityKind::ALL {
        for header in kind_headers(kind) {
            if !headers.contains(&header) {
                headers.push(header);
            }
        }
    }
    headers
}

fn per_entity_path(path: &Path, kind: EntityKind) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("export");
    path.with_file_name(format!("{}_{}.csv", stem, kind.as_str()))
}

/// 渲染一行（列名 → 单元格文本）
fn render_row(
    kind: EntityKind,
    entity: &StoredEntity,
    keys_by_id: &HashMap<(EntityKind, i64), String>,
) -> HashMap<&'static str, String> {
    let mut cells = HashMap::with_capacity(schema::columns(kind).len() + 2);
    cells.insert(TABLE_COLUMN, kind.as_str().to_string());
    cells.insert(schema::key_column(kind), entity.natural_key.clone());

    for column in schema::columns(kind) {
        let value = entity
            .fields
            .get(column.name)
            .unwrap_or(&FieldValue::Absent);
        let cell = match (column.ty, value) {
            (ColumnType::Ref(target), FieldValue::Integer(id)) => keys_by_id
                .get(&(target, *id))
                .cloned()
                .unwrap_or_else(|| id.to_string()),
            (ColumnType::AnyRef, FieldValue::Text(reference)) => {
                render_any_ref(reference, keys_by_id)
            }
            (_, other) => other.to_cell(),
        };
        cells.insert(column.name, cell);
    }

    cells
}

/// "kind:id" → "kind:natural_key"
fn render_any_ref(reference: &str, keys_by_id: &HashMap<(EntityKind, i64), String>) -> String {
    reference
        .split_once(':')
        .and_then(|(prefix, id)| {
            let kind = prefix.parse::<EntityKind>().ok()?;
            let id = id.parse::<i64>().ok()?;
            let key = keys_by_id.get(&(kind, id))?;
            Some(format!("{}:{}", kind.as_str(), key))
        })
        .unwrap_or_else(|| reference.to_string())
}

fn write_failure(path: &Path, err: impl std::fmt::Display) -> ImportError {
    ImportError::IoFailure {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

fn open_writer(path: &Path) -> ImportResult<Writer<File>> {
    Writer::from_path(path).map_err(|e| write_failure(path, e))
}

fn write_row<I>(writer: &mut Writer<File>, path: &Path, cells: I) -> ImportResult<()>
where
    I: IntoIterator<Item = String>,
{
    writer
        .write_record(cells)
        .map_err(|e| write_failure(path, e))
}

fn flush(writer: &mut Writer<File>, path: &Path) -> ImportResult<()> {
    writer.flush().map_err(|e| write_failure(path, e))
}
