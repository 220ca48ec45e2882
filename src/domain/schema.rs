// ==========================================
// 飞行日志导入导出 - 实体字段定义
// ==========================================
// 职责: 每种实体的固定列集合（存储 / 导出共用）
// 说明: 自然键不在列集合中,存于 natural_key 列,导出时使用 key_column 作为表头
// ==========================================

use crate::domain::types::{EntityKind, RefTarget};

// ==========================================
// ColumnType - 列类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Decimal,
    Date,
    Bool,
    Ref(EntityKind), // 存储为目标表 id
    AnyRef,          // 存储为 "kind:id"
}

impl ColumnType {
    /// SQLite 列类型声明
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Text | ColumnType::Date | ColumnType::AnyRef => "TEXT",
            ColumnType::Integer | ColumnType::Bool | ColumnType::Ref(_) => "INTEGER",
            ColumnType::Decimal => "REAL",
        }
    }

    pub fn ref_target(&self) -> Option<RefTarget> {
        match self {
            ColumnType::Ref(kind) => Some(RefTarget::Kind(*kind)),
            ColumnType::AnyRef => Some(RefTarget::Any),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub ty: ColumnType,
}

const fn col(name: &'static str, ty: ColumnType) -> ColumnDef {
    ColumnDef { name, ty }
}

use ColumnType::*;

const AIRCRAFT_COLUMNS: &[ColumnDef] = &[
    col("guid", Text),
    col("source_code", Text),
    col("aircraft_type", Text),
    col("make", Text),
    col("model", Text),
    col("sub_model", Text),
    col("category", Text),
    col("aircraft_class", Text),
    col("engine_type", Text),
    col("seats", Integer),
    col("active", Bool),
    col("tailwheel", Bool),
    col("complex", Bool),
    col("high_performance", Bool),
    col("aerobatic", Bool),
    col("company", Text),
    col("rating", Text),
];

const PILOT_COLUMNS: &[ColumnDef] = &[
    col("guid", Text),
    col("source_code", Text),
    col("name", Text),
    col("license", Text),
    col("email", Text),
    col("phone", Text),
    col("company", Text),
    col("roster_alias", Text),
    col("active", Bool),
    col("notes", Text),
];

const AIRFIELD_COLUMNS: &[ColumnDef] = &[
    col("guid", Text),
    col("source_code", Text),
    col("icao", Text),
    col("iata", Text),
    col("name", Text),
    col("city", Text),
    col("country", Text),
    col("latitude", Decimal),
    col("longitude", Decimal),
    col("elevation_ft", Integer),
    col("timezone", Text),
    col("notes", Text),
];

const SETTING_COLUMNS: &[ColumnDef] = &[
    col("guid", Text),
    col("source_code", Text),
    col("scope", Text),
    col("key", Text),
    col("value", Text),
];

const FLIGHT_COLUMNS: &[ColumnDef] = &[
    col("guid", Text),
    col("source_code", Text),
    col("date", Date),
    col("aircraft", Ref(EntityKind::Aircraft)),
    col("pilot", Ref(EntityKind::Pilot)),
    col("origin", Ref(EntityKind::Airfield)),
    col("destination", Ref(EntityKind::Airfield)),
    col("route", Text),
    col("departure_time", Text),
    col("arrival_time", Text),
    col("total_minutes", Integer),
    col("pic_minutes", Integer),
    col("sic_minutes", Integer),
    col("night_minutes", Integer),
    col("ifr_minutes", Integer),
    col("cross_country_minutes", Integer),
    col("dual_minutes", Integer),
    col("day_takeoffs", Integer),
    col("night_takeoffs", Integer),
    col("day_landings", Integer),
    col("night_landings", Integer),
    col("holds", Integer),
    col("approaches", Text),
    col("distance", Decimal),
    col("remarks", Text),
];

const LIMIT_COLUMNS: &[ColumnDef] = &[
    col("guid", Text),
    col("source_code", Text),
    col("rule_type", Text),
    col("scope", Text),
    col("target", AnyRef),
    col("threshold", Decimal),
    col("period", Text),
    col("zone", Text),
    col("valid_from", Date),
    col("valid_to", Date),
];

const QUERY_COLUMNS: &[ColumnDef] = &[
    col("guid", Text),
    col("source_code", Text),
    col("name", Text),
    col("short_name", Text),
    col("definition", Text),
    col("quick_view", Bool),
    col("owner", Ref(EntityKind::Pilot)),
];

const IMAGE_COLUMNS: &[ColumnDef] = &[
    col("guid", Text),
    col("source_code", Text),
    col("parent", AnyRef),
    col("file_name", Text),
    col("file_ext", Text),
    col("file_path", Text),
];

const QUALIFICATION_COLUMNS: &[ColumnDef] = &[
    col("guid", Text),
    col("source_code", Text),
    col("pilot", Ref(EntityKind::Pilot)),
    col("qualification_type", Text),
    col("issued", Date),
    col("expires", Date),
    col("validity", Integer),
    col("notify_days", Integer),
    col("airfield", Ref(EntityKind::Airfield)),
    col("notes", Text),
];

/// 实体的固定列集合（不含自然键）
pub fn columns(kind: EntityKind) -> &'static [ColumnDef] {
    match kind {
        EntityKind::Aircraft => AIRCRAFT_COLUMNS,
        EntityKind::Pilot => PILOT_COLUMNS,
        EntityKind::Airfield => AIRFIELD_COLUMNS,
        EntityKind::Setting => SETTING_COLUMNS,
        EntityKind::Flight => FLIGHT_COLUMNS,
        EntityKind::Limit => LIMIT_COLUMNS,
        EntityKind::Query => QUERY_COLUMNS,
        EntityKind::Image => IMAGE_COLUMNS,
        EntityKind::Qualification => QUALIFICATION_COLUMNS,
    }
}

/// 自然键在导出文件中的列名（重新导入时作为显式键读取）
pub fn key_column(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Aircraft => "registration",
        EntityKind::Pilot => "pilot_id",
        EntityKind::Airfield => "code",
        EntityKind::Setting => "setting_key",
        EntityKind::Flight => "flight_key",
        EntityKind::Limit => "limit_key",
        EntityKind::Query => "query_key",
        EntityKind::Image => "image_key",
        EntityKind::Qualification => "qualification_key",
    }
}

/// 自然键标准化（注册号、机场代码统一大写）
pub fn normalize_key(kind: EntityKind, raw: &str) -> String {
    let trimmed = raw.trim();
    match kind {
        EntityKind::Aircraft | EntityKind::Airfield => trimmed.to_uppercase(),
        _ => trimmed.to_string(),
    }
}

/// 是否允许为缺失引用自动创建占位实体
pub fn stub_allowed(kind: EntityKind) -> bool {
    matches!(
        kind,
        EntityKind::Aircraft | EntityKind::Pilot | EntityKind::Airfield
    )
}
