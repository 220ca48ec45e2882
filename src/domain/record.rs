// ==========================================
// 飞行日志导入导出 - 记录模型
// ==========================================
// RawRecord: 源文件中的一条原始记录（键值对,meta 已展开）
// CanonicalRecord: 分类 + 规范化后的强类型记录（每种实体一个变体）
// ==========================================

use crate::domain::schema;
use crate::domain::types::{EntityKind, RefTarget};
use crate::domain::value::{FieldMap, FieldValue};
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// 字段名标准化: 小写 + 去掉分隔符（AFCode / af_code / af-code → afcode）
pub fn normalize_field_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' ' | '.'))
        .flat_map(|c| c.to_lowercase())
        .collect()
}

// ==========================================
// RawRecord - 原始记录
// ==========================================
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub row_number: usize,
    fields: Map<String, Value>,
    index: HashMap<String, String>, // 标准化字段名 → 原始字段名
}

impl RawRecord {
    /// 从 JSON 对象构建
    ///
    /// `meta` 子对象的字段合并到顶层,顶层同名字段优先。
    pub fn from_object(row_number: usize, mut object: Map<String, Value>) -> Self {
        if let Some(Value::Object(meta)) = object.remove("meta") {
            for (key, value) in meta {
                if !object.contains_key(&key) {
                    object.insert(key, value);
                }
            }
        }

        let mut index = HashMap::with_capacity(object.len());
        for key in object.keys() {
            index
                .entry(normalize_field_name(key))
                .or_insert_with(|| key.clone());
        }

        Self {
            row_number,
            fields: object,
            index,
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// 按别名顺序查找第一个非 null 字段
    ///
    /// # 返回
    /// - (原始字段名, 字段值)
    pub fn lookup(&self, aliases: &[&str]) -> Option<(&str, &Value)> {
        aliases.iter().find_map(|alias| {
            let original = self.index.get(&normalize_field_name(alias))?;
            let value = self.fields.get(original)?;
            if value.is_null() {
                None
            } else {
                Some((original.as_str(), value))
            }
        })
    }

    /// 是否存在任一别名字段（非 null 且非空白字符串）
    pub fn has_any(&self, aliases: &[&str]) -> bool {
        aliases.iter().any(|alias| {
            self.index
                .get(&normalize_field_name(alias))
                .and_then(|original| self.fields.get(original))
                .map(|value| match value {
                    Value::Null => false,
                    Value::String(s) => !s.trim().is_empty(),
                    _ => true,
                })
                .unwrap_or(false)
        })
    }

    /// 按别名读取原始文本（未做空值哨兵过滤）
    pub fn text(&self, aliases: &[&str]) -> Option<String> {
        self.lookup(aliases).map(|(_, value)| value_to_text(value))
    }
}

/// JSON 值转文本（字符串去引号,其余按 JSON 表示）
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ==========================================
// 实体记录
// ==========================================

#[derive(Debug, Clone, PartialEq)]
pub struct Aircraft {
    pub registration: String,
    pub guid: Option<String>,
    pub source_code: Option<String>,
    pub aircraft_type: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub sub_model: Option<String>,
    pub category: Option<String>,
    pub aircraft_class: Option<String>,
    pub engine_type: Option<String>,
    pub seats: Option<i64>,
    pub active: Option<bool>,
    pub tailwheel: Option<bool>,
    pub complex: Option<bool>,
    pub high_performance: Option<bool>,
    pub aerobatic: Option<bool>,
    pub company: Option<String>,
    pub rating: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pilot {
    pub pilot_id: String,
    pub guid: Option<String>,
    pub source_code: Option<String>,
    pub name: Option<String>,
    pub license: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub roster_alias: Option<String>,
    pub active: Option<bool>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Airfield {
    pub code: String,
    pub guid: Option<String>,
    pub source_code: Option<String>,
    pub icao: Option<String>,
    pub iata: Option<String>,
    pub name: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation_ft: Option<i64>,
    pub timezone: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Setting {
    pub guid: Option<String>,
    pub source_code: Option<String>,
    pub scope: String,
    pub key: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Flight {
    pub flight_key: String,
    pub guid: Option<String>,
    pub source_code: Option<String>,
    pub date: NaiveDate,
    pub aircraft: Option<String>,
    pub pilot: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub route: Option<String>,
    pub departure_time: Option<String>,
    pub arrival_time: Option<String>,
    pub total_minutes: Option<i64>,
    pub pic_minutes: Option<i64>,
    pub sic_minutes: Option<i64>,
    pub night_minutes: Option<i64>,
    pub ifr_minutes: Option<i64>,
    pub cross_country_minutes: Option<i64>,
    pub dual_minutes: Option<i64>,
    pub day_takeoffs: Option<i64>,
    pub night_takeoffs: Option<i64>,
    pub day_landings: Option<i64>,
    pub night_landings: Option<i64>,
    pub holds: Option<i64>,
    pub approaches: Option<String>,
    pub distance: Option<f64>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Limit {
    pub limit_key: String,
    pub guid: Option<String>,
    pub source_code: Option<String>,
    pub rule_type: String,
    pub scope: LimitScope,
    pub target: Option<String>,
    pub threshold: f64,
    pub period: Option<String>,
    pub zone: Option<String>,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
}

/// 限制规则作用范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitScope {
    Global,
    Pilot,
    Aircraft,
}

impl LimitScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitScope::Global => "global",
            LimitScope::Pilot => "pilot",
            LimitScope::Aircraft => "aircraft",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "global" | "all" => Some(LimitScope::Global),
            "pilot" | "crew" => Some(LimitScope::Pilot),
            "aircraft" | "ac" => Some(LimitScope::Aircraft),
            _ => None,
        }
    }

    /// 目标实体类型（全局规则无目标）
    pub fn target_kind(&self) -> Option<EntityKind> {
        match self {
            LimitScope::Global => None,
            LimitScope::Pilot => Some(EntityKind::Pilot),
            LimitScope::Aircraft => Some(EntityKind::Aircraft),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub query_key: String,
    pub guid: Option<String>,
    pub source_code: Option<String>,
    pub name: Option<String>,
    pub short_name: Option<String>,
    pub definition: Option<String>,
    pub quick_view: Option<bool>,
    pub owner: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub image_key: String,
    pub guid: Option<String>,
    pub source_code: Option<String>,
    pub parent: String,
    pub file_name: Option<String>,
    pub file_ext: Option<String>,
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Qualification {
    pub qualification_key: String,
    pub guid: Option<String>,
    pub source_code: Option<String>,
    pub pilot: Option<String>,
    pub qualification_type: String,
    pub issued: Option<NaiveDate>,
    pub expires: Option<NaiveDate>,
    pub validity: Option<i64>,
    pub notify_days: Option<i64>,
    pub airfield: Option<String>,
    pub notes: Option<String>,
}

// ==========================================
// RefSlot - 记录中的一个引用位置
// ==========================================
pub struct RefSlot<'a> {
    pub relation: &'static str, // 关系名（策略配置键）,如 flight.aircraft
    pub column: &'static str,
    pub target: RefTarget,
    pub value: &'a mut Option<String>,
}

/// 只读引用视图（写入阶段绑定 id 使用）
#[derive(Debug, Clone, PartialEq)]
pub struct RefView<'a> {
    pub relation: &'static str,
    pub column: &'static str,
    pub target: RefTarget,
    pub value: Option<&'a str>,
}

// ==========================================
// CanonicalRecord - 规范化记录
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalRecord {
    Aircraft(Aircraft),
    Pilot(Pilot),
    Airfield(Airfield),
    Setting(Setting),
    Flight(Flight),
    Limit(Limit),
    Query(Query),
    Image(Image),
    Qualification(Qualification),
}

fn text(value: &Option<String>) -> FieldValue {
    FieldValue::from(value.clone())
}

impl CanonicalRecord {
    pub fn kind(&self) -> EntityKind {
        match self {
            CanonicalRecord::Aircraft(_) => EntityKind::Aircraft,
            CanonicalRecord::Pilot(_) => EntityKind::Pilot,
            CanonicalRecord::Airfield(_) => EntityKind::Airfield,
            CanonicalRecord::Setting(_) => EntityKind::Setting,
            CanonicalRecord::Flight(_) => EntityKind::Flight,
            CanonicalRecord::Limit(_) => EntityKind::Limit,
            CanonicalRecord::Query(_) => EntityKind::Query,
            CanonicalRecord::Image(_) => EntityKind::Image,
            CanonicalRecord::Qualification(_) => EntityKind::Qualification,
        }
    }

    /// 自然键（upsert 依据）
    pub fn natural_key(&self) -> String {
        match self {
            CanonicalRecord::Aircraft(r) => r.registration.clone(),
            CanonicalRecord::Pilot(r) => r.pilot_id.clone(),
            CanonicalRecord::Airfield(r) => r.code.clone(),
            CanonicalRecord::Setting(r) => format!("{}:{}", r.scope, r.key),
            CanonicalRecord::Flight(r) => r.flight_key.clone(),
            CanonicalRecord::Limit(r) => r.limit_key.clone(),
            CanonicalRecord::Query(r) => r.query_key.clone(),
            CanonicalRecord::Image(r) => r.image_key.clone(),
            CanonicalRecord::Qualification(r) => r.qualification_key.clone(),
        }
    }

    pub fn guid(&self) -> Option<&str> {
        let guid = match self {
            CanonicalRecord::Aircraft(r) => &r.guid,
            CanonicalRecord::Pilot(r) => &r.guid,
            CanonicalRecord::Airfield(r) => &r.guid,
            CanonicalRecord::Setting(r) => &r.guid,
            CanonicalRecord::Flight(r) => &r.guid,
            CanonicalRecord::Limit(r) => &r.guid,
            CanonicalRecord::Query(r) => &r.guid,
            CanonicalRecord::Image(r) => &r.guid,
            CanonicalRecord::Qualification(r) => &r.guid,
        };
        guid.as_deref()
    }

    pub fn source_code(&self) -> Option<&str> {
        let code = match self {
            CanonicalRecord::Aircraft(r) => &r.source_code,
            CanonicalRecord::Pilot(r) => &r.source_code,
            CanonicalRecord::Airfield(r) => &r.source_code,
            CanonicalRecord::Setting(r) => &r.source_code,
            CanonicalRecord::Flight(r) => &r.source_code,
            CanonicalRecord::Limit(r) => &r.source_code,
            CanonicalRecord::Query(r) => &r.source_code,
            CanonicalRecord::Image(r) => &r.source_code,
            CanonicalRecord::Qualification(r) => &r.source_code,
        };
        code.as_deref()
    }

    /// 可改写的引用位置（解析阶段将引用值改写为目标的自然键）
    pub fn ref_slots(&mut self) -> Vec<RefSlot<'_>> {
        fn slot<'a>(
            relation: &'static str,
            column: &'static str,
            target: RefTarget,
            value: &'a mut Option<String>,
        ) -> RefSlot<'a> {
            RefSlot {
                relation,
                column,
                target,
                value,
            }
        }

        match self {
            CanonicalRecord::Flight(r) => vec![
                slot(
                    "flight.aircraft",
                    "aircraft",
                    RefTarget::Kind(EntityKind::Aircraft),
                    &mut r.aircraft,
                ),
                slot(
                    "flight.pilot",
                    "pilot",
                    RefTarget::Kind(EntityKind::Pilot),
                    &mut r.pilot,
                ),
                slot(
                    "flight.origin",
                    "origin",
                    RefTarget::Kind(EntityKind::Airfield),
                    &mut r.origin,
                ),
                slot(
                    "flight.destination",
                    "destination",
                    RefTarget::Kind(EntityKind::Airfield),
                    &mut r.destination,
                ),
            ],
            CanonicalRecord::Limit(r) => match r.scope.target_kind() {
                Some(kind) => vec![slot(
                    "limit.target",
                    "target",
                    RefTarget::Kind(kind),
                    &mut r.target,
                )],
                None => Vec::new(),
            },
            CanonicalRecord::Query(r) => vec![slot(
                "query.owner",
                "owner",
                RefTarget::Kind(EntityKind::Pilot),
                &mut r.owner,
            )],
            CanonicalRecord::Qualification(r) => vec![
                slot(
                    "qualification.pilot",
                    "pilot",
                    RefTarget::Kind(EntityKind::Pilot),
                    &mut r.pilot,
                ),
                slot(
                    "qualification.airfield",
                    "airfield",
                    RefTarget::Kind(EntityKind::Airfield),
                    &mut r.airfield,
                ),
            ],
            // Image.parent 为必填,解析阶段通过 Option 包装改写
            CanonicalRecord::Image(_) => Vec::new(),
            CanonicalRecord::Aircraft(_)
            | CanonicalRecord::Pilot(_)
            | CanonicalRecord::Airfield(_)
            | CanonicalRecord::Setting(_) => Vec::new(),
        }
    }

    /// 只读引用列表（含 Image.parent）
    pub fn refs(&self) -> Vec<RefView<'_>> {
        fn view<'a>(
            relation: &'static str,
            column: &'static str,
            target: RefTarget,
            value: Option<&'a str>,
        ) -> RefView<'a> {
            RefView {
                relation,
                column,
                target,
                value,
            }
        }

        match self {
            CanonicalRecord::Flight(r) => vec![
                view(
                    "flight.aircraft",
                    "aircraft",
                    RefTarget::Kind(EntityKind::Aircraft),
                    r.aircraft.as_deref(),
                ),
                view(
                    "flight.pilot",
                    "pilot",
                    RefTarget::Kind(EntityKind::Pilot),
                    r.pilot.as_deref(),
                ),
                view(
                    "flight.origin",
                    "origin",
                    RefTarget::Kind(EntityKind::Airfield),
                    r.origin.as_deref(),
                ),
                view(
                    "flight.destination",
                    "destination",
                    RefTarget::Kind(EntityKind::Airfield),
                    r.destination.as_deref(),
                ),
            ],
            CanonicalRecord::Limit(r) => match r.scope.target_kind() {
                Some(kind) => vec![view(
                    "limit.target",
                    "target",
                    RefTarget::Kind(kind),
                    r.target.as_deref(),
                )],
                None => Vec::new(),
            },
            CanonicalRecord::Query(r) => vec![view(
                "query.owner",
                "owner",
                RefTarget::Kind(EntityKind::Pilot),
                r.owner.as_deref(),
            )],
            CanonicalRecord::Image(r) => vec![view(
                "image.parent",
                "parent",
                RefTarget::Any,
                Some(r.parent.as_str()),
            )],
            CanonicalRecord::Qualification(r) => vec![
                view(
                    "qualification.pilot",
                    "pilot",
                    RefTarget::Kind(EntityKind::Pilot),
                    r.pilot.as_deref(),
                ),
                view(
                    "qualification.airfield",
                    "airfield",
                    RefTarget::Kind(EntityKind::Airfield),
                    r.airfield.as_deref(),
                ),
            ],
            CanonicalRecord::Aircraft(_)
            | CanonicalRecord::Pilot(_)
            | CanonicalRecord::Airfield(_)
            | CanonicalRecord::Setting(_) => Vec::new(),
        }
    }

    /// Image.parent 的可变访问（任意实体引用）
    pub fn image_parent_mut(&mut self) -> Option<&mut String> {
        match self {
            CanonicalRecord::Image(r) => Some(&mut r.parent),
            _ => None,
        }
    }

    /// 转为规范字段集合
    ///
    /// 引用列此时为目标自然键文本,写入阶段再替换为 id。
    pub fn to_fields(&self) -> FieldMap {
        let mut f = FieldMap::new();
        match self {
            CanonicalRecord::Aircraft(r) => {
                f.insert("guid", text(&r.guid));
                f.insert("source_code", text(&r.source_code));
                f.insert("aircraft_type", text(&r.aircraft_type));
                f.insert("make", text(&r.make));
                f.insert("model", text(&r.model));
                f.insert("sub_model", text(&r.sub_model));
                f.insert("category", text(&r.category));
                f.insert("aircraft_class", text(&r.aircraft_class));
                f.insert("engine_type", text(&r.engine_type));
                f.insert("seats", r.seats.into());
                f.insert("active", r.active.into());
                f.insert("tailwheel", r.tailwheel.into());
                f.insert("complex", r.complex.into());
                f.insert("high_performance", r.high_performance.into());
                f.insert("aerobatic", r.aerobatic.into());
                f.insert("company", text(&r.company));
                f.insert("rating", text(&r.rating));
            }
            CanonicalRecord::Pilot(r) => {
                f.insert("guid", text(&r.guid));
                f.insert("source_code", text(&r.source_code));
                f.insert("name", text(&r.name));
                f.insert("license", text(&r.license));
                f.insert("email", text(&r.email));
                f.insert("phone", text(&r.phone));
                f.insert("company", text(&r.company));
                f.insert("roster_alias", text(&r.roster_alias));
                f.insert("active", r.active.into());
                f.insert("notes", text(&r.notes));
            }
            CanonicalRecord::Airfield(r) => {
                f.insert("guid", text(&r.guid));
                f.insert("source_code", text(&r.source_code));
                f.insert("icao", text(&r.icao));
                f.insert("iata", text(&r.iata));
                f.insert("name", text(&r.name));
                f.insert("city", text(&r.city));
                f.insert("country", text(&r.country));
                f.insert("latitude", r.latitude.into());
                f.insert("longitude", r.longitude.into());
                f.insert("elevation_ft", r.elevation_ft.into());
                f.insert("timezone", text(&r.timezone));
                f.insert("notes", text(&r.notes));
            }
            CanonicalRecord::Setting(r) => {
                f.insert("guid", text(&r.guid));
                f.insert("source_code", text(&r.source_code));
                f.insert("scope", FieldValue::Text(r.scope.clone()));
                f.insert("key", FieldValue::Text(r.key.clone()));
                f.insert("value", text(&r.value));
            }
            CanonicalRecord::Flight(r) => {
                f.insert("guid", text(&r.guid));
                f.insert("source_code", text(&r.source_code));
                f.insert("date", FieldValue::Date(r.date));
                f.insert("aircraft", text(&r.aircraft));
                f.insert("pilot", text(&r.pilot));
                f.insert("origin", text(&r.origin));
                f.insert("destination", text(&r.destination));
                f.insert("route", text(&r.route));
                f.insert("departure_time", text(&r.departure_time));
                f.insert("arrival_time", text(&r.arrival_time));
                f.insert("total_minutes", r.total_minutes.into());
                f.insert("pic_minutes", r.pic_minutes.into());
                f.insert("sic_minutes", r.sic_minutes.into());
                f.insert("night_minutes", r.night_minutes.into());
                f.insert("ifr_minutes", r.ifr_minutes.into());
                f.insert("cross_country_minutes", r.cross_country_minutes.into());
                f.insert("dual_minutes", r.dual_minutes.into());
                f.insert("day_takeoffs", r.day_takeoffs.into());
                f.insert("night_takeoffs", r.night_takeoffs.into());
                f.insert("day_landings", r.day_landings.into());
                f.insert("night_landings", r.night_landings.into());
                f.insert("holds", r.holds.into());
                f.insert("approaches", text(&r.approaches));
                f.insert("distance", r.distance.into());
                f.insert("remarks", text(&r.remarks));
            }
            CanonicalRecord::Limit(r) => {
                f.insert("guid", text(&r.guid));
                f.insert("source_code", text(&r.source_code));
                f.insert("rule_type", FieldValue::Text(r.rule_type.clone()));
                f.insert("scope", FieldValue::Text(r.scope.as_str().to_string()));
                f.insert("target", text(&r.target));
                f.insert("threshold", FieldValue::Decimal(r.threshold));
                f.insert("period", text(&r.period));
                f.insert("zone", text(&r.zone));
                f.insert("valid_from", r.valid_from.into());
                f.insert("valid_to", r.valid_to.into());
            }
            CanonicalRecord::Query(r) => {
                f.insert("guid", text(&r.guid));
                f.insert("source_code", text(&r.source_code));
                f.insert("name", text(&r.name));
                f.insert("short_name", text(&r.short_name));
                f.insert("definition", text(&r.definition));
                f.insert("quick_view", r.quick_view.into());
                f.insert("owner", text(&r.owner));
            }
            CanonicalRecord::Image(r) => {
                f.insert("guid", text(&r.guid));
                f.insert("source_code", text(&r.source_code));
                f.insert("parent", FieldValue::Text(r.parent.clone()));
                f.insert("file_name", text(&r.file_name));
                f.insert("file_ext", text(&r.file_ext));
                f.insert("file_path", text(&r.file_path));
            }
            CanonicalRecord::Qualification(r) => {
                f.insert("guid", text(&r.guid));
                f.insert("source_code", text(&r.source_code));
                f.insert("pilot", text(&r.pilot));
                f.insert(
                    "qualification_type",
                    FieldValue::Text(r.qualification_type.clone()),
                );
                f.insert("issued", r.issued.into());
                f.insert("expires", r.expires.into());
                f.insert("validity", r.validity.into());
                f.insert("notify_days", r.notify_days.into());
                f.insert("airfield", text(&r.airfield));
                f.insert("notes", text(&r.notes));
            }
        }
        f
    }

    /// 构造占位实体（仅自然键,其余字段缺失）
    pub fn stub(kind: EntityKind, key: &str) -> Option<Self> {
        let key = schema::normalize_key(kind, key);
        match kind {
            EntityKind::Aircraft => Some(CanonicalRecord::Aircraft(Aircraft {
                registration: key,
                guid: None,
                source_code: None,
                aircraft_type: None,
                make: None,
                model: None,
                sub_model: None,
                category: None,
                aircraft_class: None,
                engine_type: None,
                seats: None,
                active: None,
                tailwheel: None,
                complex: None,
                high_performance: None,
                aerobatic: None,
                company: None,
                rating: None,
            })),
            EntityKind::Pilot => Some(CanonicalRecord::Pilot(Pilot {
                pilot_id: key,
                guid: None,
                source_code: None,
                name: None,
                license: None,
                email: None,
                phone: None,
                company: None,
                roster_alias: None,
                active: None,
                notes: None,
            })),
            EntityKind::Airfield => Some(CanonicalRecord::Airfield(Airfield {
                code: key,
                guid: None,
                source_code: None,
                icao: None,
                iata: None,
                name: None,
                city: None,
                country: None,
                latitude: None,
                longitude: None,
                elevation_ft: None,
                timezone: None,
                notes: None,
            })),
            _ => None,
        }
    }
}

// ==========================================
// StagedRecord - 已规范化、待解析的记录
// ==========================================
#[derive(Debug, Clone)]
pub struct StagedRecord {
    pub row_number: usize,
    pub raw: Value,
    pub record: CanonicalRecord,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_meta_flattening_top_level_wins() {
        let raw = RawRecord::from_object(
            1,
            object(json!({
                "table": "Aircraft",
                "guid": "top",
                "meta": {"Reference": "N1", "guid": "inner"}
            })),
        );
        assert_eq!(raw.text(&["reference"]), Some("N1".to_string()));
        assert_eq!(raw.text(&["guid"]), Some("top".to_string()));
        assert!(!raw.fields().contains_key("meta"));
    }

    #[test]
    fn test_lookup_is_separator_insensitive() {
        let raw = RawRecord::from_object(1, object(json!({"AFCode": "x", "af_name": null})));
        assert_eq!(raw.text(&["af_code"]), Some("x".to_string()));
        assert_eq!(raw.text(&["afname"]), None);
        assert!(raw.has_any(&["AF-Code"]));
    }

    #[test]
    fn test_to_fields_matches_schema_for_stubs() {
        for kind in [EntityKind::Aircraft, EntityKind::Pilot, EntityKind::Airfield] {
            let record = CanonicalRecord::stub(kind, "abc").unwrap();
            let names: HashSet<_> = record.to_fields().keys().copied().collect();
            let expected: HashSet<_> = schema::columns(kind).iter().map(|c| c.name).collect();
            assert_eq!(names, expected, "{}", kind);
        }
    }

    #[test]
    fn test_stub_key_normalized() {
        let stub = CanonicalRecord::stub(EntityKind::Aircraft, "n9zz").unwrap();
        assert_eq!(stub.natural_key(), "N9ZZ");
        assert!(CanonicalRecord::stub(EntityKind::Flight, "x").is_none());
    }
}
