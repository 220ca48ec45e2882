// ==========================================
// 飞行日志导入导出 - 字段映射器
// ==========================================
// 职责: 源字段 → 规范字段映射 + 类型转换 + 实体约束校验
// 规则:
// - 必填字段缺失或无法解析 → MalformedField
// - 可选字段无法解析 → 记录 warn,按缺失处理
// - 输出字段集合只取决于实体类型,与源记录出现了哪些字段无关
// ==========================================

use crate::config::PipelineConfig;
use crate::config::pipeline_config::{DEFAULT_LIMIT_THRESHOLD_MAX, DEFAULT_LIMIT_THRESHOLD_MIN};
use crate::domain::record::{
    Aircraft, Airfield, CanonicalRecord, Flight, Image, Limit, LimitScope, Pilot,
    Qualification, Query, RawRecord, Setting,
};
use crate::domain::schema::normalize_key;
use crate::domain::types::EntityKind;
use crate::importer::aliases::*;
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::error::RecordError;
use crate::importer::importer_trait::FieldNormalizer;
use chrono::NaiveDate;
use serde_json::Value;
use tracing::warn;

// ==========================================
// FieldReader - 单条记录的字段读取器
// ==========================================
struct FieldReader<'a> {
    raw: &'a RawRecord,
    cleaner: &'a DataCleaner,
}

impl<'a> FieldReader<'a> {
    /// 读取文本（TRIM + 空值哨兵标准化）
    fn text(&self, aliases: &[&str]) -> Option<String> {
        self.cleaner.normalize_null(self.raw.text(aliases))
    }

    fn required_text(&self, field: &str, aliases: &[&str]) -> Result<String, RecordError> {
        self.text(aliases)
            .ok_or_else(|| RecordError::malformed(field, "必填字段缺失"))
    }

    /// 可选字段: 解析失败记录 warn 并返回 None
    fn optional<T>(
        &self,
        field: &str,
        aliases: &[&str],
        parse: impl Fn(&str) -> Result<T, String>,
    ) -> Option<T> {
        let text = self.text(aliases)?;
        match parse(&text) {
            Ok(v) => Some(v),
            Err(reason) => {
                warn!(
                    row_number = self.raw.row_number,
                    field = field,
                    value = %text,
                    reason = %reason,
                    "可选字段解析失败,按缺失处理"
                );
                None
            }
        }
    }

    /// 必填字段: 缺失或解析失败均为 MalformedField
    fn required<T>(
        &self,
        field: &str,
        aliases: &[&str],
        parse: impl Fn(&str) -> Result<T, String>,
    ) -> Result<T, RecordError> {
        let text = self.required_text(field, aliases)?;
        parse(&text).map_err(|reason| RecordError::malformed(field, reason))
    }

    fn date(&self, field: &str, aliases: &[&str]) -> Option<NaiveDate> {
        self.optional(field, aliases, |v| self.cleaner.parse_date(v))
    }

    fn integer(&self, field: &str, aliases: &[&str]) -> Option<i64> {
        self.optional(field, aliases, |v| self.cleaner.parse_integer(v))
    }

    fn decimal(&self, field: &str, aliases: &[&str]) -> Option<f64> {
        self.optional(field, aliases, |v| self.cleaner.parse_decimal(v))
    }

    fn flag(&self, field: &str, aliases: &[&str]) -> Option<bool> {
        self.optional(field, aliases, |v| self.cleaner.parse_bool(v))
    }

    fn minutes(&self, field: &str, aliases: &[&str]) -> Option<i64> {
        self.optional(field, aliases, |v| self.cleaner.parse_minutes(v))
    }

    /// 时刻: JSON 数值视为午夜起的分钟数,字符串按 HH:MM / HHMM 解析
    fn time_of_day(&self, field: &str, aliases: &[&str]) -> Option<String> {
        match self.raw.lookup(aliases) {
            Some((_, Value::Number(n))) => {
                let parsed = n
                    .as_i64()
                    .ok_or_else(|| format!("期望整数分钟: {}", n))
                    .and_then(|m| self.cleaner.minutes_to_time_of_day(m));
                match parsed {
                    Ok(v) => Some(v),
                    Err(reason) => {
                        warn!(
                            row_number = self.raw.row_number,
                            field = field,
                            value = %n,
                            reason = %reason,
                            "可选字段解析失败,按缺失处理"
                        );
                        None
                    }
                }
            }
            Some(_) => self.optional(field, aliases, |v| self.cleaner.parse_time_of_day(v)),
            None => None,
        }
    }
}

// ==========================================
// FieldMapper - 字段映射器
// ==========================================
#[derive(Debug, Clone)]
pub struct FieldMapper {
    cleaner: DataCleaner,
    limit_threshold_min: f64,
    limit_threshold_max: f64,
}

impl Default for FieldMapper {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT_THRESHOLD_MIN, DEFAULT_LIMIT_THRESHOLD_MAX)
    }
}

impl FieldNormalizer for FieldMapper {
    fn normalize(&self, raw: &RawRecord, kind: EntityKind) -> Result<CanonicalRecord, RecordError> {
        let r = FieldReader {
            raw,
            cleaner: &self.cleaner,
        };

        match kind {
            EntityKind::Aircraft => self.map_aircraft(&r),
            EntityKind::Pilot => self.map_pilot(&r),
            EntityKind::Airfield => self.map_airfield(&r),
            EntityKind::Setting => self.map_setting(&r),
            EntityKind::Flight => self.map_flight(&r),
            EntityKind::Limit => self.map_limit(&r),
            EntityKind::Query => self.map_query(&r),
            EntityKind::Image => self.map_image(&r),
            EntityKind::Qualification => self.map_qualification(&r),
        }
    }
}

impl FieldMapper {
    pub fn new(limit_threshold_min: f64, limit_threshold_max: f64) -> Self {
        Self {
            cleaner: DataCleaner,
            limit_threshold_min,
            limit_threshold_max,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.limit_threshold_min, config.limit_threshold_max)
    }

    fn map_aircraft(&self, r: &FieldReader) -> Result<CanonicalRecord, RecordError> {
        let registration = normalize_key(
            EntityKind::Aircraft,
            &r.required_text("registration", AIRCRAFT_REGISTRATION)?,
        );

        Ok(CanonicalRecord::Aircraft(Aircraft {
            registration,
            guid: r.text(GUID),
            source_code: r.text(AIRCRAFT_SOURCE_CODE),
            aircraft_type: r.text(AIRCRAFT_TYPE),
            make: r.text(AIRCRAFT_MAKE),
            model: r.text(AIRCRAFT_MODEL),
            sub_model: r.text(AIRCRAFT_SUB_MODEL),
            category: r.text(AIRCRAFT_CATEGORY),
            aircraft_class: r.text(AIRCRAFT_CLASS),
            engine_type: r.text(AIRCRAFT_ENGINE_TYPE),
            seats: r.integer("seats", AIRCRAFT_SEATS),
            active: r.flag("active", AIRCRAFT_ACTIVE),
            tailwheel: r.flag("tailwheel", AIRCRAFT_TAILWHEEL),
            complex: r.flag("complex", AIRCRAFT_COMPLEX),
            high_performance: r.flag("high_performance", AIRCRAFT_HIGH_PERFORMANCE),
            aerobatic: r.flag("aerobatic", AIRCRAFT_AEROBATIC),
            company: r.text(AIRCRAFT_COMPANY),
            rating: r.text(AIRCRAFT_RATING),
        }))
    }

    fn map_pilot(&self, r: &FieldReader) -> Result<CanonicalRecord, RecordError> {
        let source_code = r.text(PILOT_SOURCE_CODE);
        let name = r.text(PILOT_NAME);

        // 标识优先级: 显式 id / ref → 源系统编码 → 姓名
        let pilot_id = r
            .text(PILOT_ID)
            .or_else(|| source_code.clone())
            .or_else(|| name.clone())
            .ok_or_else(|| RecordError::malformed("pilot_id", "缺少飞行员标识（id / code / name）"))?;

        Ok(CanonicalRecord::Pilot(Pilot {
            pilot_id,
            guid: r.text(GUID),
            source_code,
            name,
            license: r.text(PILOT_LICENSE),
            email: r.text(PILOT_EMAIL),
            phone: r.text(PILOT_PHONE),
            company: r.text(PILOT_COMPANY),
            roster_alias: r.text(PILOT_ROSTER_ALIAS),
            active: r.flag("active", PILOT_ACTIVE),
            notes: r.text(PILOT_NOTES),
        }))
    }

    fn map_airfield(&self, r: &FieldReader) -> Result<CanonicalRecord, RecordError> {
        let source_code = r.text(AIRFIELD_SOURCE_CODE);
        let icao = r.text(AIRFIELD_ICAO).map(|v| v.to_uppercase());
        let iata = r.text(AIRFIELD_IATA).map(|v| v.to_uppercase());

        // 代码优先级: 显式 code → ICAO → IATA → 源系统编码
        let code = r
            .text(AIRFIELD_CODE)
            .or_else(|| icao.clone())
            .or_else(|| iata.clone())
            .or_else(|| source_code.clone())
            .map(|v| normalize_key(EntityKind::Airfield, &v))
            .ok_or_else(|| RecordError::malformed("code", "缺少机场代码（code / ICAO / IATA）"))?;

        Ok(CanonicalRecord::Airfield(Airfield {
            code,
            guid: r.text(GUID),
            source_code,
            icao,
            iata,
            name: r.text(AIRFIELD_NAME),
            city: r.text(AIRFIELD_CITY),
            country: r.text(AIRFIELD_COUNTRY),
            latitude: r.optional("latitude", AIRFIELD_LATITUDE, |v| {
                self.cleaner
                    .parse_decimal(v)
                    .and_then(|d| self.cleaner.validate_range(d, -90.0, 90.0))
            }),
            longitude: r.optional("longitude", AIRFIELD_LONGITUDE, |v| {
                self.cleaner
                    .parse_decimal(v)
                    .and_then(|d| self.cleaner.validate_range(d, -180.0, 180.0))
            }),
            elevation_ft: r.integer("elevation_ft", AIRFIELD_ELEVATION),
            timezone: r.text(AIRFIELD_TIMEZONE),
            notes: r.text(AIRFIELD_NOTES),
        }))
    }

    fn map_setting(&self, r: &FieldReader) -> Result<CanonicalRecord, RecordError> {
        let source_code = r.text(SETTING_SOURCE_CODE);
        let key = r
            .text(SETTING_KEY)
            .or_else(|| source_code.clone())
            .ok_or_else(|| RecordError::malformed("key", "必填字段缺失"))?;
        let scope = r
            .text(SETTING_SCOPE)
            .unwrap_or_else(|| "global".to_string());

        Ok(CanonicalRecord::Setting(Setting {
            guid: r.text(GUID),
            source_code,
            scope,
            key,
            value: r.text(SETTING_VALUE),
        }))
    }

    fn map_flight(&self, r: &FieldReader) -> Result<CanonicalRecord, RecordError> {
        let date = r.required("date", FLIGHT_DATE, |v| self.cleaner.parse_date(v))?;
        let aircraft = Some(r.required_text("aircraft", FLIGHT_AIRCRAFT)?);
        let pilot = r.text(FLIGHT_PILOT);
        let origin = r.text(FLIGHT_ORIGIN);
        let destination = r.text(FLIGHT_DESTINATION);
        let departure_time = r.time_of_day("departure_time", FLIGHT_DEPARTURE_TIME);
        let guid = r.text(GUID);
        let source_code = r.text(FLIGHT_SOURCE_CODE);

        // 自然键: 显式键 → guid → 源系统编码 → 组合键
        let flight_key = r
            .text(FLIGHT_KEY)
            .or_else(|| guid.clone())
            .or_else(|| source_code.clone())
            .unwrap_or_else(|| {
                let airfield = |v: &Option<String>| {
                    v.as_deref()
                        .map(|s| normalize_key(EntityKind::Airfield, s))
                        .unwrap_or_default()
                };
                format!(
                    "{}/{}/{}/{}/{}/{}",
                    date.format("%Y-%m-%d"),
                    aircraft
                        .as_deref()
                        .map(|s| normalize_key(EntityKind::Aircraft, s))
                        .unwrap_or_default(),
                    pilot.as_deref().unwrap_or_default(),
                    airfield(&origin),
                    airfield(&destination),
                    departure_time.as_deref().unwrap_or_default()
                )
            });

        Ok(CanonicalRecord::Flight(Flight {
            flight_key,
            guid,
            source_code,
            date,
            aircraft,
            pilot,
            origin,
            destination,
            route: r.text(FLIGHT_ROUTE),
            departure_time,
            arrival_time: r.time_of_day("arrival_time", FLIGHT_ARRIVAL_TIME),
            total_minutes: r.minutes("total_minutes", FLIGHT_TOTAL),
            pic_minutes: r.minutes("pic_minutes", FLIGHT_PIC),
            sic_minutes: r.minutes("sic_minutes", FLIGHT_SIC),
            night_minutes: r.minutes("night_minutes", FLIGHT_NIGHT),
            ifr_minutes: r.minutes("ifr_minutes", FLIGHT_IFR),
            cross_country_minutes: r.minutes("cross_country_minutes", FLIGHT_XC),
            dual_minutes: r.minutes("dual_minutes", FLIGHT_DUAL),
            day_takeoffs: r.integer("day_takeoffs", FLIGHT_DAY_TAKEOFFS),
            night_takeoffs: r.integer("night_takeoffs", FLIGHT_NIGHT_TAKEOFFS),
            day_landings: r.integer("day_landings", FLIGHT_DAY_LANDINGS),
            night_landings: r.integer("night_landings", FLIGHT_NIGHT_LANDINGS),
            holds: r.integer("holds", FLIGHT_HOLDS),
            approaches: r.text(FLIGHT_APPROACHES),
            distance: r.decimal("distance", FLIGHT_DISTANCE),
            remarks: r.text(FLIGHT_REMARKS),
        }))
    }

    fn map_limit(&self, r: &FieldReader) -> Result<CanonicalRecord, RecordError> {
        let rule_type = r.required_text("rule_type", LIMIT_RULE_TYPE)?;
        let threshold = r.required("threshold", LIMIT_THRESHOLD, |v| {
            self.cleaner.parse_decimal(v).and_then(|d| {
                self.cleaner
                    .validate_range(d, self.limit_threshold_min, self.limit_threshold_max)
            })
        })?;

        let mut target = r.text(LIMIT_TARGET);
        let scope = match r.text(LIMIT_SCOPE) {
            Some(raw) => LimitScope::parse(&raw)
                .ok_or_else(|| RecordError::malformed("scope", format!("未知作用范围: {}", raw)))?,
            None if target.is_some() => {
                return Err(RecordError::malformed("scope", "指定了目标但缺少作用范围"))
            }
            None => LimitScope::Global,
        };

        match (scope.target_kind(), target.as_deref()) {
            (None, Some(_)) => {
                return Err(RecordError::malformed("target", "全局规则不能指定目标"))
            }
            (Some(_), None) => return Err(RecordError::malformed("target", "必填字段缺失")),
            (Some(kind), Some(value)) => {
                // 导出文件中目标渲染为 "kind:key"
                let prefix = format!("{}:", kind.as_str());
                if let Some(stripped) = value.strip_prefix(prefix.as_str()) {
                    target = Some(stripped.to_string());
                }
            }
            (None, None) => {}
        }

        let valid_from = r.date("valid_from", LIMIT_VALID_FROM);
        let valid_to = r.date("valid_to", LIMIT_VALID_TO);
        if let (Some(from), Some(to)) = (valid_from, valid_to) {
            if to < from {
                return Err(RecordError::malformed(
                    "valid_to",
                    format!("截止日期 {} 早于起始日期 {}", to, from),
                ));
            }
        }

        let guid = r.text(GUID);
        let source_code = r.text(LIMIT_SOURCE_CODE);
        let limit_key = r
            .text(LIMIT_KEY)
            .or_else(|| source_code.clone())
            .or_else(|| guid.clone())
            .unwrap_or_else(|| {
                format!(
                    "{}/{}/{}",
                    scope.as_str(),
                    target.as_deref().unwrap_or_default(),
                    rule_type
                )
            });

        Ok(CanonicalRecord::Limit(Limit {
            limit_key,
            guid,
            source_code,
            rule_type,
            scope,
            target,
            threshold,
            period: r.text(LIMIT_PERIOD),
            zone: r.text(LIMIT_ZONE),
            valid_from,
            valid_to,
        }))
    }

    fn map_query(&self, r: &FieldReader) -> Result<CanonicalRecord, RecordError> {
        let name = r.text(QUERY_NAME);
        let guid = r.text(GUID);
        let source_code = r.text(QUERY_SOURCE_CODE);

        // 查询条件: 显式定义,否则拼接构建子句 Build1..Build4
        let definition = r.text(QUERY_DEFINITION).or_else(|| {
            let clauses: Vec<String> = QUERY_BUILD_CLAUSES
                .iter()
                .filter_map(|alias| r.text(&[*alias]))
                .collect();
            if clauses.is_empty() {
                None
            } else {
                Some(clauses.join(" "))
            }
        });

        let query_key = r
            .text(QUERY_KEY)
            .or_else(|| source_code.clone())
            .or_else(|| guid.clone())
            .or_else(|| name.clone())
            .ok_or_else(|| RecordError::malformed("query_key", "缺少查询标识（key / code / guid / name）"))?;

        Ok(CanonicalRecord::Query(Query {
            query_key,
            guid,
            source_code,
            name,
            short_name: r.text(QUERY_SHORT_NAME),
            definition,
            quick_view: r.flag("quick_view", QUERY_QUICK_VIEW),
            owner: r.text(QUERY_OWNER),
        }))
    }

    fn map_image(&self, r: &FieldReader) -> Result<CanonicalRecord, RecordError> {
        let parent = r.required_text("parent", IMAGE_PARENT)?;
        let file_name = r.text(IMAGE_FILE_NAME);
        let file_ext = r
            .text(IMAGE_FILE_EXT)
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty());
        let guid = r.text(GUID);
        let source_code = r.text(IMAGE_SOURCE_CODE);

        // 自然键: 显式键 → guid → 图片编码 → parent/file_name
        let image_key = r
            .text(IMAGE_KEY)
            .or_else(|| guid.clone())
            .or_else(|| source_code.clone())
            .unwrap_or_else(|| format!("{}/{}", parent, file_name.as_deref().unwrap_or_default()));

        Ok(CanonicalRecord::Image(Image {
            image_key,
            guid,
            source_code,
            parent,
            file_name,
            file_ext,
            file_path: r.text(IMAGE_FILE_PATH),
        }))
    }

    fn map_qualification(&self, r: &FieldReader) -> Result<CanonicalRecord, RecordError> {
        let qualification_type = r.required_text("qualification_type", QUALIFICATION_TYPE)?;
        let pilot = r.text(QUALIFICATION_PILOT);
        let issued = r.date("issued", QUALIFICATION_ISSUED);
        let expires = r.date("expires", QUALIFICATION_EXPIRES);

        if let (Some(issued), Some(expires)) = (issued, expires) {
            if expires < issued {
                return Err(RecordError::malformed(
                    "expires",
                    format!("到期日期 {} 早于签发日期 {}", expires, issued),
                ));
            }
        }

        let guid = r.text(GUID);
        let source_code = r.text(QUALIFICATION_SOURCE_CODE);
        let qualification_key = r
            .text(QUALIFICATION_KEY)
            .or_else(|| source_code.clone())
            .or_else(|| guid.clone())
            .unwrap_or_else(|| {
                format!(
                    "{}/{}/{}",
                    pilot.as_deref().unwrap_or_default(),
                    qualification_type,
                    issued.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
                )
            });

        Ok(CanonicalRecord::Qualification(Qualification {
            qualification_key,
            guid,
            source_code,
            pilot,
            qualification_type,
            issued,
            expires,
            validity: r.integer("validity", QUALIFICATION_VALIDITY),
            notify_days: r.integer("notify_days", QUALIFICATION_NOTIFY_DAYS),
            airfield: r.text(QUALIFICATION_AIRFIELD),
            notes: r.text(QUALIFICATION_NOTES),
        }))
    }
}
