// ==========================================
// 飞行日志导入导出 - 字段值类型
// ==========================================
// 职责: 规范化后的字段值 / SQLite 绑定 / CSV 单元格渲染
// ==========================================

use chrono::NaiveDate;
use rusqlite::types::{ToSql, ToSqlOutput};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 规范字段集合（字段名 → 值）
///
/// 同一实体类型的字段集合固定,缺失值以 `FieldValue::Absent` 显式表示。
pub type FieldMap = BTreeMap<&'static str, FieldValue>;

// ==========================================
// FieldValue - 规范字段值
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Absent,
    Text(String),
    Integer(i64),
    Decimal(f64),
    Date(NaiveDate),
    Bool(bool),
}

impl FieldValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// 渲染为 CSV 单元格
    ///
    /// 日期 ISO 格式,布尔值 true/false,缺失值为空串
    pub fn to_cell(&self) -> String {
        match self {
            FieldValue::Absent => String::new(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Integer(v) => v.to_string(),
            FieldValue::Decimal(v) => v.to_string(),
            FieldValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            FieldValue::Bool(b) => b.to_string(),
        }
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        value.map(FieldValue::Text).unwrap_or(FieldValue::Absent)
    }
}

impl From<Option<i64>> for FieldValue {
    fn from(value: Option<i64>) -> Self {
        value.map(FieldValue::Integer).unwrap_or(FieldValue::Absent)
    }
}

impl From<Option<f64>> for FieldValue {
    fn from(value: Option<f64>) -> Self {
        value.map(FieldValue::Decimal).unwrap_or(FieldValue::Absent)
    }
}

impl From<Option<NaiveDate>> for FieldValue {
    fn from(value: Option<NaiveDate>) -> Self {
        value.map(FieldValue::Date).unwrap_or(FieldValue::Absent)
    }
}

impl From<Option<bool>> for FieldValue {
    fn from(value: Option<bool>) -> Self {
        value.map(FieldValue::Bool).unwrap_or(FieldValue::Absent)
    }
}

// 布尔值以 0/1 存储,日期以 YYYY-MM-DD 文本存储
impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            FieldValue::Absent => ToSqlOutput::from(rusqlite::types::Null),
            FieldValue::Text(s) => ToSqlOutput::from(s.as_str()),
            FieldValue::Integer(v) => ToSqlOutput::from(*v),
            FieldValue::Decimal(v) => ToSqlOutput::from(*v),
            FieldValue::Date(d) => ToSqlOutput::from(d.format("%Y-%m-%d").to_string()),
            FieldValue::Bool(b) => ToSqlOutput::from(*b as i64),
        })
    }
}
