// ==========================================
// 飞行日志导入导出 - 记录分类器
// ==========================================
// 职责: 判定原始记录的实体类型（纯函数）
// 规则: 显式类型标签优先;否则按形状特征从最具体到最宽泛依次匹配,首个命中即返回
// ==========================================

use crate::domain::record::{value_to_text, RawRecord};
use crate::domain::types::EntityKind;
use crate::importer::aliases;
use crate::importer::error::RecordError;
use crate::importer::importer_trait::RecordClassifier;

/// 形状判定顺序
const SHAPE_RULES: &[(EntityKind, &[&str])] = &[
    (EntityKind::Flight, aliases::FLIGHT_DATE),
    (EntityKind::Qualification, aliases::SHAPE_QUALIFICATION),
    (EntityKind::Image, aliases::SHAPE_IMAGE),
    (EntityKind::Limit, aliases::SHAPE_LIMIT),
    (EntityKind::Query, aliases::SHAPE_QUERY),
    (EntityKind::Airfield, aliases::SHAPE_AIRFIELD),
    (EntityKind::Aircraft, aliases::SHAPE_AIRCRAFT),
    (EntityKind::Pilot, aliases::SHAPE_PILOT),
    (EntityKind::Setting, aliases::SHAPE_SETTING_CODE),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct ShapeClassifier;

impl RecordClassifier for ShapeClassifier {
    fn classify(&self, raw: &RawRecord) -> Result<EntityKind, RecordError> {
        // 1. 显式类型标签（未知标签不再按形状猜测）
        if let Some((field, value)) = raw.lookup(aliases::TABLE_TAG) {
            let tag = value_to_text(value);
            if !tag.trim().is_empty() {
                return EntityKind::from_table_tag(&tag).ok_or_else(|| {
                    RecordError::UnclassifiableRecord {
                        hint: format!("未知类型标签 {}={}", field, tag.trim()),
                    }
                });
            }
        }

        // 2. 形状特征
        if let Some((kind, _)) = SHAPE_RULES
            .iter()
            .find(|(_, fields)| raw.has_any(fields))
        {
            return Ok(*kind);
        }

        // 3. 键值对视为配置项
        if raw.has_any(aliases::SETTING_KEY) && raw.has_any(aliases::SETTING_VALUE) {
            return Ok(EntityKind::Setting);
        }

        let mut keys: Vec<&str> = raw.fields().keys().map(|k| k.as_str()).collect();
        keys.truncate(8);
        Err(RecordError::UnclassifiableRecord {
            hint: format!("字段 [{}] 不符合任何实体形状", keys.join(", ")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn raw(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => RawRecord::from_object(1, map),
            _ => panic!("not an object"),
        }
    }

    fn classify(value: Value) -> Result<EntityKind, RecordError> {
        ShapeClassifier.classify(&raw(value))
    }

    #[test]
    fn test_classify_one_fixture_per_kind() {
        let cases = vec![
            (json!({"reg": "N123AB", "type": "C172"}), EntityKind::Aircraft),
            (json!({"id": "J.DOE", "license": "PPL"}), EntityKind::Pilot),
            (
                json!({"date": "2024-01-05", "aircraft": "N123AB", "pilot": "J.DOE"}),
                EntityKind::Flight,
            ),
            (
                json!({"ImgCode": "I1", "FileName": "log.jpg", "LinkCode": "F1"}),
                EntityKind::Image,
            ),
            (json!({"LType": 1, "LMinutes": 6000}), EntityKind::Limit),
            (json!({"mQCode": "Q1", "Name": "Night"}), EntityKind::Query),
            (
                json!({"QTypeCode": "MED1", "DateIssued": "2023-01-01"}),
                EntityKind::Qualification,
            ),
            (json!({"key": "units", "value": "metric"}), EntityKind::Setting),
            (json!({"AFICAO": "KJFK", "AFName": "Kennedy"}), EntityKind::Airfield),
        ];

        for (value, expected) in cases {
            assert_eq!(classify(value.clone()).unwrap(), expected, "{}", value);
        }
    }

    #[test]
    fn test_table_tag_wins_over_shape() {
        let kind = classify(json!({"table": "Pilot", "reg": "N1"})).unwrap();
        assert_eq!(kind, EntityKind::Pilot);

        let kind = classify(json!({"table": "settingconfig", "meta": {"ConfigCode": "1"}})).unwrap();
        assert_eq!(kind, EntityKind::Setting);
    }

    #[test]
    fn test_unknown_table_tag_is_unclassifiable() {
        let err = classify(json!({"table": "logbook_sync", "reg": "N1"})).unwrap_err();
        assert!(matches!(err, RecordError::UnclassifiableRecord { .. }));
    }

    #[test]
    fn test_shapeless_record_is_unclassifiable() {
        let err = classify(json!({"foo": 1, "bar": "x"})).unwrap_err();
        assert!(matches!(err, RecordError::UnclassifiableRecord { .. }));
    }

    #[test]
    fn test_flight_checked_before_aircraft() {
        // 飞行记录也携带注册号,日期字段决定其为 Flight
        let kind = classify(json!({"DateUTC": "2024-02-01", "AircraftCode": "AC-1"})).unwrap();
        assert_eq!(kind, EntityKind::Flight);
    }
}
