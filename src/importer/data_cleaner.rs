// ==========================================
// 飞行日志导入导出 - 数据清洗器
// ==========================================
// 职责: TRIM / 空值哨兵标准化 / 日期、数值、布尔、时刻解析 / 范围校验
// 说明: 解析失败返回原因文本,由字段映射器决定拒绝还是降级为缺失
// ==========================================

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

/// 视为缺失的哨兵值（大小写不敏感）
pub const NULL_SENTINELS: [&str; 5] = ["", "null", "none", "n/a", "-"];

#[derive(Debug, Clone, Copy, Default)]
pub struct DataCleaner;

impl DataCleaner {
    /// TRIM + 可选大写
    pub fn clean_text(&self, value: &str, uppercase: bool) -> String {
        let trimmed = value.trim();
        if uppercase {
            trimmed.to_uppercase()
        } else {
            trimmed.to_string()
        }
    }

    /// 空白与哨兵字符串标准化为 None
    pub fn normalize_null(&self, value: Option<String>) -> Option<String> {
        value.and_then(|v| {
            let trimmed = v.trim();
            if NULL_SENTINELS
                .iter()
                .any(|s| trimmed.eq_ignore_ascii_case(s))
            {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    /// 解析日期
    ///
    /// 支持: YYYY-MM-DD / YYYYMMDD / DD/MM/YYYY / YYYY-MM-DDTHH:MM:SS / YYYY-MM-DD HH:MM:SS / RFC3339
    pub fn parse_date(&self, value: &str) -> Result<NaiveDate, String> {
        let v = value.trim();

        if let Ok(d) = NaiveDate::parse_from_str(v, "%Y-%m-%d") {
            return Ok(d);
        }
        if v.len() == 8 && v.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(d) = NaiveDate::parse_from_str(v, "%Y%m%d") {
                return Ok(d);
            }
        }
        if let Ok(d) = NaiveDate::parse_from_str(v, "%d/%m/%Y") {
            return Ok(d);
        }
        for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(v, fmt) {
                return Ok(dt.date());
            }
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(v) {
            return Ok(dt.date_naive());
        }

        Err(format!("无法解析日期: {}", v))
    }

    /// 解析数值（兼容千分位与小数逗号）
    ///
    /// - `1.234,5` → 1234.5（最后出现的分隔符为小数点）
    /// - `1,234.5` → 1234.5
    /// - `12,5` → 12.5（单个逗号且其后不是 3 位数字时视为小数逗号）
    /// - `1,234` → 1234（逗号分组均为 3 位时视为千分位）
    pub fn parse_decimal(&self, value: &str) -> Result<f64, String> {
        let compact: String = value
            .trim()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '\'' && *c != '_')
            .collect();
        if compact.is_empty() {
            return Err("数值为空".to_string());
        }

        let last_comma = compact.rfind(',');
        let last_dot = compact.rfind('.');

        let canonical = match (last_comma, last_dot) {
            (Some(c), Some(d)) if c > d => compact.replace('.', "").replace(',', "."),
            (Some(_), Some(_)) => compact.replace(',', ""),
            (Some(_), None) => {
                let groups: Vec<&str> = compact.split(',').collect();
                let thousands = groups.len() > 1
                    && !groups[0].trim_start_matches(['-', '+']).is_empty()
                    && groups[1..].iter().all(|g| g.len() == 3);
                if thousands {
                    compact.replace(',', "")
                } else if groups.len() == 2 {
                    compact.replace(',', ".")
                } else {
                    return Err(format!("无法解析数值: {}", value.trim()));
                }
            }
            (None, Some(_)) => {
                if compact.matches('.').count() > 1 {
                    compact.replace('.', "")
                } else {
                    compact
                }
            }
            (None, None) => compact,
        };

        canonical
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("无法解析数值: {}", value.trim()))
    }

    /// 解析整数（允许 `12.0` 之类的整值小数）
    pub fn parse_integer(&self, value: &str) -> Result<i64, String> {
        let v = value.trim();
        if let Ok(i) = v.parse::<i64>() {
            return Ok(i);
        }
        let d = self.parse_decimal(v)?;
        if d.fract() == 0.0 && d.abs() < i64::MAX as f64 {
            Ok(d as i64)
        } else {
            Err(format!("期望整数: {}", v))
        }
    }

    /// 解析布尔值: true/false/1/0/y/n/yes/no
    pub fn parse_bool(&self, value: &str) -> Result<bool, String> {
        match value.trim().to_lowercase().as_str() {
            "true" | "1" | "y" | "yes" | "t" => Ok(true),
            "false" | "0" | "n" | "no" | "f" => Ok(false),
            other => Err(format!("无法解析布尔值: {}", other)),
        }
    }

    /// 解析时刻为 HH:MM
    ///
    /// 支持: HH:MM / H:MM / HH:MM:SS / HHMM
    pub fn parse_time_of_day(&self, value: &str) -> Result<String, String> {
        let v = value.trim();
        let parsed = NaiveTime::parse_from_str(v, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(v, "%H:%M:%S"))
            .ok()
            .or_else(|| {
                let compact = v.len() == 4 && v.chars().all(|c| c.is_ascii_digit());
                compact
                    .then(|| NaiveTime::parse_from_str(v, "%H%M").ok())
                    .flatten()
            })
            .ok_or_else(|| format!("无法解析时刻: {}", v))?;
        Ok(parsed.format("%H:%M").to_string())
    }

    /// 午夜起的分钟数转为 HH:MM
    pub fn minutes_to_time_of_day(&self, minutes: i64) -> Result<String, String> {
        if !(0..24 * 60).contains(&minutes) {
            return Err(format!("时刻分钟数超出范围: {}", minutes));
        }
        Ok(format!("{:02}:{:02}", minutes / 60, minutes % 60))
    }

    /// 解析时长为分钟数
    ///
    /// 支持: 分钟整数（90）/ H:MM（1:30）
    pub fn parse_minutes(&self, value: &str) -> Result<i64, String> {
        let v = value.trim();
        if let Some((hours, minutes)) = v.split_once(':') {
            let h = hours
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("无法解析时长: {}", v))?;
            let m = minutes
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("无法解析时长: {}", v))?;
            if h < 0 || !(0..60).contains(&m) {
                return Err(format!("无法解析时长: {}", v));
            }
            return Ok(h * 60 + m);
        }

        let minutes = self.parse_integer(v)?;
        if minutes < 0 {
            return Err(format!("时长不能为负: {}", v));
        }
        Ok(minutes)
    }

    /// 校验数值范围 [min, max]
    pub fn validate_range(&self, value: f64, min: f64, max: f64) -> Result<f64, String> {
        if value < min || value > max {
            Err(format!("值 {} 超出范围 [{}, {}]", value, min, max))
        } else {
            Ok(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_basic() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.clean_text("  n123ab  ", true), "N123AB");
        assert_eq!(cleaner.clean_text("  hello  ", false), "hello");
    }

    #[test]
    fn test_normalize_null_sentinels() {
        let cleaner = DataCleaner;
        for sentinel in ["", "  ", "NULL", "None", "n/a", "N/A", "-"] {
            assert_eq!(cleaner.normalize_null(Some(sentinel.to_string())), None);
        }
        assert_eq!(
            cleaner.normalize_null(Some("  value  ".to_string())),
            Some("value".to_string())
        );
        assert_eq!(cleaner.normalize_null(None), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let cleaner = DataCleaner;
        let expected = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(cleaner.parse_date("2024-01-05").unwrap(), expected);
        assert_eq!(cleaner.parse_date("20240105").unwrap(), expected);
        assert_eq!(cleaner.parse_date("05/01/2024").unwrap(), expected);
        assert_eq!(cleaner.parse_date("2024-01-05T13:45:00").unwrap(), expected);
        assert_eq!(cleaner.parse_date("2024-01-05 13:45:00").unwrap(), expected);
        assert!(cleaner.parse_date("2024-13-40").is_err());
        assert!(cleaner.parse_date("yesterday").is_err());
    }

    #[test]
    fn test_parse_decimal_locales() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.parse_decimal("1.234,5").unwrap(), 1234.5);
        assert_eq!(cleaner.parse_decimal("1,234.5").unwrap(), 1234.5);
        assert_eq!(cleaner.parse_decimal("12,5").unwrap(), 12.5);
        assert_eq!(cleaner.parse_decimal("1,234").unwrap(), 1234.0);
        assert_eq!(cleaner.parse_decimal("1.234.567").unwrap(), 1234567.0);
        assert_eq!(cleaner.parse_decimal("-33.9461").unwrap(), -33.9461);
        assert_eq!(cleaner.parse_decimal("12").unwrap(), 12.0);
        assert!(cleaner.parse_decimal("abc").is_err());
        assert!(cleaner.parse_decimal("1,2,3").is_err());
    }

    #[test]
    fn test_parse_integer() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.parse_integer("42").unwrap(), 42);
        assert_eq!(cleaner.parse_integer("42.0").unwrap(), 42);
        assert!(cleaner.parse_integer("42.5").is_err());
    }

    #[test]
    fn test_parse_bool() {
        let cleaner = DataCleaner;
        for v in ["true", "1", "y", "Yes"] {
            assert!(cleaner.parse_bool(v).unwrap());
        }
        for v in ["false", "0", "n", "NO"] {
            assert!(!cleaner.parse_bool(v).unwrap());
        }
        assert!(cleaner.parse_bool("maybe").is_err());
    }

    #[test]
    fn test_parse_time_and_minutes() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.parse_time_of_day("9:05").unwrap(), "09:05");
        assert_eq!(cleaner.parse_time_of_day("0930").unwrap(), "09:30");
        assert_eq!(cleaner.parse_time_of_day("23:59:59").unwrap(), "23:59");
        assert!(cleaner.parse_time_of_day("25:00").is_err());
        assert_eq!(cleaner.minutes_to_time_of_day(570).unwrap(), "09:30");
        assert!(cleaner.minutes_to_time_of_day(1440).is_err());

        assert_eq!(cleaner.parse_minutes("90").unwrap(), 90);
        assert_eq!(cleaner.parse_minutes("1:30").unwrap(), 90);
        assert!(cleaner.parse_minutes("1:75").is_err());
        assert!(cleaner.parse_minutes("-5").is_err());
    }

    #[test]
    fn test_validate_range() {
        let cleaner = DataCleaner;
        assert!(cleaner.validate_range(5.0, 0.0, 10.0).is_ok());
        assert!(cleaner.validate_range(-1.0, 0.0, 10.0).is_err());
        assert!(cleaner.validate_range(11.0, 0.0, 10.0).is_err());
    }
}
