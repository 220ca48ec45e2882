// ==========================================
// 飞行日志导入导出 - 文件解析器实现
// ==========================================
// 阶段: READING（读取与解析）
// 支持: JSON (.json) / CSV (.csv)
// ==========================================

use crate::domain::record::RawRecord;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::importer_trait::FileParser;
use csv::ReaderBuilder;
use serde_json::{Map, Value};
use std::fs::{self, File};
use std::path::Path;

/// 打开前检查文件存在性
fn ensure_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

fn io_failure(path: &Path, err: std::io::Error) -> ImportError {
    ImportError::IoFailure {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

// ==========================================
// JSON Parser 实现
// ==========================================
// 顶层结构: 记录数组,或 {"records": [...]} / {"data": [...]}
// 任一元素不是对象 → 整个文件结构无效
pub struct JsonParser;

impl JsonParser {
    fn top_level_records(root: Value) -> ImportResult<Vec<Value>> {
        match root {
            Value::Array(items) => Ok(items),
            Value::Object(mut object) => {
                for key in ["records", "data"] {
                    if let Some(Value::Array(items)) = object.remove(key) {
                        return Ok(items);
                    }
                }
                Err(ImportError::InvalidStructure(
                    "顶层对象缺少 records / data 数组".to_string(),
                ))
            }
            other => Err(ImportError::InvalidStructure(format!(
                "顶层必须为数组,实际为 {}",
                json_type_name(&other)
            ))),
        }
    }
}

impl FileParser for JsonParser {
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<Vec<RawRecord>> {
        ensure_exists(file_path)?;

        let content = fs::read_to_string(file_path).map_err(|e| io_failure(file_path, e))?;
        let root: Value = serde_json::from_str(&content)?;
        let items = Self::top_level_records(root)?;

        let mut records = Vec::with_capacity(items.len());
        for (idx, item) in items.into_iter().enumerate() {
            match item {
                Value::Object(map) => records.push(RawRecord::from_object(idx + 1, map)),
                other => {
                    return Err(ImportError::InvalidStructure(format!(
                        "第 {} 条记录不是对象（{}）",
                        idx + 1,
                        json_type_name(&other)
                    )))
                }
            }
        }

        Ok(records)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ==========================================
// CSV Parser 实现
// ==========================================
// 用于回读导出文件: 空单元格视为缺失字段,完全空白的行跳过
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<Vec<RawRecord>> {
        ensure_exists(file_path)?;

        let file = File::open(file_path).map_err(|e| io_failure(file_path, e))?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        // 读取表头
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut records = Vec::new();
        for (row_idx, result) in reader.records().enumerate() {
            let record = result?;
            let mut row_map = Map::new();

            for (col_idx, value) in record.iter().enumerate() {
                let value = value.trim();
                if value.is_empty() {
                    continue;
                }
                if let Some(header) = headers.get(col_idx) {
                    row_map.insert(header.clone(), Value::String(value.to_string()));
                }
            }

            // 跳过完全空白的行
            if row_map.is_empty() {
                continue;
            }

            records.push(RawRecord::from_object(row_idx + 1, row_map));
        }

        Ok(records)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl FileParser for UniversalFileParser {
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<Vec<RawRecord>> {
        let ext = file_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "json" => JsonParser.parse_to_raw_records(file_path),
            "csv" => CsvParser.parse_to_raw_records(file_path),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_file(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_json_parser_array() {
        let file = temp_file(
            ".json",
            r#"[{"reg": "N123AB", "type": "C172"}, {"id": "J.DOE"}]"#,
        );
        let records = JsonParser.parse_to_raw_records(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].row_number, 1);
        assert_eq!(records[1].row_number, 2);
        assert_eq!(records[0].text(&["reg"]).as_deref(), Some("N123AB"));
    }

    #[test]
    fn test_json_parser_wrapped_records() {
        let file = temp_file(".json", r#"{"records": [{"reg": "N1"}]}"#);
        let records = JsonParser.parse_to_raw_records(file.path()).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_json_parser_empty_array() {
        let file = temp_file(".json", "[]");
        let records = JsonParser.parse_to_raw_records(file.path()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_json_parser_non_object_element_rejects_file() {
        let file = temp_file(".json", r#"[{"reg": "N1"}, 42]"#);
        let err = JsonParser.parse_to_raw_records(file.path()).unwrap_err();
        assert!(matches!(err, ImportError::InvalidStructure(_)));
    }

    #[test]
    fn test_json_parser_scalar_root_rejected() {
        let file = temp_file(".json", r#""hello""#);
        let err = JsonParser.parse_to_raw_records(file.path()).unwrap_err();
        assert!(matches!(err, ImportError::InvalidStructure(_)));
    }

    #[test]
    fn test_json_parser_malformed_json() {
        let file = temp_file(".json", r#"[{"reg": "N1""#);
        let err = JsonParser.parse_to_raw_records(file.path()).unwrap_err();
        assert!(matches!(err, ImportError::InvalidStructure(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = UniversalFileParser
            .parse_to_raw_records(Path::new("/nonexistent/logbook.json"))
            .unwrap_err();
        assert!(matches!(err, ImportError::FileNotFound(_)));
    }

    #[test]
    fn test_csv_parser_skips_blank_cells_and_rows() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "table,registration,make").unwrap();
        writeln!(file, "aircraft,N123AB,").unwrap();
        writeln!(file, ",,").unwrap();
        writeln!(file, "aircraft,N456CD,Piper").unwrap();

        let records = CsvParser.parse_to_raw_records(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].text(&["make"]).is_none());
        assert_eq!(records[1].text(&["make"]).as_deref(), Some("Piper"));
        assert_eq!(records[1].row_number, 3);
    }

    #[test]
    fn test_universal_parser_unsupported_extension() {
        let file = temp_file(".xlsx", "");
        let err = UniversalFileParser
            .parse_to_raw_records(file.path())
            .unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedFormat(ref ext) if ext == "xlsx"));
    }
}
