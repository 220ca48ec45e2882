// ==========================================
// CSV 导出 / 回读集成测试
// ==========================================
// 测试目标: 导入 → 导出 → 再导入 无语义损失
// ==========================================


use pilotlog_transfer::domain::{EntityKind, FieldValue};
use pilotlog_transfer::importer::LogbookImporter;
use pilotlog_transfer::logging;
use pilotlog_transfer::{CsvExporter, EntityRepository, ExportLayout, PipelineConfig};
use std::collections::HashMap;
use tempfile::TempDir;
use test_helpers::{
    create_repo, create_test_db, create_test_importer, fixture_path, write_input_file,
};

/// 读取 CSV 为 (表头, 行)
fn read_csv(path: &std::path::Path) -> (Vec<String>, Vec<HashMap<String, String>>) {
    let mut reader = csv::Reader::from_path(path).expect("Failed to open csv");
    let headers: Vec<String> = reader
        .headers()
        .unwrap()
        .iter()
        .map(|h| h.to_string())
        .collect();
    let rows = reader
        .records()
        .map(|r| {
            let record = r.unwrap();
            headers
                .iter()
                .cloned()
                .zip(record.iter().map(|c| c.to_string()))
                .collect()
        })
        .collect();
    (headers, rows)
}

#[tokio::test]
async fn test_unified_export_renders_natural_keys() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let importer = create_test_importer(&db_path, PipelineConfig::default());
    importer
        .import_file(&fixture_path("full_logbook.json"))
        .await
        .unwrap();

    let dir = TempDir::new().unwrap();
    let out = dir.path().join("logbook.csv");
    let summary = CsvExporter::new(create_repo(&db_path))
        .export(&out, ExportLayout::Unified)
        .await
        .unwrap();

    assert_eq!(summary.total_rows, 10);
    assert_eq!(summary.files, vec![out.clone()]);

    let (headers, rows) = read_csv(&out);
    assert_eq!(headers[0], "table");
    assert_eq!(rows.len(), 10);

    // 行按类型顺序: 第 0 层在前
    assert_eq!(rows[0]["table"], "aircraft");

    let flight = rows.iter().find(|r| r["table"] == "flight").unwrap();
    assert_eq!(flight["flight_key"], "FL-0001");
    assert_eq!(flight["aircraft"], "N123AB");
    assert_eq!(flight["pilot"], "J.DOE");
    assert_eq!(flight["origin"], "KJFK");
    assert_eq!(flight["destination"], "KBOS");
    assert_eq!(flight["date"], "2024-01-05");
    assert_eq!(flight["total_minutes"], "95");
    assert_eq!(flight["registration"], "");

    let aircraft = rows.iter().find(|r| r["table"] == "aircraft").unwrap();
    assert_eq!(aircraft["active"], "true");
    assert_eq!(aircraft["complex"], "false");

    let image = rows.iter().find(|r| r["table"] == "image").unwrap();
    assert_eq!(image["parent"], "flight:FL-0001");

    let limit = rows.iter().find(|r| r["table"] == "limit").unwrap();
    assert_eq!(limit["target"], "pilot:J.DOE");
    assert_eq!(limit["threshold"], "600");
}

#[tokio::test]
async fn test_scoped_limit_target_stored_as_id_and_exported_as_key() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let importer = create_test_importer(&db_path, PipelineConfig::default());

    let file = write_input_file(
        ".json",
        r#"[
            {"table": "limitrules", "limit_key": "L1", "rule_type": "max_duty", "scope": "pilot", "target": "J.DOE", "threshold": "600"},
            {"table": "pilot", "id": "J.DOE", "license": "PPL"}
        ]"#,
    );
    let report = importer.import_file(file.path()).await.unwrap();
    assert_eq!(report.rejected, 0, "report: {}", report);
    assert_eq!(report.accepted, 2);

    let repo = importer.repository();
    let pilot = repo.find(EntityKind::Pilot, "J.DOE").await.unwrap().unwrap();
    let limit = repo.find(EntityKind::Limit, "L1").await.unwrap().unwrap();
    assert_eq!(
        limit.fields["target"],
        FieldValue::Text(format!("pilot:{}", pilot.id))
    );

    let dir = TempDir::new().unwrap();
    let out = dir.path().join("logbook.csv");
    CsvExporter::new(create_repo(&db_path))
        .export(&out, ExportLayout::Unified)
        .await
        .unwrap();

    let (_, rows) = read_csv(&out);
    let row = rows.iter().find(|r| r["table"] == "limit").unwrap();
    assert_eq!(row["target"], "pilot:J.DOE");
    assert_eq!(row["scope"], "pilot");

    // 回读导出文件: 前缀被剥离,目标不变
    let again = importer.import_file(&out).await.unwrap();
    assert_eq!(again.rejected, 0, "report: {}", again);
    assert_eq!(again.unchanged, 2);
}

#[tokio::test]
async fn test_reimport_of_unified_export_is_noop() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let importer = create_test_importer(&db_path, PipelineConfig::default());
    importer
        .import_file(&fixture_path("full_logbook.json"))
        .await
        .unwrap();

    let dir = TempDir::new().unwrap();
    let out = dir.path().join("logbook.csv");
    CsvExporter::new(create_repo(&db_path))
        .export(&out, ExportLayout::Unified)
        .await
        .unwrap();

    let report = importer.import_file(&out).await.unwrap();

    assert_eq!(report.total_records, 10);
    assert_eq!(report.rejected, 0, "report: {}", report);
    assert_eq!(report.created, 0);
    assert_eq!(report.updated, 0);
    assert_eq!(report.unchanged, 10);
}

#[tokio::test]
async fn test_export_into_fresh_store_reproduces_same_csv() {
    logging::init_test();

    let (_db_a, path_a) = create_test_db().expect("Failed to create test db");
    let (_db_b, path_b) = create_test_db().expect("Failed to create test db");
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("first.csv");
    let second = dir.path().join("second.csv");

    create_test_importer(&path_a, PipelineConfig::default())
        .import_file(&fixture_path("full_logbook.json"))
        .await
        .unwrap();
    CsvExporter::new(create_repo(&path_a))
        .export(&first, ExportLayout::Unified)
        .await
        .unwrap();

    let report = create_test_importer(&path_b, PipelineConfig::default())
        .import_file(&first)
        .await
        .unwrap();
    assert_eq!(report.created, 10, "report: {}", report);

    CsvExporter::new(create_repo(&path_b))
        .export(&second, ExportLayout::Unified)
        .await
        .unwrap();

    let a = std::fs::read_to_string(&first).unwrap();
    let b = std::fs::read_to_string(&second).unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_split_export_one_file_per_type() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    create_test_importer(&db_path, PipelineConfig::default())
        .import_file(&fixture_path("example_scenario.json"))
        .await
        .unwrap();

    let dir = TempDir::new().unwrap();
    let summary = CsvExporter::new(create_repo(&db_path))
        .export(&dir.path().join("logbook.csv"), ExportLayout::PerEntity)
        .await
        .unwrap();

    assert_eq!(summary.files.len(), EntityKind::ALL.len());
    assert_eq!(summary.rows_per_kind[&EntityKind::Flight], 1);
    assert_eq!(summary.rows_per_kind[&EntityKind::Image], 0);

    let (headers, rows) = read_csv(&dir.path().join("logbook_flight.csv"));
    assert_eq!(headers[0], "table");
    assert_eq!(headers[1], "flight_key");
    assert!(!headers.contains(&"registration".to_string()));
    assert_eq!(rows[0]["aircraft"], "N123AB");
    assert_eq!(rows[0]["pilot"], "J.DOE");

    // 按类型拆分的文件同样可以回读
    let repo = create_repo(&db_path);
    let before = repo.count(EntityKind::Aircraft).await.unwrap();
    let report = create_test_importer(&db_path, PipelineConfig::default())
        .import_file(&dir.path().join("logbook_aircraft.csv"))
        .await
        .unwrap();
    assert_eq!(report.unchanged, 1);
    assert_eq!(repo.count(EntityKind::Aircraft).await.unwrap(), before);
}
