// ==========================================
// 飞行日志导入导出 - 导出层
// ==========================================
// 职责: 存储 → 扁平 CSV（统一文件或按类型拆分）
// 错误: 复用导入层错误类型
// ==========================================

pub mod csv_exporter;

pub use csv_exporter::{CsvExporter, ExportLayout, ExportSummary};
