// ==========================================
// 飞行日志导入导出 - 核心库
// ==========================================
// 流程: JSON / CSV → 分类 → 规范化 → 引用解析 → 分层批量写入 → SQLite
//       SQLite → CSV 导出
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 外部数据
pub mod importer;

// 导出层 - CSV
pub mod exporter;

// 配置层 - 管道配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{EntityKind, ImportPhase, RefPolicy, UpsertStatus};

// 导入 / 导出
pub use exporter::{CsvExporter, ExportLayout, ExportSummary};
pub use importer::{CancelToken, ImportError, ImportReport, LogbookImporter, PilotLogImporter};

// 配置与存储
pub use config::PipelineConfig;
pub use repository::{EntityRepository, SqliteEntityRepository};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "飞行日志导入导出";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
