// ==========================================
// 飞行日志导入导出 - 配置层
// ==========================================
// 职责: 管道配置,支持多级覆写
// 顺序: 内置默认值 → JSON 配置文件 → config_kv 表 → 命令行参数
// ==========================================

pub mod config_manager;
pub mod pipeline_config;

// 重导出核心配置类型
pub use config_manager::{config_keys, get_default_db_path, ConfigManager, DB_PATH_ENV};
pub use pipeline_config::{ConfigError, PipelineConfig, RELATIONSHIPS};
