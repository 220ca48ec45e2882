// ==========================================
// 飞行日志导入导出 - 导入层
// ==========================================
// 职责: 外部日志文件导入,生成规范实体并落库
// 支持: JSON（原始日志导出）, CSV（本系统导出文件回读）
// ==========================================

// 模块声明
pub mod aliases;
pub mod bulk_writer;
pub mod cancel;
pub mod conflict_handler;
pub mod data_cleaner;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod importer_impl;
pub mod importer_trait;
pub mod record_classifier;
pub mod reference_resolver;
pub mod report;

// 重导出核心类型
pub use bulk_writer::{BulkWriter, WrittenRecord};
pub use cancel::CancelToken;
pub use conflict_handler::NaturalKeyConflictHandler;
pub use data_cleaner::DataCleaner;
pub use error::{ImportError, ImportResult, RecordError};
pub use field_mapper::FieldMapper;
pub use file_parser::{CsvParser, JsonParser, UniversalFileParser};
pub use importer_impl::PilotLogImporter;
pub use record_classifier::ShapeClassifier;
pub use reference_resolver::{RecordArena, ReferenceResolver, ResolveStats};
pub use report::{ImportReport, KindStats, Rejection};

// 重导出 Trait 接口
pub use importer_trait::{
    ConflictHandler, DuplicateRecord, FieldNormalizer, FileParser, LogbookImporter,
    RecordClassifier,
};
