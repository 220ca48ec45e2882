// ==========================================
// 飞行日志导入导出 - 领域模型层
// ==========================================
// 职责: 定义实体类型、固定字段集合、规范记录
// 红线: 不含数据访问逻辑
// ==========================================

pub mod record;
pub mod schema;
pub mod types;
pub mod value;

// 重导出核心类型
pub use record::{CanonicalRecord, LimitScope, RawRecord, StagedRecord};
pub use schema::{ColumnDef, ColumnType};
pub use types::{EntityKind, ImportPhase, RefPolicy, RefTarget, UpsertStatus};
pub use value::{FieldMap, FieldValue};
