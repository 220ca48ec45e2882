// ==========================================
// 飞行日志导入导出 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有值使用参数化绑定;表名/列名只来自固定 schema
// ==========================================

pub mod entity_repo;
pub mod error;
pub mod sqlite_repo;

// 重导出核心仓储
pub use entity_repo::{EntityRepository, EntityRow, StoredEntity, UpsertOutcome};
pub use error::{RepositoryError, RepositoryResult};
pub use sqlite_repo::SqliteEntityRepository;
