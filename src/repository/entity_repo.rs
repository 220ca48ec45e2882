// ==========================================
// 飞行日志导入导出 - 实体仓储 Trait
// ==========================================
// 职责: 定义导入/导出所需的数据访问接口
// 红线: Repository 不含业务规则,只做数据读写
// ==========================================

use crate::domain::types::{EntityKind, UpsertStatus};
use crate::domain::value::FieldMap;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

/// 待写入的实体行（引用列已绑定为 id）
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRow {
    pub natural_key: String,
    pub fields: FieldMap,
}

/// 已存储的实体行
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntity {
    pub id: i64,
    pub natural_key: String,
    pub fields: FieldMap,
}

/// upsert 结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub id: i64,
    pub status: UpsertStatus,
}

// ==========================================
// EntityRepository Trait
// ==========================================
// 实现者: SqliteEntityRepository（使用 rusqlite）
#[async_trait]
pub trait EntityRepository: Send + Sync {
    /// 按自然键插入或更新单条记录
    ///
    /// # 返回
    /// - Created: 新建
    /// - Updated: 已存在且字段有变化
    /// - Unchanged: 已存在且字段相同（不写入）
    async fn upsert(
        &self,
        kind: EntityKind,
        natural_key: &str,
        fields: &FieldMap,
    ) -> RepositoryResult<UpsertOutcome>;

    /// 批量 upsert（一个事务,每条记录一个 savepoint）
    ///
    /// # 返回
    /// - Ok(Vec): 与输入一一对应的逐条结果,单条失败不影响其他记录
    /// - Err: 事务本身失败（整批未提交）
    async fn upsert_batch(
        &self,
        kind: EntityKind,
        rows: &[EntityRow],
    ) -> RepositoryResult<Vec<RepositoryResult<UpsertOutcome>>>;

    /// 按自然键查找,自然键未命中时按 guid / 源系统编码查找
    async fn find(&self, kind: EntityKind, key: &str) -> RepositoryResult<Option<StoredEntity>>;

    /// 按 id 顺序列出全部记录
    async fn list_all(&self, kind: EntityKind) -> RepositoryResult<Vec<StoredEntity>>;

    /// 记录数
    async fn count(&self, kind: EntityKind) -> RepositoryResult<i64>;
}
