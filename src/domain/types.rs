// ==========================================
// 飞行日志导入导出 - 领域类型定义
// ==========================================
// 职责: 实体类型 / 依赖层级 / 引用策略 / 导入阶段
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 实体类型 (Entity Kind)
// ==========================================
// 声明顺序即导出顺序,也是依赖顺序（父实体在前）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Aircraft,      // 航空器
    Pilot,         // 飞行员
    Airfield,      // 机场
    Setting,       // 配置项
    Flight,        // 飞行记录
    Limit,         // 限制规则
    Query,         // 保存的查询
    Image,         // 图片附件
    Qualification, // 资质
}

impl EntityKind {
    pub const ALL: [EntityKind; 9] = [
        EntityKind::Aircraft,
        EntityKind::Pilot,
        EntityKind::Airfield,
        EntityKind::Setting,
        EntityKind::Flight,
        EntityKind::Limit,
        EntityKind::Query,
        EntityKind::Image,
        EntityKind::Qualification,
    ];

    /// 规范名称（CSV 导出 table 列 / 日志）
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Aircraft => "aircraft",
            EntityKind::Pilot => "pilot",
            EntityKind::Airfield => "airfield",
            EntityKind::Setting => "setting",
            EntityKind::Flight => "flight",
            EntityKind::Limit => "limit",
            EntityKind::Query => "query",
            EntityKind::Image => "image",
            EntityKind::Qualification => "qualification",
        }
    }

    /// SQLite 表名（避开 LIMIT / QUERY 关键字）
    pub fn table_name(&self) -> &'static str {
        match self {
            EntityKind::Aircraft => "aircraft",
            EntityKind::Pilot => "pilot",
            EntityKind::Airfield => "airfield",
            EntityKind::Setting => "setting",
            EntityKind::Flight => "flight",
            EntityKind::Limit => "limit_rule",
            EntityKind::Query => "saved_query",
            EntityKind::Image => "image",
            EntityKind::Qualification => "qualification",
        }
    }

    /// 写入层级
    ///
    /// - 0: 无依赖（Aircraft / Pilot / Airfield / Setting）
    /// - 1: 依赖层级 0（Flight / Limit / Query）
    /// - 2: 依赖层级 0-1（Image / Qualification）
    pub fn tier(&self) -> usize {
        match self {
            EntityKind::Aircraft
            | EntityKind::Pilot
            | EntityKind::Airfield
            | EntityKind::Setting => 0,
            EntityKind::Flight | EntityKind::Limit | EntityKind::Query => 1,
            EntityKind::Qualification => 2,
            // 图片可挂在任意实体（含资质与其他图片）下,单独作为最后一层
            EntityKind::Image => 3,
        }
    }

    /// 按层级分组（层级内的实体类型互不依赖,可并发写入）
    pub fn tiers() -> Vec<Vec<EntityKind>> {
        let max_tier = Self::ALL.iter().map(|k| k.tier()).max().unwrap_or(0);
        (0..=max_tier)
            .map(|tier| {
                Self::ALL
                    .iter()
                    .copied()
                    .filter(|k| k.tier() == tier)
                    .collect()
            })
            .collect()
    }

    /// 从源文件的 table 标签解析实体类型
    ///
    /// 兼容原始日志导出的表名（imagepic / limitrules / myquery / settingconfig 等）
    /// 以及本系统 CSV 导出的规范名称。
    pub fn from_table_tag(tag: &str) -> Option<Self> {
        let normalized: String = tag
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "aircraft" => Some(EntityKind::Aircraft),
            "pilot" => Some(EntityKind::Pilot),
            "airfield" | "airport" => Some(EntityKind::Airfield),
            "setting" | "settingconfig" => Some(EntityKind::Setting),
            "flight" | "flights" => Some(EntityKind::Flight),
            "limit" | "limitrule" | "limitrules" => Some(EntityKind::Limit),
            "query" | "myquery" | "myquerybuild" | "savedquery" => Some(EntityKind::Query),
            "image" | "imagepic" => Some(EntityKind::Image),
            "qualification" => Some(EntityKind::Qualification),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::from_table_tag(s).ok_or_else(|| format!("未知实体类型: {}", s))
    }
}

// ==========================================
// 引用目标 (Reference Target)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefTarget {
    Kind(EntityKind), // 指定实体类型
    Any,              // 任意实体（存储为 "kind:id"）
}

impl fmt::Display for RefTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefTarget::Kind(kind) => write!(f, "{}", kind),
            RefTarget::Any => write!(f, "any"),
        }
    }
}

// ==========================================
// 缺失引用策略 (Missing Reference Policy)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefPolicy {
    Reject,     // 拒绝依赖记录
    CreateStub, // 自动创建占位实体
}

impl FromStr for RefPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "reject" | "fail" => Ok(RefPolicy::Reject),
            "create_stub" | "stub" => Ok(RefPolicy::CreateStub),
            other => Err(format!("未知引用策略: {}", other)),
        }
    }
}

// ==========================================
// 写入结果状态 (Upsert Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertStatus {
    Created,   // 新建
    Updated,   // 字段有变化,已更新
    Unchanged, // 字段无变化,未写入
}

// ==========================================
// 导入阶段 (Import Phase)
// ==========================================
// Idle → Reading → ClassifyingNormalizing → Resolving → Writing → Reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportPhase {
    Idle,
    Reading,
    ClassifyingNormalizing,
    Resolving,
    Writing,
    Reported,
}

impl ImportPhase {
    /// 下一阶段（Reported 为终态）
    pub fn next(&self) -> Option<ImportPhase> {
        match self {
            ImportPhase::Idle => Some(ImportPhase::Reading),
            ImportPhase::Reading => Some(ImportPhase::ClassifyingNormalizing),
            ImportPhase::ClassifyingNormalizing => Some(ImportPhase::Resolving),
            ImportPhase::Resolving => Some(ImportPhase::Writing),
            ImportPhase::Writing => Some(ImportPhase::Reported),
            ImportPhase::Reported => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportPhase::Reported)
    }
}

impl fmt::Display for ImportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImportPhase::Idle => "IDLE",
            ImportPhase::Reading => "READING",
            ImportPhase::ClassifyingNormalizing => "CLASSIFYING_NORMALIZING",
            ImportPhase::Resolving => "RESOLVING",
            ImportPhase::Writing => "WRITING",
            ImportPhase::Reported => "REPORTED",
        };
        write!(f, "{}", name)
    }
}
