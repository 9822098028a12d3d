// ==========================================
// 商品批量导入引擎 - 领域类型定义
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// 实体 ID（store 生成）
pub type EntityId = i64;

/// 作用域 ID（store_id）
pub type StoreId = i64;

/// 全局作用域（admin）的 store_id
pub const GLOBAL_STORE_ID: StoreId = 0;

/// 全局作用域的 store view 代码
pub const GLOBAL_STORE_CODE: &str = "admin";

// ==========================================
// 引用类型 (Reference Kind)
// ==========================================
// 每种引用对应 resolver 中的一个独立缓存
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceKind {
    AttributeSet, // 属性集（按名称）
    TaxClass,     // 税类（按名称）
    Category,     // 分类（按名称）
    StoreView,    // 店铺视图（按代码）
}

impl ReferenceKind {
    pub const ALL: [ReferenceKind; 4] = [
        ReferenceKind::AttributeSet,
        ReferenceKind::TaxClass,
        ReferenceKind::Category,
        ReferenceKind::StoreView,
    ];

    /// 行级错误消息中使用的名称
    pub fn label(&self) -> &'static str {
        match self {
            ReferenceKind::AttributeSet => "attribute set name",
            ReferenceKind::TaxClass => "tax class name",
            ReferenceKind::Category => "category name",
            ReferenceKind::StoreView => "store view code",
        }
    }

    /// 按 ID 引用时行级错误消息中使用的名称
    pub fn id_label(&self) -> &'static str {
        match self {
            ReferenceKind::AttributeSet => "attribute set id",
            ReferenceKind::TaxClass => "tax class id",
            ReferenceKind::Category => "category id",
            ReferenceKind::StoreView => "store view id",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::AttributeSet => write!(f, "ATTRIBUTE_SET"),
            ReferenceKind::TaxClass => write!(f, "TAX_CLASS"),
            ReferenceKind::Category => write!(f, "CATEGORY"),
            ReferenceKind::StoreView => write!(f, "STORE_VIEW"),
        }
    }
}

// ==========================================
// 商品状态 (Product Status)
// ==========================================
// 存储值: 1 = 启用, 2 = 禁用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    Enabled,
    Disabled,
}

impl ProductStatus {
    pub fn code(&self) -> i64 {
        match self {
            ProductStatus::Enabled => 1,
            ProductStatus::Disabled => 2,
        }
    }
}

// ==========================================
// 可见性 (Visibility)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    NotVisible, // 1
    InCatalog,  // 2
    InSearch,   // 3
    Both,       // 4
}

impl Visibility {
    pub fn code(&self) -> i64 {
        match self {
            Visibility::NotVisible => 1,
            Visibility::InCatalog => 2,
            Visibility::InSearch => 3,
            Visibility::Both => 4,
        }
    }
}

// ==========================================
// 属性存储类型 (Backend Type)
// ==========================================
// 与 eav_attribute.backend_type 列一致（小写）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    Varchar,
    Text,
    Int,
    Decimal,
    Datetime,
}

impl BackendType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "varchar" => Some(BackendType::Varchar),
            "text" => Some(BackendType::Text),
            "int" => Some(BackendType::Int),
            "decimal" => Some(BackendType::Decimal),
            "datetime" => Some(BackendType::Datetime),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendType::Varchar => "varchar",
            BackendType::Text => "text",
            BackendType::Int => "int",
            BackendType::Decimal => "decimal",
            BackendType::Datetime => "datetime",
        }
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
