// ==========================================
// 商品批量导入引擎 - 商品领域模型
// ==========================================
// 职责: 调用方填写的输入字段 + 引擎写回的输出字段
// 红线: 输出字段（id/ok/error/errors）只能由引擎写入
// ==========================================

use crate::domain::types::{EntityId, ProductStatus, Visibility, GLOBAL_STORE_CODE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// Reference - 待解析的名称引用
// ==========================================
// Id: 调用方已给出内部 ID，无需解析
// Name: 人类可读名称，flush 时批量解析
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reference {
    Id(EntityId),
    Name(String),
}

impl Reference {
    pub fn name(name: impl Into<String>) -> Self {
        Reference::Name(name.into())
    }
}

impl From<&str> for Reference {
    fn from(name: &str) -> Self {
        Reference::Name(name.to_string())
    }
}

impl From<String> for Reference {
    fn from(name: String) -> Self {
        Reference::Name(name)
    }
}

impl From<EntityId> for Reference {
    fn from(id: EntityId) -> Self {
        Reference::Id(id)
    }
}

/// 有序引用集合（如多个分类）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct References(pub Vec<Reference>);

impl References {
    pub fn new<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Reference>,
    {
        References(items.into_iter().map(Into::into).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reference> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ==========================================
// AttributeValue - 扩展属性值
// ==========================================
// Null: 显式清空（该作用域的值被删除）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Int(i64),
    Number(f64),
    Text(String),
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::Text(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::Text(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Number(v)
    }
}

impl<T: Into<AttributeValue>> From<Option<T>> for AttributeValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(AttributeValue::Null)
    }
}

// ==========================================
// Product - 单条商品提交
// ==========================================
// 生命周期: 创建 → insert 缓冲 → flush 处理 → 回调 → 丢弃
// 同一 sku 的多行 = 同一实体的顺序更新
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Product {
    // ===== 标识 =====
    pub sku: String,

    // ===== 常用属性 =====
    pub name: Option<String>,
    pub price: Option<String>,             // decimal，如 "3.25"
    pub special_price: Option<String>,     // decimal
    pub special_from_date: Option<String>, // "YYYY-MM-DD HH:MM:SS" 或 "YYYY-MM-DD"
    pub status: Option<ProductStatus>,
    pub visibility: Option<Visibility>,

    // ===== 引用字段 =====
    pub attribute_set: Option<Reference>,
    pub tax_class: Option<Reference>,
    pub categories: Option<References>,

    // ===== 作用域 =====
    pub store_view: Option<String>, // None 或 "admin" = 全局

    // ===== 其它属性（按属性代码）=====
    #[serde(default)]
    pub custom_attributes: BTreeMap<String, AttributeValue>,

    // ===== 调用方关联信息（原样透传）=====
    pub line_number: Option<usize>,

    // ===== 输出字段（引擎写入）=====
    #[serde(skip_deserializing)]
    id: Option<EntityId>,
    #[serde(skip_deserializing)]
    ok: bool,
    #[serde(skip_deserializing)]
    errors: Vec<String>,
}

impl Product {
    pub fn new(sku: impl Into<String>) -> Self {
        Self {
            sku: sku.into(),
            ..Default::default()
        }
    }

    // ===== 构建方法 =====

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_price(mut self, price: impl Into<String>) -> Self {
        self.price = Some(price.into());
        self
    }

    pub fn with_attribute_set(mut self, reference: impl Into<Reference>) -> Self {
        self.attribute_set = Some(reference.into());
        self
    }

    pub fn with_tax_class(mut self, reference: impl Into<Reference>) -> Self {
        self.tax_class = Some(reference.into());
        self
    }

    pub fn with_categories(mut self, categories: References) -> Self {
        self.categories = Some(categories);
        self
    }

    pub fn with_store_view(mut self, code: impl Into<String>) -> Self {
        self.store_view = Some(code.into());
        self
    }

    pub fn with_line_number(mut self, line_number: usize) -> Self {
        self.line_number = Some(line_number);
        self
    }

    /// 设置扩展属性；`AttributeValue::Null` 表示显式清空
    pub fn set_attribute(&mut self, code: impl Into<String>, value: impl Into<AttributeValue>) {
        self.custom_attributes.insert(code.into(), value.into());
    }

    // ===== 输出字段（只读）=====

    pub fn id(&self) -> Option<EntityId> {
        self.id
    }

    pub fn ok(&self) -> bool {
        self.ok
    }

    /// 首条错误信息
    pub fn error(&self) -> Option<&str> {
        self.errors.first().map(String::as_str)
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// 作用域代码（未指定时为 "admin"）
    pub fn store_view_code(&self) -> &str {
        match self.store_view.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => code,
            _ => GLOBAL_STORE_CODE,
        }
    }

    /// 汇总全部待写属性（常用字段 + 扩展属性，扩展属性同名覆盖）
    ///
    /// 未设置的常用字段不出现在结果中（即不修改已存值）
    pub fn attribute_values(&self) -> BTreeMap<String, AttributeValue> {
        let mut values = BTreeMap::new();

        if let Some(name) = &self.name {
            values.insert("name".to_string(), AttributeValue::Text(name.clone()));
        }
        if let Some(price) = &self.price {
            values.insert("price".to_string(), AttributeValue::Text(price.clone()));
        }
        if let Some(special_price) = &self.special_price {
            values.insert(
                "special_price".to_string(),
                AttributeValue::Text(special_price.clone()),
            );
        }
        if let Some(from_date) = &self.special_from_date {
            values.insert(
                "special_from_date".to_string(),
                AttributeValue::Text(from_date.clone()),
            );
        }
        if let Some(status) = self.status {
            values.insert("status".to_string(), AttributeValue::Int(status.code()));
        }
        if let Some(visibility) = self.visibility {
            values.insert(
                "visibility".to_string(),
                AttributeValue::Int(visibility.code()),
            );
        }

        for (code, value) in &self.custom_attributes {
            values.insert(code.clone(), value.clone());
        }

        values
    }

    // ===== 引擎内部写入 =====

    pub(crate) fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub(crate) fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// id 只在首次成功创建时赋值，之后不可变
    pub(crate) fn assign_id(&mut self, id: EntityId) {
        if self.id.is_none() {
            self.id = Some(id);
        }
    }

    pub(crate) fn finalize(&mut self) {
        self.ok = self.errors.is_empty();
    }
}
