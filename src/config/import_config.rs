// ==========================================
// 商品批量导入引擎 - 导入配置
// ==========================================
// 职责: 可识别的导入选项 + 结果回调列表
// 红线: 交给工厂后不可变（按值移交）
// ==========================================

use crate::config::error::ConfigError;
use crate::domain::Product;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;

/// 结果回调：每条记录 flush 完成后按提交顺序调用一次
pub type ResultCallback = Box<dyn FnMut(&Product)>;

/// 默认属性集名称（新建商品未指定属性集时使用）
pub const DEFAULT_ATTRIBUTE_SET_NAME: &str = "Default";

// ==========================================
// ImportOptions - 可序列化的配置子集
// ==========================================
// 用途: 从 JSON 读取选项（回调无法序列化，不在此处）
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImportOptions {
    #[serde(default)]
    pub attributes: BTreeSet<String>,

    #[serde(default = "default_attribute_set_name")]
    pub default_attribute_set: String,
}

fn default_attribute_set_name() -> String {
    DEFAULT_ATTRIBUTE_SET_NAME.to_string()
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            attributes: BTreeSet::new(),
            default_attribute_set: default_attribute_set_name(),
        }
    }
}

// ==========================================
// ImportConfig - 导入配置
// ==========================================
pub struct ImportConfig {
    /// 要同步的属性代码；为空 = 记录上出现的全部属性
    pub attributes: BTreeSet<String>,

    /// 结果回调（按注册顺序调用）
    pub callbacks: Vec<ResultCallback>,

    /// 新建商品未指定属性集时使用的属性集名称
    pub default_attribute_set: String,
}

impl ImportConfig {
    pub fn new() -> Self {
        Self::from_options(ImportOptions::default())
    }

    pub fn from_options(options: ImportOptions) -> Self {
        Self {
            attributes: options.attributes,
            callbacks: Vec::new(),
            default_attribute_set: options.default_attribute_set,
        }
    }

    /// 从 JSON 读取选项
    ///
    /// # 示例
    /// ```
    /// use catalog_import::config::ImportConfig;
    /// let config = ImportConfig::from_json_options(r#"{"attributes": ["name", "price"]}"#).unwrap();
    /// assert_eq!(config.attributes.len(), 2);
    /// ```
    pub fn from_json_options(json: &str) -> Result<Self, ConfigError> {
        let options: ImportOptions =
            serde_json::from_str(json).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(Self::from_options(options))
    }

    pub fn with_attributes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = codes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_default_attribute_set(mut self, name: impl Into<String>) -> Self {
        self.default_attribute_set = name.into();
        self
    }

    pub fn add_callback<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&Product) + 'static,
    {
        self.callbacks.push(Box::new(callback));
        self
    }

    /// 该属性是否需要同步
    pub fn syncs_attribute(&self, code: &str) -> bool {
        self.attributes.is_empty() || self.attributes.contains(code)
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ImportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportConfig")
            .field("attributes", &self.attributes)
            .field("callbacks", &self.callbacks.len())
            .field("default_attribute_set", &self.default_attribute_set)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_default_attribute_set() {
        let config = ImportConfig::new();
        assert_eq!(config.default_attribute_set, "Default");
        assert!(config.attributes.is_empty());
    }

    #[test]
    fn test_syncs_attribute() {
        let all = ImportConfig::new();
        assert!(all.syncs_attribute("color"));

        let some = ImportConfig::new().with_attributes(["name", "price"]);
        assert!(some.syncs_attribute("price"));
        assert!(!some.syncs_attribute("color"));
    }

    #[test]
    fn test_from_json_options() {
        let config = ImportConfig::from_json_options(
            r#"{"attributes": ["name"], "default_attribute_set": "Boxes"}"#,
        )
        .unwrap();

        assert!(config.attributes.contains("name"));
        assert_eq!(config.default_attribute_set, "Boxes");
    }

    #[test]
    fn test_from_json_options_rejects_unknown_option() {
        let result = ImportConfig::from_json_options(r#"{"batch_size": 100}"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
