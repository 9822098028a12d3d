// ==========================================
// 商品批量导入引擎 - 配置错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 配置错误：工厂构建时一次性返回，不会创建 Importer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("未知属性代码: {0}")]
    UnknownAttribute(String),

    #[error("属性代码为空")]
    BlankAttribute,

    #[error("配置格式错误: {0}")]
    Invalid(String),
}
