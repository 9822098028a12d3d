// ==========================================
// 商品批量导入引擎 - 常用结果回调
// ==========================================
// 用途: 收集结果 / 写日志 / 输出 JSON 行
// ==========================================

use crate::domain::{EntityId, Product};
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{info, warn};

/// 单条记录的导入结果快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductOutcome {
    pub line_number: Option<usize>,
    pub sku: String,
    pub id: Option<EntityId>,
    pub ok: bool,
    pub errors: Vec<String>,
}

impl ProductOutcome {
    pub fn from_product(product: &Product) -> Self {
        Self {
            line_number: product.line_number,
            sku: product.sku.clone(),
            id: product.id(),
            ok: product.ok(),
            errors: product.errors().to_vec(),
        }
    }

    /// 首条错误信息
    pub fn error(&self) -> Option<&str> {
        self.errors.first().map(String::as_str)
    }

    /// 单行 JSON（用于结果文件）
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// 把结果收集到共享列表
///
/// # 示例
/// ```
/// use catalog_import::config::ImportConfig;
/// use catalog_import::importer::sinks;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let outcomes = Rc::new(RefCell::new(Vec::new()));
/// let config = ImportConfig::new().add_callback(sinks::collect_outcomes(Rc::clone(&outcomes)));
/// assert_eq!(config.callbacks.len(), 1);
/// ```
pub fn collect_outcomes(target: Rc<RefCell<Vec<ProductOutcome>>>) -> impl FnMut(&Product) + 'static {
    move |product: &Product| {
        target
            .borrow_mut()
            .push(ProductOutcome::from_product(product));
    }
}

/// 把结果写入 tracing 日志
pub fn log_outcome(product: &Product) {
    if product.ok() {
        info!(line_number = ?product.line_number, sku = %product.sku, id = ?product.id(), "记录导入成功");
    } else {
        warn!(
            line_number = ?product.line_number,
            sku = %product.sku,
            error = product.error().unwrap_or_default(),
            "记录导入失败"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_outcomes() {
        let outcomes = Rc::new(RefCell::new(Vec::new()));
        let mut sink = collect_outcomes(Rc::clone(&outcomes));

        let mut product = Product::new("bb-1").with_line_number(3);
        product.add_error("missing sku");
        product.finalize();
        sink(&product);

        let collected = outcomes.borrow();
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].line_number, Some(3));
        assert!(!collected[0].ok);
        assert_eq!(collected[0].error(), Some("missing sku"));
    }

    #[test]
    fn test_to_json_line() {
        let mut product = Product::new("bb-2");
        product.assign_id(42);
        product.finalize();

        let line = ProductOutcome::from_product(&product).to_json_line().unwrap();

        assert_eq!(
            line,
            r#"{"line_number":null,"sku":"bb-2","id":42,"ok":true,"errors":[]}"#
        );
    }

    #[test]
    fn test_log_outcome_accepts_both_states() {
        let mut ok = Product::new("bb-3");
        ok.finalize();
        log_outcome(&ok);

        let mut failed = Product::new("");
        failed.add_error("missing sku");
        failed.finalize();
        log_outcome(&failed);
    }
}
