// ==========================================
// 商品批量导入引擎 - 导入器工厂
// ==========================================
// 职责: 校验配置 + 预热元数据/店铺视图/属性集缓存，构建 Importer
// 红线: 要么返回可用 Importer，要么返回错误；存储往返次数为常数
// ==========================================

use crate::config::{ConfigError, ImportConfig};
use crate::domain::ReferenceKind;
use crate::importer::error::ImportResult;
use crate::importer::importer::Importer;
use crate::importer::resolver::ReferenceResolver;
use crate::repository::CatalogStore;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct ImporterFactory<S: CatalogStore> {
    store: Arc<S>,
}

impl<S: CatalogStore> ImporterFactory<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// 构建导入器
    ///
    /// # 参数
    /// - config: 导入配置（移交给 Importer，之后不可变）
    ///
    /// # 返回
    /// - Ok(Importer)
    /// - Err(ImportError::Config): 属性代码为空或不存在
    /// - Err(ImportError::Store): 预热查询失败
    #[instrument(skip_all)]
    pub fn create(&self, config: ImportConfig) -> ImportResult<Importer<S>> {
        let metadata = self.store.load_metadata()?;

        for code in &config.attributes {
            if code.trim().is_empty() {
                return Err(ConfigError::BlankAttribute.into());
            }
            if metadata.attribute(code).is_none() {
                return Err(ConfigError::UnknownAttribute(code.clone()).into());
            }
        }

        let mut resolver = ReferenceResolver::new();
        let store_views = resolver.prewarm(self.store.as_ref(), ReferenceKind::StoreView)?;
        let attribute_sets = resolver.prewarm(self.store.as_ref(), ReferenceKind::AttributeSet)?;

        let default_attribute_set_id = match config.default_attribute_set.trim() {
            "" => None,
            name => resolver.lookup(ReferenceKind::AttributeSet, name).ok(),
        };
        if default_attribute_set_id.is_none() {
            warn!(
                name = %config.default_attribute_set,
                "默认属性集不存在，未指定属性集的新商品将导入失败"
            );
        }

        info!(
            attributes = metadata.attributes.len(),
            store_views,
            attribute_sets,
            synced = config.attributes.len(),
            callbacks = config.callbacks.len(),
            "导入器构建完成"
        );

        Ok(Importer::new(
            Arc::clone(&self.store),
            config,
            metadata,
            resolver,
            default_attribute_set_id,
        ))
    }
}
