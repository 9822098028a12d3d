// ==========================================
// 商品批量导入引擎 - 记录校验器
// ==========================================
// 职责: sku 必填校验 + 按属性存储类型校验/标准化属性值
// 输出: 行级错误消息（英文，写入 Product.errors）
// ==========================================

use crate::domain::{AttributeValue, BackendType, CatalogMetadata};
use chrono::{NaiveDate, NaiveDateTime};

/// datetime 属性的存储格式
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 允许的日期输入格式（仅日期时补 00:00:00）
const DATE_FORMAT: &str = "%Y-%m-%d";

pub const MISSING_SKU: &str = "missing sku";

pub struct RecordValidator<'a> {
    metadata: &'a CatalogMetadata,
}

impl<'a> RecordValidator<'a> {
    pub fn new(metadata: &'a CatalogMetadata) -> Self {
        Self { metadata }
    }

    /// 校验 sku（去除首尾空白后非空）
    ///
    /// # 返回
    /// - Ok(trimmed sku)
    /// - Err("missing sku")
    pub fn validate_sku(&self, sku: &str) -> Result<String, String> {
        let trimmed = sku.trim();
        if trimmed.is_empty() {
            Err(MISSING_SKU.to_string())
        } else {
            Ok(trimmed.to_string())
        }
    }

    /// 校验并标准化单个属性值
    ///
    /// # 返回
    /// - Ok(Some(v)): 待写入的存储值
    /// - Ok(None): 显式清空（Null 或空字符串）
    /// - Err(message): 行级错误
    pub fn normalize(&self, code: &str, value: &AttributeValue) -> Result<Option<String>, String> {
        let meta = self
            .metadata
            .attribute(code)
            .ok_or_else(|| format!("unknown attribute: {}", code))?;

        match value {
            AttributeValue::Null => Ok(None),
            AttributeValue::Text(text) if text.trim().is_empty() => Ok(None),
            _ => normalize_typed(code, meta.backend_type, value).map(Some),
        }
    }
}

fn normalize_typed(code: &str, backend_type: BackendType, value: &AttributeValue) -> Result<String, String> {
    match backend_type {
        BackendType::Varchar | BackendType::Text => Ok(display_value(value)),
        BackendType::Int => normalize_int(code, value),
        BackendType::Decimal => normalize_decimal(code, value),
        BackendType::Datetime => normalize_datetime(code, value),
    }
}

fn display_value(value: &AttributeValue) -> String {
    match value {
        AttributeValue::Null => String::new(),
        AttributeValue::Int(v) => v.to_string(),
        AttributeValue::Number(v) => v.to_string(),
        AttributeValue::Text(v) => v.clone(),
    }
}

fn normalize_int(code: &str, value: &AttributeValue) -> Result<String, String> {
    let error = || format!("{} is not an integer: '{}'", code, display_value(value));
    match value {
        AttributeValue::Int(v) => Ok(v.to_string()),
        // 超出 i64 范围的浮点数不截断
        AttributeValue::Number(v)
            if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v < i64::MAX as f64 =>
        {
            Ok((*v as i64).to_string())
        }
        AttributeValue::Text(v) => v
            .trim()
            .parse::<i64>()
            .map(|n| n.to_string())
            .map_err(|_| error()),
        _ => Err(error()),
    }
}

fn normalize_decimal(code: &str, value: &AttributeValue) -> Result<String, String> {
    let error = || format!("{} is not a decimal number: '{}'", code, display_value(value));
    match value {
        AttributeValue::Int(v) => Ok(v.to_string()),
        AttributeValue::Number(v) if v.is_finite() => Ok(v.to_string()),
        AttributeValue::Text(v) => {
            let trimmed = v.trim();
            match trimmed.parse::<f64>() {
                // 保留调用方的书写形式（如 "4.00"）
                Ok(n) if n.is_finite() => Ok(trimmed.to_string()),
                _ => Err(error()),
            }
        }
        _ => Err(error()),
    }
}

fn normalize_datetime(code: &str, value: &AttributeValue) -> Result<String, String> {
    let error = || {
        format!(
            "{} is not a valid datetime (expected YYYY-MM-DD HH:MM:SS): '{}'",
            code,
            display_value(value)
        )
    };
    let AttributeValue::Text(raw) = value else {
        return Err(error());
    };
    let raw = raw.trim();

    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT) {
        return Ok(dt.format(DATETIME_FORMAT).to_string());
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.format(DATETIME_FORMAT).to_string())
        .ok_or_else(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AttributeMeta;

    fn metadata() -> CatalogMetadata {
        let mut metadata = CatalogMetadata::default();
        for (code, backend_type) in [
            ("name", BackendType::Varchar),
            ("price", BackendType::Decimal),
            ("status", BackendType::Int),
            ("special_from_date", BackendType::Datetime),
        ] {
            metadata.attributes.insert(
                code.to_string(),
                AttributeMeta {
                    attribute_code: code.to_string(),
                    backend_type,
                },
            );
        }
        metadata
    }

    #[test]
    fn test_validate_sku() {
        let metadata = metadata();
        let validator = RecordValidator::new(&metadata);

        assert_eq!(validator.validate_sku("  bb-1 ").unwrap(), "bb-1");
        assert_eq!(validator.validate_sku("").unwrap_err(), "missing sku");
        assert_eq!(validator.validate_sku("   ").unwrap_err(), "missing sku");
    }

    #[test]
    fn test_null_and_blank_clear_value() {
        let metadata = metadata();
        let validator = RecordValidator::new(&metadata);

        assert_eq!(validator.normalize("price", &AttributeValue::Null).unwrap(), None);
        assert_eq!(validator.normalize("name", &AttributeValue::from("  ")).unwrap(), None);
    }

    #[test]
    fn test_decimal() {
        let metadata = metadata();
        let validator = RecordValidator::new(&metadata);

        assert_eq!(
            validator.normalize("price", &AttributeValue::from("4.00")).unwrap(),
            Some("4.00".to_string())
        );
        assert_eq!(
            validator.normalize("price", &AttributeValue::Int(7)).unwrap(),
            Some("7".to_string())
        );
        assert_eq!(
            validator.normalize("price", &AttributeValue::from("abc")).unwrap_err(),
            "price is not a decimal number: 'abc'"
        );
    }

    #[test]
    fn test_int() {
        let metadata = metadata();
        let validator = RecordValidator::new(&metadata);

        assert_eq!(
            validator.normalize("status", &AttributeValue::from(" 2 ")).unwrap(),
            Some("2".to_string())
        );
        assert_eq!(
            validator.normalize("status", &AttributeValue::Number(1.0)).unwrap(),
            Some("1".to_string())
        );
        assert!(validator.normalize("status", &AttributeValue::Number(1.5)).is_err());
        assert!(validator
            .normalize("status", &AttributeValue::Number(1e30))
            .unwrap_err()
            .starts_with("status is not an integer: "));
        assert!(validator.normalize("status", &AttributeValue::Number(-1e19)).is_err());
        assert!(validator.normalize("status", &AttributeValue::Number(f64::NAN)).is_err());
        assert!(validator.normalize("status", &AttributeValue::from("yes")).is_err());
    }

    #[test]
    fn test_datetime() {
        let metadata = metadata();
        let validator = RecordValidator::new(&metadata);

        assert_eq!(
            validator
                .normalize("special_from_date", &AttributeValue::from("2017-10-14 01:22:03"))
                .unwrap(),
            Some("2017-10-14 01:22:03".to_string())
        );
        assert_eq!(
            validator
                .normalize("special_from_date", &AttributeValue::from("2017-10-14"))
                .unwrap(),
            Some("2017-10-14 00:00:00".to_string())
        );
        assert!(validator
            .normalize("special_from_date", &AttributeValue::from("14/10/2017"))
            .is_err());
    }

    #[test]
    fn test_unknown_attribute() {
        let metadata = metadata();
        let validator = RecordValidator::new(&metadata);

        assert_eq!(
            validator.normalize("colour", &AttributeValue::from("red")).unwrap_err(),
            "unknown attribute: colour"
        );
    }
}
