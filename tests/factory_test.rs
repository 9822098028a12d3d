// ==========================================
// ImporterFactory 集成测试
// ==========================================
// 测试目标: 配置校验 + 预热结果
// ==========================================


use catalog_import::config::{ConfigError, ImportConfig};
use catalog_import::domain::{Product, ReferenceKind};
use catalog_import::importer::{ImportError, ImporterFactory};
use std::sync::Arc;
use test_helpers::{create_test_db, open_store};

#[test]
fn test_create_with_valid_attributes() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let store = open_store(&db_path);

    let importer = ImporterFactory::new(Arc::clone(&store))
        .create(ImportConfig::new().with_attributes(["name", "price", "special_price"]))
        .unwrap();

    assert_eq!(importer.buffered(), 0);
    assert_eq!(
        importer
            .resolver()
            .lookup(ReferenceKind::StoreView, "default")
            .unwrap(),
        1
    );
}

#[test]
fn test_unknown_attribute_returns_config_error() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let store = open_store(&db_path);

    let result = ImporterFactory::new(Arc::clone(&store))
        .create(ImportConfig::new().with_attributes(["name", "weight"]));

    match result {
        Err(ImportError::Config(ConfigError::UnknownAttribute(code))) => assert_eq!(code, "weight"),
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("expected config error"),
    }
}

#[test]
fn test_json_options() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let store = open_store(&db_path);

    let config = ImportConfig::from_json_options(
        r#"{"attributes": ["name"], "default_attribute_set": "Default"}"#,
    )
    .unwrap();
    let mut importer = ImporterFactory::new(Arc::clone(&store)).create(config).unwrap();

    importer.insert(Product::new("bb-json").with_name("Json Box").with_price("1.00"));
    let summary = importer.flush().unwrap();

    assert_eq!(summary.succeeded, 1);
    let stored = store.load_product("bb-json", "admin").unwrap().unwrap();
    assert_eq!(stored.attribute("name"), Some("Json Box"));
    assert_eq!(stored.attribute("price"), None);
}

#[test]
fn test_default_attribute_set_missing_fails_rows_not_factory() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let store = open_store(&db_path);

    let mut importer = ImporterFactory::new(Arc::clone(&store))
        .create(ImportConfig::new().with_default_attribute_set("Clothing"))
        .unwrap();

    importer.insert(Product::new("bb-no-set").with_name("Shirt"));
    let summary = importer.flush().unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(store.count_entities().unwrap(), 0);
}
