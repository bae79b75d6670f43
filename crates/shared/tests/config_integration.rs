//! 配置加载集成测试
//!
//! 验证仓库自带的 config/default.toml 能被完整反序列化为 AppConfig。

use std::path::PathBuf;

use config::{Config, File};
use reward_shared::config::AppConfig;

fn default_toml() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../config/default.toml")
}

#[test]
fn test_shipped_default_config_deserializes() {
    let config: AppConfig = Config::builder()
        .add_source(File::from(default_toml()))
        .build()
        .unwrap()
        .try_deserialize()
        .unwrap();

    assert_eq!(config.service_name, "level-reward-service");
    assert!(config.database.url.starts_with("postgres://"));
    assert!(config.database.max_connections >= config.database.min_connections);
    assert_eq!(config.export.chunk_size, 2000);
    assert_eq!(config.export.locale, "en");
    assert!(config.export.include_bom);
}

#[test]
fn test_overrides_take_precedence_over_default_file() {
    let config: AppConfig = Config::builder()
        .add_source(File::from(default_toml()))
        .add_source(File::from_str(
            r#"
            [export]
            locale = "ru"

            [observability]
            log_format = "json"
            "#,
            config::FileFormat::Toml,
        ))
        .build()
        .unwrap()
        .try_deserialize()
        .unwrap();

    assert_eq!(config.export.locale, "ru");
    assert_eq!(config.export.chunk_size, 2000);
    assert!(config.observability.json_logs());
}
