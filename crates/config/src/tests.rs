use figment::{
    Figment,
    providers::{Format, Toml},
};
use secrecy::ExposeSecret;

use super::AppConfig;

const SAMPLE: &str = r#"
app_name = "iam-approval"
app_env = "development"

[database]
url = "postgres://localhost/marlin"

[server]
host = "0.0.0.0"
port = 50051

[telemetry]
log_level = "debug"
"#;

#[test]
fn test_load_from_toml() {
    figment::Jail::expect_with(|jail| {
        jail.create_file("default.toml", SAMPLE)?;

        let config: AppConfig = Figment::new()
            .merge(Toml::file("default.toml"))
            .extract()
            .expect("config should parse");

        assert_eq!(config.app_name, "iam-approval");
        assert_eq!(config.server.port, 50051);
        assert_eq!(config.telemetry.log_level, "debug");
        assert_eq!(
            config.database.url.expose_secret(),
            "postgres://localhost/marlin"
        );
        // 未显式配置时取环境相关默认值
        assert_eq!(config.database.max_connections, 10);
        assert!(!config.is_production());
        Ok(())
    });
}
