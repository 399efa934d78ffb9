#[cfg(test)]
mod tests {
    use serial_test::serial;

    use crate::config::{AppConfig, DEFAULT_DATABASE_URL};
    use crate::env::Profile;

    #[test]
    #[serial]
    fn test_defaults_when_unset() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", None::<&str>),
                ("DEFAULT_SPIRIT_TYPE", None),
                ("OTEL_EXPORTER_OTLP_ENDPOINT", None),
            ],
            || {
                let config = AppConfig::from_env();
                assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
                assert_eq!(config.default_spirit_type, "Bourbon");
                assert_eq!(config.otlp_endpoint, None);
            },
        );
    }

    #[test]
    #[serial]
    fn test_reads_overrides() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("sqlite::memory:")),
                ("DEFAULT_SPIRIT_TYPE", Some("Scotch")),
                ("OTEL_EXPORTER_OTLP_ENDPOINT", Some("http://localhost:4317")),
            ],
            || {
                let config = AppConfig::from_env();
                assert_eq!(config.database_url, "sqlite::memory:");
                assert_eq!(config.default_spirit_type, "Scotch");
                assert_eq!(
                    config.otlp_endpoint.as_deref(),
                    Some("http://localhost:4317")
                );
            },
        );
    }

    #[test]
    #[serial]
    fn test_blank_values_fall_back() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("  ")),
                ("DEFAULT_SPIRIT_TYPE", Some("")),
                ("OTEL_EXPORTER_OTLP_ENDPOINT", Some("")),
            ],
            || {
                assert_eq!(AppConfig::from_env(), AppConfig::default());
            },
        );
    }

    #[test]
    #[serial]
    fn test_profile_selects_env_files() {
        temp_env::with_var("ROCKET_PROFILE", Some("production"), || {
            let profile = Profile::current();
            assert_eq!(profile, Profile::Production);
            assert_eq!(
                profile.env_files(),
                ["config/common.env", "config/prod.env", ".secrets.env"]
            );
        });

        temp_env::with_var_unset("ROCKET_PROFILE", || {
            assert_eq!(Profile::current(), Profile::Development);
            assert_eq!(Profile::current().env_files()[1], "config/dev.env");
        });
    }

    #[tokio::test]
    async fn test_connect_migrates_in_memory_database() {
        let config = AppConfig {
            database_url: "sqlite::memory:".to_string(),
            ..AppConfig::default()
        };

        let pool = config.connect().await.expect("Failed to connect");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");
    }
}
