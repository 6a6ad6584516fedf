// Unit tests for the config module
// Tests focus on defaults, partial files, key updates and credential lookup

use super::*;
use tempfile::TempDir;

#[test]
fn default_config_points_at_openai() {
    let config = AppConfig::default();

    assert_eq!(config.model, DEFAULT_MODEL);
    assert_eq!(config.system_prompt, DEFAULT_SYSTEM_PROMPT);
    assert_eq!(config.endpoint.host, "api.openai.com");
    assert_eq!(config.endpoint.port, 443);
    assert_eq!(config.endpoint.chat_path, "/v1/chat/completions");
    assert_eq!(config.endpoint.models_path, "/v1/models");
    assert_eq!(config.endpoint.api_key_env, "OPENAI_API_KEY");
    assert!(config.verbosity.is_none());
}

#[test]
fn default_budget_matches_compaction_policy() {
    let budget = BudgetConfig::default();

    assert_eq!(budget.threshold, 500);
    assert_eq!(budget.max_summary_tokens, 50);
}

#[test]
fn partial_toml_fills_in_defaults() {
    let config: AppConfig = toml::from_str(
        r#"
model = "gpt-4"

[endpoint]
host = "localhost"
port = 8080
scheme = "http"
"#,
    )
    .unwrap();

    assert_eq!(config.model, "gpt-4");
    assert_eq!(config.system_prompt, DEFAULT_SYSTEM_PROMPT);
    assert_eq!(config.endpoint.base_url(), "http://localhost:8080");
    assert_eq!(config.endpoint.chat_path, "/v1/chat/completions");
    assert_eq!(config.budget, BudgetConfig::default());
}

#[test]
fn invalid_toml_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    fs::write(&path, "model = [unterminated").unwrap();

    let result = AppConfig::load_from(&path);

    assert!(matches!(result, Err(ConfigError::InvalidToml(_))));
}

#[test]
fn load_from_missing_file_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("absent.toml");

    let result = AppConfig::load_from(&path);

    assert!(matches!(result, Err(ConfigError::NotFound { .. })));
}

#[test]
fn save_then_load_preserves_settings() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("config.toml");

    let mut config = AppConfig::default();
    config.update_setting("budget.threshold", "1200".to_string()).unwrap();
    config.update_setting("verbosity", "debug".to_string()).unwrap();
    config.save_to(&path).unwrap();

    let loaded = AppConfig::load_from(&path).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.budget.threshold, 1200);
}

#[test]
fn verbosity_falls_back_to_normal() {
    let mut config = AppConfig::default();
    assert_eq!(config.get_verbosity(), VerbosityLevel::Normal);

    config.verbosity = Some("verbose".to_string());
    assert_eq!(config.get_verbosity(), VerbosityLevel::Verbose);

    config.verbosity = Some("shouting".to_string());
    assert_eq!(config.get_verbosity(), VerbosityLevel::Normal);
}

#[test]
fn update_setting_rejects_unknown_key() {
    let mut config = AppConfig::default();

    let result = config.update_setting("endpoint.colour", "blue".to_string());

    assert!(matches!(
        result,
        Err(ConfigError::UnknownConfigKey { key }) if key == "endpoint.colour"
    ));
}

#[test]
fn update_setting_rejects_bad_numbers_and_schemes() {
    let mut config = AppConfig::default();

    assert!(matches!(
        config.update_setting("endpoint.port", "not-a-port".to_string()),
        Err(ConfigError::InvalidValue { .. })
    ));
    assert!(matches!(
        config.update_setting("endpoint.scheme", "ftp".to_string()),
        Err(ConfigError::InvalidValue { .. })
    ));
    assert!(matches!(
        config.update_setting("verbosity", "loud".to_string()),
        Err(ConfigError::InvalidValue { .. })
    ));
    assert_eq!(config.endpoint.port, 443);
}

#[test]
fn update_setting_applies_endpoint_values() {
    let mut config = AppConfig::default();

    config.update_setting("endpoint.host", "example.test".to_string()).unwrap();
    config.update_setting("endpoint.port", "8443".to_string()).unwrap();
    config
        .update_setting("endpoint.request_timeout_secs", "5".to_string())
        .unwrap();

    assert_eq!(config.endpoint.base_url(), "https://example.test:8443");
    assert_eq!(config.endpoint.request_timeout(), Duration::from_secs(5));
}

#[test]
fn credential_prefers_environment() {
    let mut config = AppConfig::default();
    config.endpoint.api_key = Some("from-file".to_string());

    let credential = config
        .resolve_credential_with(|name| {
            assert_eq!(name, "OPENAI_API_KEY");
            Some("from-env".to_string())
        })
        .unwrap();

    assert_eq!(credential.expose(), "from-env");
}

#[test]
fn credential_falls_back_to_config_file() {
    let mut config = AppConfig::default();
    config.endpoint.api_key = Some("from-file".to_string());

    let credential = config.resolve_credential_with(|_| None).unwrap();

    assert_eq!(credential.expose(), "from-file");
}

#[test]
fn missing_credential_fails_fast() {
    let config = AppConfig::default();

    let result = config.resolve_credential_with(|_| Some("   ".to_string()));

    match result {
        Err(ConfigError::MissingCredential { var }) => assert_eq!(var, "OPENAI_API_KEY"),
        other => panic!("expected MissingCredential, got {:?}", other.map(|_| ())),
    }
}
