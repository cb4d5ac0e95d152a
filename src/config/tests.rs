use super::*;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |name: &str| map.get(name).cloned()
}

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.ollama.host, "localhost");
    assert_eq!(config.ollama.port, 11434);
    assert_eq!(config.ollama.model, "nomic-embed-text:latest");
    assert_eq!(config.server.port, DEFAULT_PORT);
    assert_eq!(config.search.default_top_k, 10);
    assert_eq!(config.embedding.provider, EmbeddingProviderKind::Ollama);
    assert!(config.validate().is_ok());
}

#[test]
fn config_validation() {
    let config = Config::default();

    let mut invalid = config.clone();
    invalid.ollama.port = 0;
    assert!(matches!(invalid.validate(), Err(ConfigError::InvalidPort(0))));

    let mut invalid = config.clone();
    invalid.ollama.model = "  ".to_string();
    assert!(matches!(
        invalid.validate(),
        Err(ConfigError::InvalidModel(_))
    ));

    let mut invalid = config.clone();
    invalid.search.default_top_k = 0;
    assert!(matches!(
        invalid.validate(),
        Err(ConfigError::InvalidTopK { .. })
    ));

    let mut invalid = config.clone();
    invalid.search.default_top_k = 100;
    invalid.search.max_top_k = 20;
    assert!(matches!(
        invalid.validate(),
        Err(ConfigError::InvalidTopK { .. })
    ));

    let mut invalid = config.clone();
    invalid.search.ingest_concurrency = 0;
    assert!(matches!(
        invalid.validate(),
        Err(ConfigError::InvalidConcurrency(0))
    ));

    let mut invalid = config.clone();
    invalid.search.query_timeout_ms = 0;
    assert!(matches!(
        invalid.validate(),
        Err(ConfigError::InvalidTimeout {
            name: "query_timeout_ms"
        })
    ));

    let mut invalid = config;
    invalid.embedding.dimensions = 2;
    assert!(matches!(
        invalid.validate(),
        Err(ConfigError::InvalidDimensions(2))
    ));
}

#[test]
fn partial_config_uses_defaults() {
    let partial_toml = r#"
        [embedding]
        provider = "hashing"

        [server]
        port = 8080
    "#;

    let config: Config = toml::from_str(partial_toml).expect("partial config should parse");
    assert_eq!(config.embedding.provider, EmbeddingProviderKind::Hashing);
    assert_eq!(config.embedding.dimensions, 384);
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.ollama, OllamaConfig::default());
}

#[test]
fn invalid_toml_handling() {
    let invalid_toml = r#"
        [server
        port = "invalid_port"
    "#;

    let result: Result<Config, toml::de::Error> = toml::from_str(invalid_toml);
    assert!(result.is_err());
}

#[test]
fn unknown_provider_is_rejected() {
    let result: Result<Config, toml::de::Error> = toml::from_str(
        r#"
        [embedding]
        provider = "openai"
    "#,
    );
    assert!(result.is_err());
}

#[test]
fn load_from_missing_file_returns_defaults() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let config = Config::load_from(&temp_dir.path().join("missing.toml"))
        .expect("missing file should fall back to defaults");
    assert_eq!(config, Config::default());
}

#[test]
fn load_from_file_round_trip() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let config_path = temp_dir.path().join("config.toml");

    let mut original = Config::default();
    original.embedding.provider = EmbeddingProviderKind::Hashing;
    original.content.data_dir = Some(PathBuf::from("/srv/portfolio/data"));
    original.search.ingest_concurrency = 8;

    let content = toml::to_string_pretty(&original).expect("config should serialize");
    fs::write(&config_path, content).expect("should write config file");

    let loaded = Config::load_from(&config_path).expect("config should load");
    assert_eq!(loaded, original);
}

#[test]
fn load_from_rejects_invalid_values() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "[search]\ningest_concurrency = 0\n").expect("should write file");

    assert!(Config::load_from(&config_path).is_err());
}

#[test]
fn environment_overrides() {
    let mut config = Config::default();
    config
        .apply_overrides(lookup_from(&[
            ("PORT", "9001"),
            ("PORTFOLIO_DATA_DIR", "/tmp/content"),
        ]))
        .expect("overrides should apply");

    assert_eq!(config.server.port, 9001);
    assert_eq!(config.data_dir(), PathBuf::from("/tmp/content"));
}

#[test]
fn invalid_port_override() {
    let mut config = Config::default();
    let result = config.apply_overrides(lookup_from(&[("PORT", "not-a-port")]));
    assert!(matches!(
        result,
        Err(ConfigError::InvalidOverride { name: "PORT", .. })
    ));
    assert_eq!(config.server.port, DEFAULT_PORT);
}

#[test]
fn no_overrides_leaves_config_untouched() {
    let mut config = Config::default();
    config
        .apply_overrides(lookup_from(&[]))
        .expect("empty overrides should apply");
    assert_eq!(config, Config::default());
    assert_eq!(config.data_dir(), PathBuf::from("data"));
}

#[test]
fn bind_addr_and_ollama_url() {
    let config = Config::default();
    let addr = config.bind_addr().expect("default bind address should parse");
    assert_eq!(addr.port(), DEFAULT_PORT);

    let url = config.ollama_url().expect("default ollama url should parse");
    assert_eq!(url.host_str(), Some("localhost"));
    assert_eq!(url.port(), Some(11434));
}

#[test]
fn timeouts_convert_to_durations() {
    let search = SearchConfig {
        query_timeout_ms: 250,
        record_timeout_ms: 1_500,
        ..SearchConfig::default()
    };
    assert_eq!(search.query_timeout().as_millis(), 250);
    assert_eq!(search.record_timeout().as_millis(), 1_500);
}
