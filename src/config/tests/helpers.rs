//! Shared fixtures and helper functions for config tests.

use std::sync::Arc;

use mockable::MockEnv;
use ortho_config::MergeComposer;
use ortho_config::serde_json::json;
use rstest::fixture;

use crate::config::{AppConfig, DEFAULT_TIMEOUT_SECS, LogFormat};

/// Fixture providing an `AppConfig` parsed from a full TOML example.
#[fixture]
pub fn app_config_from_full_toml() -> AppConfig {
    let toml = r#"
        image = "registry.example.com:5000/k2:2.1"
        output_dir = "/srv/kraken"
        cluster_config = "/srv/kraken/prod.yaml"

        [run]
        timeout_secs = 60
        keep_alive = true
        log_path = "/var/log/k2.log"
        log_success = true
        verbose = true

        [docker]
        host = "tcp://10.0.0.5:2376"
        api_version = "1.41"
        tls_verify = true
        tls_ca_cert = "/certs/ca.pem"

        [registry]
        username = "robot"
        password = "hunter2"

        [logging]
        level = "debug"
        format = "json"
    "#;

    toml::from_str(toml).expect("TOML parsing should succeed")
}

/// Fixture providing an environment with only `HOME` set.
#[fixture]
pub fn home_env() -> MockEnv {
    let mut env = MockEnv::new();
    env.expect_string()
        .returning(|key| (key == "HOME").then(|| String::from("/home/k2")));
    env
}

/// Helper: Creates a `MergeComposer` with defaults layer already pushed.
pub fn create_composer_with_defaults() -> Result<MergeComposer, serde_json::Error> {
    let mut composer = MergeComposer::new();
    let defaults = ortho_config::serde_json::to_value(AppConfig::default())?;
    composer.push_defaults(defaults);
    Ok(composer)
}

/// Helper: Creates a composer with defaults, a file layer and an environment
/// layer that disagree on `image` and `run.timeout_secs`.
pub fn create_composer_with_file_and_env() -> Result<MergeComposer, serde_json::Error> {
    let mut composer = create_composer_with_defaults()?;
    composer.push_file(
        json!({
            "image": "file-image:latest",
            "run": { "timeout_secs": 300, "keep_alive": true }
        }),
        None,
    );
    composer.push_environment(json!({
        "run": { "timeout_secs": 600 }
    }));
    Ok(composer)
}

/// Helper: Merges layers from a composer into `AppConfig`.
pub fn merge_config(composer: MergeComposer) -> Result<AppConfig, Arc<ortho_config::OrthoError>> {
    AppConfig::merge_from_layers(composer.layers())
}

/// Helper: Asserts that a config carries the application defaults.
pub fn assert_config_has_defaults(config: &AppConfig) {
    assert!(config.image.is_none(), "image should be unset");
    assert!(config.output_dir.is_none(), "output_dir should be unset");
    assert_eq!(config.run.timeout_secs, DEFAULT_TIMEOUT_SECS);
    assert!(!config.run.keep_alive, "keep_alive should default to false");
    assert!(config.docker.host.is_none(), "docker.host should be unset");
    assert!(
        config.registry.credentials().is_none(),
        "registry credentials should be unset"
    );
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.format, LogFormat::Text);
}
