//! Layer precedence tests for `MergeComposer` config composition.

use crate::config::AppConfig;
use crate::config::tests::helpers::{
    assert_config_has_defaults, create_composer_with_defaults, create_composer_with_file_and_env,
    merge_config,
};
use ortho_config::serde_json::json;
use rstest::rstest;

/// Serialised `AppConfig::default()` survives the defaults layer unchanged,
/// which is what `load_config` relies on.
#[rstest]
fn layer_precedence_serialised_defaults_round_trip() {
    let composer = create_composer_with_defaults().expect("composer creation should succeed");
    let config = merge_config(composer).expect("merge should succeed");
    let expected = AppConfig::default();

    assert_eq!(config.run, expected.run);
    assert_eq!(config.docker, expected.docker);
    assert_eq!(config.registry, expected.registry);
    assert_eq!(config.logging, expected.logging);
}

#[rstest]
fn layer_precedence_defaults_provide_baseline() {
    let composer = create_composer_with_defaults().expect("composer creation should succeed");
    let config = merge_config(composer).expect("merge should succeed");

    assert_config_has_defaults(&config);
}

#[rstest]
fn layer_precedence_env_overrides_file() {
    let composer = create_composer_with_file_and_env().expect("composer creation should succeed");
    let config = merge_config(composer).expect("merge should succeed");

    assert_eq!(config.run.timeout_secs, 600);
    // Values absent from the environment layer keep the file value.
    assert!(config.run.keep_alive);
    assert_eq!(config.image.as_deref(), Some("file-image:latest"));
}

#[rstest]
fn layer_precedence_cli_overrides_everything() {
    let mut composer =
        create_composer_with_file_and_env().expect("composer creation should succeed");
    composer.push_cli(json!({
        "image": "cli-image:dev",
        "run": { "timeout_secs": 5 }
    }));

    let config = merge_config(composer).expect("merge should succeed");

    assert_eq!(config.image.as_deref(), Some("cli-image:dev"));
    assert_eq!(config.run.timeout_secs, 5);
    assert!(config.run.keep_alive);
}

#[rstest]
fn layer_precedence_nested_sections_merge_field_by_field() {
    let mut composer = create_composer_with_defaults().expect("composer creation should succeed");
    composer.push_file(
        json!({ "docker": { "host": "tcp://10.0.0.5:2376", "tls_verify": true } }),
        None,
    );
    composer.push_cli(json!({ "docker": { "tls_verify": false } }));

    let config = merge_config(composer).expect("merge should succeed");

    assert_eq!(config.docker.host.as_deref(), Some("tcp://10.0.0.5:2376"));
    assert_eq!(config.docker.tls_verify, Some(false));
}

#[rstest]
fn post_merge_treats_blank_strings_as_unset() {
    let mut composer = create_composer_with_defaults().expect("composer creation should succeed");
    composer.push_environment(json!({
        "image": "  ",
        "registry": { "username": "", "password": "secret" }
    }));

    let config = merge_config(composer).expect("merge should succeed");

    assert!(config.image.is_none());
    assert!(config.registry.username.is_none());
    assert_eq!(config.registry.password.as_deref(), Some("secret"));
}
