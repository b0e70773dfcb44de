//! Configuration loading with layered precedence.
//!
//! Layers are composed manually with `MergeComposer` (lowest to highest):
//! application defaults, configuration file, environment variables,
//! command-line arguments. The `Cli` struct owns subcommand dispatch, so
//! `OrthoConfig::load()` cannot parse the command line itself.
//!
//! # Environment Variable Handling
//!
//! Environment variables with unparseable values (e.g.,
//! `K2CLI_RUN_KEEP_ALIVE=maybe` instead of `true`/`false`) return an error
//! immediately rather than falling back to defaults.
//!
//! String fields (e.g., `K2CLI_IMAGE`) are always accepted. Typed fields like
//! booleans (`K2CLI_DOCKER_TLS`) or integers (`K2CLI_RUN_TIMEOUT_SECS`) must
//! have valid values or loading fails with a clear error.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use mockable::DefaultEnv;
use ortho_config::discovery::ConfigDiscovery;
use ortho_config::serde_json::{self, Map, Value};
use ortho_config::{MergeComposer, toml};
use tracing::debug;

use crate::cluster::expand;
use crate::config::{AppConfig, Cli};
use crate::error::{ConfigError, Result};

/// The type of value expected from an environment variable.
#[derive(Clone, Copy)]
enum EnvVarType {
    /// String value (always accepted).
    String,
    /// Boolean value (`true`/`false`). Invalid values return an error.
    Bool,
    /// Unsigned 64-bit integer. Invalid values return an error.
    U64,
}

/// Specification for a single environment variable mapping.
struct EnvVarSpec {
    /// The environment variable name (e.g., `K2CLI_IMAGE`).
    env_var: &'static str,
    /// The JSON path segments (e.g., `["run", "keep_alive"]`).
    path: &'static [&'static str],
    /// The expected value type.
    var_type: EnvVarType,
}

const fn spec(
    env_var: &'static str,
    path: &'static [&'static str],
    var_type: EnvVarType,
) -> EnvVarSpec {
    EnvVarSpec {
        env_var,
        path,
        var_type,
    }
}

/// Table of all environment variables and their JSON paths.
const ENV_VAR_SPECS: &[EnvVarSpec] = &[
    spec("K2CLI_IMAGE", &["image"], EnvVarType::String),
    spec("K2CLI_OUTPUT_DIR", &["output_dir"], EnvVarType::String),
    spec("K2CLI_CLUSTER_CONFIG", &["cluster_config"], EnvVarType::String),
    spec("K2CLI_RUN_TIMEOUT_SECS", &["run", "timeout_secs"], EnvVarType::U64),
    spec("K2CLI_RUN_KEEP_ALIVE", &["run", "keep_alive"], EnvVarType::Bool),
    spec("K2CLI_RUN_LOG_PATH", &["run", "log_path"], EnvVarType::String),
    spec("K2CLI_RUN_LOG_SUCCESS", &["run", "log_success"], EnvVarType::Bool),
    spec("K2CLI_RUN_VERBOSE", &["run", "verbose"], EnvVarType::Bool),
    spec("K2CLI_DOCKER_HOST", &["docker", "host"], EnvVarType::String),
    spec("K2CLI_DOCKER_API_VERSION", &["docker", "api_version"], EnvVarType::String),
    spec("K2CLI_DOCKER_TLS", &["docker", "tls"], EnvVarType::Bool),
    spec("K2CLI_DOCKER_TLS_VERIFY", &["docker", "tls_verify"], EnvVarType::Bool),
    spec("K2CLI_DOCKER_TLS_CA_CERT", &["docker", "tls_ca_cert"], EnvVarType::String),
    spec("K2CLI_DOCKER_TLS_CERT", &["docker", "tls_cert"], EnvVarType::String),
    spec("K2CLI_DOCKER_TLS_KEY", &["docker", "tls_key"], EnvVarType::String),
    spec("K2CLI_REGISTRY_USERNAME", &["registry", "username"], EnvVarType::String),
    spec("K2CLI_REGISTRY_PASSWORD", &["registry", "password"], EnvVarType::String),
    spec("K2CLI_LOGGING_LEVEL", &["logging", "level"], EnvVarType::String),
    spec("K2CLI_LOGGING_FORMAT", &["logging", "format"], EnvVarType::String),
];

/// Returns the list of environment variable names recognised by the config loader.
///
/// Tests use this to clear every `K2CLI_*` variable without hard-coding the
/// list.
#[must_use]
pub fn env_var_names() -> Vec<&'static str> {
    ENV_VAR_SPECS.iter().map(|entry| entry.env_var).collect()
}

/// Load a configuration file and push it to the composer.
fn load_config_file(path: &Utf8Path, composer: &mut MergeComposer) -> Result<()> {
    let current_dir = Utf8PathBuf::from(".");
    let parent = path
        .parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or_else(|| current_dir.as_ref());
    let file_name = path.file_name().unwrap_or(path.as_str());

    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|e| {
        ConfigError::ParseError {
            message: format!("failed to open directory {parent}: {e}"),
        }
    })?;

    let content = dir
        .read_to_string(file_name)
        .map_err(|e| ConfigError::ParseError {
            message: format!("failed to read {path}: {e}"),
        })?;

    let value =
        toml::from_str::<serde_json::Value>(&content).map_err(|e| ConfigError::ParseError {
            message: format!("failed to parse {path}: {e}"),
        })?;

    debug!(path = %path, "loaded k2cli settings file");
    composer.push_file(value, Some(path.to_path_buf()));
    Ok(())
}

/// Load configuration with full layer precedence from the process
/// environment.
///
/// # Errors
///
/// See [`load_config_with_env`].
pub fn load_config(cli: &Cli) -> Result<AppConfig> {
    load_config_with_env(cli, &DefaultEnv::new())
}

/// Load configuration with full layer precedence.
///
/// This function loads configuration from all available sources:
/// 1. Application defaults defined in the struct
/// 2. Settings file (`--k2config`, `K2CLI_CONFIG_PATH` or XDG discovery)
/// 3. Environment variables prefixed with `K2CLI_`, read from `env`
/// 4. Command-line arguments (from the provided `Cli`)
///
/// A positional cluster configuration argument is environment-expanded and
/// takes precedence over `--config`.
///
/// # Errors
///
/// Returns `ConfigError` if configuration loading fails due to:
/// - Malformed settings files
/// - Invalid typed environment variable values (e.g., non-boolean for
///   `K2CLI_RUN_KEEP_ALIVE`)
/// - A zero timeout after merge
pub fn load_config_with_env<E: mockable::Env>(cli: &Cli, env: &E) -> Result<AppConfig> {
    let mut composer = MergeComposer::new();

    let defaults =
        serde_json::to_value(AppConfig::default()).map_err(|e| ConfigError::ParseError {
            message: format!("failed to serialise defaults: {e}"),
        })?;
    composer.push_defaults(defaults);

    let config_path: Option<Utf8PathBuf> =
        cli.k2config.clone().filter(|p| p.exists()).or_else(|| {
            let discovery = ConfigDiscovery::builder("k2cli")
                .env_var("K2CLI_CONFIG_PATH")
                .config_file_name("config.toml")
                .dotfile_name(".k2cli.toml")
                .build();
            discovery
                .candidates()
                .into_iter()
                .filter(|p| p.exists())
                .find_map(|p| Utf8PathBuf::try_from(p).ok())
        });

    if let Some(ref path) = config_path {
        load_config_file(path, &mut composer)?;
    }

    let env_values = collect_env_vars(env)?;
    if !env_values.is_null() {
        composer.push_environment(env_values);
    }

    let cli_overrides = build_cli_overrides(cli, env);
    if !cli_overrides.is_null() {
        composer.push_cli(cli_overrides);
    }

    let config =
        AppConfig::merge_from_layers(composer.layers()).map_err(ConfigError::OrthoConfig)?;
    config.validate()?;

    Ok(config)
}

/// Collect environment variables with the `K2CLI_` prefix into a JSON value.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` if a typed environment variable (bool, u64)
/// has an unparseable value.
fn collect_env_vars<E: mockable::Env>(env: &E) -> Result<Value> {
    let mut root = Map::new();

    for entry in ENV_VAR_SPECS {
        let Some(raw_value) = env.string(entry.env_var) else {
            continue;
        };

        let json_value = match entry.var_type {
            EnvVarType::String => Value::String(raw_value),
            EnvVarType::Bool => match raw_value.parse::<bool>() {
                Ok(b) => Value::Bool(b),
                Err(_) => {
                    return Err(ConfigError::InvalidValue {
                        field: entry.env_var.to_owned(),
                        reason: format!("expected bool (true/false), got '{raw_value}'"),
                    }
                    .into());
                }
            },
            EnvVarType::U64 => match raw_value.parse::<u64>() {
                Ok(n) => Value::Number(n.into()),
                Err(_) => {
                    return Err(ConfigError::InvalidValue {
                        field: entry.env_var.to_owned(),
                        reason: format!("expected unsigned integer, got '{raw_value}'"),
                    }
                    .into());
                }
            },
        };

        insert_at_path(&mut root, entry.path, json_value);
    }

    if root.is_empty() {
        Ok(Value::Null)
    } else {
        Ok(Value::Object(root))
    }
}

/// Insert a value at a nested path in a JSON map, creating intermediate
/// objects as needed.
fn insert_at_path(root: &mut Map<String, Value>, path: &[&str], value: Value) {
    let Some((&field, parents)) = path.split_last() else {
        return;
    };

    let mut current = root;
    for &segment in parents {
        let entry = current
            .entry(segment.to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
        let Some(obj) = entry.as_object_mut() else {
            return;
        };
        current = obj;
    }

    current.insert(field.to_owned(), value);
}

fn string_value(value: impl Into<String>) -> Value {
    Value::String(value.into())
}

/// Build a JSON value containing CLI overrides.
///
/// Switch flags (`--keep-alive`, `--log-success`, `--verbose`) only override
/// lower layers when given.
fn build_cli_overrides<E: mockable::Env>(cli: &Cli, env: &E) -> Value {
    let mut root = Map::new();

    let cluster_config = cli
        .command
        .positional_config()
        .map(|raw| Utf8PathBuf::from(expand(raw, env)))
        .or_else(|| cli.config.clone());

    let paths: [(&[&str], Option<Value>); 16] = [
        (&["image"], cli.image.clone().map(string_value)),
        (&["output_dir"], cli.output.as_ref().map(|p| string_value(p.as_str()))),
        (
            &["cluster_config"],
            cluster_config.as_ref().map(|p| string_value(p.as_str())),
        ),
        (&["run", "timeout_secs"], cli.timeout.map(|t| Value::Number(t.into()))),
        (&["run", "keep_alive"], cli.keep_alive.then_some(Value::Bool(true))),
        (
            &["run", "log_path"],
            cli.log_path.as_ref().map(|p| string_value(p.as_str())),
        ),
        (&["run", "log_success"], cli.log_success.then_some(Value::Bool(true))),
        (&["run", "verbose"], cli.verbose.then_some(Value::Bool(true))),
        (&["docker", "host"], cli.docker_host.clone().map(string_value)),
        (&["docker", "tls"], cli.tls.map(Value::Bool)),
        (&["docker", "tls_verify"], cli.tls_verify.map(Value::Bool)),
        (
            &["docker", "tls_ca_cert"],
            cli.tls_ca_cert.as_ref().map(|p| string_value(p.as_str())),
        ),
        (
            &["docker", "tls_cert"],
            cli.tls_cert.as_ref().map(|p| string_value(p.as_str())),
        ),
        (
            &["docker", "tls_key"],
            cli.tls_key.as_ref().map(|p| string_value(p.as_str())),
        ),
        (&["registry", "username"], cli.user.clone().map(string_value)),
        (&["registry", "password"], cli.password.clone().map(string_value)),
    ];

    for (path, value) in paths {
        if let Some(json_value) = value {
            insert_at_path(&mut root, path, json_value);
        }
    }

    if root.is_empty() {
        Value::Null
    } else {
        Value::Object(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClusterCommand, Commands, UpArgs};
    use rstest::rstest;

    fn up_cli(config: Option<&str>) -> Cli {
        Cli {
            command: Commands::Cluster(ClusterCommand::Up(UpArgs {
                config: config.map(String::from),
                stages: String::from("all"),
            })),
            k2config: None,
            config: Some(Utf8PathBuf::from("/flag/config.yaml")),
            image: None,
            output: None,
            docker_host: None,
            tls: None,
            tls_verify: Some(false),
            tls_ca_cert: None,
            tls_cert: None,
            tls_key: None,
            timeout: Some(30),
            keep_alive: true,
            log_path: None,
            log_success: false,
            verbose: false,
            user: None,
            password: None,
        }
    }

    fn env_from(vars: &'static [(&'static str, &'static str)]) -> mockable::MockEnv {
        let mut env = mockable::MockEnv::new();
        env.expect_string().returning(move |key| {
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| String::from(*value))
        });
        env
    }

    #[rstest]
    fn insert_at_path_creates_intermediate_objects() {
        let mut root = Map::new();
        insert_at_path(&mut root, &["run", "keep_alive"], Value::Bool(true));
        insert_at_path(&mut root, &["run", "verbose"], Value::Bool(false));

        assert_eq!(
            Value::Object(root),
            serde_json::json!({"run": {"keep_alive": true, "verbose": false}})
        );
    }

    #[rstest]
    fn cli_overrides_include_only_given_flags() {
        let overrides = build_cli_overrides(&up_cli(None), &env_from(&[]));

        assert_eq!(
            overrides,
            serde_json::json!({
                "cluster_config": "/flag/config.yaml",
                "run": {"timeout_secs": 30, "keep_alive": true},
                "docker": {"tls_verify": false},
            })
        );
    }

    #[rstest]
    fn positional_config_is_expanded_and_wins_over_flag() {
        let overrides =
            build_cli_overrides(&up_cli(Some("$HOME/k2/config.yaml")), &env_from(&[("HOME", "/home/u")]));

        assert_eq!(
            overrides.get("cluster_config"),
            Some(&Value::String(String::from("/home/u/k2/config.yaml")))
        );
    }

    #[rstest]
    fn typed_environment_values_are_parsed() {
        let values = collect_env_vars(&env_from(&[
            ("K2CLI_RUN_TIMEOUT_SECS", "90"),
            ("K2CLI_DOCKER_TLS", "true"),
            ("K2CLI_IMAGE", "k2:dev"),
        ]))
        .expect("environment should parse");

        assert_eq!(
            values,
            serde_json::json!({
                "image": "k2:dev",
                "run": {"timeout_secs": 90},
                "docker": {"tls": true},
            })
        );
    }

    #[rstest]
    #[case("K2CLI_RUN_KEEP_ALIVE", "maybe")]
    #[case("K2CLI_RUN_TIMEOUT_SECS", "-5")]
    fn invalid_typed_environment_values_fail_fast(
        #[case] name: &'static str,
        #[case] value: &'static str,
    ) {
        let mut env = mockable::MockEnv::new();
        env.expect_string()
            .returning(move |key| (key == name).then(|| String::from(value)));

        let result = collect_env_vars(&env);

        assert!(
            matches!(
                result,
                Err(crate::error::K2Error::Config(ConfigError::InvalidValue { ref field, .. }))
                    if field == name
            ),
            "expected invalid value error, got {result:?}"
        );
    }

    #[rstest]
    fn env_var_names_cover_every_section() {
        let names = env_var_names();
        for prefix in [
            "K2CLI_RUN_",
            "K2CLI_DOCKER_",
            "K2CLI_REGISTRY_",
            "K2CLI_LOGGING_",
        ] {
            assert!(
                names.iter().any(|name| name.starts_with(prefix)),
                "no variable for {prefix}"
            );
        }
    }
}
