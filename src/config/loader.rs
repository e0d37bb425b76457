//! Configuration loading.
//!
//! Values come from the config file, then from `ARBOR_`-prefixed environment
//! variables: `ARBOR_LISTEN_ADDR`, `ARBOR_ROUTES__WATCH=true`, `ARBOR_HTTP__CORS=false`.
//! Anything left unset falls back to the serde defaults of [`ServerConfig`].
use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use eyre::{Context, Result, eyre};

use crate::config::models::ServerConfig;

pub const ENV_PREFIX: &str = "ARBOR";

/// File format implied by the extension; TOML when there is none.
pub fn config_format(path: &Path) -> FileFormat {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml" | "yml") => FileFormat::Yaml,
        Some("json") => FileFormat::Json,
        Some("ini") => FileFormat::Ini,
        _ => FileFormat::Toml,
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

pub async fn load_config(config_path: &str) -> Result<ServerConfig> {
    load_config_sync(config_path)
}

pub fn load_config_sync(config_path: &str) -> Result<ServerConfig> {
    load_with_environment(Path::new(config_path), environment())
}

fn load_with_environment(path: &Path, env: Environment) -> Result<ServerConfig> {
    let name = path
        .to_str()
        .ok_or_else(|| eyre!("Invalid UTF-8 path: {}", path.display()))?;

    let settings = Config::builder()
        .add_source(File::new(name, config_format(path)))
        .add_source(env)
        .build()
        .wrap_err_with(|| format!("Failed to read config from {}", path.display()))?;

    let server_config: ServerConfig = settings
        .try_deserialize()
        .wrap_err_with(|| format!("Invalid config in {}", path.display()))?;

    tracing::debug!(path = %path.display(), "Configuration loaded");
    Ok(server_config)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn write_config(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::with_suffix(suffix).unwrap();
        write!(file, "{content}").unwrap();
        file
    }

    /// Environment source fed from a fixed map instead of the process env.
    fn fake_env(vars: &[(&str, &str)]) -> Environment {
        let vars: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        environment().source(Some(vars))
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(config_format(Path::new("a.yml")), FileFormat::Yaml);
        assert_eq!(config_format(Path::new("a.json")), FileFormat::Json);
        assert_eq!(config_format(Path::new("arbor")), FileFormat::Toml);
    }

    #[tokio::test]
    async fn test_load_toml_config() {
        let file = write_config(
            ".toml",
            r#"
listen_addr = "127.0.0.1:3000"

[routes]
structure_path = "routes.xml"
namespace = "App"

[docs]
title = "Houses API"
"#,
        );

        let config = load_config(file.path().to_str().unwrap()).await.unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:3000");
        assert_eq!(config.routes.structure_path, "routes.xml");
        assert_eq!(config.routes.namespace, "App");
        assert!(!config.routes.watch);
        assert_eq!(config.docs.title, "Houses API");
        assert_eq!(config.docs.version, "0.0.1");
        assert!(config.logging.json);
    }

    #[test]
    fn test_load_json_config() {
        let file = write_config(
            ".json",
            r#"{
  "listen_addr": "0.0.0.0:8081",
  "logging": { "level": "debug", "json": false },
  "http": { "max_body_bytes": 4096 }
}"#,
        );

        let config = load_with_environment(file.path(), fake_env(&[])).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:8081");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.http.max_body_bytes, 4096);
        assert!(config.http.cors);
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = write_config(
            ".toml",
            "listen_addr = \"127.0.0.1:3000\"\n[routes]\nwatch = false\n",
        );
        let env = fake_env(&[
            ("ARBOR_LISTEN_ADDR", "0.0.0.0:9000"),
            ("ARBOR_ROUTES__WATCH", "true"),
        ]);

        let config = load_with_environment(file.path(), env).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:9000");
        assert!(config.routes.watch);
    }

    #[test]
    fn test_missing_file_fails() {
        assert!(load_config_sync("/definitely/not/here.toml").is_err());
    }
}
