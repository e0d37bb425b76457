//! Configuration data structures for arbor.
//!
//! These types map directly to TOML (also JSON / YAML) configuration files. Every
//! section has defaults so a minimal config only names what it changes.
use serde::{Deserialize, Serialize};

pub use crate::core::openapi::ApiInfo as DocsConfig;

/// Where the route tree comes from and how handler names are derived.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RoutesConfig {
    /// XML structure document describing the route tree
    pub structure_path: String,
    /// Base namespace of handler type names
    pub namespace: String,
    /// Rebuild the router when the structure document changes
    pub watch: bool,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            structure_path: "config/structure.xml".to_string(),
            namespace: "Controllers".to_string(),
            watch: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `arbor=debug,tower_http=info`
    pub level: String,
    /// JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct HttpConfig {
    /// Largest accepted request body
    pub max_body_bytes: usize,
    /// Answer CORS preflight requests and add CORS headers
    pub cors: bool,
    /// Compress responses when the client accepts it
    pub compression: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 1024 * 1024,
            cors: true,
            compression: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default)]
    pub routes: RoutesConfig,
    #[serde(default)]
    pub docs: DocsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

impl ServerConfig {
    /// Create a new server configuration builder
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            routes: RoutesConfig::default(),
            docs: DocsConfig::default(),
            logging: LoggingConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

/// Builder for ServerConfig to allow for cleaner configuration creation
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    listen_addr: Option<String>,
    routes: RoutesConfig,
    docs: DocsConfig,
    logging: LoggingConfig,
    http: HttpConfig,
}

impl ServerConfigBuilder {
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.listen_addr = Some(addr.into());
        self
    }

    pub fn structure_path(mut self, path: impl Into<String>) -> Self {
        self.routes.structure_path = path.into();
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.routes.namespace = namespace.into();
        self
    }

    /// Rebuild the router when the structure document changes
    pub fn watch(mut self, watch: bool) -> Self {
        self.routes.watch = watch;
        self
    }

    pub fn docs(mut self, title: impl Into<String>, version: impl Into<String>) -> Self {
        self.docs = DocsConfig {
            title: title.into(),
            version: version.into(),
        };
        self
    }

    pub fn logging(mut self, config: LoggingConfig) -> Self {
        self.logging = config;
        self
    }

    pub fn http(mut self, config: HttpConfig) -> Self {
        self.http = config;
        self
    }

    /// Build the final ServerConfig
    pub fn build(self) -> Result<ServerConfig, String> {
        if self.routes.structure_path.trim().is_empty() {
            return Err("routes.structure_path must not be empty".to_string());
        }

        Ok(ServerConfig {
            listen_addr: self.listen_addr.unwrap_or_else(default_listen_addr),
            routes: self.routes,
            docs: self.docs,
            logging: self.logging,
            http: self.http,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.listen_addr, "127.0.0.1:8080");
        assert_eq!(config.routes.structure_path, "config/structure.xml");
        assert_eq!(config.routes.namespace, "Controllers");
        assert_eq!(config.docs.title, "API");
        assert_eq!(config.docs.version, "0.0.1");
        assert_eq!(config.http.max_body_bytes, 1024 * 1024);
    }

    #[test]
    fn test_builder() {
        let config = ServerConfig::builder()
            .listen_addr("0.0.0.0:3000")
            .namespace("App::Controllers")
            .docs("Houses", "2.0.0")
            .watch(true)
            .build()
            .unwrap();

        assert_eq!(config.listen_addr, "0.0.0.0:3000");
        assert_eq!(config.routes.namespace, "App::Controllers");
        assert!(config.routes.watch);
        assert_eq!(config.docs.title, "Houses");
    }

    #[test]
    fn test_builder_rejects_empty_structure_path() {
        assert!(ServerConfig::builder().structure_path(" ").build().is_err());
    }
}
