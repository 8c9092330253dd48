use redirector_runtime::{RedirectTarget, RouteTable, Status};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const TOML_FILE: &str = "redirector.toml";
pub const JSON_FILE: &str = "redirector.json";

/// The spelling of the "back to referer" target in config files and on the command line.
pub const BACK: &str = ":back";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Duplicate redirect rule for path '{0}'")]
    DuplicatePath(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub routes: HashMap<String, String>,
    #[serde(default)]
    pub redirects: Vec<RedirectRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    /// Used when the request carries no `X-Forwarded-Proto`.
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// Used when the request carries no `Host`.
    #[serde(default = "default_host")]
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            addr: default_addr(),
            protocol: default_protocol(),
            host: default_host(),
        }
    }
}

fn default_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_protocol() -> String {
    "http".to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectRule {
    pub path: String,
    pub to: TargetConfig,
    #[serde(default)]
    pub status: Option<Status>,
    /// Message returned when `to = ":back"` and the request has no referer.
    #[serde(default)]
    pub back_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetConfig {
    Url(String),
    Route(BTreeMap<String, RouteValue>),
}

/// A scalar in a route table, so `id = 42` and `only_path = true` need no quotes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RouteValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl fmt::Display for RouteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteValue::Str(s) => write!(f, "{}", s),
            RouteValue::Int(n) => write!(f, "{}", n),
            RouteValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl TargetConfig {
    pub fn to_target(&self) -> RedirectTarget {
        match self {
            TargetConfig::Url(url) => parse_target(url),
            TargetConfig::Route(params) => RedirectTarget::Route(params.iter().collect()),
        }
    }
}

/// `:back` selects the referer; anything else is a URL or path.
pub fn parse_target(s: &str) -> RedirectTarget {
    if s.trim() == BACK {
        RedirectTarget::Back
    } else {
        RedirectTarget::from(s)
    }
}

impl Config {
    /// Reads `redirector.toml` from `dir`, falling back to `redirector.json`,
    /// then to defaults.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let config_path = dir.join(TOML_FILE);
        if config_path.exists() {
            let content = read(&config_path)?;
            let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Toml {
                path: config_path.clone(),
                source,
            })?;
            return config.validated();
        }

        let json_path = dir.join(JSON_FILE);
        if json_path.exists() {
            let content = read(&json_path)?;
            let config: Config =
                serde_json::from_str(&content).map_err(|source| ConfigError::Json {
                    path: json_path.clone(),
                    source,
                })?;
            return config.validated();
        }

        tracing::debug!("no config found in {}, using defaults", dir.display());
        Ok(Config::default())
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|source| ConfigError::Toml {
            path: PathBuf::from(TOML_FILE),
            source,
        })?;
        config.validated()
    }

    fn validated(self) -> Result<Self, ConfigError> {
        let mut seen = std::collections::HashSet::new();
        for rule in &self.redirects {
            if !seen.insert(rule.path.as_str()) {
                return Err(ConfigError::DuplicatePath(rule.path.clone()));
            }
        }
        Ok(self)
    }

    pub fn route_table(&self) -> RouteTable {
        let mut table = RouteTable::new();
        for (name, pattern) in &self.routes {
            table.add(name, pattern);
        }
        table
    }

    pub fn rule_for(&self, path: &str) -> Option<&RedirectRule> {
        self.redirects.iter().find(|rule| rule.path == path)
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use redirector_runtime::RouteParams;

    const SAMPLE: &str = r#"
[server]
addr = "0.0.0.0:9000"
protocol = "https"

[routes]
post = "/posts/:id"

[[redirects]]
path = "/old"
to = "/new"
status = "moved_permanently"

[[redirects]]
path = "/docs"
to = "https://docs.example.com/"
status = 307

[[redirects]]
path = "/return"
to = ":back"
back_message = "nothing to return to"

[[redirects]]
path = "/latest"
to = { route = "post", id = "42" }
"#;

    #[test]
    fn test_parse_toml() {
        let config = Config::from_toml(SAMPLE).unwrap();
        assert_eq!(config.server.addr, "0.0.0.0:9000");
        assert_eq!(config.server.protocol, "https");
        assert_eq!(config.server.host, "localhost");
        assert_eq!(config.routes.get("post").unwrap(), "/posts/:id");
        assert_eq!(config.redirects.len(), 4);
        assert_eq!(config.route_table().len(), 1);
    }

    #[test]
    fn test_rule_targets() {
        let config = Config::from_toml(SAMPLE).unwrap();

        let old = config.rule_for("/old").unwrap();
        assert_eq!(old.to.to_target(), RedirectTarget::Path("/new".to_string()));
        assert_eq!(old.status, Some(Status::Symbol("moved_permanently".to_string())));

        let docs = config.rule_for("/docs").unwrap();
        assert_eq!(
            docs.to.to_target(),
            RedirectTarget::Absolute("https://docs.example.com/".to_string())
        );
        assert_eq!(docs.status, Some(Status::Code(307)));

        let back = config.rule_for("/return").unwrap();
        assert_eq!(back.to.to_target(), RedirectTarget::Back);
        assert_eq!(back.back_message.as_deref(), Some("nothing to return to"));

        let latest = config.rule_for("/latest").unwrap();
        assert_eq!(
            latest.to.to_target(),
            RedirectTarget::Route(RouteParams::named("post").with("id", 42))
        );

        assert!(config.rule_for("/missing").is_none());
    }

    #[test]
    fn test_route_table_scalar_values() {
        let content = r#"
[[redirects]]
path = "/a"
to = { route = "post", id = 42, status = 301, only_path = true }
"#;
        let config = Config::from_toml(content).unwrap();
        let rule = config.rule_for("/a").unwrap();
        assert_eq!(
            rule.to.to_target(),
            RedirectTarget::Route(
                RouteParams::named("post")
                    .with("id", 42)
                    .with("status", 301)
                    .with("only_path", true)
            )
        );

        let config: Config = serde_json::from_str(
            r#"{"redirects": [{"path": "/b", "to": {"route": "post", "id": 7}}]}"#,
        )
        .unwrap();
        assert_eq!(
            config.rule_for("/b").unwrap().to.to_target(),
            RedirectTarget::Route(RouteParams::named("post").with("id", 7))
        );
    }

    #[test]
    fn test_duplicate_paths_rejected() {
        let content = r#"
[[redirects]]
path = "/a"
to = "/b"

[[redirects]]
path = "/a"
to = "/c"
"#;
        let err = Config::from_toml(content).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicatePath(p) if p == "/a"));
    }

    #[test]
    fn test_load_defaults_when_missing() {
        let dir = std::env::temp_dir().join("redirector-config-missing");
        let config = Config::load(&dir).unwrap();
        assert_eq!(config.server.addr, "127.0.0.1:8080");
        assert!(config.redirects.is_empty());
    }

    #[test]
    fn test_load_json() {
        let dir = std::env::temp_dir().join(format!("redirector-config-json-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(JSON_FILE),
            r#"{"redirects": [{"path": "/x", "to": "/y", "status": "see_other"}]}"#,
        )
        .unwrap();

        let config = Config::load(&dir).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        let rule = config.rule_for("/x").unwrap();
        assert_eq!(rule.status, Some(Status::Symbol("see_other".to_string())));
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target(":back"), RedirectTarget::Back);
        assert_eq!(
            parse_target("http://example.com"),
            RedirectTarget::Absolute("http://example.com".to_string())
        );
        assert_eq!(parse_target("back"), RedirectTarget::Path("back".to_string()));
    }
}
