use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(name = "zin", about = "Feed and profile gateway for the ZIN front-end")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, env = "ZIN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Largest accepted post upload, in bytes
    #[arg(long, env = "ZIN_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: Option<usize>,

    /// Which backend to talk to
    #[arg(long, value_enum)]
    pub backend: Option<BackendKind>,

    /// Remote service endpoint, e.g. https://cloud.appwrite.io/v1
    #[arg(long, env = "ZIN_ENDPOINT")]
    pub endpoint: Option<String>,

    #[arg(long, env = "ZIN_PROJECT_ID")]
    pub project_id: Option<String>,

    #[arg(long, env = "ZIN_DATABASE_ID")]
    pub database_id: Option<String>,

    #[arg(long, env = "ZIN_BUCKET_ID")]
    pub bucket_id: Option<String>,

    #[arg(long, env = "ZIN_USERS_COLLECTION")]
    pub users_collection: Option<String>,

    #[arg(long, env = "ZIN_POSTS_COLLECTION")]
    pub posts_collection: Option<String>,

    #[arg(long, env = "ZIN_SAVES_COLLECTION")]
    pub saves_collection: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub collections: CollectionsConfig,
    pub feed: FeedConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Browser origins allowed to call the API
    pub allowed_origins: Vec<String>,
    /// Largest multipart body accepted by the post routes
    pub max_upload_bytes: usize,
}

#[derive(Deserialize, ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Appwrite,
    Memory,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub endpoint: String,
    pub project_id: String,
    pub database_id: String,
    pub bucket_id: String,
    pub timeout_secs: u64,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct CollectionsConfig {
    pub users: String,
    pub posts: String,
    pub saves: String,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct FeedConfig {
    /// Posts returned by the "recent" listing
    pub recent_limit: u32,
    /// Posts per page of the infinite feed
    pub page_size: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            allowed_origins: Vec::new(),
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Appwrite,
            endpoint: "https://cloud.appwrite.io/v1".to_string(),
            project_id: String::new(),
            database_id: String::new(),
            bucket_id: String::new(),
            timeout_secs: 30,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            recent_limit: 20,
            page_size: 10,
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let config_path = cli.config.clone().or_else(Self::default_path);

        let mut config = match config_path {
            Some(path) if path.exists() => {
                tracing::info!("Loading config from {}", path.display());
                let content = std::fs::read_to_string(&path)?;
                toml::from_str(&content)?
            }
            _ => Config::default(),
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(max) = cli.max_upload_bytes {
            config.server.max_upload_bytes = max;
        }
        if let Some(kind) = cli.backend {
            config.backend.kind = kind;
        }
        override_with(&mut config.backend.endpoint, &cli.endpoint);
        override_with(&mut config.backend.project_id, &cli.project_id);
        override_with(&mut config.backend.database_id, &cli.database_id);
        override_with(&mut config.backend.bucket_id, &cli.bucket_id);
        override_with(&mut config.collections.users, &cli.users_collection);
        override_with(&mut config.collections.posts, &cli.posts_collection);
        override_with(&mut config.collections.saves, &cli.saves_collection);

        if config.backend.kind == BackendKind::Memory {
            config.fill_memory_defaults();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("zin").join("config.toml"))
    }

    /// Every identifier the gateway needs must be set before start-up.
    pub fn validate(&self) -> anyhow::Result<()> {
        let required = [
            ("backend.endpoint", &self.backend.endpoint),
            ("backend.project_id", &self.backend.project_id),
            ("backend.database_id", &self.backend.database_id),
            ("backend.bucket_id", &self.backend.bucket_id),
            ("collections.users", &self.collections.users),
            ("collections.posts", &self.collections.posts),
            ("collections.saves", &self.collections.saves),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(key, _)| *key)
            .collect();

        if !missing.is_empty() {
            anyhow::bail!("Missing configuration values: {}", missing.join(", "));
        }
        if url::Url::parse(&self.backend.endpoint).is_err() {
            anyhow::bail!("backend.endpoint is not a valid URL: {}", self.backend.endpoint);
        }
        if self.server.max_upload_bytes == 0 {
            anyhow::bail!("server.max_upload_bytes must be positive");
        }
        if self.feed.page_size == 0 || self.feed.recent_limit == 0 {
            anyhow::bail!("feed.page_size and feed.recent_limit must be positive");
        }
        Ok(())
    }

    /// The in-memory backend needs no remote ids; give it stable names.
    fn fill_memory_defaults(&mut self) {
        let defaults = [
            (&mut self.backend.project_id, "local"),
            (&mut self.backend.database_id, "local"),
            (&mut self.backend.bucket_id, "local"),
            (&mut self.collections.users, "users"),
            (&mut self.collections.posts, "posts"),
            (&mut self.collections.saves, "saves"),
        ];
        for (value, default) in defaults {
            if value.is_empty() {
                *value = default.to_string();
            }
        }
    }
}

fn override_with(target: &mut String, value: &Option<String>) {
    if let Some(v) = value {
        *target = v.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_toml() -> &'static str {
        r#"
[server]
host = "0.0.0.0"
port = 9000
allowed_origins = ["http://localhost:5173"]
max_upload_bytes = 1048576

[backend]
endpoint = "https://api.example.io/v1"
project_id = "proj"
database_id = "db"
bucket_id = "media"

[collections]
users = "users-col"
posts = "posts-col"
saves = "saves-col"

[feed]
page_size = 5
"#
    }

    fn cli_with_file(path: PathBuf) -> Cli {
        Cli {
            config: Some(path),
            ..Cli::default()
        }
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.max_upload_bytes, 25 * 1024 * 1024);
        assert_eq!(config.backend.kind, BackendKind::Appwrite);
        assert_eq!(config.feed.recent_limit, 20);
        assert_eq!(config.feed.page_size, 10);
        assert!(config.collections.posts.is_empty());
    }

    #[test]
    fn load_reads_toml_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, complete_toml()).unwrap();

        let config = Config::load(&cli_with_file(path)).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.allowed_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.server.max_upload_bytes, 1024 * 1024);
        assert_eq!(config.backend.project_id, "proj");
        assert_eq!(config.collections.saves, "saves-col");
        assert_eq!(config.feed.page_size, 5);
        assert_eq!(config.feed.recent_limit, 20);
    }

    #[test]
    fn cli_overrides_beat_toml_values() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, complete_toml()).unwrap();

        let cli = Cli {
            config: Some(path),
            host: Some("10.0.0.1".to_string()),
            port: Some(4000),
            posts_collection: Some("other-posts".to_string()),
            ..Cli::default()
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "10.0.0.1");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.collections.posts, "other-posts");
    }

    #[test]
    fn missing_ids_are_a_startup_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[backend]
project_id = "proj"
"#,
        )
        .unwrap();

        let err = Config::load(&cli_with_file(path)).unwrap_err().to_string();
        assert!(err.contains("backend.database_id"));
        assert!(err.contains("collections.users"));
        assert!(!err.contains("backend.project_id"));
    }

    #[test]
    fn memory_backend_needs_no_ids() {
        let tmp = tempfile::tempdir().unwrap();
        let cli = Cli {
            config: Some(tmp.path().join("absent.toml")),
            backend: Some(BackendKind::Memory),
            ..Cli::default()
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.backend.kind, BackendKind::Memory);
        assert_eq!(config.collections.users, "users");
        assert_eq!(config.backend.bucket_id, "local");
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let mut config = Config::default();
        config.fill_memory_defaults();
        assert!(config.validate().is_ok());
        config.feed.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_upload_limit_is_rejected() {
        let mut config = Config::default();
        config.fill_memory_defaults();
        config.server.max_upload_bytes = 0;
        assert!(config.validate().is_err());
    }
}
