//! Configuration for drgcoder.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (DRGCODER_HOME, DRGCODER_API_URL)
//! 2. Config file (.drgcoder/config.yaml)
//! 3. Defaults (~/.drgcoder, mock backend)
//!
//! Config file discovery:
//! - Searches current directory and parents for .drgcoder/config.yaml
//! - `paths.home` in the config file is relative to the .drgcoder/ directory

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

const HOME_ENV: &str = "DRGCODER_HOME";
const API_URL_ENV: &str = "DRGCODER_API_URL";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub api: Option<ApiConfig>,
    #[serde(default)]
    pub search: Option<SearchConfig>,
    #[serde(default)]
    pub review: Option<ReviewConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to .drgcoder/)
    pub home: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub debounce_ms: Option<u64>,
    pub min_query_length: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewConfig {
    pub page_size: Option<u32>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to drgcoder home (preferences and local state)
    pub home: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub api: ApiSettings,
    pub search: SearchSettings,
    pub review: ReviewSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    /// Remote service root; `None` selects the local mock
    pub base_url: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_seconds: 30,
        }
    }
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSettings {
    pub debounce_ms: u64,
    pub min_query_length: usize,
    /// Maximum results shown
    pub limit: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            min_query_length: 2,
            limit: 10,
        }
    }
}

impl SearchSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewSettings {
    pub page_size: u32,
}

impl Default for ReviewSettings {
    fn default() -> Self {
        Self { page_size: 50 }
    }
}

impl ResolvedConfig {
    /// Configuration with defaults only, rooted at `home`
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            config_file: None,
            api: ApiSettings::default(),
            search: SearchSettings::default(),
            review: ReviewSettings::default(),
        }
    }

    /// Preference file ($DRGCODER_HOME/preferences.json)
    pub fn preferences_path(&self) -> PathBuf {
        self.home.join("preferences.json")
    }
}

/// Environment overrides, read once
#[derive(Debug, Clone, Default)]
struct EnvOverrides {
    home: Option<String>,
    api_url: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            home: std::env::var(HOME_ENV).ok().filter(|v| !v.is_empty()),
            api_url: std::env::var(API_URL_ENV).ok(),
        }
    }
}

/// Trim, drop trailing slashes; empty means unset
pub fn normalize_base_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".drgcoder").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Merge the three sources
fn resolve(
    default_home: PathBuf,
    env: EnvOverrides,
    file: Option<(PathBuf, ConfigFile)>,
) -> ResolvedConfig {
    let (config_file, config) = match file {
        Some((path, config)) => (Some(path), config),
        None => (None, ConfigFile::default()),
    };

    let home = if let Some(env_home) = env.home {
        PathBuf::from(env_home)
    } else if let (Some(path), Some(home_path)) = (&config_file, &config.paths.home) {
        let config_dir = path.parent().unwrap_or(Path::new("."));
        resolve_path(config_dir, home_path)
    } else {
        default_home
    };

    let api_defaults = ApiSettings::default();
    let base_url = match env.api_url {
        Some(raw) => normalize_base_url(&raw),
        None => config
            .api
            .as_ref()
            .and_then(|a| a.base_url.as_deref())
            .and_then(normalize_base_url),
    };
    let api = ApiSettings {
        base_url,
        timeout_seconds: config
            .api
            .as_ref()
            .and_then(|a| a.timeout_seconds)
            .unwrap_or(api_defaults.timeout_seconds),
    };

    let search_defaults = SearchSettings::default();
    let search = SearchSettings {
        debounce_ms: config
            .search
            .as_ref()
            .and_then(|s| s.debounce_ms)
            .unwrap_or(search_defaults.debounce_ms),
        min_query_length: config
            .search
            .as_ref()
            .and_then(|s| s.min_query_length)
            .unwrap_or(search_defaults.min_query_length),
        limit: config
            .search
            .as_ref()
            .and_then(|s| s.limit)
            .unwrap_or(search_defaults.limit),
    };

    let review = ReviewSettings {
        page_size: config
            .review
            .as_ref()
            .and_then(|r| r.page_size)
            .unwrap_or(ReviewSettings::default().page_size),
    };

    ResolvedConfig {
        home,
        config_file,
        api,
        search,
        review,
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".drgcoder");

    let file = match find_config_file() {
        Some(path) => {
            let config = load_config_file(&path)?;
            Some((path, config))
        }
        None => None,
    };

    Ok(resolve(default_home, EnvOverrides::from_env(), file))
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

/// Get the drgcoder home directory
pub fn drgcoder_home() -> Result<PathBuf> {
    Ok(config()?.home.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_file_or_env() {
        let config = resolve(PathBuf::from("/home/coder/.drgcoder"), EnvOverrides::default(), None);

        assert_eq!(config.home, PathBuf::from("/home/coder/.drgcoder"));
        assert!(config.config_file.is_none());
        assert!(config.api.base_url.is_none());
        assert_eq!(config.api.timeout_seconds, 30);
        assert_eq!(config.search, SearchSettings::default());
        assert_eq!(config.search.debounce(), Duration::from_millis(300));
        assert_eq!(config.review.page_size, 50);
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let config_dir = temp.path().join(".drgcoder");
        std::fs::create_dir_all(&config_dir).unwrap();

        let config_path = config_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1.0"
paths:
  home: ./state
api:
  base_url: https://coding.example.org/
  timeout_seconds: 5
search:
  debounce_ms: 150
  limit: 25
"#
        )
        .unwrap();

        let parsed = load_config_file(&config_path).unwrap();
        assert_eq!(parsed.version.as_deref(), Some("1.0"));
        assert_eq!(parsed.paths.home.as_deref(), Some("./state"));

        let config = resolve(
            PathBuf::from("/unused"),
            EnvOverrides::default(),
            Some((config_path.clone(), parsed)),
        );
        assert_eq!(config.home, config_dir.join("./state"));
        assert_eq!(config.api.base_url.as_deref(), Some("https://coding.example.org"));
        assert_eq!(config.api.timeout(), Duration::from_secs(5));
        assert_eq!(config.search.debounce_ms, 150);
        assert_eq!(config.search.min_query_length, 2);
        assert_eq!(config.search.limit, 25);
        assert_eq!(config.config_file, Some(config_path));
    }

    #[test]
    fn test_env_overrides_file() {
        let file = ConfigFile {
            api: Some(ApiConfig {
                base_url: Some("http://file.example".to_string()),
                timeout_seconds: None,
            }),
            ..Default::default()
        };
        let env = EnvOverrides {
            home: Some("/srv/drgcoder".to_string()),
            api_url: Some("http://env.example//".to_string()),
        };

        let config = resolve(
            PathBuf::from("/unused"),
            env,
            Some((PathBuf::from("/proj/.drgcoder/config.yaml"), file)),
        );
        assert_eq!(config.home, PathBuf::from("/srv/drgcoder"));
        assert_eq!(config.api.base_url.as_deref(), Some("http://env.example"));
    }

    #[test]
    fn test_empty_env_url_selects_mock() {
        let file = ConfigFile {
            api: Some(ApiConfig {
                base_url: Some("http://file.example".to_string()),
                timeout_seconds: None,
            }),
            ..Default::default()
        };
        let env = EnvOverrides {
            home: None,
            api_url: Some("  ".to_string()),
        };
        let config = resolve(PathBuf::from("/h"), env, Some((PathBuf::from("/p/.drgcoder/config.yaml"), file)));
        assert!(config.api.base_url.is_none());
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "./subdir"),
            PathBuf::from("/home/user/project/subdir")
        );
        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
    }

    #[test]
    fn test_preferences_path() {
        let config = ResolvedConfig::with_home("/tmp/dc");
        assert_eq!(config.preferences_path(), PathBuf::from("/tmp/dc/preferences.json"));
    }
}
