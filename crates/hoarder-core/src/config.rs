//! Configuration loading and discovery.
//!
//! This module provides configuration file discovery by:
//! 1. Walking up from the current directory to find project config
//! 2. Loading user config from XDG config directory
//! 3. Layering GitHub Actions inputs (`INPUT_*`) and CLI overrides on top
//!
//! # Supported formats
//!
//! The following configuration file formats are supported:
//! - TOML (`.toml`)
//! - YAML (`.yaml`, `.yml`)
//! - JSON (`.json`)
//!
//! # Sources (in order of precedence, highest first):
//! - CLI overrides ([`ConfigLoader::with_overrides`])
//! - `INPUT_<KEY>` environment variables, as set by a GitHub Actions step
//! - Explicit files ([`ConfigLoader::with_file`])
//! - `.hoarder.<ext>` in current directory or any parent
//! - `hoarder.<ext>` in current directory or any parent
//! - `~/.config/hoarder/config.<ext>` (user config)
//!
//! Where `<ext>` is one of: `toml`, `yaml`, `yml`, `json`
//!
//! Values are kept raw here; [`crate::settings`] applies fallbacks and
//! validation.
//!
//! # Example
//! ```no_run
//! use camino::Utf8PathBuf;
//! use hoarder_core::config::{Config, ConfigLoader};
//!
//! let cwd = std::env::current_dir().unwrap();
//! let cwd = Utf8PathBuf::try_from(cwd).expect("current directory is not valid UTF-8");
//! let config = ConfigLoader::new()
//!     .with_project_search(&cwd)
//!     .load()
//!     .unwrap();
//! ```

use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use figment::Figment;
use figment::providers::{Format, Json, Serialized, Toml, Yaml};
use figment::value::Value;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::retry::RetrySettings;

/// Prefix GitHub Actions puts on step inputs.
pub const INPUT_ENV_PREFIX: &str = "INPUT_";

/// Keys whose action input is taken verbatim as text. `INPUT_OWNER=1234`
/// names an owner, not a number.
const TEXT_INPUTS: &[&str] = &[
    "log_dir",
    "insights_token",
    "commit_token",
    "owner",
    "repository",
    "hoard_owner",
    "hoard_repo",
    "branch",
    "base_branch",
    "directory",
    "format",
    "api_url",
];

/// Default per-request timeout for forge calls.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// The configuration for hoarder.
///
/// String options stay optional; an empty string counts as unset because
/// GitHub Actions passes undeclared inputs that way.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Log level for the application (e.g., "debug", "info", "warn", "error").
    pub log_level: LogLevel,
    /// Directory for JSONL log files (falls back to platform defaults if unset).
    pub log_dir: Option<Utf8PathBuf>,
    /// Token used to read metrics.
    pub insights_token: Option<String>,
    /// Token used to write to the hoard repository.
    pub commit_token: Option<String>,
    /// Owner of the source repositories.
    pub owner: Option<String>,
    /// Single source repository (ignored when `all_repos` is set).
    pub repository: Option<String>,
    /// Collect every public repository of `owner`.
    pub all_repos: Toggle,
    /// Owner of the hoard repository.
    pub hoard_owner: Option<String>,
    /// Name of the hoard repository.
    pub hoard_repo: Option<String>,
    /// Branch the history files live on.
    pub branch: Option<String>,
    /// Branch a missing `branch` is created from.
    pub base_branch: Option<String>,
    /// Root directory for history files inside the hoard.
    pub directory: Option<String>,
    /// History file format (`json` or `csv`).
    pub format: Option<String>,
    /// REST API base URL.
    pub api_url: Option<String>,
    /// Per-request timeout in seconds.
    pub http_timeout_secs: u64,
    /// Backoff tuning for the commit protocol.
    pub retry: RetrySettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            log_dir: None,
            insights_token: None,
            commit_token: None,
            owner: None,
            repository: None,
            all_repos: Toggle::default(),
            hoard_owner: None,
            hoard_repo: None,
            branch: None,
            base_branch: None,
            directory: None,
            format: None,
            api_url: None,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            retry: RetrySettings::default(),
        }
    }
}

/// A boolean that may arrive as a real boolean or as text.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Toggle {
    /// Native boolean (config files, CLI).
    Bool(bool),
    /// Text such as `"true"` (action inputs).
    Text(String),
}

impl Default for Toggle {
    fn default() -> Self {
        Self::Bool(false)
    }
}

impl From<bool> for Toggle {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl Toggle {
    /// Interpret the value; `key` names the setting in errors.
    ///
    /// Text is matched case-insensitively and an empty string is `false`.
    pub fn resolve(&self, key: &'static str) -> ConfigResult<bool> {
        match self {
            Self::Bool(b) => Ok(*b),
            Self::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" | "" => Ok(false),
                _ => Err(ConfigError::Invalid {
                    key,
                    value: s.clone(),
                }),
            },
        }
    }
}

/// Values supplied on the command line; `None` leaves lower layers alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigOverrides {
    /// See [`Config::insights_token`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insights_token: Option<String>,
    /// See [`Config::commit_token`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_token: Option<String>,
    /// See [`Config::owner`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// See [`Config::repository`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    /// See [`Config::all_repos`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_repos: Option<bool>,
    /// See [`Config::hoard_owner`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hoard_owner: Option<String>,
    /// See [`Config::hoard_repo`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hoard_repo: Option<String>,
    /// See [`Config::branch`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// See [`Config::base_branch`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_branch: Option<String>,
    /// See [`Config::directory`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    /// See [`Config::format`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// See [`Config::api_url`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

/// Log level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose output for debugging and development.
    Debug,
    /// Standard operational information (default).
    #[default]
    Info,
    /// Warnings about potential issues.
    Warn,
    /// Errors that indicate failures.
    Error,
}

impl LogLevel {
    /// Returns the log level as a lowercase string slice.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Supported configuration file extensions (in order of preference).
const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// Application name for XDG directory lookup and config file names.
const APP_NAME: &str = "hoarder";

/// Builder for loading configuration from multiple sources.
#[derive(Debug)]
pub struct ConfigLoader {
    /// Starting directory for project config search.
    project_search_root: Option<Utf8PathBuf>,
    /// Whether to include user config from XDG directory.
    include_user_config: bool,
    /// Whether to read `INPUT_*` environment variables.
    include_action_inputs: bool,
    /// Stop searching when we hit a directory containing this file/dir.
    boundary_marker: Option<String>,
    /// Explicit config files to load (for testing or programmatic use).
    explicit_files: Vec<Utf8PathBuf>,
    /// Command-line values, applied last.
    overrides: Option<ConfigOverrides>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new config loader with default settings.
    pub fn new() -> Self {
        Self {
            project_search_root: None,
            include_user_config: true,
            include_action_inputs: true,
            boundary_marker: Some(".git".to_string()),
            explicit_files: Vec::new(),
            overrides: None,
        }
    }

    /// Set the starting directory for project config search.
    ///
    /// The loader will walk up from this directory looking for config files.
    pub fn with_project_search<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.project_search_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set whether to include user config from `~/.config/hoarder/`.
    pub const fn with_user_config(mut self, include: bool) -> Self {
        self.include_user_config = include;
        self
    }

    /// Set whether `INPUT_*` environment variables are read.
    pub const fn with_action_inputs(mut self, include: bool) -> Self {
        self.include_action_inputs = include;
        self
    }

    /// Disable boundary marker (search all the way to filesystem root).
    pub fn without_boundary_marker(mut self) -> Self {
        self.boundary_marker = None;
        self
    }

    /// Add an explicit config file to load.
    ///
    /// Files are loaded in order, with later files taking precedence.
    /// Explicit files are loaded after discovered files.
    pub fn with_file<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.explicit_files.push(path.as_ref().to_path_buf());
        self
    }

    /// Apply command-line values on top of every other source.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = Some(overrides);
        self
    }

    /// Load configuration, merging all discovered sources.
    #[tracing::instrument(skip(self), fields(search_root = ?self.project_search_root))]
    pub fn load(self) -> ConfigResult<Config> {
        tracing::debug!("loading configuration");
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if self.include_user_config
            && let Some(user_config) = self.find_user_config()
        {
            figment = Self::merge_file(figment, &user_config);
        }

        if let Some(ref root) = self.project_search_root
            && let Some(project_config) = self.find_project_config(root)
        {
            figment = Self::merge_file(figment, &project_config);
        }

        for file in &self.explicit_files {
            figment = Self::merge_file(figment, file);
        }

        if self.include_action_inputs {
            figment = figment.merge(Serialized::defaults(action_inputs(std::env::vars())));
        }

        if let Some(ref overrides) = self.overrides {
            figment = figment.merge(Serialized::defaults(overrides));
        }

        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::Deserialize(Box::new(e)))?;
        tracing::info!(
            log_level = config.log_level.as_str(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Find project config by walking up from the given directory.
    fn find_project_config(&self, start: &Utf8Path) -> Option<Utf8PathBuf> {
        let mut current = Some(start.to_path_buf());

        while let Some(dir) = current {
            if let Some(ref marker) = self.boundary_marker {
                let marker_path = dir.join(marker);
                if marker_path.exists() && dir != start {
                    break;
                }
            }

            for ext in CONFIG_EXTENSIONS {
                let dotfile = dir.join(format!(".{APP_NAME}.{ext}"));
                if dotfile.is_file() {
                    return Some(dotfile);
                }

                let regular = dir.join(format!("{APP_NAME}.{ext}"));
                if regular.is_file() {
                    return Some(regular);
                }
            }

            current = dir.parent().map(Utf8Path::to_path_buf);
        }

        None
    }

    /// Find user config in XDG config directory.
    fn find_user_config(&self) -> Option<Utf8PathBuf> {
        let config_dir = user_config_dir()?;
        CONFIG_EXTENSIONS
            .iter()
            .map(|ext| config_dir.join(format!("config.{ext}")))
            .find(|path| path.is_file())
    }

    /// Merge a config file into the figment, detecting format from extension.
    fn merge_file(figment: Figment, path: &Utf8Path) -> Figment {
        match path.extension() {
            Some("toml") => figment.merge(Toml::file_exact(path.as_str())),
            Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path.as_str())),
            Some("json") => figment.merge(Json::file_exact(path.as_str())),
            _ => figment.merge(Toml::file_exact(path.as_str())),
        }
    }
}

/// GitHub Actions step inputs as a configuration layer.
///
/// `INPUT_HOARD_REPO` (or `INPUT_HOARD-REPO`) becomes `hoard_repo`. Empty
/// inputs are dropped so they never mask a lower layer. Text keys stay
/// strings; the rest are parsed (`true`, `60`) so booleans and numbers
/// deserialize.
pub fn action_inputs<I>(vars: I) -> BTreeMap<String, Value>
where
    I: IntoIterator<Item = (String, String)>,
{
    vars.into_iter()
        .filter_map(|(name, value)| {
            let key = name
                .strip_prefix(INPUT_ENV_PREFIX)?
                .to_ascii_lowercase()
                .replace('-', "_");
            if key.is_empty() || value.trim().is_empty() {
                return None;
            }
            let value = if TEXT_INPUTS.contains(&key.as_str()) {
                Value::from(value)
            } else {
                value.parse::<Value>().unwrap_or_else(|e| match e {})
            };
            Some((key, value))
        })
        .collect()
}

/// Find the project config file path without loading it.
///
/// Useful for commands that need to know where config is located.
pub fn find_project_config<P: AsRef<Utf8Path>>(start: P) -> Option<Utf8PathBuf> {
    ConfigLoader::new()
        .with_project_search(start.as_ref())
        .without_boundary_marker()
        .find_project_config(start.as_ref())
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}

/// Get the user config directory path.
///
/// Returns `~/.config/hoarder/` on Linux, `~/Library/Application Support/hoarder/`
/// on macOS, and equivalent on other platforms.
pub fn user_config_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.config_dir().to_path_buf()).ok()
}

/// Get the user cache directory path.
pub fn user_cache_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.cache_dir().to_path_buf()).ok()
}

/// Get the user data directory path.
///
/// Returns `~/.local/share/hoarder/` on Linux, `~/Library/Application Support/hoarder/`
/// on macOS, and equivalent on other platforms.
pub fn user_data_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.data_dir().to_path_buf()).ok()
}

/// Get the local data directory path (machine-specific, not synced).
pub fn user_data_local_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.data_local_dir().to_path_buf()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn loader() -> ConfigLoader {
        ConfigLoader::new()
            .with_user_config(false)
            .with_action_inputs(false)
    }

    fn write(tmp: &TempDir, name: &str, body: &str) -> Utf8PathBuf {
        let path = tmp.path().join(name);
        fs::write(&path, body).unwrap();
        Utf8PathBuf::try_from(path).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(config.log_dir.is_none());
        assert_eq!(config.http_timeout_secs, 30);
        assert_eq!(config.all_repos, Toggle::Bool(false));
        assert_eq!(config.retry, RetrySettings::default());
    }

    #[test]
    fn test_loader_builds_with_defaults() {
        let config = loader().without_boundary_marker().load().unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_single_file_overrides_default() {
        let tmp = TempDir::new().unwrap();
        let path = write(
            &tmp,
            "config.toml",
            r#"log_level = "debug"
log_dir = "/tmp/hoarder"
owner = "octo"
hoard_repo = "hoard"
format = "json"
"#,
        );

        let config = loader().with_file(&path).load().unwrap();

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(
            config.log_dir.as_ref().map(|dir| dir.as_str()),
            Some("/tmp/hoarder")
        );
        assert_eq!(config.owner.as_deref(), Some("octo"));
        assert_eq!(config.hoard_repo.as_deref(), Some("hoard"));
        assert_eq!(config.format.as_deref(), Some("json"));
    }

    #[test]
    fn test_later_file_overrides_earlier() {
        let tmp = TempDir::new().unwrap();
        let base = write(&tmp, "base.toml", "branch = \"one\"\nlog_level = \"warn\"");
        let over = write(&tmp, "override.toml", r#"branch = "two""#);

        let config = loader().with_file(&base).with_file(&over).load().unwrap();

        assert_eq!(config.branch.as_deref(), Some("two"));
        assert_eq!(config.log_level, LogLevel::Warn);
    }

    #[test]
    fn test_yaml_and_json_files() {
        let tmp = TempDir::new().unwrap();
        let yaml = write(&tmp, "a.yaml", "directory: stats\nall_repos: true\n");
        let json = write(&tmp, "b.json", r#"{"hoard_owner": "keeper"}"#);

        let config = loader().with_file(&yaml).with_file(&json).load().unwrap();

        assert_eq!(config.directory.as_deref(), Some("stats"));
        assert_eq!(config.all_repos, Toggle::Bool(true));
        assert_eq!(config.hoard_owner.as_deref(), Some("keeper"));
    }

    #[test]
    fn test_all_repos_accepts_text() {
        let tmp = TempDir::new().unwrap();
        let path = write(&tmp, "config.toml", r#"all_repos = "TRUE""#);
        let config = loader().with_file(&path).load().unwrap();
        assert_eq!(config.all_repos, Toggle::Text("TRUE".into()));
        assert!(config.all_repos.resolve("all_repos").unwrap());
    }

    #[test]
    fn test_retry_section() {
        let tmp = TempDir::new().unwrap();
        let path = write(
            &tmp,
            "config.toml",
            "[retry]\nmax_attempts = 3\nupdate_ref_delay_ms = 100\n",
        );
        let config = loader().with_file(&path).load().unwrap();
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.update_ref_delay_ms, 100);
        assert_eq!(config.retry.stale_read_delay_ms, 2_000);
    }

    #[test]
    fn test_project_config_discovery() {
        let tmp = TempDir::new().unwrap();
        let project_dir = tmp.path().join("project");
        let sub_dir = project_dir.join("src").join("deep");
        fs::create_dir_all(&sub_dir).unwrap();
        fs::write(project_dir.join(".hoarder.toml"), r#"log_level = "debug""#).unwrap();
        let sub_dir = Utf8PathBuf::try_from(sub_dir).unwrap();

        let config = loader()
            .without_boundary_marker()
            .with_project_search(&sub_dir)
            .load()
            .unwrap();

        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_boundary_marker_stops_search() {
        let tmp = TempDir::new().unwrap();
        let parent = tmp.path().join("parent");
        let child = parent.join("child");
        let work = child.join("work");
        fs::create_dir_all(&work).unwrap();
        fs::write(parent.join(".hoarder.toml"), r#"log_level = "warn""#).unwrap();
        fs::create_dir(child.join(".git")).unwrap();
        let work = Utf8PathBuf::try_from(work).unwrap();

        let config = ConfigLoader::new()
            .with_user_config(false)
            .with_action_inputs(false)
            .with_project_search(&work)
            .load()
            .unwrap();

        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_explicit_file_overrides_project_config() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".hoarder.toml"), r#"branch = "project""#).unwrap();
        let over = write(&tmp, "override.toml", r#"branch = "explicit""#);
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();

        let config = loader()
            .without_boundary_marker()
            .with_project_search(&root)
            .with_file(&over)
            .load()
            .unwrap();

        assert_eq!(config.branch.as_deref(), Some("explicit"));
    }

    #[test]
    fn test_overrides_beat_files() {
        let tmp = TempDir::new().unwrap();
        let path = write(&tmp, "config.toml", "format = \"json\"\nbranch = \"kept\"");

        let config = loader()
            .with_file(&path)
            .with_overrides(ConfigOverrides {
                format: Some("csv".into()),
                all_repos: Some(true),
                ..ConfigOverrides::default()
            })
            .load()
            .unwrap();

        assert_eq!(config.format.as_deref(), Some("csv"));
        assert_eq!(config.branch.as_deref(), Some("kept"));
        assert_eq!(config.all_repos, Toggle::Bool(true));
    }

    #[test]
    fn test_invalid_type_is_deserialize_error() {
        let tmp = TempDir::new().unwrap();
        let path = write(&tmp, "config.toml", r#"http_timeout_secs = "soon""#);
        let result = loader().with_file(&path).load();
        assert!(matches!(result, Err(ConfigError::Deserialize(_))));
    }

    #[test]
    fn test_toggle_resolution() {
        assert!(!Toggle::Text(String::new()).resolve("all_repos").unwrap());
        assert!(!Toggle::Text("False".into()).resolve("all_repos").unwrap());
        assert!(Toggle::Text("TRUE".into()).resolve("all_repos").unwrap());
        assert!(Toggle::from(true).resolve("all_repos").unwrap());
        let err = Toggle::Text("yes".into()).resolve("all_repos").unwrap_err();
        assert!(err.to_string().contains("all_repos"));
    }

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_action_inputs_keep_numeric_names_as_text() {
        let inputs = action_inputs(vars(&[
            ("INPUT_OWNER", "1234"),
            ("INPUT_REPOSITORY", "2048"),
            ("INPUT_BRANCH", "2024"),
            ("INPUT_HTTP_TIMEOUT_SECS", "60"),
            ("INPUT_ALL_REPOS", "true"),
            ("INPUT_HOARD-REPO", "vault"),
            ("INPUT_FORMAT", ""),
            ("GITHUB_TOKEN", "ignored"),
        ]));

        assert_eq!(inputs.get("owner"), Some(&Value::from("1234".to_string())));
        assert_eq!(inputs.get("hoard_repo"), Some(&Value::from("vault".to_string())));
        assert!(!inputs.contains_key("format"));
        assert!(!inputs.contains_key("github_token"));
        assert_eq!(inputs.len(), 6);

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Serialized::defaults(inputs))
            .extract()
            .unwrap();
        assert_eq!(config.owner.as_deref(), Some("1234"));
        assert_eq!(config.repository.as_deref(), Some("2048"));
        assert_eq!(config.branch.as_deref(), Some("2024"));
        assert_eq!(config.http_timeout_secs, 60);
        assert_eq!(config.all_repos, Toggle::Bool(true));
    }

    #[test]
    fn test_numeric_action_inputs_load_from_environment() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("INPUT_OWNER", "1234");
            jail.set_env("INPUT_REPOSITORY", "2048");
            jail.set_env("INPUT_DIRECTORY", "7");

            let config = ConfigLoader::new()
                .with_user_config(false)
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.owner.as_deref(), Some("1234"));
            assert_eq!(config.repository.as_deref(), Some("2048"));
            assert_eq!(config.directory.as_deref(), Some("7"));
            Ok(())
        });
    }

    #[test]
    fn test_user_config_dir() {
        if let Some(path) = user_config_dir() {
            assert!(path.as_str().contains("hoarder"));
        }
    }
}
