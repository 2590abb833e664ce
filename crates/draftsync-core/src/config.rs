// Configuration loading and parsing (draftsync.toml, credentials.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::sources::Platform;

const CONFIG_DIR: &str = "config";
const CONFIG_FILE: &str = "draftsync.toml";
const CREDENTIALS_FILE: &str = "credentials.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub polling: PollingConfig,
    pub stream: StreamConfig,
    pub refresh: RefreshConfig,
    pub endpoints: EndpointsConfig,
    pub season: SeasonConfig,
    pub database: DatabaseConfig,
    #[serde(skip)]
    pub credentials: CredentialsConfig,
}

// ---------------------------------------------------------------------------
// draftsync.toml sections
// ---------------------------------------------------------------------------

/// Poll cadence per platform, in seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    pub sleeper_secs: u64,
    pub espn_secs: u64,
    pub yahoo_secs: u64,
    pub nfl_secs: u64,
}

impl PollingConfig {
    pub fn interval_for(&self, platform: Platform) -> Duration {
        let secs = match platform {
            Platform::Sleeper => self.sleeper_secs,
            Platform::Espn => self.espn_secs,
            Platform::Yahoo => self.yahoo_secs,
            Platform::Nfl => self.nfl_secs,
            Platform::Manual => 0,
        };
        Duration::from_secs(secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    pub enabled: bool,
    pub heartbeat_secs: u64,
}

impl StreamConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    /// Refresh the player feed once at startup.
    pub on_startup: bool,
    pub ttl_hours: i64,
    /// Local wall-clock hours at which a forced refresh runs.
    pub hours: Vec<u32>,
    pub new_player_cap: usize,
    pub feed_url: String,
}

impl RefreshConfig {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.ttl_hours)
    }
}

/// Base URLs for every platform. Overridable so tests and mirrors can
/// point adapters elsewhere.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointsConfig {
    pub sleeper_api: String,
    pub sleeper_ws: String,
    pub espn_api: String,
    pub yahoo_api: String,
    pub nfl_api: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeasonConfig {
    pub default_year: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Empty means "use the platform data directory".
    #[serde(default)]
    pub path: String,
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    /// OAuth bearer token for the Yahoo Fantasy API.
    pub yahoo_access_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            polling: PollingConfig {
                sleeper_secs: 10,
                espn_secs: 15,
                yahoo_secs: 15,
                nfl_secs: 15,
            },
            stream: StreamConfig {
                enabled: true,
                heartbeat_secs: 30,
            },
            refresh: RefreshConfig {
                on_startup: true,
                ttl_hours: 12,
                hours: vec![8, 20],
                new_player_cap: 30,
                feed_url: "https://api.sleeper.app/v1/players/nfl".into(),
            },
            endpoints: EndpointsConfig {
                sleeper_api: "https://api.sleeper.app/v1".into(),
                sleeper_ws: "wss://apigateway.sleeper.app/v1/ws".into(),
                espn_api: "https://lm-api-reads.fantasy.espn.com/apis/v3/games/ffl".into(),
                yahoo_api: "https://fantasysports.yahooapis.com/fantasy/v2".into(),
                nfl_api: "https://api.fantasy.nfl.com/v1".into(),
            },
            season: SeasonConfig { default_year: 2025 },
            database: DatabaseConfig {
                path: "draftsync.db".into(),
            },
            credentials: CredentialsConfig::default(),
        }
    }
}

impl Config {
    /// Resolve the database location. An empty `database.path` falls back to
    /// the per-user data directory.
    pub fn db_path(&self) -> PathBuf {
        if !self.database.path.trim().is_empty() {
            return PathBuf::from(&self.database.path);
        }
        match directories::ProjectDirs::from("", "", "draftsync") {
            Some(dirs) => dirs.data_dir().join("draftsync.db"),
            None => PathBuf::from("draftsync.db"),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/draftsync.toml` and
/// (optionally) `config/credentials.toml`, relative to `base_dir`.
///
/// Does not copy defaults; prefer `load_config()`.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join(CONFIG_DIR);

    let main_path = config_dir.join(CONFIG_FILE);
    let main_text = read_file(&main_path)?;
    let mut config: Config = toml::from_str(&main_text).map_err(|e| ConfigError::ParseError {
        path: main_path.clone(),
        source: e,
    })?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join(CREDENTIALS_FILE);
    if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        config.credentials =
            toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
                path: credentials_path.clone(),
                source: e,
            })?;
    }

    validate(&config)?;

    Ok(config)
}

/// Files seeded into `config/` on first run. `credentials.toml` is never
/// seeded; `defaults/credentials.toml.example` is a template the user copies
/// and fills in by hand.
const SEEDED_FILES: &[&str] = &[CONFIG_FILE];

fn seed_error(message: String) -> ConfigError {
    ConfigError::DefaultsCopyError { message }
}

/// Copy `src` to `dst` unless `dst` already exists. Returns whether a copy
/// was made.
fn copy_if_missing(src: &Path, dst: &Path) -> Result<bool, ConfigError> {
    // create_new fails on an existing file, so an edited config is never
    // overwritten, even by two starts at once.
    let mut dest = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dst)
    {
        Ok(dest) => dest,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(seed_error(format!("failed to create {}: {e}", dst.display()))),
    };
    let mut source = std::fs::File::open(src)
        .map_err(|e| seed_error(format!("failed to open {}: {e}", src.display())))?;
    std::io::copy(&mut source, &mut dest)
        .map_err(|e| seed_error(format!("failed to write {}: {e}", dst.display())))?;
    Ok(true)
}

/// Seed `config/` from `defaults/` for any file the user does not have yet.
/// Returns the files that were written.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join(CONFIG_DIR);

    if !defaults_dir.is_dir() {
        // Without templates an existing config/ is still usable.
        if config_dir.is_dir() {
            return Ok(vec![]);
        }
        return Err(seed_error(format!(
            "neither defaults/ nor {CONFIG_DIR}/ found in {}; \
             run draftsync from its install directory",
            base_dir.display()
        )));
    }

    std::fs::create_dir_all(&config_dir)
        .map_err(|e| seed_error(format!("failed to create {}: {e}", config_dir.display())))?;

    let mut copied = Vec::new();
    for name in SEEDED_FILES {
        let template = defaults_dir.join(name);
        if !template.is_file() {
            continue;
        }
        let target = config_dir.join(name);
        if copy_if_missing(&template, &target)? {
            copied.push(target);
        }
    }
    Ok(copied)
}

/// Loads config relative to the current working directory, copying
/// defaults first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub fn validate(config: &Config) -> Result<(), ConfigError> {
    let p = &config.polling;
    let poll_fields: &[(&str, u64)] = &[
        ("polling.sleeper_secs", p.sleeper_secs),
        ("polling.espn_secs", p.espn_secs),
        ("polling.yahoo_secs", p.yahoo_secs),
        ("polling.nfl_secs", p.nfl_secs),
    ];
    for (name, val) in poll_fields {
        if *val == 0 {
            return Err(invalid(name, "must be > 0"));
        }
    }

    if config.stream.heartbeat_secs == 0 {
        return Err(invalid("stream.heartbeat_secs", "must be > 0"));
    }

    let r = &config.refresh;
    if r.ttl_hours <= 0 {
        return Err(invalid(
            "refresh.ttl_hours",
            format!("must be > 0, got {}", r.ttl_hours),
        ));
    }
    if r.hours.is_empty() {
        return Err(invalid("refresh.hours", "must list at least one hour"));
    }
    if let Some(bad) = r.hours.iter().find(|h| **h > 23) {
        return Err(invalid(
            "refresh.hours",
            format!("hours must be in 0..=23, got {bad}"),
        ));
    }
    if r.new_player_cap == 0 {
        return Err(invalid("refresh.new_player_cap", "must be > 0"));
    }

    let e = &config.endpoints;
    let url_fields: &[(&str, &str)] = &[
        ("refresh.feed_url", &r.feed_url),
        ("endpoints.sleeper_api", &e.sleeper_api),
        ("endpoints.sleeper_ws", &e.sleeper_ws),
        ("endpoints.espn_api", &e.espn_api),
        ("endpoints.yahoo_api", &e.yahoo_api),
        ("endpoints.nfl_api", &e.nfl_api),
    ];
    for (name, val) in url_fields {
        if val.trim().is_empty() {
            return Err(invalid(name, "must not be empty"));
        }
    }

    let year = config.season.default_year;
    if !(2000..=2100).contains(&year) {
        return Err(invalid(
            "season.default_year",
            format!("must be a four-digit season, got {year}"),
        ));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Walk up from the crate directory to the workspace root holding defaults/.
    fn project_root() -> PathBuf {
        let cwd = std::env::current_dir().unwrap();
        cwd.ancestors()
            .find(|dir| dir.join("defaults/draftsync.toml").exists())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| panic!("Cannot locate defaults/ directory from CWD {:?}", cwd))
    }

    /// Fresh scratch directory with an empty config/ inside.
    fn scratch(name: &str) -> (PathBuf, PathBuf) {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        let config_dir = tmp.join("config");
        fs::create_dir_all(&config_dir).unwrap();
        (tmp, config_dir)
    }

    fn default_text() -> String {
        fs::read_to_string(project_root().join("defaults/draftsync.toml")).unwrap()
    }

    fn expect_validation_field(base: &Path, expected: &str) {
        match load_config_from(base).unwrap_err() {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, expected),
            other => panic!("expected ValidationError, got: {other}"),
        }
    }

    #[test]
    fn load_valid_config_from_defaults() {
        let (tmp, config_dir) = scratch("draftsync_config_defaults");
        fs::write(config_dir.join("draftsync.toml"), default_text()).unwrap();

        let config = load_config_from(&tmp).expect("should load valid config");
        assert_eq!(config.polling.sleeper_secs, 10);
        assert_eq!(config.polling.espn_secs, 15);
        assert_eq!(config.stream.heartbeat_secs, 30);
        assert!(config.stream.enabled);
        assert_eq!(config.refresh.ttl_hours, 12);
        assert_eq!(config.refresh.hours, vec![8, 20]);
        assert_eq!(config.refresh.new_player_cap, 30);
        assert_eq!(config.season.default_year, 2025);
        assert_eq!(
            config.endpoints.sleeper_ws,
            "wss://apigateway.sleeper.app/v1/ws"
        );
        assert!(config.credentials.yahoo_access_token.is_none());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn defaults_file_matches_builtin_default() {
        let (tmp, config_dir) = scratch("draftsync_config_builtin");
        fs::write(config_dir.join("draftsync.toml"), default_text()).unwrap();

        let loaded = load_config_from(&tmp).unwrap();
        let builtin = Config::default();
        assert_eq!(loaded.polling.nfl_secs, builtin.polling.nfl_secs);
        assert_eq!(loaded.refresh.feed_url, builtin.refresh.feed_url);
        assert_eq!(loaded.endpoints.espn_api, builtin.endpoints.espn_api);
        assert_eq!(loaded.database.path, builtin.database.path);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn interval_for_platform() {
        let config = Config::default();
        assert_eq!(
            config.polling.interval_for(Platform::Sleeper),
            Duration::from_secs(10)
        );
        assert_eq!(
            config.polling.interval_for(Platform::Yahoo),
            Duration::from_secs(15)
        );
    }

    #[test]
    fn credentials_toml_with_yahoo_token() {
        let (tmp, config_dir) = scratch("draftsync_config_creds");
        fs::write(config_dir.join("draftsync.toml"), default_text()).unwrap();
        fs::write(
            config_dir.join("credentials.toml"),
            "yahoo_access_token = \"token-abc\"\n",
        )
        .unwrap();

        let config = load_config_from(&tmp).unwrap();
        assert_eq!(
            config.credentials.yahoo_access_token.as_deref(),
            Some("token-abc")
        );

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_poll_interval() {
        let (tmp, config_dir) = scratch("draftsync_config_zero_poll");
        let modified = default_text().replace("espn_secs = 15", "espn_secs = 0");
        fs::write(config_dir.join("draftsync.toml"), modified).unwrap();

        expect_validation_field(&tmp, "polling.espn_secs");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_refresh_hour_out_of_range() {
        let (tmp, config_dir) = scratch("draftsync_config_bad_hour");
        let modified = default_text().replace("hours = [8, 20]", "hours = [8, 24]");
        fs::write(config_dir.join("draftsync.toml"), modified).unwrap();

        expect_validation_field(&tmp, "refresh.hours");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_heartbeat() {
        let (tmp, config_dir) = scratch("draftsync_config_zero_heartbeat");
        let modified = default_text().replace("heartbeat_secs = 30", "heartbeat_secs = 0");
        fs::write(config_dir.join("draftsync.toml"), modified).unwrap();

        expect_validation_field(&tmp, "stream.heartbeat_secs");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_for_missing_main_file() {
        let (tmp, _config_dir) = scratch("draftsync_config_missing");

        match load_config_from(&tmp).unwrap_err() {
            ConfigError::FileNotFound { path } => {
                assert!(path.ends_with("config/draftsync.toml"));
            }
            other => panic!("expected FileNotFound, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let (tmp, config_dir) = scratch("draftsync_config_parse_error");
        fs::write(config_dir.join("draftsync.toml"), "[polling\nsleeper_secs = ").unwrap();

        assert!(matches!(
            load_config_from(&tmp).unwrap_err(),
            ConfigError::ParseError { .. }
        ));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_copies_missing_and_skips_examples() {
        let tmp = std::env::temp_dir().join("draftsync_config_ensure");
        let _ = fs::remove_dir_all(&tmp);
        let defaults = tmp.join("defaults");
        fs::create_dir_all(&defaults).unwrap();
        fs::write(defaults.join("draftsync.toml"), default_text()).unwrap();
        fs::write(defaults.join("credentials.toml.example"), "# sample").unwrap();

        let copied = ensure_config_files(&tmp).unwrap();
        assert_eq!(copied.len(), 1);
        assert!(tmp.join("config/draftsync.toml").exists());
        assert!(!tmp.join("config/credentials.toml.example").exists());

        // Second run copies nothing and leaves edits alone.
        fs::write(tmp.join("config/draftsync.toml"), "edited").unwrap();
        let copied = ensure_config_files(&tmp).unwrap();
        assert!(copied.is_empty());
        assert_eq!(
            fs::read_to_string(tmp.join("config/draftsync.toml")).unwrap(),
            "edited"
        );

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_never_seeds_credentials() {
        let tmp = std::env::temp_dir().join("draftsync_config_no_template");
        let _ = fs::remove_dir_all(&tmp);
        let defaults = tmp.join("defaults");
        fs::create_dir_all(&defaults).unwrap();
        fs::write(defaults.join("credentials.toml"), "[yahoo]").unwrap();

        assert!(ensure_config_files(&tmp).unwrap().is_empty());
        assert!(tmp.join("config").is_dir());
        assert!(!tmp.join("config/credentials.toml").exists());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_errors_when_both_dirs_missing() {
        let tmp = std::env::temp_dir().join("draftsync_config_no_dirs");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        assert!(matches!(
            ensure_config_files(&tmp).unwrap_err(),
            ConfigError::DefaultsCopyError { .. }
        ));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn empty_db_path_falls_back_to_data_dir() {
        let mut config = Config::default();
        assert_eq!(config.db_path(), PathBuf::from("draftsync.db"));
        config.database.path = String::new();
        assert!(config.db_path().ends_with("draftsync.db"));
    }
}
