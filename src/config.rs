//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory (or
//! the file given with `-f`), then applies `WEATHER_BOT_WORK_DIR`,
//! `WEATHER_BOT_LOG_LEVEL` and `PORT` env overrides. API keys are only ever read from the environment.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;

/// Which tutorial bot answers turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BotKind {
    Echo,
    Counter,
    Luis,
    Weather,
}

impl BotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BotKind::Echo => "echo",
            BotKind::Counter => "counter",
            BotKind::Luis => "luis",
            BotKind::Weather => "weather",
        }
    }
}

/// PTY (console) channel configuration.
#[derive(Debug, Clone)]
pub struct PtyConfig {
    pub enabled: bool,
    /// Name the console user is known by in activities.
    pub user_name: String,
}

/// HTTP channel configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub enabled: bool,
    /// Socket address to bind the HTTP channel to.
    pub bind: String,
}

#[derive(Debug, Clone)]
pub struct CommsConfig {
    pub pty: PtyConfig,
    pub http: HttpConfig,
}

/// State storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    File,
}

/// LUIS recognizer configuration (`[luis]`).
#[derive(Debug, Clone)]
pub struct LuisConfig {
    /// `"luis"` or `"keyword"` (offline).
    pub provider: String,
    pub region: String,
    pub app_id: String,
    pub timeout_seconds: u64,
}

/// Geocoding / timezone service configuration (`[maps]`).
#[derive(Debug, Clone)]
pub struct MapsConfig {
    /// `"azure"` or `"gazetteer"` (offline).
    pub provider: String,
    pub api_base_url: String,
    pub timeout_seconds: u64,
}

/// Weather service configuration (`[weather]`).
#[derive(Debug, Clone)]
pub struct WeatherConfig {
    /// `"darksky"` or `"static"` (offline).
    pub provider: String,
    pub api_base_url: String,
    /// Dark Sky unit system: `auto`, `us`, `si`, `ca`, `uk2`.
    pub units: String,
    pub timeout_seconds: u64,
}

/// Secrets sourced from the environment. Never read from TOML.
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    pub luis: Option<String>,
    pub maps: Option<String>,
    pub dark_sky: Option<String>,
}

/// Fully-resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_name: String,
    pub bot: BotKind,
    /// Working directory for persistent data (already expanded, no `~`).
    pub work_dir: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub comms: CommsConfig,
    pub storage: StorageBackend,
    pub luis: LuisConfig,
    pub maps: MapsConfig,
    pub weather: WeatherConfig,
    pub keys: ApiKeys,
}

impl Config {
    pub fn comms_pty_should_load(&self) -> bool {
        self.comms.pty.enabled
    }

    pub fn comms_http_should_load(&self) -> bool {
        self.comms.http.enabled
    }

    /// Directory holding file-backed conversation and user state.
    pub fn state_dir(&self) -> PathBuf {
        self.work_dir.join("state")
    }
}

/// Raw TOML shape — `serde` target before resolution.
#[derive(Deserialize)]
struct RawConfig {
    bot: RawBot,
    #[serde(default)]
    comms: RawComms,
    #[serde(default)]
    storage: RawStorage,
    #[serde(default)]
    luis: RawLuis,
    #[serde(default)]
    maps: RawMaps,
    #[serde(default)]
    weather: RawWeather,
}

#[derive(Deserialize)]
struct RawBot {
    name: String,
    #[serde(default = "default_bot_kind")]
    kind: BotKind,
    work_dir: String,
    log_level: String,
    #[serde(default)]
    log_file: Option<String>,
}

#[derive(Deserialize, Default)]
struct RawComms {
    #[serde(default)]
    pty: RawPty,
    #[serde(default)]
    http: RawHttp,
}

#[derive(Deserialize)]
struct RawPty {
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default = "default_pty_user")]
    user_name: String,
}

#[derive(Deserialize)]
struct RawHttp {
    #[serde(default = "default_false")]
    enabled: bool,
    #[serde(default = "default_http_bind")]
    bind: String,
}

#[derive(Deserialize)]
struct RawStorage {
    #[serde(default = "default_storage_backend")]
    backend: StorageBackend,
}

#[derive(Deserialize)]
struct RawLuis {
    #[serde(default = "default_luis_provider")]
    provider: String,
    #[serde(default = "default_luis_region")]
    region: String,
    #[serde(default)]
    app_id: String,
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
}

#[derive(Deserialize)]
struct RawMaps {
    #[serde(default = "default_maps_provider")]
    provider: String,
    #[serde(default = "default_maps_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
}

#[derive(Deserialize)]
struct RawWeather {
    #[serde(default = "default_weather_provider")]
    provider: String,
    #[serde(default = "default_weather_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_weather_units")]
    units: String,
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawPty {
    fn default() -> Self {
        Self { enabled: true, user_name: default_pty_user() }
    }
}

impl Default for RawHttp {
    fn default() -> Self {
        Self { enabled: false, bind: default_http_bind() }
    }
}

impl Default for RawStorage {
    fn default() -> Self {
        Self { backend: default_storage_backend() }
    }
}

impl Default for RawLuis {
    fn default() -> Self {
        Self {
            provider: default_luis_provider(),
            region: default_luis_region(),
            app_id: String::new(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for RawMaps {
    fn default() -> Self {
        Self {
            provider: default_maps_provider(),
            api_base_url: default_maps_api_base_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for RawWeather {
    fn default() -> Self {
        Self {
            provider: default_weather_provider(),
            api_base_url: default_weather_api_base_url(),
            units: default_weather_units(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

fn default_bot_kind() -> BotKind { BotKind::Weather }
fn default_pty_user() -> String { "User".to_string() }
fn default_http_bind() -> String { "127.0.0.1:3978".to_string() }
fn default_storage_backend() -> StorageBackend { StorageBackend::Memory }
fn default_luis_provider() -> String { "keyword".to_string() }
fn default_luis_region() -> String { "westus".to_string() }
fn default_maps_provider() -> String { "gazetteer".to_string() }
fn default_maps_api_base_url() -> String { "https://atlas.microsoft.com".to_string() }
fn default_weather_provider() -> String { "static".to_string() }
fn default_weather_api_base_url() -> String { "https://api.darksky.net".to_string() }
fn default_weather_units() -> String { "auto".to_string() }
fn default_timeout_seconds() -> u64 { 15 }

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

/// Environment overrides applied on top of the TOML file.
#[derive(Debug, Default)]
pub struct Overrides<'a> {
    pub work_dir: Option<&'a str>,
    pub log_level: Option<&'a str>,
    pub port: Option<&'a str>,
}

/// Load config from `path` (default `config/default.toml`), then apply
/// env-var overrides.
pub fn load(path: Option<&str>) -> Result<Config, AppError> {
    let work_dir = env::var("WEATHER_BOT_WORK_DIR").ok();
    let log_level = env::var("WEATHER_BOT_LOG_LEVEL").ok();
    let port = env::var("PORT").ok();
    let mut config = load_from(
        Path::new(path.unwrap_or("config/default.toml")),
        Overrides {
            work_dir: work_dir.as_deref(),
            log_level: log_level.as_deref(),
            port: port.as_deref(),
        },
    )?;
    config.keys = ApiKeys {
        luis: env::var("LUIS_SUBSCRIPTION_KEY").ok(),
        maps: env::var("MAP_KEY").ok(),
        dark_sky: env::var("DARK_SKY_KEY").ok(),
    };
    Ok(config)
}

/// Internal loader — accepts an explicit path and overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(path: &Path, overrides: Overrides<'_>) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let b = parsed.bot;
    let work_dir = expand_home(overrides.work_dir.unwrap_or(&b.work_dir));
    let log_level = overrides.log_level.unwrap_or(&b.log_level).to_string();
    let log_file = b.log_file.map(|p| {
        let path = expand_home(&p);
        if path.is_absolute() { path } else { work_dir.join(path) }
    });

    let bind = match overrides.port {
        Some(port) => with_port(&parsed.comms.http.bind, port)?,
        None => parsed.comms.http.bind,
    };

    Ok(Config {
        bot_name: b.name,
        bot: b.kind,
        work_dir,
        log_level,
        log_file,
        comms: CommsConfig {
            pty: PtyConfig {
                enabled: parsed.comms.pty.enabled,
                user_name: parsed.comms.pty.user_name,
            },
            http: HttpConfig { enabled: parsed.comms.http.enabled, bind },
        },
        storage: parsed.storage.backend,
        luis: LuisConfig {
            provider: parsed.luis.provider,
            region: parsed.luis.region,
            app_id: parsed.luis.app_id,
            timeout_seconds: parsed.luis.timeout_seconds,
        },
        maps: MapsConfig {
            provider: parsed.maps.provider,
            api_base_url: parsed.maps.api_base_url,
            timeout_seconds: parsed.maps.timeout_seconds,
        },
        weather: WeatherConfig {
            provider: parsed.weather.provider,
            api_base_url: parsed.weather.api_base_url,
            units: parsed.weather.units,
            timeout_seconds: parsed.weather.timeout_seconds,
        },
        keys: ApiKeys::default(),
    })
}

/// Replace the port of a `host:port` bind address.
fn with_port(bind: &str, port: &str) -> Result<String, AppError> {
    let port: u16 = port
        .trim()
        .parse()
        .map_err(|_| AppError::Config(format!("invalid PORT value: '{port}'")))?;
    let host = bind.rsplit_once(':').map(|(h, _)| h).unwrap_or(bind);
    Ok(format!("{host}:{port}"))
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    if path == "~"
        && let Some(home) = dirs::home_dir()
    {
        return home;
    }
    PathBuf::from(path)
}

// ── test helpers ──────────────────────────────────────────────────────────────

impl Config {
    /// Offline `Config` — keyword recognizer, gazetteer, static forecast,
    /// in-memory state. Used by tests and demos; makes no network calls.
    pub fn offline(bot: BotKind, work_dir: &Path) -> Self {
        Self {
            bot_name: "test".into(),
            bot,
            work_dir: work_dir.to_path_buf(),
            log_level: "info".into(),
            log_file: None,
            comms: CommsConfig {
                pty: PtyConfig { enabled: false, user_name: default_pty_user() },
                http: HttpConfig { enabled: false, bind: default_http_bind() },
            },
            storage: StorageBackend::Memory,
            luis: LuisConfig {
                provider: "keyword".into(),
                region: default_luis_region(),
                app_id: String::new(),
                timeout_seconds: 1,
            },
            maps: MapsConfig {
                provider: "gazetteer".into(),
                api_base_url: "http://localhost:0".into(),
                timeout_seconds: 1,
            },
            weather: WeatherConfig {
                provider: "static".into(),
                api_base_url: "http://localhost:0".into(),
                units: "us".into(),
                timeout_seconds: 1,
            },
            keys: ApiKeys::default(),
        }
    }
}
