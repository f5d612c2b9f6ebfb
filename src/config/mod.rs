//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{net::SocketAddr, num::NonZeroU32, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

pub use cli::{
    CliArgs, Command, RenderArgs, ServeArgs, ServeOverrides, SitemapArgs, StoreOverrides,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "prerender";
const ENV_PREFIX: &str = "PRERENDER";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_STORE_BASE_URL: &str = "https://firestore.googleapis.com/v1/";
const DEFAULT_STORE_DATABASE: &str = "(default)";
const DEFAULT_STORE_COLLECTION: &str = "blog post";
const DEFAULT_STORE_PAGE_SIZE: u32 = 200;
const MAX_STORE_PAGE_SIZE: u32 = 1000;
const DEFAULT_SCHEME: &str = "https";
const DEFAULT_POST_MAX_AGE_SECS: u32 = 300;
const DEFAULT_POST_SHARED_MAX_AGE_SECS: u32 = 600;
const DEFAULT_SITEMAP_MAX_AGE_SECS: u32 = 3600;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub store: StoreSettings,
    pub http: HttpSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub base_url: Url,
    /// Only commands that reach the store require it.
    pub project_id: Option<String>,
    pub database: String,
    pub collection: String,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub page_size: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub default_scheme: String,
    pub post_max_age_seconds: u32,
    pub post_shared_max_age_seconds: u32,
    pub sitemap_max_age_seconds: u32,
}

impl HttpSettings {
    pub fn post_cache_control(&self) -> String {
        format!(
            "public, max-age={}, s-maxage={}",
            self.post_max_age_seconds, self.post_shared_max_age_seconds
        )
    }

    pub fn sitemap_cache_control(&self) -> String {
        format!("public, max-age={}", self.sitemap_max_age_seconds)
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            default_scheme: DEFAULT_SCHEME.to_string(),
            post_max_age_seconds: DEFAULT_POST_MAX_AGE_SECS,
            post_shared_max_age_seconds: DEFAULT_POST_SHARED_MAX_AGE_SECS,
            sitemap_max_age_seconds: DEFAULT_SITEMAP_MAX_AGE_SECS,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Render(args)) => raw.apply_store_overrides(&args.store),
        Some(Command::Sitemap(args)) => raw.apply_store_overrides(&args.store),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    store: RawStoreSettings,
    http: RawHttpSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }

        self.apply_store_overrides(&overrides.store);
    }

    fn apply_store_overrides(&mut self, overrides: &StoreOverrides) {
        if let Some(project) = overrides.store_project_id.as_ref() {
            self.store.project_id = Some(project.clone());
        }
        if let Some(url) = overrides.store_base_url.as_ref() {
            self.store.base_url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            store,
            http,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            store: build_store_settings(store)?,
            http: build_http_settings(http)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_store_settings(store: RawStoreSettings) -> Result<StoreSettings, LoadError> {
    let base_url = non_blank(store.base_url).unwrap_or_else(|| DEFAULT_STORE_BASE_URL.to_string());
    let base_url = Url::parse(&base_url)
        .map_err(|err| LoadError::invalid("store.base_url", format!("failed to parse: {err}")))?;
    if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "store.base_url",
            "must be an absolute http(s) URL",
        ));
    }

    let page_size = store.page_size.unwrap_or(DEFAULT_STORE_PAGE_SIZE.into());
    if page_size > u64::from(MAX_STORE_PAGE_SIZE) {
        return Err(LoadError::invalid(
            "store.page_size",
            format!("must not exceed {MAX_STORE_PAGE_SIZE}"),
        ));
    }
    let page_size = non_zero_u32(page_size, "store.page_size")?;

    let database = non_blank(store.database).unwrap_or_else(|| DEFAULT_STORE_DATABASE.to_string());
    let collection =
        non_blank(store.collection).unwrap_or_else(|| DEFAULT_STORE_COLLECTION.to_string());

    Ok(StoreSettings {
        base_url,
        project_id: non_blank(store.project_id),
        database,
        collection,
        api_key: non_blank(store.api_key),
        access_token: non_blank(store.access_token),
        page_size,
    })
}

fn build_http_settings(http: RawHttpSettings) -> Result<HttpSettings, LoadError> {
    let default_scheme = non_blank(http.default_scheme)
        .map(|scheme| scheme.to_ascii_lowercase())
        .unwrap_or_else(|| DEFAULT_SCHEME.to_string());
    if !matches!(default_scheme.as_str(), "http" | "https") {
        return Err(LoadError::invalid(
            "http.default_scheme",
            format!("expected `http` or `https`, got `{default_scheme}`"),
        ));
    }

    let post_max_age_seconds = http.post_max_age_seconds.unwrap_or(DEFAULT_POST_MAX_AGE_SECS);
    let post_shared_max_age_seconds = http
        .post_shared_max_age_seconds
        .unwrap_or(DEFAULT_POST_SHARED_MAX_AGE_SECS);
    if post_shared_max_age_seconds <= post_max_age_seconds {
        return Err(LoadError::invalid(
            "http.post_shared_max_age_seconds",
            format!("must exceed http.post_max_age_seconds ({post_max_age_seconds})"),
        ));
    }

    let sitemap_max_age_seconds = http
        .sitemap_max_age_seconds
        .unwrap_or(DEFAULT_SITEMAP_MAX_AGE_SECS);

    Ok(HttpSettings {
        default_scheme,
        post_max_age_seconds,
        post_shared_max_age_seconds,
        sitemap_max_age_seconds,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStoreSettings {
    base_url: Option<String>,
    project_id: Option<String>,
    database: Option<String>,
    collection: Option<String>,
    api_key: Option<String>,
    access_token: Option<String>,
    page_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawHttpSettings {
    default_scheme: Option<String>,
    post_max_age_seconds: Option<u32>,
    post_shared_max_age_seconds: Option<u32>,
    sitemap_max_age_seconds: Option<u32>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}
