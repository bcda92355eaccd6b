//! Loader for knotenalarm configuration with YAML + environment overlays.
//!
//! Sources are merged in order: the YAML file (or inline snippets), then
//! `KNOTEN__SECTION__KEY` environment variables, then explicit overrides
//! (the CLI flags). `${VAR}` placeholders in string values are expanded
//! before the typed structs are materialised, and the result is validated.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

pub const DEFAULT_TWITTER_API_BASE: &str = "https://api.twitter.com";
pub const DEFAULT_GEOCODER_ENDPOINT: &str = "https://nominatim.openstreetmap.org/reverse";
pub const DEFAULT_USER_AGENT: &str = concat!("knotenalarm/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
pub struct KnotenConfig {
    #[serde(default)]
    pub twitter: TwitterConfig,
    pub freifunk: FreifunkConfig,
    #[serde(default)]
    pub geocoder: GeocoderConfig,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// OAuth 1.0a user-context credentials for the announcement account.
#[derive(Clone, Deserialize)]
pub struct TwitterConfig {
    #[serde(default)]
    pub consumer_key: String,
    #[serde(default)]
    pub consumer_secret: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub access_token_secret: String,
    #[serde(default = "default_twitter_api_base")]
    pub api_base: String,
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            consumer_key: String::new(),
            consumer_secret: String::new(),
            access_token: String::new(),
            access_token_secret: String::new(),
            api_base: default_twitter_api_base(),
        }
    }
}

// Secrets never reach logs, even via `{:?}`.
impl fmt::Debug for TwitterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn mask(s: &str) -> &'static str {
            if s.is_empty() { "<unset>" } else { "<redacted>" }
        }
        f.debug_struct("TwitterConfig")
            .field("consumer_key", &mask(&self.consumer_key))
            .field("consumer_secret", &mask(&self.consumer_secret))
            .field("access_token", &mask(&self.access_token))
            .field("access_token_secret", &mask(&self.access_token_secret))
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FreifunkConfig {
    pub nodelist_url: String,
    pub map_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocoderConfig {
    #[serde(default = "default_geocoder_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            endpoint: default_geocoder_endpoint(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Contact address forwarded to the geocoder.
    #[serde(default)]
    pub email: Option<String>,
    /// Lookback window in minutes.
    #[serde(default = "default_lookback_minutes")]
    pub lookback_minutes: u64,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub language: Language,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            email: None,
            lookback_minutes: default_lookback_minutes(),
            debug: false,
            language: Language::default(),
        }
    }
}

impl Settings {
    pub fn lookback(&self) -> Duration {
        Duration::from_secs(self.lookback_minutes.saturating_mul(60))
    }

    /// The configured contact email, ignoring blank values.
    pub fn contact_email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }
}

/// Language of the announcement template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    De,
    En,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormatName {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default)]
    pub format: LogFormatName,
    #[serde(default = "default_true")]
    pub stderr: bool,
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            format: LogFormatName::default(),
            stderr: true,
            filter: default_log_filter(),
        }
    }
}

fn default_twitter_api_base() -> String {
    DEFAULT_TWITTER_API_BASE.into()
}
fn default_geocoder_endpoint() -> String {
    DEFAULT_GEOCODER_ENDPOINT.into()
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}
fn default_lookback_minutes() -> u64 {
    60
}
fn default_true() -> bool {
    true
}
fn default_log_filter() -> String {
    "info".into()
}

impl KnotenConfig {
    /// Reject configurations the run could not complete with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_url("freifunk.nodelist_url", &self.freifunk.nodelist_url)?;
        check_url("freifunk.map_url", &self.freifunk.map_url)?;
        check_url("geocoder.endpoint", &self.geocoder.endpoint)?;

        if self.settings.lookback_minutes == 0 {
            return Err(ConfigError::Message(
                "settings.lookback_minutes must be greater than zero".into(),
            ));
        }

        if !self.settings.debug {
            check_url("twitter.api_base", &self.twitter.api_base)?;
            let secrets = [
                ("twitter.consumer_key", &self.twitter.consumer_key),
                ("twitter.consumer_secret", &self.twitter.consumer_secret),
                ("twitter.access_token", &self.twitter.access_token),
                ("twitter.access_token_secret", &self.twitter.access_token_secret),
            ];
            for (key, value) in secrets {
                if value.trim().is_empty() {
                    return Err(ConfigError::Message(format!(
                        "{key} is required unless settings.debug is enabled"
                    )));
                }
            }
        }
        Ok(())
    }
}

fn check_url(key: &str, raw: &str) -> Result<(), ConfigError> {
    if raw.trim().is_empty() {
        return Err(ConfigError::Message(format!("{key} must not be empty")));
    }
    url::Url::parse(raw)
        .map(|_| ())
        .map_err(|e| ConfigError::Message(format!("{key} is not a valid URL ({raw}): {e}")))
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct KnotenConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for KnotenConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl KnotenConfigLoader {
    /// Empty loader; `KNOTEN__`-prefixed environment variables are layered on
    /// top of every file/snippet source when [`KnotenConfigLoader::load`] runs.
    ///
    /// ```
    /// use knoten_config::KnotenConfigLoader;
    ///
    /// let cfg = KnotenConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// freifunk:
    ///   nodelist_url: "https://ff.example/nodelist.json"
    ///   map_url: "https://map.example/"
    /// settings:
    ///   debug: true
    /// "#,
    ///     )
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert!(cfg.settings.debug);
    /// assert_eq!(cfg.settings.lookback_minutes, 60);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Force a single key (dotted path, e.g. `settings.debug`), winning over
    /// every other source.
    ///
    /// ```
    /// use knoten_config::KnotenConfigLoader;
    ///
    /// let cfg = KnotenConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// freifunk:
    ///   nodelist_url: "https://ff.example/nodelist.json"
    ///   map_url: "https://map.example/"
    /// settings:
    ///   lookback_minutes: 60
    /// "#,
    ///     )
    ///     .with_override("settings.debug", true)
    ///     .unwrap()
    ///     .with_override("settings.lookback_minutes", 15_i64)
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert!(cfg.settings.debug);
    /// assert_eq!(cfg.settings.lookback_minutes, 15);
    /// ```
    pub fn with_override<V>(mut self, key: &str, value: V) -> Result<Self, ConfigError>
    where
        V: Into<config::Value>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Consume the builder, expand `${VAR}` placeholders, deserialize and
    /// validate.
    ///
    /// ```
    /// use knoten_config::KnotenConfigLoader;
    ///
    /// unsafe { std::env::set_var("FF_CONSUMER_SECRET", "injected-from-env"); }
    ///
    /// let cfg = KnotenConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// twitter:
    ///   consumer_key: "ck"
    ///   consumer_secret: "${FF_CONSUMER_SECRET}"
    ///   access_token: "at"
    ///   access_token_secret: "ats"
    /// freifunk:
    ///   nodelist_url: "https://ff.example/nodelist.json"
    ///   map_url: "https://map.example/"
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(cfg.twitter.consumer_secret, "injected-from-env");
    /// assert_eq!(cfg.twitter.api_base, "https://api.twitter.com");
    ///
    /// unsafe { std::env::remove_var("FF_CONSUMER_SECRET"); }
    /// ```
    pub fn load(self) -> Result<KnotenConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("KNOTEN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: KnotenConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;
        typed.validate()?;

        Ok(typed)
    }
}
