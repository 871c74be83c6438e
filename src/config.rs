use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub board: BoardSettings,
    #[serde(default)]
    pub notifications: NotificationSettings,
    #[serde(default)]
    pub email: EmailSettings,
    #[serde(default)]
    pub classifier: ClassifierSettings,
    #[serde(default)]
    pub geocoder: GeocoderSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self { path: default_store_path() }
    }
}

fn default_store_path() -> String { "data/users.json".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct BoardSettings {
    #[serde(default = "default_feed_url")]
    pub feed_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            feed_url: default_feed_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl BoardSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_feed_url() -> String {
    "https://www.khk.cz/uredni-deska/opendata.jsonld".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationSettings {
    #[serde(default = "default_max_concurrent_users")]
    pub max_concurrent_users: usize,
    /// Base of the deep links placed in emails
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    #[serde(default = "default_subject")]
    pub subject: String,
    #[serde(default = "default_footer")]
    pub footer: String,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            max_concurrent_users: default_max_concurrent_users(),
            public_base_url: default_public_base_url(),
            subject: default_subject(),
            footer: default_footer(),
        }
    }
}

fn default_max_concurrent_users() -> usize { 4 }
fn default_public_base_url() -> String { "http://localhost:5173".to_string() }
fn default_subject() -> String { crate::core::compose::DEFAULT_SUBJECT.to_string() }
fn default_footer() -> String { crate::core::compose::DEFAULT_FOOTER.to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct EmailSettings {
    #[serde(default = "default_email_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
    #[serde(default = "default_from_email")]
    pub from_email: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            api_url: default_email_api_url(),
            api_key: String::new(),
            from_name: default_from_name(),
            from_email: default_from_email(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmailSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_email_api_url() -> String { "https://api.resend.com".to_string() }
fn default_from_name() -> String { "Úřední deska KHK".to_string() }
fn default_from_email() -> String { "noreply@example.com".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierSettings {
    #[serde(default = "default_classifier_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_classifier_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            endpoint: default_classifier_endpoint(),
            api_key: String::new(),
            model: default_model(),
            chunk_size: default_chunk_size(),
            timeout_secs: default_classifier_timeout_secs(),
        }
    }
}

impl ClassifierSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_classifier_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_model() -> String { "gemini-2.0-flash".to_string() }
fn default_chunk_size() -> usize { 20 }
fn default_classifier_timeout_secs() -> u64 { 60 }

#[derive(Debug, Clone, Deserialize)]
pub struct GeocoderSettings {
    #[serde(default = "default_geocoder_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
    #[serde(default = "default_geocoder_cache_size")]
    pub cache_size: u64,
    pub country_codes: Option<String>,
    pub region_suffix: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeocoderSettings {
    fn default() -> Self {
        Self {
            base_url: default_geocoder_url(),
            user_agent: default_user_agent(),
            requests_per_second: default_requests_per_second(),
            cache_size: default_geocoder_cache_size(),
            country_codes: None,
            region_suffix: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl GeocoderSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_geocoder_url() -> String { "https://nominatim.openstreetmap.org".to_string() }
fn default_user_agent() -> String {
    format!("board-alerts/{}", env!("CARGO_PKG_VERSION"))
}
fn default_requests_per_second() -> u32 { 1 }
fn default_geocoder_cache_size() -> u64 { 1000 }

fn default_timeout_secs() -> u64 { 30 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with ALERTS__)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., ALERTS__EMAIL__API_KEY -> email.api_key
            .add_source(env_source())
            .build()?;

        substitute_env_vars(settings)?.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(env_source())
            .build()?;

        substitute_env_vars(settings)?.try_deserialize()
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("ALERTS")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// Fill secrets from their conventional variable names when the prefixed ones are unset
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let fallbacks = [
        ("email.api_key", "ALERTS__EMAIL__API_KEY", "RESEND_API_KEY"),
        ("classifier.api_key", "ALERTS__CLASSIFIER__API_KEY", "GEMINI_API_KEY"),
        (
            "notifications.public_base_url",
            "ALERTS__NOTIFICATIONS__PUBLIC_BASE_URL",
            "PUBLIC_BASE_URL",
        ),
    ];

    let mut builder = Config::builder().add_source(settings);

    for (key, prefixed, conventional) in fallbacks {
        if env::var(prefixed).is_ok() {
            continue;
        }
        if let Ok(value) = env::var(conventional) {
            builder = builder.set_override(key, value)?;
        }
    }

    builder.build()
}
