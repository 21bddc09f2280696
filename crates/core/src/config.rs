use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_RETRY_COUNT: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

pub const DEFAULT_COOKIE_NAME: &str = "cf_router_origin";
pub const DEFAULT_COOKIE_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

pub const AUTHORIZATION: &str = "Authorization";
pub const X_AUTH_KEY: &str = "X-Auth-Key";
pub const X_AUTH_EMAIL: &str = "X-Auth-Email";

/// Credentials and tunables for talking to the Cloudflare API.
///
/// Build it once with [`Configuration::configure`] and hand it to the clients.
/// Credentials are not checked until a request actually needs headers, so a
/// half-filled configuration can be passed around freely.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub api_token: Option<String>,
    pub api_key: Option<String>,
    pub api_email: Option<String>,
    pub zone_id: Option<String>,
    pub account_id: Option<String>,
    /// Total request timeout
    pub timeout: Duration,
    /// Connection establishment timeout
    pub open_timeout: Duration,
    /// Retries after the first attempt, for timeouts and refused connections only
    pub retry_count: u32,
    /// Delay before the first retry; doubles on each following one
    pub retry_delay: Duration,
    pub cookie: CookieSettings,
}

/// Settings for the routing cookie that steers visitors between origins
#[derive(Debug, Clone, PartialEq)]
pub struct CookieSettings {
    pub name: String,
    pub ttl: Duration,
    pub domain: Option<String>,
    /// Origin that receives traffic when the cookie says "marketing"
    pub marketing_origin: Option<String>,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.to_string(),
            ttl: DEFAULT_COOKIE_TTL,
            domain: None,
            marketing_origin: None,
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            api_token: None,
            api_key: None,
            api_email: None,
            zone_id: None,
            account_id: None,
            timeout: DEFAULT_TIMEOUT,
            open_timeout: DEFAULT_OPEN_TIMEOUT,
            retry_count: DEFAULT_RETRY_COUNT,
            retry_delay: DEFAULT_RETRY_DELAY,
            cookie: CookieSettings::default(),
        }
    }
}

impl Configuration {
    /// Start from defaults and run a one-time setup callback
    ///
    /// ```
    /// use route_kit_core::Configuration;
    ///
    /// let config = Configuration::configure(|c| {
    ///     c.api_token = Some("token".to_string());
    ///     c.zone_id = Some("zone".to_string());
    /// });
    /// assert!(config.credentials_configured());
    /// ```
    pub fn configure<F>(setup: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        setup(&mut config);
        config
    }

    /// Restore every field to its default
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// True when a token, or both key and email, are set
    pub fn credentials_configured(&self) -> bool {
        present(&self.api_token).is_some()
            || (present(&self.api_key).is_some() && present(&self.api_email).is_some())
    }

    /// Authentication headers for the active auth mode.
    ///
    /// A bearer token wins over key/email when both are set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] naming the missing credential when
    /// neither mode is complete.
    pub fn auth_headers(&self) -> Result<BTreeMap<&'static str, String>> {
        let mut headers = BTreeMap::new();

        if let Some(token) = present(&self.api_token) {
            headers.insert(AUTHORIZATION, format!("Bearer {}", token));
            return Ok(headers);
        }

        match (present(&self.api_key), present(&self.api_email)) {
            (Some(key), Some(email)) => {
                headers.insert(X_AUTH_KEY, key.to_string());
                headers.insert(X_AUTH_EMAIL, email.to_string());
                Ok(headers)
            }
            (Some(_), None) => Err(Error::Configuration(
                "Cloudflare credentials not configured: api_email is missing (api_key requires api_email)"
                    .to_string(),
            )),
            (None, Some(_)) => Err(Error::Configuration(
                "Cloudflare credentials not configured: api_key is missing (api_email requires api_key)"
                    .to_string(),
            )),
            (None, None) => Err(Error::Configuration(
                "Cloudflare credentials not configured. Set either api_token or both api_key and api_email."
                    .to_string(),
            )),
        }
    }

    /// Build a configuration from the first source that supplies settings.
    ///
    /// Sources are tried in order; once one applies, the rest are skipped.
    /// With no applicable source the result is the default configuration.
    pub fn from_sources(sources: &[&dyn CredentialSource]) -> Result<Self> {
        let mut config = Self::default();
        for source in sources {
            if source.apply(&mut config)? {
                tracing::debug!(source = source.name(), "Loaded configuration");
                break;
            }
        }
        Ok(config)
    }

    /// Render as the TOML layout accepted by [`parse_config_toml`]
    pub fn to_toml(&self) -> Result<String> {
        let raw = RawConfig::from(self);
        Ok(toml::to_string_pretty(&raw)?)
    }
}

/// Borrow a setting only when it holds a non-empty value
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

// ============================================================================
// Credential sources
// ============================================================================

/// Something that can fill in a [`Configuration`] at startup.
pub trait CredentialSource: Send + Sync {
    /// Short label for logs
    fn name(&self) -> &'static str;

    /// Apply settings; returns `false` when this source has nothing to offer
    fn apply(&self, config: &mut Configuration) -> Result<bool>;
}

/// TOML configuration file, skipped when the file doesn't exist
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialSource for FileSource {
    fn name(&self) -> &'static str {
        "file"
    }

    fn apply(&self, config: &mut Configuration) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        let content = fs::read_to_string(&self.path)?;
        let raw: RawConfig = toml::from_str(&content)?;
        raw.apply_to(config)?;
        Ok(true)
    }
}

pub const ENV_API_TOKEN: &str = "CLOUDFLARE_API_TOKEN";
pub const ENV_API_KEY: &str = "CLOUDFLARE_API_KEY";
pub const ENV_API_EMAIL: &str = "CLOUDFLARE_API_EMAIL";
pub const ENV_ZONE_ID: &str = "CLOUDFLARE_ZONE_ID";
pub const ENV_ACCOUNT_ID: &str = "CLOUDFLARE_ACCOUNT_ID";

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// `CLOUDFLARE_*` environment variables.
///
/// Only applies when a token or an API key is present, so a stray zone id in
/// the environment doesn't shadow a later source.
pub struct EnvSource {
    lookup: Lookup,
}

impl EnvSource {
    /// Read from the process environment
    pub fn new() -> Self {
        Self::with_lookup(|key| std::env::var(key).ok())
    }

    /// Read through a custom lookup, e.g. a map in tests
    pub fn with_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            lookup: Box::new(lookup),
        }
    }

    fn var(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.is_empty())
    }
}

impl Default for EnvSource {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EnvSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvSource").finish_non_exhaustive()
    }
}

impl CredentialSource for EnvSource {
    fn name(&self) -> &'static str {
        "environment"
    }

    fn apply(&self, config: &mut Configuration) -> Result<bool> {
        let api_token = self.var(ENV_API_TOKEN);
        let api_key = self.var(ENV_API_KEY);
        if api_token.is_none() && api_key.is_none() {
            return Ok(false);
        }

        config.api_token = api_token;
        config.api_key = api_key;
        config.api_email = self.var(ENV_API_EMAIL);
        config.zone_id = self.var(ENV_ZONE_ID);
        config.account_id = self.var(ENV_ACCOUNT_ID);
        Ok(true)
    }
}

// ============================================================================
// TOML file layout
// ============================================================================

/// Raw TOML structure; durations are whole seconds
#[derive(Debug, Default, Serialize, Deserialize)]
struct RawConfig {
    #[serde(default)]
    cloudflare: RawCloudflare,
    #[serde(default)]
    http: RawHttp,
    #[serde(default)]
    cookie: RawCookie,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawCloudflare {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    zone_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    account_id: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawHttp {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    open_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    retry_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    retry_delay: Option<u64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawCookie {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ttl: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    marketing_origin: Option<String>,
}

impl RawConfig {
    fn apply_to(self, config: &mut Configuration) -> Result<()> {
        let RawConfig {
            cloudflare,
            http,
            cookie,
        } = self;

        config.api_token = cloudflare.api_token.or(config.api_token.take());
        config.api_key = cloudflare.api_key.or(config.api_key.take());
        config.api_email = cloudflare.api_email.or(config.api_email.take());
        config.zone_id = cloudflare.zone_id.or(config.zone_id.take());
        config.account_id = cloudflare.account_id.or(config.account_id.take());

        if let Some(secs) = http.timeout {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = http.open_timeout {
            config.open_timeout = Duration::from_secs(secs);
        }
        if let Some(count) = http.retry_count {
            config.retry_count = count;
        }
        if let Some(secs) = http.retry_delay {
            config.retry_delay = Duration::from_secs(secs);
        }

        if let Some(name) = cookie.name {
            if name.trim().is_empty() {
                return Err(Error::ConfigFile("cookie.name must not be empty".to_string()));
            }
            config.cookie.name = name;
        }
        if let Some(secs) = cookie.ttl {
            config.cookie.ttl = Duration::from_secs(secs);
        }
        if cookie.domain.is_some() {
            config.cookie.domain = cookie.domain;
        }
        if cookie.marketing_origin.is_some() {
            config.cookie.marketing_origin = cookie.marketing_origin;
        }

        Ok(())
    }
}

impl From<&Configuration> for RawConfig {
    fn from(config: &Configuration) -> Self {
        Self {
            cloudflare: RawCloudflare {
                api_token: config.api_token.clone(),
                api_key: config.api_key.clone(),
                api_email: config.api_email.clone(),
                zone_id: config.zone_id.clone(),
                account_id: config.account_id.clone(),
            },
            http: RawHttp {
                timeout: Some(config.timeout.as_secs()),
                open_timeout: Some(config.open_timeout.as_secs()),
                retry_count: Some(config.retry_count),
                retry_delay: Some(config.retry_delay.as_secs()),
            },
            cookie: RawCookie {
                name: Some(config.cookie.name.clone()),
                ttl: Some(config.cookie.ttl.as_secs()),
                domain: config.cookie.domain.clone(),
                marketing_origin: config.cookie.marketing_origin.clone(),
            },
        }
    }
}

/// Parse a configuration file
pub fn parse_config_toml<P: AsRef<Path>>(path: P) -> Result<Configuration> {
    let content = fs::read_to_string(path)?;
    parse_config_toml_str(&content)
}

/// Parse configuration from a string (useful for testing)
pub fn parse_config_toml_str(content: &str) -> Result<Configuration> {
    let raw: RawConfig = toml::from_str(content)?;
    let mut config = Configuration::default();
    raw.apply_to(&mut config)?;
    Ok(config)
}
