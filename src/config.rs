use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Environment keys, checked in order, that may hold the API key.
const API_KEY_VARS: [&str; 2] = ["GOOGLE_API_KEY", "Google_api_key"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing API key: set GOOGLE_API_KEY in the environment or in .env")]
    MissingApiKey,

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Process-wide settings, read once at startup.
#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub max_upload_bytes: usize,
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => log::debug!("Loaded secrets from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => log::warn!("Ignoring unreadable .env file: {e}"),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = API_KEY_VARS
            .into_iter()
            .find_map(|key| get(key))
            .ok_or(ConfigError::MissingApiKey)?;

        let timeout = match get("GEMINI_TIMEOUT_SECS") {
            // a zero timeout would fail every remote call
            Some(value) => match parse("GEMINI_TIMEOUT_SECS", value.clone())? {
                0 => {
                    return Err(ConfigError::InvalidValue {
                        key: "GEMINI_TIMEOUT_SECS",
                        value,
                    });
                }
                secs => Duration::from_secs(secs),
            },
            None => DEFAULT_TIMEOUT,
        };
        let max_upload_bytes = match get("LENS_MAX_UPLOAD_BYTES") {
            Some(value) => parse("LENS_MAX_UPLOAD_BYTES", value)?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            api_key: api_key.trim().to_string(),
            model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: get("GEMINI_API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout,
            max_upload_bytes,
        })
    }

    /// Overrides the model name, e.g. from a command-line flag.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })
}
