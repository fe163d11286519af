use std::{
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use crate::{TrackerError, DEFAULT_DISPLAY_TICK_MS, DEFAULT_NOISE_FLOOR_MILES, DEFAULT_PURPOSE};

pub const CONFIG_FILE: &str = "mileage.conf";
pub const DEFAULT_API_BASE_URL: &str = "https://schirmer-s-notary-backend.onrender.com";
pub const DEFAULT_USER_ID: &str = "1";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub api_base_url: String,
    pub user_id: String,

    pub noise_floor_miles: f64,
    pub display_tick_ms: u64,
    pub default_purpose: String,

    pub request_timeout_secs: u64,
    pub log_file: Option<PathBuf>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            user_id: DEFAULT_USER_ID.to_string(),
            noise_floor_miles: DEFAULT_NOISE_FLOOR_MILES,
            display_tick_ms: DEFAULT_DISPLAY_TICK_MS,
            default_purpose: DEFAULT_PURPOSE.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            log_file: None,
        }
    }
}

impl Configuration {
    /// Parses `key = value` lines. Blank lines and `#` comments are skipped,
    /// unknown keys are logged and ignored. Missing keys keep their defaults.
    pub fn parse(text: &str) -> Result<Self, TrackerError> {
        let mut config = Self::default();

        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(TrackerError::Config(format!("Line {} is not a key = value pair", number + 1)));
            };
            let (key, value) = (key.trim(), value.trim());

            match key {
                "api_base_url" => config.api_base_url = value.trim_end_matches('/').to_string(),
                "user_id" => config.user_id = value.to_string(),
                "noise_floor_miles" => config.noise_floor_miles = parse_value(key, value)?,
                "display_tick_ms" => config.display_tick_ms = parse_value(key, value)?,
                "default_purpose" => config.default_purpose = value.to_string(),
                "request_timeout_secs" => config.request_timeout_secs = parse_value(key, value)?,
                "log_file" => config.log_file = (!value.is_empty()).then(|| PathBuf::from(value)),
                _ => {
                    tracing::warn!("Unknown config key: {}", key);
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, TrackerError> {
        let text = std::fs::read_to_string(path)
            .map_err(|_| TrackerError::Config(format!("Failed to read config file: {:?}", path)))?;
        Self::parse(&text)
    }

    /// Loads `mileage.conf` from the project root, falling back to defaults if there is none.
    pub fn load_default() -> Result<Self, TrackerError> {
        let Ok(root) = project_root::get_project_root() else {
            return Ok(Self::default());
        };

        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            tracing::debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        Self::load(&path)
    }

    pub fn display_tick(&self) -> Duration {
        Duration::from_millis(self.display_tick_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn validate(&self) -> Result<(), TrackerError> {
        if self.api_base_url.is_empty() {
            return Err(TrackerError::Config("api_base_url must not be empty".to_string()));
        }
        if !self.noise_floor_miles.is_finite() || self.noise_floor_miles < 0. {
            return Err(TrackerError::Config("noise_floor_miles must be a non-negative number".to_string()));
        }
        if self.display_tick_ms == 0 {
            return Err(TrackerError::Config("display_tick_ms must be positive".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(TrackerError::Config("request_timeout_secs must be positive".to_string()));
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, TrackerError> {
    value
        .parse()
        .map_err(|_| TrackerError::Config(format!("Invalid value for {key}: '{value}'")))
}
