use secrecy::Secret;
use service_core::config::{self as core_config, get_env, get_env_parsed, get_optional_env};
use service_core::error::AppError;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEV_SESSION_SECRET: &str = "dev_secret_key_change_in_production";

/// Default JSON body limit; base64 inflates images by a third.
const DEFAULT_MAX_REQUEST_BYTES: usize = 25 * 1024 * 1024;

/// Upper bound for one request, provider round trip included.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 180;

/// How long in-flight requests may drain after shutdown is requested.
const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct StudioConfig {
    pub common: core_config::Config,
    pub google: GoogleConfig,
    pub models: ModelConfig,
    pub storage: StorageConfig,
    pub housekeeping: HousekeepingConfig,
    pub session_secret: Secret<String>,
    pub max_request_bytes: usize,
    pub server: ServerConfig,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub request_timeout_secs: u64,
    /// After this window open connections are dropped and the server returns.
    pub shutdown_grace_secs: u64,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.request_timeout_secs == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "REQUEST_TIMEOUT_SECS must be greater than zero"
            )));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            shutdown_grace_secs: DEFAULT_SHUTDOWN_GRACE_SECS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// `None` leaves the provider uninitialized; every AI endpoint then
    /// answers "client not initialized".
    pub api_key: Option<Secret<String>>,
    pub api_base: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Vision model used for analysis and segmentation (e.g., gemini-1.5-flash)
    pub analysis_model: String,
    /// Model that can return inline image data (generation, editing, composition)
    pub image_model: String,
    /// Chat model used when the caller asks for one outside the allow-list
    pub default_chat_model: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub generated_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct HousekeepingConfig {
    pub enabled: bool,
    pub cleanup_interval_secs: u64,
    /// Files younger than this survive a sweep, so a write in flight is never
    /// deleted underneath its request.
    pub cleanup_grace_secs: u64,
    pub restart_interval_secs: u64,
}

impl HousekeepingConfig {
    /// Zero periods would make the timers spin.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.enabled && (self.cleanup_interval_secs == 0 || self.restart_interval_secs == 0) {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "CLEANUP_INTERVAL_SECS and RESTART_INTERVAL_SECS must be greater than zero"
            )));
        }
        Ok(())
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    pub fn cleanup_grace(&self) -> Duration {
        Duration::from_secs(self.cleanup_grace_secs)
    }

    pub fn restart_interval(&self) -> Duration {
        Duration::from_secs(self.restart_interval_secs)
    }
}

impl Default for HousekeepingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cleanup_interval_secs: 300,
            cleanup_grace_secs: 60,
            restart_interval_secs: 24 * 60 * 60,
        }
    }
}

impl StudioConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = core_config::is_production();
        let defaults = HousekeepingConfig::default();

        let config = StudioConfig {
            common: common_config,
            google: GoogleConfig {
                api_key: get_optional_env("GOOGLE_API_KEY").map(Secret::new),
                api_base: get_env("GEMINI_API_BASE", Some(DEFAULT_GEMINI_API_BASE), false)?,
                timeout_secs: get_env_parsed("GEMINI_TIMEOUT_SECS", 120)?,
            },
            models: ModelConfig {
                analysis_model: get_env("GEMINI_ANALYSIS_MODEL", Some("gemini-1.5-flash"), false)?,
                image_model: get_env(
                    "GEMINI_IMAGE_MODEL",
                    Some("gemini-2.0-flash-preview-image-generation"),
                    false,
                )?,
                default_chat_model: get_env(
                    "GEMINI_DEFAULT_CHAT_MODEL",
                    Some(crate::catalog::DEFAULT_CHAT_MODEL),
                    false,
                )?,
            },
            storage: StorageConfig {
                generated_dir: PathBuf::from(get_env(
                    "GENERATED_IMAGES_DIR",
                    Some("static/generated_images"),
                    false,
                )?),
            },
            housekeeping: HousekeepingConfig {
                enabled: get_env_parsed("HOUSEKEEPING_ENABLED", defaults.enabled)?,
                cleanup_interval_secs: get_env_parsed(
                    "CLEANUP_INTERVAL_SECS",
                    defaults.cleanup_interval_secs,
                )?,
                cleanup_grace_secs: get_env_parsed("CLEANUP_GRACE_SECS", defaults.cleanup_grace_secs)?,
                restart_interval_secs: get_env_parsed(
                    "RESTART_INTERVAL_SECS",
                    defaults.restart_interval_secs,
                )?,
            },
            session_secret: Secret::new(get_env(
                "SESSION_SECRET",
                Some(DEV_SESSION_SECRET),
                is_prod,
            )?),
            max_request_bytes: get_env_parsed("MAX_REQUEST_BYTES", DEFAULT_MAX_REQUEST_BYTES)?,
            server: ServerConfig {
                request_timeout_secs: get_env_parsed(
                    "REQUEST_TIMEOUT_SECS",
                    DEFAULT_REQUEST_TIMEOUT_SECS,
                )?,
                shutdown_grace_secs: get_env_parsed(
                    "SHUTDOWN_GRACE_SECS",
                    DEFAULT_SHUTDOWN_GRACE_SECS,
                )?,
            },
            otlp_endpoint: get_optional_env("OTLP_ENDPOINT"),
        };
        config.housekeeping.validate()?;
        config.server.validate()?;
        Ok(config)
    }

    /// True when the session secret is still the development placeholder.
    pub fn uses_dev_session_secret(&self) -> bool {
        use secrecy::ExposeSecret;
        self.session_secret.expose_secret() == DEV_SESSION_SECRET
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.google.timeout_secs)
    }
}
