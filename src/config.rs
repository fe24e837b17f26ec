use std::env;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-7-sonnet-20250219";
const DEFAULT_CATEGORIES: &[&str] = &["drivers_licence", "bank_statement", "invoice"];
const DEFAULT_UNKNOWN_LABEL: &str = "unknown file";
const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[
    "pdf", "png", "jpg", "jpeg", "gif", "bmp", "tiff", "tif", "webp", "eml", "txt",
];

/// Runtime configuration for the Rusty Classify server.
#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the Anthropic Messages API. Classification fails per file when absent.
    pub anthropic_api_key: Option<String>,
    /// Base URL of the Anthropic API (overridable for proxies and tests).
    pub anthropic_base_url: String,
    /// Model identifier sent with every classification request.
    pub anthropic_model: String,
    /// Per-call timeout applied to the HTTP client, in seconds.
    pub anthropic_timeout_secs: u64,
    /// Allowed category labels, lower-cased.
    pub categories: Vec<String>,
    /// Label reported when a file matches none of the categories.
    pub unknown_label: String,
    /// Maximum number of documents submitted in one remote call.
    pub batch_size: usize,
    /// Response length ceiling passed as `max_tokens`.
    pub max_tokens: u32,
    /// Number of characters of a text file sent to the model.
    pub text_truncation_chars: usize,
    /// Number of batches of one group allowed in flight at once.
    pub max_concurrent_batches: usize,
    /// Maximum number of files accepted in a single upload request.
    pub max_files_per_request: usize,
    /// Lower-cased file extensions accepted by the upload surface.
    pub allowed_extensions: Vec<String>,
    /// Maximum accepted multipart body size, in bytes.
    pub max_upload_bytes: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let categories = load_env_optional("CLASSIFIER_CATEGORIES")
            .map(|value| parse_list(&value))
            .unwrap_or_else(|| to_owned_list(DEFAULT_CATEGORIES));
        if categories.is_empty() {
            return Err(ConfigError::InvalidValue("CLASSIFIER_CATEGORIES".into()));
        }

        let batch_size = load_parsed("CLASSIFIER_BATCH_SIZE", 5_usize)?;
        if batch_size == 0 {
            return Err(ConfigError::InvalidValue("CLASSIFIER_BATCH_SIZE".into()));
        }

        let max_concurrent_batches = load_parsed("CLASSIFIER_MAX_CONCURRENT_BATCHES", 1_usize)?;
        if max_concurrent_batches == 0 {
            return Err(ConfigError::InvalidValue(
                "CLASSIFIER_MAX_CONCURRENT_BATCHES".into(),
            ));
        }

        Ok(Self {
            anthropic_api_key: load_env_optional("ANTHROPIC_API_KEY"),
            anthropic_base_url: load_env_optional("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            anthropic_model: load_env_optional("ANTHROPIC_MODEL")
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            anthropic_timeout_secs: load_parsed("ANTHROPIC_TIMEOUT_SECS", 60_u64)?,
            categories,
            unknown_label: load_env_optional("CLASSIFIER_UNKNOWN_LABEL")
                .map(|value| value.trim().to_lowercase())
                .unwrap_or_else(|| DEFAULT_UNKNOWN_LABEL.to_string()),
            batch_size,
            max_tokens: load_parsed("CLASSIFIER_MAX_TOKENS", 1024_u32)?,
            text_truncation_chars: load_parsed("CLASSIFIER_TEXT_TRUNCATION_CHARS", 10_000_usize)?,
            max_concurrent_batches,
            max_files_per_request: load_parsed("MAX_FILES_PER_REQUEST", 100_usize)?,
            allowed_extensions: load_env_optional("ALLOWED_EXTENSIONS")
                .map(|value| parse_list(&value))
                .unwrap_or_else(|| to_owned_list(DEFAULT_ALLOWED_EXTENSIONS)),
            max_upload_bytes: load_parsed("MAX_UPLOAD_BYTES", 100 * 1024 * 1024_usize)?,
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            anthropic_api_key: None,
            anthropic_base_url: DEFAULT_BASE_URL.to_string(),
            anthropic_model: DEFAULT_MODEL.to_string(),
            anthropic_timeout_secs: 60,
            categories: to_owned_list(DEFAULT_CATEGORIES),
            unknown_label: DEFAULT_UNKNOWN_LABEL.to_string(),
            batch_size: 5,
            max_tokens: 1024,
            text_truncation_chars: 10_000,
            max_concurrent_batches: 1,
            max_files_per_request: 100,
            allowed_extensions: to_owned_list(DEFAULT_ALLOWED_EXTENSIONS),
            max_upload_bytes: 100 * 1024 * 1024,
            server_port: None,
        }
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_parsed<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
        .map(|value| value.unwrap_or(default))
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim().trim_start_matches('.').to_lowercase())
        .filter(|item| !item.is_empty())
        .collect()
}

fn to_owned_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_string()).collect()
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        base_url = %config.anthropic_base_url,
        model = %config.anthropic_model,
        has_api_key = config.anthropic_api_key.is_some(),
        categories = ?config.categories,
        batch_size = config.batch_size,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const CLASSIFIER_VARS: &[&str] = &[
        "CLASSIFIER_CATEGORIES",
        "CLASSIFIER_UNKNOWN_LABEL",
        "CLASSIFIER_BATCH_SIZE",
        "CLASSIFIER_MAX_CONCURRENT_BATCHES",
        "CLASSIFIER_MAX_TOKENS",
        "MAX_FILES_PER_REQUEST",
    ];

    /// Load configuration with `vars` set, clearing the classifier variables before and after.
    fn from_env_with(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // SAFETY: Environment mutation is serialized by ENV_LOCK and no other test in this
        // binary reads these variables.
        unsafe {
            for key in CLASSIFIER_VARS {
                std::env::remove_var(key);
            }
            for (key, value) in vars {
                std::env::set_var(key, value);
            }
        }
        let loaded = Config::from_env();
        unsafe {
            for (key, _) in vars {
                std::env::remove_var(key);
            }
        }
        loaded
    }

    fn invalid_key(result: Result<Config, ConfigError>) -> String {
        match result {
            Err(ConfigError::InvalidValue(key)) => key,
            Ok(config) => panic!("expected an invalid value, got {config:?}"),
        }
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let result = from_env_with(&[("CLASSIFIER_BATCH_SIZE", "0")]);
        assert_eq!(invalid_key(result), "CLASSIFIER_BATCH_SIZE");
    }

    #[test]
    fn zero_concurrent_batches_is_rejected() {
        let result = from_env_with(&[("CLASSIFIER_MAX_CONCURRENT_BATCHES", "0")]);
        assert_eq!(invalid_key(result), "CLASSIFIER_MAX_CONCURRENT_BATCHES");
    }

    #[test]
    fn non_numeric_value_is_rejected() {
        let result = from_env_with(&[("CLASSIFIER_MAX_TOKENS", "plenty")]);
        assert_eq!(invalid_key(result), "CLASSIFIER_MAX_TOKENS");
    }

    #[test]
    fn empty_category_list_is_rejected() {
        let result = from_env_with(&[("CLASSIFIER_CATEGORIES", " , ,")]);
        assert_eq!(invalid_key(result), "CLASSIFIER_CATEGORIES");
    }

    #[test]
    fn categories_and_limits_are_read_from_the_environment() {
        let config = from_env_with(&[
            ("CLASSIFIER_CATEGORIES", "Passport, Payslip"),
            ("CLASSIFIER_UNKNOWN_LABEL", " Other "),
            ("CLASSIFIER_BATCH_SIZE", "3"),
            ("CLASSIFIER_MAX_CONCURRENT_BATCHES", "4"),
            ("MAX_FILES_PER_REQUEST", "7"),
        ])
        .expect("valid configuration");

        assert_eq!(config.categories, vec!["passport", "payslip"]);
        assert_eq!(config.unknown_label, "other");
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.max_concurrent_batches, 4);
        assert_eq!(config.max_files_per_request, 7);
    }

    #[test]
    fn unset_variables_fall_back_to_defaults() {
        let config = from_env_with(&[]).expect("valid configuration");
        let defaults = Config::default();

        assert_eq!(config.categories, defaults.categories);
        assert_eq!(config.unknown_label, defaults.unknown_label);
        assert_eq!(config.batch_size, defaults.batch_size);
        assert_eq!(config.max_concurrent_batches, defaults.max_concurrent_batches);
    }

    #[test]
    fn parse_list_normalizes_entries() {
        assert_eq!(
            parse_list(" Invoice, .PDF ,, bank_statement "),
            vec!["invoice", "pdf", "bank_statement"]
        );
    }

    #[test]
    fn default_config_matches_documented_values() {
        let config = Config::default();
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.max_tokens, 1024);
        assert_eq!(config.text_truncation_chars, 10_000);
        assert_eq!(config.max_files_per_request, 100);
        assert_eq!(config.unknown_label, "unknown file");
        assert!(config.allowed_extensions.contains(&"eml".to_string()));
        assert!(config.anthropic_api_key.is_none());
    }
}
