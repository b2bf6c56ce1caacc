use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use chrono::{FixedOffset, Offset, Utc};

use crate::protocol::evaluation::{ProtocolConfig, ProtocolEngine, RulesError};
use crate::protocol::status::DEFAULT_EDIT_WINDOW;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub protocol: ProtocolSettings,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            protocol: ProtocolSettings::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

pub const DEFAULT_CLINICAL_OFFSET: &str = "-03:00";

/// Clinical timezone, edit window, and rule-table source.
#[derive(Debug, Clone)]
pub struct ProtocolSettings {
    pub clinical_offset: FixedOffset,
    pub edit_window: usize,
    pub rules_path: Option<PathBuf>,
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        Self {
            clinical_offset: FixedOffset::west_opt(3 * 3600).unwrap_or_else(|| Utc.fix()),
            edit_window: DEFAULT_EDIT_WINDOW,
            rules_path: None,
        }
    }
}

impl ProtocolSettings {
    fn from_env() -> Result<Self, ConfigError> {
        let offset_value = env::var("CLINICAL_UTC_OFFSET")
            .unwrap_or_else(|_| DEFAULT_CLINICAL_OFFSET.to_string());
        let clinical_offset = parse_utc_offset(&offset_value)
            .ok_or(ConfigError::InvalidUtcOffset { value: offset_value })?;

        let edit_window = match env::var("MEASURE_EDIT_WINDOW") {
            Ok(value) => match value.trim().parse::<usize>() {
                Ok(window) if window > 0 => window,
                _ => return Err(ConfigError::InvalidEditWindow { value }),
            },
            Err(_) => DEFAULT_EDIT_WINDOW,
        };

        let rules_path = env::var("PROTOCOL_RULES_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            clinical_offset,
            edit_window,
            rules_path,
        })
    }

    /// Built-in tables, or the JSON file at `rules_path`. Both are validated.
    pub fn load_rules(&self) -> Result<ProtocolConfig, ConfigError> {
        let rules = match &self.rules_path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| {
                    ConfigError::RulesIo {
                        path: path.clone(),
                        source,
                    }
                })?;
                serde_json::from_str::<ProtocolConfig>(&raw).map_err(|source| {
                    ConfigError::RulesFormat {
                        path: path.clone(),
                        source,
                    }
                })?
            }
            None => ProtocolConfig::default(),
        };

        rules.validate().map_err(ConfigError::InvalidRules)?;
        Ok(rules)
    }

    pub fn engine(&self) -> Result<ProtocolEngine, ConfigError> {
        Ok(ProtocolEngine::new(self.load_rules()?, self.clinical_offset))
    }
}

/// Accepts `Z`, `±HH`, `±HHMM`, and `±HH:MM`.
pub fn parse_utc_offset(value: &str) -> Option<FixedOffset> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match value.as_bytes().first()? {
        b'+' => (1, &value[1..]),
        b'-' => (-1, &value[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    if hours > 14 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost {
        source: std::net::AddrParseError,
    },
    InvalidUtcOffset {
        value: String,
    },
    InvalidEditWindow {
        value: String,
    },
    RulesIo {
        path: PathBuf,
        source: std::io::Error,
    },
    RulesFormat {
        path: PathBuf,
        source: serde_json::Error,
    },
    InvalidRules(RulesError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidUtcOffset { value } => write!(
                f,
                "CLINICAL_UTC_OFFSET must look like -03:00, found '{}'",
                value
            ),
            ConfigError::InvalidEditWindow { value } => write!(
                f,
                "MEASURE_EDIT_WINDOW must be a positive integer, found '{}'",
                value
            ),
            ConfigError::RulesIo { path, .. } => {
                write!(f, "failed to read protocol rules from {}", path.display())
            }
            ConfigError::RulesFormat { path, .. } => {
                write!(f, "protocol rules in {} are not valid JSON", path.display())
            }
            ConfigError::InvalidRules(err) => write!(f, "invalid protocol rules: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort
            | ConfigError::InvalidUtcOffset { .. }
            | ConfigError::InvalidEditWindow { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::RulesIo { source, .. } => Some(source),
            ConfigError::RulesFormat { source, .. } => Some(source),
            ConfigError::InvalidRules(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("CLINICAL_UTC_OFFSET");
        env::remove_var("MEASURE_EDIT_WINDOW");
        env::remove_var("PROTOCOL_RULES_PATH");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(
            config.protocol.clinical_offset,
            FixedOffset::west_opt(3 * 3600).expect("valid offset")
        );
        assert_eq!(config.protocol.edit_window, 2);
        assert!(config.protocol.rules_path.is_none());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn rejects_zero_edit_window() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("MEASURE_EDIT_WINDOW", "0");
        let err = AppConfig::load().expect_err("zero window rejected");
        assert!(matches!(err, ConfigError::InvalidEditWindow { .. }));
        reset_env();
    }

    #[test]
    fn reads_custom_offset() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("CLINICAL_UTC_OFFSET", "-04:00");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(
            config.protocol.clinical_offset,
            FixedOffset::west_opt(4 * 3600).expect("valid offset")
        );
        reset_env();
    }

    #[test]
    fn parses_offset_variants() {
        assert_eq!(parse_utc_offset("Z"), FixedOffset::east_opt(0));
        assert_eq!(parse_utc_offset("+0530"), FixedOffset::east_opt(5 * 3600 + 1800));
        assert_eq!(parse_utc_offset("-03"), FixedOffset::west_opt(3 * 3600));
        assert_eq!(parse_utc_offset("03:00"), None);
        assert_eq!(parse_utc_offset("-3:00"), None);
        assert_eq!(parse_utc_offset("+25:00"), None);
    }

    #[test]
    fn missing_rules_file_is_reported() {
        let settings = ProtocolSettings {
            rules_path: Some(PathBuf::from("/nonexistent/protocol-rules.json")),
            ..ProtocolSettings::default()
        };
        assert!(matches!(
            settings.load_rules(),
            Err(ConfigError::RulesIo { .. })
        ));
    }

    #[test]
    fn rules_file_round_trips_default_tables() {
        let path = env::temp_dir().join(format!("ed-saturation-rules-{}.json", std::process::id()));
        let json = serde_json::to_string(&ProtocolConfig::default()).expect("serializes");
        std::fs::write(&path, json).expect("writes rules file");

        let settings = ProtocolSettings {
            rules_path: Some(path.clone()),
            ..ProtocolSettings::default()
        };
        let loaded = settings.load_rules().expect("rules load");
        assert_eq!(loaded, ProtocolConfig::default());
        let _ = std::fs::remove_file(path);
    }
}
