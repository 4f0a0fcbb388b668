use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

pub static CONFIG: OnceCell<Config> = OnceCell::new();

const CONFIG_FILENAME: &str = "config.toml";
const DB_FILENAME: &str = "tathya.db";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    const HOST: &str = "127.0.0.1";
    const PORT: u16 = 8660;

    fn default() -> Self {
        ServerConfig {
            host: Self::HOST.to_string(),
            port: Self::PORT,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DatabaseConfig {
    /// Directory holding the database file, uploads and logs.
    /// An empty value means "use the platform data directory".
    pub data_dir: String,
}

impl DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            data_dir: String::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuthConfig {
    pub session_timeout_mins: u32,
}

impl AuthConfig {
    const SESSION_TIMEOUT_MINS: u32 = 480;

    fn default() -> Self {
        AuthConfig {
            session_timeout_mins: Self::SESSION_TIMEOUT_MINS,
        }
    }

    fn ensure_valid(&mut self) {
        if self.session_timeout_mins == 0 {
            eprintln!(
                "Config error: session_timeout_mins of 0 is invalid - using default of {}",
                Self::SESSION_TIMEOUT_MINS
            );
            self.session_timeout_mins = Self::SESSION_TIMEOUT_MINS;
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UploadsConfig {
    pub max_size_mb: u32,
}

impl UploadsConfig {
    const MAX_SIZE_MB: u32 = 25;

    fn default() -> Self {
        UploadsConfig {
            max_size_mb: Self::MAX_SIZE_MB,
        }
    }

    fn ensure_valid(&mut self) {
        if self.max_size_mb == 0 {
            eprintln!(
                "Config error: max_size_mb of 0 is invalid - using default of {}",
                Self::MAX_SIZE_MB
            );
            self.max_size_mb = Self::MAX_SIZE_MB;
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoggingConfig {
    pub tathya: String,
    pub axum: String,
}

impl LoggingConfig {
    const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
    const TATHYA_LEVEL: &str = "info";
    const AXUM_LEVEL: &str = "warn";

    fn default() -> Self {
        LoggingConfig {
            tathya: Self::TATHYA_LEVEL.to_string(),
            axum: Self::AXUM_LEVEL.to_string(),
        }
    }

    fn ensure_valid(&mut self) {
        // Ensure that specified log levels are valid. If this list grows, we'll make a function to call for each
        // For now:
        //      trim and lowercase the string
        //      confirm that it's a valid log level. if not:
        //          - inform the user
        //          - use the default

        let mut str_original = self.tathya.clone();
        self.tathya = self.tathya.trim().to_ascii_lowercase();
        if !Self::LOG_LEVELS.contains(&self.tathya.as_str()) {
            eprintln!(
                "Config error: tathya log level of '{}' is invalid - using default of '{}'",
                str_original,
                Self::TATHYA_LEVEL
            );
            self.tathya = Self::TATHYA_LEVEL.to_owned();
        }

        str_original = self.axum.clone();
        self.axum = self.axum.trim().to_ascii_lowercase();
        if !Self::LOG_LEVELS.contains(&self.axum.as_str()) {
            eprintln!(
                "Config error: axum log level of '{}' is invalid - using default of '{}'",
                str_original,
                Self::AXUM_LEVEL
            );
            self.axum = Self::AXUM_LEVEL.to_owned();
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub uploads: UploadsConfig,
    pub logging: LoggingConfig,
}

impl Config {
    fn default() -> Self {
        Config {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            uploads: UploadsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Loads the configuration from a TOML file located in the app's data directory.
    /// If the file is missing or fails to parse, defaults are used.
    /// Additionally, writes the default config to disk if no file exists.
    pub fn load_config(project_dirs: &ProjectDirs) -> Self {
        let config_path = project_dirs.data_local_dir().join(CONFIG_FILENAME);

        // If the config file doesn't exist, write the default configuration to disk.
        if !config_path.exists() {
            if let Some(parent) = config_path.parent() {
                if let Err(e) = fs::create_dir_all(parent) {
                    eprintln!(
                        "Failed to create configuration directory {}: {}",
                        parent.display(),
                        e
                    );
                }
            }
            if let Ok(toml_string) = toml::to_string_pretty(&Config::default()) {
                if let Err(e) = fs::write(&config_path, toml_string) {
                    eprintln!(
                        "Failed to write default config to {}: {}",
                        config_path.display(),
                        e
                    );
                }
            } else {
                eprintln!("Failed to serialize default config.");
            }
        }

        let mut config = Self::load_from(&config_path);

        // Resolve an unset data_dir to the platform data directory so the rest
        // of the app never has to consult ProjectDirs again
        if config.database.data_dir.trim().is_empty() {
            config.database.data_dir = project_dirs.data_local_dir().to_string_lossy().to_string();
        }

        config
    }

    /// Builds the effective configuration from defaults, the TOML file (if present),
    /// and `TATHYA_*` environment overrides (e.g. `TATHYA_SERVER__PORT=9000`).
    pub fn load_from(config_path: &Path) -> Self {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("TATHYA_").split("__"));

        // Attempt to extract the configuration; on error, log a message and fall back to defaults.
        let mut config = figment.extract().unwrap_or_else(|err| {
            eprintln!(
                "Could not load config file {}: {}. Using default configuration.",
                config_path.display(),
                err
            );
            Config::default()
        });

        config.ensure_valid();

        config
    }

    fn ensure_valid(&mut self) {
        self.auth.ensure_valid();
        self.uploads.ensure_valid();
        self.logging.ensure_valid();
    }

    // ------------------------------------------------------------------
    // Static accessors over the global CONFIG cell. Callers before
    // initialization (and unit tests) get defaults rather than a panic.
    // ------------------------------------------------------------------

    /// A copy of the effective configuration.
    pub fn current() -> Config {
        CONFIG.get().cloned().unwrap_or_else(Config::default)
    }

    pub fn get_server_host() -> String {
        CONFIG
            .get()
            .map(|c| c.server.host.clone())
            .unwrap_or_else(|| ServerConfig::HOST.to_string())
    }

    pub fn get_server_port() -> u16 {
        CONFIG.get().map(|c| c.server.port).unwrap_or(ServerConfig::PORT)
    }

    pub fn get_data_dir() -> PathBuf {
        CONFIG
            .get()
            .map(|c| PathBuf::from(&c.database.data_dir))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn get_db_path() -> PathBuf {
        Self::get_data_dir().join(DB_FILENAME)
    }

    pub fn get_uploads_dir() -> PathBuf {
        Self::get_data_dir().join("uploads")
    }

    pub fn get_logs_dir() -> PathBuf {
        Self::get_data_dir().join("logs")
    }

    pub fn get_session_timeout_mins() -> u32 {
        CONFIG
            .get()
            .map(|c| c.auth.session_timeout_mins)
            .unwrap_or(AuthConfig::SESSION_TIMEOUT_MINS)
    }

    pub fn get_max_upload_bytes() -> usize {
        let mb = CONFIG
            .get()
            .map(|c| c.uploads.max_size_mb)
            .unwrap_or(UploadsConfig::MAX_SIZE_MB);
        (mb as usize) * 1024 * 1024
    }

    /// Builds the flexi_logger specification string from the configured levels.
    pub fn log_spec(&self) -> String {
        format!("warn, tathya={}, axum={}", self.logging.tathya, self.logging.axum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults_are_valid() {
        let mut config = Config::default();
        config.ensure_valid();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8660);
        assert_eq!(config.auth.session_timeout_mins, 480);
        assert_eq!(config.uploads.max_size_mb, 25);
        assert_eq!(config.logging.tathya, "info");
    }

    #[test]
    fn test_invalid_log_level_falls_back_to_default() {
        let mut logging = LoggingConfig {
            tathya: "chatty".to_string(),
            axum: "  DEBUG ".to_string(),
        };
        logging.ensure_valid();

        assert_eq!(logging.tathya, "info");
        assert_eq!(logging.axum, "debug"); // trimmed and lowercased, not replaced
    }

    #[test]
    fn test_zero_timeout_and_upload_fall_back() {
        let mut auth = AuthConfig {
            session_timeout_mins: 0,
        };
        auth.ensure_valid();
        assert_eq!(auth.session_timeout_mins, 480);

        let mut uploads = UploadsConfig { max_size_mb: 0 };
        uploads.ensure_valid();
        assert_eq!(uploads.max_size_mb, 25);
    }

    #[test]
    fn test_log_spec_format() {
        let config = Config::default();
        assert_eq!(config.log_spec(), "warn, tathya=info, axum=warn");
    }

    #[test]
    #[serial]
    fn test_load_from_merges_file_over_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                [server]
                host = "0.0.0.0"
                port = 9000

                [auth]
                session_timeout_mins = 30
                "#,
            )?;

            let config = Config::load_from(Path::new("config.toml"));
            assert_eq!(config.server.host, "0.0.0.0");
            assert_eq!(config.server.port, 9000);
            assert_eq!(config.auth.session_timeout_mins, 30);
            // Untouched sections keep their defaults
            assert_eq!(config.uploads.max_size_mb, 25);
            Ok(())
        });
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                [server]
                port = 9000
                "#,
            )?;
            jail.set_env("TATHYA_SERVER__PORT", "9443");

            let config = Config::load_from(Path::new("config.toml"));
            assert_eq!(config.server.port, 9443);
            Ok(())
        });
    }
}
