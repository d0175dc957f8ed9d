//! Runtime configuration read from the environment
use crate::error::{AmqpError, Result};
use std::path::PathBuf;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 5672;
pub const DEFAULT_USER: &str = "guest";
pub const DEFAULT_PASSWORD: &str = "guest";
pub const DEFAULT_SRC_FOLDER: &str = "./usage_example/images/src/";
pub const DEFAULT_OUT_FOLDER: &str = "./usage_example/images/out/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Broker hostname
    pub host: String,
    /// Broker AMQP port
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Directory scanned for input file names
    pub src_folder: PathBuf,
    /// Directory used to build output paths; never created or checked
    pub out_folder: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            user: DEFAULT_USER.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            src_folder: PathBuf::from(DEFAULT_SRC_FOLDER),
            out_folder: PathBuf::from(DEFAULT_OUT_FOLDER),
        }
    }
}

impl Config {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Unset variables fall back to the defaults; only `RABBITMQ_PORT` can
    /// fail, when it is not a valid port number.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match lookup("RABBITMQ_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| {
                AmqpError::ConfigError(format!("RABBITMQ_PORT '{}' is not a valid port: {}", raw, e))
            })?,
            None => defaults.port,
        };

        Ok(Self {
            host: lookup("RABBITMQ_HOST").unwrap_or(defaults.host),
            port,
            user: lookup("RABBITMQ_USER").unwrap_or(defaults.user),
            password: lookup("RABBITMQ_PASSWORD").unwrap_or(defaults.password),
            src_folder: lookup("PICTURAS_SRC_FOLDER")
                .map(PathBuf::from)
                .unwrap_or(defaults.src_folder),
            out_folder: lookup("PICTURAS_OUT_FOLDER")
                .map(PathBuf::from)
                .unwrap_or(defaults.out_folder),
        })
    }

    /// AMQP URI on the default virtual host
    pub fn amqp_uri(&self) -> String {
        format!(
            "amqp://{}:{}@{}:{}/%2f",
            self.user, self.password, self.host, self.port
        )
    }
}
