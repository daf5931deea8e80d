use crate::auth::DEFAULT_HASH_COST;
use crate::error::{AppError, ConfigError};

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
    #[serde(default)]
    pub hashing: HashingSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "{}/{}",
            self.connection_string_without_db(),
            self.database_name
        )
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// Token signing settings
///
/// Access and refresh tokens are signed with separate secrets so that a leaked
/// access secret cannot be used to mint refresh tokens, and vice versa.
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub access_secret: String,
    pub refresh_secret: String,
    #[serde(default = "default_access_expiry")]
    pub access_token_expiry: i64, // seconds (900 = 15 minutes)
    #[serde(default = "default_refresh_expiry")]
    pub refresh_token_expiry: i64, // seconds (604800 = 7 days)
}

impl JwtSettings {
    /// Reject secrets that would let one token kind stand in for the other.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_secret.is_empty() || self.refresh_secret.is_empty() {
            return Err(ConfigError::InvalidValue(
                "jwt secrets must not be empty".to_string(),
            ));
        }
        if self.access_secret == self.refresh_secret {
            return Err(ConfigError::InvalidValue(
                "jwt access_secret and refresh_secret must differ".to_string(),
            ));
        }
        if self.access_token_expiry <= 0 || self.refresh_token_expiry <= 0 {
            return Err(ConfigError::InvalidValue(
                "jwt token expiries must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct HashingSettings {
    pub cost: u32,
}

impl HashingSettings {
    /// bcrypt accepts work factors 4 through 31.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_HASH_COST..=MAX_HASH_COST).contains(&self.cost) {
            return Err(ConfigError::InvalidValue(format!(
                "hashing cost must be between {} and {}, got {}",
                MIN_HASH_COST, MAX_HASH_COST, self.cost
            )));
        }
        Ok(())
    }
}

impl Default for HashingSettings {
    fn default() -> Self {
        Self {
            cost: DEFAULT_HASH_COST,
        }
    }
}

const MIN_HASH_COST: u32 = 4;
const MAX_HASH_COST: u32 = 31;

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_access_expiry() -> i64 {
    900
}

fn default_refresh_expiry() -> i64 {
    604_800
}

/// Load settings from `configuration.{yaml,toml,json}` and `APP_*` environment
/// variables (nested keys separated by `__`, e.g. `APP_JWT__ACCESS_SECRET`).
pub fn get_configuration() -> Result<Settings, AppError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    let settings = settings.try_deserialize::<Settings>()?;
    settings.validate()?;
    Ok(settings)
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.jwt.validate()?;
        self.hashing.validate()
    }
}
