use config::ConfigError;
use serde::Deserialize;

use crate::auth::PasswordHasher;

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    #[serde(default)]
    pub password: PasswordSettings,
    pub polka: PolkaSettings,
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Development,
    Production,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    pub platform: Platform,
    /// Directory served under `/app/`
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
    /// Keep everything in process memory instead of Postgres
    #[serde(default)]
    pub in_memory: bool,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }
}

/// JWT authentication settings
#[derive(Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_expiry: i64,  // seconds (3600 = 1 hour)
    pub refresh_token_expiry: i64, // seconds (5184000 = 60 days)
    #[serde(default = "default_issuer")]
    pub issuer: String,
}

impl JwtSettings {
    /// Longest accepted token lifetime, ten years in seconds.
    pub const MAX_EXPIRY_SECONDS: i64 = 315_360_000;
}

impl std::fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret", &"<redacted>")
            .field("access_token_expiry", &self.access_token_expiry)
            .field("refresh_token_expiry", &self.refresh_token_expiry)
            .field("issuer", &self.issuer)
            .finish()
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct PasswordSettings {
    pub cost: u32,
}

impl Default for PasswordSettings {
    fn default() -> Self {
        Self { cost: 10 }
    }
}

/// Payment provider webhook settings
#[derive(Deserialize, Clone)]
pub struct PolkaSettings {
    pub api_key: String,
}

impl std::fmt::Debug for PolkaSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolkaSettings").field("api_key", &"<redacted>").finish()
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_static_dir() -> String {
    ".".to_string()
}

fn default_issuer() -> String {
    "chirpy".to_string()
}

impl Settings {
    /// Reject settings the server cannot run safely with.
    pub fn validate(&self) -> Result<(), crate::error::ConfigError> {
        use crate::error::ConfigError::{InvalidValue, MissingRequired};

        if self.jwt.secret.is_empty() {
            return Err(MissingRequired("jwt.secret".to_string()));
        }
        for (name, seconds) in [
            ("jwt.access_token_expiry", self.jwt.access_token_expiry),
            ("jwt.refresh_token_expiry", self.jwt.refresh_token_expiry),
        ] {
            if !(1..=JwtSettings::MAX_EXPIRY_SECONDS).contains(&seconds) {
                return Err(InvalidValue(format!(
                    "{} must be between 1 and {} seconds",
                    name,
                    JwtSettings::MAX_EXPIRY_SECONDS
                )));
            }
        }
        if !(PasswordHasher::MIN_COST..=PasswordHasher::MAX_COST).contains(&self.password.cost) {
            return Err(InvalidValue(format!(
                "password.cost must be between {} and {}",
                PasswordHasher::MIN_COST,
                PasswordHasher::MAX_COST
            )));
        }
        if self.polka.api_key.is_empty() {
            return Err(MissingRequired("polka.api_key".to_string()));
        }
        Ok(())
    }
}

/// Load `configuration.yaml` (if present), then `APP_`-prefixed environment
/// variables on top, e.g. `APP_JWT__SECRET`.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    settings.try_deserialize::<Settings>()
}
