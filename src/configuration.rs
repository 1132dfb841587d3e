use crate::error::ConfigError;

const MIN_RECOMMENDED_SECRET_BYTES: usize = 32;
// One year
const MAX_TOKEN_LIFETIME_SECONDS: i64 = 365 * 24 * 60 * 60;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

impl ApplicationSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
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
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
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
/// The secret is read once at startup and never changes afterwards;
/// changing it invalidates every token issued before.
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    // Absent means empty; `validate` reports it
    #[serde(default)]
    pub secret: String,
    pub access_token_expiry: i64,   // seconds (e.g., 900 for 15 minutes)
    pub refresh_token_expiry: i64,  // seconds (e.g., 604800 for 7 days)
    pub issuer: String,
}

impl JwtSettings {
    /// Check the settings before a token codec is built from them
    ///
    /// # Errors
    /// - `MissingRequired` if the secret is empty
    /// - `InvalidValue` if a lifetime is not positive or longer than a year,
    ///   or the refresh token would not outlive the access token
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("jwt.secret".to_string()));
        }

        if self.secret.len() < MIN_RECOMMENDED_SECRET_BYTES {
            tracing::warn!(
                length = self.secret.len(),
                "JWT secret is shorter than {} bytes",
                MIN_RECOMMENDED_SECRET_BYTES
            );
        }

        if self.access_token_expiry <= 0 {
            return Err(ConfigError::InvalidValue(
                "jwt.access_token_expiry must be positive".to_string(),
            ));
        }

        if self.refresh_token_expiry > MAX_TOKEN_LIFETIME_SECONDS {
            return Err(ConfigError::InvalidValue(format!(
                "jwt.refresh_token_expiry must not exceed {} seconds",
                MAX_TOKEN_LIFETIME_SECONDS
            )));
        }

        if self.refresh_token_expiry <= self.access_token_expiry {
            return Err(ConfigError::InvalidValue(
                "jwt.refresh_token_expiry must be longer than jwt.access_token_expiry".to_string(),
            ));
        }

        if self.issuer.trim().is_empty() {
            return Err(ConfigError::MissingRequired("jwt.issuer".to_string()));
        }

        Ok(())
    }
}

/// Load settings from `configuration.yaml` (optional), then `APP_*` environment
/// variables (`APP_JWT__SECRET`, `APP_DATABASE__HOST`, ...), then `SIGNING_SECRET`.
pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .set_override_option("jwt.secret", std::env::var("SIGNING_SECRET").ok())?
        .build()?;
    settings.try_deserialize::<Settings>()
}
