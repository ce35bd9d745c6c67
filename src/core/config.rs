use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::env;
use std::time::Duration;

/// Agent name announced to the server during authentication
pub const DEFAULT_AGENT: &str = "WebAPI";

/// Connect timeout used when none is configured
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 3000;

/// Connection settings and manager credentials, fixed for a client's lifetime
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub server: String,
    pub port: u16,
    pub login: u64,
    pub password: Secret<String>,
    pub debug: bool,
    /// Negotiate an encrypted session after authentication
    pub crypt: bool,
    pub agent: String,
    pub connect_timeout_ms: u64,
}

// Custom Serialize implementation - never expose the password in serialization
impl Serialize for ManagerConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("ManagerConfig", 8)?;
        state.serialize_field("server", &self.server)?;
        state.serialize_field("port", &self.port)?;
        state.serialize_field("login", &self.login)?;
        state.serialize_field("password", "[REDACTED]")?;
        state.serialize_field("debug", &self.debug)?;
        state.serialize_field("crypt", &self.crypt)?;
        state.serialize_field("agent", &self.agent)?;
        state.serialize_field("connect_timeout_ms", &self.connect_timeout_ms)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for ManagerConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ManagerConfigHelper {
            server: String,
            port: u16,
            login: u64,
            password: String,
            #[serde(default)]
            debug: bool,
            #[serde(default = "default_crypt")]
            crypt: bool,
            #[serde(default = "default_agent")]
            agent: String,
            #[serde(default = "default_timeout")]
            connect_timeout_ms: u64,
        }

        let helper = ManagerConfigHelper::deserialize(deserializer)?;
        Ok(Self {
            server: helper.server,
            port: helper.port,
            login: helper.login,
            password: Secret::new(helper.password),
            debug: helper.debug,
            crypt: helper.crypt,
            agent: helper.agent,
            connect_timeout_ms: helper.connect_timeout_ms,
        })
    }
}

const fn default_crypt() -> bool {
    true
}

fn default_agent() -> String {
    DEFAULT_AGENT.to_string()
}

const fn default_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

impl ManagerConfig {
    /// Create a configuration with encryption on, the default agent and a 3s connect timeout
    pub fn new(server: impl Into<String>, port: u16, login: u64, password: String) -> Self {
        Self {
            server: server.into(),
            port,
            login,
            password: Secret::new(password),
            debug: false,
            crypt: default_crypt(),
            agent: default_agent(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }

    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `{PREFIX}_SERVER`, `{PREFIX}_PORT`, `{PREFIX}_LOGIN`, `{PREFIX}_PASSWORD`
    /// - `{PREFIX}_DEBUG`, `{PREFIX}_CRYPT` (optional booleans)
    /// - `{PREFIX}_AGENT`, `{PREFIX}_TIMEOUT_MS` (optional)
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        let prefix = prefix.to_uppercase();
        let required = |name: &str| {
            let var = format!("{}_{}", prefix, name);
            env::var(&var)
                .map_err(|_| ConfigError::MissingEnvironmentVariable(var))
        };
        let optional = |name: &str| env::var(format!("{}_{}", prefix, name)).ok();

        let server = required("SERVER")?;
        let port = parse_var(&format!("{}_PORT", prefix), &required("PORT")?)?;
        let login = parse_var(&format!("{}_LOGIN", prefix), &required("LOGIN")?)?;
        let password = required("PASSWORD")?;

        let mut config = Self::new(server, port, login, password);
        if let Some(debug) = optional("DEBUG") {
            config.debug = parse_var(&format!("{}_DEBUG", prefix), &debug)?;
        }
        if let Some(crypt) = optional("CRYPT") {
            config.crypt = parse_var(&format!("{}_CRYPT", prefix), &crypt)?;
        }
        if let Some(agent) = optional("AGENT") {
            config.agent = agent;
        }
        if let Some(timeout) = optional("TIMEOUT_MS") {
            config.connect_timeout_ms = parse_var(&format!("{}_TIMEOUT_MS", prefix), &timeout)?;
        }

        Ok(config)
    }

    /// Create configuration from a `.env` file and environment variables
    ///
    /// **Security Warning**: Never commit .env files to version control!
    #[cfg(feature = "env-file")]
    pub fn from_env_file(prefix: &str) -> Result<Self, ConfigError> {
        Self::from_env_file_with_path(prefix, ".env")
    }

    /// Create configuration from a specific .env file path
    #[cfg(feature = "env-file")]
    pub fn from_env_file_with_path(
        prefix: &str,
        env_file_path: &str,
    ) -> Result<Self, ConfigError> {
        match dotenv::from_path(env_file_path) {
            Ok(()) => {}
            Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {
                // no file, fall back to the process environment
            }
            Err(e) => {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "Failed to load .env file '{}': {}",
                    env_file_path, e
                )));
            }
        }

        Self::from_env(prefix)
    }

    #[must_use]
    pub const fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub const fn crypt(mut self, crypt: bool) -> Self {
        self.crypt = crypt;
        self
    }

    #[must_use]
    pub fn agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = agent.into();
        self
    }

    #[must_use]
    pub const fn connect_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.connect_timeout_ms = timeout_ms;
        self
    }

    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Get the manager password (use carefully - exposes secret)
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`
pub(crate) fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| {
            ConfigError::InvalidConfiguration(format!("{} has invalid value '{}'", name, value))
        })
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}
