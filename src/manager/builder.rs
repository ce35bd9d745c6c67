use crate::core::config::{duration_millis, ManagerConfig};
use crate::core::errors::ManagerError;
use crate::core::logging;
use crate::core::traits::ManagerProtocol;
use crate::manager::ManagerClient;
use std::time::Duration;

/// Assembles a [`ManagerClient`] from settings and a protocol implementation
///
/// Building never touches the network; the session is opened by the first
/// operation or an explicit `connect`.
pub struct ManagerBuilder {
    config: ManagerConfig,
    logging: bool,
}

impl ManagerBuilder {
    pub fn new(
        server: impl Into<String>,
        port: u16,
        login: u64,
        password: impl Into<String>,
    ) -> Self {
        Self::from_config(ManagerConfig::new(server, port, login, password.into()))
    }

    pub const fn from_config(config: ManagerConfig) -> Self {
        Self {
            config,
            logging: false,
        }
    }

    /// Builder seeded from `{PREFIX}_*` environment variables
    pub fn from_env(prefix: &str) -> Result<Self, ManagerError> {
        Ok(Self::from_config(ManagerConfig::from_env(prefix)?))
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.config = self.config.debug(debug);
        self
    }

    #[must_use]
    pub fn with_crypt(mut self, crypt: bool) -> Self {
        self.config = self.config.crypt(crypt);
        self
    }

    #[must_use]
    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.config = self.config.agent(agent);
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.connect_timeout_ms(duration_millis(timeout));
        self
    }

    /// Install a global tracing subscriber at build time, at DEBUG level when `debug` is set
    #[must_use]
    pub const fn with_logging(mut self, enabled: bool) -> Self {
        self.logging = enabled;
        self
    }

    pub const fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn build<P: ManagerProtocol>(self, protocol: P) -> ManagerClient<P> {
        if self.logging {
            logging::init(self.config.debug);
        }
        ManagerClient::new(self.config, protocol)
    }
}

/// Create a client straight from environment variables
pub fn build_from_env<P: ManagerProtocol>(
    prefix: &str,
    protocol: P,
) -> Result<ManagerClient<P>, ManagerError> {
    Ok(ManagerBuilder::from_env(prefix)?.build(protocol))
}
