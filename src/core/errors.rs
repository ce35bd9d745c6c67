use crate::core::retcode::{ProtocolResult, ResultCode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManagerError {
    /// The session could not be established before the operation ran
    #[error("Connection error: {0}")]
    Connection(ResultCode),

    /// A balance operation was rejected on a live session
    #[error("Trade error: {0}")]
    Trade(ResultCode),

    /// An account, order or history request was rejected on a live session
    #[error("User error: {0}")]
    User(ResultCode),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::core::config::ConfigError),
}

/// Which typed error wraps a failed result code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Connection,
    Trade,
    User,
}

impl ErrorCategory {
    /// Wrap a failure code in the error of this category
    pub const fn translate(self, code: ResultCode) -> ManagerError {
        match self {
            Self::Connection => ManagerError::Connection(code),
            Self::Trade => ManagerError::Trade(code),
            Self::User => ManagerError::User(code),
        }
    }
}

impl ManagerError {
    /// Result code behind the failure, if it came from the protocol
    pub const fn code(&self) -> Option<ResultCode> {
        match self {
            Self::Connection(code) | Self::Trade(code) | Self::User(code) => Some(*code),
            Self::ConfigError(_) => None,
        }
    }

    pub const fn category(&self) -> Option<ErrorCategory> {
        match self {
            Self::Connection(_) => Some(ErrorCategory::Connection),
            Self::Trade(_) => Some(ErrorCategory::Trade),
            Self::User(_) => Some(ErrorCategory::User),
            Self::ConfigError(_) => None,
        }
    }

    /// Human-readable description carried by the error
    pub fn description(&self) -> String {
        match self {
            Self::Connection(code) | Self::Trade(code) | Self::User(code) => {
                code.description().to_string()
            }
            Self::ConfigError(e) => e.to_string(),
        }
    }

    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

/// Maps protocol results onto the manager error taxonomy
pub trait ResultExt<T> {
    fn or_category(self, category: ErrorCategory) -> Result<T, ManagerError>;

    fn or_connection(self) -> Result<T, ManagerError>
    where
        Self: Sized,
    {
        self.or_category(ErrorCategory::Connection)
    }

    fn or_trade(self) -> Result<T, ManagerError>
    where
        Self: Sized,
    {
        self.or_category(ErrorCategory::Trade)
    }

    fn or_user(self) -> Result<T, ManagerError>
    where
        Self: Sized,
    {
        self.or_category(ErrorCategory::User)
    }
}

impl<T> ResultExt<T> for ProtocolResult<T> {
    fn or_category(self, category: ErrorCategory) -> Result<T, ManagerError> {
        self.map_err(|code| category.translate(code))
    }
}
