pub mod core;
pub mod manager;
pub mod stub;

pub use core::{
    config::ManagerConfig,
    errors::{ErrorCategory, ManagerError},
    kernel::{SessionState, TcpTransport},
    retcode::ResultCode,
    traits::ManagerProtocol,
    types::*,
};
pub use manager::{ManagerBuilder, ManagerClient};
