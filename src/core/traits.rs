use crate::core::{
    kernel::{KeyMaterial, Session},
    retcode::{ProtocolResult, ResultCode},
    types::{BalanceAction, Login, OrderRecord, Ticket, UserRecord},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::time::Duration;

/// Web API protocol version announced during authentication
pub const WEB_API_VERSION: u32 = 2190;

/// Network connection underneath a session
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the connection, returning `ResultCode::Ok` on success
    async fn open(
        &mut self,
        address: &str,
        port: u16,
        timeout: Duration,
        encrypted: bool,
    ) -> ResultCode;

    /// Close the connection; closing a closed transport does nothing
    async fn close(&mut self);

    /// Seed the cipher state with the handshake material and the password
    fn set_session_key(&mut self, material: &KeyMaterial, password: &str);

    fn is_open(&self) -> bool;

    fn is_encrypted(&self) -> bool;
}

/// Who is logging in, sent along with the credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub agent: String,
    pub version: u32,
}

impl ClientIdentity {
    pub fn new(agent: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            version: WEB_API_VERSION,
        }
    }
}

/// Login/password handshake over an opened transport
#[async_trait]
pub trait AuthNegotiator: Send {
    /// Authenticate the manager; returns key material when encryption was requested
    async fn authenticate(
        &mut self,
        login: Login,
        password: &str,
        encrypted: bool,
    ) -> ProtocolResult<Option<KeyMaterial>>;
}

/// Account management round trips
#[async_trait]
pub trait UserProtocol: Send {
    /// Create an account; the returned record carries the assigned login
    async fn add(&mut self, record: &UserRecord) -> ProtocolResult<UserRecord>;

    /// Logins in groups matching `group` (wildcards such as `demo\*` allowed)
    async fn logins(&mut self, group: &str) -> ProtocolResult<Vec<Login>>;

    async fn get(&mut self, login: Login) -> ProtocolResult<UserRecord>;

    async fn delete(&mut self, login: Login) -> ProtocolResult<()>;

    async fn update(&mut self, record: &UserRecord) -> ProtocolResult<UserRecord>;
}

/// Balance-affecting deals
#[async_trait]
pub trait TradeProtocol: Send {
    /// Conduct a balance operation; the ticket is absent when the server does not report one
    async fn balance(
        &mut self,
        login: Login,
        action: BalanceAction,
        amount: Decimal,
        comment: &str,
    ) -> ProtocolResult<Option<Ticket>>;
}

/// Open orders
#[async_trait]
pub trait OrderProtocol: Send {
    async fn get(&mut self, ticket: Ticket) -> ProtocolResult<OrderRecord>;

    async fn total(&mut self, login: Login) -> ProtocolResult<u32>;

    async fn page(
        &mut self,
        login: Login,
        offset: u32,
        total: u32,
    ) -> ProtocolResult<Vec<OrderRecord>>;
}

/// Closed orders within a time range
#[async_trait]
pub trait HistoryProtocol: Send {
    async fn total(
        &mut self,
        login: Login,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ProtocolResult<u32>;

    async fn page(
        &mut self,
        login: Login,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        offset: u32,
        total: u32,
    ) -> ProtocolResult<Vec<OrderRecord>>;
}

/// Protocol library seam used by the manager client
///
/// Supplies fresh transports and builds the auth negotiator and each domain
/// adapter bound to the transport or live session they must talk over.
pub trait ManagerProtocol: Send + Sync {
    type Transport: Transport;

    /// A new, unopened transport
    fn transport(&self) -> Self::Transport;

    fn auth<'a>(
        &'a self,
        transport: &'a mut Self::Transport,
        client: &'a ClientIdentity,
    ) -> Box<dyn AuthNegotiator + 'a>;

    fn users<'a>(&'a self, session: &'a mut Session<Self::Transport>) -> Box<dyn UserProtocol + 'a>;

    fn trades<'a>(
        &'a self,
        session: &'a mut Session<Self::Transport>,
    ) -> Box<dyn TradeProtocol + 'a>;

    fn orders<'a>(
        &'a self,
        session: &'a mut Session<Self::Transport>,
    ) -> Box<dyn OrderProtocol + 'a>;

    fn history<'a>(
        &'a self,
        session: &'a mut Session<Self::Transport>,
    ) -> Box<dyn HistoryProtocol + 'a>;
}
