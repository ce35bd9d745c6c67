//! In-memory manager protocol for testing.
//!
//! [`StubServer`] plays the remote side: it keeps accounts, open orders and
//! order history in memory, answers every adapter call, and records each
//! transport, auth and domain call so tests can assert on the exact sequence
//! the client produced. Failures are injected per stage.
//!
//! ```rust
//! use mt5api::{ManagerBuilder, stub::StubServer};
//!
//! # async fn example() {
//! let server = StubServer::new();
//! let mut client = ManagerBuilder::new("stub", 443, 1000, "pw").build(server.protocol());
//! let logins = client.user_logins("demo\\*").await;
//! assert!(logins.is_ok());
//! # }
//! ```

use crate::core::{
    kernel::{KeyMaterial, Session, SessionKey},
    retcode::{ProtocolResult, ResultCode},
    traits::{
        AuthNegotiator, ClientIdentity, HistoryProtocol, ManagerProtocol, OrderProtocol,
        TradeProtocol, Transport, UserProtocol,
    },
    types::{BalanceAction, Login, OrderRecord, Ticket, UserRecord},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::RngCore;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

/// First login handed out when none is configured
pub const DEFAULT_FIRST_LOGIN: Login = 100_000;

const KEY_MATERIAL_LEN: usize = 16;

/// One call observed by the stub, in the order the client made it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StubCall {
    Open {
        address: String,
        port: u16,
        encrypted: bool,
    },
    Close,
    SetSessionKey,
    Authenticate {
        login: Login,
        agent: String,
        version: u32,
        encrypted: bool,
    },
    UserAdd {
        group: String,
    },
    UserLogins {
        group: String,
    },
    UserGet(Login),
    UserDelete(Login),
    UserUpdate(Login),
    Balance {
        login: Login,
        action: BalanceAction,
        amount: Decimal,
    },
    OrderGet(Ticket),
    OrderTotal(Login),
    OrderPage {
        login: Login,
        offset: u32,
        total: u32,
    },
    HistoryTotal(Login),
    HistoryPage {
        login: Login,
        offset: u32,
        total: u32,
    },
}

impl StubCall {
    /// Whether the call went through a domain adapter rather than the session setup
    pub const fn is_domain(&self) -> bool {
        !matches!(
            self,
            Self::Open { .. } | Self::Close | Self::SetSessionKey | Self::Authenticate { .. }
        )
    }
}

#[derive(Debug)]
struct StubState {
    calls: Vec<StubCall>,
    users: BTreeMap<Login, UserRecord>,
    next_login: Login,
    next_ticket: Ticket,
    orders: Vec<OrderRecord>,
    history: Vec<OrderRecord>,
    credentials: Option<(Login, String)>,
    open_result: ResultCode,
    auth_result: ResultCode,
    withhold_key_material: bool,
    withhold_ticket: bool,
    fail_next: Option<ResultCode>,
}

impl Default for StubState {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            users: BTreeMap::new(),
            next_login: DEFAULT_FIRST_LOGIN,
            next_ticket: 1,
            orders: Vec::new(),
            history: Vec::new(),
            credentials: None,
            open_result: ResultCode::Ok,
            auth_result: ResultCode::Ok,
            withhold_key_material: false,
            withhold_ticket: false,
            fail_next: None,
        }
    }
}

impl StubState {
    fn take_failure(&mut self) -> ProtocolResult<()> {
        match self.fail_next.take() {
            Some(code) => Err(code),
            None => Ok(()),
        }
    }

    fn allocate_login(&mut self) -> Login {
        while self.users.contains_key(&self.next_login) {
            self.next_login += 1;
        }
        let login = self.next_login;
        self.next_login += 1;
        login
    }

    fn allocate_ticket(&mut self) -> Ticket {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        ticket
    }
}

/// Shared handle to the in-memory server
///
/// Clones share state, so a test can keep one handle for inspection while
/// the client owns the protocol built from another.
#[derive(Debug, Clone, Default)]
pub struct StubServer {
    state: Arc<Mutex<StubState>>,
}

impl StubServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Protocol stack backed by this server
    pub fn protocol(&self) -> StubProtocol {
        StubProtocol {
            server: self.clone(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every transport open return `code`
    pub fn set_open_result(&self, code: ResultCode) {
        self.lock().open_result = code;
    }

    /// Make every authentication attempt fail with `code` (`Ok` restores success)
    pub fn set_auth_result(&self, code: ResultCode) {
        self.lock().auth_result = code;
    }

    /// Only accept this manager login and password; anything else is an invalid account
    pub fn require_credentials(&self, login: Login, password: impl Into<String>) {
        self.lock().credentials = Some((login, password.into()));
    }

    /// Authenticate successfully but return no key material for encrypted sessions
    pub fn set_withhold_key_material(&self, withhold: bool) {
        self.lock().withhold_key_material = withhold;
    }

    /// Accept balance operations without reporting a ticket
    pub fn set_withhold_ticket(&self, withhold: bool) {
        self.lock().withhold_ticket = withhold;
    }

    /// Fail the next domain call with `code`
    pub fn fail_next(&self, code: ResultCode) {
        self.lock().fail_next = Some(code);
    }

    /// Login the next created account receives
    pub fn set_next_login(&self, login: Login) {
        self.lock().next_login = login;
    }

    /// Seed an account directly, bypassing the client; returns its login
    pub fn insert_user(&self, mut record: UserRecord) -> Login {
        let mut state = self.lock();
        let login = match record.login {
            Some(login) => login,
            None => state.allocate_login(),
        };
        record.login = Some(login);
        state.users.insert(login, record);
        login
    }

    pub fn user(&self, login: Login) -> Option<UserRecord> {
        self.lock().users.get(&login).cloned()
    }

    pub fn add_order(&self, order: OrderRecord) {
        self.lock().orders.push(order);
    }

    pub fn add_history(&self, order: OrderRecord) {
        self.lock().history.push(order);
    }

    /// Every recorded call, oldest first
    pub fn calls(&self) -> Vec<StubCall> {
        self.lock().calls.clone()
    }

    pub fn domain_calls(&self) -> Vec<StubCall> {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.is_domain())
            .cloned()
            .collect()
    }

    /// Number of transports opened so far
    pub fn open_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| matches!(call, StubCall::Open { .. }))
            .count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn record(&self, call: StubCall) {
        debug!(?call, "stub call");
        self.lock().calls.push(call);
    }

    /// Record a domain call, then check the session and any injected failure
    fn begin(
        &self,
        session: &Session<StubTransport>,
        call: StubCall,
    ) -> ProtocolResult<MutexGuard<'_, StubState>> {
        self.record(call);
        if !session.transport().is_open() {
            return Err(ResultCode::ErrConnection);
        }
        let mut state = self.lock();
        state.take_failure()?;
        Ok(state)
    }
}

/// Transport that only tracks its own open/encrypted state
#[derive(Debug)]
pub struct StubTransport {
    server: StubServer,
    open: bool,
    encrypted: bool,
    session_key: Option<SessionKey>,
}

impl StubTransport {
    fn new(server: StubServer) -> Self {
        Self {
            server,
            open: false,
            encrypted: false,
            session_key: None,
        }
    }

    pub const fn session_key(&self) -> Option<&SessionKey> {
        self.session_key.as_ref()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn open(
        &mut self,
        address: &str,
        port: u16,
        _timeout: Duration,
        encrypted: bool,
    ) -> ResultCode {
        self.server.record(StubCall::Open {
            address: address.to_string(),
            port,
            encrypted,
        });
        let code = self.server.lock().open_result;
        if code.is_ok() {
            self.open = true;
            self.encrypted = encrypted;
        }
        code
    }

    async fn close(&mut self) {
        self.server.record(StubCall::Close);
        self.open = false;
        self.session_key = None;
    }

    fn set_session_key(&mut self, material: &KeyMaterial, password: &str) {
        self.server.record(StubCall::SetSessionKey);
        self.session_key = Some(SessionKey::derive(material, password));
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn is_encrypted(&self) -> bool {
        self.open && self.encrypted
    }
}

/// [`ManagerProtocol`] over a [`StubServer`]
#[derive(Debug, Clone)]
pub struct StubProtocol {
    server: StubServer,
}

impl StubProtocol {
    pub const fn server(&self) -> &StubServer {
        &self.server
    }
}

impl ManagerProtocol for StubProtocol {
    type Transport = StubTransport;

    fn transport(&self) -> StubTransport {
        StubTransport::new(self.server.clone())
    }

    fn auth<'a>(
        &'a self,
        transport: &'a mut StubTransport,
        client: &'a ClientIdentity,
    ) -> Box<dyn AuthNegotiator + 'a> {
        Box::new(StubAuth {
            server: &self.server,
            transport,
            client,
        })
    }

    fn users<'a>(&'a self, session: &'a mut Session<StubTransport>) -> Box<dyn UserProtocol + 'a> {
        Box::new(StubAdapter {
            server: &self.server,
            session,
        })
    }

    fn trades<'a>(
        &'a self,
        session: &'a mut Session<StubTransport>,
    ) -> Box<dyn TradeProtocol + 'a> {
        Box::new(StubAdapter {
            server: &self.server,
            session,
        })
    }

    fn orders<'a>(
        &'a self,
        session: &'a mut Session<StubTransport>,
    ) -> Box<dyn OrderProtocol + 'a> {
        Box::new(StubAdapter {
            server: &self.server,
            session,
        })
    }

    fn history<'a>(
        &'a self,
        session: &'a mut Session<StubTransport>,
    ) -> Box<dyn HistoryProtocol + 'a> {
        Box::new(StubAdapter {
            server: &self.server,
            session,
        })
    }
}

struct StubAuth<'a> {
    server: &'a StubServer,
    transport: &'a mut StubTransport,
    client: &'a ClientIdentity,
}

#[async_trait]
impl AuthNegotiator for StubAuth<'_> {
    async fn authenticate(
        &mut self,
        login: Login,
        password: &str,
        encrypted: bool,
    ) -> ProtocolResult<Option<KeyMaterial>> {
        self.server.record(StubCall::Authenticate {
            login,
            agent: self.client.agent.clone(),
            version: self.client.version,
            encrypted,
        });
        if !self.transport.is_open() {
            return Err(ResultCode::ErrConnection);
        }

        let state = self.server.lock();
        if !state.auth_result.is_ok() {
            return Err(state.auth_result);
        }
        if let Some((expected_login, expected_password)) = &state.credentials {
            if *expected_login != login || expected_password != password {
                return Err(ResultCode::AuthAccountInvalid);
            }
        }
        if !encrypted || state.withhold_key_material {
            return Ok(None);
        }

        let mut bytes = [0u8; KEY_MATERIAL_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Ok(Some(KeyMaterial::new(bytes.to_vec())))
    }
}

/// Domain adapter bound to one live session for one call
struct StubAdapter<'a> {
    server: &'a StubServer,
    session: &'a mut Session<StubTransport>,
}

#[async_trait]
impl UserProtocol for StubAdapter<'_> {
    async fn add(&mut self, record: &UserRecord) -> ProtocolResult<UserRecord> {
        let mut state = self.server.begin(
            self.session,
            StubCall::UserAdd {
                group: record.group.clone(),
            },
        )?;
        let login = match record.login {
            Some(login) if state.users.contains_key(&login) => {
                return Err(ResultCode::UsrLoginExist);
            }
            Some(login) => login,
            None => state.allocate_login(),
        };

        let mut created = record.clone();
        created.login = Some(login);
        created.registration = Some(Utc::now());
        state.users.insert(login, created.clone());
        Ok(created)
    }

    async fn logins(&mut self, group: &str) -> ProtocolResult<Vec<Login>> {
        let state = self.server.begin(
            self.session,
            StubCall::UserLogins {
                group: group.to_string(),
            },
        )?;
        Ok(state
            .users
            .iter()
            .filter(|(_, user)| group_matches(group, &user.group))
            .map(|(login, _)| *login)
            .collect())
    }

    async fn get(&mut self, login: Login) -> ProtocolResult<UserRecord> {
        let state = self.server.begin(self.session, StubCall::UserGet(login))?;
        state
            .users
            .get(&login)
            .cloned()
            .ok_or(ResultCode::ErrNotFound)
    }

    async fn delete(&mut self, login: Login) -> ProtocolResult<()> {
        let call = StubCall::UserDelete(login);
        let mut state = self.server.begin(self.session, call)?;
        match state.users.remove(&login) {
            Some(_) => Ok(()),
            None => Err(ResultCode::ErrNotFound),
        }
    }

    async fn update(&mut self, record: &UserRecord) -> ProtocolResult<UserRecord> {
        let login = record.login.ok_or(ResultCode::ErrParams)?;
        let call = StubCall::UserUpdate(login);
        let mut state = self.server.begin(self.session, call)?;
        let existing = state.users.get_mut(&login).ok_or(ResultCode::ErrNotFound)?;

        // server-owned fields survive, absent passwords stay unchanged
        existing.group = record.group.clone();
        existing.name = record.name.clone();
        existing.email = record.email.clone();
        existing.address = record.address.clone();
        existing.city = record.city.clone();
        existing.state = record.state.clone();
        existing.country = record.country.clone();
        existing.phone = record.phone.clone();
        existing.zip_code = record.zip_code.clone();
        existing.leverage = record.leverage;
        if record.main_password.is_some() {
            existing.main_password = record.main_password.clone();
        }
        if record.investor_password.is_some() {
            existing.investor_password = record.investor_password.clone();
        }
        if record.phone_password.is_some() {
            existing.phone_password = record.phone_password.clone();
        }
        Ok(existing.clone())
    }
}

#[async_trait]
impl TradeProtocol for StubAdapter<'_> {
    async fn balance(
        &mut self,
        login: Login,
        action: BalanceAction,
        amount: Decimal,
        _comment: &str,
    ) -> ProtocolResult<Option<Ticket>> {
        let mut state = self.server.begin(
            self.session,
            StubCall::Balance {
                login,
                action,
                amount,
            },
        )?;
        let user = state.users.get_mut(&login).ok_or(ResultCode::ErrNotFound)?;
        match action {
            BalanceAction::Credit => user.credit += amount,
            _ => user.balance += amount,
        }

        if state.withhold_ticket {
            return Ok(None);
        }
        Ok(Some(state.allocate_ticket()))
    }
}

#[async_trait]
impl OrderProtocol for StubAdapter<'_> {
    async fn get(&mut self, ticket: Ticket) -> ProtocolResult<OrderRecord> {
        let state = self.server.begin(self.session, StubCall::OrderGet(ticket))?;
        state
            .orders
            .iter()
            .find(|order| order.ticket == ticket)
            .cloned()
            .ok_or(ResultCode::ErrNotFound)
    }

    async fn total(&mut self, login: Login) -> ProtocolResult<u32> {
        let call = StubCall::OrderTotal(login);
        let state = self.server.begin(self.session, call)?;
        let orders = state.orders.iter().filter(|order| order.login == login);
        Ok(count(orders))
    }

    async fn page(
        &mut self,
        login: Login,
        offset: u32,
        total: u32,
    ) -> ProtocolResult<Vec<OrderRecord>> {
        let state = self.server.begin(
            self.session,
            StubCall::OrderPage {
                login,
                offset,
                total,
            },
        )?;
        Ok(page(
            state.orders.iter().filter(|order| order.login == login),
            offset,
            total,
        ))
    }
}

#[async_trait]
impl HistoryProtocol for StubAdapter<'_> {
    async fn total(
        &mut self,
        login: Login,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ProtocolResult<u32> {
        let call = StubCall::HistoryTotal(login);
        let state = self.server.begin(self.session, call)?;
        Ok(count(closed_orders(&state.history, login, from, to)))
    }

    async fn page(
        &mut self,
        login: Login,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        offset: u32,
        total: u32,
    ) -> ProtocolResult<Vec<OrderRecord>> {
        let state = self.server.begin(
            self.session,
            StubCall::HistoryPage {
                login,
                offset,
                total,
            },
        )?;
        Ok(page(
            closed_orders(&state.history, login, from, to),
            offset,
            total,
        ))
    }
}

/// History entries of `login` closed inside `[from, to]`
fn closed_orders<'a>(
    history: &'a [OrderRecord],
    login: Login,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> impl Iterator<Item = &'a OrderRecord> {
    history.iter().filter(move |order| {
        let closed = order.done_time.unwrap_or(order.setup_time);
        order.login == login && closed >= from && closed <= to
    })
}

fn count<'a>(orders: impl Iterator<Item = &'a OrderRecord>) -> u32 {
    u32::try_from(orders.count()).unwrap_or(u32::MAX)
}

fn page<'a>(
    orders: impl Iterator<Item = &'a OrderRecord>,
    offset: u32,
    total: u32,
) -> Vec<OrderRecord> {
    let offset = usize::try_from(offset).unwrap_or(usize::MAX);
    let total = usize::try_from(total).unwrap_or(usize::MAX);
    orders.skip(offset).take(total).cloned().collect()
}

/// Group filter with `*` wildcards; several patterns may be comma separated
fn group_matches(filter: &str, group: &str) -> bool {
    let group = group.to_ascii_lowercase();
    filter
        .split(',')
        .map(|pattern| pattern.trim().to_ascii_lowercase())
        .any(|pattern| wildcard_match(&pattern, &group))
}

fn wildcard_match(pattern: &str, text: &str) -> bool {
    let mut parts = pattern.split('*');
    let head = parts.next().unwrap_or_default();
    let Some(mut rest) = text.strip_prefix(head) else {
        return false;
    };

    let parts: Vec<&str> = parts.collect();
    let Some((tail, middle)) = parts.split_last() else {
        return rest.is_empty();
    };
    for part in middle {
        match rest.find(part) {
            Some(index) => rest = &rest[index + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_wildcards() {
        assert!(group_matches("demo\\*", "demo\\forex"));
        assert!(group_matches("*", "real\\usd"));
        assert!(group_matches("DEMO\\FOREX", "demo\\forex"));
        assert!(group_matches("demo\\*,real\\*", "real\\usd"));
        assert!(group_matches("*\\usd", "real\\usd"));
        assert!(group_matches("real*b*", "real\\usd\\b"));
        assert!(!group_matches("demo\\*", "real\\usd"));
        assert!(!group_matches("demo", "demo\\forex"));
        assert!(!group_matches("*\\eur", "real\\usd"));
    }

    #[test]
    fn test_login_allocation_skips_taken() {
        let server = StubServer::new();
        server.set_next_login(1001);
        server.insert_user(UserRecord {
            login: Some(1001),
            ..UserRecord::create_default()
        });
        assert_eq!(server.insert_user(UserRecord::create_default()), 1002);
        assert!(server.user(1001).is_some());
    }

    #[test]
    fn test_domain_call_classification() {
        assert!(!StubCall::Close.is_domain());
        assert!(!StubCall::SetSessionKey.is_domain());
        assert!(StubCall::UserGet(1).is_domain());
        assert!(StubCall::OrderTotal(1).is_domain());
    }
}
