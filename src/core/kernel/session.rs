use crate::core::traits::Transport;
use crate::core::types::Login;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::Duration;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Lifecycle of the manager session
///
/// `Absent → Connecting → Authenticating → (Encrypting) → Live`. A failure
/// before `Live` drops back to `Absent`; `Live` is left only by disconnecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Absent,
    Connecting,
    Authenticating,
    Encrypting,
    Live,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Absent => "absent",
            Self::Connecting => "connecting",
            Self::Authenticating => "authenticating",
            Self::Encrypting => "encrypting",
            Self::Live => "live",
        };
        f.write_str(name)
    }
}

/// Random material returned by the auth handshake to seed session encryption
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial(Vec<u8>);

impl KeyMaterial {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Decode the hex form the server sends during authentication
    pub fn from_hex(value: &str) -> Option<Self> {
        hex::decode(value).ok().map(Self)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyMaterial([REDACTED; {}])", self.0.len())
    }
}

/// Cipher seed derived from the handshake material and the manager password
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; 32]);

impl SessionKey {
    pub fn derive(material: &KeyMaterial, password: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(password.as_bytes());
        hasher.update(material.as_bytes());
        Self(hasher.finalize().into())
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Short non-secret identifier of the key, safe to log
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0);
        hex::encode(&digest[..4])
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionKey({})", self.fingerprint())
    }
}

/// One live, authenticated connection to the manager service
///
/// Only constructed once the full connect sequence has succeeded, so holding
/// a `Session` means holding an authenticated transport.
pub struct Session<T: Transport> {
    transport: T,
    address: String,
    port: u16,
    timeout: Duration,
    agent: String,
    login: Login,
    key: Option<KeyMaterial>,
    established_at: DateTime<Utc>,
}

impl<T: Transport> Session<T> {
    pub(crate) fn new(
        transport: T,
        address: String,
        port: u16,
        timeout: Duration,
        agent: String,
        login: Login,
        key: Option<KeyMaterial>,
    ) -> Self {
        Self {
            transport,
            address,
            port,
            timeout,
            agent,
            login,
            key,
            established_at: Utc::now(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub const fn port(&self) -> u16 {
        self.port
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn agent(&self) -> &str {
        &self.agent
    }

    /// Manager login the session authenticated as
    pub const fn login(&self) -> Login {
        self.login
    }

    /// Key material is present only for encrypted sessions
    pub const fn key_material(&self) -> Option<&KeyMaterial> {
        self.key.as_ref()
    }

    pub const fn is_encrypted(&self) -> bool {
        self.key.is_some()
    }

    pub const fn established_at(&self) -> DateTime<Utc> {
        self.established_at
    }

    pub const fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub(crate) fn into_transport(self) -> T {
        self.transport
    }
}

impl<T: Transport> fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("address", &self.address)
            .field("port", &self.port)
            .field("agent", &self.agent)
            .field("login", &self.login)
            .field("encrypted", &self.is_encrypted())
            .field("established_at", &self.established_at)
            .finish_non_exhaustive()
    }
}
