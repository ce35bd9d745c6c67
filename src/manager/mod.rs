use crate::core::{
    config::ManagerConfig,
    errors::{ManagerError, ResultExt},
    kernel::{Session, SessionState},
    retcode::{ProtocolResult, ResultCode},
    traits::{ClientIdentity, ManagerProtocol, Transport},
};
use tracing::{debug, info, instrument, warn};

pub mod accounts;
pub mod builder;
pub mod converters;
pub mod orders;
pub mod trading;

pub use builder::ManagerBuilder;

/// Manager client for the trading-platform account service
///
/// Owns the connection settings and at most one live [`Session`]. Every
/// domain operation first makes sure a session exists, connecting lazily on
/// the first call, then performs exactly one round trip through the adapter
/// the protocol builds for that call. A failed operation never tears the
/// session down and nothing is retried; recovery is left to the caller.
///
/// All operations take `&mut self`: one client serves one caller at a time.
pub struct ManagerClient<P: ManagerProtocol> {
    config: ManagerConfig,
    protocol: P,
    session: Option<Session<P::Transport>>,
    state: SessionState,
}

impl<P: ManagerProtocol> ManagerClient<P> {
    pub fn new(config: ManagerConfig, protocol: P) -> Self {
        Self {
            config,
            protocol,
            session: None,
            state: SessionState::Absent,
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn protocol(&self) -> &P {
        &self.protocol
    }

    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// The live session, if connected
    pub const fn session(&self) -> Option<&Session<P::Transport>> {
        self.session.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Open, authenticate and (when enabled) encrypt a new session
    ///
    /// Returns the result code instead of an error so callers can inspect
    /// the exact failure. An existing session is closed first.
    #[instrument(
        skip(self),
        fields(server = %self.config.server, port = self.config.port, login = self.config.login)
    )]
    pub async fn connect(&mut self) -> ResultCode {
        if let Some(previous) = self.session.take() {
            debug!("closing previous session before reconnecting");
            previous.into_transport().close().await;
        }

        self.transition(SessionState::Connecting);
        let mut transport = self.protocol.transport();
        let code = transport
            .open(
                &self.config.server,
                self.config.port,
                self.config.connect_timeout(),
                self.config.crypt,
            )
            .await;
        if !code.is_ok() {
            warn!(code = code.code(), error = %code, "transport open failed");
            self.transition(SessionState::Absent);
            return code;
        }

        self.transition(SessionState::Authenticating);
        let client = ClientIdentity::new(self.config.agent.clone());
        let auth = {
            let mut negotiator = self.protocol.auth(&mut transport, &client);
            negotiator
                .authenticate(self.config.login, self.config.password(), self.config.crypt)
                .await
        };
        let material = match auth {
            Ok(material) => material,
            Err(code) => {
                warn!(code = code.code(), error = %code, "authentication failed");
                transport.close().await;
                self.transition(SessionState::Absent);
                return code;
            }
        };

        let key = if self.config.crypt {
            self.transition(SessionState::Encrypting);
            match material {
                Some(material) if !material.is_empty() => {
                    transport.set_session_key(&material, self.config.password());
                    Some(material)
                }
                _ => {
                    warn!("server returned no key material for an encrypted session");
                    transport.close().await;
                    self.transition(SessionState::Absent);
                    return ResultCode::AuthServerBad;
                }
            }
        } else {
            None
        };

        self.session = Some(Session::new(
            transport,
            self.config.server.clone(),
            self.config.port,
            self.config.connect_timeout(),
            client.agent,
            self.config.login,
            key,
        ));
        self.transition(SessionState::Live);
        info!(encrypted = self.config.crypt, "session established");
        ResultCode::Ok
    }

    /// Close the live session; does nothing when there is none
    #[instrument(skip(self))]
    pub async fn disconnect(&mut self) {
        if let Some(session) = self.session.take() {
            session.into_transport().close().await;
            self.transition(SessionState::Absent);
            info!("session closed");
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!(from = %self.state, to = %next, "session state");
        self.state = next;
    }

    /// Connect if needed, failing with a connection error before any domain call
    async fn ensure_connected(&mut self) -> Result<(), ManagerError> {
        if self.is_connected() {
            return Ok(());
        }
        match self.connect().await {
            ResultCode::Ok => Ok(()),
            code => ProtocolResult::Err(code).or_connection(),
        }
    }

    /// Protocol and live session, borrowed together so an adapter can be bound to the session
    async fn live(&mut self) -> Result<(&P, &mut Session<P::Transport>), ManagerError> {
        self.ensure_connected().await?;
        match self.session.as_mut() {
            Some(session) => Ok((&self.protocol, session)),
            None => Err(ManagerError::Connection(ResultCode::ErrConnection)),
        }
    }
}
