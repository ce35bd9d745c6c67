use crate::core::config::duration_millis;
use crate::core::kernel::codec::{next_packet_number, PacketHeader, HEADER_LEN};
use crate::core::kernel::session::{KeyMaterial, SessionKey};
use crate::core::retcode::{ProtocolResult, ResultCode};
use crate::core::traits::Transport;
use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, instrument, warn};

/// TCP transport speaking the packet framing of the manager protocol
///
/// Opens the socket with a connect timeout, frames bodies behind a
/// `PacketHeader` and keeps the cipher seed negotiated during
/// authentication. Payload encryption is left to the protocol library that
/// reads the seed through [`TcpTransport::session_key`].
#[derive(Debug, Default)]
pub struct TcpTransport {
    stream: Option<TcpStream>,
    peer: Option<String>,
    encrypted: bool,
    session_key: Option<SessionKey>,
    packet_number: u16,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn peer(&self) -> Option<&str> {
        self.peer.as_deref()
    }

    pub const fn session_key(&self) -> Option<&SessionKey> {
        self.session_key.as_ref()
    }

    /// Write one framed packet, returning the packet number used
    #[instrument(skip(self, body), fields(len = body.len()))]
    pub async fn send_packet(&mut self, body: &[u8]) -> ProtocolResult<u16> {
        let number = self.packet_number;
        let header = PacketHeader::for_body(body, number, false)?;
        let stream = self.stream.as_mut().ok_or(ResultCode::ErrConnection)?;

        let mut frame = Vec::with_capacity(HEADER_LEN + body.len());
        frame.extend_from_slice(&header.encode());
        frame.extend_from_slice(body);
        stream.write_all(&frame).await.map_err(|e| io_code(&e))?;

        self.packet_number = next_packet_number(number);
        Ok(number)
    }

    /// Read one framed packet
    #[instrument(skip(self))]
    pub async fn recv_packet(&mut self) -> ProtocolResult<(PacketHeader, Vec<u8>)> {
        let stream = self.stream.as_mut().ok_or(ResultCode::ErrConnection)?;

        let mut raw = [0u8; HEADER_LEN];
        stream.read_exact(&mut raw).await.map_err(|e| io_code(&e))?;
        let header = PacketHeader::decode(&raw)?;

        let mut body = vec![0u8; usize::from(header.size)];
        stream.read_exact(&mut body).await.map_err(|e| io_code(&e))?;
        debug!(
            number = header.number,
            size = header.size,
            more = header.more,
            "packet received"
        );
        Ok((header, body))
    }
}

fn io_code(error: &io::Error) -> ResultCode {
    match error.kind() {
        io::ErrorKind::TimedOut => ResultCode::ErrTimeout,
        io::ErrorKind::NotConnected
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof => ResultCode::ErrConnection,
        _ => ResultCode::ErrNetwork,
    }
}

#[async_trait]
impl Transport for TcpTransport {
    #[instrument(skip(self))]
    async fn open(
        &mut self,
        address: &str,
        port: u16,
        timeout: Duration,
        encrypted: bool,
    ) -> ResultCode {
        if address.is_empty() || port == 0 {
            return ResultCode::ErrParams;
        }

        let connect = TcpStream::connect((address, port));
        let stream = match tokio::time::timeout(timeout, connect).await {
            Err(_) => {
                warn!(timeout_ms = duration_millis(timeout), "connect timed out");
                return ResultCode::ErrTimeout;
            }
            Ok(Err(e)) => {
                warn!(error = %e, "connect failed");
                return ResultCode::ErrNetwork;
            }
            Ok(Ok(stream)) => stream,
        };

        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "could not disable nagle");
        }

        self.peer = Some(format!("{}:{}", address, port));
        self.stream = Some(stream);
        self.encrypted = encrypted;
        self.session_key = None;
        self.packet_number = 0;
        ResultCode::Ok
    }

    #[instrument(skip(self), fields(peer = ?self.peer))]
    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                debug!(error = %e, "shutdown after close failed");
            }
        }
        self.session_key = None;
        self.peer = None;
    }

    fn set_session_key(&mut self, material: &KeyMaterial, password: &str) {
        let key = SessionKey::derive(material, password);
        debug!(fingerprint = %key.fingerprint(), "session key seeded");
        self.session_key = Some(key);
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn is_encrypted(&self) -> bool {
        self.encrypted && self.session_key.is_some()
    }
}
