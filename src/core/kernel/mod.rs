//! Transport kernel for the manager protocol
//!
//! Holds everything below the domain adapters: the session value the client
//! owns while connected, the packet framing, and a TCP transport.
//!
//! # Architecture
//!
//! - `Session`: one authenticated connection, created only after the full
//!   connect sequence succeeds
//! - `SessionState`: observable lifecycle of the client's session
//! - `KeyMaterial` / `SessionKey`: handshake output and the derived cipher seed
//! - `PacketHeader`: 9-byte ASCII header in front of every packet body
//! - `TcpTransport`: tokio TCP implementation of [`Transport`]
//!
//! [`Transport`]: crate::core::traits::Transport
//!
//! ## Opening a transport by hand
//! ```rust,no_run
//! use mt5api::core::kernel::TcpTransport;
//! use mt5api::core::traits::Transport;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let mut transport = TcpTransport::new();
//! let code = transport
//!     .open("mt5.example.com", 443, Duration::from_millis(3000), true)
//!     .await;
//! if code.is_ok() {
//!     let _ = transport.send_packet(b"PING").await;
//!     transport.close().await;
//! }
//! # }
//! ```

pub mod codec;
pub mod session;
pub mod tcp;

pub use codec::{PacketHeader, HEADER_LEN, MAX_BODY_LEN, MAX_PACKET_NUMBER};
pub use session::{KeyMaterial, Session, SessionKey, SessionState};
pub use tcp::TcpTransport;
