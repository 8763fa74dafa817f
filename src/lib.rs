//! # pakechat - password-authenticated encrypted room chat
//!
//! Client side of a small chat protocol: members of a room share a password,
//! prove it to the server with a SPAKE2 handshake and encrypt every message
//! under a key derived from that password, so the server relays ciphertext
//! only.
//!
//! ## Overview
//!
//! - **Handshake**: one binary frame from the server, one back (SPAKE2, Ed25519 group)
//! - **Key derivation**: Argon2id over the password and a process-wide salt
//! - **Content encryption**: ChaCha20-Poly1305, random nonce prepended
//! - **Wire format**: JSON envelopes tagged by `type` (`MSG`, `USER`, `ACK`)
//! - **Concurrency**: inbound and outbound loops feed a single-threaded state
//!   machine through a bounded event channel
//!
//! ## Example Usage
//!
//! ```no_run
//! use pakechat::config::{ClientConfig, RoomCredential, Salt};
//! use pakechat::identity::Identity;
//! use pakechat::session::SessionProtocol;
//! use pakechat::state::ChatSessionState;
//! use pakechat::transport::WebSocketConnector;
//!
//! # async fn example() -> Result<(), pakechat::ChatError> {
//! let config = ClientConfig::default();
//! let salt = Salt::from_config_str("d2f0c8a4b1e3a7c9d2f0c8a4b1e3a7c9")?;
//! let mut state = ChatSessionState::new(Identity::generate(), config.max_message_len);
//!
//! let credential = state.confirm_login("dev-chat", "correct-horse")?;
//! let (events_tx, mut events_rx) = tokio::sync::mpsc::channel(config.event_capacity);
//! let protocol = SessionProtocol::new(WebSocketConnector::new(config.clone()), salt, config);
//! let _pump = protocol.establish(&credential, events_tx).await?;
//!
//! while let Some(event) = events_rx.recv().await {
//!     state.handle(event);
//!     for line in state.visible_lines() {
//!         println!("{:?}: {}", line.author, line.text);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: client configuration, salt and room credentials
//! - [`crypto`]: key derivation and authenticated encryption
//! - [`protocol`]: handshake, envelopes and dispatch
//! - [`transport`]: frame transport trait, WebSocket and loopback bindings
//! - [`pump`]: inbound/outbound loops and the outbound queue
//! - [`session`]: secure session establishment
//! - [`state`]: the client state machine
//! - [`tui`]: terminal front end

pub mod config;
pub mod crypto;
pub mod error;
pub mod events;
pub mod identity;
pub mod protocol;
pub mod pump;
pub mod session;
pub mod state;
pub mod transport;
pub mod tui;

pub use error::{
    ChatError, ConfigError, DecodeError, DecryptError, EncryptError, HandshakeError, TransportError,
};
pub use events::{ErrorKind, EstablishedSession, SessionEvent};
pub use session::SessionProtocol;
pub use state::{ChatSessionState, SessionPhase};
