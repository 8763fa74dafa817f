//! Room protocol: handshake, wire envelopes and dispatch.
//!
//! - **Handshake**: SPAKE2 exchange proving both sides hold the room password
//! - **Envelopes**: typed JSON records with a `type` discriminator
//! - **Dispatch**: envelope → session event routing

mod dispatch;
mod envelope;
mod handshake;

pub use dispatch::{dispatch, route};
pub use envelope::{
    decode, decode_envelope, decode_typed, encode, AckEvent, ChatMessage, Discriminator, Envelope,
    PresenceEvent, PresenceStatus, RawEnvelope, TYPE_ACK, TYPE_MSG, TYPE_USER,
};
pub use handshake::{
    answer_handshake, begin_handshake, CompletedHandshake, HandshakeState, SharedSecret,
    SHARED_SECRET_LEN,
};
