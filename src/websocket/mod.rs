//! WebSocket module for the forum hub
//!
//! Envelope decoding, the connection registry, per-connection sessions and
//! the broadcast fan-out engine.

pub mod broadcast;
mod connection;
mod message;
mod registry;
mod server;

pub use broadcast::{BroadcastSender, FanOutEngine};
pub use connection::{Connection, SessionState};
pub use message::{
    CommentPayload, Envelope, ErrorResponse, FormValidation, LoginPayload, LoginValidation,
    MessageKind, PostPayload, RegistrationPayload,
};
pub use registry::{ConnectionHandle, ConnectionId, ConnectionRegistry};
pub use server::WebSocketServer;
