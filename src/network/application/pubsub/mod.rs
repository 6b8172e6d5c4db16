//! Text/JSON pub-sub messaging client for embedded systems.
//!
//! This module implements a lightweight, line-oriented publish-subscribe
//! protocol used to connect constrained devices to a central message broker.
//! It is designed for `no_std` environments (with an allocator) and follows
//! the same connection-agnostic model as the rest of the crate: any duplex
//! byte stream implementing [`Connection`](crate::network::Connection) works
//! as the transport.
//!
//! # Protocol Overview
//!
//! All traffic is newline-delimited UTF-8 text:
//!
//! - **Handshake**: the client sends `<handle>(JSON)`; the broker replies
//!   with a line starting with `{` (session info, accepted) or `error`
//!   (rejected).
//! - **Keep-alive**: the broker sends `ping` or `.`; the client replies `.`.
//! - **Subscriptions**: `subscribe <channel>` / `unsubscribe <channel>`.
//! - **Publish**: `sendraw <channel> <json>` where `<json>` is an arbitrary
//!   JSON object.
//! - **Teardown**: `quit`.
//!
//! Inbound events are JSON objects carrying `sender`, `recipient`,
//! `timestamp`, and arbitrary payload fields. Two control fields multiplex
//! calls over the same stream: `_MESSAGE_HANDLE` marks a service invocation
//! (stripped before the responder runs) and `_MESSAGE_ID` correlates a call
//! with its response (stripped from the response a caller receives; it stays
//! in a service payload so the reply keeps its correlation).
//!
//! # Key Concepts
//!
//! - **Handle**: the client's unique identity; `#` placeholders in the
//!   configured handle resolve to random digits at connect time.
//! - **Channel**: a named broadcast domain; every client is implicitly
//!   subscribed to the channel named after its own handle.
//! - **Call**: a payload published with correlation fields; the responder
//!   replies to the caller's handle channel and the engine matches the
//!   response against a deadline-bounded pending-call record.
//!
//! # Operating Modes
//!
//! The engine owns exactly one reader of the transport. Drive it either by
//! calling [`Client::poll`] from the host's loop (synchronous mode) or by
//! awaiting `AsyncClient::poll` from a single cooperative task (`async`
//! feature). Registries are owned by the client; sharing a client across
//! concurrent contexts must be serialized by the host.

use alloc::boxed::Box;

use crate::network::error::Error;

pub mod client;
pub mod device;
pub mod variable;

mod framer;
mod registry;
mod session;

#[cfg(feature = "async")]
pub use client::AsyncClient;
pub use client::Client;
pub use registry::{CallId, PendingCall};

/// Maximum length of a resolved client handle.
pub const MAX_HANDLE_LEN: usize = 64;
/// Maximum length of a channel name.
pub const MAX_CHANNEL_NAME_LEN: usize = 64;
/// Maximum length of a call name.
pub const MAX_CALL_NAME_LEN: usize = 32;
/// Maximum number of subscribed channels.
pub const MAX_CHANNELS: usize = 16;
/// Maximum number of registered service responders.
pub const MAX_SERVICES: usize = 16;
/// Maximum number of in-flight calls.
pub const MAX_PENDING_CALLS: usize = 8;
/// Size of one transport read, and the bound on a single protocol line.
pub const RECV_CHUNK_SIZE: usize = 1024;

/// Event field naming the service a call addresses.
pub const CALL_NAME_FIELD: &str = "_MESSAGE_HANDLE";
/// Event field correlating a call with its response.
pub const CALL_ID_FIELD: &str = "_MESSAGE_ID";

/// Handle template used when the configured handle is empty.
pub(crate) const DEFAULT_HANDLE_TEMPLATE: &str = "PubSubClient_####";

/// An event payload: the JSON object fields left after the envelope
/// (`sender`, `recipient`, `timestamp`, `data`) and control fields are
/// stripped.
pub type Payload = serde_json::Map<alloc::string::String, serde_json::Value>;

/// Options for configuring the client connection.
#[derive(Debug, Clone)]
pub struct Options<'a> {
    /// The client handle, unique within the broker. Every `#` is replaced
    /// with a random digit at connect time; an empty string falls back to
    /// a generated `PubSubClient_####` identity.
    pub handle: &'a str,

    /// Upper bound on the handshake in milliseconds. `0` waits forever.
    ///
    /// The handshake blocks the caller until the broker answers; on
    /// transports with a read timeout the wait is re-armed until this
    /// deadline passes.
    pub handshake_timeout_ms: u32,
}

/// Connection lifecycle state.
///
/// Owned by the client; all other components only observe it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No usable transport. Terminal for this client instance.
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Handshake accepted; the engine is pumping events.
    Connected,
}

/// Errors reported by the pub-sub client.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ClientError {
    /// The transport failed; the connection state is now
    /// [`ConnectionState::Disconnected`].
    Network(Error),
    /// The broker rejected the handshake. Permanent for this handle; do not
    /// retry without changing it.
    HandshakeRefused,
    /// The channel has no subscription entry.
    NotSubscribed,
    /// A bounded registry or name buffer is full.
    BufferOverflow,
    /// A payload could not be serialized to JSON.
    Encode,
}

impl From<Error> for ClientError {
    fn from(err: Error) -> Self {
        ClientError::Network(err)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ClientError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            ClientError::Network(e) => defmt::write!(f, "Network({})", e),
            ClientError::HandshakeRefused => defmt::write!(f, "HandshakeRefused"),
            ClientError::NotSubscribed => defmt::write!(f, "NotSubscribed"),
            ClientError::BufferOverflow => defmt::write!(f, "BufferOverflow"),
            ClientError::Encode => defmt::write!(f, "Encode"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ConnectionState {
    fn format(&self, f: defmt::Formatter) {
        match self {
            ConnectionState::Disconnected => defmt::write!(f, "Disconnected"),
            ConnectionState::Connecting => defmt::write!(f, "Connecting"),
            ConnectionState::Connected => defmt::write!(f, "Connected"),
        }
    }
}

/// Callback invoked for every event delivered on a subscribed channel.
///
/// Implemented for any `FnMut(&str, &str, &Payload)` closure, so plain
/// closures subscribe directly. Handlers run on the thread or task driving
/// [`Client::poll`]; a panicking handler aborts the current dispatch cycle.
pub trait EventHandler {
    /// Handle one event: `sender` is the publishing client, `recipient` the
    /// channel the event was addressed to.
    fn on_event(&mut self, sender: &str, recipient: &str, event: &Payload);
}

impl<F> EventHandler for F
where
    F: FnMut(&str, &str, &Payload),
{
    fn on_event(&mut self, sender: &str, recipient: &str, event: &Payload) {
        self(sender, recipient, event)
    }
}

/// Responder invoked when this client receives a call it registered for.
///
/// The responder mutates the payload in place; whatever the payload contains
/// afterwards is published back to the caller. The correlation id stays in
/// the payload throughout, which is what lets the caller match the reply.
pub trait Responder {
    /// Answer one call invocation.
    fn respond(&mut self, event: &mut Payload);
}

impl<F> Responder for F
where
    F: FnMut(&mut Payload),
{
    fn respond(&mut self, event: &mut Payload) {
        self(event)
    }
}

pub(crate) type BoxedHandler = Box<dyn EventHandler>;
pub(crate) type BoxedResponder = Box<dyn Responder>;
