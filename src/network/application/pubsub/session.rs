//! Protocol state machine and message router.
//!
//! The session holds everything the engine needs except the transport: the
//! resolved handle, the connection state, the three registries, and the line
//! buffer. Routing a line never performs I/O; it returns the commands to
//! write, so the synchronous and asynchronous clients share one dispatcher.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use rand_core::RngCore;
use serde_json::Value;

use super::framer::LineBuffer;
use super::registry::{CallId, Calls, PendingCall, Services, Subscriptions};
use super::{
    BoxedHandler, BoxedResponder, CALL_ID_FIELD, CALL_NAME_FIELD, ClientError, ConnectionState,
    DEFAULT_HANDLE_TEMPLATE, MAX_HANDLE_LEN, Options, Payload,
};
use crate::time::Clock;

pub(crate) const KEEP_ALIVE: &str = ".";
pub(crate) const QUIT_COMMAND: &str = "quit";
const HANDSHAKE_SUFFIX: &str = "(JSON)";

pub(crate) type Handle = heapless::String<MAX_HANDLE_LEN>;

/// Classification of a line received while the handshake is outstanding.
pub(crate) enum HandshakeReply {
    /// Session info line; the broker accepted the handle.
    Accepted,
    /// The broker rejected the handshake. Permanent for this handle.
    Refused,
    /// Not a handshake response; keep waiting.
    Ignored,
}

pub(crate) fn cmd_subscribe(channel: &str) -> String {
    format!("subscribe {channel}")
}

pub(crate) fn cmd_unsubscribe(channel: &str) -> String {
    format!("unsubscribe {channel}")
}

pub(crate) fn cmd_sendraw(channel: &str, json: &str) -> String {
    format!("sendraw {channel} {json}")
}

pub(crate) struct Session<R: RngCore, K: Clock> {
    handle: Handle,
    state: ConnectionState,
    subscriptions: Subscriptions,
    calls: Calls,
    services: Services,
    lines: LineBuffer,
    rng: R,
    clock: K,
}

impl<R: RngCore, K: Clock> Session<R, K> {
    pub(crate) fn new(options: &Options<'_>, mut rng: R, clock: K) -> Result<Self, ClientError> {
        let handle = resolve_handle(options.handle, &mut rng)?;
        let mut subscriptions = Subscriptions::new();
        // The handle channel is the default subscription target; seeding it
        // here makes the handshake replay claim it on the broker.
        subscriptions.ensure(&handle)?;
        Ok(Self {
            handle,
            state: ConnectionState::Connecting,
            subscriptions,
            calls: Calls::new(),
            services: Services::new(),
            lines: LineBuffer::new(),
            rng,
            clock,
        })
    }

    pub(crate) fn handle(&self) -> &str {
        &self.handle
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
    }

    pub(crate) fn now_millis(&mut self) -> u64 {
        self.clock.now_millis()
    }

    /// The handshake line announcing this client to the broker.
    pub(crate) fn greeting(&self) -> String {
        format!("{}{}", self.handle, HANDSHAKE_SUFFIX)
    }

    pub(crate) fn classify_handshake(&self, line: &str) -> HandshakeReply {
        if line.starts_with('{') {
            HandshakeReply::Accepted
        } else if line.starts_with("error") {
            HandshakeReply::Refused
        } else {
            HandshakeReply::Ignored
        }
    }

    /// `subscribe` commands for every channel already in the registry, sent
    /// right after the broker accepts the handshake.
    pub(crate) fn replay_commands(&self) -> Vec<String> {
        self.subscriptions.channels().map(cmd_subscribe).collect()
    }

    /// Feed one transport read; returns the complete lines it finished.
    pub(crate) fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.lines.push(chunk)
    }

    /// Route one decoded line. Returns the commands to write back, in order.
    pub(crate) fn process_line(&mut self, line: &str) -> Vec<String> {
        let mut outbound = Vec::new();
        if line.starts_with("ping") || line.starts_with('.') {
            outbound.push(String::from(KEEP_ALIVE));
            return outbound;
        }
        if !line.starts_with('{') {
            return outbound;
        }
        let Ok(Value::Object(mut event)) = serde_json::from_str::<Value>(line) else {
            log::debug!("[{}] discarding malformed event line", self.handle);
            return outbound;
        };
        let (Some(Value::String(sender)), Some(Value::String(recipient))) =
            (event.remove("sender"), event.remove("recipient"))
        else {
            log::debug!("[{}] discarding event without sender/recipient", self.handle);
            return outbound;
        };
        event.remove("timestamp");
        event.remove("data");

        // A service invocation is simultaneously a channel broadcast: the
        // responder mutates the payload, the result goes back to the caller
        // and out to local subscribers of the recipient channel.
        let service = event
            .get(CALL_NAME_FIELD)
            .and_then(Value::as_str)
            .filter(|name| self.services.contains(name))
            .map(String::from);
        if let Some(name) = service {
            event.remove(CALL_NAME_FIELD);
            self.services.respond(&name, &mut event);
            match serde_json::to_string(&event) {
                Ok(json) => outbound.push(cmd_sendraw(&sender, &json)),
                Err(_) => log::warn!("[{}] failed to encode reply for call {}", self.handle, name),
            }
            self.subscriptions.dispatch(&sender, &recipient, &event);
            return outbound;
        }

        if let Some(id) = event
            .get(CALL_ID_FIELD)
            .and_then(Value::as_str)
            .map(String::from)
        {
            let now = self.clock.now_millis();
            self.calls.settle(&id, now, event);
            return outbound;
        }

        self.subscriptions.dispatch(&sender, &recipient, &event);
        outbound
    }

    pub(crate) fn add_subscription(
        &mut self,
        channel: &str,
        handler: BoxedHandler,
    ) -> Result<(), ClientError> {
        self.subscriptions.add(channel, handler)
    }

    pub(crate) fn remove_subscription(&mut self, channel: &str) -> Result<(), ClientError> {
        self.subscriptions.remove(channel)
    }

    pub(crate) fn register_service(
        &mut self,
        name: &str,
        responder: BoxedResponder,
    ) -> Result<(), ClientError> {
        self.services.set(name, responder)
    }

    /// Record a new pending call and return its id plus the stamped payload
    /// to publish.
    pub(crate) fn new_call(
        &mut self,
        name: &str,
        payload: &Payload,
        timeout_ms: u32,
    ) -> Result<(CallId, Payload), ClientError> {
        let id = self.next_call_id();
        let deadline = self.clock.now_millis().saturating_add(u64::from(timeout_ms));
        self.calls.insert(&id, name, deadline)?;
        let mut stamped = payload.clone();
        stamped.insert(CALL_NAME_FIELD.to_string(), Value::from(name));
        stamped.insert(CALL_ID_FIELD.to_string(), Value::from(id.as_str()));
        Ok((id, stamped))
    }

    pub(crate) fn take_response(&mut self, id: &str) -> Option<Payload> {
        let now = self.clock.now_millis();
        self.calls.take_response(id, now)
    }

    pub(crate) fn take_settled_call(&mut self, id: &str) -> Option<PendingCall> {
        let now = self.clock.now_millis();
        self.calls.take_settled(id, now)
    }

    pub(crate) fn discard_call(&mut self, id: &str) {
        self.calls.discard(id);
    }

    fn next_call_id(&mut self) -> CallId {
        let mut bytes = [0u8; 16];
        self.rng.fill_bytes(&mut bytes);
        let uuid = uuid::Builder::from_random_bytes(bytes).into_uuid();
        let mut buf = [0u8; uuid::fmt::Hyphenated::LENGTH];
        let text = uuid.hyphenated().encode_lower(&mut buf);
        CallId::try_from(&*text).unwrap_or_default()
    }
}

impl<R: RngCore, K: Clock> core::fmt::Debug for Session<R, K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session")
            .field("handle", &self.handle.as_str())
            .field("state", &self.state)
            .field("subscriptions", &self.subscriptions)
            .field("calls", &self.calls)
            .field("services", &self.services)
            .finish()
    }
}

/// Resolve `#` placeholders in the handle template to random digits. An
/// empty or blank template falls back to the default identity.
fn resolve_handle(template: &str, rng: &mut impl RngCore) -> Result<Handle, ClientError> {
    let template = if template.trim().is_empty() {
        DEFAULT_HANDLE_TEMPLATE
    } else {
        template
    };
    let mut handle = Handle::new();
    for ch in template.chars() {
        let resolved = if ch == '#' {
            char::from(b'0' + (rng.next_u32() % 10) as u8)
        } else {
            ch
        };
        handle.push(resolved).map_err(|_| ClientError::BufferOverflow)?;
    }
    Ok(handle)
}
