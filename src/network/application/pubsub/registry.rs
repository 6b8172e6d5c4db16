//! Subscription, call, and service registries.
//!
//! All three are bounded index maps owned by the session and reached through
//! accessor methods, so every client instance carries independent state.

use heapless::FnvIndexMap;
use heapless::String as BoundedString;

use super::{
    BoxedHandler, BoxedResponder, CALL_ID_FIELD, ClientError, MAX_CALL_NAME_LEN,
    MAX_CHANNEL_NAME_LEN, MAX_CHANNELS, MAX_PENDING_CALLS, MAX_SERVICES, Payload,
};
use alloc::vec::Vec;

pub(crate) type ChannelName = BoundedString<MAX_CHANNEL_NAME_LEN>;
pub(crate) type CallName = BoundedString<MAX_CALL_NAME_LEN>;

/// A generated call identifier: a random 128-bit id in hyphenated RFC 4122
/// v4 layout.
pub type CallId = BoundedString<36>;

/// Channel name -> ordered callbacks. Insertion order is invocation order;
/// the same callback may appear twice and then runs twice per event.
pub(crate) struct Subscriptions {
    entries: FnvIndexMap<ChannelName, Vec<BoxedHandler>, MAX_CHANNELS>,
}

impl Subscriptions {
    pub(crate) fn new() -> Self {
        Self {
            entries: FnvIndexMap::new(),
        }
    }

    /// Append a callback to a channel, creating the entry if absent.
    pub(crate) fn add(&mut self, channel: &str, handler: BoxedHandler) -> Result<(), ClientError> {
        let key = ChannelName::try_from(channel).map_err(|_| ClientError::BufferOverflow)?;
        if let Some(handlers) = self.entries.get_mut(&key) {
            handlers.push(handler);
            return Ok(());
        }
        let mut handlers = Vec::new();
        handlers.push(handler);
        self.entries
            .insert(key, handlers)
            .map_err(|_| ClientError::BufferOverflow)?;
        Ok(())
    }

    /// Create an empty entry so the channel is replayed on handshake.
    pub(crate) fn ensure(&mut self, channel: &str) -> Result<(), ClientError> {
        let key = ChannelName::try_from(channel).map_err(|_| ClientError::BufferOverflow)?;
        if self.entries.contains_key(&key) {
            return Ok(());
        }
        self.entries
            .insert(key, Vec::new())
            .map_err(|_| ClientError::BufferOverflow)?;
        Ok(())
    }

    /// Drop a channel with all its callbacks.
    pub(crate) fn remove(&mut self, channel: &str) -> Result<(), ClientError> {
        let key = ChannelName::try_from(channel).map_err(|_| ClientError::NotSubscribed)?;
        self.entries
            .remove(&key)
            .map(|_| ())
            .ok_or(ClientError::NotSubscribed)
    }

    pub(crate) fn channels(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|name| name.as_str())
    }

    /// Invoke every callback subscribed to `recipient`, in order.
    pub(crate) fn dispatch(&mut self, sender: &str, recipient: &str, event: &Payload) {
        let Ok(key) = ChannelName::try_from(recipient) else {
            return;
        };
        if let Some(handlers) = self.entries.get_mut(&key) {
            for handler in handlers.iter_mut() {
                handler.on_event(sender, recipient, event);
            }
        }
    }
}

impl core::fmt::Debug for Subscriptions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscriptions")
            .field("channels", &self.entries.len())
            .finish()
    }
}

/// An in-flight or completed call.
///
/// Returned by `Client::call_and_wait`; `response` is `None` when the call
/// expired unanswered, so callers must check it before trusting the result.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCall {
    /// The generated correlation id.
    pub id: CallId,
    /// The call name the request addressed.
    pub name: CallName,
    /// Absolute expiration in [`Clock`](crate::time::Clock) milliseconds.
    pub deadline_ms: u64,
    /// The response payload, once one arrived in time.
    pub response: Option<Payload>,
}

impl PendingCall {
    /// Whether a response arrived before the deadline.
    pub fn is_fulfilled(&self) -> bool {
        self.response.is_some()
    }
}

/// Call id -> pending call record.
pub(crate) struct Calls {
    entries: FnvIndexMap<CallId, PendingCall, MAX_PENDING_CALLS>,
}

impl Calls {
    pub(crate) fn new() -> Self {
        Self {
            entries: FnvIndexMap::new(),
        }
    }

    pub(crate) fn insert(
        &mut self,
        id: &CallId,
        name: &str,
        deadline_ms: u64,
    ) -> Result<(), ClientError> {
        let name = CallName::try_from(name).map_err(|_| ClientError::BufferOverflow)?;
        let record = PendingCall {
            id: id.clone(),
            name,
            deadline_ms,
            response: None,
        };
        self.entries
            .insert(id.clone(), record)
            .map_err(|_| ClientError::BufferOverflow)?;
        Ok(())
    }

    /// Route an inbound response payload to its pending call.
    ///
    /// A response for an unknown id is dropped (the call was never issued or
    /// was already consumed). A response at or past the deadline removes the
    /// record without completing it; the waiting caller never sees it.
    pub(crate) fn settle(&mut self, id: &str, now_ms: u64, mut response: Payload) {
        let Ok(key) = CallId::try_from(id) else {
            return;
        };
        let Some(record) = self.entries.get_mut(&key) else {
            return;
        };
        if now_ms < record.deadline_ms {
            response.remove(CALL_ID_FIELD);
            record.response = Some(response);
        } else {
            self.entries.remove(&key);
        }
    }

    /// Consume the response of a fulfilled call. Expired records are dropped
    /// on inspection.
    pub(crate) fn take_response(&mut self, id: &str, now_ms: u64) -> Option<Payload> {
        let key = CallId::try_from(id).ok()?;
        let record = self.entries.get(&key)?;
        if record.response.is_some() {
            return self.entries.remove(&key).and_then(|record| record.response);
        }
        if now_ms >= record.deadline_ms {
            self.entries.remove(&key);
        }
        None
    }

    /// Remove and return the record once it is fulfilled or expired.
    pub(crate) fn take_settled(&mut self, id: &str, now_ms: u64) -> Option<PendingCall> {
        let key = CallId::try_from(id).ok()?;
        let record = self.entries.get(&key)?;
        if record.response.is_some() || now_ms >= record.deadline_ms {
            return self.entries.remove(&key);
        }
        None
    }

    /// Remove the record regardless of state.
    pub(crate) fn discard(&mut self, id: &str) {
        if let Ok(key) = CallId::try_from(id) {
            self.entries.remove(&key);
        }
    }
}

impl core::fmt::Debug for Calls {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Calls")
            .field("pending", &self.entries.len())
            .finish()
    }
}

/// Call name -> responder. At most one responder per name; registering a
/// name again replaces the previous responder.
pub(crate) struct Services {
    entries: FnvIndexMap<CallName, BoxedResponder, MAX_SERVICES>,
}

impl Services {
    pub(crate) fn new() -> Self {
        Self {
            entries: FnvIndexMap::new(),
        }
    }

    pub(crate) fn set(&mut self, name: &str, responder: BoxedResponder) -> Result<(), ClientError> {
        let key = CallName::try_from(name).map_err(|_| ClientError::BufferOverflow)?;
        self.entries
            .insert(key, responder)
            .map_err(|_| ClientError::BufferOverflow)?;
        Ok(())
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        match CallName::try_from(name) {
            Ok(key) => self.entries.contains_key(&key),
            Err(_) => false,
        }
    }

    /// Run the responder for `name` over the payload in place.
    pub(crate) fn respond(&mut self, name: &str, event: &mut Payload) {
        let Ok(key) = CallName::try_from(name) else {
            return;
        };
        if let Some(responder) = self.entries.get_mut(&key) {
            responder.respond(event);
        }
    }
}

impl core::fmt::Debug for Services {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Services")
            .field("registered", &self.entries.len())
            .finish()
    }
}
