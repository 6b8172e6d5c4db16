//! Pub-sub protocol client.
//!
//! The client owns the transport, a [`Session`] (handle, state, registries,
//! line buffer), and nothing else. [`Client`] drives the protocol from a
//! synchronous polling loop; [`AsyncClient`] is the cooperative variant for
//! single-task async hosts (`async` feature). Both multiplex one duplex byte
//! stream into channel broadcasts, service invocations, and call responses.

use alloc::boxed::Box;

use rand_core::RngCore;

use super::device::DeviceDescription;
use super::registry::{CallId, PendingCall};
use super::session::{self, HandshakeReply, Session};
use super::{
    ClientError, ConnectionState, EventHandler, Options, Payload, RECV_CHUNK_SIZE, Responder,
};
use crate::network::error::Error;
use crate::network::{Close, Connection, Read, Write};
use crate::time::Clock;

#[cfg(feature = "async")]
use crate::network::{AsyncClose, AsyncConnection, AsyncRead, AsyncWrite};

/// A pub-sub client over a synchronous connection.
///
/// Construction performs the handshake and blocks until the broker accepts
/// or rejects the handle (bounded by `Options::handshake_timeout_ms`). After
/// that the host drives the engine by calling [`Client::poll`] in its loop;
/// each call performs at most one transport read and dispatches every
/// complete line it produced.
///
/// # Type Parameters
///
/// * `C` - The connection type implementing [`Connection`]
/// * `R` - The random source for handle digits and call ids
/// * `K` - The monotonic clock driving deadlines
///
/// # Examples
///
/// ```rust,no_run
/// use libpubsub::network::application::pubsub::{Client, Options, Payload};
/// # use libpubsub::network::Connection;
/// # use libpubsub::network::error::Error;
/// # struct MockConnection;
/// # impl libpubsub::network::Read for MockConnection {
/// #     type Error = Error;
/// #     fn read(&mut self, _buf: &mut [u8]) -> Result<usize, Error> { Err(Error::WouldBlock) }
/// # }
/// # impl libpubsub::network::Write for MockConnection {
/// #     type Error = Error;
/// #     fn write(&mut self, buf: &[u8]) -> Result<usize, Error> { Ok(buf.len()) }
/// #     fn flush(&mut self) -> Result<(), Error> { Ok(()) }
/// # }
/// # impl libpubsub::network::Close for MockConnection {
/// #     type Error = Error;
/// #     fn close(self) -> Result<(), Error> { Ok(()) }
/// # }
/// # impl Connection for MockConnection {}
/// # struct TickClock(u64);
/// # impl libpubsub::time::Clock for TickClock {
/// #     fn now_millis(&mut self) -> u64 { self.0 += 1; self.0 }
/// # }
///
/// let connection = MockConnection;
/// let options = Options {
///     handle: "Station_##",
///     handshake_timeout_ms: 5_000,
/// };
/// let rng = rand::rngs::mock::StepRng::new(7, 13);
///
/// // let mut client = Client::connect(connection, options, rng, TickClock(0))?;
/// //
/// // client.subscribe("greenhouse/climate", |sender: &str, _: &str, event: &Payload| {
/// //     // react to the event
/// // })?;
/// //
/// // let mut reading = Payload::new();
/// // reading.insert("temperature".into(), 23.5.into());
/// // client.publish("greenhouse/climate", &reading)?;
/// //
/// // loop { client.poll()?; }
/// ```
pub struct Client<C: Connection, R: RngCore, K: Clock> {
    connection: Option<C>,
    session: Session<R, K>,
}

impl<C: Connection, R: RngCore, K: Clock> Client<C, R, K> {
    /// Connect to the broker over an established transport.
    ///
    /// Resolves the handle template, sends the `<handle>(JSON)` greeting and
    /// waits for the broker's verdict. On acceptance every channel already in
    /// the subscription registry is re-claimed with a `subscribe` command —
    /// at this point that is at least the client's own handle channel, which
    /// makes the client reachable for call responses.
    ///
    /// The wait is bounded by `Options::handshake_timeout_ms` against the
    /// supplied clock; transports that time out their reads (or report
    /// [`Error::WouldBlock`]) are simply re-polled until the bound passes.
    ///
    /// # Errors
    ///
    /// * [`ClientError::HandshakeRefused`] - the broker answered with an
    ///   `error` line; permanent for this handle
    /// * [`ClientError::Network`] - the transport failed, the peer closed
    ///   the stream, or the handshake deadline passed ([`Error::Timeout`])
    pub fn connect(
        connection: C,
        options: Options<'_>,
        rng: R,
        clock: K,
    ) -> Result<Self, ClientError> {
        let session = Session::new(&options, rng, clock)?;
        let mut client = Self {
            connection: Some(connection),
            session,
        };
        log::info!("[{}] connecting", client.session.handle());
        let greeting = client.session.greeting();
        client.send_line(&greeting)?;

        let deadline = match options.handshake_timeout_ms {
            0 => None,
            ms => Some(client.session.now_millis().saturating_add(u64::from(ms))),
        };
        loop {
            let mut chunk = [0u8; RECV_CHUNK_SIZE];
            let read = match client.read_chunk(&mut chunk)? {
                Some(read) => read,
                None => {
                    client.check_handshake_deadline(deadline)?;
                    continue;
                }
            };
            let mut lines = client.session.feed(&chunk[..read]).into_iter();
            while let Some(line) = lines.next() {
                match client.session.classify_handshake(&line) {
                    HandshakeReply::Accepted => {
                        log::info!("[{}] connection established", client.session.handle());
                        client.session.set_state(ConnectionState::Connected);
                        for command in client.session.replay_commands() {
                            client.send_line(&command)?;
                        }
                        // Events that rode in behind the session info line
                        // dispatch before the handshake returns.
                        for line in lines.by_ref() {
                            client.route_line(&line)?;
                        }
                        return Ok(client);
                    }
                    HandshakeReply::Refused => {
                        log::error!("[{}] {}", client.session.handle(), line);
                        client.drop_connection();
                        return Err(ClientError::HandshakeRefused);
                    }
                    HandshakeReply::Ignored => {}
                }
            }
            client.check_handshake_deadline(deadline)?;
        }
    }

    /// The client's resolved identity.
    pub fn handle(&self) -> &str {
        self.session.handle()
    }

    /// Current connection lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.session.state()
    }

    /// Whether the engine currently holds a usable transport.
    pub fn is_connected(&self) -> bool {
        self.session.state() == ConnectionState::Connected
    }

    /// Pump the connection once.
    ///
    /// Performs at most one transport read. A would-block (or read-timeout)
    /// result is a no-op for this cycle. Every complete line the read
    /// produced is dispatched in wire order: keep-alives are answered with
    /// `.`, JSON events are routed to services, pending calls, or channel
    /// subscribers, and anything else is discarded.
    ///
    /// # Errors
    ///
    /// * [`ClientError::Network`] with [`Error::ConnectionClosed`] - the
    ///   peer closed the stream; the state is now
    ///   [`ConnectionState::Disconnected`] and this instance is done
    /// * [`ClientError::Network`] - any other transport failure, which also
    ///   disconnects
    ///
    /// Callback panics are not caught; a panicking subscriber aborts the
    /// current dispatch cycle.
    pub fn poll(&mut self) -> Result<(), ClientError> {
        let mut chunk = [0u8; RECV_CHUNK_SIZE];
        let read = match self.read_chunk(&mut chunk)? {
            Some(read) => read,
            None => return Ok(()),
        };
        for line in self.session.feed(&chunk[..read]) {
            self.route_line(&line)?;
        }
        Ok(())
    }

    /// Publish a JSON payload to a channel.
    ///
    /// Writes `sendraw <channel> <json>` to the transport. There is no
    /// buffering and no retry: a write failure disconnects the client and
    /// surfaces as [`ClientError::Network`].
    pub fn publish(&mut self, channel: &str, payload: &Payload) -> Result<(), ClientError> {
        let json = serde_json::to_string(payload).map_err(|_| ClientError::Encode)?;
        self.send_line(&session::cmd_sendraw(channel, &json))
    }

    /// Subscribe a callback to a channel.
    ///
    /// The callback is appended to the channel's list (callbacks run in
    /// registration order, duplicates run once per registration) and a
    /// `subscribe` command goes out immediately. Subscription is optimistic:
    /// the local registry is updated before the broker acknowledges
    /// anything, so there is no barrier guaranteeing the broker has seen the
    /// subscription when this returns.
    pub fn subscribe<H>(&mut self, channel: &str, handler: H) -> Result<(), ClientError>
    where
        H: EventHandler + 'static,
    {
        self.session.add_subscription(channel, Box::new(handler))?;
        self.send_line(&session::cmd_subscribe(channel))?;
        log::info!("[{}] subscribed to {}", self.session.handle(), channel);
        Ok(())
    }

    /// Drop a channel subscription with all its callbacks.
    ///
    /// # Errors
    ///
    /// * [`ClientError::NotSubscribed`] - the channel has no entry; callers
    ///   must know the channel was previously subscribed
    pub fn unsubscribe(&mut self, channel: &str) -> Result<(), ClientError> {
        self.session.remove_subscription(channel)?;
        self.send_line(&session::cmd_unsubscribe(channel))?;
        log::info!("[{}] unsubscribed from {}", self.session.handle(), channel);
        Ok(())
    }

    /// Register a responder for a named call on a channel.
    ///
    /// At most one responder per call name; registering again replaces the
    /// previous one. The channel is claimed on the broker but no local
    /// subscription entry is created, so a responder channel is not replayed
    /// by a later handshake — subscribe it explicitly if that matters.
    pub fn register<S>(&mut self, channel: &str, name: &str, responder: S) -> Result<(), ClientError>
    where
        S: Responder + 'static,
    {
        self.session.register_service(name, Box::new(responder))?;
        self.send_line(&session::cmd_subscribe(channel))?;
        log::info!(
            "[{}] registered responder on {} for {}",
            self.session.handle(),
            channel,
            name
        );
        Ok(())
    }

    /// Issue a call without waiting.
    ///
    /// Stamps the payload with the call name and a fresh correlation id,
    /// records a pending call expiring `timeout_ms` from now, and publishes
    /// to `channel`. Returns the call id; poll the engine and consume the
    /// result with [`Client::take_response`].
    pub fn call(
        &mut self,
        channel: &str,
        name: &str,
        payload: &Payload,
        timeout_ms: u32,
    ) -> Result<CallId, ClientError> {
        let (id, stamped) = self.session.new_call(name, payload, timeout_ms)?;
        let json = serde_json::to_string(&stamped).map_err(|_| ClientError::Encode)?;
        if let Err(err) = self.send_line(&session::cmd_sendraw(channel, &json)) {
            self.session.discard_call(&id);
            return Err(err);
        }
        Ok(id)
    }

    /// Consume the response of a call issued with [`Client::call`].
    ///
    /// Returns `Some` exactly once, when a response arrived before the
    /// call's deadline. A response arriving after the deadline never
    /// fulfills the call; inspecting an expired call drops its record.
    pub fn take_response(&mut self, id: &str) -> Option<Payload> {
        self.session.take_response(id)
    }

    /// Issue a call and block until it settles.
    ///
    /// Pumps the connection (no sleep spinning: each iteration is one
    /// [`Client::poll`]) until a response arrives or the deadline passes,
    /// then returns the call record in whatever state it is in — check
    /// [`PendingCall::response`] before trusting the result. With a
    /// transport that reports [`Error::WouldBlock`] immediately this
    /// degenerates to a hot poll; give such transports a short read
    /// timeout, or use [`AsyncClient`].
    pub fn call_and_wait(
        &mut self,
        channel: &str,
        name: &str,
        payload: &Payload,
        timeout_ms: u32,
    ) -> Result<PendingCall, ClientError> {
        let id = self.call(channel, name, payload, timeout_ms)?;
        loop {
            if let Some(call) = self.session.take_settled_call(&id) {
                return Ok(call);
            }
            if let Err(err) = self.poll() {
                self.session.discard_call(&id);
                return Err(err);
            }
        }
    }

    /// Start a device description owned by this client.
    ///
    /// `name` defaults to the client handle; the handle is always recorded
    /// as the device id. Submit the finished description with
    /// [`DeviceDescription::submit`].
    pub fn device(&self, name: Option<&str>) -> DeviceDescription {
        let device_name = name.unwrap_or_else(|| self.handle());
        DeviceDescription::new(device_name, self.handle())
    }

    /// Stop the client: send `quit`, close the transport, disconnect.
    ///
    /// In-flight calls are not cancelled; they expire on their own
    /// deadlines. The quit command is best effort — a transport that
    /// already failed does not prevent teardown.
    pub fn stop(mut self) -> Result<(), ClientError> {
        log::info!("[{}] stopping", self.session.handle());
        let _ = self.send_line(session::QUIT_COMMAND);
        if let Some(connection) = self.connection.take() {
            connection.close().map_err(ClientError::Network)?;
        }
        self.session.set_state(ConnectionState::Disconnected);
        Ok(())
    }

    fn route_line(&mut self, line: &str) -> Result<(), ClientError> {
        for command in self.session.process_line(line) {
            self.send_line(&command)?;
        }
        Ok(())
    }

    /// One transport read. `Ok(None)` means no data this cycle; `Ok(0)`
    /// from the transport means the peer closed and is terminal.
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<Option<usize>, ClientError> {
        let Some(connection) = self.connection.as_mut() else {
            return Err(ClientError::Network(Error::NotOpen));
        };
        match connection.read(buf) {
            Ok(0) => {
                log::warn!("[{}] connection closed by peer", self.session.handle());
                self.drop_connection();
                Err(ClientError::Network(Error::ConnectionClosed))
            }
            Ok(read) => Ok(Some(read)),
            Err(Error::WouldBlock) | Err(Error::Timeout) => Ok(None),
            Err(err) => {
                log::warn!("[{}] read failed: {:?}", self.session.handle(), err);
                self.drop_connection();
                Err(ClientError::Network(err))
            }
        }
    }

    fn send_line(&mut self, line: &str) -> Result<(), ClientError> {
        let Some(connection) = self.connection.as_mut() else {
            return Err(ClientError::Network(Error::NotOpen));
        };
        if let Err(err) = write_line(connection, line) {
            log::warn!("[{}] write failed: {:?}", self.session.handle(), err);
            self.drop_connection();
            return Err(ClientError::Network(err));
        }
        Ok(())
    }

    fn check_handshake_deadline(&mut self, deadline: Option<u64>) -> Result<(), ClientError> {
        if let Some(deadline) = deadline {
            if self.session.now_millis() >= deadline {
                log::error!("[{}] handshake timed out", self.session.handle());
                self.drop_connection();
                return Err(ClientError::Network(Error::Timeout));
            }
        }
        Ok(())
    }

    fn drop_connection(&mut self) {
        if let Some(connection) = self.connection.take() {
            let _ = connection.close();
        }
        self.session.set_state(ConnectionState::Disconnected);
    }
}

impl<C: Connection, R: RngCore, K: Clock> core::fmt::Debug for Client<C, R, K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Client")
            .field("session", &self.session)
            .field("transport", &self.connection.is_some())
            .finish()
    }
}

fn write_line<C: Connection>(connection: &mut C, line: &str) -> Result<(), Error> {
    write_all(connection, line.as_bytes())?;
    write_all(connection, b"\n")?;
    connection.flush()
}

fn write_all<C: Connection>(connection: &mut C, mut bytes: &[u8]) -> Result<(), Error> {
    while !bytes.is_empty() {
        match connection.write(bytes) {
            Ok(0) => return Err(Error::WriteError),
            Ok(written) => bytes = &bytes[written..],
            Err(Error::WouldBlock) => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

/// A pub-sub client over an asynchronous connection.
///
/// The cooperative twin of [`Client`] for single-task async hosts: the
/// receive step suspends until the transport has data and yields back to the
/// scheduler between polls. The protocol engine is shared with the
/// synchronous client, so wire behavior is identical.
///
/// The engine still assumes exactly one reader: drive `poll` from one task
/// and serialize any other access to the client.
#[cfg(feature = "async")]
pub struct AsyncClient<C: AsyncConnection, R: RngCore, K: Clock> {
    connection: Option<C>,
    session: Session<R, K>,
}

#[cfg(feature = "async")]
impl<C: AsyncConnection, R: RngCore, K: Clock> AsyncClient<C, R, K> {
    /// Connect to the broker over an established async transport.
    ///
    /// Same contract as [`Client::connect`]; the wait suspends on the
    /// transport instead of re-polling it.
    pub async fn connect(
        connection: C,
        options: Options<'_>,
        rng: R,
        clock: K,
    ) -> Result<Self, ClientError> {
        let session = Session::new(&options, rng, clock)?;
        let mut client = Self {
            connection: Some(connection),
            session,
        };
        log::info!("[{}] connecting", client.session.handle());
        let greeting = client.session.greeting();
        client.send_line(&greeting).await?;

        let deadline = match options.handshake_timeout_ms {
            0 => None,
            ms => Some(client.session.now_millis().saturating_add(u64::from(ms))),
        };
        loop {
            let mut chunk = [0u8; RECV_CHUNK_SIZE];
            let read = match client.read_chunk(&mut chunk).await? {
                Some(read) => read,
                None => {
                    client.check_handshake_deadline(deadline)?;
                    continue;
                }
            };
            let mut lines = client.session.feed(&chunk[..read]).into_iter();
            while let Some(line) = lines.next() {
                match client.session.classify_handshake(&line) {
                    HandshakeReply::Accepted => {
                        log::info!("[{}] connection established", client.session.handle());
                        client.session.set_state(ConnectionState::Connected);
                        for command in client.session.replay_commands() {
                            client.send_line(&command).await?;
                        }
                        for line in lines.by_ref() {
                            client.route_line(&line).await?;
                        }
                        return Ok(client);
                    }
                    HandshakeReply::Refused => {
                        log::error!("[{}] {}", client.session.handle(), line);
                        client.drop_connection();
                        return Err(ClientError::HandshakeRefused);
                    }
                    HandshakeReply::Ignored => {}
                }
            }
            client.check_handshake_deadline(deadline)?;
        }
    }

    /// The client's resolved identity.
    pub fn handle(&self) -> &str {
        self.session.handle()
    }

    /// Current connection lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.session.state()
    }

    /// Whether the engine currently holds a usable transport.
    pub fn is_connected(&self) -> bool {
        self.session.state() == ConnectionState::Connected
    }

    /// Pump the connection once, suspending until the transport has data or
    /// reports a no-data condition. Same dispatch contract as
    /// [`Client::poll`].
    pub async fn poll(&mut self) -> Result<(), ClientError> {
        let mut chunk = [0u8; RECV_CHUNK_SIZE];
        let read = match self.read_chunk(&mut chunk).await? {
            Some(read) => read,
            None => return Ok(()),
        };
        for line in self.session.feed(&chunk[..read]) {
            self.route_line(&line).await?;
        }
        Ok(())
    }

    /// Publish a JSON payload to a channel. See [`Client::publish`].
    pub async fn publish(&mut self, channel: &str, payload: &Payload) -> Result<(), ClientError> {
        let json = serde_json::to_string(payload).map_err(|_| ClientError::Encode)?;
        self.send_line(&session::cmd_sendraw(channel, &json)).await
    }

    /// Subscribe a callback to a channel. See [`Client::subscribe`].
    pub async fn subscribe<H>(&mut self, channel: &str, handler: H) -> Result<(), ClientError>
    where
        H: EventHandler + 'static,
    {
        self.session.add_subscription(channel, Box::new(handler))?;
        self.send_line(&session::cmd_subscribe(channel)).await?;
        log::info!("[{}] subscribed to {}", self.session.handle(), channel);
        Ok(())
    }

    /// Drop a channel subscription. See [`Client::unsubscribe`].
    pub async fn unsubscribe(&mut self, channel: &str) -> Result<(), ClientError> {
        self.session.remove_subscription(channel)?;
        self.send_line(&session::cmd_unsubscribe(channel)).await?;
        log::info!("[{}] unsubscribed from {}", self.session.handle(), channel);
        Ok(())
    }

    /// Register a responder for a named call. See [`Client::register`].
    pub async fn register<S>(
        &mut self,
        channel: &str,
        name: &str,
        responder: S,
    ) -> Result<(), ClientError>
    where
        S: Responder + 'static,
    {
        self.session.register_service(name, Box::new(responder))?;
        self.send_line(&session::cmd_subscribe(channel)).await?;
        log::info!(
            "[{}] registered responder on {} for {}",
            self.session.handle(),
            channel,
            name
        );
        Ok(())
    }

    /// Issue a call without waiting. See [`Client::call`].
    pub async fn call(
        &mut self,
        channel: &str,
        name: &str,
        payload: &Payload,
        timeout_ms: u32,
    ) -> Result<CallId, ClientError> {
        let (id, stamped) = self.session.new_call(name, payload, timeout_ms)?;
        let json = serde_json::to_string(&stamped).map_err(|_| ClientError::Encode)?;
        if let Err(err) = self.send_line(&session::cmd_sendraw(channel, &json)).await {
            self.session.discard_call(&id);
            return Err(err);
        }
        Ok(id)
    }

    /// Consume the response of an issued call. See [`Client::take_response`].
    pub fn take_response(&mut self, id: &str) -> Option<Payload> {
        self.session.take_response(id)
    }

    /// Issue a call and await settlement, yielding between polls. See
    /// [`Client::call_and_wait`].
    pub async fn call_and_wait(
        &mut self,
        channel: &str,
        name: &str,
        payload: &Payload,
        timeout_ms: u32,
    ) -> Result<PendingCall, ClientError> {
        let id = self.call(channel, name, payload, timeout_ms).await?;
        loop {
            if let Some(call) = self.session.take_settled_call(&id) {
                return Ok(call);
            }
            if let Err(err) = self.poll().await {
                self.session.discard_call(&id);
                return Err(err);
            }
        }
    }

    /// Start a device description owned by this client. See
    /// [`Client::device`].
    pub fn device(&self, name: Option<&str>) -> DeviceDescription {
        let device_name = name.unwrap_or_else(|| self.handle());
        DeviceDescription::new(device_name, self.handle())
    }

    /// Stop the client: send `quit`, close the transport, disconnect.
    pub async fn stop(mut self) -> Result<(), ClientError> {
        log::info!("[{}] stopping", self.session.handle());
        let _ = self.send_line(session::QUIT_COMMAND).await;
        if let Some(connection) = self.connection.take() {
            connection.close().await.map_err(ClientError::Network)?;
        }
        self.session.set_state(ConnectionState::Disconnected);
        Ok(())
    }

    async fn route_line(&mut self, line: &str) -> Result<(), ClientError> {
        for command in self.session.process_line(line) {
            self.send_line(&command).await?;
        }
        Ok(())
    }

    async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<Option<usize>, ClientError> {
        let Some(connection) = self.connection.as_mut() else {
            return Err(ClientError::Network(Error::NotOpen));
        };
        match connection.read(buf).await {
            Ok(0) => {
                log::warn!("[{}] connection closed by peer", self.session.handle());
                self.drop_connection();
                Err(ClientError::Network(Error::ConnectionClosed))
            }
            Ok(read) => Ok(Some(read)),
            Err(Error::WouldBlock) | Err(Error::Timeout) => Ok(None),
            Err(err) => {
                log::warn!("[{}] read failed: {:?}", self.session.handle(), err);
                self.drop_connection();
                Err(ClientError::Network(err))
            }
        }
    }

    async fn send_line(&mut self, line: &str) -> Result<(), ClientError> {
        let Some(connection) = self.connection.as_mut() else {
            return Err(ClientError::Network(Error::NotOpen));
        };
        let mut result = write_all_async(connection, line.as_bytes()).await;
        if result.is_ok() {
            result = write_all_async(connection, b"\n").await;
        }
        if result.is_ok() {
            result = connection.flush().await;
        }
        if let Err(err) = result {
            log::warn!("[{}] write failed: {:?}", self.session.handle(), err);
            self.drop_connection();
            return Err(ClientError::Network(err));
        }
        Ok(())
    }

    fn check_handshake_deadline(&mut self, deadline: Option<u64>) -> Result<(), ClientError> {
        if let Some(deadline) = deadline {
            if self.session.now_millis() >= deadline {
                log::error!("[{}] handshake timed out", self.session.handle());
                self.drop_connection();
                return Err(ClientError::Network(Error::Timeout));
            }
        }
        Ok(())
    }

    fn drop_connection(&mut self) {
        // The async close future cannot run here; dropping the transport is
        // the teardown on the failure path.
        self.connection = None;
        self.session.set_state(ConnectionState::Disconnected);
    }
}

#[cfg(feature = "async")]
impl<C: AsyncConnection, R: RngCore, K: Clock> core::fmt::Debug for AsyncClient<C, R, K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AsyncClient")
            .field("session", &self.session)
            .field("transport", &self.connection.is_some())
            .finish()
    }
}

#[cfg(feature = "async")]
async fn write_all_async<C: AsyncConnection>(
    connection: &mut C,
    mut bytes: &[u8],
) -> Result<(), Error> {
    while !bytes.is_empty() {
        match connection.write(bytes).await {
            Ok(0) => return Err(Error::WriteError),
            Ok(written) => bytes = &bytes[written..],
            Err(Error::WouldBlock) => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(())
}
