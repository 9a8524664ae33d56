// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Device transport and session protocol
//!
//! A [Transport] wraps a byte [Channel] with the envelope codec, a
//! per-device FIFO lock, and handling for interactive requests raised by
//! devices mid-exchange:
//!
//! - `ButtonRequest` is published as `BUTTON_REQUEST` and acknowledged
//!   automatically, the device then waits for the user.
//! - `PinMatrixRequest` / `PassphraseRequest` are published as
//!   `PIN_REQUEST` / `PASSPHRASE_REQUEST`, the in-flight exchange then
//!   waits (up to the user timeout) for [Transport::send_pin] /
//!   [Transport::send_passphrase] from another task. Replies travel on a
//!   side queue so they never contend for the device lock.
//!
//! Multi-message exchanges hold the lock for their full duration via
//! [Transport::lock_during], which hands the closure a [Session] whose
//! calls do not re-acquire the lock.
//!
//! An exchange abandoned before its final response (timeout, or a dropped
//! future) leaves the transport out of sync. The next call first writes a
//! `Ping` carrying a fresh marker and discards frames until the matching
//! `Success`, so late responses are never handed to a later call. If the
//! device cannot be re-aligned the transport is closed.

use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex as StdMutex, RwLock,
    },
    time::Duration,
};

use log::{debug, trace, warn};
use serde_json::json;
use strum::Display;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    Mutex, OwnedMutexGuard,
};

use hdwallet_proto::{
    messages::{
        ButtonAck, ButtonRequest, Cancel, Failure, FailureType, PassphraseAck, PinMatrixAck,
        PinMatrixRequest, PinMatrixRequestType, Ping, Success,
    },
    Decoded, DynMessage, Envelope, MessageType, ProtocolError, Registry,
};

use crate::{
    keyring::{Emitter, EventName},
    Config, Error, TransportError,
};

mod channel;
pub use channel::{Channel, GenericChannel};

mod memory;
pub use memory::MemoryChannel;

#[cfg(feature = "transport_tcp")]
mod tcp;
#[cfg(feature = "transport_tcp")]
pub use tcp::{TcpChannel, TcpOptions};

/// Transport state
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display)]
pub enum TransportState {
    /// Channel not open (initial state, or after an I/O failure)
    Closed,
    /// Channel open and idle
    Open,
    /// Channel locked for an exchange
    Busy,
}

/// Per-call options
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct CallOptions {
    /// Response timeout, defaults to the configured request timeout
    pub timeout: Option<Duration>,
}

impl CallOptions {
    pub fn timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

/// Marker pings sent per resync before giving up
const RESYNC_ATTEMPTS: usize = 3;

/// Interactive request awaiting a user reply
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display)]
enum Interaction {
    Pin,
    Passphrase,
}

struct Link<C> {
    channel: C,
    replies: UnboundedReceiver<Envelope>,
}

struct Shared {
    registry: Arc<Registry>,
    emitter: RwLock<Emitter>,
    state: StdMutex<TransportState>,
    pending: StdMutex<Option<Interaction>>,
    /// Set while a request is written but its final response not yet read
    in_flight: AtomicBool,
    resyncs: AtomicU64,
    replies: UnboundedSender<Envelope>,
    request_timeout: Duration,
    user_timeout: Duration,
}

impl Shared {
    fn state(&self) -> TransportState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, s: TransportState) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        if *state != s {
            trace!("transport state {} -> {}", *state, s);
            *state = s;
        }
    }

    fn pending(&self) -> Option<Interaction> {
        *self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_pending(&self, i: Option<Interaction>) {
        *self.pending.lock().unwrap_or_else(|e| e.into_inner()) = i;
    }

    fn emit(&self, name: EventName, payload: serde_json::Value) {
        let e = self.emitter.read().unwrap_or_else(|e| e.into_inner()).clone();
        e.emit(name, payload);
    }

    /// Publish a `MESSAGE` tap for a frame
    fn tap(&self, e: &Envelope, from_wallet: bool) {
        self.emit(
            EventName::Message,
            json!({
                "type_id": e.type_id,
                "name": self.registry.name(e.type_id),
                "length": e.payload.len(),
                "from_wallet": from_wallet,
            }),
        );
    }
}

/// Envelope transport over a [Channel], see module docs
pub struct Transport<C: Channel> {
    link: Arc<Mutex<Link<C>>>,
    shared: Arc<Shared>,
}

impl<C: Channel> Transport<C> {
    /// Create a new (closed) transport
    pub fn new(channel: C, registry: Arc<Registry>, config: &Config, emitter: Emitter) -> Self {
        let (tx, rx) = unbounded_channel();

        Self {
            link: Arc::new(Mutex::new(Link {
                channel,
                replies: rx,
            })),
            shared: Arc::new(Shared {
                registry,
                emitter: RwLock::new(emitter),
                state: StdMutex::new(TransportState::Closed),
                pending: StdMutex::new(None),
                in_flight: AtomicBool::new(false),
                resyncs: AtomicU64::new(0),
                replies: tx,
                request_timeout: config.request_timeout(),
                user_timeout: config.user_timeout(),
            }),
        }
    }

    /// Fetch the current transport state
    pub fn state(&self) -> TransportState {
        self.shared.state()
    }

    /// Fetch the message registry used by this transport
    pub fn registry(&self) -> &Registry {
        &self.shared.registry
    }

    /// Fetch the event emitter for this transport's device
    pub fn emitter(&self) -> Emitter {
        self.shared
            .emitter
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Replace the event emitter (once a device id is known)
    pub fn set_emitter(&self, emitter: Emitter) {
        *self
            .shared
            .emitter
            .write()
            .unwrap_or_else(|e| e.into_inner()) = emitter;
    }

    /// Open the underlying channel, no-op if already open
    pub async fn connect(&self) -> Result<(), Error> {
        let mut link = self.link.lock().await;

        if self.shared.state() != TransportState::Closed {
            return Ok(());
        }

        link.channel.open().await?;
        self.shared.set_state(TransportState::Open);
        self.shared.in_flight.store(false, Ordering::SeqCst);

        debug!("transport open");

        Ok(())
    }

    /// Close the underlying channel
    pub async fn disconnect(&self) -> Result<(), Error> {
        let mut link = self.link.lock().await;

        if self.shared.state() == TransportState::Closed {
            return Ok(());
        }

        self.shared.set_state(TransportState::Closed);
        link.channel.close().await?;

        debug!("transport closed");

        Ok(())
    }

    /// Acquire the device lock, returning a [Session] for exchanges.
    ///
    /// The lock is released when the session is dropped.
    pub async fn session(&self) -> Result<Session<C>, Error> {
        let link = self.link.clone().lock_owned().await;

        if self.shared.state() == TransportState::Closed {
            return Err(TransportError::ChannelClosed.into());
        }
        self.shared.set_state(TransportState::Busy);

        Ok(Session {
            link,
            shared: self.shared.clone(),
        })
    }

    /// Hold the device lock for the duration of `f`, which receives the
    /// [Session] to issue calls against.
    pub async fn lock_during<R, F, Fut>(&self, f: F) -> Result<R, Error>
    where
        F: FnOnce(Session<C>) -> Fut,
        Fut: Future<Output = Result<R, Error>>,
    {
        let s = self.session().await?;
        f(s).await
    }

    /// Issue a single call, returning the decoded response
    pub async fn call(
        &self,
        type_id: u32,
        msg: &dyn DynMessage,
        opts: CallOptions,
    ) -> Result<Decoded, Error> {
        self.session().await?.call(type_id, msg, opts).await
    }

    /// Issue a single call, expecting a response of type `R`
    pub async fn request<R: 'static>(
        &self,
        type_id: u32,
        msg: &dyn DynMessage,
        opts: CallOptions,
    ) -> Result<R, Error> {
        self.session().await?.request(type_id, msg, opts).await
    }

    /// Write a message without awaiting a response (debug link decisions)
    pub async fn post(&self, type_id: u32, msg: &dyn DynMessage) -> Result<(), Error> {
        let mut s = self.session().await?;
        let e = s.shared.registry.encode(type_id, msg)?;
        s.write(&e).await
    }

    fn reply(&self, expected: Interaction, e: Envelope) -> Result<(), Error> {
        match self.shared.pending() {
            Some(i) if i == expected => {
                debug!("queueing {} reply", i);
                self.shared
                    .replies
                    .send(e)
                    .map_err(|_| TransportError::ChannelClosed)?;
                Ok(())
            }
            _ => Err(Error::Validation(format!("no {expected} request pending"))),
        }
    }

    /// Reply to a pending PIN request
    pub fn send_pin(&self, pin: &str) -> Result<(), Error> {
        let e = self.shared.registry.encode(
            MessageType::PinMatrixAck.id(),
            &PinMatrixAck {
                pin: pin.to_string(),
            },
        )?;
        self.reply(Interaction::Pin, e)
    }

    /// Reply to a pending passphrase request
    pub fn send_passphrase(&self, passphrase: &str) -> Result<(), Error> {
        let e = self.shared.registry.encode(
            MessageType::PassphraseAck.id(),
            &PassphraseAck {
                passphrase: passphrase.to_string(),
            },
        )?;
        self.reply(Interaction::Passphrase, e)
    }

    /// Cancel the current operation.
    ///
    /// While a PIN or passphrase request is pending `Cancel` is sent as
    /// the reply, otherwise it is sent as an ordinary call.
    pub async fn cancel(&self) -> Result<(), Error> {
        let e = self
            .shared
            .registry
            .encode(MessageType::Cancel.id(), &Cancel {})?;

        if let Some(i) = self.shared.pending() {
            return self.reply(i, e);
        }

        // Devices acknowledge a cancel with `Failure(ActionCancelled)` only
        match self
            .call(MessageType::Cancel.id(), &Cancel {}, CallOptions::default())
            .await
        {
            Ok(d) => Err(Error::UnexpectedResponse {
                expected: "Failure".to_string(),
                actual: d.name().to_string(),
            }),
            Err(e) if e.is_failure(FailureType::ActionCancelled) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Locked exchange session on a [Transport]
pub struct Session<C: Channel> {
    link: OwnedMutexGuard<Link<C>>,
    shared: Arc<Shared>,
}

impl<C: Channel> Drop for Session<C> {
    fn drop(&mut self) {
        if self.shared.state() == TransportState::Busy {
            self.shared.set_state(TransportState::Open);
        }
    }
}

impl<C: Channel> Session<C> {
    /// Issue a call under the held lock, returning the decoded response
    pub async fn call(
        &mut self,
        type_id: u32,
        msg: &dyn DynMessage,
        opts: CallOptions,
    ) -> Result<Decoded, Error> {
        // Discard replies left over from earlier timed-out exchanges
        while self.link.replies.try_recv().is_ok() {}

        if self.shared.in_flight.load(Ordering::SeqCst) {
            self.resync().await?;
        }

        let e = self.shared.registry.encode(type_id, msg)?;

        debug!(
            "call {} ({})",
            self.shared.registry.name(type_id).unwrap_or("?"),
            type_id
        );

        self.write(&e).await?;
        self.shared.in_flight.store(true, Ordering::SeqCst);

        let mut wait = opts.timeout.unwrap_or(self.shared.request_timeout);

        loop {
            let resp = self.read(wait).await?;

            match MessageType::try_from(resp.type_id) {
                Ok(MessageType::ButtonRequest) => {
                    let r: ButtonRequest = self.decode(&resp)?;
                    debug!("button request: {:?}", r.code);

                    self.shared.emit(
                        EventName::ButtonRequest,
                        json!({ "code": r.code, "data": r.data }),
                    );

                    let ack = self
                        .shared
                        .registry
                        .encode(MessageType::ButtonAck.id(), &ButtonAck {})?;
                    self.write(&ack).await?;

                    // The device now waits on the user
                    wait = wait.max(self.shared.user_timeout);
                }
                Ok(MessageType::PinMatrixRequest) => {
                    let r: PinMatrixRequest = self.decode(&resp)?;
                    let kind = r
                        .r#type
                        .and_then(PinMatrixRequestType::from_i32)
                        .map(|t| format!("{t:?}"));

                    let reply = self
                        .interact(Interaction::Pin, json!({ "type": kind }))
                        .await?;
                    self.write(&reply).await?;
                }
                Ok(MessageType::PassphraseRequest) => {
                    let reply = self
                        .interact(Interaction::Passphrase, serde_json::Value::Null)
                        .await?;
                    self.write(&reply).await?;
                }
                Ok(MessageType::Failure) => {
                    self.shared.in_flight.store(false, Ordering::SeqCst);

                    let f: Failure = self.decode(&resp)?;
                    let code = f.code.and_then(FailureType::from_i32);
                    let message = f.message.unwrap_or_default();

                    debug!("failure response: {:?} {}", code, message);

                    return Err(Error::Failure { code, message });
                }
                _ => {
                    self.shared.in_flight.store(false, Ordering::SeqCst);
                    return Ok(self.shared.registry.decode(&resp)?);
                }
            }
        }
    }

    /// Re-align with the device after an abandoned exchange, discarding
    /// frames until a marker `Ping` is echoed back
    async fn resync(&mut self) -> Result<(), Error> {
        let marker = format!(
            "resync-{}",
            self.shared.resyncs.fetch_add(1, Ordering::SeqCst)
        );

        debug!("transport out of sync, resyncing ({})", marker);

        let ping = self.shared.registry.encode(
            MessageType::Ping.id(),
            &Ping {
                message: Some(marker.clone()),
                ..Default::default()
            },
        )?;
        let cancel = self
            .shared
            .registry
            .encode(MessageType::Cancel.id(), &Cancel {})?;

        for _ in 0..RESYNC_ATTEMPTS {
            self.write(&ping).await?;

            loop {
                let resp = match self.read(self.shared.request_timeout).await {
                    Ok(r) => r,
                    Err(Error::Transport(TransportError::Timeout)) => break,
                    Err(e) => return Err(e),
                };

                match MessageType::try_from(resp.type_id) {
                    Ok(MessageType::Success) => {
                        let s: Success = self.decode(&resp)?;
                        if s.message.as_deref() == Some(marker.as_str()) {
                            debug!("resync complete");
                            self.shared.in_flight.store(false, Ordering::SeqCst);
                            return Ok(());
                        }
                    }
                    // Abandoned exchanges may still be waiting on the user
                    Ok(
                        MessageType::ButtonRequest
                        | MessageType::PinMatrixRequest
                        | MessageType::PassphraseRequest,
                    ) => {
                        self.write(&cancel).await?;
                    }
                    _ => (),
                }

                trace!("discarding stale frame ({})", resp.type_id);
            }
        }

        warn!("unable to resync device, closing transport");

        self.shared.set_state(TransportState::Closed);
        let _ = self.link.channel.close().await;

        Err(TransportError::OutOfSync.into())
    }

    /// Issue a call under the held lock, expecting a response of type `R`
    pub async fn request<R: 'static>(
        &mut self,
        type_id: u32,
        msg: &dyn DynMessage,
        opts: CallOptions,
    ) -> Result<R, Error> {
        let d = self.call(type_id, msg, opts).await?;
        expect(d)
    }

    fn decode<R: 'static>(&self, e: &Envelope) -> Result<R, Error> {
        expect(self.shared.registry.decode(e)?)
    }

    /// Publish an interactive request and wait for the user reply
    async fn interact(
        &mut self,
        i: Interaction,
        payload: serde_json::Value,
    ) -> Result<Envelope, Error> {
        let name = match i {
            Interaction::Pin => EventName::PinRequest,
            Interaction::Passphrase => EventName::PassphraseRequest,
        };

        debug!("awaiting {} reply", i);

        // Mark pending prior to publishing so handlers may reply immediately
        self.shared.set_pending(Some(i));
        self.shared.emit(name, payload);

        let r = tokio::time::timeout(self.shared.user_timeout, self.link.replies.recv()).await;

        self.shared.set_pending(None);

        match r {
            Ok(Some(e)) => Ok(e),
            Ok(None) => Err(TransportError::ChannelClosed.into()),
            Err(_) => {
                warn!("timeout awaiting {} reply", i);

                // Release the device, the resulting failure is drained on resync
                let cancel = self
                    .shared
                    .registry
                    .encode(MessageType::Cancel.id(), &Cancel {})?;
                self.write(&cancel).await?;

                Err(TransportError::Timeout.into())
            }
        }
    }

    /// Close the transport on channel failures
    fn check<T>(&self, r: Result<T, TransportError>) -> Result<T, Error> {
        match r {
            Ok(v) => Ok(v),
            Err(TransportError::Timeout) => Err(TransportError::Timeout.into()),
            Err(e) => {
                warn!("channel error: {}", e);
                self.shared.set_state(TransportState::Closed);
                Err(e.into())
            }
        }
    }

    async fn write(&mut self, e: &Envelope) -> Result<(), Error> {
        let frame = e.to_frame()?;
        trace!("tx frame: {:02x?}", frame);

        self.shared.tap(e, false);

        let r = self.link.channel.write(&frame).await;
        self.check(r)
    }

    async fn read(&mut self, wait: Duration) -> Result<Envelope, Error> {
        let r = match tokio::time::timeout(wait, self.link.channel.read()).await {
            Ok(r) => r,
            Err(_) => {
                debug!("timeout after {:?}", wait);
                return Err(TransportError::Timeout.into());
            }
        };
        let frame = self.check(r)?;

        trace!("rx frame: {:02x?}", frame);

        let (e, _) = Envelope::decode_from(&frame)?;
        self.shared.tap(&e, true);

        Ok(e)
    }
}

/// Downcast a decoded response, mapping mismatches to [Error::UnexpectedResponse]
fn expect<R: 'static>(d: Decoded) -> Result<R, Error> {
    let actual = d.name().to_string();

    d.into_message::<R>().map_err(|e| match e {
        ProtocolError::UnexpectedType { expected, .. } => {
            Error::UnexpectedResponse { expected, actual }
        }
        e => Error::Protocol(e),
    })
}
