// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Device registry and wildcard event bus
//!
//! The [Keyring] tracks paired wallets by device id (holding non-owning
//! references, wallets are owned by the application) and dispatches
//! [Event]s raised by transports and wallets to subscribed handlers.
//!
//! Handlers are delivered in three tiers, `on_any` handlers first, then
//! handlers with fully specified patterns, then wildcard patterns, in
//! registration order within each tier. Handler failures (errors or
//! panics) are logged and published via [Keyring::subscribe_errors]
//! without interrupting delivery.

use std::{
    collections::HashMap,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak,
    },
};

use futures::future::join_all;
use log::{debug, trace, warn};
use serde::Serialize;
use strum::{Display, EnumString, EnumVariantNames};
use tokio::sync::broadcast;

use crate::wallet::HdWallet;

/// Keyring event names
#[derive(
    Copy, Clone, PartialEq, Eq, Debug, Hash, Display, EnumString, EnumVariantNames, Serialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventName {
    Connect,
    Disconnect,
    PinRequest,
    PassphraseRequest,
    ButtonRequest,
    MnemonicRequired,
    /// Tap for every frame written to or read from a device
    Message,
}

/// Event raised by a wallet or transport
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct Event {
    pub device_id: String,
    pub wallet_type: String,
    pub name: EventName,
    pub payload: serde_json::Value,
}

/// Pattern component
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Match<T> {
    Any,
    Exact(T),
}

impl<T> Default for Match<T> {
    fn default() -> Self {
        Match::Any
    }
}

impl<T: PartialEq> Match<T> {
    fn matches(&self, v: &T) -> bool {
        match self {
            Match::Any => true,
            Match::Exact(e) => e == v,
        }
    }

    fn is_exact(&self) -> bool {
        matches!(self, Match::Exact(_))
    }
}

/// Subscription pattern over `(device_id, wallet_type, name)`
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Pattern {
    pub device_id: Match<String>,
    pub wallet_type: Match<String>,
    pub name: Match<EventName>,
}

impl Pattern {
    /// Pattern matching every event
    pub fn any() -> Self {
        Self::default()
    }

    /// Restrict pattern to a device id
    pub fn device(mut self, device_id: &str) -> Self {
        self.device_id = Match::Exact(device_id.to_string());
        self
    }

    /// Restrict pattern to a wallet type
    pub fn wallet_type(mut self, wallet_type: &str) -> Self {
        self.wallet_type = Match::Exact(wallet_type.to_string());
        self
    }

    /// Restrict pattern to an event name
    pub fn name(mut self, name: EventName) -> Self {
        self.name = Match::Exact(name);
        self
    }

    /// Check whether an event matches this pattern
    pub fn matches(&self, e: &Event) -> bool {
        self.device_id.matches(&e.device_id)
            && self.wallet_type.matches(&e.wallet_type)
            && self.name.matches(&e.name)
    }

    /// Check whether every component is fully specified
    pub fn is_exact(&self) -> bool {
        self.device_id.is_exact() && self.wallet_type.is_exact() && self.name.is_exact()
    }
}

/// Subscription identifier, for [Keyring::off]
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Handler failure report
#[derive(Clone, Debug)]
pub struct HandlerError {
    pub subscription: SubscriptionId,
    pub device_id: String,
    pub name: EventName,
    pub message: String,
}

type Handler = Arc<dyn Fn(&Event) -> anyhow::Result<()> + Send + Sync>;

#[derive(Copy, Clone, PartialEq, Eq, Debug, PartialOrd, Ord)]
enum Tier {
    Any,
    Exact,
    Wildcard,
}

struct Subscription {
    id: SubscriptionId,
    tier: Tier,
    pattern: Pattern,
    handler: Handler,
}

struct Entry {
    wallet: Weak<dyn HdWallet>,
    wallet_type: String,
}

struct Inner {
    wallets: RwLock<HashMap<String, Entry>>,
    subscriptions: RwLock<Vec<Subscription>>,
    next_id: AtomicU64,
    errors: broadcast::Sender<HandlerError>,
}

fn read<T>(l: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    l.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(l: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    l.write().unwrap_or_else(|e| e.into_inner())
}

impl Inner {
    /// Drop entries whose wallets no longer exist
    fn prune(&self) {
        write(&self.wallets).retain(|id, e| {
            let live = e.wallet.strong_count() > 0;
            if !live {
                debug!("pruning dropped device {}", id);
            }
            live
        });
    }

    fn emit(&self, event: Event) {
        let live = read(&self.wallets)
            .get(&event.device_id)
            .map(|e| e.wallet.strong_count() > 0);

        if live != Some(true) {
            trace!(
                "dropping {} event for unregistered device {}",
                event.name,
                event.device_id
            );
            if live.is_some() {
                self.prune();
            }
            return;
        }

        // Snapshot matching handlers so none run under the lock
        let mut handlers: Vec<_> = read(&self.subscriptions)
            .iter()
            .filter(|s| s.pattern.matches(&event))
            .map(|s| (s.tier, s.id, s.handler.clone()))
            .collect();
        handlers.sort_by_key(|(tier, id, _)| (*tier, *id));

        for (_, id, h) in handlers {
            let message = match catch_unwind(AssertUnwindSafe(|| h(&event))) {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e.to_string(),
                Err(_) => "handler panicked".to_string(),
            };

            warn!(
                "handler {:?} failed for {} on {}: {}",
                id, event.name, event.device_id, message
            );

            // No receivers is not an error
            let _ = self.errors.send(HandlerError {
                subscription: id,
                device_id: event.device_id.clone(),
                name: event.name,
                message,
            });
        }
    }
}

/// Registry of paired wallets and event bus.
///
/// Cloning a [Keyring] yields another handle to the same registry.
#[derive(Clone)]
pub struct Keyring {
    inner: Arc<Inner>,
}

impl Default for Keyring {
    fn default() -> Self {
        Self::new()
    }
}

impl Keyring {
    /// Create an empty keyring
    pub fn new() -> Self {
        let (errors, _) = broadcast::channel(64);

        Self {
            inner: Arc::new(Inner {
                wallets: RwLock::new(HashMap::new()),
                subscriptions: RwLock::new(vec![]),
                next_id: AtomicU64::new(0),
                errors,
            }),
        }
    }

    /// Register a wallet, emitting `CONNECT`.
    ///
    /// Returns false if a live wallet is already registered under this id.
    pub fn add(&self, device_id: &str, wallet: &Arc<dyn HdWallet>) -> bool {
        let wallet_type = wallet.vendor().to_string();

        self.inner.prune();

        {
            let mut wallets = write(&self.inner.wallets);

            if wallets.contains_key(device_id) {
                debug!("device {} already registered", device_id);
                return false;
            }

            wallets.insert(
                device_id.to_string(),
                Entry {
                    wallet: Arc::downgrade(wallet),
                    wallet_type: wallet_type.clone(),
                },
            );
        }

        debug!("added {} device {}", wallet_type, device_id);

        self.inner.emit(Event {
            device_id: device_id.to_string(),
            wallet_type,
            name: EventName::Connect,
            payload: serde_json::Value::Null,
        });

        true
    }

    /// Disconnect and unregister a wallet, emitting `DISCONNECT` prior to removal
    pub async fn remove(&self, device_id: &str) -> bool {
        let (wallet, wallet_type) = match read(&self.inner.wallets).get(device_id) {
            Some(e) => (e.wallet.upgrade(), e.wallet_type.clone()),
            None => return false,
        };

        // Held until after DISCONNECT so the event is still delivered
        if let Some(w) = &wallet {
            if let Err(e) = w.disconnect().await {
                warn!("disconnect failed for {}: {}", device_id, e);
            }
        }

        self.inner.emit(Event {
            device_id: device_id.to_string(),
            wallet_type,
            name: EventName::Disconnect,
            payload: serde_json::Value::Null,
        });

        write(&self.inner.wallets).remove(device_id);
        drop(wallet);

        debug!("removed device {}", device_id);

        true
    }

    /// Remove every registered wallet, dropped wallets are pruned silently
    pub async fn remove_all(&self) {
        let ids = self.device_ids();
        join_all(ids.iter().map(|id| self.remove(id))).await;
    }

    /// Fetch a wallet by device id
    pub fn get(&self, device_id: &str) -> Option<Arc<dyn HdWallet>> {
        read(&self.inner.wallets)
            .get(device_id)
            .and_then(|e| e.wallet.upgrade())
    }

    /// Fetch the only registered wallet, if exactly one session exists
    pub fn get_default(&self) -> Option<Arc<dyn HdWallet>> {
        let wallets = read(&self.inner.wallets);
        let mut live = wallets.values().filter_map(|e| e.wallet.upgrade());

        match (live.next(), live.next()) {
            (Some(w), None) => Some(w),
            _ => None,
        }
    }

    /// List registered device ids, pruning dropped wallets
    pub fn device_ids(&self) -> Vec<String> {
        self.inner.prune();

        let mut ids: Vec<_> = read(&self.inner.wallets).keys().cloned().collect();
        ids.sort();
        ids
    }

    fn subscribe(&self, tier: Tier, pattern: Pattern, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));

        write(&self.inner.subscriptions).push(Subscription {
            id,
            tier,
            pattern,
            handler,
        });

        id
    }

    /// Subscribe to events matching a pattern
    pub fn on<F>(&self, pattern: Pattern, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let tier = match pattern.is_exact() {
            true => Tier::Exact,
            false => Tier::Wildcard,
        };

        self.subscribe(tier, pattern, Arc::new(handler))
    }

    /// Subscribe to every event, delivered ahead of pattern handlers
    pub fn on_any<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe(Tier::Any, Pattern::any(), Arc::new(handler))
    }

    /// Remove a subscription
    pub fn off(&self, id: SubscriptionId) -> bool {
        let mut s = write(&self.inner.subscriptions);
        let n = s.len();
        s.retain(|s| s.id != id);
        s.len() != n
    }

    /// Publish an event (dropped if the device is not registered)
    pub fn emit(&self, event: Event) {
        self.inner.emit(event)
    }

    /// Subscribe to handler failure reports
    pub fn subscribe_errors(&self) -> broadcast::Receiver<HandlerError> {
        self.inner.errors.subscribe()
    }

    /// Create an [Emitter] for a device
    pub fn emitter(&self, device_id: &str, wallet_type: &str) -> Emitter {
        Emitter {
            keyring: Some(Arc::downgrade(&self.inner)),
            device_id: device_id.to_string(),
            wallet_type: wallet_type.to_string(),
        }
    }
}

/// Event source bound to a single device, held by transports and wallets
#[derive(Clone)]
pub struct Emitter {
    keyring: Option<Weak<Inner>>,
    device_id: String,
    wallet_type: String,
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("device_id", &self.device_id)
            .field("wallet_type", &self.wallet_type)
            .finish()
    }
}

impl Emitter {
    /// Emitter not attached to any keyring, events are discarded
    pub fn detached(device_id: &str, wallet_type: &str) -> Self {
        Self {
            keyring: None,
            device_id: device_id.to_string(),
            wallet_type: wallet_type.to_string(),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Publish an event for this device
    pub fn emit(&self, name: EventName, payload: serde_json::Value) {
        let inner = match self.keyring.as_ref().and_then(|k| k.upgrade()) {
            Some(v) => v,
            None => return,
        };

        inner.emit(Event {
            device_id: self.device_id.clone(),
            wallet_type: self.wallet_type.clone(),
            name,
            payload,
        })
    }
}
