//! Engine wiring.
//!
//! [`MirrorEngine`] owns the single authoritative [`SubscriptionRegistry`]
//! copy and serializes every read and write to it through one command
//! loop, so register/unregister races cannot break the "entry exists iff
//! set non-empty" invariant. Everything else talks to the engine through a
//! cloneable [`EngineHandle`].
//!
//! The loop also owns persistence: registry mutations arm a trailing
//! debounce timer, and the flush writes the state as it stands when the
//! timer fires, so a burst of mutations costs one store write. Shutdown
//! flushes immediately.
//!
//! Change events are classified and fanned out by [`Propagator`]; the
//! fan-out runs in a spawned task per event, so a slow host write never
//! delays the next incoming notification.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use crate::config::EngineConfig;
use crate::cookies::{CookieApiHandle, CookieChange};
use crate::errors::EngineError;
use crate::events::EngineEvent;
use crate::propagator::Propagator;
use crate::registry::{
    KvStoreHandle, Subscriber, SubscriptionRegistry, REGISTRY_STORE_KEY,
};

pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug)]
pub enum EngineCommand {
    /// A cookie-change notification from the host store.
    CookieChanged(CookieChange),
    /// Subscribe `subscriber` to `target`'s cookie changes.
    Register { subscriber: String, target: String },
    /// Remove `subscriber` from `target`'s subscribers.
    Unregister { subscriber: String, target: String },
    /// Read one target's subscribers.
    SubscribersOf {
        target: String,
        reply: oneshot::Sender<Vec<Subscriber>>,
    },
    /// Read the whole registry.
    Snapshot {
        reply: oneshot::Sender<SubscriptionRegistry>,
    },
    /// Flush pending state and stop the loop.
    Shutdown { reply: oneshot::Sender<()> },
}

pub struct MirrorEngine {
    config: Arc<EngineConfig>,
    /// Authoritative in-memory registry; loaded from the store on start.
    registry: SubscriptionRegistry,
    store: KvStoreHandle,
    propagator: Arc<Propagator>,
    cmd_tx: mpsc::Sender<EngineCommand>,
    cmd_rx: mpsc::Receiver<EngineCommand>,
    event_tx: broadcast::Sender<EngineEvent>,
    /// When the next debounced flush is due; `None` while clean.
    flush_deadline: Option<Instant>,
}

impl MirrorEngine {
    /// Create a new engine writing cookies through `api` and persisting
    /// the registry in `store`.
    ///
    /// If `config` is `None`, [`EngineConfig::default`] is used.
    pub fn new(config: Option<EngineConfig>, api: CookieApiHandle, store: KvStoreHandle) -> Self {
        let config = Arc::new(config.unwrap_or_default());

        let (cmd_tx, cmd_rx) = mpsc::channel::<EngineCommand>(config.channel_capacity);

        // Broadcast event bus. Subscribe to receive propagation outcomes
        // and lifecycle events.
        let (event_tx, _first_rx) = broadcast::channel::<EngineEvent>(config.channel_capacity);

        Self {
            propagator: Arc::new(Propagator::new(api, event_tx.clone())),
            config,
            registry: SubscriptionRegistry::new(),
            store,
            cmd_tx,
            cmd_rx,
            event_tx,
            flush_deadline: None,
        }
    }

    /// Starts the engine loop and returns a handle plus the join handle.
    pub fn start(self) -> (EngineHandle, JoinHandle<()>) {
        let handle = EngineHandle {
            cmd_tx: self.cmd_tx.clone(),
            event_tx: self.event_tx.clone(),
        };
        let join_handle = tokio::spawn(self.run());
        (handle, join_handle)
    }

    /// Run the engine's command loop.
    ///
    /// Loads the persisted registry first (malformed data degrades to an
    /// empty mapping), then serves commands until shutdown. Pending
    /// registry state is flushed on the way out.
    async fn run(mut self) {
        self.registry =
            SubscriptionRegistry::from_store_value(self.store.get_item(REGISTRY_STORE_KEY).await);

        let _ = self.event_tx.send(EngineEvent::EngineStarted);

        loop {
            // Dummy deadline keeps the disabled branch constructible.
            let deadline = self
                .flush_deadline
                .unwrap_or_else(|| Instant::now() + Duration::from_secs(86_400));

            tokio::select! {
                maybe_cmd = self.cmd_rx.recv() => {
                    match maybe_cmd {
                        Some(cmd) => {
                            if self.handle_command(cmd).await {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = sleep_until(deadline), if self.flush_deadline.is_some() => {
                    self.flush().await;
                }
            }
        }

        if self.flush_deadline.is_some() {
            self.flush().await;
        }
        let _ = self.event_tx.send(EngineEvent::EngineStopped);
    }

    /// Handles one command; returns `true` on shutdown.
    async fn handle_command(&mut self, cmd: EngineCommand) -> bool {
        match cmd {
            EngineCommand::CookieChanged(change) => {
                let subscribers = self.registry.subscribers_of(&change.cookie.domain).to_vec();
                if !subscribers.is_empty() {
                    // Fan out in its own task so the loop can take the
                    // next event before subscriber writes finish.
                    let propagator = self.propagator.clone();
                    tokio::spawn(async move {
                        propagator.propagate(&change, &subscribers).await;
                    });
                }
            }
            EngineCommand::Register { subscriber, target } => {
                if self.registry.register(&subscriber, &target) {
                    self.mark_dirty();
                }
            }
            EngineCommand::Unregister { subscriber, target } => {
                if self.registry.unregister(&subscriber, &target) {
                    self.mark_dirty();
                }
            }
            EngineCommand::SubscribersOf { target, reply } => {
                let _ = reply.send(self.registry.subscribers_of(&target).to_vec());
            }
            EngineCommand::Snapshot { reply } => {
                let _ = reply.send(self.registry.clone());
            }
            EngineCommand::Shutdown { reply } => {
                if self.flush_deadline.is_some() {
                    self.flush().await;
                }
                let _ = reply.send(());
                return true;
            }
        }
        false
    }

    /// Arms the flush timer. The first mutation of a burst arms it; the
    /// flush reads whatever state exists when it fires, so later mutations
    /// in the window ride along for free.
    fn mark_dirty(&mut self) {
        if self.flush_deadline.is_none() {
            self.flush_deadline = Some(Instant::now() + self.config.flush_debounce);
        }
    }

    /// Writes the registry to the store as one whole value.
    ///
    /// A failed flush is logged and dropped; the next mutation re-arms the
    /// timer and retries with fresher state.
    async fn flush(&mut self) {
        self.flush_deadline = None;
        let value = match self.registry.to_store_value() {
            Ok(value) => value,
            Err(err) => {
                log::warn!("registry snapshot could not be serialized: {err}");
                return;
            }
        };
        match self.store.set_item(REGISTRY_STORE_KEY, value).await {
            Ok(()) => {
                let _ = self.event_tx.send(EngineEvent::RegistryFlushed {
                    targets: self.registry.len(),
                });
            }
            Err(err) => log::warn!("registry flush failed: {err}"),
        }
    }
}

/// Cloneable handle to a running [`MirrorEngine`].
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_tx: broadcast::Sender<EngineEvent>,
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle").finish_non_exhaustive()
    }
}

impl EngineHandle {
    pub fn subscribe_events(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    /// Feed a host cookie-change notification into the engine.
    ///
    /// Fire-and-forget from the caller's perspective: the notification
    /// source never sees propagation failures.
    pub async fn notify_change(&self, change: CookieChange) -> Result<(), EngineError> {
        self.send(EngineCommand::CookieChanged(change))
            .await
            .map_err(|_| EngineError::ChannelClosed)
    }

    pub async fn register(&self, subscriber: &str, target: &str) -> Result<(), EngineError> {
        self.send(EngineCommand::Register {
            subscriber: subscriber.to_string(),
            target: target.to_string(),
        })
        .await
        .map_err(|_| EngineError::ChannelClosed)
    }

    pub async fn unregister(&self, subscriber: &str, target: &str) -> Result<(), EngineError> {
        self.send(EngineCommand::Unregister {
            subscriber: subscriber.to_string(),
            target: target.to_string(),
        })
        .await
        .map_err(|_| EngineError::ChannelClosed)
    }

    pub async fn subscribers_of(&self, target: &str) -> Result<Vec<Subscriber>, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(EngineCommand::SubscribersOf {
                target: target.to_string(),
                reply: tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        rx.await.map_err(|_| EngineError::ChannelClosed)
    }

    /// Current registry state, cloned out of the loop.
    pub async fn snapshot(&self) -> Result<SubscriptionRegistry, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(EngineCommand::Snapshot { reply: tx })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        rx.await.map_err(|_| EngineError::ChannelClosed)
    }

    /// Gracefully shut down: pending registry state is flushed first.
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(EngineCommand::Shutdown { reply: tx })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        rx.await.map_err(|_| EngineError::ChannelClosed)
    }

    /// Send an engine-level command.
    async fn send(&self, cmd: EngineCommand) -> anyhow::Result<()> {
        self.cmd_tx.send(cmd).await?;
        Ok(())
    }
}
