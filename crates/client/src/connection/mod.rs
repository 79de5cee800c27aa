//! Resilient live-update connection.
//!
//! [`ConnectionManager`] owns one live-update channel at a time and keeps it
//! alive: when the channel closes or fails to open, it waits according to its
//! [`ReconnectPolicy`] and tries again, until [`ConnectionManager::close`] is
//! called (or the policy gives up).
//!
//! # Architecture
//!
//! - [`state`] holds the transition rules, free of I/O
//! - a driver task owns the channel and the reconnect timer, and feeds events
//!   to the state machine
//! - the manager handle publishes state through a `watch` channel, queues
//!   outbound frames, and fans inbound envelopes out to subscribers
//!
//! # Example
//!
//! ```rust,ignore
//! let manager = ConnectionManager::from_config(&config.live, Arc::new(connector));
//! let _orders = manager.subscribe(|envelope| {
//!     tracing::info!(kind = %envelope.kind, "Live update");
//! });
//! manager.send(&Envelope::new("subscribe", json!({"topic": "orders"}))?);
//! manager.close().await;
//! ```

pub mod memory;
mod message;
mod policy;
pub mod state;
mod transport;

pub use message::{Envelope, ORDER_STATUS};
pub use policy::ReconnectPolicy;
pub use state::{CloseReason, ConnectionMachine, ConnectionState, TransitionError};
pub use transport::{Channel, Connector, Frame, TransportError};

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::LiveConfig;
use crate::error::{self, ConnectionError};

/// Callback invoked for every inbound envelope.
pub type Handler = Arc<dyn Fn(&Envelope) + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    handlers: Vec<(u64, Handler)>,
}

struct Shared {
    state: watch::Sender<ConnectionState>,
    subscribers: Mutex<Subscribers>,
}

impl Shared {
    fn handlers(&self) -> Vec<Handler> {
        let subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers
            .handlers
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect()
    }

    fn remove(&self, id: u64) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.handlers.retain(|(existing, _)| *existing != id);
    }
}

// =============================================================================
// ConnectionManager
// =============================================================================

/// Handle to the live-update channel.
///
/// Dropping the handle stops the driver and cancels any pending reconnect.
pub struct ConnectionManager {
    shared: Arc<Shared>,
    outbound: mpsc::UnboundedSender<String>,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionManager {
    /// Start connecting to `url`. Must be called within a tokio runtime.
    #[must_use]
    pub fn connect(url: Url, policy: ReconnectPolicy, connector: Arc<dyn Connector>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Connecting);
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let shared = Arc::new(Shared {
            state,
            subscribers: Mutex::default(),
        });

        let driver = Driver {
            url,
            connector,
            machine: ConnectionMachine::new(policy),
            shared: Arc::clone(&shared),
            outbound: outbound_rx,
            shutdown: shutdown_rx,
        };
        let task = tokio::spawn(driver.run());

        Self {
            shared,
            outbound,
            shutdown,
            task: Mutex::new(Some(task)),
        }
    }

    /// Start connecting using the live-update configuration.
    #[must_use]
    pub fn from_config(config: &LiveConfig, connector: Arc<dyn Connector>) -> Self {
        Self::connect(config.url.clone(), config.reconnect, connector)
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.shared.state.borrow().clone()
    }

    /// Receiver that observes every state change.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.shared.state.borrow().is_open()
    }

    /// Serialize `message` and queue it on the open channel.
    ///
    /// Returns `false` without touching the channel when the state is not
    /// `Open` or the message cannot be encoded; both cases are reported.
    pub fn send<T: Serialize + ?Sized>(&self, message: &T) -> bool {
        let (open, state) = {
            let current = self.shared.state.borrow();
            (current.is_open(), current.name())
        };
        if !open {
            error::report(ConnectionError::NotConnected(state.to_string()));
            return false;
        }

        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                error::report(ConnectionError::Encode(e));
                return false;
            }
        };

        if self.outbound.send(text).is_err() {
            error::report(ConnectionError::DriverStopped);
            return false;
        }
        true
    }

    /// Register `handler` for every inbound envelope, in arrival order.
    ///
    /// The handler stays registered until the returned [`Subscription`] is
    /// dropped or unsubscribed. Handlers run on the driver task and must not
    /// block.
    #[must_use = "the handler is removed when the subscription is dropped"]
    pub fn subscribe(&self, handler: impl Fn(&Envelope) + Send + Sync + 'static) -> Subscription {
        let mut subscribers = self
            .shared
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.next_id += 1;
        let id = subscribers.next_id;
        subscribers.handlers.push((id, Arc::new(handler)));

        Subscription {
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.shared
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .handlers
            .len()
    }

    /// Close the channel for good and wait for the driver to stop.
    ///
    /// Cancels a pending reconnect. Calling it again is a no-op.
    #[instrument(skip(self))]
    pub async fn close(&self) {
        self.shutdown.send_replace(true);
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task
            && let Err(e) = task.await
        {
            warn!(error = %e, "Connection driver ended abnormally");
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("state", &self.state())
            .field("subscribers", &self.subscriber_count())
            .finish_non_exhaustive()
    }
}

/// Registration of an inbound-message handler.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    shared: Weak<Shared>,
}

impl Subscription {
    /// Remove the handler now.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.remove(self.id);
        }
    }
}

// =============================================================================
// Driver
// =============================================================================

struct Driver {
    url: Url,
    connector: Arc<dyn Connector>,
    machine: ConnectionMachine,
    shared: Arc<Shared>,
    outbound: mpsc::UnboundedReceiver<String>,
    shutdown: watch::Receiver<bool>,
}

impl Driver {
    async fn run(mut self) {
        loop {
            self.publish();
            debug!(url = %self.url, "Connecting");

            let connected = tokio::select! {
                biased;
                () = stopped(&mut self.shutdown) => return self.stop(),
                result = self.connector.connect(&self.url) => result,
            };

            let reason = match connected {
                Ok(mut channel) => {
                    self.transition(ConnectionMachine::on_open);
                    self.discard_stale_outbound();
                    self.publish();
                    info!(url = %self.url, "Live channel open");

                    let reason = self.pump(channel.as_mut()).await;
                    // The next attempt only starts once this channel is shut.
                    channel.close().await;
                    reason
                }
                Err(e) => {
                    let reason = CloseReason::Error(e.to_string());
                    error::report(ConnectionError::Transport(e));
                    reason
                }
            };

            if reason == CloseReason::ClientInitiated {
                return self.stop();
            }

            info!(reason = %reason, "Live channel closed");
            self.transition(|m| m.on_close(reason));
            self.publish();

            let deadline = match self.machine.schedule_retry(Instant::now()) {
                Ok(Some(deadline)) => deadline,
                Ok(None) => {
                    warn!("Giving up on live channel");
                    self.publish();
                    return;
                }
                Err(e) => {
                    warn!(error = %e, "Unexpected connection state");
                    return self.stop();
                }
            };
            self.publish();

            tokio::select! {
                biased;
                () = stopped(&mut self.shutdown) => return self.stop(),
                () = tokio::time::sleep_until(deadline) => {}
            }
            self.machine.on_timer(Instant::now());
        }
    }

    /// Move frames between the channel and the manager until the channel
    /// closes or shutdown is requested.
    async fn pump(&mut self, channel: &mut dyn Channel) -> CloseReason {
        loop {
            tokio::select! {
                biased;
                () = stopped(&mut self.shutdown) => return CloseReason::ClientInitiated,
                Some(text) = self.outbound.recv() => {
                    if let Err(e) = channel.send(text).await {
                        let reason = CloseReason::Error(e.to_string());
                        error::report(ConnectionError::Transport(e));
                        return reason;
                    }
                }
                frame = channel.recv() => match frame {
                    Ok(Frame::Text(text)) => self.dispatch(&text),
                    Ok(Frame::Close(reason)) => {
                        return CloseReason::Remote(
                            reason.unwrap_or_else(|| "no reason given".to_string()),
                        );
                    }
                    Err(e) => {
                        let reason = CloseReason::Error(e.to_string());
                        error::report(ConnectionError::Transport(e));
                        return reason;
                    }
                },
            }
        }
    }

    /// Decode a text frame and hand it to every subscriber.
    fn dispatch(&self, text: &str) {
        match serde_json::from_str::<Envelope>(text) {
            Ok(envelope) => {
                for handler in self.shared.handlers() {
                    // A failing subscriber must not take the channel down with it.
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(&envelope)));
                    if let Err(payload) = outcome {
                        error::report(ConnectionError::HandlerPanicked {
                            kind: envelope.kind.clone(),
                            message: panic_message(payload.as_ref()),
                        });
                    }
                }
            }
            Err(e) => error::report(ConnectionError::MalformedFrame(e)),
        }
    }

    /// Drop frames queued for a channel that is already gone.
    fn discard_stale_outbound(&mut self) {
        let mut dropped = 0_usize;
        while self.outbound.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            warn!(dropped, "Discarded frames queued for a closed channel");
        }
    }

    fn transition(
        &mut self,
        event: impl FnOnce(&mut ConnectionMachine) -> Result<(), TransitionError>,
    ) {
        if let Err(e) = event(&mut self.machine) {
            warn!(error = %e, "Ignored invalid connection transition");
        }
    }

    fn publish(&self) {
        let state = self.machine.state().clone();
        debug!(state = state.name(), "Connection state");
        self.shared.state.send_replace(state);
    }

    fn stop(&mut self) {
        self.machine.shutdown();
        self.publish();
        info!("Live channel stopped");
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        // Normal exits leave a terminal state; anything else is a crash.
        if self.machine.abort() {
            error::report(ConnectionError::DriverStopped);
            self.publish();
        }
    }
}

/// Text of a panic payload, when it carries one.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

/// Resolve once shutdown is requested or the manager is gone.
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
