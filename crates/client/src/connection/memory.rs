//! In-process transport.
//!
//! [`MemoryConnector`] hands out channels whose far end is a [`Peer`] held by
//! the caller, which makes the manager testable without a socket. Each
//! `connect` call waits until the script supplies an outcome with
//! [`MemoryConnector::accept`] or [`MemoryConnector::refuse`].

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use url::Url;

use super::transport::{Channel, Connector, Frame, TransportError};

type Outcome = Result<MemoryChannel, TransportError>;

#[derive(Debug, Default)]
struct Counters {
    attempts: AtomicUsize,
    live: AtomicUsize,
    max_live: AtomicUsize,
}

/// Scripted connector backed by in-memory channels.
#[derive(Debug)]
pub struct MemoryConnector {
    script: mpsc::UnboundedSender<Outcome>,
    pending: Mutex<mpsc::UnboundedReceiver<Outcome>>,
    counters: Arc<Counters>,
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryConnector {
    #[must_use]
    pub fn new() -> Self {
        let (script, pending) = mpsc::unbounded_channel();
        Self {
            script,
            pending: Mutex::new(pending),
            counters: Arc::default(),
        }
    }

    /// Let the next connect attempt succeed, returning the far end.
    #[must_use]
    pub fn accept(&self) -> Peer {
        let (to_client, inbound) = mpsc::unbounded_channel();
        let (outbound, from_client) = mpsc::unbounded_channel();
        let channel = MemoryChannel {
            inbound,
            outbound: Some(outbound),
            counters: Arc::clone(&self.counters),
        };
        // The receiver lives as long as `self`.
        let _ = self.script.send(Ok(channel));
        Peer {
            to_client,
            from_client,
        }
    }

    /// Make the next connect attempt fail.
    pub fn refuse(&self, reason: impl Into<String>) {
        let _ = self
            .script
            .send(Err(TransportError::Connect(reason.into())));
    }

    /// Number of `connect` calls so far, including one still waiting.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.counters.attempts.load(Ordering::SeqCst)
    }

    /// Channels currently open.
    #[must_use]
    pub fn live_channels(&self) -> usize {
        self.counters.live.load(Ordering::SeqCst)
    }

    /// Highest number of channels that were ever open at once.
    #[must_use]
    pub fn max_live_channels(&self) -> usize {
        self.counters.max_live.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, _url: &Url) -> Result<Box<dyn Channel>, TransportError> {
        self.counters.attempts.fetch_add(1, Ordering::SeqCst);
        let outcome = self.pending.lock().await.recv().await;
        let channel = outcome.ok_or_else(|| TransportError::Connect("connector dropped".to_string()))??;

        let live = self.counters.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_live.fetch_max(live, Ordering::SeqCst);
        Ok(Box::new(channel))
    }
}

/// Client end of an in-memory channel.
#[derive(Debug)]
pub struct MemoryChannel {
    inbound: mpsc::UnboundedReceiver<Frame>,
    outbound: Option<mpsc::UnboundedSender<String>>,
    counters: Arc<Counters>,
}

impl MemoryChannel {
    fn shut(&mut self) {
        if self.outbound.take().is_some() {
            self.counters.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl Channel for MemoryChannel {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        let outbound = self
            .outbound
            .as_ref()
            .ok_or_else(|| TransportError::Send("channel closed".to_string()))?;
        outbound
            .send(text)
            .map_err(|_| TransportError::Send("peer gone".to_string()))
    }

    async fn recv(&mut self) -> Result<Frame, TransportError> {
        Ok(self.inbound.recv().await.unwrap_or(Frame::Close(None)))
    }

    async fn close(&mut self) {
        self.inbound.close();
        self.shut();
    }
}

impl Drop for MemoryChannel {
    fn drop(&mut self) {
        self.shut();
    }
}

/// Far end of an in-memory channel, driven by the test or embedding app.
#[derive(Debug)]
pub struct Peer {
    to_client: mpsc::UnboundedSender<Frame>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl Peer {
    /// Push a text frame to the client. Returns `false` if the client end is gone.
    pub fn push(&self, text: impl Into<String>) -> bool {
        self.to_client.send(Frame::Text(text.into())).is_ok()
    }

    /// Close the channel from this side.
    pub fn close(&self, reason: Option<&str>) -> bool {
        self.to_client
            .send(Frame::Close(reason.map(str::to_string)))
            .is_ok()
    }

    /// Wait for the next frame the client wrote, or `None` once it closed.
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    /// A frame the client already wrote, without waiting.
    pub fn try_recv(&mut self) -> Option<String> {
        self.from_client.try_recv().ok()
    }

    /// Wait until the client end has closed.
    pub async fn closed(&mut self) {
        while self.from_client.recv().await.is_some() {}
    }
}
