//! Transport contract for the live-update channel.
//!
//! The manager never talks to a socket library directly. An application
//! supplies a [`Connector`] that opens [`Channel`]s; [`super::memory`] ships an
//! in-process implementation.

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// Errors raised by a transport.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The channel could not be established.
    #[error("connect failed: {0}")]
    Connect(String),

    /// A frame could not be written.
    #[error("send failed: {0}")]
    Send(String),

    /// The channel broke while reading.
    #[error("receive failed: {0}")]
    Receive(String),
}

/// An inbound event on an open channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A text frame.
    Text(String),
    /// The peer closed the channel, optionally with a reason.
    Close(Option<String>),
}

/// One established channel.
///
/// `recv` must be cancel-safe: the manager polls it inside `select!` and may
/// drop the future to write an outbound frame.
#[async_trait]
pub trait Channel: Send {
    /// Write one text frame.
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Wait for the next inbound event.
    async fn recv(&mut self) -> Result<Frame, TransportError>;

    /// Close the channel and wait until it is fully shut.
    async fn close(&mut self);
}

/// Opens channels.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establish a new channel to `url`.
    async fn connect(&self, url: &Url) -> Result<Box<dyn Channel>, TransportError>;
}
