//! Connection state and the transition rules between states.
//!
//! [`ConnectionMachine`] is free of I/O and clocks: callers pass the current
//! instant in. The driver task in [`super::ConnectionManager`] feeds it
//! events; tests feed it directly.

use core::fmt;

use thiserror::Error;
use tokio::time::Instant;

use super::ReconnectPolicy;

/// Why a channel is closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The peer closed the channel.
    Remote(String),
    /// Establishing or using the channel failed.
    Error(String),
    /// `close()` was called. Terminal.
    ClientInitiated,
    /// The reconnect policy ran out of attempts. Terminal.
    RetriesExhausted,
    /// The driver task ended without a clean shutdown. Terminal.
    Aborted,
}

impl CloseReason {
    /// Whether no reconnect follows this close.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::ClientInitiated | Self::RetriesExhausted | Self::Aborted
        )
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(reason) => write!(f, "closed by peer: {reason}"),
            Self::Error(error) => write!(f, "error: {error}"),
            Self::ClientInitiated => write!(f, "closed by client"),
            Self::RetriesExhausted => write!(f, "reconnect attempts exhausted"),
            Self::Aborted => write!(f, "connection driver stopped unexpectedly"),
        }
    }
}

/// Observable state of the live-update channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed(CloseReason),
    Reconnecting { attempt: u32, next_retry_at: Instant },
}

impl ConnectionState {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed(_) => "closed",
            Self::Reconnecting { .. } => "reconnecting",
        }
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Closed with no reconnect to follow.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed(reason) if reason.is_terminal())
    }
}

/// An event that is not valid in the current state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("cannot {event} while {state}")]
pub struct TransitionError {
    pub state: &'static str,
    pub event: &'static str,
}

/// Transition rules for the live-update channel.
#[derive(Debug, Clone)]
pub struct ConnectionMachine {
    state: ConnectionState,
    policy: ReconnectPolicy,
    failures: u32,
}

impl ConnectionMachine {
    /// Start in `Connecting`.
    #[must_use]
    pub const fn new(policy: ReconnectPolicy) -> Self {
        Self {
            state: ConnectionState::Connecting,
            policy,
            failures: 0,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// `Connecting → Open`. Resets the attempt counter.
    ///
    /// # Errors
    ///
    /// Fails unless the machine is `Connecting`.
    pub fn on_open(&mut self) -> Result<(), TransitionError> {
        self.expect(matches!(self.state, ConnectionState::Connecting), "open")?;
        self.failures = 0;
        self.state = ConnectionState::Open;
        Ok(())
    }

    /// `Connecting | Open → Closed(reason)`.
    ///
    /// # Errors
    ///
    /// Fails unless the machine is `Connecting` or `Open`.
    pub fn on_close(&mut self, reason: CloseReason) -> Result<(), TransitionError> {
        self.expect(
            matches!(
                self.state,
                ConnectionState::Connecting | ConnectionState::Open
            ),
            "close",
        )?;
        self.state = ConnectionState::Closed(reason);
        Ok(())
    }

    /// `Closed → Reconnecting` for a non-terminal close, or `Closed →
    /// Closed(RetriesExhausted)` when the policy gives up.
    ///
    /// Returns the retry deadline, or `None` when no retry follows.
    ///
    /// # Errors
    ///
    /// Fails unless the machine is `Closed`.
    pub fn schedule_retry(&mut self, now: Instant) -> Result<Option<Instant>, TransitionError> {
        let ConnectionState::Closed(reason) = &self.state else {
            return Err(self.invalid("schedule retry"));
        };
        if reason.is_terminal() {
            return Ok(None);
        }

        let attempt = self.failures.saturating_add(1);
        let Some(delay) = self.policy.delay_for_attempt(attempt) else {
            self.state = ConnectionState::Closed(CloseReason::RetriesExhausted);
            return Ok(None);
        };

        self.failures = attempt;
        let next_retry_at = now + delay;
        self.state = ConnectionState::Reconnecting {
            attempt,
            next_retry_at,
        };
        Ok(Some(next_retry_at))
    }

    /// `Reconnecting → Connecting` once the deadline has passed.
    ///
    /// Returns whether the transition happened.
    pub fn on_timer(&mut self, now: Instant) -> bool {
        match self.state {
            ConnectionState::Reconnecting { next_retry_at, .. } if now >= next_retry_at => {
                self.state = ConnectionState::Connecting;
                true
            }
            _ => false,
        }
    }

    /// Any state → terminal `Closed(ClientInitiated)`. A machine that is
    /// already terminal keeps its reason.
    pub fn shutdown(&mut self) {
        if !self.state.is_terminal() {
            self.state = ConnectionState::Closed(CloseReason::ClientInitiated);
        }
    }

    /// Any non-terminal state → `Closed(Aborted)`. Returns whether the
    /// state changed.
    pub fn abort(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = ConnectionState::Closed(CloseReason::Aborted);
        true
    }

    fn expect(&self, ok: bool, event: &'static str) -> Result<(), TransitionError> {
        if ok { Ok(()) } else { Err(self.invalid(event)) }
    }

    const fn invalid(&self, event: &'static str) -> TransitionError {
        TransitionError {
            state: self.state.name(),
            event,
        }
    }
}
