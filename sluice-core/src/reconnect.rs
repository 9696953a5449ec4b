//! Dial retry bookkeeping.
//!
//! `connect` keeps dialing until the transport accepts the connection,
//! sleeping a fixed interval between attempts. This module tracks attempts
//! against the optional bound configured in [`SocketOptions`]; the sleep
//! itself belongs to the caller so it can race the socket's shutdown signal.
//!
//! # Example
//!
//! ```rust
//! use sluice_core::reconnect::{RetryError, RetryState};
//! use sluice_core::options::SocketOptions;
//!
//! let options = SocketOptions::default().with_max_connect_attempts(2);
//! let mut retry = RetryState::new(&options);
//!
//! assert_eq!(retry.record_failure(), Ok(1));
//! assert_eq!(
//!     retry.record_failure(),
//!     Err(RetryError::MaxAttemptsReached { attempts: 2 })
//! );
//! ```

use crate::options::SocketOptions;

/// Attempt counter for one `connect` call.
#[derive(Debug, Clone)]
pub struct RetryState {
    max_attempts: Option<u32>,
    /// Failed attempts so far
    attempt: u32,
}

impl RetryState {
    pub const fn new(options: &SocketOptions) -> Self {
        Self {
            max_attempts: options.max_connect_attempts,
            attempt: 0,
        }
    }

    /// Record a failed dial.
    ///
    /// Returns the number of failures so far, or an error once the
    /// configured maximum has been reached and no further attempt should
    /// be made.
    pub fn record_failure(&mut self) -> Result<u32, RetryError> {
        self.attempt = self.attempt.saturating_add(1);
        match self.max_attempts {
            Some(max) if self.attempt >= max => Err(RetryError::MaxAttemptsReached {
                attempts: self.attempt,
            }),
            _ => Ok(self.attempt),
        }
    }

    /// Get the current attempt number.
    #[inline]
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Whether attempts are unbounded.
    #[inline]
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.max_attempts.is_none()
    }
}

/// Why a dial loop stopped without connecting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RetryError {
    #[error("Maximum connection attempts reached: {attempts}")]
    MaxAttemptsReached { attempts: u32 },
}
