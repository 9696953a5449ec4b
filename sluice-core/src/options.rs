//! Socket configuration options
//!
//! Tunables for connection establishment and message exchange, similar in
//! spirit to libzmq's `zmq_setsockopt`. Options are plain data with
//! builder-style setters; a socket takes a copy at construction and exposes
//! the mutable ones (retry interval) through accessors.

use std::time::Duration;

/// Default pause between dial attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(250);

/// Default upper bound on the greeting + READY exchange.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// Socket configuration options.
///
/// # Examples
///
/// ```
/// use sluice_core::options::SocketOptions;
/// use std::time::Duration;
///
/// let opts = SocketOptions::default()
///     .with_retry_interval(Duration::from_millis(50))
///     .with_max_connect_attempts(20)
///     .with_recv_timeout(Duration::from_secs(5));
/// assert_eq!(opts.max_connect_attempts, Some(20));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketOptions {
    /// Pause between dial attempts (ZMQ_RECONNECT_IVL).
    ///
    /// The interval is fixed; there is no backoff growth.
    pub retry_interval: Duration,

    /// Maximum number of dial attempts before `connect` gives up.
    ///
    /// - `None`: retry until the dial succeeds or the socket is closed (default)
    /// - `Some(n)`: fail after `n` unsuccessful attempts
    pub max_connect_attempts: Option<u32>,

    /// Handshake timeout (ZMQ_HANDSHAKE_IVL).
    ///
    /// Set to `Duration::ZERO` to disable.
    pub handshake_timeout: Duration,

    /// Receive timeout (ZMQ_RCVTIMEO).
    ///
    /// - `None`: wait indefinitely (default)
    /// - `Some(duration)`: give up after duration
    pub recv_timeout: Option<Duration>,

    /// Send timeout (ZMQ_SNDTIMEO).
    pub send_timeout: Option<Duration>,

    /// Maximum size of an inbound message in bytes (ZMQ_MAXMSGSIZE).
    ///
    /// Applied to the sum of all frames of a multipart message.
    pub max_msg_size: Option<usize>,

    /// Disable Nagle's algorithm on TCP connections.
    pub tcp_nodelay: bool,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            retry_interval: DEFAULT_RETRY_INTERVAL,
            max_connect_attempts: None,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            recv_timeout: None,
            send_timeout: None,
            max_msg_size: None,
            tcp_nodelay: true,
        }
    }
}

impl SocketOptions {
    /// Create new socket options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pause between dial attempts.
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Bound the number of dial attempts.
    pub fn with_max_connect_attempts(mut self, attempts: u32) -> Self {
        self.max_connect_attempts = Some(attempts);
        self
    }

    /// Set handshake timeout.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Set receive timeout.
    pub fn with_recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = Some(timeout);
        self
    }

    /// Set send timeout.
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = Some(timeout);
        self
    }

    /// Set maximum inbound message size.
    pub fn with_max_msg_size(mut self, size: usize) -> Self {
        self.max_msg_size = Some(size);
        self
    }

    pub fn with_tcp_nodelay(mut self, nodelay: bool) -> Self {
        self.tcp_nodelay = nodelay;
        self
    }

    /// Handshake timeout, or `None` when disabled.
    #[inline]
    pub fn handshake_deadline(&self) -> Option<Duration> {
        (!self.handshake_timeout.is_zero()).then_some(self.handshake_timeout)
    }
}
