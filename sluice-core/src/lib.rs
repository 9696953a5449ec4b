//! Sluice Core
//!
//! Protocol-agnostic building blocks shared by the session layer and the
//! public socket API:
//! - Socket type names and compatibility rules (`socket_type`)
//! - `scheme://address` endpoint parsing (`endpoint`)
//! - Socket tunables (`options`)
//! - Dial retry bookkeeping (`reconnect`)
//! - Lifecycle event channel (`monitor`)
//! - TCP socket tuning (`tcp`)

// The tcp module needs raw fd/socket access for socket configuration
#![cfg_attr(not(test), deny(unsafe_code))]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod endpoint;
pub mod monitor;
pub mod options;
pub mod reconnect;
pub mod socket_type;
pub mod tcp;

pub mod prelude {
    pub use crate::endpoint::{Endpoint, EndpointError, Transport};
    pub use crate::monitor::{create_monitor, SocketEvent, SocketEventSender, SocketMonitor};
    pub use crate::options::SocketOptions;
    pub use crate::reconnect::{RetryError, RetryState};
    pub use crate::socket_type::SocketType;
    pub use crate::tcp::set_tcp_nodelay;
}
