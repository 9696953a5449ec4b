//! TCP socket tuning.
//!
//! compio's `TcpStream` does not expose socket options directly, so these
//! helpers borrow the underlying descriptor through `socket2`.
//!
//! # Safety
//!
//! The descriptor is wrapped in `ManuallyDrop` so the borrowed `socket2::Socket`
//! never closes it; ownership stays with the compio stream.

#![allow(unsafe_code)]

use std::io;
use std::mem::ManuallyDrop;

/// Toggle `TCP_NODELAY` on a connected stream.
///
/// # Errors
///
/// Returns an error if the socket option cannot be set.
#[inline]
pub fn set_tcp_nodelay(stream: &compio::net::TcpStream, nodelay: bool) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::io::{AsRawFd, FromRawFd};
        let sock = ManuallyDrop::new(unsafe { socket2::Socket::from_raw_fd(stream.as_raw_fd()) });
        sock.set_nodelay(nodelay)
    }

    #[cfg(windows)]
    {
        use std::os::windows::io::{AsRawSocket, FromRawSocket};
        let sock =
            ManuallyDrop::new(unsafe { socket2::Socket::from_raw_socket(stream.as_raw_socket()) });
        sock.set_nodelay(nodelay)
    }

    #[cfg(not(any(unix, windows)))]
    {
        let _ = (stream, nodelay);
        Ok(())
    }
}
