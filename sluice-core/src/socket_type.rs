//! Socket type enumeration.
//!
//! The socket type is advertised to the peer in the `Socket-Type` property of
//! the READY command, and decides both framing (single-frame vs multipart
//! delivery) and routing (ROUTER addresses peers by identity).

use std::fmt;

/// ZeroMQ socket types.
///
/// Discriminants follow the libzmq `ZMQ_*` constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SocketType {
    Pair = 0,
    Pub = 1,
    Sub = 2,
    Req = 3,
    Rep = 4,
    /// Asynchronous client side of request-reply, identity-agnostic
    Dealer = 5,
    /// Identity-addressed server side of request-reply
    Router = 6,
    /// Receiving end of a pipeline
    Pull = 7,
    /// Sending end of a pipeline
    Push = 8,
    XPub = 9,
    XSub = 10,
    /// Single-frame server (ZMTP 3.1)
    Server = 12,
    /// Single-frame client (ZMTP 3.1)
    Client = 13,
}

impl SocketType {
    /// Name as it appears on the wire.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pair => "PAIR",
            Self::Pub => "PUB",
            Self::Sub => "SUB",
            Self::Req => "REQ",
            Self::Rep => "REP",
            Self::Dealer => "DEALER",
            Self::Router => "ROUTER",
            Self::Pull => "PULL",
            Self::Push => "PUSH",
            Self::XPub => "XPUB",
            Self::XSub => "XSUB",
            Self::Server => "SERVER",
            Self::Client => "CLIENT",
        }
    }

    /// Parse the `Socket-Type` property value sent by a peer.
    pub fn from_wire(value: &[u8]) -> Option<Self> {
        let ty = match value {
            b"PAIR" => Self::Pair,
            b"PUB" => Self::Pub,
            b"SUB" => Self::Sub,
            b"REQ" => Self::Req,
            b"REP" => Self::Rep,
            b"DEALER" => Self::Dealer,
            b"ROUTER" => Self::Router,
            b"PULL" => Self::Pull,
            b"PUSH" => Self::Push,
            b"XPUB" => Self::XPub,
            b"XSUB" => Self::XSub,
            b"SERVER" => Self::Server,
            b"CLIENT" => Self::Client,
            _ => return None,
        };
        Some(ty)
    }

    /// Whether this socket type assembles multipart messages on receive.
    ///
    /// CLIENT, SERVER, PUSH and PULL deliver one frame per message.
    pub const fn is_multipart(&self) -> bool {
        matches!(self, Self::Dealer | Self::Router)
    }

    /// Check if this socket type may talk to the given peer type.
    pub fn is_compatible(&self, peer: SocketType) -> bool {
        matches!(
            (self, peer),
            (Self::Pair, Self::Pair)
                | (Self::Pub, Self::Sub | Self::XSub)
                | (Self::Sub, Self::Pub | Self::XPub)
                | (Self::XPub, Self::Sub | Self::XSub)
                | (Self::XSub, Self::Pub | Self::XPub)
                | (Self::Req, Self::Rep | Self::Router)
                | (Self::Rep, Self::Req | Self::Dealer)
                | (Self::Dealer, Self::Rep | Self::Dealer | Self::Router)
                | (Self::Router, Self::Req | Self::Dealer | Self::Router)
                | (Self::Push, Self::Pull)
                | (Self::Pull, Self::Push)
                | (Self::Client, Self::Server)
                | (Self::Server, Self::Client)
        )
    }
}

impl fmt::Display for SocketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
