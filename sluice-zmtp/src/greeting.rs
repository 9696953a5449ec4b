use crate::codec::{Result, ZmtpError};

/// ZMTP Greeting is always exactly 64 bytes
pub const GREETING_SIZE: usize = 64;

/// Version we advertise (ZMTP 3.1).
pub const VERSION_MAJOR: u8 = 3;
pub const VERSION_MINOR: u8 = 1;

const SIGNATURE_HEAD: u8 = 0xFF;
const SIGNATURE_TAIL: u8 = 0x7F;
const MECHANISM_OFFSET: usize = 12;
const MECHANISM_LEN: usize = 20;
const AS_SERVER_OFFSET: usize = 32;

/// Greeting exchanged before any framed traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZmtpGreeting {
    pub major: u8,
    pub minor: u8,
    pub mechanism: String,
    pub as_server: bool,
}

impl ZmtpGreeting {
    /// Our own greeting for the given mechanism name.
    pub fn new(mechanism: &str, as_server: bool) -> Self {
        Self {
            major: VERSION_MAJOR,
            minor: VERSION_MINOR,
            mechanism: mechanism.to_string(),
            as_server,
        }
    }

    /// Encode to the fixed 64-byte layout.
    ///
    /// ```text
    /// [0]      0xFF
    /// [1..9]   Padding
    /// [9]      0x7F
    /// [10]     Major version
    /// [11]     Minor version
    /// [12..32] Mechanism (ASCII, null-padded)
    /// [32]     As-Server flag
    /// [33..64] Padding
    /// ```
    ///
    /// Mechanism names longer than 20 bytes are truncated.
    pub fn encode(&self) -> [u8; GREETING_SIZE] {
        let mut out = [0u8; GREETING_SIZE];
        out[0] = SIGNATURE_HEAD;
        out[9] = SIGNATURE_TAIL;
        out[10] = self.major;
        out[11] = self.minor;

        let name = self.mechanism.as_bytes();
        let len = name.len().min(MECHANISM_LEN);
        out[MECHANISM_OFFSET..MECHANISM_OFFSET + len].copy_from_slice(&name[..len]);

        out[AS_SERVER_OFFSET] = u8::from(self.as_server);
        out
    }

    /// Parse a peer greeting.
    ///
    /// Accepts any ZMTP 3.x (or later) version so peers advertising 3.0
    /// interoperate with our 3.1.
    pub fn parse(src: &[u8]) -> Result<Self> {
        if src.len() < GREETING_SIZE {
            return Err(ZmtpError::InvalidGreeting("short greeting"));
        }

        if src[0] != SIGNATURE_HEAD || src[9] != SIGNATURE_TAIL {
            return Err(ZmtpError::InvalidGreeting("bad signature"));
        }

        let major = src[10];
        if major < VERSION_MAJOR {
            return Err(ZmtpError::InvalidGreeting("unsupported version"));
        }

        let raw = &src[MECHANISM_OFFSET..MECHANISM_OFFSET + MECHANISM_LEN];
        let mechanism = std::str::from_utf8(raw)
            .map_err(|_| ZmtpError::InvalidGreeting("mechanism is not ASCII"))?
            .trim_end_matches('\0')
            .to_string();

        Ok(Self {
            major,
            minor: src[11],
            mechanism,
            as_server: (src[AS_SERVER_OFFSET] & 0x01) != 0,
        })
    }
}
