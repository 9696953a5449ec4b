use crate::codec::{Result, ZmtpError, ZmtpFrame};
use bytes::Bytes;

/// Collects data frames until a complete multipart message is formed.
///
/// Invariants:
/// - Frames are appended in-order
/// - A message completes when `MORE == false`
/// - The byte limit is enforced eagerly, on the running total
///
/// Owned by a single delivery loop.
#[derive(Debug, Default)]
pub struct MultipartBuffer {
    frames: Vec<Bytes>,
    byte_count: usize,
    max_bytes: Option<usize>,
}

impl MultipartBuffer {
    pub fn new(max_bytes: Option<usize>) -> Self {
        Self {
            frames: Vec::new(),
            byte_count: 0,
            max_bytes,
        }
    }

    /// Push a frame into the buffer.
    ///
    /// Returns:
    /// - `Ok(None)` if the message is not complete
    /// - `Ok(Some(frames))` if a full message was assembled
    /// - `Err` once the limit is exceeded (buffer is reset)
    pub fn push_frame(&mut self, frame: ZmtpFrame) -> Result<Option<Vec<Bytes>>> {
        self.byte_count += frame.payload.len();
        if let Some(limit) = self.max_bytes {
            if self.byte_count > limit {
                self.reset();
                return Err(ZmtpError::MessageTooLarge { limit });
            }
        }

        let more = frame.more();
        self.frames.push(frame.payload);

        if more {
            return Ok(None);
        }
        let msg = std::mem::take(&mut self.frames);
        self.reset();
        Ok(Some(msg))
    }

    /// Frames received so far for the message in progress.
    pub fn take_partial(&mut self) -> Vec<Bytes> {
        let partial = std::mem::take(&mut self.frames);
        self.reset();
        partial
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[inline]
    fn reset(&mut self) {
        self.frames.clear();
        self.byte_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(payload: &'static [u8], more: bool) -> ZmtpFrame {
        ZmtpFrame::data(Bytes::from_static(payload), more)
    }

    #[test]
    fn test_assembles_until_more_clears() {
        let mut buf = MultipartBuffer::new(None);
        assert_eq!(buf.push_frame(frame(b"", true)).unwrap(), None);
        let msg = buf.push_frame(frame(b"GOODBYE", false)).unwrap().unwrap();
        assert_eq!(msg, vec![Bytes::new(), Bytes::from_static(b"GOODBYE")]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_limit_applies_to_total() {
        let mut buf = MultipartBuffer::new(Some(8));
        assert!(buf.push_frame(frame(b"12345", true)).unwrap().is_none());
        assert!(matches!(
            buf.push_frame(frame(b"6789", false)),
            Err(ZmtpError::MessageTooLarge { limit: 8 })
        ));
        assert!(buf.is_empty());

        // Fresh message after reset fits again
        assert!(buf.push_frame(frame(b"1234", false)).unwrap().is_some());
    }

    #[test]
    fn test_take_partial() {
        let mut buf = MultipartBuffer::new(None);
        buf.push_frame(frame(b"a", true)).unwrap();
        buf.push_frame(frame(b"b", true)).unwrap();
        assert_eq!(buf.take_partial().len(), 2);
        assert!(buf.is_empty());
    }
}
