//! Splits raw transport reads into newline-terminated protocol lines.

use alloc::string::String;
use alloc::vec::Vec;

use super::RECV_CHUNK_SIZE;

/// Accumulates bytes across reads and yields complete lines.
///
/// A line that arrives split across two reads is reassembled from the
/// residual buffer; a truncated line is never handed to the parser. Lines
/// longer than [`RECV_CHUNK_SIZE`] cannot be valid protocol traffic and are
/// discarded up to the next newline, as are lines that are not UTF-8.
pub(crate) struct LineBuffer {
    residual: heapless::Vec<u8, RECV_CHUNK_SIZE>,
    overflowed: bool,
}

impl LineBuffer {
    pub(crate) fn new() -> Self {
        Self {
            residual: heapless::Vec::new(),
            overflowed: false,
        }
    }

    /// Feed one read chunk; returns the complete lines it finished, in wire
    /// order, without their terminators.
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            if byte == b'\n' {
                if self.overflowed {
                    self.overflowed = false;
                } else if let Some(line) = self.take_line() {
                    lines.push(line);
                }
                self.residual.clear();
            } else if self.overflowed {
                // Draining an oversized line; drop bytes until its newline.
            } else if self.residual.push(byte).is_err() {
                self.overflowed = true;
                self.residual.clear();
            }
        }
        lines
    }

    fn take_line(&self) -> Option<String> {
        let mut bytes: &[u8] = &self.residual;
        if let [head @ .., b'\r'] = bytes {
            bytes = head;
        }
        if bytes.is_empty() {
            return None;
        }
        match core::str::from_utf8(bytes) {
            Ok(line) => Some(String::from(line)),
            Err(_) => None,
        }
    }
}
