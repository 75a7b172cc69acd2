// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded character reservoir used as a channel's reconnect snapshot.
//!
//! Unlike a fixed circular array, this buffer grows up to `max_chars` and
//! then trims from the front: the first stored chunk is prefix-trimmed
//! when it only partially overflows, and whole chunks are dropped when
//! they overflow entirely. This keeps `dump()` a contiguous byte slice
//! equal to the suffix of everything ever pushed, which is what a
//! WebSocket reconnect snapshot needs.

use std::collections::VecDeque;

/// A bounded reservoir of raw bytes (code units, not graphemes).
#[derive(Debug)]
pub struct RingBuffer {
    max_chars: usize,
    chunks: VecDeque<Vec<u8>>,
    total_len: usize,
}

impl RingBuffer {
    /// Create a reservoir capped at `max_chars` bytes.
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars, chunks: VecDeque::new(), total_len: 0 }
    }

    /// Append bytes, trimming the oldest bytes if the cap is exceeded.
    pub fn push(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        if data.len() >= self.max_chars {
            // A single push already covers (or exceeds) the cap: keep only
            // the tail, nothing older can possibly remain visible.
            self.chunks.clear();
            self.chunks.push_back(data[data.len() - self.max_chars..].to_vec());
            self.total_len = self.max_chars;
            return;
        }

        self.chunks.push_back(data.to_vec());
        self.total_len += data.len();
        self.evict_overflow();
    }

    fn evict_overflow(&mut self) {
        while self.total_len > self.max_chars {
            let overflow = self.total_len - self.max_chars;
            let Some(front) = self.chunks.front_mut() else { break };
            if front.len() <= overflow {
                self.total_len -= front.len();
                self.chunks.pop_front();
            } else {
                front.drain(..overflow);
                self.total_len -= overflow;
            }
        }
    }

    /// Return the full current contents as one contiguous buffer.
    pub fn dump(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total_len);
        for chunk in &self.chunks {
            out.extend_from_slice(chunk);
        }
        out
    }

    /// Discard all buffered bytes.
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.total_len = 0;
    }

    /// Current number of buffered bytes (`<= max_chars`).
    pub fn size(&self) -> usize {
        self.total_len
    }

    /// The configured capacity.
    pub fn capacity(&self) -> usize {
        self.max_chars
    }
}

#[cfg(test)]
#[path = "ring_tests.rs"]
mod tests;
