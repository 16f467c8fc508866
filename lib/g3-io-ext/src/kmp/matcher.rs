/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use super::KmpPattern;

/// Per-stream search state for a [`KmpPattern`].
///
/// Every byte read from the stream is fed once, the total work is linear
/// in the stream length whatever the pattern looks like.
#[derive(Debug, Clone)]
pub struct KmpMatcher<'a> {
    pattern: &'a KmpPattern,
    matched: usize,
    pos: u64,
    mark: u64,
    found: bool,
}

impl<'a> KmpMatcher<'a> {
    pub fn new(pattern: &'a KmpPattern) -> Self {
        KmpMatcher {
            pattern,
            matched: 0,
            pos: 0,
            mark: 0,
            found: false,
        }
    }

    /// Search for a new terminator, the stream position is kept.
    pub fn arm(&mut self, pattern: &'a KmpPattern) {
        self.pattern = pattern;
        self.matched = 0;
        self.found = false;
    }

    #[inline]
    pub fn pattern(&self) -> &'a KmpPattern {
        self.pattern
    }

    /// Feed one byte, return true if it completes the pattern.
    pub fn feed(&mut self, b: u8) -> bool {
        let p = self.pattern.as_bytes();
        self.pos += 1;
        while self.matched > 0 && p[self.matched] != b {
            self.matched = self.pattern.fallback(self.matched);
        }
        if p[self.matched] == b {
            self.matched += 1;
        }
        if self.matched == p.len() {
            self.matched = self.pattern.fallback(self.matched);
            self.found = true;
        } else {
            self.found = false;
        }
        self.found
    }

    /// Feed `buf` until the pattern completes.
    ///
    /// Returns the number of bytes fed, including the last byte of the
    /// pattern, or `None` if the whole buffer has been fed without a match.
    pub fn scan(&mut self, buf: &[u8]) -> Option<usize> {
        for (i, b) in buf.iter().enumerate() {
            if self.feed(*b) {
                return Some(i + 1);
            }
        }
        None
    }

    /// Whether the last fed byte completed the pattern.
    #[inline]
    pub fn found(&self) -> bool {
        self.found
    }

    /// Count of bytes fed since creation or the last [`reset`](Self::reset).
    #[inline]
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Stream offset of the first byte of the match.
    pub fn index_of(&self) -> Option<u64> {
        self.found.then(|| self.pos - self.pattern.len() as u64)
    }

    /// Stream offset of the last byte of the match.
    pub fn position_of_match(&self) -> Option<u64> {
        self.found.then(|| self.pos - 1)
    }

    pub fn mark(&mut self) {
        self.mark = self.pos;
    }

    /// Rewind to the last mark and forget any partial match.
    pub fn reset(&mut self) {
        self.pos = self.mark;
        self.matched = 0;
        self.found = false;
    }
}
