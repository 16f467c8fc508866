/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fmt;

/// An immutable byte pattern together with its KMP failure table.
///
/// `prefixes[i]` is the length of the longest proper prefix of
/// `pattern[..=i]` which is also a suffix of it.
#[derive(Clone, PartialEq, Eq)]
pub struct KmpPattern {
    bytes: Box<[u8]>,
    prefixes: Box<[usize]>,
}

impl KmpPattern {
    /// # Panics
    ///
    /// Panics if `pattern` is empty.
    pub fn new(pattern: &[u8]) -> Self {
        assert!(!pattern.is_empty(), "kmp pattern must not be empty");

        let mut prefixes = vec![0usize; pattern.len()];
        let mut k = 0;
        for i in 1..pattern.len() {
            while k > 0 && pattern[i] != pattern[k] {
                k = prefixes[k - 1];
            }
            if pattern[i] == pattern[k] {
                k += 1;
            }
            prefixes[i] = k;
        }

        KmpPattern {
            bytes: Box::from(pattern),
            prefixes: prefixes.into_boxed_slice(),
        }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub(super) fn fallback(&self, matched: usize) -> usize {
        self.prefixes[matched - 1]
    }
}

impl fmt::Debug for KmpPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KmpPattern")
            .field("bytes", &self.bytes.escape_ascii().to_string())
            .field("prefixes", &self.prefixes)
            .finish()
    }
}
