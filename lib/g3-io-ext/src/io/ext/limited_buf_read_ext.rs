/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use tokio::io::AsyncBufRead;

use super::limited_read_until_pattern::LimitedReadUntilPattern;
use crate::kmp::KmpPattern;

pub trait LimitedBufReadExt: AsyncBufRead {
    /// Read into `buf` until `pattern` has been seen, but no more than `max_len` bytes.
    ///
    /// The bytes after the pattern are left in the reader. Resolves to
    /// `(found, nr)`, `found` is false if eof or `max_len` is reached first.
    fn limited_read_until_pattern<'a, 'p>(
        &'a mut self,
        pattern: &'p KmpPattern,
        max_len: usize,
        buf: &'a mut Vec<u8>,
    ) -> LimitedReadUntilPattern<'a, 'p, Self>
    where
        Self: Unpin,
    {
        LimitedReadUntilPattern::new(self, pattern, max_len, buf)
    }
}

impl<R: AsyncBufRead + ?Sized> LimitedBufReadExt for R {}
