/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::future::Future;
use std::io;
use std::mem;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use tokio::io::AsyncBufRead;

use crate::kmp::{KmpMatcher, KmpPattern};

pub struct LimitedReadUntilPattern<'a, 'p, R: ?Sized> {
    reader: &'a mut R,
    matcher: KmpMatcher<'p>,
    buf: &'a mut Vec<u8>,
    read: usize,
    limit: usize,
}

impl<'a, 'p, R> LimitedReadUntilPattern<'a, 'p, R>
where
    R: AsyncBufRead + ?Sized + Unpin,
{
    pub(super) fn new(
        reader: &'a mut R,
        pattern: &'p KmpPattern,
        max_len: usize,
        buf: &'a mut Vec<u8>,
    ) -> Self {
        Self {
            reader,
            matcher: KmpMatcher::new(pattern),
            buf,
            read: 0,
            limit: max_len,
        }
    }
}

fn read_until_pattern_internal<R: AsyncBufRead + ?Sized>(
    mut reader: Pin<&mut R>,
    cx: &mut Context<'_>,
    matcher: &mut KmpMatcher<'_>,
    buf: &mut Vec<u8>,
    read: &mut usize,
    limit: usize,
) -> Poll<io::Result<(bool, usize)>> {
    loop {
        let (done, used) = {
            let available = ready!(reader.as_mut().poll_fill_buf(cx))?;
            let allowed = limit.saturating_sub(*read).min(available.len());
            if let Some(i) = matcher.scan(&available[..allowed]) {
                buf.extend_from_slice(&available[..i]);
                (true, i)
            } else {
                buf.extend_from_slice(&available[..allowed]);
                (false, allowed)
            }
        };
        reader.as_mut().consume(used);
        *read += used;
        if done {
            return Poll::Ready(Ok((true, mem::replace(read, 0))));
        }
        // eof or limit reached
        if used == 0 {
            return Poll::Ready(Ok((false, mem::replace(read, 0))));
        }
    }
}

impl<R: AsyncBufRead + ?Sized + Unpin> Future for LimitedReadUntilPattern<'_, '_, R> {
    type Output = io::Result<(bool, usize)>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let Self {
            reader,
            matcher,
            buf,
            read,
            limit,
        } = &mut *self;
        read_until_pattern_internal(Pin::new(reader), cx, matcher, buf, read, *limit)
    }
}
