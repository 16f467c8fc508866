/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::borrow::Cow;

use super::IcapLineParseError;

/// One header line. Names must be valid utf-8, values are decoded lossily as
/// vendors put arbitrary bytes in them.
pub(crate) enum HeaderLine<'a> {
    Field { name: &'a str, value: Cow<'a, str> },
    /// a folded line, to be appended to the previous field value
    Continuation(Cow<'a, str>),
}

impl<'a> HeaderLine<'a> {
    pub(crate) fn parse(buf: &'a [u8]) -> Result<HeaderLine<'a>, IcapLineParseError> {
        if matches!(buf.first(), Some(b' ' | b'\t')) {
            let value = String::from_utf8_lossy(buf.trim_ascii());
            return Ok(HeaderLine::Continuation(value));
        }

        let p = memchr::memchr(b':', buf).ok_or(IcapLineParseError::NoDelimiterFound(':'))?;
        if p == 0 {
            return Err(IcapLineParseError::MissingHeaderName);
        }

        let name = std::str::from_utf8(&buf[0..p])?;
        let value = String::from_utf8_lossy(buf[p + 1..].trim_ascii());
        Ok(HeaderLine::Field { name, value })
    }
}
