/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use atoi::FromRadix10;

use super::IcapLineParseError;

/// Status line of an ICAP response or of an encapsulated HTTP response.
pub(crate) struct StatusLine<'a> {
    pub(crate) version: &'a str,
    pub(crate) code: u16,
    pub(crate) reason: &'a str,
}

impl<'a> StatusLine<'a> {
    pub(crate) fn parse(buf: &'a [u8]) -> Result<StatusLine<'a>, IcapLineParseError> {
        const MINIMAL_LENGTH: usize = 12; // ICAP/1.0 XYZ

        let line = std::str::from_utf8(buf)?.trim_end();
        if line.len() < MINIMAL_LENGTH {
            return Err(IcapLineParseError::NotLongEnough);
        }

        let p = memchr::memchr(b' ', line.as_bytes())
            .ok_or(IcapLineParseError::NoDelimiterFound(' '))?;
        let version = &line[0..p];
        if !(version.starts_with("ICAP/") || version.starts_with("HTTP/")) {
            return Err(IcapLineParseError::InvalidVersion);
        }

        let left = &line.as_bytes()[p + 1..];
        let (code, len) = u16::from_radix_10(left);
        if len != 3 {
            return Err(IcapLineParseError::InvalidStatusCode);
        }
        let reason = match left.get(len) {
            None => "",
            Some(b' ') => line[p + 1 + len..].trim(),
            Some(_) => return Err(IcapLineParseError::InvalidStatusCode),
        };

        Ok(StatusLine {
            version,
            code,
            reason,
        })
    }
}
