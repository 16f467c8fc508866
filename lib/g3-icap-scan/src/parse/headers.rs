/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use ahash::AHashMap;

use super::{HeaderLine, IcapLineParseError, StatusLine};

/// Synthetic key holding the status code taken from the status line.
pub const STATUS_CODE_KEY: &str = "StatusCode";

/// Header block of one ICAP response, or of an encapsulated HTTP response.
///
/// Header names are kept as sent by the server and compared case-sensitively,
/// a repeated header replaces the previous value.
#[derive(Clone, Debug, Default)]
pub struct ResponseHeaders {
    code: u16,
    reason: String,
    map: AHashMap<String, String>,
}

impl ResponseHeaders {
    /// Parse a terminator delimited header block.
    ///
    /// Parsing stops at the first empty line, folded lines are appended to
    /// the value of the header they follow.
    pub fn parse(buf: &[u8]) -> Result<Self, IcapLineParseError> {
        let mut lines = buf.split(|b| *b == b'\n').map(|line| match line {
            [left @ .., b'\r'] => left,
            _ => line,
        });

        let first = lines.next().ok_or(IcapLineParseError::EmptyResponse)?;
        let status = StatusLine::parse(first)?;
        let mut headers = ResponseHeaders {
            code: status.code,
            reason: status.reason.to_string(),
            map: AHashMap::new(),
        };
        headers
            .map
            .insert(STATUS_CODE_KEY.to_string(), status.code.to_string());

        let mut last_name: Option<&str> = None;
        for line in lines {
            if line.is_empty() {
                break;
            }
            match HeaderLine::parse(line)? {
                HeaderLine::Field { name, value } => {
                    headers.map.insert(name.to_string(), value.into_owned());
                    last_name = Some(name);
                }
                HeaderLine::Continuation(value) => {
                    let Some(name) = last_name else {
                        return Err(IcapLineParseError::OrphanContinuationLine);
                    };
                    if let Some(v) = headers.map.get_mut(name) {
                        v.push_str(&value);
                    }
                }
            }
        }

        Ok(headers)
    }

    #[inline]
    pub fn status_code(&self) -> u16 {
        self.code
    }

    #[inline]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(name).map(|v| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn istag(&self) -> Option<&str> {
        self.get("ISTag")
    }

    pub(crate) fn get_ignore_case(&self, name: &str) -> Option<&str> {
        self.map
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub(crate) fn keep_alive(&self) -> bool {
        !matches!(
            self.get_ignore_case("Connection"),
            Some(v) if v.eq_ignore_ascii_case("close")
        )
    }
}
