/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::time::{Duration, Instant};

use atoi::FromRadix10Checked;
use log::debug;

use super::IcapOptionsError;
use crate::parse::ResponseHeaders;

/// Upper bound of the preview size, the preview is buffered before sending.
pub const MAX_PREVIEW_SIZE: usize = 64 * 1024;

/// Result of an OPTIONS negotiation.
#[derive(Clone, Debug)]
pub struct IcapServiceOptions {
    preview_size: usize,
    options_ttl: Option<Duration>,
    expire: Option<Instant>,
    headers: ResponseHeaders,
}

fn parse_number<T: FromRadix10Checked>(value: &str) -> Option<T> {
    let value = value.trim();
    let (v, len) = T::from_radix_10_checked(value.as_bytes());
    if len == 0 || len != value.len() {
        None
    } else {
        v
    }
}

impl IcapServiceOptions {
    pub(crate) fn parse(headers: ResponseHeaders) -> Result<Self, IcapOptionsError> {
        if headers.status_code() != 200 {
            return Err(IcapOptionsError::RequestFailed(
                headers.status_code(),
                headers.reason().to_string(),
            ));
        }

        let preview_size = headers
            .get("Preview")
            .ok_or(IcapOptionsError::NoPreviewSize)?;
        let mut preview_size = parse_number::<usize>(preview_size)
            .ok_or(IcapOptionsError::InvalidHeaderValue("Preview"))?;
        if preview_size > MAX_PREVIEW_SIZE {
            debug!("ICAP server preview size {preview_size} reduced to {MAX_PREVIEW_SIZE}");
            preview_size = MAX_PREVIEW_SIZE;
        }

        let options_ttl = match headers.get("Options-TTL") {
            Some(v) => {
                let secs = parse_number::<u64>(v)
                    .ok_or(IcapOptionsError::InvalidHeaderValue("Options-TTL"))?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };
        let expire = options_ttl.and_then(|ttl| Instant::now().checked_add(ttl));

        Ok(IcapServiceOptions {
            preview_size,
            options_ttl,
            expire,
            headers,
        })
    }

    #[inline]
    pub fn preview_size(&self) -> usize {
        self.preview_size
    }

    #[inline]
    pub fn options_ttl(&self) -> Option<Duration> {
        self.options_ttl
    }

    pub fn istag(&self) -> Option<&str> {
        self.headers.istag()
    }

    #[inline]
    pub fn headers(&self) -> &ResponseHeaders {
        &self.headers
    }

    pub fn expired(&self, now: Instant) -> bool {
        self.expire.is_some_and(|t| now >= t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Result<IcapServiceOptions, IcapOptionsError> {
        IcapServiceOptions::parse(ResponseHeaders::parse(raw.as_bytes()).unwrap())
    }

    #[test]
    fn full() {
        let options = parse(
            "ICAP/1.0 200 OK\r\nMethods: RESPMOD\r\nPreview: 1024\r\n\
             Options-TTL: 3600\r\nISTag: \"5BDEEEA9-12E4-2\"\r\n\r\n",
        )
        .unwrap();
        assert_eq!(options.preview_size(), 1024);
        assert_eq!(options.options_ttl(), Some(Duration::from_secs(3600)));
        assert_eq!(options.istag(), Some("\"5BDEEEA9-12E4-2\""));
        assert!(!options.expired(Instant::now()));
        assert!(options.expired(Instant::now() + Duration::from_secs(3601)));
    }

    #[test]
    fn no_ttl() {
        let options = parse("ICAP/1.0 200 OK\r\nPreview: 0\r\n\r\n").unwrap();
        assert_eq!(options.preview_size(), 0);
        assert_eq!(options.options_ttl(), None);
        assert_eq!(options.istag(), None);
        assert!(!options.expired(Instant::now() + Duration::from_secs(86400)));
    }

    #[test]
    fn large_preview() {
        let options = parse("ICAP/1.0 200 OK\r\nPreview: 1073741824\r\n\r\n").unwrap();
        assert_eq!(options.preview_size(), MAX_PREVIEW_SIZE);

        let options = parse("ICAP/1.0 200 OK\r\nPreview: 65536\r\n\r\n").unwrap();
        assert_eq!(options.preview_size(), 65536);
    }

    #[test]
    fn no_preview() {
        let e = parse("ICAP/1.0 200 OK\r\nISTag: x\r\n\r\n").unwrap_err();
        assert!(matches!(e, IcapOptionsError::NoPreviewSize));
    }

    #[test]
    fn failed() {
        let e = parse("ICAP/1.0 404 Service Not Found\r\nPreview: 1024\r\n\r\n").unwrap_err();
        assert!(matches!(e, IcapOptionsError::RequestFailed(404, _)));
    }

    #[test]
    fn invalid_value() {
        let e = parse("ICAP/1.0 200 OK\r\nPreview: 1k\r\n\r\n").unwrap_err();
        assert!(matches!(e, IcapOptionsError::InvalidHeaderValue("Preview")));
        let e = parse("ICAP/1.0 200 OK\r\nPreview: 10\r\nOptions-TTL: -1\r\n\r\n").unwrap_err();
        assert!(matches!(e, IcapOptionsError::InvalidHeaderValue("Options-TTL")));
        let e = parse("ICAP/1.0 200 OK\r\nPreview: 99999999999999999999999\r\n\r\n")
            .unwrap_err();
        assert!(matches!(e, IcapOptionsError::InvalidHeaderValue("Preview")));
    }
}
