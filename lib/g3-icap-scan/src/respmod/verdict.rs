/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use crate::parse::ResponseHeaders;

/// Outcome of one scan.
#[derive(Clone, Debug)]
pub struct ScanVerdict {
    clean: bool,
    diagnostic: Option<String>,
    headers: ResponseHeaders,
    http_headers: Option<ResponseHeaders>,
    http_body: Option<String>,
    istag: Option<String>,
    cached: bool,
}

impl ScanVerdict {
    pub(crate) fn new(
        clean: bool,
        diagnostic: Option<String>,
        rsp: super::IcapRespmodResponse,
        istag: Option<String>,
    ) -> Self {
        ScanVerdict {
            clean,
            diagnostic,
            headers: rsp.icap,
            http_headers: rsp.http_headers,
            http_body: rsp.http_body,
            istag,
            cached: false,
        }
    }

    pub(crate) fn cached(istag: &str) -> Self {
        ScanVerdict {
            clean: true,
            diagnostic: None,
            headers: ResponseHeaders::default(),
            http_headers: None,
            http_body: None,
            istag: Some(istag.to_string()),
            cached: true,
        }
    }

    #[inline]
    pub fn is_clean(&self) -> bool {
        self.clean
    }

    pub fn diagnostic(&self) -> Option<&str> {
        self.diagnostic.as_deref()
    }

    /// Headers of the final ICAP response, empty for a cached verdict.
    #[inline]
    pub fn headers(&self) -> &ResponseHeaders {
        &self.headers
    }

    pub fn http_headers(&self) -> Option<&ResponseHeaders> {
        self.http_headers.as_ref()
    }

    pub fn http_body(&self) -> Option<&str> {
        self.http_body.as_deref()
    }

    pub fn istag(&self) -> Option<&str> {
        self.istag.as_deref()
    }

    /// The scan was skipped as the caller supplied the current ISTag.
    #[inline]
    pub fn is_cached(&self) -> bool {
        self.cached
    }

    /// Vendor specific `X-` headers of the final ICAP response.
    pub fn vendor_headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().filter(|(name, _)| {
            name.len() > 2 && name.as_bytes()[..2].eq_ignore_ascii_case(b"X-")
        })
    }
}
