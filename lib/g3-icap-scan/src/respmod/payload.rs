/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use atoi::{FromRadix10, FromRadix16Checked};

use crate::IcapScanError;

/// Sections announced by the `Encapsulated` header of an ICAP response.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct EncapsulatedPayload {
    req_hdr: bool,
    res_hdr: bool,
    body: bool,
}

impl EncapsulatedPayload {
    pub(crate) fn parse(value: &str) -> Result<Self, IcapScanError> {
        let mut payload = EncapsulatedPayload::default();

        for part in value.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (name, offset) = part.split_once('=').ok_or(
                IcapScanError::InvalidEncapsulatedHeader("no '=' in byte-offsets pair"),
            )?;
            let offset = offset.trim();
            let (_, len) = usize::from_radix_10(offset.as_bytes());
            if len == 0 || len != offset.len() {
                return Err(IcapScanError::InvalidEncapsulatedHeader(
                    "invalid byte-offsets value",
                ));
            }

            match name.trim().to_ascii_lowercase().as_str() {
                "req-hdr" => payload.req_hdr = true,
                "res-hdr" => payload.res_hdr = true,
                "req-body" | "res-body" | "opt-body" => payload.body = true,
                "null-body" => {}
                _ => {
                    return Err(IcapScanError::InvalidEncapsulatedHeader(
                        "unknown byte-offsets name",
                    ));
                }
            }
        }

        Ok(payload)
    }

    #[inline]
    pub(crate) fn has_request_header(&self) -> bool {
        self.req_hdr
    }

    #[inline]
    pub(crate) fn has_response_header(&self) -> bool {
        self.res_hdr
    }

    #[inline]
    pub(crate) fn has_body(&self) -> bool {
        self.body
    }
}

/// Parse the size in a chunk size line, chunk extensions are ignored.
pub(crate) fn parse_chunk_size(line: &[u8]) -> Option<usize> {
    let line = line.strip_suffix(b"\r\n").unwrap_or(line);
    let (size, len) = usize::from_radix_16_checked(line);
    if len == 0 {
        return None;
    }
    match line[len..].trim_ascii_start().first() {
        None | Some(b';') => size,
        Some(_) => None,
    }
}
