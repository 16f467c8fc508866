/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io::Write;

use bytes::BufMut;

use crate::IcapServiceConfig;

const HTTP_RESPONSE_HEADER: &[u8] = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n";

const PREVIEW_EOF_CHUNK: &[u8] = b"0; ieof\r\n\r\n";
pub(crate) const LAST_CHUNK: &[u8] = b"0\r\n\r\n";

fn build_http_request_header(config: &IcapServiceConfig, name: &str) -> Vec<u8> {
    let key = config.key();
    let mut header = Vec::with_capacity(64 + name.len());
    header.put_slice(b"GET /");
    for s in url::form_urlencoded::byte_serialize(name.as_bytes()) {
        header.put_slice(s.as_bytes());
    }
    let _ = write!(
        header,
        " HTTP/1.1\r\nHost: {}:{}\r\n\r\n",
        key.host(),
        key.port()
    );
    header
}

pub(crate) fn write_chunk_header(buf: &mut Vec<u8>, len: usize) {
    let _ = write!(buf, "{len:x}\r\n");
}

/// Build the RESPMOD request up to and including the preview terminator.
pub(crate) fn build_preview_request(
    config: &IcapServiceConfig,
    name: &str,
    preview: &[u8],
    preview_eof: bool,
) -> Vec<u8> {
    let http_header = build_http_request_header(config, name);
    let res_hdr = http_header.len();
    let res_body = res_hdr + HTTP_RESPONSE_HEADER.len();

    let mut buf = Vec::with_capacity(512 + res_body + preview.len());
    config.write_header(&mut buf, "RESPMOD");
    buf.put_slice(b"Allow: 204\r\n");
    let _ = write!(buf, "Preview: {}\r\n", preview.len());
    let _ = write!(
        buf,
        "Encapsulated: req-hdr=0, res-hdr={res_hdr}, res-body={res_body}\r\n\r\n"
    );
    buf.put_slice(&http_header);
    buf.put_slice(HTTP_RESPONSE_HEADER);
    if !preview.is_empty() {
        write_chunk_header(&mut buf, preview.len());
        buf.put_slice(preview);
        buf.put_slice(b"\r\n");
    }
    if preview_eof {
        buf.put_slice(PREVIEW_EOF_CHUNK);
    } else {
        buf.put_slice(LAST_CHUNK);
    }
    buf
}
