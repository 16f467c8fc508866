/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use super::EncapsulatedPayload;
use crate::parse::ResponseHeaders;
use crate::{IcapClientConnection, IcapScanError, IcapServiceConfig};

/// One ICAP response with its encapsulated HTTP response, if any.
pub(crate) struct IcapRespmodResponse {
    pub(crate) icap: ResponseHeaders,
    pub(crate) http_headers: Option<ResponseHeaders>,
    pub(crate) http_body: Option<String>,
}

impl IcapRespmodResponse {
    /// Receive a response and drain the encapsulated payload so the
    /// connection stays usable for the next request.
    pub(crate) async fn recv(
        conn: &mut IcapClientConnection,
        config: &IcapServiceConfig,
    ) -> Result<Self, IcapScanError> {
        let icap = conn.recv_header(config.icap_max_header_size).await?;
        let payload = match icap.get_ignore_case("Encapsulated") {
            Some(v) => EncapsulatedPayload::parse(v)?,
            None => EncapsulatedPayload::default(),
        };

        if payload.has_request_header() {
            let _ = conn.recv_raw_header(config.icap_max_header_size).await?;
        }
        let http_headers = if payload.has_response_header() {
            Some(conn.recv_header(config.icap_max_header_size).await?)
        } else {
            None
        };
        let http_body = if payload.has_body() {
            let body = conn
                .recv_chunked_body(config.max_response_body_size)
                .await?;
            Some(String::from_utf8_lossy(&body).into_owned())
        } else {
            None
        };

        Ok(IcapRespmodResponse {
            icap,
            http_headers,
            http_body,
        })
    }
}
