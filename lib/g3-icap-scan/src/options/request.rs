/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use super::IcapServiceOptions;
use crate::respmod::EncapsulatedPayload;
use crate::{IcapClientConnection, IcapScanError, IcapServiceConfig};

pub(crate) struct IcapOptionsRequest<'a> {
    config: &'a IcapServiceConfig,
}

impl<'a> IcapOptionsRequest<'a> {
    pub(crate) fn new(config: &'a IcapServiceConfig) -> Self {
        IcapOptionsRequest { config }
    }

    pub(crate) async fn get_options(
        &self,
        conn: &mut IcapClientConnection,
    ) -> Result<IcapServiceOptions, IcapScanError> {
        let header = self.config.build_options_request();
        conn.write_all(&header).await?;
        conn.flush().await?;

        let headers = conn.recv_header(self.config.icap_max_header_size).await?;
        if let Some(v) = headers.get_ignore_case("Encapsulated") {
            let payload = EncapsulatedPayload::parse(v)?;
            if payload.has_body() {
                // opt-body is not used, but it must be consumed
                let _ = conn
                    .recv_chunked_body(self.config.max_response_body_size)
                    .await?;
            }
        }

        let options = IcapServiceOptions::parse(headers)?;
        Ok(options)
    }
}
