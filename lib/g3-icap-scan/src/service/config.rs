/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io::Write;
use std::time::Duration;

use url::Url;

use super::IcapConnectionKey;
use crate::ScanEngine;

const DEFAULT_USER_AGENT: &str = concat!("g3-icap-scan/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Debug)]
pub struct IcapServiceConfig {
    key: IcapConnectionKey,
    pub(crate) engine: ScanEngine,
    pub(crate) preview_size: Option<usize>,
    pub(crate) max_idle_time: Option<Duration>,
    pub(crate) connect_timeout: Duration,
    pub(crate) read_timeout: Duration,
    pub(crate) write_timeout: Duration,
    user_agent: String,
    pub(crate) icap_max_header_size: usize,
    pub(crate) max_response_body_size: usize,
    pub(crate) trust_cached_istag: bool,
    pub(crate) tcp_keepalive: bool,
}

impl IcapServiceConfig {
    pub fn new(key: IcapConnectionKey) -> Self {
        IcapServiceConfig {
            key,
            engine: ScanEngine::default(),
            preview_size: None,
            max_idle_time: None,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(60),
            write_timeout: Duration::from_secs(60),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            icap_max_header_size: 8192,
            max_response_body_size: 64 * 1024,
            trust_cached_istag: false,
            tcp_keepalive: true,
        }
    }

    pub fn from_url(url: &Url) -> anyhow::Result<Self> {
        let key = IcapConnectionKey::try_from(url)?;
        Ok(IcapServiceConfig::new(key))
    }

    #[inline]
    pub fn key(&self) -> &IcapConnectionKey {
        &self.key
    }

    #[inline]
    pub fn engine(&self) -> ScanEngine {
        self.engine
    }

    pub fn set_engine(&mut self, engine: ScanEngine) {
        self.engine = engine;
    }

    /// Use a fixed preview size and skip the OPTIONS negotiation.
    pub fn set_preview_size(&mut self, size: usize) {
        self.preview_size = Some(size);
    }

    pub fn set_max_idle_time(&mut self, time: Duration) {
        self.max_idle_time = Some(time);
    }

    pub fn set_connect_timeout(&mut self, timeout: Duration) {
        self.connect_timeout = timeout;
    }

    pub fn set_read_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }

    pub fn set_write_timeout(&mut self, timeout: Duration) {
        self.write_timeout = timeout;
    }

    pub fn set_user_agent(&mut self, user_agent: &str) {
        self.user_agent = user_agent.to_string();
    }

    pub fn set_icap_max_header_size(&mut self, max_size: usize) {
        self.icap_max_header_size = max_size;
    }

    pub fn set_max_response_body_size(&mut self, max_size: usize) {
        self.max_response_body_size = max_size;
    }

    pub fn set_trust_cached_istag(&mut self, trust: bool) {
        self.trust_cached_istag = trust;
    }

    pub fn set_tcp_keepalive(&mut self, enable: bool) {
        self.tcp_keepalive = enable;
    }

    pub(crate) fn build_options_request(&self) -> Vec<u8> {
        let mut header = Vec::with_capacity(256);
        self.write_header(&mut header, "OPTIONS");
        header.extend_from_slice(b"Encapsulated: null-body=0\r\n\r\n");
        header
    }

    pub(crate) fn write_header(&self, header: &mut Vec<u8>, method: &str) {
        let _ = write!(header, "{method} {} ICAP/1.0\r\n", self.key);
        let _ = write!(header, "Host: {}\r\n", self.key.host());
        let _ = write!(header, "User-Agent: {}\r\n", self.user_agent);
    }
}
