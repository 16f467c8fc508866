/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use anyhow::anyhow;
use url::Url;

pub const DEFAULT_ICAP_PORT: u16 = 1344;

/// Identity of one ICAP service endpoint.
///
/// Two keys are equal if they render to the same `icap://host:port/service`.
#[derive(Clone, Debug)]
pub struct IcapConnectionKey {
    host: String,
    port: u16,
    service: String,
    rendered: String,
}

impl IcapConnectionKey {
    pub fn new(host: &str, port: u16, service: &str) -> Self {
        let service = service.trim_start_matches('/').to_string();
        let rendered = format!("icap://{host}:{port}/{service}");
        IcapConnectionKey {
            host: host.to_string(),
            port,
            service,
            rendered,
        }
    }

    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The host part usable for name resolution, without IPv6 brackets.
    pub(crate) fn lookup_host(&self) -> &str {
        self.host.trim_start_matches('[').trim_end_matches(']')
    }

    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[inline]
    pub fn service(&self) -> &str {
        &self.service
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.rendered
    }
}

impl PartialEq for IcapConnectionKey {
    fn eq(&self, other: &Self) -> bool {
        self.rendered == other.rendered
    }
}

impl Eq for IcapConnectionKey {}

impl Hash for IcapConnectionKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rendered.hash(state);
    }
}

impl fmt::Display for IcapConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

impl TryFrom<&Url> for IcapConnectionKey {
    type Error = anyhow::Error;

    fn try_from(url: &Url) -> Result<Self, Self::Error> {
        if !url.scheme().eq_ignore_ascii_case("icap") {
            return Err(anyhow!("unsupported url scheme {}", url.scheme()));
        }
        let host = url
            .host_str()
            .ok_or_else(|| anyhow!("no host found in url"))?;
        let port = url.port().unwrap_or(DEFAULT_ICAP_PORT);
        Ok(IcapConnectionKey::new(host, port, url.path()))
    }
}

impl FromStr for IcapConnectionKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(s).map_err(|e| anyhow!("invalid url: {e}"))?;
        IcapConnectionKey::try_from(&url)
    }
}
