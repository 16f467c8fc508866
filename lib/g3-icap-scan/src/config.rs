/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;

use anyhow::{Context, anyhow};
use url::Url;
use yaml_rust::Yaml;

use crate::{DEFAULT_ICAP_PORT, IcapConnectionKey, IcapServiceConfig, ScanEngine};

fn parse_key(map: &yaml_rust::yaml::Hash) -> anyhow::Result<IcapConnectionKey> {
    let mut url: Option<Url> = None;
    let mut host: Option<String> = None;
    let mut port = DEFAULT_ICAP_PORT;
    let mut service: Option<String> = None;

    g3_yaml::foreach_kv(map, |k, v| match g3_yaml::normalize_key(k).as_str() {
        "url" => {
            let s = g3_yaml::value::as_string(v)?;
            url = Some(Url::parse(&s).map_err(|e| anyhow!("invalid url {s}: {e}"))?);
            Ok(())
        }
        "host" => {
            host = Some(g3_yaml::value::as_string(v)?);
            Ok(())
        }
        "port" => {
            port = g3_yaml::value::as_u16(v)
                .context(format!("invalid u16 value for key {k}"))?;
            Ok(())
        }
        "service" => {
            service = Some(g3_yaml::value::as_string(v)?);
            Ok(())
        }
        _ => Ok(()),
    })?;

    match (url, host, service) {
        (Some(url), None, None) => IcapConnectionKey::try_from(&url),
        (None, Some(host), Some(service)) => Ok(IcapConnectionKey::new(&host, port, &service)),
        (Some(_), _, _) => Err(anyhow!("url should not be used together with host or service")),
        _ => Err(anyhow!("either url or host and service should be set")),
    }
}

impl IcapServiceConfig {
    /// Parse from a yaml url string, or from a map with the url or
    /// host / port / service keys, and the optional settings.
    pub fn parse_yaml(value: &Yaml) -> anyhow::Result<Self> {
        match value {
            Yaml::String(s) => {
                let url = Url::parse(s).map_err(|e| anyhow!("invalid url {s}: {e}"))?;
                IcapServiceConfig::from_url(&url)
            }
            Yaml::Hash(map) => {
                let key = parse_key(map)?;
                let mut config = IcapServiceConfig::new(key);
                g3_yaml::foreach_kv(map, |k, v| match g3_yaml::normalize_key(k).as_str() {
                    "url" | "host" | "port" | "service" => Ok(()),
                    "engine" | "scan_engine" => {
                        let name = g3_yaml::value::as_string(v)?;
                        config.engine = ScanEngine::from_str(&name)?;
                        Ok(())
                    }
                    "preview_size" => {
                        let size = g3_yaml::humanize::as_usize(v)
                            .context(format!("invalid humanize usize value for key {k}"))?;
                        config.set_preview_size(size);
                        Ok(())
                    }
                    "max_idle_time" => {
                        let time = g3_yaml::humanize::as_duration(v)
                            .context(format!("invalid humanize duration value for key {k}"))?;
                        config.set_max_idle_time(time);
                        Ok(())
                    }
                    "connect_timeout" => {
                        config.connect_timeout = g3_yaml::humanize::as_duration(v)
                            .context(format!("invalid humanize duration value for key {k}"))?;
                        Ok(())
                    }
                    "read_timeout" => {
                        config.read_timeout = g3_yaml::humanize::as_duration(v)
                            .context(format!("invalid humanize duration value for key {k}"))?;
                        Ok(())
                    }
                    "write_timeout" => {
                        config.write_timeout = g3_yaml::humanize::as_duration(v)
                            .context(format!("invalid humanize duration value for key {k}"))?;
                        Ok(())
                    }
                    "user_agent" => {
                        let ua = g3_yaml::value::as_string(v)?;
                        config.set_user_agent(&ua);
                        Ok(())
                    }
                    "icap_max_header_size" => {
                        config.icap_max_header_size = g3_yaml::humanize::as_usize(v)
                            .context(format!("invalid humanize usize value for key {k}"))?;
                        Ok(())
                    }
                    "max_response_body_size" => {
                        config.max_response_body_size = g3_yaml::humanize::as_usize(v)
                            .context(format!("invalid humanize usize value for key {k}"))?;
                        Ok(())
                    }
                    "trust_cached_istag" => {
                        config.trust_cached_istag = g3_yaml::value::as_bool(v)?;
                        Ok(())
                    }
                    "tcp_keepalive" => {
                        config.tcp_keepalive = g3_yaml::value::as_bool(v)?;
                        Ok(())
                    }
                    _ => Err(anyhow!("invalid key {k}")),
                })?;
                Ok(config)
            }
            _ => Err(anyhow!("invalid yaml type")),
        }
    }
}
