/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;
use std::time::Duration;

use anyhow::anyhow;
use humanize_rs::ParseError;
use humanize_rs::bytes::Bytes;
use yaml_rust::Yaml;

/// Parse a humanize duration string, a bare number is taken as seconds.
pub fn parse_duration(value: &str) -> anyhow::Result<Duration> {
    match humanize_rs::duration::parse(value) {
        Ok(v) => Ok(v),
        Err(ParseError::MissingUnit) => {
            let secs = u64::from_str(value).map_err(|_| anyhow!("invalid duration string"))?;
            Ok(Duration::from_secs(secs))
        }
        Err(e) => Err(anyhow!("invalid humanize duration string: {e}")),
    }
}

pub fn as_duration(v: &Yaml) -> anyhow::Result<Duration> {
    match v {
        Yaml::String(value) => parse_duration(value),
        Yaml::Integer(value) => {
            let secs = u64::try_from(*value).map_err(|_| anyhow!("negative duration value"))?;
            Ok(Duration::from_secs(secs))
        }
        _ => Err(anyhow!(
            "yaml value type for humanize duration should be 'string' or 'integer'"
        )),
    }
}

pub fn as_usize(v: &Yaml) -> anyhow::Result<usize> {
    match v {
        Yaml::String(value) => {
            let v = value.parse::<Bytes>()?;
            Ok(v.size())
        }
        Yaml::Integer(value) => Ok(usize::try_from(*value)?),
        _ => Err(anyhow!(
            "yaml value type for humanize usize should be 'string' or 'integer'"
        )),
    }
}
