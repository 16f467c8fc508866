/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use anyhow::{Context, anyhow};
use yaml_rust::{Yaml, yaml};

/// Lowercase the key and use '_' as the word separator, so that
/// `Read-Timeout` and `read_timeout` name the same setting.
pub fn normalize_key(raw: &str) -> String {
    raw.to_lowercase().replace('-', "_")
}

/// Call `f` for every entry of a map, keys must be strings.
pub fn foreach_kv<F>(map: &yaml::Hash, mut f: F) -> anyhow::Result<()>
where
    F: FnMut(&str, &Yaml) -> anyhow::Result<()>,
{
    map.iter().try_for_each(|(k, v)| {
        let Yaml::String(key) = k else {
            return Err(anyhow!("map key {k:?} is not a string"));
        };
        f(key, v).with_context(|| format!("invalid value for key {key}"))
    })
}
