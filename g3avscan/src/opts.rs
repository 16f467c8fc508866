/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint, value_parser};
use url::Url;
use yaml_rust::YamlLoader;

use g3_icap_scan::{IcapServiceConfig, ScanEngine};

const ARG_VERBOSE: &str = "verbose";
const ARG_CONFIG: &str = "config";
const ARG_URL: &str = "url";
const ARG_ENGINE: &str = "engine";
const ARG_PREVIEW_SIZE: &str = "preview-size";
const ARG_MAX_IDLE_TIME: &str = "max-idle-time";
const ARG_TRUST_ISTAG: &str = "trust-istag";
const ARG_FILE: &str = "file";

pub struct ProcArgs {
    pub verbose_level: u8,
    pub service: Arc<IcapServiceConfig>,
    pub trust_istag: Option<String>,
    pub files: Vec<PathBuf>,
}

pub fn build_cli_args() -> Command {
    Command::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(
            Arg::new(ARG_VERBOSE)
                .help("Show verbose output")
                .short('v')
                .long(ARG_VERBOSE)
                .action(ArgAction::Count),
        )
        .arg(
            Arg::new(ARG_CONFIG)
                .help("ICAP service config file in yaml format")
                .value_name("CONFIG FILE")
                .short('c')
                .long(ARG_CONFIG)
                .num_args(1)
                .value_parser(value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath)
                .required_unless_present(ARG_URL)
                .conflicts_with(ARG_URL),
        )
        .arg(
            Arg::new(ARG_URL)
                .help("ICAP service url, like icap://127.0.0.1:1344/avscan")
                .value_name("ICAP URL")
                .short('u')
                .long(ARG_URL)
                .num_args(1)
                .value_parser(value_parser!(Url)),
        )
        .arg(
            Arg::new(ARG_ENGINE)
                .help("Scan engine variant")
                .value_name("ENGINE")
                .short('e')
                .long(ARG_ENGINE)
                .num_args(1)
                .value_parser([
                    "generic",
                    "default",
                    "icap",
                    "clamav",
                    "clam",
                    "symantec",
                    "trendmicro",
                    "trend_micro",
                ]),
        )
        .arg(
            Arg::new(ARG_PREVIEW_SIZE)
                .help("Use a fixed preview size and skip the OPTIONS request")
                .value_name("SIZE")
                .long(ARG_PREVIEW_SIZE)
                .num_args(1)
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new(ARG_MAX_IDLE_TIME)
                .help("Reconnect if the connection has been idle for longer than this")
                .value_name("TIMEOUT DURATION")
                .long(ARG_MAX_IDLE_TIME)
                .num_args(1),
        )
        .arg(
            Arg::new(ARG_TRUST_ISTAG)
                .help("Skip the scan if the service still has this ISTag")
                .value_name("ISTAG")
                .long(ARG_TRUST_ISTAG)
                .num_args(1),
        )
        .arg(
            Arg::new(ARG_FILE)
                .help("Files to scan")
                .value_name("FILE")
                .num_args(1..)
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath),
        )
}

fn load_config_file(path: &PathBuf) -> anyhow::Result<IcapServiceConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {e}", path.display()))?;
    let docs = YamlLoader::load_from_str(&content)
        .map_err(|e| anyhow!("invalid yaml file {}: {e}", path.display()))?;
    let doc = docs
        .first()
        .ok_or_else(|| anyhow!("empty yaml file {}", path.display()))?;
    IcapServiceConfig::parse_yaml(doc)
        .context(format!("invalid ICAP service config in {}", path.display()))
}

pub fn parse_args(args: &ArgMatches) -> anyhow::Result<ProcArgs> {
    let mut service = if let Some(path) = args.get_one::<PathBuf>(ARG_CONFIG) {
        load_config_file(path)?
    } else if let Some(url) = args.get_one::<Url>(ARG_URL) {
        IcapServiceConfig::from_url(url)?
    } else {
        return Err(anyhow!("no ICAP service set"));
    };

    if let Some(engine) = args.get_one::<String>(ARG_ENGINE) {
        service.set_engine(ScanEngine::from_str(engine)?);
    }
    if let Some(size) = args.get_one::<usize>(ARG_PREVIEW_SIZE) {
        service.set_preview_size(*size);
    }
    if let Some(v) = args.get_one::<String>(ARG_MAX_IDLE_TIME) {
        let time = g3_yaml::humanize::parse_duration(v)
            .context(format!("invalid {ARG_MAX_IDLE_TIME} value"))?;
        service.set_max_idle_time(time);
    }
    let trust_istag = args.get_one::<String>(ARG_TRUST_ISTAG).cloned();
    if trust_istag.is_some() {
        service.set_trust_cached_istag(true);
    }

    let files = args
        .get_many::<PathBuf>(ARG_FILE)
        .map(|v| v.cloned().collect())
        .unwrap_or_default();

    Ok(ProcArgs {
        verbose_level: args.get_count(ARG_VERBOSE),
        service: Arc::new(service),
        trust_istag,
        files,
    })
}
