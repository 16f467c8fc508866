/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

mod parse;
pub use parse::{IcapLineParseError, ResponseHeaders, STATUS_CODE_KEY};

mod reason;
pub use reason::IcapErrorReason;

mod error;
pub use error::{IcapErrorKind, IcapScanError};

mod engine;
pub use engine::{ScanClassification, ScanEngine};

mod options;
pub use options::{IcapOptionsError, IcapServiceOptions, MAX_PREVIEW_SIZE};

mod respmod;
pub use respmod::ScanVerdict;

mod service;
use service::IcapClientConnection;
pub use service::{
    DEFAULT_ICAP_PORT, IcapConnectionKey, IcapServiceConfig, IcapSession, IcapSessionGuard,
    IcapSessionPool, IcapSessionState,
};

#[cfg(feature = "yaml")]
mod config;
