/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IcapOptionsError {
    #[error("request failed: {0} {1}")]
    RequestFailed(u16, String),
    #[error("no preview size set")]
    NoPreviewSize,
    #[error("invalid value for header {0}")]
    InvalidHeaderValue(&'static str),
}
