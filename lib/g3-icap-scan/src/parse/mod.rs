/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

mod error;
pub use error::IcapLineParseError;

mod header_line;
use header_line::HeaderLine;

mod status_line;
use status_line::StatusLine;

mod headers;
pub use headers::{ResponseHeaders, STATUS_CODE_KEY};
