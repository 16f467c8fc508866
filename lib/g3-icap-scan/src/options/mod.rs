/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

mod error;
pub use error::IcapOptionsError;

mod response;
pub use response::{IcapServiceOptions, MAX_PREVIEW_SIZE};

mod request;
pub(crate) use request::IcapOptionsRequest;
