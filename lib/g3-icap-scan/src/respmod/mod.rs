/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

mod payload;
pub(crate) use payload::EncapsulatedPayload;
pub(crate) use payload::parse_chunk_size;

mod request;
pub(crate) use request::{LAST_CHUNK, build_preview_request, write_chunk_header};

mod response;
pub(crate) use response::IcapRespmodResponse;

mod verdict;
pub use verdict::ScanVerdict;
