/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

mod limited_read_until_pattern;
pub use limited_read_until_pattern::LimitedReadUntilPattern;

mod limited_buf_read_ext;
pub use limited_buf_read_ext::LimitedBufReadExt;
