/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

mod io;
pub use io::{LimitedBufReadExt, LimitedReadUntilPattern};

pub mod kmp;
pub use kmp::{KmpMatcher, KmpPattern};
