/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

mod opts;
pub use opts::{ProcArgs, build_cli_args, parse_args};

pub mod log;
pub mod scan;

pub const EXIT_CLEAN: u8 = 0;
pub const EXIT_INFECTED: u8 = 1;
pub const EXIT_ERROR: u8 = 2;
