/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::process::ExitCode;

use anyhow::Context;

fn main() -> ExitCode {
    let args = g3avscan::build_cli_args().get_matches();
    let proc_args = match g3avscan::parse_args(&args) {
        Ok(proc_args) => proc_args,
        Err(e) => {
            eprintln!("{e:?}");
            return ExitCode::from(g3avscan::EXIT_ERROR);
        }
    };

    let _log_guard = match g3avscan::log::setup(proc_args.verbose_level) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("failed to setup logger: {e}");
            return ExitCode::from(g3avscan::EXIT_ERROR);
        }
    };

    let r = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime");
    let rt = match r {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{e:?}");
            return ExitCode::from(g3avscan::EXIT_ERROR);
        }
    };

    let code = rt.block_on(g3avscan::scan::run(&proc_args));
    ExitCode::from(code)
}
