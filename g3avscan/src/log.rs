/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::io::{self, Write};

use chrono::Local;
use slog::{Drain, KV, Key, OwnedKVList, Record, Serializer, slog_o};
use slog_scope::GlobalLoggerGuard;

struct KvFormatter<'a> {
    buf: &'a mut Vec<u8>,
}

impl Serializer for KvFormatter<'_> {
    fn emit_arguments(&mut self, key: Key, val: &fmt::Arguments) -> slog::Result {
        write!(self.buf, ", {key}: {val}")?;
        Ok(())
    }
}

/// Write each record as one line to stderr.
struct StdErrDrain {
    append_code_position: bool,
}

impl Drain for StdErrDrain {
    type Ok = ();
    type Err = io::Error;

    fn log(&self, record: &Record, values: &OwnedKVList) -> io::Result<()> {
        let mut buf = Vec::with_capacity(256);
        write!(
            buf,
            "{} {} {}",
            Local::now().format("%Y-%m-%d %H:%M:%S%.6f"),
            record.level().as_short_str(),
            record.msg()
        )?;

        let mut formatter = KvFormatter { buf: &mut buf };
        record
            .kv()
            .serialize(record, &mut formatter)
            .map_err(io::Error::other)?;
        values
            .serialize(record, &mut formatter)
            .map_err(io::Error::other)?;

        if self.append_code_position {
            write!(buf, " ({}:{})", record.file(), record.line())?;
        }
        buf.push(b'\n');

        io::stderr().lock().write_all(&buf)
    }
}

pub fn setup(verbose_level: u8) -> Result<GlobalLoggerGuard, log::SetLoggerError> {
    let drain = StdErrDrain {
        append_code_position: verbose_level > 2,
    };
    let logger = slog::Logger::root(drain.fuse(), slog_o!());

    let scope_guard = slog_scope::set_global_logger(logger);

    let log_level = match verbose_level {
        0 => log::Level::Warn,
        1 => log::Level::Info,
        2 => log::Level::Debug,
        _ => log::Level::Trace,
    };

    slog_stdlog::init_with_level(log_level)?;
    Ok(scope_guard)
}
